//! テナント単位の排他キー導出
//!
//! テナントIDの先頭16桁のhex（区切り無し）を8桁ずつ2つに分け、
//! それぞれを32bit値として解釈し符号付き2の補数に読み替える。
//! 64bit整数1つにまとめると排他プリミティブの受け付ける範囲を超える
//! IDがあるため、必ず上位・下位の2値で扱う。
//!
//! 衝突は排他の粒度が粗くなるだけで正しさには影響しない。

use uuid::Uuid;

/// テナント排他キー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantLockKey {
    /// 先頭8桁
    pub hi: i32,
    /// 続く8桁
    pub lo: i32,
}

/// テナントIDから排他キーを導出
pub fn derive(tenant_id: &Uuid) -> TenantLockKey {
    // UUIDの先頭8バイトは区切りを除いたhex表現の先頭16桁と同じ値
    let bytes = tenant_id.as_bytes();
    let hi = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let lo = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    TenantLockKey {
        hi: hi as i32,
        lo: lo as i32,
    }
}

impl TenantLockKey {
    /// `(hi, lo)` のタプルとして取得
    pub fn as_pair(&self) -> (i32, i32) {
        (self.hi, self.lo)
    }
}
