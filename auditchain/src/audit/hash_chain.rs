//! SHA-256エントリハッシュチェーン
//!
//! 各エントリのハッシュは次の7フィールドを `|` で連結した文字列の SHA-256（小文字hex）:
//!
//! ```text
//! tenant_id|sequence_number|action|entity_type|entity_id|timestamp|previous_hash
//! ```
//!
//! - `entity_id` 未指定は空文字列
//! - `previous_hash` 未指定は [`GENESIS_HASH`]
//! - `timestamp` は ISO-8601・ミリ秒精度・`Z` サフィックス
//!
//! この入力形式はバックフィルやデータ移行など外部プロセスとの契約であり、
//! フィールド順・区切り文字・正規化を変更してはならない。

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sha2::{Digest, Sha256};

/// 先頭エントリのprevious_hash
pub const GENESIS_HASH: &str = "GENESIS";

/// フィールド区切り文字
pub const FIELD_DELIMITER: &str = "|";

/// ハッシュ計算の入力
#[derive(Debug, Clone, Copy)]
pub struct ChainHashInput<'a> {
    /// テナントID（ハイフン区切り小文字の文字列表現）
    pub tenant_id: &'a str,
    /// 連番
    pub sequence_number: i64,
    /// 操作種別
    pub action: &'a str,
    /// 対象エンティティ種別
    pub entity_type: &'a str,
    /// 対象エンティティID
    pub entity_id: Option<&'a str>,
    /// タイムスタンプ
    pub timestamp: &'a DateTime<Utc>,
    /// 直前エントリのハッシュ
    pub previous_hash: Option<&'a str>,
}

/// タイムスタンプを正規形式（`2024-01-02T03:04:05.678Z`）で出力
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// タイムスタンプをミリ秒精度に切り詰める
///
/// 永続化値・返却値・ハッシュ入力を一致させるため、書き込み前に適用する。
pub fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(3)
}

/// ハッシュ入力文字列を組み立てる
pub fn canonical_input(input: &ChainHashInput<'_>) -> String {
    let sequence = input.sequence_number.to_string();
    let timestamp = canonical_timestamp(input.timestamp);
    let fields: [&str; 7] = [
        input.tenant_id,
        &sequence,
        input.action,
        input.entity_type,
        input.entity_id.unwrap_or(""),
        &timestamp,
        input.previous_hash.unwrap_or(GENESIS_HASH),
    ];
    fields.join(FIELD_DELIMITER)
}

/// エントリのハッシュを計算
pub fn compute_entry_hash(input: &ChainHashInput<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_input(input).as_bytes());
    format!("{:x}", hasher.finalize())
}
