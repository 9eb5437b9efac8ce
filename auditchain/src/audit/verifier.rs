//! ハッシュチェーン検証
//!
//! テナントの全エントリを連番順に読み、各エントリのハッシュを
//! 自身の保存値（保存されたprevious_hashを含む）から再計算して比較する。
//! 最初の不一致で止めず、全エントリを独立に検査する。
//!
//! ハッシュ再計算に加えて次も検出する:
//! - previous_hash が直前エントリの保存ハッシュと一致しない（リンク切れ）
//! - 連番の欠落・飛び（行の削除）
//! - タイムスタンプが解析できない
//!
//! 改ざんはエラーではなく [`ChainVerificationResult`] として返す。
//! エラーになるのは読み出し自体の失敗のみ。

use crate::audit::hash_chain::{self, ChainHashInput, GENESIS_HASH};
use crate::common::error::{LedgerError, LedgerResult};
use crate::db::audit_log::{self, AuditLogStorage, StoredChainRow};
use futures::TryStreamExt;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

/// 検出された不整合の種類
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// 保存ハッシュと再計算ハッシュが一致しない
    HashMismatch {
        /// 保存されていたハッシュ
        stored: String,
        /// 保存値から再計算したハッシュ
        recomputed: String,
    },
    /// previous_hash が直前エントリのハッシュを指していない
    BrokenLink {
        /// 直前エントリの保存ハッシュ（先頭ではジェネシス値）
        expected: String,
        /// 保存されていたprevious_hash
        stored: String,
    },
    /// 連番が期待値と異なる
    SequenceGap {
        /// 期待した連番
        expected: i64,
        /// 保存されていた連番
        actual: i64,
    },
    /// タイムスタンプが解析できない
    MalformedTimestamp {
        /// 保存されていた値
        raw: String,
    },
}

/// 不整合1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainViolation {
    /// 対象エントリID
    pub entry_id: Uuid,
    /// 対象エントリの連番
    pub sequence_number: i64,
    /// 種類
    #[serde(flatten)]
    pub kind: ViolationKind,
}

/// チェーン検証結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerificationResult {
    /// 検証対象テナント
    pub tenant_id: Uuid,
    /// 不整合が無いか
    pub valid: bool,
    /// 検査したエントリ数
    pub total_checked: u64,
    /// 不整合が見つかったエントリ数
    ///
    /// ハッシュ不一致だけでなく、リンク切れ・連番の飛び・タイムスタンプ不正の
    /// いずれかを持つエントリも数える（1エントリにつき1）。
    pub violation_count: u64,
    /// 連番順で最初に不整合が見つかったエントリ
    pub first_invalid_entry: Option<Uuid>,
    /// 全ての不整合
    pub violations: Vec<ChainViolation>,
}

impl fmt::Display for ChainVerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first_invalid_entry {
            None => write!(
                f,
                "PASS tenant {}: {} entries verified, no violations",
                self.tenant_id, self.total_checked
            ),
            Some(first) => write!(
                f,
                "FAIL tenant {}: {} of {} entries invalid, first invalid entry {}",
                self.tenant_id, self.violation_count, self.total_checked, first
            ),
        }
    }
}

/// 走査中の状態
struct ScanState {
    tenant_id: Uuid,
    expected_sequence: i64,
    expected_previous: String,
    total_checked: u64,
    violation_count: u64,
    first_invalid_entry: Option<Uuid>,
    violations: Vec<ChainViolation>,
}

impl ScanState {
    fn new(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            expected_sequence: 1,
            expected_previous: GENESIS_HASH.to_string(),
            total_checked: 0,
            violation_count: 0,
            first_invalid_entry: None,
            violations: Vec::new(),
        }
    }

    fn check(&mut self, row: StoredChainRow) -> LedgerResult<()> {
        let entry_id = Uuid::parse_str(&row.id).map_err(|e| LedgerError::CorruptRecord {
            id: row.id.clone(),
            reason: format!("invalid id: {}", e),
        })?;
        let mut found = Vec::new();

        if row.sequence_number != self.expected_sequence {
            found.push(ViolationKind::SequenceGap {
                expected: self.expected_sequence,
                actual: row.sequence_number,
            });
        }

        if row.previous_hash != self.expected_previous {
            found.push(ViolationKind::BrokenLink {
                expected: self.expected_previous.clone(),
                stored: row.previous_hash.clone(),
            });
        }

        match audit_log::parse_timestamp(&row.timestamp) {
            Some(timestamp) => {
                let recomputed = hash_chain::compute_entry_hash(&ChainHashInput {
                    tenant_id: &row.tenant_id,
                    sequence_number: row.sequence_number,
                    action: &row.action,
                    entity_type: &row.entity_type,
                    entity_id: row.entity_id.as_deref(),
                    timestamp: &timestamp,
                    previous_hash: Some(&row.previous_hash),
                });
                if recomputed != row.hash_chain {
                    found.push(ViolationKind::HashMismatch {
                        stored: row.hash_chain.clone(),
                        recomputed,
                    });
                }
            }
            None => found.push(ViolationKind::MalformedTimestamp {
                raw: row.timestamp.clone(),
            }),
        }

        self.total_checked += 1;
        if !found.is_empty() {
            self.violation_count += 1;
            self.first_invalid_entry.get_or_insert(entry_id);
            for kind in found {
                warn!(
                    tenant_id = %self.tenant_id,
                    sequence_number = row.sequence_number,
                    entry_id = %entry_id,
                    violation = ?kind,
                    "Hash chain violation detected"
                );
                self.violations.push(ChainViolation {
                    entry_id,
                    sequence_number: row.sequence_number,
                    kind,
                });
            }
        }

        // 次の期待値は直前行の保存値から取る
        self.expected_sequence = row.sequence_number.saturating_add(1);
        self.expected_previous = row.hash_chain;
        Ok(())
    }

    fn finish(self) -> ChainVerificationResult {
        ChainVerificationResult {
            tenant_id: self.tenant_id,
            valid: self.violations.is_empty(),
            total_checked: self.total_checked,
            violation_count: self.violation_count,
            first_invalid_entry: self.first_invalid_entry,
            violations: self.violations,
        }
    }
}

/// チェーン検証器（読み取り専用、何度でも実行可能）
#[derive(Clone)]
pub struct IntegrityVerifier {
    storage: AuditLogStorage,
}

impl IntegrityVerifier {
    /// 新しいIntegrityVerifierを作成
    pub fn new(storage: AuditLogStorage) -> Self {
        Self { storage }
    }

    /// テナントのチェーンを検証
    pub async fn verify(&self, tenant_id: Uuid) -> LedgerResult<ChainVerificationResult> {
        let mut rows = self.storage.stream_chain_rows(&tenant_id);
        let mut state = ScanState::new(tenant_id);

        while let Some(row) = rows
            .try_next()
            .await
            .map_err(LedgerError::database("Failed to read audit entries"))?
        {
            state.check(row)?;
        }

        let result = state.finish();
        info!(
            tenant_id = %tenant_id,
            valid = result.valid,
            total_checked = result.total_checked,
            violation_count = result.violation_count,
            "Hash chain verification completed"
        );
        Ok(result)
    }
}
