//! 監査台帳ライター
//!
//! 1回の書き込み（またはバッチ）ごとに1トランザクションを使い、
//! その最初の文でテナント排他行を確保してから
//! 最新状態の読み取り → ハッシュ計算 → 挿入を行う。
//! 同一テナントへの並行書き込みは排他行で直列化されるため、
//! 連番やprevious_hashが衝突・分岐することはない。
//!
//! 最新状態はプロセス内にキャッシュせず、毎回ロック内でDBから読み直す。

use crate::audit::hash_chain::{self, ChainHashInput, GENESIS_HASH};
use crate::audit::lock_key;
use crate::audit::observer::{self, WriteObserver};
use crate::audit::types::{AuditEntry, ChainHead, NewAuditEntry, WriteReceipt};
use crate::common::error::{LedgerError, LedgerResult};
use crate::db::audit_log::AuditLogStorage;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 監査台帳への書き込み口
///
/// 業務サービスはこのtraitに依存し、更新・削除は提供されない。
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// エントリを1件書き込む
    async fn write_audit_entry(&self, entry: NewAuditEntry) -> LedgerResult<WriteReceipt>;
    /// 同一テナントのエントリをまとめて書き込む（全件成功か全件失敗）
    async fn write_audit_entries(
        &self,
        tenant_id: Uuid,
        entries: Vec<NewAuditEntry>,
    ) -> LedgerResult<Vec<WriteReceipt>>;
}

/// チェーン上の次の書き込み位置
struct ChainCursor {
    tenant_id: Uuid,
    tenant_key: String,
    next_sequence: i64,
    previous_hash: String,
}

impl ChainCursor {
    fn new(tenant_id: Uuid, head: Option<ChainHead>) -> Self {
        let (next_sequence, previous_hash) = match head {
            Some(head) => (head.sequence_number + 1, head.hash_chain),
            None => (1, GENESIS_HASH.to_string()),
        };
        Self {
            tenant_id,
            tenant_key: tenant_id.to_string(),
            next_sequence,
            previous_hash,
        }
    }

    /// 書き込み要求にハッシュと連番を確定させ、カーソルを進める
    fn seal(&mut self, entry: NewAuditEntry) -> AuditEntry {
        let timestamp = hash_chain::truncate_to_millis(entry.timestamp.unwrap_or_else(Utc::now));
        let sequence_number = self.next_sequence;
        let hash = hash_chain::compute_entry_hash(&ChainHashInput {
            tenant_id: &self.tenant_key,
            sequence_number,
            action: &entry.action,
            entity_type: &entry.entity_type,
            entity_id: entry.entity_id.as_deref(),
            timestamp: &timestamp,
            previous_hash: Some(&self.previous_hash),
        });

        let previous_hash = std::mem::replace(&mut self.previous_hash, hash.clone());
        self.next_sequence += 1;

        AuditEntry {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            user_id: entry.user_id,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            previous_state: entry.previous_state,
            new_state: entry.new_state,
            metadata: entry
                .metadata
                .unwrap_or_else(|| Value::Object(Default::default())),
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            timestamp,
            hash_chain: hash,
            previous_hash,
            sequence_number,
        }
    }
}

fn validate(entry: &NewAuditEntry) -> LedgerResult<()> {
    if entry.action.trim().is_empty() {
        return Err(LedgerError::Validation("action is required".to_string()));
    }
    if entry.entity_type.trim().is_empty() {
        return Err(LedgerError::Validation("entity_type is required".to_string()));
    }
    Ok(())
}

/// 監査台帳ライター
#[derive(Clone)]
pub struct AuditWriter {
    storage: AuditLogStorage,
    observer: Option<Arc<dyn WriteObserver>>,
}

impl AuditWriter {
    /// 新しいAuditWriterを作成
    pub fn new(storage: AuditLogStorage) -> Self {
        Self {
            storage,
            observer: None,
        }
    }

    /// 書き込み完了オブザーバーを登録（登録できるのは1つのみ）
    pub fn with_observer(mut self, observer: Arc<dyn WriteObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// 下位ストレージを取得
    pub fn storage(&self) -> &AuditLogStorage {
        &self.storage
    }

    /// エントリを1件書き込む
    pub async fn write(&self, entry: NewAuditEntry) -> LedgerResult<WriteReceipt> {
        validate(&entry)?;
        let tenant_id = entry.tenant_id;
        let written = self.append(tenant_id, vec![entry]).await?;

        let receipt = written.first().map(WriteReceipt::from).ok_or_else(|| {
            LedgerError::Validation(format!("no entry was appended for tenant {}", tenant_id))
        })?;
        debug!(
            tenant_id = %tenant_id,
            sequence_number = receipt.sequence_number,
            "Audit entry written"
        );

        self.notify(&written);
        Ok(receipt)
    }

    /// 同一テナントのエントリを1トランザクションで書き込む
    ///
    /// 戻り値は入力順。途中で失敗した場合はどのエントリも可視にならない。
    pub async fn write_batch(
        &self,
        tenant_id: Uuid,
        entries: Vec<NewAuditEntry>,
    ) -> LedgerResult<Vec<WriteReceipt>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        for entry in &entries {
            validate(entry)?;
            if entry.tenant_id != tenant_id {
                return Err(LedgerError::Validation(format!(
                    "entry for tenant {} in batch for tenant {}",
                    entry.tenant_id, tenant_id
                )));
            }
        }

        let written = self.append(tenant_id, entries).await?;
        let receipts: Vec<WriteReceipt> = written.iter().map(WriteReceipt::from).collect();
        info!(
            tenant_id = %tenant_id,
            count = receipts.len(),
            first_sequence = receipts[0].sequence_number,
            "Audit batch written"
        );

        self.notify(&written);
        Ok(receipts)
    }

    /// ロック取得 → 最新状態読み取り → 連鎖計算 → 挿入 → コミット
    ///
    /// エラー時はトランザクションがdropされロールバックされる。
    async fn append(
        &self,
        tenant_id: Uuid,
        entries: Vec<NewAuditEntry>,
    ) -> LedgerResult<Vec<AuditEntry>> {
        let key = lock_key::derive(&tenant_id);
        let mut tx = self.storage.begin().await?;

        AuditLogStorage::acquire_tenant_lock(&mut tx, key).await?;
        let head = AuditLogStorage::latest_chain_head(&mut tx, &tenant_id).await?;
        let mut cursor = ChainCursor::new(tenant_id, head);

        let mut written = Vec::with_capacity(entries.len());
        for entry in entries {
            let sealed = cursor.seal(entry);
            AuditLogStorage::insert_entry(&mut tx, &sealed).await?;
            written.push(sealed);
        }

        tx.commit()
            .await
            .map_err(LedgerError::database("Failed to commit audit entries"))?;

        Ok(written)
    }

    fn notify(&self, written: &[AuditEntry]) {
        if let Some(observer) = &self.observer {
            for entry in written {
                observer::notify(observer.as_ref(), entry);
            }
        }
    }
}

#[async_trait]
impl AuditSink for AuditWriter {
    async fn write_audit_entry(&self, entry: NewAuditEntry) -> LedgerResult<WriteReceipt> {
        self.write(entry).await
    }

    async fn write_audit_entries(
        &self,
        tenant_id: Uuid,
        entries: Vec<NewAuditEntry>,
    ) -> LedgerResult<Vec<WriteReceipt>> {
        self.write_batch(tenant_id, entries).await
    }
}
