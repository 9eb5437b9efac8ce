//! 監査台帳ストレージ
//!
//! 追記専用。更新・削除のAPIは持たず、スキーマ側のトリガーでも拒否する。
//! 書き込み系の関連関数はトランザクション内の接続を受け取り、
//! 呼び出し側（[`AuditWriter`](crate::audit::writer::AuditWriter)）が
//! ロック取得からコミットまでを1トランザクションで管理する。

use crate::audit::{
    hash_chain::canonical_timestamp,
    lock_key::TenantLockKey,
    types::{AuditEntry, ChainHead},
};
use crate::common::error::{LedgerError, LedgerResult};
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde_json::Value;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use uuid::Uuid;

const ENTRY_COLUMNS: &str = "id, tenant_id, user_id, action, entity_type, entity_id, \
     previous_state, new_state, metadata, ip_address, user_agent, timestamp, \
     hash_chain, previous_hash, sequence_number";

/// 監査台帳のDB操作
#[derive(Clone)]
pub struct AuditLogStorage {
    pool: SqlitePool,
}

/// sqlx::FromRow用の行構造体
#[derive(Debug, sqlx::FromRow)]
struct AuditEntryRow {
    id: String,
    tenant_id: String,
    user_id: Option<String>,
    action: String,
    entity_type: String,
    entity_id: Option<String>,
    previous_state: Option<String>,
    new_state: Option<String>,
    metadata: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    timestamp: String,
    hash_chain: String,
    previous_hash: String,
    sequence_number: i64,
}

/// 検証用の行（保存値をそのまま保持する）
///
/// タイムスタンプを文字列のまま受け取るため、
/// 書き換えで解析不能になった行も検証対象として読み出せる。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredChainRow {
    /// レコードID
    pub id: String,
    /// テナントID
    pub tenant_id: String,
    /// 連番
    pub sequence_number: i64,
    /// 操作種別
    pub action: String,
    /// 対象エンティティ種別
    pub entity_type: String,
    /// 対象エンティティID
    pub entity_id: Option<String>,
    /// 保存されたタイムスタンプ文字列
    pub timestamp: String,
    /// 保存されたハッシュ
    pub hash_chain: String,
    /// 保存されたprevious_hash
    pub previous_hash: String,
}

/// sqlx::FromRow用の行構造体（チェーン末尾）
#[derive(Debug, sqlx::FromRow)]
struct ChainHeadRow {
    sequence_number: i64,
    hash_chain: String,
}

impl From<ChainHeadRow> for ChainHead {
    fn from(row: ChainHeadRow) -> Self {
        ChainHead {
            sequence_number: row.sequence_number,
            hash_chain: row.hash_chain,
        }
    }
}

fn corrupt(id: &str, reason: impl Into<String>) -> LedgerError {
    LedgerError::CorruptRecord {
        id: id.to_string(),
        reason: reason.into(),
    }
}

fn parse_json(id: &str, column: &str, raw: &str) -> LedgerResult<Value> {
    serde_json::from_str(raw).map_err(|e| corrupt(id, format!("invalid {}: {}", column, e)))
}

/// 保存形式のタイムスタンプを解析
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl TryFrom<AuditEntryRow> for AuditEntry {
    type Error = LedgerError;

    fn try_from(row: AuditEntryRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).map_err(|e| corrupt(&row.id, format!("invalid id: {}", e)))?;
        let tenant_id = Uuid::parse_str(&row.tenant_id)
            .map_err(|e| corrupt(&row.id, format!("invalid tenant_id: {}", e)))?;
        let timestamp = parse_timestamp(&row.timestamp)
            .ok_or_else(|| corrupt(&row.id, format!("invalid timestamp: {}", row.timestamp)))?;
        let previous_state = row
            .previous_state
            .as_deref()
            .map(|raw| parse_json(&row.id, "previous_state", raw))
            .transpose()?;
        let new_state = row
            .new_state
            .as_deref()
            .map(|raw| parse_json(&row.id, "new_state", raw))
            .transpose()?;
        let metadata = parse_json(&row.id, "metadata", &row.metadata)?;

        Ok(AuditEntry {
            id,
            tenant_id,
            user_id: row.user_id,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            previous_state,
            new_state,
            metadata,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            timestamp,
            hash_chain: row.hash_chain,
            previous_hash: row.previous_hash,
            sequence_number: row.sequence_number,
        })
    }
}

impl AuditLogStorage {
    /// 新しいAuditLogStorageを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 接続プールを取得
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 書き込みトランザクションを開始
    pub async fn begin(&self) -> LedgerResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(LedgerError::database("Failed to begin transaction"))
    }

    /// テナント排他行を確保する
    ///
    /// トランザクションの最初の文として呼ぶこと。確保した行ロックは
    /// コミットまたはロールバックまで保持される。待機が busy timeout を
    /// 超えた場合はリトライ可能なエラーになる。
    pub async fn acquire_tenant_lock(
        conn: &mut SqliteConnection,
        key: TenantLockKey,
    ) -> LedgerResult<()> {
        sqlx::query(
            r#"INSERT INTO audit_tenant_locks (key_hi, key_lo, acquired_at)
               VALUES (?, ?, ?)
               ON CONFLICT(key_hi, key_lo) DO UPDATE SET acquired_at = excluded.acquired_at"#,
        )
        .bind(key.hi)
        .bind(key.lo)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await
        .map_err(LedgerError::database("Failed to acquire tenant lock"))?;
        Ok(())
    }

    /// ロック保持中にテナントのチェーン末尾を取得（空チェーンはNone）
    pub async fn latest_chain_head(
        conn: &mut SqliteConnection,
        tenant_id: &Uuid,
    ) -> LedgerResult<Option<ChainHead>> {
        let row = sqlx::query_as::<_, ChainHeadRow>(
            "SELECT sequence_number, hash_chain FROM audit_entries \
             WHERE tenant_id = ? ORDER BY sequence_number DESC LIMIT 1",
        )
        .bind(tenant_id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(LedgerError::database("Failed to read latest chain head"))?;

        Ok(row.map(ChainHead::from))
    }

    /// エントリを1行挿入（ハッシュ・連番込みで一度に書き込む）
    pub async fn insert_entry(conn: &mut SqliteConnection, entry: &AuditEntry) -> LedgerResult<()> {
        let previous_state = entry.previous_state.as_ref().map(Value::to_string);
        let new_state = entry.new_state.as_ref().map(Value::to_string);

        sqlx::query(
            r#"INSERT INTO audit_entries (
                id, tenant_id, user_id, action, entity_type, entity_id,
                previous_state, new_state, metadata, ip_address, user_agent,
                timestamp, hash_chain, previous_hash, sequence_number
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entry.id.to_string())
        .bind(entry.tenant_id.to_string())
        .bind(&entry.user_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(previous_state)
        .bind(new_state)
        .bind(entry.metadata.to_string())
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(canonical_timestamp(&entry.timestamp))
        .bind(&entry.hash_chain)
        .bind(&entry.previous_hash)
        .bind(entry.sequence_number)
        .execute(&mut *conn)
        .await
        .map_err(LedgerError::database("Failed to insert audit entry"))?;

        Ok(())
    }

    /// テナントのチェーン末尾を取得（ロック無しの読み取り）
    pub async fn chain_head(&self, tenant_id: &Uuid) -> LedgerResult<Option<ChainHead>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(LedgerError::database("Failed to acquire connection"))?;
        Self::latest_chain_head(&mut conn, tenant_id).await
    }

    /// テナントの全エントリを連番順で取得
    pub async fn entries_for_tenant(&self, tenant_id: &Uuid) -> LedgerResult<Vec<AuditEntry>> {
        let sql = format!(
            "SELECT {} FROM audit_entries WHERE tenant_id = ? ORDER BY sequence_number ASC",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, AuditEntryRow>(&sql)
            .bind(tenant_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(LedgerError::database("Failed to load audit entries"))?;

        rows.into_iter()
            .map(AuditEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
    }

    /// エンティティ単位の履歴を連番順で取得
    pub async fn entries_for_entity(
        &self,
        tenant_id: &Uuid,
        entity_type: &str,
        entity_id: &str,
    ) -> LedgerResult<Vec<AuditEntry>> {
        let sql = format!(
            "SELECT {} FROM audit_entries \
             WHERE tenant_id = ? AND entity_type = ? AND entity_id = ? \
             ORDER BY sequence_number ASC",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, AuditEntryRow>(&sql)
            .bind(tenant_id.to_string())
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await
            .map_err(LedgerError::database("Failed to load entity history"))?;

        rows.into_iter()
            .map(AuditEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
    }

    /// テナントのエントリ数を取得
    pub async fn count_for_tenant(&self, tenant_id: &Uuid) -> LedgerResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_entries WHERE tenant_id = ?")
            .bind(tenant_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(LedgerError::database("Failed to count audit entries"))?;
        Ok(count.0)
    }

    /// 検証用にテナントの行を連番順でストリーム取得
    ///
    /// 単一のSELECTで読むため、開始時点で可視な行のスナップショットになる。
    pub fn stream_chain_rows(
        &self,
        tenant_id: &Uuid,
    ) -> BoxStream<'_, Result<StoredChainRow, sqlx::Error>> {
        sqlx::query_as::<_, StoredChainRow>(
            "SELECT id, tenant_id, sequence_number, action, entity_type, entity_id, \
             timestamp, hash_chain, previous_hash \
             FROM audit_entries WHERE tenant_id = ? ORDER BY sequence_number ASC",
        )
        .bind(tenant_id.to_string())
        .fetch(&self.pool)
    }
}
