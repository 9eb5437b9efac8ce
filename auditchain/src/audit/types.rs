//! 監査台帳の型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 永続化済みの監査エントリ
///
/// 一度書き込まれた後は変更も削除もされない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// レコードID
    pub id: Uuid,
    /// テナントID
    pub tenant_id: Uuid,
    /// 操作ユーザー
    pub user_id: Option<String>,
    /// 操作種別（例: `part.created`）
    pub action: String,
    /// 対象エンティティ種別
    pub entity_type: String,
    /// 対象エンティティID
    pub entity_id: Option<String>,
    /// 変更前スナップショット
    pub previous_state: Option<Value>,
    /// 変更後スナップショット
    pub new_state: Option<Value>,
    /// 任意のメタデータ
    pub metadata: Value,
    /// クライアントIPアドレス
    pub ip_address: Option<String>,
    /// User-Agent
    pub user_agent: Option<String>,
    /// タイムスタンプ（ミリ秒精度）
    pub timestamp: DateTime<Utc>,
    /// このエントリのSHA-256ハッシュ（小文字hex）
    pub hash_chain: String,
    /// 直前エントリのハッシュ、先頭ではジェネシス値
    pub previous_hash: String,
    /// テナント内連番（1始まり）
    pub sequence_number: i64,
}

/// 書き込み要求
///
/// `tenant_id`・`action`・`entity_type` が必須。その他は任意で、
/// `timestamp` 未指定時は書き込み時刻が使われる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditEntry {
    /// テナントID
    pub tenant_id: Uuid,
    /// 操作ユーザー
    #[serde(default)]
    pub user_id: Option<String>,
    /// 操作種別
    pub action: String,
    /// 対象エンティティ種別
    pub entity_type: String,
    /// 対象エンティティID
    #[serde(default)]
    pub entity_id: Option<String>,
    /// 変更前スナップショット
    #[serde(default)]
    pub previous_state: Option<Value>,
    /// 変更後スナップショット
    #[serde(default)]
    pub new_state: Option<Value>,
    /// 任意のメタデータ（未指定時は空オブジェクト）
    #[serde(default)]
    pub metadata: Option<Value>,
    /// クライアントIPアドレス
    #[serde(default)]
    pub ip_address: Option<String>,
    /// User-Agent
    #[serde(default)]
    pub user_agent: Option<String>,
    /// タイムスタンプ
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewAuditEntry {
    /// 必須フィールドのみで書き込み要求を作成
    pub fn new(tenant_id: Uuid, action: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user_id: None,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: None,
            previous_state: None,
            new_state: None,
            metadata: None,
            ip_address: None,
            user_agent: None,
            timestamp: None,
        }
    }

    /// 対象エンティティIDを設定
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// 操作ユーザーを設定
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// 変更前後のスナップショットを設定
    pub fn states(mut self, previous_state: Option<Value>, new_state: Option<Value>) -> Self {
        self.previous_state = previous_state;
        self.new_state = new_state;
        self
    }

    /// メタデータを設定
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// クライアント情報を設定
    pub fn client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// タイムスタンプを設定
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// 書き込み結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    /// 採番されたレコードID
    pub id: Uuid,
    /// 計算済みハッシュ
    pub hash_chain: String,
    /// 採番された連番
    pub sequence_number: i64,
}

impl From<&AuditEntry> for WriteReceipt {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            id: entry.id,
            hash_chain: entry.hash_chain.clone(),
            sequence_number: entry.sequence_number,
        }
    }
}

/// テナントのチェーン末尾
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHead {
    /// 最新の連番
    pub sequence_number: i64,
    /// 最新エントリのハッシュ
    pub hash_chain: String,
}
