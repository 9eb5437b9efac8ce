//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! 改ざん検知の結果はエラーではなく
//! [`ChainVerificationResult`](crate::audit::verifier::ChainVerificationResult)
//! として返される。ここに並ぶのは書き込み・読み出しそのものの失敗のみ。

use thiserror::Error;

/// Ledger error type
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Validation error (missing required field, foreign tenant in a batch)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage error: transaction, lock acquisition or constraint failure.
    ///
    /// Nothing is persisted when this is returned and the call may be retried.
    #[error("Database error: {context}: {source}")]
    Database {
        /// What the ledger was doing when the storage layer failed
        context: &'static str,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// Schema migration failure
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored row could not be decoded
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord {
        /// Row identifier as stored
        id: String,
        /// Why decoding failed
        reason: String,
    },
}

impl LedgerError {
    /// Wraps a driver error with the operation that produced it.
    pub fn database(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Database { context, source }
    }

    /// Returns whether the caller may safely retry the operation.
    ///
    /// Storage failures abort the whole transaction, so a retry simply
    /// re-reads the latest chain state and appends after it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database { .. })
    }
}

/// Result alias used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;
