//! 書き込み完了オブザーバー
//!
//! コミット後にエントリ単位で1回ずつ呼ばれる。通知は best-effort で、
//! エラーやパニックは握りつぶされ書き込み結果には影響しない。

use crate::audit::types::AuditEntry;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::warn;

/// オブザーバーのエラー
#[derive(Debug, Error)]
#[error("Observer error: {0}")]
pub struct ObserverError(pub String);

impl ObserverError {
    /// メッセージからエラーを作成
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// 書き込み完了通知の受け口
///
/// 呼び出しは書き込み元のタスク上で同期的に行われるため、
/// 重い処理はチャネル等で別タスクに渡すこと。
pub trait WriteObserver: Send + Sync {
    /// エントリのコミット後に呼ばれる
    fn on_written(&self, entry: &AuditEntry) -> Result<(), ObserverError>;
}

impl<F> WriteObserver for F
where
    F: Fn(&AuditEntry) -> Result<(), ObserverError> + Send + Sync,
{
    fn on_written(&self, entry: &AuditEntry) -> Result<(), ObserverError> {
        self(entry)
    }
}

/// オブザーバーを呼び出し、失敗はログのみ残して破棄する
pub(crate) fn notify(observer: &dyn WriteObserver, entry: &AuditEntry) {
    match catch_unwind(AssertUnwindSafe(|| observer.on_written(entry))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(
                tenant_id = %entry.tenant_id,
                sequence_number = entry.sequence_number,
                "Audit write observer failed: {}",
                e
            );
        }
        Err(_) => {
            warn!(
                tenant_id = %entry.tenant_id,
                sequence_number = entry.sequence_number,
                "Audit write observer panicked"
            );
        }
    }
}
