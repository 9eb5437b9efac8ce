//! 統合テスト共通ヘルパー

#![allow(dead_code)]

use auditchain::audit::{AuditWriter, IntegrityVerifier};
use auditchain::config::LedgerConfig;
use auditchain::db::{audit_log::AuditLogStorage, initialize_database};
use sqlx::SqlitePool;
use std::time::Duration;
use tempfile::TempDir;

/// ファイルDBを使うテスト環境（TempDirはテスト終了まで保持する）
pub struct TestLedger {
    pub dir: TempDir,
    pub config: LedgerConfig,
    pub pool: SqlitePool,
    pub storage: AuditLogStorage,
}

impl TestLedger {
    pub fn writer(&self) -> AuditWriter {
        AuditWriter::new(self.storage.clone())
    }

    pub fn verifier(&self) -> IntegrityVerifier {
        IntegrityVerifier::new(self.storage.clone())
    }
}

/// 複数接続を持つファイルDBを作成する（並行書き込みテスト用）
pub async fn file_ledger(max_connections: u32) -> TestLedger {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite:{}", dir.path().join("ledger.db").display());
    let config = LedgerConfig {
        database_url: url,
        max_connections,
        lock_timeout: Duration::from_secs(10),
        acquire_timeout: Duration::from_secs(30),
    };
    let pool = initialize_database(&config)
        .await
        .expect("Failed to initialize test database");
    let storage = AuditLogStorage::new(pool.clone());
    TestLedger {
        dir,
        config,
        pool,
        storage,
    }
}

/// 追記専用トリガーを外す（改ざんシナリオ用）
pub async fn drop_append_only_guards(pool: &SqlitePool) {
    for trigger in ["audit_entries_no_update", "audit_entries_no_delete"] {
        sqlx::query(&format!("DROP TRIGGER IF EXISTS {}", trigger))
            .execute(pool)
            .await
            .expect("Failed to drop trigger");
    }
}

/// 指定アクションの挿入を失敗させるトリガーを仕込む
pub async fn install_insert_failure(pool: &SqlitePool, action: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_marked_insert BEFORE INSERT ON audit_entries \
         WHEN NEW.action = '{}' \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
        action
    );
    sqlx::query(&sql)
        .execute(pool)
        .await
        .expect("Failed to install failure trigger");
}
