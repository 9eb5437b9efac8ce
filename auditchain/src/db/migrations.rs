//! データベース接続とマイグレーション

use crate::common::error::{LedgerError, LedgerResult};
use crate::config::LedgerConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// SQLite接続プールを作成してマイグレーションを実行
///
/// ファイルDBの場合は親ディレクトリとファイルを作成し、WALモードで開く。
/// `lock_timeout` は busy timeout として使われ、テナント排他行の待機上限になる。
pub async fn initialize_database(config: &LedgerConfig) -> LedgerResult<SqlitePool> {
    ensure_parent_dir(&config.database_url)?;

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LedgerError::database("Invalid database URL"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.lock_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(LedgerError::database("Failed to connect to database"))?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// マイグレーションを実行（sqlx::migrate!マクロを使用）
pub async fn run_migrations(pool: &SqlitePool) -> LedgerResult<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// SQLiteファイルはディレクトリが存在しないと作成できないため、先に作成しておく
fn ensure_parent_dir(database_url: &str) -> LedgerResult<()> {
    let Some(path) = database_url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    // `sqlite::memory:` のような特殊指定はスキップ
    if path.starts_with(':') {
        return Ok(());
    }
    let normalized = path.trim_start_matches("//");
    let path_without_params = normalized.split('?').next().unwrap_or(normalized);
    if let Some(parent) = std::path::Path::new(path_without_params).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Config(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}
