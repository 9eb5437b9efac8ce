//! データベースアクセス層
//!
//! SQLiteベースの監査台帳永続化

/// 監査台帳ストレージ
pub mod audit_log;

/// 接続・マイグレーション
pub mod migrations;

pub use migrations::initialize_database;
