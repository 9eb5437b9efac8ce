//! Tamper-evident audit ledger
//!
//! テナントごとのハッシュチェーン付き監査台帳

#![warn(missing_docs)]

/// 共通型定義（エラー）
pub mod common;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// データベースアクセス
pub mod db;

/// 監査台帳（書き込み・検証）
pub mod audit;

/// ロギング初期化ユーティリティ
pub mod logging;

/// コマンドラインインターフェース
pub mod cli;

pub use common::error::{LedgerError, LedgerResult};
