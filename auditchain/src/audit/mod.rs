//! 監査台帳
//!
//! テナント単位の追記専用ログを、SHA-256のハッシュチェーンで改ざん検知可能にする

/// 監査エントリの型定義
pub mod types;

/// SHA-256エントリハッシュ（チェーン連結）
pub mod hash_chain;

/// テナント排他キーの導出
pub mod lock_key;

/// 書き込み後オブザーバー
pub mod observer;

/// 直列化されたチェーン追記
pub mod writer;

/// チェーン整合性検証
pub mod verifier;

pub use types::{AuditEntry, ChainHead, NewAuditEntry, WriteReceipt};
pub use verifier::{ChainVerificationResult, ChainViolation, IntegrityVerifier, ViolationKind};
pub use writer::{AuditSink, AuditWriter};
