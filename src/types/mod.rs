//! 型定義モジュール
//!
//! アプリケーション全体で使用される共通的な型定義を管理します。
//! - エラー型: 設定・API・インフラの各層
//! - 終了コード: プローブ結果の重大度

pub mod config;
pub mod error;
pub mod infra;
pub mod result;

// 便利な再エクスポート
pub use config::{ConfigError, ConfigResult};
pub use error::{ApiError, ApiResult};
pub use infra::{InfraError, InfraResult};
pub use result::ProbeExit;
