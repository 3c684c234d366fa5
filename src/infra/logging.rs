use crate::types::{InfraError, InfraResult};
use tracing_subscriber::EnvFilter;

/// tracingのサブスクライバーを初期化する
///
/// `RUST_LOG`が設定されていればそれを優先し、なければ`default_level`を使う。
/// ログは標準エラーへ出力し、標準出力は判定結果の表示に使う。
pub fn init(default_level: &str) -> InfraResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| InfraError::logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| InfraError::logging(e.to_string()))
}
