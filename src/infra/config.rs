use crate::types::{ConfigError, ConfigResult};
use std::env;
use std::time::Duration;

/// バックエンドURLを保持する環境変数（フロントエンドの.envと共通）
pub const BACKEND_URL_VAR: &str = "REACT_APP_BACKEND_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "KE_REQUEST_TIMEOUT_SECS";
pub const POLL_INTERVAL_VAR: &str = "KE_POLL_INTERVAL_SECS";
pub const JOB_TIMEOUT_VAR: &str = "KE_JOB_TIMEOUT_SECS";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;

/// .envファイルを読み込む
///
/// カレントディレクトリの`.env`、次に`frontend/.env`の順に探す。
/// 先に読み込んだ値が優先され、ファイルが無くてもエラーにはしない。
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_filename("frontend/.env");
}

/// Knowledge Engineへの接続設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// 末尾の`/`と`/api`を取り除いたベースURL
    pub base_url: String,
    /// 1リクエストあたりのタイムアウト
    pub request_timeout: Duration,
    /// ジョブステータスのポーリング間隔
    pub poll_interval: Duration,
    /// ジョブ完了待ちの上限時間
    pub job_timeout: Duration,
}

impl BackendConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を組み立てる
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_with_override(lookup, None)
    }

    /// CLI引数のURLを優先しつつ環境変数から設定を組み立てる
    ///
    /// `base_url_override`が指定された場合は`REACT_APP_BACKEND_URL`より優先する。
    pub fn from_lookup_with_override<F>(lookup: F, base_url_override: Option<&str>) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = match base_url_override {
            Some(url) => url.to_string(),
            None => lookup(BACKEND_URL_VAR)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::missing_env_var(BACKEND_URL_VAR))?,
        };

        let config = Self {
            base_url: normalize_base_url(&raw_url)?,
            request_timeout: read_secs(&lookup, REQUEST_TIMEOUT_VAR, DEFAULT_REQUEST_TIMEOUT_SECS)?,
            poll_interval: read_secs(&lookup, POLL_INTERVAL_VAR, DEFAULT_POLL_INTERVAL_SECS)?,
            job_timeout: read_secs(&lookup, JOB_TIMEOUT_VAR, DEFAULT_JOB_TIMEOUT_SECS)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// ベースURLだけを指定し、その他はデフォルト値で作成
    pub fn with_base_url(url: &str) -> ConfigResult<Self> {
        let config = Self {
            base_url: normalize_base_url(url)?,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            job_timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
        };
        config.validate()?;
        Ok(config)
    }

    /// APIパス（`/api/...`）から完全なURLを作る
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval > self.job_timeout {
            return Err(ConfigError::invalid_value(format!(
                "{}({}秒)が{}({}秒)を超えています",
                POLL_INTERVAL_VAR,
                self.poll_interval.as_secs(),
                JOB_TIMEOUT_VAR,
                self.job_timeout.as_secs()
            )));
        }
        Ok(())
    }
}

/// ベースURLを正規化する
/// スキームを検証し、末尾の`/`と`/api`を取り除く
fn normalize_base_url(raw: &str) -> ConfigResult<String> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::invalid_url(trimmed));
    }

    let mut url = trimmed.trim_end_matches('/');
    if let Some(stripped) = url.strip_suffix("/api") {
        url = stripped.trim_end_matches('/');
    }
    Ok(url.to_string())
}

fn read_secs<F>(lookup: &F, name: &str, default: u64) -> ConfigResult<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::invalid_duration(name, raw.trim()))?,
        _ => default,
    };
    if value == 0 {
        return Err(ConfigError::invalid_duration(name, "0"));
    }
    Ok(Duration::from_secs(value))
}
