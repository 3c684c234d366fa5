use thiserror::Error;

/// 接続設定の読み込みと検証で発生するエラー
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// 環境変数が未設定（空文字列も未設定として扱う）
    #[error("環境変数が設定されていません: {name}")]
    MissingEnvironmentVariable { name: String },

    /// バックエンドURLの形式が不正
    #[error("バックエンドURLはhttp://またはhttps://で始まる必要があります: {url}")]
    InvalidUrl { url: String },

    /// 秒数として解釈できない、または0
    #[error("{name}は1以上の整数（秒）である必要があります: {value}")]
    InvalidDuration { name: String, value: String },

    /// 値同士の組み合わせが不正
    #[error("設定値が不正です: {reason}")]
    InvalidValue { reason: String },
}

impl ConfigError {
    pub fn missing_env_var<N: Into<String>>(name: N) -> Self {
        Self::MissingEnvironmentVariable { name: name.into() }
    }

    pub fn invalid_url<U: Into<String>>(url: U) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    pub fn invalid_duration<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::InvalidDuration {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn invalid_value<R: Into<String>>(reason: R) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
