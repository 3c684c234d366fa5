use thiserror::Error;

/// Knowledge Engine API呼び出しのエラー型
///
/// 一過性のエラー（接続失敗・タイムアウト・502/503/504）と
/// 恒久的なエラー（4xx・想定外のJSON）を区別できるようにしている。
#[derive(Error, Debug)]
pub enum ApiError {
    /// 接続失敗やタイムアウトなど、レスポンスを受け取れなかった
    #[error("通信エラー: {method} {path} - {message}")]
    Transport {
        method: String,
        path: String,
        message: String,
    },

    /// 2xx以外のステータスコード
    #[error("HTTPエラー: {path} - ステータス{status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    /// レスポンスのJSONが想定した形式ではない
    #[error("レスポンス解析エラー: {context} - {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// 必須フィールドが欠けている
    #[error("必須フィールドがありません: {field} ({context})")]
    MissingField { field: String, context: String },
}

impl ApiError {
    /// 通信エラーを作成
    pub fn transport<M, P, S>(method: M, path: P, message: S) -> Self
    where
        M: Into<String>,
        P: Into<String>,
        S: Into<String>,
    {
        Self::Transport {
            method: method.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// ステータスエラーを作成。ボディは長すぎる場合に切り詰める
    pub fn status<P: Into<String>>(path: P, status: u16, body: &str) -> Self {
        Self::Status {
            path: path.into(),
            status,
            body: truncate_body(body, 300),
        }
    }

    /// 解析エラーを作成
    pub fn decode<C: Into<String>>(context: C, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    /// 必須フィールド欠落エラーを作成
    pub fn missing_field<F: Into<String>, C: Into<String>>(field: F, context: C) -> Self {
        Self::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// HTTPステータスコード（ステータスエラーの場合のみ）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 待てば回復する可能性のあるエラーかどうか
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// バックエンド自体が利用不能とみなすべきエラーかどうか（通信エラーまたは5xx）
    pub fn is_critical(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// API呼び出しのResult型エイリアス
pub type ApiResult<T> = std::result::Result<T, ApiError>;

fn truncate_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let head: String = body.chars().take(max_chars).collect();
    format!("{}...", head)
}
