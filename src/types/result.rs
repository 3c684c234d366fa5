use super::{ApiError, ConfigError, InfraError};
use serde::Serialize;
use std::fmt;

/// プロセスの終了コード
///
/// 重大度の順に並んでおり、複数の結果をまとめる場合は最大値を採用する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ProbeExit {
    /// 全チェック合格
    Success,
    /// ヒューリスティックチェックの不合格
    ChecksFailed,
    /// バックエンドのジョブが failed で終了
    JobFailed,
    /// ジョブが制限時間内に終わらなかった
    JobTimedOut,
    /// バックエンドに到達できない、5xx、ヘルスチェック不合格、または接続設定の誤り
    BackendUnavailable,
}

impl ProbeExit {
    /// プロセス終了コードに変換
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ChecksFailed => 1,
            Self::JobFailed => 2,
            Self::JobTimedOut => 3,
            Self::BackendUnavailable => 4,
        }
    }

    /// 複数の終了コードのうち最も重大なものを返す（空ならSuccess）
    pub fn worst<I: IntoIterator<Item = ProbeExit>>(exits: I) -> Self {
        exits.into_iter().max().unwrap_or(Self::Success)
    }

    /// APIエラーの重大度。5xxと通信エラーはバックエンド利用不可として扱う
    pub fn from_api_error(error: &ApiError) -> Self {
        if error.is_critical() {
            Self::BackendUnavailable
        } else {
            Self::ChecksFailed
        }
    }

    /// anyhowのエラーチェーンからAPIエラーを探して重大度を決める
    ///
    /// 接続設定のエラーはバックエンドに到達できないものとして扱う。
    pub fn from_error(error: &anyhow::Error) -> Self {
        let misconfigured = error.chain().any(|cause| {
            cause.is::<ConfigError>()
                || matches!(cause.downcast_ref::<InfraError>(), Some(InfraError::Config(_)))
        });
        if misconfigured {
            return Self::BackendUnavailable;
        }

        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<ApiError>())
            .map(Self::from_api_error)
            .unwrap_or(Self::ChecksFailed)
    }
}

impl fmt::Display for ProbeExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "成功",
            Self::ChecksFailed => "チェック不合格",
            Self::JobFailed => "ジョブ失敗",
            Self::JobTimedOut => "ジョブタイムアウト",
            Self::BackendUnavailable => "バックエンド利用不可",
        };
        write!(f, "{} (exit {})", label, self.code())
    }
}
