use crate::infra::api::http::{get_json, HttpClient};
use crate::infra::config::BackendConfig;
use crate::types::{ApiResult, ProbeExit};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// バックエンドのジョブ状態
///
/// バックエンドのバージョンによって表記揺れがあるため、
/// 既知の別名は4状態に寄せ、それ以外は`Other`として保持する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl JobStatus {
    /// これ以上状態が変わらないか
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Other(String::new())
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" => JobStatus::Queued,
            "processing" | "running" | "in_progress" => JobStatus::Processing,
            "completed" | "complete" | "succeeded" => JobStatus::Completed,
            "failed" | "error" => JobStatus::Failed,
            _ => JobStatus::Other(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// `/api/jobs/{job_id}`のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub chunks_created: Option<u64>,
    #[serde(default)]
    pub articles_generated: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    /// 進捗（形式はバックエンド次第なのでそのまま保持する）
    #[serde(default)]
    pub progress: Option<Value>,
}

impl fmt::Display for JobSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job={} status={} chunks={} articles={}",
            self.job_id,
            self.status,
            self.chunks_created.unwrap_or(0),
            self.articles_generated.unwrap_or(0)
        )?;
        if let Some(ref error) = self.error {
            write!(f, " error={}", error)?;
        }
        Ok(())
    }
}

/// ポーリング方針。固定間隔でバックオフはしない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            interval: config.poll_interval,
            timeout: config.job_timeout,
        }
    }
}

/// ジョブ待ちの結果
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(JobSnapshot),
    Failed(JobSnapshot),
    TimedOut {
        last: Option<JobSnapshot>,
        elapsed: Duration,
    },
}

impl JobOutcome {
    /// 完了していればそのスナップショット
    pub fn completed(&self) -> Option<&JobSnapshot> {
        match self {
            JobOutcome::Completed(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// 結果に対応する終了コード
    pub fn exit(&self) -> ProbeExit {
        match self {
            JobOutcome::Completed(_) => ProbeExit::Success,
            JobOutcome::Failed(_) => ProbeExit::JobFailed,
            JobOutcome::TimedOut { .. } => ProbeExit::JobTimedOut,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Completed(s) => write!(f, "完了: {}", s),
            JobOutcome::Failed(s) => write!(f, "失敗: {}", s),
            JobOutcome::TimedOut { last, elapsed } => {
                write!(f, "タイムアウト: {}秒経過", elapsed.as_secs())?;
                if let Some(last) = last {
                    write!(f, " (最終状態 {})", last)?;
                }
                Ok(())
            }
        }
    }
}

/// アップロード・テキスト処理APIが返すチケット
#[derive(Debug, Clone, PartialEq)]
pub enum JobTicket {
    /// 非同期ジョブとして受け付けられた
    Queued(String),
    /// ジョブIDなしで処理結果が直接返された
    Immediate(JobSnapshot),
}

pub fn job_path(job_id: &str) -> String {
    format!("/api/jobs/{}", job_id)
}

/// ジョブの現在の状態を取得する
pub async fn fetch_job<H: HttpClient + ?Sized>(client: &H, job_id: &str) -> ApiResult<JobSnapshot> {
    let mut snapshot: JobSnapshot = get_json(client, &job_path(job_id)).await?;
    if snapshot.job_id.is_empty() {
        snapshot.job_id = job_id.to_string();
    }
    Ok(snapshot)
}

/// ジョブが終了するかタイムアウトするまで固定間隔でポーリングする
///
/// 戻るのは遅くとも`timeout`経過後の1リクエスト分まで。
/// 通信エラーと5xxは警告を出して続行し、4xxや解析エラーは即座に返す。
pub async fn poll_job<H: HttpClient + ?Sized>(
    client: &H,
    job_id: &str,
    policy: PollPolicy,
) -> ApiResult<JobOutcome> {
    let start = Instant::now();
    let mut last: Option<JobSnapshot> = None;
    let mut attempt: u32 = 0;

    info!(job_id, timeout_secs = policy.timeout.as_secs(), "ジョブのポーリング開始");

    loop {
        attempt += 1;
        match fetch_job(client, job_id).await {
            Ok(snapshot) => {
                debug!(
                    job_id,
                    attempt,
                    status = %snapshot.status,
                    progress = ?snapshot.progress,
                    "ジョブ状態を取得"
                );
                let changed = last.as_ref().map(|l| l.status != snapshot.status).unwrap_or(true);
                if changed {
                    info!(
                        job_id,
                        status = %snapshot.status,
                        chunks = snapshot.chunks_created.unwrap_or(0),
                        elapsed_secs = start.elapsed().as_secs(),
                        "ジョブ状態が変化"
                    );
                }
                match snapshot.status {
                    JobStatus::Completed => return Ok(JobOutcome::Completed(snapshot)),
                    JobStatus::Failed => return Ok(JobOutcome::Failed(snapshot)),
                    _ => last = Some(snapshot),
                }
            }
            Err(e) if e.is_critical() => {
                warn!(job_id, attempt, error = %e, "ジョブ状態の取得に失敗、ポーリングを続行");
            }
            Err(e) => return Err(e),
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.timeout {
            warn!(job_id, elapsed_secs = elapsed.as_secs(), "ジョブ待ちがタイムアウト");
            return Ok(JobOutcome::TimedOut { last, elapsed });
        }
        sleep(policy.interval.min(policy.timeout - elapsed)).await;
    }
}

/// チケットを最終結果まで解決する。即時結果ならポーリングしない
pub async fn await_ticket<H: HttpClient + ?Sized>(
    client: &H,
    ticket: JobTicket,
    policy: PollPolicy,
) -> ApiResult<JobOutcome> {
    match ticket {
        JobTicket::Queued(job_id) => poll_job(client, &job_id, policy).await,
        JobTicket::Immediate(snapshot) => Ok(match snapshot.status {
            JobStatus::Failed => JobOutcome::Failed(snapshot),
            _ => JobOutcome::Completed(snapshot),
        }),
    }
}
