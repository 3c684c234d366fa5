//! ドキュメント投入API
//!
//! ファイルアップロードとテキスト処理の2経路を扱い、
//! どちらもジョブチケットを返す。投入するたびに実行マーカーを
//! メタデータへ埋め込み、生成された記事を後から特定できるようにする。

use crate::domain::job::{JobSnapshot, JobTicket};
use crate::infra::api::http::{post_json, post_multipart, HttpClient, MultipartForm};
use crate::infra::storage::file::{file_name_of, load_bytes};
use crate::types::{ApiError, ApiResult};
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, warn};

pub const UPLOAD_PATH: &str = "/api/content/upload";
pub const PROCESS_PATH: &str = "/api/content/process";
/// `/api/content/process`を持たないバックエンド向けの別名
pub const PROCESS_TEXT_PATH: &str = "/api/content/process-text";

/// 実行マーカーを入れるメタデータのキー
pub const RUN_MARKER_KEY: &str = "probe_run_id";

/// 1回のプローブ実行を識別するマーカー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMarker(pub String);

impl RunMarker {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 既存のメタデータにマーカーを追加する（オブジェクト以外は置き換える）
    pub fn tag(&self, metadata: Value) -> Value {
        let mut map = match metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert(RUN_MARKER_KEY.to_string(), Value::String(self.0.clone()));
        Value::Object(map)
    }
}

/// 投入APIのレスポンスをチケットに変換する
///
/// `job_id`があれば非同期ジョブ、なければ終了状態の`status`を
/// 即時結果として扱う。どちらも無ければ`MissingField`。
pub fn ticket_from_response(value: Value, context: &str) -> ApiResult<JobTicket> {
    if let Some(job_id) = value.get("job_id").and_then(job_id_string) {
        return Ok(JobTicket::Queued(job_id));
    }

    let snapshot: JobSnapshot =
        serde_json::from_value(value).map_err(|e| ApiError::decode(context, e))?;
    if snapshot.status.is_terminal() {
        Ok(JobTicket::Immediate(snapshot))
    } else {
        Err(ApiError::missing_field("job_id", context))
    }
}

fn job_id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// ファイルをmultipartでアップロードする
///
/// `file`フィールドにファイル本体、`metadata`フィールドにJSON文字列を送る。
/// MIMEタイプは拡張子から推定する。
pub async fn upload_file<H: HttpClient + ?Sized>(
    client: &H,
    file_path: &str,
    metadata: Value,
    timeout: Option<Duration>,
) -> Result<JobTicket> {
    let bytes = load_bytes(file_path).context("アップロードするファイルの読み込みに失敗")?;
    let file_name = file_name_of(file_path);
    let content_type = mime_guess::from_path(file_path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    info!(file = %file_name, bytes = bytes.len(), %content_type, "ファイルをアップロード");

    let form = MultipartForm {
        file_field: "file".to_string(),
        file_name,
        content_type,
        bytes,
        fields: vec![("metadata".to_string(), metadata.to_string())],
    };

    let response: Value = post_multipart(client, UPLOAD_PATH, form, timeout)
        .await
        .with_context(|| format!("ファイルのアップロードに失敗: {}", file_path))?;
    Ok(ticket_from_response(response, UPLOAD_PATH)?)
}

/// テキストを処理APIへ送る
///
/// `/api/content/process`が404か405を返した場合は、
/// 同じボディで`/api/content/process-text`へ送り直す。
pub async fn process_text<H: HttpClient + ?Sized>(
    client: &H,
    content: &str,
    metadata: Value,
) -> ApiResult<JobTicket> {
    info!(chars = content.chars().count(), "テキストを処理APIへ送信");
    let body = json!({
        "content": content,
        "content_type": "text",
        "metadata": metadata,
    });

    match post_json::<_, Value>(client, PROCESS_PATH, body.clone()).await {
        Ok(response) => ticket_from_response(response, PROCESS_PATH),
        Err(e) if matches!(e.status_code(), Some(404) | Some(405)) => {
            warn!(status = ?e.status_code(), "{}が使えないため{}へ送信", PROCESS_PATH, PROCESS_TEXT_PATH);
            let response: Value = post_json(client, PROCESS_TEXT_PATH, body).await?;
            ticket_from_response(response, PROCESS_TEXT_PATH)
        }
        Err(e) => Err(e),
    }
}
