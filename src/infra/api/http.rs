use crate::infra::config::BackendConfig;
use crate::types::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// HTTPメソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        write!(f, "{}", s)
    }
}

/// multipart/form-dataで送るファイルと付随フィールド
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartForm {
    pub file_field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub fields: Vec<(String, String)>,
}

/// リクエストボディ
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// APIリクエスト。パスはベースURLからの相対（`/api/...`）
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    /// 指定しない場合はクライアントのデフォルトを使う
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str, body: RequestBody) -> Self {
        Self {
            method,
            path: path.to_string(),
            body,
            timeout: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path, RequestBody::Empty)
    }

    pub fn post_json(path: &str, body: Value) -> Self {
        Self::new(Method::Post, path, RequestBody::Json(body))
    }

    pub fn put_json(path: &str, body: Value) -> Self {
        Self::new(Method::Put, path, RequestBody::Json(body))
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::Delete, path, RequestBody::Empty)
    }

    pub fn multipart(path: &str, form: MultipartForm) -> Self {
        Self::new(Method::Post, path, RequestBody::Multipart(form))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// APIレスポンス（ステータスとボディ文字列）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 2xx以外をApiError::Statusに変換する
    pub fn ensure_success(self, path: &str) -> ApiResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::status(path, self.status, &self.body))
        }
    }

    /// ボディをJSONとして解析する。空ボディはnullとして扱う
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> ApiResult<T> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| ApiError::decode(context, e))
    }
}

/// HTTPクライアントの抽象化トレイト
///
/// このトレイトは、実際のHTTP通信とモック実装の両方を
/// 統一的に扱えるようにするためのインターフェースです。
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// リクエストを送信し、ステータスに関わらずレスポンスを返す
    ///
    /// レスポンスを受け取れなかった場合のみ`ApiError::Transport`を返す。
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse>;
}

/// GETしてJSONとして解析する
pub async fn get_json<H, T>(client: &H, path: &str) -> ApiResult<T>
where
    H: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let response = client.send(ApiRequest::get(path)).await?;
    response.ensure_success(path)?.json(path)
}

/// JSONをPOSTしてレスポンスを解析する
pub async fn post_json<H, T>(client: &H, path: &str, body: Value) -> ApiResult<T>
where
    H: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let response = client.send(ApiRequest::post_json(path, body)).await?;
    response.ensure_success(path)?.json(path)
}

/// JSONをPUTしてレスポンスを解析する
pub async fn put_json<H, T>(client: &H, path: &str, body: Value) -> ApiResult<T>
where
    H: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let response = client.send(ApiRequest::put_json(path, body)).await?;
    response.ensure_success(path)?.json(path)
}

/// DELETEを送る。ボディは検証しない
pub async fn delete<H>(client: &H, path: &str) -> ApiResult<()>
where
    H: HttpClient + ?Sized,
{
    client
        .send(ApiRequest::delete(path))
        .await?
        .ensure_success(path)?;
    Ok(())
}

/// multipart/form-dataでPOSTしてレスポンスを解析する
pub async fn post_multipart<H, T>(
    client: &H,
    path: &str,
    form: MultipartForm,
    timeout: Option<Duration>,
) -> ApiResult<T>
where
    H: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let mut request = ApiRequest::multipart(path, form);
    request.timeout = timeout;
    let response = client.send(request).await?;
    response.ensure_success(path)?.json(path)
}

/// `reqwest` を使用した本番用のHTTPクライアント実装
pub struct ReqwestHttpClient {
    client: Client,
    config: BackendConfig,
}

impl ReqwestHttpClient {
    /// 設定のベースURLとリクエストタイムアウトでクライアントを作成
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.config.api_url(&request.path);
        let method = request.method;
        let path = request.path;
        let timeout = request.timeout.unwrap_or(self.config.request_timeout);

        let builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        }
        .timeout(timeout);

        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => {
                let part = Part::bytes(form.bytes)
                    .file_name(form.file_name)
                    .mime_str(&form.content_type)
                    .map_err(|e| {
                        ApiError::transport(method.to_string(), path.clone(), e.to_string())
                    })?;
                let mut multipart = Form::new().part(form.file_field, part);
                for (name, value) in form.fields {
                    multipart = multipart.text(name, value);
                }
                builder.multipart(multipart)
            }
        };

        debug!(%method, path = %path, timeout_secs = timeout.as_secs(), "リクエスト送信");

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::transport(method.to_string(), path.clone(), e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(method.to_string(), path.clone(), e.to_string()))?;

        debug!(%method, path = %path, status, bytes = body.len(), "レスポンス受信");
        Ok(ApiResponse { status, body })
    }
}

/// モックが返す応答
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(ApiResponse),
    TransportError(String),
}

/// テスト用のモックHTTPクライアント
///
/// この実装はテスト時にDIされ、実際のHTTPリクエストを行わずに
/// `(メソッド, パス)`ごとに登録された応答を順に返します。
/// 最後の応答は繰り返し返し、未登録のパスには404を返します。
/// 送られたリクエストはすべて記録されます。
#[derive(Default)]
pub struct MockHttpClient {
    routes: Mutex<HashMap<(Method, String), VecDeque<MockReply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON応答を追加（ビルダー形式）
    pub fn with_json(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.push(
            method,
            path,
            MockReply::Response(ApiResponse::new(status, &body.to_string())),
        );
        self
    }

    /// 文字列応答を追加（ビルダー形式）
    pub fn with_text(self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.push(method, path, MockReply::Response(ApiResponse::new(status, body)));
        self
    }

    /// 通信エラーを追加（ビルダー形式）
    pub fn with_transport_error(self, method: Method, path: &str, message: &str) -> Self {
        self.push(method, path, MockReply::TransportError(message.to_string()));
        self
    }

    /// 応答をキューの末尾に追加
    pub fn push(&self, method: Method, path: &str, reply: MockReply) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// 記録されたリクエスト一覧
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 指定ルートへのリクエスト回数
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let key = (request.method, request.path.clone());
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let reply = {
            let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::TransportError(message)) => Err(ApiError::transport(
                request.method.to_string(),
                request.path,
                format!("モックHTTPエラー: {}", message),
            )),
            None => Ok(ApiResponse::new(404, r#"{"detail":"Not Found"}"#)),
        }
    }
}
