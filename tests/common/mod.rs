//! Knowledge Engine API モックサーバー
//!
//! httpmockでバックエンドのREST APIを再現し、
//! 実際の`ReqwestHttpClient`を使った統合テストを外部通信なしで実行する。

#![allow(dead_code)]

use httpmock::prelude::*;
use knowledge_probe::infra::config::BackendConfig;
use serde_json::{json, Value};
use std::time::Duration;

/// Knowledge Engine APIのモックサーバー
pub struct KnowledgeEngineMockServer {
    server: MockServer,
}

impl KnowledgeEngineMockServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start_async().await,
        }
    }

    /// モックサーバー向けの設定。ポーリングは短い間隔にする
    pub fn config(&self) -> BackendConfig {
        let mut config = BackendConfig::with_base_url(&self.server.base_url())
            .expect("モックサーバーのURLは正しい形式");
        config.poll_interval = Duration::from_millis(50);
        config.job_timeout = Duration::from_secs(2);
        config
    }

    pub fn url(&self) -> String {
        self.server.base_url()
    }

    /// ヘルスチェックの応答をモック
    pub async fn mock_health(&self, status: &str) {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path("/api/health");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "status": status,
                        "services": {"mongodb": "connected", "openai": "configured"}
                    }));
            })
            .await;
    }

    /// テキスト処理APIがジョブを受け付ける
    pub async fn mock_process_accepts(&self, job_id: &str) -> httpmock::Mock<'_> {
        self.server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/content/process")
                    .body_contains("probe_run_id");
                then.status(200).json_body(json!({"job_id": job_id, "status": "queued"}));
            })
            .await
    }

    /// アップロードAPIがジョブを受け付ける
    pub async fn mock_upload_accepts(&self, job_id: &str, expected_file_name: &str) -> httpmock::Mock<'_> {
        let file_name = format!("filename=\"{}\"", expected_file_name);
        self.server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/content/upload")
                    .body_contains(&file_name)
                    .body_contains("probe_run_id");
                then.status(200).json_body(json!({"job_id": job_id}));
            })
            .await
    }

    /// ジョブ状態の応答をモック
    pub async fn mock_job(&self, job_id: &str, body: Value) -> httpmock::Mock<'_> {
        let path = format!("/api/jobs/{}", job_id);
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(&path);
                then.status(200).json_body(body);
            })
            .await
    }

    /// Content Libraryの一覧をモック
    pub async fn mock_library(&self, articles: Value) {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path("/api/content-library");
                then.status(200).json_body(json!({ "articles": articles }));
            })
            .await;
    }

    /// 任意のパスでステータスエラーを返す
    pub async fn mock_error(&self, method: httpmock::Method, path: &str, status: u16) {
        self.server
            .mock_async(|when, then| {
                when.method(method).path(path);
                then.status(status).body("error");
            })
            .await;
    }
}

/// 実行開始より後の作成日時を持つ記事
///
/// マーカーはテスト側から分からないため、作成日時による選別で拾われるようにする。
pub fn future_article(id: &str, title: &str, content: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "content": content,
        "status": "published",
        "created_at": "2099-01-01T00:00:00Z"
    })
}
