use crate::infra::api::http::{post_json, HttpClient};
use crate::types::ApiResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const CLEANUP_PATH: &str = "/api/content/cleanup-formatting";

/// WYSIWYGクリーンアップの結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    #[serde(default)]
    pub cleanup_results: Map<String, Value>,
    /// 数値または`"87.5%"`のような文字列で返る
    #[serde(default)]
    pub success_rate: Value,
}

impl CleanupReport {
    /// 成功率（%）。解釈できなければNone
    pub fn success_rate(&self) -> Option<f64> {
        match &self.success_rate {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
            _ => None,
        }
    }

    /// 結果内の数値フィールドを取り出す（例: `articles_processed`）
    pub fn count(&self, key: &str) -> Option<u64> {
        self.cleanup_results.get(key).and_then(Value::as_u64)
    }
}

/// 記事HTMLの整形クリーンアップを実行する
///
/// `article_ids`が空の場合はバックエンド側で全記事が対象になる。
pub async fn cleanup_formatting<H: HttpClient + ?Sized>(
    client: &H,
    article_ids: &[String],
) -> ApiResult<CleanupReport> {
    post_json(client, CLEANUP_PATH, json!({ "article_ids": article_ids })).await
}
