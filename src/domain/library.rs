use crate::domain::content::{RunMarker, RUN_MARKER_KEY};
use crate::infra::api::http::{delete, get_json, post_json, put_json, HttpClient};
use crate::infra::parser::parse_date;
use crate::types::{ApiError, ApiResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const LIBRARY_PATH: &str = "/api/content-library";

/// マーカーを探すメタデータの深さ
const MARKER_SEARCH_DEPTH: usize = 3;

/// nullを型のデフォルト値として読む
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Content Libraryの記事（スキーマはバックエンド側が所有）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryArticle {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Mongoの`_id`がそのまま漏れている場合のみ存在する
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub raw_object_id: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub created_at: Option<Value>,
}

impl LibraryArticle {
    /// 作成日時。文字列は形式を問わず解析し、数値はUNIX秒とみなす
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        match self.created_at.as_ref()? {
            Value::String(s) => parse_date(s).ok(),
            Value::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
            _ => None,
        }
    }

    /// メタデータのどこかに実行マーカーが入っているか
    pub fn has_marker(&self, marker: &RunMarker) -> bool {
        contains_marker(&self.metadata, marker.as_str(), MARKER_SEARCH_DEPTH)
    }
}

fn contains_marker(value: &Value, marker: &str, depth: usize) -> bool {
    match value {
        Value::Object(map) => {
            if map.get(RUN_MARKER_KEY).and_then(Value::as_str) == Some(marker) {
                return true;
            }
            depth > 0 && map.values().any(|v| contains_marker(v, marker, depth - 1))
        }
        _ => false,
    }
}

/// `/api/content-library`のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub articles: Vec<LibraryArticle>,
}

impl Library {
    /// 総件数（`total`が無ければ記事数）
    pub fn total(&self) -> u64 {
        self.total.unwrap_or(self.articles.len() as u64)
    }

    /// 今回の実行で生成された記事
    pub fn produced_by_run(&self, marker: &RunMarker) -> Vec<&LibraryArticle> {
        self.articles.iter().filter(|a| a.has_marker(marker)).collect()
    }

    /// 指定時刻以降に作成された記事。日時が解析できない記事は含めない
    pub fn created_since(&self, since: DateTime<Utc>) -> Vec<&LibraryArticle> {
        self.articles
            .iter()
            .filter(|a| a.created_at_utc().map(|t| t >= since).unwrap_or(false))
            .collect()
    }

    /// IDで記事を探す
    pub fn find(&self, id: &str) -> Option<&LibraryArticle> {
        self.articles.iter().find(|a| a.id == id)
    }

    /// Mongoの`_id`が漏れている記事の数
    pub fn leaked_object_ids(&self) -> usize {
        self.articles
            .iter()
            .filter(|a| a.raw_object_id.is_some())
            .count()
    }
}

/// 大文字小文字と空白の違いを無視して、2回以上現れるタイトルを返す
pub fn duplicate_titles(articles: &[&LibraryArticle]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for article in articles {
        let key = article
            .title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if key.is_empty() {
            continue;
        }
        *counts.entry(key).or_insert(0) += 1;
    }
    counts.into_iter().filter(|(_, n)| *n > 1).collect()
}

/// ステータスごとの記事数
pub fn count_articles_by_status(articles: &[LibraryArticle]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for article in articles {
        let status = if article.status.is_empty() {
            "unknown".to_string()
        } else {
            article.status.clone()
        };
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

/// 新規作成する記事
#[derive(Debug, Clone, Serialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub status: String,
    pub tags: Vec<String>,
    pub metadata: Value,
}

/// 記事の部分更新
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArticleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

fn article_path(id: &str) -> String {
    format!("{}/{}", LIBRARY_PATH, id)
}

/// Content Libraryの全記事を取得する
pub async fn list_articles<H: HttpClient + ?Sized>(client: &H) -> ApiResult<Library> {
    get_json(client, LIBRARY_PATH).await
}

/// 記事を作成し、作成された記事を返す
///
/// レスポンスは`{"article": {...}}`形式とトップレベル形式の両方を受け付ける。
/// IDはトップレベルの`id`/`article_id`でも補う。
pub async fn create_article<H: HttpClient + ?Sized>(
    client: &H,
    article: &NewArticle,
) -> ApiResult<LibraryArticle> {
    let body = serde_json::to_value(article).map_err(|e| ApiError::decode("記事の作成", e))?;
    let response: Value = post_json(client, LIBRARY_PATH, body).await?;

    let article_value = response
        .get("article")
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(|| response.clone());
    let mut created: LibraryArticle = serde_json::from_value(article_value)
        .map_err(|e| ApiError::decode(LIBRARY_PATH, e))?;

    if created.id.is_empty() {
        created.id = ["id", "article_id"]
            .iter()
            .find_map(|key| response.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| ApiError::missing_field("id", "記事作成レスポンス"))?;
    }
    Ok(created)
}

/// 記事を更新する。レスポンスの内容は検証しない
pub async fn update_article<H: HttpClient + ?Sized>(
    client: &H,
    id: &str,
    update: &ArticleUpdate,
) -> ApiResult<()> {
    let body = serde_json::to_value(update).map_err(|e| ApiError::decode("記事の更新", e))?;
    let _: Value = put_json(client, &article_path(id), body).await?;
    Ok(())
}

/// 記事を削除する
pub async fn delete_article<H: HttpClient + ?Sized>(client: &H, id: &str) -> ApiResult<()> {
    delete(client, &article_path(id)).await
}

/// 一覧表示用のサマリ文字列
pub fn summarize_library(library: &Library) -> String {
    let by_status = count_articles_by_status(&library.articles)
        .into_iter()
        .map(|(status, n)| format!("{}={}", status, n))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Content Library: 総数{}件、取得{}件 ({})",
        library.total(),
        library.articles.len(),
        if by_status.is_empty() { "-".to_string() } else { by_status }
    )
}

/// テスト・デモ用に最小限の記事を作る
pub fn probe_article(marker: &RunMarker, title: &str) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        content: "<h2>Probe</h2><p>Created by knowledge-probe.</p>".to_string(),
        status: "draft".to_string(),
        tags: vec!["knowledge-probe".to_string()],
        metadata: marker.tag(json!({"source": "knowledge-probe"})),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::api::http::{Method, MockHttpClient, RequestBody};

    fn sample_library() -> Library {
        serde_json::from_value(json!({
            "total": 5,
            "articles": [
                {
                    "id": "a1", "title": "Getting Started", "content": "<p>x</p>",
                    "status": "published", "tags": ["guide"],
                    "metadata": {"probe_run_id": "run-1"},
                    "created_at": "2025-08-10T12:00:00Z"
                },
                {
                    "id": "a2", "title": "getting   started", "content": "<p>y</p>",
                    "status": "draft", "tags": null,
                    "metadata": {"source_document": {"probe_run_id": "run-1"}},
                    "created_at": "2025-08-10T12:05:00.123456+00:00"
                },
                {
                    "id": "a3", "title": "Billing", "content": null,
                    "status": "draft",
                    "metadata": {"probe_run_id": "other"},
                    "created_at": 1754740800
                },
                {
                    "_id": {"$oid": "66b7"}, "id": "a4", "title": "Legacy",
                    "metadata": null, "created_at": "not a date"
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_tolerant_deserialization() {
        let library = sample_library();
        assert_eq!(library.total(), 5);
        assert_eq!(library.articles.len(), 4);
        assert!(library.articles[1].tags.is_empty());
        assert!(library.articles[2].content.is_empty());
        assert_eq!(library.leaked_object_ids(), 1);

        let no_total = Library {
            total: None,
            articles: vec![LibraryArticle::default()],
        };
        assert_eq!(no_total.total(), 1);
    }

    #[test]
    fn test_produced_by_run() {
        let library = sample_library();
        let marker = RunMarker("run-1".to_string());
        let ids: Vec<&str> = library
            .produced_by_run(&marker)
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a1", "a2"]);
    }

    #[test]
    fn test_created_since() {
        let library = sample_library();
        let since = Utc.with_ymd_and_hms(2025, 8, 10, 12, 1, 0).unwrap();
        let ids: Vec<&str> = library
            .created_since(since)
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        // a3は2025-08-09、a4は日時不明なので除外
        assert_eq!(ids, vec!["a2"]);
    }

    #[test]
    fn test_created_since_naive_timestamps() {
        let library: Library = serde_json::from_value(json!({
            "articles": [
                {"id": "iso", "created_at": "2025-08-10T12:05:00.123456"},
                {"id": "spaced", "created_at": "2025-08-10 12:05:00.123456"},
                {"id": "before", "created_at": "2025-08-10T11:55:00"}
            ]
        }))
        .unwrap();
        let since = Utc.with_ymd_and_hms(2025, 8, 10, 12, 0, 0).unwrap();
        let ids: Vec<&str> = library
            .created_since(since)
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["iso", "spaced"]);
    }

    #[test]
    fn test_duplicate_titles() {
        let library = sample_library();
        let all: Vec<&LibraryArticle> = library.articles.iter().collect();
        assert_eq!(
            duplicate_titles(&all),
            vec![("getting started".to_string(), 2)]
        );
    }

    #[test]
    fn test_summarize_library() {
        let summary = summarize_library(&sample_library());
        assert!(summary.contains("総数5件"));
        assert!(summary.contains("draft=2"));
        assert!(summary.contains("unknown=1"));
    }

    #[tokio::test]
    async fn test_create_article_nested_response() {
        let client = MockHttpClient::new().with_json(
            Method::Post,
            LIBRARY_PATH,
            200,
            json!({"success": true, "article": {"id": "new-1", "title": "Probe"}}),
        );
        let marker = RunMarker("run-2".to_string());

        let created = create_article(&client, &probe_article(&marker, "Probe"))
            .await
            .unwrap();
        assert_eq!(created.id, "new-1");

        match &client.requests()[0].body {
            RequestBody::Json(body) => {
                assert_eq!(body["metadata"][RUN_MARKER_KEY], "run-2");
                assert_eq!(body["status"], "draft");
            }
            other => panic!("JSONで送るべき: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_article_id_only_response() {
        let client = MockHttpClient::new().with_json(
            Method::Post,
            LIBRARY_PATH,
            200,
            json!({"success": true, "article_id": "new-2"}),
        );
        let created = create_article(&client, &probe_article(&RunMarker("r".into()), "T"))
            .await
            .unwrap();
        assert_eq!(created.id, "new-2");
    }

    #[tokio::test]
    async fn test_create_article_without_id_fails() {
        let client =
            MockHttpClient::new().with_json(Method::Post, LIBRARY_PATH, 200, json!({"success": true}));
        let err = create_article(&client, &probe_article(&RunMarker("r".into()), "T"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete_paths() {
        let client = MockHttpClient::new()
            .with_json(Method::Put, "/api/content-library/a1", 200, json!({"success": true}))
            .with_text(Method::Delete, "/api/content-library/a1", 200, "");

        let update = ArticleUpdate {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        update_article(&client, "a1", &update).await.unwrap();
        delete_article(&client, "a1").await.unwrap();

        match &client.requests()[0].body {
            RequestBody::Json(body) => {
                assert_eq!(body, &json!({"title": "Renamed"}));
            }
            other => panic!("JSONで送るべき: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_missing_article() {
        let client = MockHttpClient::new();
        let err = delete_article(&client, "ghost").await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }
}
