use crate::domain::content::RunMarker;
use crate::domain::inspect::{count_tag, word_count};
use crate::domain::library::{
    create_article, delete_article, list_articles, probe_article, summarize_library,
    update_article, ArticleUpdate,
};
use crate::domain::report::{CheckResult, ProbeReport};
use crate::infra::api::http::HttpClient;
use crate::types::{ApiResult, ProbeExit};
use tracing::{info, warn};

/// `library list`で表示する既定の件数
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Content Libraryの概要と先頭の記事を表示する
///
/// Mongoの`_id`がレスポンスに漏れていないかも確認する。
pub async fn list_library<H: HttpClient + ?Sized>(client: &H, limit: Option<usize>) -> ProbeReport {
    let mut report = ProbeReport::new("library list");

    let library = match list_articles(client).await {
        Ok(library) => library,
        Err(e) => {
            report.abort(ProbeExit::from_api_error(&e), e.to_string());
            return report;
        }
    };

    println!("{}", summarize_library(&library));
    for article in library.articles.iter().take(limit.unwrap_or(DEFAULT_LIST_LIMIT)) {
        println!(
            "  {} [{}] {} (words={}, hr={})",
            article.id,
            if article.status.is_empty() { "-" } else { article.status.as_str() },
            article.title,
            word_count(&article.content),
            count_tag(&article.content, "hr"),
        );
    }

    let leaked = library.leaked_object_ids();
    report.record(CheckResult::check(
        "object_id_serialization",
        leaked == 0,
        format!("_idを含む記事{}件", leaked),
    ));
    report
}

/// 記事の作成 → 一覧で確認 → 更新 → 削除 を一通り行う
pub async fn roundtrip<H: HttpClient + ?Sized>(client: &H) -> ProbeReport {
    roundtrip_with_marker(client, &RunMarker::generate()).await
}

pub async fn roundtrip_with_marker<H: HttpClient + ?Sized>(
    client: &H,
    marker: &RunMarker,
) -> ProbeReport {
    println!("--- Content Library ラウンドトリップ開始 ---");
    let mut report = ProbeReport::new("library roundtrip");
    let title = format!("knowledge-probe roundtrip {}", marker.as_str());

    let created = match create_article(client, &probe_article(marker, &title)).await {
        Ok(created) => created,
        Err(e) => {
            report.abort(ProbeExit::from_api_error(&e), format!("記事の作成に失敗: {}", e));
            return report;
        }
    };
    report.record(CheckResult::pass("create", format!("id={}", created.id)));

    if let Err(e) = verify_lifecycle(client, &mut report, &created.id, &title).await {
        report.abort(ProbeExit::from_api_error(&e), e.to_string());
        // 途中で止まった場合も作成した記事は残さない
        if let Err(cleanup_error) = delete_article(client, &created.id).await {
            warn!(id = %created.id, error = %cleanup_error, "テスト記事の削除に失敗");
        }
    }

    println!("--- Content Library ラウンドトリップ完了 ---");
    report
}

async fn verify_lifecycle<H: HttpClient + ?Sized>(
    client: &H,
    report: &mut ProbeReport,
    id: &str,
    title: &str,
) -> ApiResult<()> {
    let library = list_articles(client).await?;
    report.record(CheckResult::check(
        "list",
        library.find(id).is_some(),
        format!("作成した記事{}が一覧に{}", id, presence(library.find(id).is_some())),
    ));

    let updated_title = format!("{} (updated)", title);
    let update = ArticleUpdate {
        title: Some(updated_title.clone()),
        status: Some("published".to_string()),
        ..Default::default()
    };
    update_article(client, id, &update).await?;
    let library = list_articles(client).await?;
    let current_title = library.find(id).map(|a| a.title.clone()).unwrap_or_default();
    report.record(CheckResult::check(
        "update",
        current_title == updated_title,
        format!("タイトル: \"{}\"", current_title),
    ));

    delete_article(client, id).await?;
    info!(id, "テスト記事を削除");
    let library = list_articles(client).await?;
    let still_listed = library.find(id).is_some();
    report.record(CheckResult::check(
        "delete",
        !still_listed,
        format!("削除後の一覧に{}", presence(still_listed)),
    ));
    Ok(())
}

fn presence(found: bool) -> &'static str {
    if found {
        "存在する"
    } else {
        "存在しない"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::library::LIBRARY_PATH;
    use crate::infra::api::http::{Method, MockHttpClient, RequestBody};
    use serde_json::json;

    const TITLE: &str = "knowledge-probe roundtrip rt-1";

    fn marker() -> RunMarker {
        RunMarker("rt-1".to_string())
    }

    fn article_path() -> String {
        format!("{}/new-1", LIBRARY_PATH)
    }

    #[tokio::test]
    async fn test_roundtrip_success() {
        let client = MockHttpClient::new()
            .with_json(
                Method::Post,
                LIBRARY_PATH,
                201,
                json!({"article": {"id": "new-1", "title": TITLE}}),
            )
            .with_json(
                Method::Get,
                LIBRARY_PATH,
                200,
                json!({"articles": [{"id": "new-1", "title": TITLE}]}),
            )
            .with_json(
                Method::Get,
                LIBRARY_PATH,
                200,
                json!({"articles": [{"id": "new-1", "title": format!("{} (updated)", TITLE)}]}),
            )
            .with_json(Method::Get, LIBRARY_PATH, 200, json!({"articles": []}))
            .with_json(Method::Put, &article_path(), 200, json!({"success": true}))
            .with_json(Method::Delete, &article_path(), 200, json!({"success": true}));

        let report = roundtrip_with_marker(&client, &marker()).await;

        assert!(report.is_success(), "{:?}", report.checks);
        let names: Vec<&str> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["create", "list", "update", "delete"]);

        let requests = client.requests();
        match &requests[0].body {
            RequestBody::Json(body) => {
                assert_eq!(body["title"], TITLE);
                assert_eq!(body["metadata"]["probe_run_id"], "rt-1");
            }
            other => panic!("JSONボディになるべき: {:?}", other),
        }
        assert_eq!(client.request_count(Method::Delete, &article_path()), 1);
    }

    #[tokio::test]
    async fn test_roundtrip_delete_not_applied() {
        let client = MockHttpClient::new()
            .with_json(Method::Post, LIBRARY_PATH, 200, json!({"id": "new-1", "title": TITLE}))
            .with_json(
                Method::Get,
                LIBRARY_PATH,
                200,
                json!({"articles": [{"id": "new-1", "title": TITLE}]}),
            )
            .with_json(Method::Put, &article_path(), 200, json!({}))
            .with_json(Method::Delete, &article_path(), 200, json!({}));

        let report = roundtrip_with_marker(&client, &marker()).await;

        assert_eq!(report.exit_status(), ProbeExit::ChecksFailed);
        let failed: Vec<&str> = report
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(failed, vec!["update", "delete"]);
    }

    #[tokio::test]
    async fn test_roundtrip_cleans_up_after_error() {
        let client = MockHttpClient::new()
            .with_json(Method::Post, LIBRARY_PATH, 200, json!({"article": {"id": "new-1"}}))
            .with_json(
                Method::Get,
                LIBRARY_PATH,
                200,
                json!({"articles": [{"id": "new-1", "title": TITLE}]}),
            )
            .with_text(Method::Put, &article_path(), 502, "Bad Gateway")
            .with_json(Method::Delete, &article_path(), 200, json!({}));

        let report = roundtrip_with_marker(&client, &marker()).await;

        assert_eq!(report.exit_status(), ProbeExit::BackendUnavailable);
        assert_eq!(client.request_count(Method::Delete, &article_path()), 1);
    }

    #[tokio::test]
    async fn test_roundtrip_create_rejected() {
        let client =
            MockHttpClient::new().with_text(Method::Post, LIBRARY_PATH, 422, "validation error");

        let report = roundtrip_with_marker(&client, &marker()).await;

        assert_eq!(report.exit_status(), ProbeExit::ChecksFailed);
        assert!(report.checks.is_empty());
        assert_eq!(client.request_count(Method::Get, LIBRARY_PATH), 0);
    }

    #[tokio::test]
    async fn test_list_library_detects_leaked_object_id() {
        let client = MockHttpClient::new().with_json(
            Method::Get,
            LIBRARY_PATH,
            200,
            json!({
                "total": 2,
                "articles": [
                    {"id": "a1", "title": "Clean"},
                    {"id": "a2", "_id": {"$oid": "64f0c0ffee"}, "title": "Leaky"}
                ]
            }),
        );

        let report = list_library(&client, Some(1)).await;

        assert_eq!(report.exit_status(), ProbeExit::ChecksFailed);
        assert!(report.checks[0].detail.contains("1件"));
    }

    #[tokio::test]
    async fn test_list_library_unreachable() {
        let client =
            MockHttpClient::new().with_transport_error(Method::Get, LIBRARY_PATH, "timed out");
        let report = list_library(&client, None).await;
        assert_eq!(report.exit_status(), ProbeExit::BackendUnavailable);
    }
}
