use crate::{
    domain::{
        content::{process_text, upload_file, RunMarker},
        job::{await_ticket, JobOutcome, JobTicket, PollPolicy},
        library::{list_articles, Library, LibraryArticle},
        probe::{evaluate, Probe, ProbeSource},
        report::{CheckResult, ProbeReport},
    },
    infra::{api::http::HttpClient, config::BackendConfig},
    task::health::run_health,
    types::ProbeExit,
};
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

/// プローブ群を順に実行するメイン関数（依存性を注入）
///
/// 1. ヘルスチェック（`skip_health`で省略可、利用不可なら中断）
/// 2. 各プローブを順番に実行
///
/// ヘルスチェックを行った場合はそのレポートも先頭に含める。
pub async fn execute_probes<H: HttpClient + ?Sized>(
    client: &H,
    config: &BackendConfig,
    probes: &[Probe],
    skip_health: bool,
) -> Vec<ProbeReport> {
    println!("=== プローブ実行開始: {}件 ===", probes.len());
    let mut reports = Vec::new();

    if !skip_health {
        let health = run_health(client).await;
        let unavailable = health.exit_status() == ProbeExit::BackendUnavailable;
        reports.push(health);
        if unavailable {
            println!("バックエンドが利用できないため、プローブを実行しません");
            return reports;
        }
    }

    for probe in probes {
        reports.push(execute_probe(client, config, probe).await);
    }

    println!("=== プローブ実行完了 ===");
    reports
}

/// 1つのプローブを実行する。実行マーカーは毎回新しく生成する
pub async fn execute_probe<H: HttpClient + ?Sized>(
    client: &H,
    config: &BackendConfig,
    probe: &Probe,
) -> ProbeReport {
    execute_probe_with_marker(client, config, probe, &RunMarker::generate()).await
}

/// 指定したマーカーでプローブを実行する
///
/// 投入 → ジョブ待ち → Content Library取得 → 今回の記事を選別 → 判定、の順に進む。
/// 途中で失敗した場合はその時点の終了コードで打ち切る。
pub async fn execute_probe_with_marker<H: HttpClient + ?Sized>(
    client: &H,
    config: &BackendConfig,
    probe: &Probe,
    marker: &RunMarker,
) -> ProbeReport {
    println!("--- プローブ開始: {} ---", probe);
    let mut report = ProbeReport::new(probe.to_string());
    let started_at = Utc::now();

    // 段階1: ドキュメントを投入
    let ticket = match submit_probe(client, config, probe, marker).await {
        Ok(ticket) => ticket,
        Err(e) => {
            report.abort(ProbeExit::from_error(&e), format!("{:#}", e));
            return report;
        }
    };

    // 段階2: ジョブの終了を待つ
    let outcome = match await_ticket(client, ticket, PollPolicy::from_config(config)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            report.abort(
                ProbeExit::from_api_error(&e),
                format!("ジョブ状態の取得に失敗: {}", e),
            );
            return report;
        }
    };
    report.job = Some(outcome.clone());

    let snapshot = match &outcome {
        JobOutcome::Completed(snapshot) => {
            report.record(CheckResult::pass("job", outcome.to_string()));
            snapshot
        }
        _ => {
            report.record(CheckResult::fail_with("job", outcome.to_string(), outcome.exit()));
            return report;
        }
    };

    // 段階3: 生成された記事を取得して判定
    let library = match list_articles(client).await {
        Ok(library) => library,
        Err(e) => {
            report.abort(
                ProbeExit::from_api_error(&e),
                format!("Content Libraryの取得に失敗: {}", e),
            );
            return report;
        }
    };

    let articles = select_run_articles(&library, marker, started_at);
    info!(
        probe = %probe,
        articles = articles.len(),
        library_total = library.total(),
        "判定対象の記事を選別"
    );

    // 記事数0を許す場合を除き、対象記事が無ければ失敗
    let allows_empty = probe.expect.article_count.map_or(false, |range| range.contains(0));
    if articles.is_empty() && !allows_empty {
        report.record(CheckResult::fail(
            "articles_selected",
            format!("今回の記事が見つかりません (ライブラリ全体 {}件)", library.total()),
        ));
    }

    for result in evaluate(&probe.expect, Some(snapshot), &articles) {
        report.record(result);
    }

    println!("--- プローブ完了: {} → {} ---", probe, report.exit_status());
    report
}

/// プローブの投入元に応じてアップロードかテキスト処理を行う
async fn submit_probe<H: HttpClient + ?Sized>(
    client: &H,
    config: &BackendConfig,
    probe: &Probe,
    marker: &RunMarker,
) -> Result<JobTicket> {
    let metadata = marker.tag(json!({
        "probe": probe.name,
        "group": probe.group,
    }));

    match &probe.source {
        ProbeSource::File { file } => upload_file(client, file, metadata, Some(config.job_timeout))
            .await
            .context(format!("プローブ {} の投入に失敗", probe)),
        ProbeSource::Text { text, title } => {
            let mut metadata = metadata;
            if let (Some(title), Some(map)) = (title, metadata.as_object_mut()) {
                map.insert("title".to_string(), json!(title));
            }
            process_text(client, text, metadata)
                .await
                .context(format!("プローブ {} の投入に失敗", probe))
        }
    }
}

/// 今回の実行で生成された記事を選ぶ
///
/// マーカー付きの記事を優先し、1件も無ければ開始時刻以降に作成された記事を使う。
fn select_run_articles<'a>(
    library: &'a Library,
    marker: &RunMarker,
    started_at: chrono::DateTime<Utc>,
) -> Vec<&'a LibraryArticle> {
    let tagged = library.produced_by_run(marker);
    if !tagged.is_empty() {
        return tagged;
    }

    warn!(marker = marker.as_str(), "マーカー付きの記事が無いため作成日時で選別");
    library.created_since(started_at)
}
