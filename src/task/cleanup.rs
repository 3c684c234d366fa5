use crate::domain::cleanup::cleanup_formatting;
use crate::domain::inspect::{count_tag, find_forbidden_classes};
use crate::domain::library::{list_articles, LibraryArticle};
use crate::domain::report::{CheckResult, ProbeReport};
use crate::infra::api::http::HttpClient;
use crate::types::ProbeExit;
use tracing::info;

/// WYSIWYGエディタ由来で、クリーンアップ後に残ってはいけないクラス名
pub const DEFAULT_FORBIDDEN_CLASSES: [&str; 6] = [
    "MsoNormal",
    "mce-",
    "ql-",
    "wysiwyg-",
    "editor-",
    "Apple-converted-space",
];

/// クリーンアップの実行条件
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// 対象記事（空なら全記事）
    pub article_ids: Vec<String>,
    pub forbidden_classes: Vec<String>,
    /// 許容する最低成功率（%）
    pub min_success_rate: f64,
    /// 1記事あたりの`<hr>`上限
    pub max_hr_per_article: Option<usize>,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            article_ids: Vec::new(),
            forbidden_classes: DEFAULT_FORBIDDEN_CLASSES.iter().map(|c| c.to_string()).collect(),
            min_success_rate: 100.0,
            max_hr_per_article: None,
        }
    }
}

/// WYSIWYGクリーンアップを実行し、対象記事のHTMLを検査する
pub async fn run_cleanup<H: HttpClient + ?Sized>(client: &H, options: &CleanupOptions) -> ProbeReport {
    println!("--- WYSIWYGクリーンアップ開始 ---");
    let mut report = ProbeReport::new("cleanup");

    let cleanup = match cleanup_formatting(client, &options.article_ids).await {
        Ok(cleanup) => cleanup,
        Err(e) => {
            report.abort(ProbeExit::from_api_error(&e), format!("クリーンアップに失敗: {}", e));
            return report;
        }
    };

    match cleanup.success_rate() {
        Some(rate) => report.record(CheckResult::check(
            "success_rate",
            rate >= options.min_success_rate,
            format!("{:.1}% (期待 {:.1}%以上)", rate, options.min_success_rate),
        )),
        None => report.record(CheckResult::fail(
            "success_rate",
            format!("成功率を解釈できません: {}", cleanup.success_rate),
        )),
    }
    if let Some(processed) = cleanup.count("articles_processed") {
        info!(processed, "クリーンアップ対象の記事数");
    }

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

    let targets: Vec<&LibraryArticle> = if options.article_ids.is_empty() {
        library.articles.iter().collect()
    } else {
        let missing: Vec<&str> = options
            .article_ids
            .iter()
            .filter(|id| library.find(id).is_none())
            .map(String::as_str)
            .collect();
        report.record(CheckResult::check(
            "targets",
            missing.is_empty(),
            if missing.is_empty() {
                format!("{}件すべて取得", options.article_ids.len())
            } else {
                format!("見つからない記事: {}", missing.join(", "))
            },
        ));
        options
            .article_ids
            .iter()
            .filter_map(|id| library.find(id))
            .collect()
    };

    if targets.is_empty() {
        report.record(CheckResult::fail("forbidden_classes", "検査対象の記事がありません"));
        println!("--- WYSIWYGクリーンアップ完了 ---");
        return report;
    }

    let mut leftovers = Vec::new();
    for article in &targets {
        for hit in find_forbidden_classes(&article.content, &options.forbidden_classes) {
            leftovers.push(format!("{}: {}×{}", article.id, hit.pattern, hit.count));
        }
    }
    report.record(CheckResult::check(
        "forbidden_classes",
        leftovers.is_empty(),
        if leftovers.is_empty() {
            format!("{}件の記事に禁止クラスなし", targets.len())
        } else {
            leftovers.join("; ")
        },
    ));

    if let Some(max) = options.max_hr_per_article {
        let offenders: Vec<String> = targets
            .iter()
            .map(|a| (a.id.as_str(), count_tag(&a.content, "hr")))
            .filter(|(_, n)| *n > max)
            .map(|(id, n)| format!("{}({}個)", id, n))
            .collect();
        report.record(CheckResult::check(
            "max_hr_per_article",
            offenders.is_empty(),
            if offenders.is_empty() {
                format!("全記事で<hr>は{}個以下", max)
            } else {
                offenders.join(", ")
            },
        ));
    }

    println!("--- WYSIWYGクリーンアップ完了 ---");
    report
}
