use crate::domain::inspect::faq::inspect_faq;
use crate::domain::inspect::media::inspect_media;
use crate::domain::inspect::toc::inspect_toc;
use crate::domain::inspect::{count_tag, find_forbidden_classes, word_count, ClassHit};
use crate::domain::job::JobSnapshot;
use crate::domain::library::{duplicate_titles, LibraryArticle};
use crate::domain::report::CheckResult;
use crate::infra::storage::file::load_yaml_from_file;
use crate::types::InfraResult;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PROBES_PATH: &str = "src/domain/data/probes.yaml";

/// 投入するドキュメント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeSource {
    File {
        file: String,
    },
    Text {
        text: String,
        #[serde(default)]
        title: Option<String>,
    },
}

/// 記事数の許容範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    #[serde(default)]
    pub min: Option<usize>,
    #[serde(default)]
    pub max: Option<usize>,
}

impl CountRange {
    pub fn contains(&self, n: usize) -> bool {
        self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
    }
}

impl fmt::Display for CountRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{}..={}", min, max),
            (Some(min), None) => write!(f, "{}以上", min),
            (None, Some(max)) => write!(f, "{}以下", max),
            (None, None) => write!(f, "制限なし"),
        }
    }
}

/// プローブの期待値。指定したものだけを判定する
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    #[serde(default)]
    pub article_count: Option<CountRange>,
    #[serde(default)]
    pub min_chunks: Option<u64>,
    #[serde(default)]
    pub max_hr_per_article: Option<usize>,
    #[serde(default)]
    pub forbidden_classes: Vec<String>,
    #[serde(default)]
    pub min_words: Option<usize>,
    #[serde(default)]
    pub max_words: Option<usize>,
    #[serde(default)]
    pub require_faq: bool,
    #[serde(default)]
    pub check_toc_anchors: bool,
    #[serde(default)]
    pub min_images: Option<usize>,
    #[serde(default)]
    pub no_duplicate_titles: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    pub name: String,
    #[serde(default)]
    pub group: String,
    pub source: ProbeSource,
    #[serde(default)]
    pub expect: Expectations,
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.group, self.name)
        }
    }
}

// YAMLファイルの構造に対応する型
#[derive(Debug, Deserialize)]
struct ProbeFile {
    #[serde(default)]
    probes: Vec<Probe>,
}

// プローブ検索のフィルター条件を表す構造体
#[derive(Debug, Default)]
pub struct ProbeQuery {
    pub group: Option<String>,
    pub name: Option<String>,
}

/// YAMLファイルからプローブ定義を読み込み、クエリで絞り込む
pub fn search_probes(file_path: &str, query: Option<ProbeQuery>) -> InfraResult<Vec<Probe>> {
    let file: ProbeFile = load_yaml_from_file(file_path)?;
    let query = query.unwrap_or_default();

    Ok(file
        .probes
        .into_iter()
        .filter(|probe| {
            query.group.as_ref().map_or(true, |g| probe.group == *g)
                && query.name.as_ref().map_or(true, |n| probe.name == *n)
        })
        .collect())
}

/// 期待値に対して記事とジョブ結果を判定する
///
/// `articles`は今回の実行で生成された記事だけを渡す。
pub fn evaluate(
    expect: &Expectations,
    snapshot: Option<&JobSnapshot>,
    articles: &[&LibraryArticle],
) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if let Some(range) = expect.article_count {
        let generated = snapshot
            .and_then(|s| s.articles_generated)
            .map(|n| format!("、ジョブ報告{}件", n))
            .unwrap_or_default();
        results.push(CheckResult::check(
            "article_count",
            range.contains(articles.len()),
            format!("記事{}件{} (期待 {})", articles.len(), generated, range),
        ));
    }

    if let Some(min) = expect.min_chunks {
        let chunks = snapshot.and_then(|s| s.chunks_created).unwrap_or(0);
        results.push(CheckResult::check(
            "min_chunks",
            chunks >= min,
            format!("チャンク{}件 (期待 {}以上)", chunks, min),
        ));
    }

    if let Some(max) = expect.max_hr_per_article {
        let offenders: Vec<String> = articles
            .iter()
            .map(|a| (a, count_tag(&a.content, "hr")))
            .filter(|(_, n)| *n > max)
            .map(|(a, n)| format!("{}({}個)", label(a), n))
            .collect();
        results.push(per_article_result(
            "max_hr_per_article",
            &offenders,
            format!("全記事で<hr>は{}個以下", max),
        ));
    }

    if !expect.forbidden_classes.is_empty() {
        let mut hits: Vec<String> = Vec::new();
        for article in articles {
            for ClassHit { pattern, count } in
                find_forbidden_classes(&article.content, &expect.forbidden_classes)
            {
                hits.push(format!("{}: {}×{}", label(article), pattern, count));
            }
        }
        results.push(per_article_result(
            "forbidden_classes",
            &hits,
            "禁止クラスなし".to_string(),
        ));
    }

    if expect.min_words.is_some() || expect.max_words.is_some() {
        let range = CountRange {
            min: expect.min_words,
            max: expect.max_words,
        };
        let offenders: Vec<String> = articles
            .iter()
            .map(|a| (a, word_count(&a.content)))
            .filter(|(_, n)| !range.contains(*n))
            .map(|(a, n)| format!("{}({}語)", label(a), n))
            .collect();
        results.push(per_article_result(
            "word_count",
            &offenders,
            format!("全記事の語数が{}", range),
        ));
    }

    if expect.require_faq {
        let questions: usize = articles
            .iter()
            .map(|a| inspect_faq(&a.content))
            .filter(|r| r.has_faq_section)
            .map(|r| r.question_count())
            .sum();
        let has_section = articles
            .iter()
            .any(|a| inspect_faq(&a.content).has_faq_section);
        results.push(CheckResult::check(
            "faq",
            has_section && questions > 0,
            format!(
                "FAQセクション{}、質問{}件",
                if has_section { "あり" } else { "なし" },
                questions
            ),
        ));
    }

    if expect.check_toc_anchors {
        let mut problems: Vec<String> = Vec::new();
        for article in articles {
            let toc = inspect_toc(&article.content);
            if !toc.broken_links.is_empty() {
                problems.push(format!(
                    "{}: リンク切れ#{}",
                    label(article),
                    toc.broken_links.join(",#")
                ));
            }
            if !toc.duplicate_ids.is_empty() {
                problems.push(format!(
                    "{}: 重複id {}",
                    label(article),
                    toc.duplicate_ids.join(",")
                ));
            }
        }
        results.push(per_article_result(
            "toc_anchors",
            &problems,
            "目次リンクと見出しidが一致".to_string(),
        ));
    }

    if let Some(min) = expect.min_images {
        let reports: Vec<_> = articles.iter().map(|a| inspect_media(&a.content)).collect();
        let linked: usize = reports.iter().map(|r| r.linked_images()).sum();
        let broken: usize = reports.iter().map(|r| r.missing_src).sum();
        results.push(CheckResult::check(
            "media",
            linked >= min && broken == 0,
            format!("画像{}件、src欠落{}件 (期待 {}件以上、欠落0)", linked, broken, min),
        ));
    }

    if expect.no_duplicate_titles {
        let duplicates = duplicate_titles(articles);
        let listed: Vec<String> = duplicates
            .iter()
            .map(|(title, n)| format!("\"{}\"×{}", title, n))
            .collect();
        results.push(per_article_result(
            "duplicate_titles",
            &listed,
            "タイトルの重複なし".to_string(),
        ));
    }

    results
}

fn label(article: &LibraryArticle) -> String {
    if article.title.is_empty() {
        article.id.clone()
    } else {
        format!("「{}」", article.title)
    }
}

fn per_article_result(name: &str, problems: &[String], ok_detail: String) -> CheckResult {
    if problems.is_empty() {
        CheckResult::pass(name, ok_detail)
    } else {
        CheckResult::fail(name, problems.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::JobStatus;
    use std::io::Write;

    fn article(id: &str, title: &str, content: &str) -> LibraryArticle {
        LibraryArticle {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("mock/html/{}", name)).unwrap()
    }

    #[test]
    fn test_search_probes_default_file() {
        let probes = search_probes(DEFAULT_PROBES_PATH, None).unwrap();
        assert!(probes.len() >= 3, "既定のプローブが読み込まれるべき");

        let faq = probes.iter().find(|p| p.name == "faq-generation").unwrap();
        assert!(matches!(faq.source, ProbeSource::Text { .. }));
        assert!(faq.expect.require_faq);
    }

    #[test]
    fn test_search_probes_filters() {
        let query = ProbeQuery {
            group: Some("chunking".to_string()),
            name: None,
        };
        let probes = search_probes(DEFAULT_PROBES_PATH, Some(query)).unwrap();
        assert!(!probes.is_empty());
        assert!(probes.iter().all(|p| p.group == "chunking"));

        let query = ProbeQuery {
            group: Some("存在しないグループ".to_string()),
            name: None,
        };
        assert!(search_probes(DEFAULT_PROBES_PATH, Some(query)).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_expectation_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "probes:\n  - name: typo\n    source: {{ text: hi }}\n    expect:\n      max_hrs: 3"
        )
        .unwrap();
        let result = search_probes(file.path().to_str().unwrap(), None);
        assert!(result.is_err(), "未知の期待値キーはエラーにするべき");
    }

    #[test]
    fn test_count_range() {
        let range = CountRange { min: Some(6), max: Some(12) };
        assert!(range.contains(6));
        assert!(range.contains(12));
        assert!(!range.contains(13));
        assert!(!range.contains(5));
        assert_eq!(range.to_string(), "6..=12");
        assert!(CountRange { min: None, max: None }.contains(0));
    }

    #[test]
    fn test_evaluate_all_passing() {
        let expect = Expectations {
            article_count: Some(CountRange { min: Some(1), max: Some(3) }),
            min_chunks: Some(1),
            max_hr_per_article: Some(3),
            require_faq: true,
            no_duplicate_titles: true,
            ..Default::default()
        };
        let snapshot = JobSnapshot {
            job_id: "j".to_string(),
            status: JobStatus::Completed,
            chunks_created: Some(2),
            articles_generated: Some(2),
            error: None,
            progress: None,
        };
        let a1 = article("a1", "Overview", "<h2>Overview</h2><p>Hello</p>");
        let a2 = article("a2", "FAQ", "<h2>FAQ</h2><h3>Is it fast?</h3><p>Yes</p>");

        let results = evaluate(&expect, Some(&snapshot), &[&a1, &a2]);
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.passed), "{:?}", results);
        assert!(results[0].detail.contains("ジョブ報告2件"));
    }

    #[test]
    fn test_evaluate_failures() {
        let expect = Expectations {
            article_count: Some(CountRange { min: Some(3), max: None }),
            max_hr_per_article: Some(2),
            forbidden_classes: vec!["MsoNormal".to_string()],
            check_toc_anchors: true,
            min_words: Some(1000),
            ..Default::default()
        };
        let dirty = article("a1", "Billing", &fixture("wysiwyg_dirty.html"));
        let toc = article("a2", "Guide", &fixture("toc_article.html"));

        let results = evaluate(&expect, None, &[&dirty, &toc]);
        let failed: Vec<&str> = results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(
            failed,
            vec![
                "article_count",
                "max_hr_per_article",
                "forbidden_classes",
                "word_count",
                "toc_anchors"
            ]
        );

        let hr = results.iter().find(|r| r.name == "max_hr_per_article").unwrap();
        assert!(hr.detail.contains("「Billing」(3個)"));
        assert!(!hr.detail.contains("Guide"));
    }

    #[test]
    fn test_evaluate_media() {
        let expect = Expectations {
            min_images: Some(1),
            ..Default::default()
        };
        let broken = article("m1", "Architecture", &fixture("media_article.html"));
        let results = evaluate(&expect, None, &[&broken]);
        assert!(!results[0].passed, "src欠落があれば不合格");

        let clean = article("m2", "", r#"<figure><img src="/a.png"></figure>"#);
        let results = evaluate(&expect, None, &[&clean]);
        assert!(results[0].passed);
    }

    #[test]
    fn test_evaluate_duplicates_and_faq_missing() {
        let expect = Expectations {
            require_faq: true,
            no_duplicate_titles: true,
            ..Default::default()
        };
        let a1 = article("a1", "Setup", "<p>one</p>");
        let a2 = article("a2", "setup", "<p>two</p>");
        let results = evaluate(&expect, None, &[&a1, &a2]);
        assert!(results.iter().all(|r| !r.passed));
        assert!(results[1].detail.contains("\"setup\"×2"));
    }

    #[test]
    fn test_evaluate_nothing_expected() {
        assert!(evaluate(&Expectations::default(), None, &[]).is_empty());
    }
}
