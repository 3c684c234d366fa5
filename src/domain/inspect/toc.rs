use super::strip_tags;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-6])\b([^>]*)>(.*?)</h[1-6]\s*>").expect("見出しの正規表現")
});

static ID_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[\s"']id\s*=\s*["']([^"']+)["']"#).expect("id属性の正規表現")
});

static ANCHOR_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\b[^>]*\bhref\s*=\s*["']#([^"']+)["']"#).expect("ページ内リンクの正規表現")
});

/// 記事内の見出し
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub id: Option<String>,
    pub text: String,
}

/// 目次リンクと見出しIDの整合性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TocReport {
    pub headings: Vec<Heading>,
    /// `href="#..."`のリンク先（出現順）
    pub anchor_links: Vec<String>,
    /// 対応するidが文書内に存在しないリンク先
    pub broken_links: Vec<String>,
    /// 複数の要素に付いているid
    pub duplicate_ids: Vec<String>,
}

impl TocReport {
    /// 目次リンクがすべて解決でき、idの重複もない
    pub fn is_coordinated(&self) -> bool {
        self.broken_links.is_empty() && self.duplicate_ids.is_empty()
    }

    /// idを持たない見出しの数
    pub fn headings_without_id(&self) -> usize {
        self.headings.iter().filter(|h| h.id.is_none()).count()
    }
}

/// 見出しID・ページ内リンクを抽出して整合性を調べる
pub fn inspect_toc(html: &str) -> TocReport {
    let headings: Vec<Heading> = HEADING_RE
        .captures_iter(html)
        .map(|caps| {
            let level = caps[1].parse::<u8>().unwrap_or(0);
            // 属性部分の先頭に空白を足して`[\s"']id=`にかかるようにする
            let attrs = format!(" {}", &caps[2]);
            let id = ID_ATTR_RE
                .captures(&attrs)
                .map(|c| c[1].trim().to_string());
            let text = strip_tags(&caps[3])
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            Heading { level, id, text }
        })
        .collect();

    let mut id_counts: HashMap<String, usize> = HashMap::new();
    for caps in ID_ATTR_RE.captures_iter(html) {
        *id_counts.entry(caps[1].trim().to_string()).or_insert(0) += 1;
    }

    let duplicate_ids: Vec<String> = id_counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(id, _)| id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let anchor_links: Vec<String> = ANCHOR_LINK_RE
        .captures_iter(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|target| !target.is_empty())
        .collect();

    let mut seen = BTreeSet::new();
    let broken_links = anchor_links
        .iter()
        .filter(|target| !id_counts.contains_key(target.as_str()))
        .filter(|target| seen.insert(target.to_string()))
        .cloned()
        .collect();

    TocReport {
        headings,
        anchor_links,
        broken_links,
        duplicate_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_toc_fixture() {
        let html = std::fs::read_to_string("mock/html/toc_article.html").unwrap();
        let report = inspect_toc(&html);

        assert_eq!(report.headings.len(), 8);
        assert_eq!(report.headings[0].level, 1);
        assert_eq!(report.headings[0].id.as_deref(), Some("onboarding-guide"));
        assert_eq!(report.anchor_links.len(), 3);
        assert_eq!(report.broken_links, vec!["reviewing-articles".to_string()]);
        assert_eq!(report.duplicate_ids, vec!["getting-started".to_string()]);
        assert_eq!(report.headings_without_id(), 3);
        assert!(!report.is_coordinated());
    }

    #[test]
    fn test_coordinated_toc() {
        let html = r##"
            <ul><li><a href="#intro">Intro</a></li><li><a class="toc" href='#setup'>Setup</a></li></ul>
            <h2 id="intro">Intro</h2><p>..</p>
            <h2 class="x" id="setup">Setup <em>now</em></h2>
        "##;
        let report = inspect_toc(html);

        assert!(report.is_coordinated());
        assert_eq!(report.headings[1].text, "Setup now");
        assert_eq!(report.headings_without_id(), 0);
    }

    #[test]
    fn test_data_id_is_not_an_id() {
        let html = r##"<a href="#x">x</a><h2 data-id="x">X</h2>"##;
        let report = inspect_toc(html);
        assert_eq!(report.broken_links, vec!["x".to_string()]);
        assert_eq!(report.headings[0].id, None);
    }

    #[test]
    fn test_bare_hash_link_is_not_broken() {
        let html = r##"<h2 id="intro">Intro</h2><a href="#">Back to top</a><a href='# '>Top</a>"##;
        let report = inspect_toc(html);
        assert!(report.anchor_links.is_empty());
        assert!(report.broken_links.is_empty());
        assert!(report.is_coordinated());
    }

    #[test]
    fn test_no_headings_no_links() {
        let report = inspect_toc("<p>plain</p>");
        assert!(report.headings.is_empty());
        assert!(report.is_coordinated());
    }
}
