use super::strip_tags;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static HEADING_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h[1-6]\b[^>]*>(.*?)</h[1-6]\s*>").expect("見出しの正規表現")
});

static QUESTION_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(h[2-6]|strong|b|dt|summary)\b[^>]*>(.*?)</(?:h[2-6]|strong|b|dt|summary)\s*>")
        .expect("質問項目の正規表現")
});

static FAQ_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfaqs?\b|frequently\s+asked\s+questions").expect("FAQ見出しの正規表現")
});

/// FAQセクションの検出結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FaqReport {
    pub has_faq_section: bool,
    pub questions: Vec<String>,
}

impl FaqReport {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// FAQ見出しの有無と、`?`で終わる質問項目を調べる
pub fn inspect_faq(html: &str) -> FaqReport {
    let has_faq_section = HEADING_TEXT_RE
        .captures_iter(html)
        .any(|caps| FAQ_TITLE_RE.is_match(&strip_tags(&caps[1])));

    let questions = QUESTION_ITEM_RE
        .captures_iter(html)
        .map(|caps| normalize(&strip_tags(&caps[2])))
        .filter(|text| text.ends_with('?'))
        .collect();

    FaqReport {
        has_faq_section,
        questions,
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_faq_fixture() {
        let html = std::fs::read_to_string("mock/html/toc_article.html").unwrap();
        let report = inspect_faq(&html);

        assert!(report.has_faq_section);
        assert_eq!(report.question_count(), 2);
        assert_eq!(report.questions[0], "Can I re-upload a document?");
    }

    #[test]
    fn test_faq_with_strong_and_dt_items() {
        let html = r#"
            <h2>FAQs</h2>
            <p><strong>Is annual billing available?</strong> Yes.</p>
            <dl><dt>Can invoices be consolidated?</dt><dd>No.</dd></dl>
            <p><strong>Note:</strong> prices exclude tax.</p>
        "#;
        let report = inspect_faq(html);
        assert!(report.has_faq_section);
        assert_eq!(report.question_count(), 2);
    }

    #[test]
    fn test_no_faq() {
        let html = "<h2>Overview</h2><p>Why? Because.</p><h2>Faqir tribe</h2>";
        let report = inspect_faq(html);
        assert!(!report.has_faq_section);
        assert_eq!(report.question_count(), 0);
    }
}
