//! 記事HTMLに対するヒューリスティック検査
//!
//! どれも純粋関数で、同じHTMLに対して常に同じ結果を返す。
//! HTMLパーサーは使わず、バックエンドが生成する素直なマークアップを
//! 前提にした正規表現と文字列処理で判定する。

pub mod faq;
pub mod media;
pub mod toc;

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("タグ除去の正規表現"));

static CLASS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("class属性の正規表現")
});

/// 開始タグ・空要素タグの出現数を数える（大文字小文字は区別しない）
///
/// `<hr>`、`<HR/>`、`<hr class="x" />`はすべて数えるが、
/// `<hra>`のように名前が続くタグや終了タグは数えない。
pub fn count_tag(html: &str, tag: &str) -> usize {
    let pattern = format!(r"(?i)<{}(?:\s[^>]*)?/?>", regex::escape(tag));
    Regex::new(&pattern)
        .map(|re| re.find_iter(html).count())
        .unwrap_or(0)
}

/// タグを取り除き、主要な文字実体参照を戻したテキストを返す
pub fn strip_tags(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// 本文の単語数（タグ除去後に空白で区切った数）
pub fn word_count(html: &str) -> usize {
    strip_tags(html).split_whitespace().count()
}

/// 禁止クラスの検出結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassHit {
    pub pattern: String,
    pub count: usize,
}

/// class属性の値に含まれる禁止パターンを数える
///
/// パターンは部分一致で判定するため、`mce-`のような接頭辞も指定できる。
/// 出現しなかったパターンは結果に含めない。
pub fn find_forbidden_classes(html: &str, patterns: &[String]) -> Vec<ClassHit> {
    let class_values: Vec<&str> = CLASS_ATTR_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
        .collect();

    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .filter_map(|pattern| {
            let count: usize = class_values
                .iter()
                .map(|value| value.matches(pattern.as_str()).count())
                .sum();
            (count > 0).then(|| ClassHit {
                pattern: pattern.clone(),
                count,
            })
        })
        .collect()
}
