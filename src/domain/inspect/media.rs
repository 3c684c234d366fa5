use super::count_tag;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("imgタグの正規表現"));

static SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("src属性の正規表現")
});

/// 記事内のメディア抽出結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaReport {
    pub images: usize,
    pub figures: usize,
    /// `data:`URIで埋め込まれた画像
    pub data_uri_images: usize,
    /// srcが無い、または空の画像
    pub missing_src: usize,
    /// 空でないsrcの一覧（出現順）
    pub sources: Vec<String>,
}

impl MediaReport {
    /// 表示可能な外部参照画像の数
    pub fn linked_images(&self) -> usize {
        self.images - self.data_uri_images - self.missing_src
    }
}

/// img・figureの数とsrcの状態を調べる
pub fn inspect_media(html: &str) -> MediaReport {
    let mut report = MediaReport {
        figures: count_tag(html, "figure"),
        ..Default::default()
    };

    for tag in IMG_RE.find_iter(html) {
        report.images += 1;
        let src = SRC_RE
            .captures(tag.as_str())
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        if src.is_empty() {
            report.missing_src += 1;
        } else {
            if src.to_ascii_lowercase().starts_with("data:") {
                report.data_uri_images += 1;
            }
            report.sources.push(src);
        }
    }

    report
}
