use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// 文字列を日付型に変換するヘルパー関数
///
/// `dateparser`クレートを利用して、様々な形式の日付文字列を解析し、
/// `DateTime<Utc>`型に変換する。
///
/// Content Libraryの`created_at`はバックエンドのバージョンによって
/// タイムゾーン付きISO 8601、マイクロ秒付き、RFC 2822などが混在するため、
/// この関数で形式の違いを吸収する。
///
/// # サポート形式の例
/// - "2025-01-15T10:00:00Z"
/// - "2025-01-15T10:00:00.123456+00:00"
/// - "Sun, 10 Aug 2025 12:00:00 +0000"
/// - "2025-08-10T12:05:00.123456"（タイムゾーンなしはUTCとみなす）
/// - "2025-08-10 12:05:00.123456"
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let trimmed = date_str.trim();
    // タイムゾーンの無い値はホストのローカル時刻ではなくUTCとして解釈する
    if let Ok(dt) = dateparser::parse_with_timezone(trimmed, &Utc) {
        return Ok(dt);
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| anyhow!("不正な日付形式: {}", date_str))
}

/// `dateparser`が扱えない、タイムゾーンなしの日時形式
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
