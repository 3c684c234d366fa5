//! V2エンジンの診断エンドポイント

use crate::infra::api::http::{get_json, HttpClient};
use crate::types::ApiResult;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 診断エンドポイントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticsEndpoint {
    Engine,
    Qa,
    Style,
    CodeNormalization,
    ReviewRuns,
}

impl DiagnosticsEndpoint {
    pub const ALL: [DiagnosticsEndpoint; 5] = [
        DiagnosticsEndpoint::Engine,
        DiagnosticsEndpoint::Qa,
        DiagnosticsEndpoint::Style,
        DiagnosticsEndpoint::CodeNormalization,
        DiagnosticsEndpoint::ReviewRuns,
    ];

    pub fn path(self) -> &'static str {
        match self {
            DiagnosticsEndpoint::Engine => "/api/engine",
            DiagnosticsEndpoint::Qa => "/api/qa/diagnostics",
            DiagnosticsEndpoint::Style => "/api/style/diagnostics",
            DiagnosticsEndpoint::CodeNormalization => "/api/code-normalization/diagnostics",
            DiagnosticsEndpoint::ReviewRuns => "/api/review/runs",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DiagnosticsEndpoint::Engine => "engine",
            DiagnosticsEndpoint::Qa => "qa",
            DiagnosticsEndpoint::Style => "style",
            DiagnosticsEndpoint::CodeNormalization => "code-normalization",
            DiagnosticsEndpoint::ReviewRuns => "review-runs",
        }
    }
}

impl fmt::Display for DiagnosticsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DiagnosticsEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiagnosticsEndpoint::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("不明な診断エンドポイント: {}", s))
    }
}

/// 診断レスポンスの要約
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsSummary {
    pub endpoint: DiagnosticsEndpoint,
    /// `status`または`engine`フィールドの値
    pub engine_status: Option<String>,
    /// 有効な機能フラグ
    pub features: Vec<String>,
    /// `total`、または最初に見つかった一覧の件数
    pub record_count: Option<u64>,
}

impl DiagnosticsSummary {
    /// レスポンスJSONから要約を作る
    pub fn from_value(endpoint: DiagnosticsEndpoint, value: &Value) -> Self {
        let engine_status = ["status", "engine"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_string);

        let features = match value.get("features") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::Object(flags)) => flags
                .iter()
                .filter(|(_, enabled)| enabled.as_bool() == Some(true))
                .map(|(name, _)| name.clone())
                .collect(),
            _ => Vec::new(),
        };

        let record_count = value.get("total").and_then(Value::as_u64).or_else(|| {
            ["runs", "results", "diagnostics"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_array))
                .map(|items| items.len() as u64)
        });

        Self {
            endpoint,
            engine_status,
            features,
            record_count,
        }
    }

    /// 必須機能フラグのうち有効になっていないもの
    pub fn missing_features(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|r| !self.features.iter().any(|f| f == *r))
            .cloned()
            .collect()
    }
}

impl fmt::Display for DiagnosticsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} status={} features={} records={}",
            self.endpoint,
            self.engine_status.as_deref().unwrap_or("-"),
            self.features.len(),
            self.record_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string())
        )
    }
}

/// 診断エンドポイントを取得して要約する
pub async fn fetch_diagnostics<H: HttpClient + ?Sized>(
    client: &H,
    endpoint: DiagnosticsEndpoint,
) -> ApiResult<DiagnosticsSummary> {
    let value: Value = get_json(client, endpoint.path()).await?;
    Ok(DiagnosticsSummary::from_value(endpoint, &value))
}
