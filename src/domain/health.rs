use crate::infra::api::http::{get_json, HttpClient};
use crate::types::ApiResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const HEALTH_PATH: &str = "/api/health";

/// サービスの状態として正常とみなす値
const HEALTHY_VALUES: [&str; 5] = ["healthy", "connected", "ok", "configured", "available"];

/// `/api/health`のレスポンス
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub services: Map<String, Value>,
}

impl HealthReport {
    /// 全体ステータスが`healthy`かどうか（大文字小文字は区別しない）
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }

    /// 正常ではないサービス名と状態の一覧
    ///
    /// 値が文字列ならその文字列、オブジェクトなら`status`フィールドで判定する。
    /// 真偽値は`false`のみ異常とする。それ以外の形は判定しない。
    pub fn unhealthy_services(&self) -> Vec<(String, String)> {
        self.services
            .iter()
            .filter_map(|(name, value)| {
                let state = match value {
                    Value::String(s) => s.clone(),
                    Value::Object(obj) => obj.get("status")?.as_str()?.to_string(),
                    Value::Bool(false) => "false".to_string(),
                    _ => return None,
                };
                let healthy = HEALTHY_VALUES
                    .iter()
                    .any(|ok| state.eq_ignore_ascii_case(ok));
                (!healthy).then(|| (name.clone(), state))
            })
            .collect()
    }
}

/// バックエンドのヘルスチェックを行う
pub async fn check_health<H: HttpClient + ?Sized>(client: &H) -> ApiResult<HealthReport> {
    get_json(client, HEALTH_PATH).await
}
