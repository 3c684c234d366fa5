use crate::domain::diagnostics::{fetch_diagnostics, DiagnosticsEndpoint};
use crate::domain::report::{CheckResult, ProbeReport};
use crate::infra::api::http::HttpClient;
use crate::types::ProbeExit;

/// V2エンジンの診断エンドポイントを順に取得する
///
/// 404は未実装のエンドポイントとしてチェック不合格、5xxと通信エラーは終了コード4。
/// `required_features`はエンジン本体（`/api/engine`）の機能フラグに対して確認する。
pub async fn run_diagnostics<H: HttpClient + ?Sized>(
    client: &H,
    endpoints: &[DiagnosticsEndpoint],
    required_features: &[String],
) -> ProbeReport {
    println!("--- V2エンジン診断開始 ---");
    let mut report = ProbeReport::new("diagnostics");

    for &endpoint in endpoints {
        match fetch_diagnostics(client, endpoint).await {
            Ok(summary) => {
                report.record(CheckResult::pass(endpoint.name(), summary.to_string()));

                if endpoint == DiagnosticsEndpoint::Engine && !required_features.is_empty() {
                    let missing = summary.missing_features(required_features);
                    report.record(CheckResult::check(
                        "engine_features",
                        missing.is_empty(),
                        if missing.is_empty() {
                            format!("必須機能{}件すべて有効", required_features.len())
                        } else {
                            format!("無効な機能: {}", missing.join(", "))
                        },
                    ));
                }
            }
            Err(e) => report.record(CheckResult::fail_with(
                endpoint.name(),
                e.to_string(),
                ProbeExit::from_api_error(&e),
            )),
        }
    }

    println!("--- V2エンジン診断完了 ---");
    report
}
