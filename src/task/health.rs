use crate::domain::health::check_health;
use crate::domain::report::{CheckResult, ProbeReport};
use crate::infra::api::http::HttpClient;
use crate::types::ProbeExit;
use tracing::warn;

/// バックエンドのヘルスチェックを行い、結果をレポートにまとめる
///
/// 全体ステータスが`healthy`でなければ終了コード4、
/// 個別サービスの異常はチェック不合格（終了コード1）として扱う。
pub async fn run_health<H: HttpClient + ?Sized>(client: &H) -> ProbeReport {
    println!("--- ヘルスチェック開始 ---");
    let mut report = ProbeReport::new("health");

    let health = match check_health(client).await {
        Ok(health) => health,
        Err(e) => {
            warn!(error = %e, "ヘルスチェックに失敗");
            report.abort(ProbeExit::BackendUnavailable, e.to_string());
            return report;
        }
    };

    let status_detail = format!("status={}", health.status);
    if health.is_healthy() {
        report.record(CheckResult::pass("backend_status", status_detail));
    } else {
        report.record(CheckResult::fail_with(
            "backend_status",
            status_detail,
            ProbeExit::BackendUnavailable,
        ));
    }

    if !health.services.is_empty() {
        let unhealthy = health.unhealthy_services();
        if unhealthy.is_empty() {
            report.record(CheckResult::pass(
                "services",
                format!("{}件すべて正常", health.services.len()),
            ));
        } else {
            let listed: Vec<String> = unhealthy
                .iter()
                .map(|(name, state)| format!("{}={}", name, state))
                .collect();
            report.record(CheckResult::fail("services", listed.join(", ")));
        }
    }

    println!("--- ヘルスチェック完了 ---");
    report
}
