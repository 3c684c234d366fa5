use crate::domain::job::JobOutcome;
use crate::types::ProbeExit;
use serde::Serialize;
use std::fmt;

/// 1つのチェックの判定結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
    /// 不合格時に採用する終了コード
    pub severity: ProbeExit,
}

impl CheckResult {
    pub fn pass<N: Into<String>, D: Into<String>>(name: N, detail: D) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
            severity: ProbeExit::Success,
        }
    }

    pub fn fail<N: Into<String>, D: Into<String>>(name: N, detail: D) -> Self {
        Self::fail_with(name, detail, ProbeExit::ChecksFailed)
    }

    pub fn fail_with<N: Into<String>, D: Into<String>>(
        name: N,
        detail: D,
        severity: ProbeExit,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
            severity,
        }
    }

    /// 条件に応じて合格・不合格を作る
    pub fn check<N: Into<String>, D: Into<String>>(name: N, passed: bool, detail: D) -> Self {
        if passed {
            Self::pass(name, detail)
        } else {
            Self::fail(name, detail)
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "✅ PASS" } else { "❌ FAIL" };
        write!(f, "{} {}: {}", mark, self.name, self.detail)
    }
}

/// 判定結果を1行で標準出力に表示する
pub fn log_test_result(result: &CheckResult) {
    println!("{}", result);
}

/// 1つのプローブ（またはコマンド）の結果
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub name: String,
    pub checks: Vec<CheckResult>,
    pub job: Option<JobOutcome>,
    /// 途中で打ち切った場合の終了コードと理由
    pub aborted: Option<(ProbeExit, String)>,
}

impl ProbeReport {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            checks: Vec::new(),
            job: None,
            aborted: None,
        }
    }

    /// チェック結果を追加して表示する
    pub fn record(&mut self, result: CheckResult) {
        log_test_result(&result);
        self.checks.push(result);
    }

    /// 打ち切りを記録する
    pub fn abort<R: Into<String>>(&mut self, exit: ProbeExit, reason: R) {
        let reason = reason.into();
        println!("⛔ {} を中断: {}", self.name, reason);
        self.aborted = Some((exit, reason));
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.len() - self.passed_count()
    }

    /// 終了コード。打ち切りと不合格チェックのうち最も重大なもの
    pub fn exit_status(&self) -> ProbeExit {
        let from_checks = self
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.severity);
        let from_abort = self.aborted.iter().map(|(exit, _)| *exit);
        ProbeExit::worst(from_checks.chain(from_abort))
    }

    pub fn is_success(&self) -> bool {
        self.exit_status() == ProbeExit::Success
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: 合格{}件、不合格{}件 → {}",
            self.name,
            self.passed_count(),
            self.failed_count(),
            self.exit_status()
        )
    }
}

/// 複数レポートの集計を表示し、全体の終了コードを返す
pub fn print_summary(reports: &[ProbeReport]) -> ProbeExit {
    println!("\n=== 結果サマリ ===");
    for report in reports {
        println!("{}", report);
    }
    let overall = ProbeExit::worst(reports.iter().map(ProbeReport::exit_status));
    println!("全体: {}", overall);
    overall
}
