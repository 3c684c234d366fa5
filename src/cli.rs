//! コマンドライン引数の定義

use crate::domain::diagnostics::DiagnosticsEndpoint;
use crate::domain::probe::DEFAULT_PROBES_PATH;
use crate::infra::config::BACKEND_URL_VAR;
use clap::{Args, Parser, Subcommand};

/// Knowledge Engine のブラックボックスQAハーネス
#[derive(Parser, Debug)]
#[command(name = "knowledge-probe")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    REACT_APP_BACKEND_URL     Backend base URL (.env / frontend/.env)
    KE_REQUEST_TIMEOUT_SECS   Per-request timeout (default: 30)
    KE_POLL_INTERVAL_SECS     Job polling interval (default: 5)
    KE_JOB_TIMEOUT_SECS       Job completion timeout (default: 300)
    RUST_LOG                  Log filter (overrides --log-level)

EXIT CODES:
    0 success, 1 check failed, 2 job failed, 3 job timed out,
    4 backend unavailable or backend URL not configured
"#)]
pub struct Cli {
    /// バックエンドのベースURL（未指定なら REACT_APP_BACKEND_URL）
    #[arg(long, global = true, env = BACKEND_URL_VAR)]
    pub backend_url: Option<String>,

    /// ログレベル（RUST_LOGが設定されていればそちらを使う）
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// /api/health を確認する
    Health,
    /// YAMLで定義したプローブを実行する
    Run(RunArgs),
    /// Content Library の操作
    #[command(subcommand)]
    Library(LibraryCommand),
    /// WYSIWYGクリーンアップを実行して検証する
    Cleanup(CleanupArgs),
    /// V2エンジンの診断エンドポイントを取得する
    Diagnostics(DiagnosticsArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// プローブ定義ファイル
    #[arg(long, default_value = DEFAULT_PROBES_PATH)]
    pub probes: String,
    /// 名前で絞り込む
    #[arg(long)]
    pub name: Option<String>,
    /// グループで絞り込む
    #[arg(long)]
    pub group: Option<String>,
    /// ヘルスチェックを省略する
    #[arg(long)]
    pub skip_health: bool,
}

#[derive(Subcommand, Debug)]
pub enum LibraryCommand {
    /// 概要と先頭の記事を表示する
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// 作成 → 更新 → 削除 を検証する
    Roundtrip,
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// 対象記事ID（複数指定可、省略時は全記事）
    #[arg(long = "article-id")]
    pub article_ids: Vec<String>,
    /// 許容する最低成功率（%）
    #[arg(long, default_value_t = 100.0)]
    pub min_success_rate: f64,
    /// 1記事あたりの<hr>上限
    #[arg(long)]
    pub max_hr: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DiagnosticsArgs {
    /// 対象エンドポイント（省略時はすべて）
    #[arg(long)]
    pub endpoint: Vec<DiagnosticsEndpoint>,
    /// engineで有効になっているべき機能フラグ
    #[arg(long = "require-feature")]
    pub required_features: Vec<String>,
}

impl DiagnosticsArgs {
    pub fn endpoints(&self) -> Vec<DiagnosticsEndpoint> {
        if self.endpoint.is_empty() {
            DiagnosticsEndpoint::ALL.to_vec()
        } else {
            self.endpoint.clone()
        }
    }
}

/// `--backend-url`の説明で参照する環境変数名
pub fn backend_url_hint() -> String {
    format!("--backend-url か {} を指定してください", BACKEND_URL_VAR)
}
