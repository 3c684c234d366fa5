use anyhow::{Context, Result};
use clap::Parser;
use knowledge_probe::{
    app::workflow::execute_probes,
    cli::{backend_url_hint, Cli, Commands, LibraryCommand},
    domain::{
        probe::{search_probes, ProbeQuery},
        report::{print_summary, ProbeReport},
    },
    infra::{
        api::http::ReqwestHttpClient,
        config::{load_dotenv, BackendConfig},
        logging,
    },
    task::{
        cleanup::{run_cleanup, CleanupOptions},
        diagnostics::run_diagnostics,
        health::run_health,
        library::{list_library, roundtrip},
    },
    types::ProbeExit,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // 環境変数を読み込み（.envファイルがあれば使用）
    load_dotenv();
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("ログの初期化に失敗しました: {}", e);
    }

    let exit = match run(cli).await {
        Ok(exit) => exit,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("エラー: {:#}", e);
            ProbeExit::from_error(&e)
        }
    };
    std::process::exit(exit.code());
}

async fn run(cli: Cli) -> Result<ProbeExit> {
    let config = BackendConfig::from_lookup_with_override(
        |name| std::env::var(name).ok(),
        cli.backend_url.as_deref(),
    )
    .with_context(backend_url_hint)?;
    info!(backend = %config.base_url, "Knowledge Engineに接続");

    let client = ReqwestHttpClient::new(&config);

    let reports: Vec<ProbeReport> = match cli.command {
        Commands::Health => vec![run_health(&client).await],
        Commands::Run(args) => {
            let query = ProbeQuery {
                group: args.group,
                name: args.name,
            };
            let probes = search_probes(&args.probes, Some(query))
                .with_context(|| format!("プローブ定義の読み込みに失敗: {}", args.probes))?;
            if probes.is_empty() {
                anyhow::bail!("条件に一致するプローブがありません: {}", args.probes);
            }
            execute_probes(&client, &config, &probes, args.skip_health).await
        }
        Commands::Library(LibraryCommand::List { limit }) => {
            vec![list_library(&client, limit).await]
        }
        Commands::Library(LibraryCommand::Roundtrip) => vec![roundtrip(&client).await],
        Commands::Cleanup(args) => {
            let options = CleanupOptions {
                article_ids: args.article_ids,
                min_success_rate: args.min_success_rate,
                max_hr_per_article: args.max_hr,
                ..Default::default()
            };
            vec![run_cleanup(&client, &options).await]
        }
        Commands::Diagnostics(args) => {
            vec![run_diagnostics(&client, &args.endpoints(), &args.required_features).await]
        }
    };

    Ok(print_summary(&reports))
}
