//! `convocatorias` binary: one harvest cycle by default, or the read-only
//! dashboard with `serve`.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};

use convocatorias_monitor::api::{self, AppState};
use convocatorias_monitor::cli::{Cli, Command, RunArgs, ServeArgs};
use convocatorias_monitor::config::{resolve_config_dir, AppConfig};
use convocatorias_monitor::error::PipelineError;
use convocatorias_monitor::ingest::fetch::HttpFetcher;
use convocatorias_monitor::metrics::Metrics;
use convocatorias_monitor::notify::{DigestNotifier, EmailNotifier, UnavailableNotifier};
use convocatorias_monitor::{init_tracing, run_cycle};

fn build_notifier(config: &AppConfig, force: bool) -> Option<Box<dyn DigestNotifier>> {
    if !(force || config.settings.notify.enabled) {
        return None;
    }
    match EmailNotifier::from_env() {
        Ok(n) => Some(Box::new(n)),
        Err(e) => {
            warn!(error = %e, "email notifier unavailable");
            Some(Box::new(UnavailableNotifier(e.to_string())))
        }
    }
}

async fn run(args: RunArgs) -> ExitCode {
    let dir = resolve_config_dir(args.config_dir.as_deref());
    let config = match AppConfig::load(&dir) {
        Ok(c) => c,
        Err(e) => {
            let e = PipelineError::from(e);
            error!(error = %e, "configuration rejected");
            return ExitCode::from(e.exit_code());
        }
    };

    let fetcher = match HttpFetcher::from_settings(&config.settings.run) {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, "cannot build HTTP client");
            return ExitCode::FAILURE;
        }
    };
    let notifier = build_notifier(&config, args.send_email);

    match run_cycle(&config, &fetcher, notifier.as_deref(), Utc::now()).await {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "harvest aborted");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let dir = resolve_config_dir(args.config_dir.as_deref());
    let config = Arc::new(AppConfig::load(&dir).context("load configuration")?);
    let metrics = Metrics::install()?;

    if let Some(period) = args.harvest_interval() {
        let config = Arc::clone(&config);
        let fetcher = HttpFetcher::from_settings(&config.settings.run)
            .context("build HTTP client")?;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match run_cycle(&config, &fetcher, None, Utc::now()).await {
                    Ok(s) => info!(
                        target: "harvest",
                        added = s.records_added,
                        updated = s.records_updated,
                        failed = s.failures.len(),
                        "background harvest tick"
                    ),
                    Err(e) => error!(target: "harvest", error = %e, "background harvest failed"),
                }
            }
        });
    }

    let output = &config.settings.output;
    let artifacts_dir = output
        .digest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf());
    let state = AppState::new(output.store_path.clone());
    let app = api::router(state, artifacts_dir, Some(&metrics));

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("bind {}", args.addr))?;
    info!(addr = %args.addr, "dashboard listening");
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env when present; no-op otherwise.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json());

    match cli.command {
        None => run(cli.run).await,
        Some(Command::Run(args)) => run(args).await,
        Some(Command::Serve(args)) => match serve(args).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = ?e, "dashboard stopped");
                ExitCode::FAILURE
            }
        },
    }
}
