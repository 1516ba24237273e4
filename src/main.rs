//! Tuning Lab - policy-checked SQL*Plus broker.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tuning_lab::api::{self, AppState};
use tuning_lab::cli::{Cli, Command};
use tuning_lab::config::Config;
use tuning_lab::error::LabError;
use tuning_lab::runner::{MockRunner, ScriptRunner, SqlPlusRunner};
use tuning_lab::safety::PolicyEngine;
use tuning_lab::{commands, logging};

fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Could not load .env: {e}");
        }
    }

    match run(Cli::parse_args()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            let category = e
                .downcast_ref::<LabError>()
                .map_or("Error", LabError::category);
            error!("{}: {:#}", category, e);
            eprintln!("{category}: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)
        .with_context(|| format!("Loading {}", config_path.display()))?;

    if cli.log_to_file && config.logging.file.is_none() {
        config.logging.file = Some(logging::default_log_path());
    }
    logging::init(&config.logging);
    info!("Loaded config from: {}", config_path.display());

    let runtime = tokio::runtime::Runtime::new().context("Starting async runtime")?;
    runtime.block_on(dispatch(cli, config))
}

async fn dispatch(cli: Cli, config: Config) -> anyhow::Result<bool> {
    let policy = PolicyEngine::new(config.policy.max_script_chars);

    match cli.command {
        Command::Check { script } => {
            let script = commands::read_script(&script)?;
            Ok(commands::check(&policy, &script, &mut std::io::stdout())?)
        }
        Command::Run { script } => {
            let script = commands::read_script(&script)?;
            let runner = build_runner(cli.mock, &config)?;
            let color = std::io::stdout().is_terminal();
            Ok(commands::run(
                &policy,
                runner.as_ref(),
                &config.runner,
                &script,
                color,
                &mut std::io::stdout(),
            )
            .await?)
        }
        Command::Health => {
            let runner = build_runner(cli.mock, &config)?;
            Ok(commands::health(runner.as_ref(), &mut std::io::stdout()).await?)
        }
        Command::Serve { bind } => {
            let runner = build_runner(cli.mock, &config)?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let listener = TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Binding {bind}"))?;

            let shutdown = CancellationToken::new();
            tokio::spawn(cancel_on_signal(shutdown.clone()));

            api::serve(listener, AppState::new(&config, runner), shutdown).await?;
            Ok(true)
        }
    }
}

fn build_runner(mock: bool, config: &Config) -> anyhow::Result<Arc<dyn ScriptRunner>> {
    if mock {
        info!("Using mock runner");
        return Ok(Arc::new(MockRunner::new()));
    }
    info!(
        "Runner: {} exec {} ({})",
        config.runner.docker,
        config.runner.container,
        config.database.display_string()
    );
    Ok(Arc::new(SqlPlusRunner::from_config(config)?))
}

async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
    token.cancel();
}
