// tbx/src/main.rs
use std::fs;
use std::process;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tbx_common::config::Config;
use tbx_common::error::{Result as TbxResult, TbxError};
use tbx_common::{RemoteRepository, SessionConfig};
use tbx_core::ToolboxResolver;
use tbx_net::MavenEngine;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::CliArgs;

fn init_logging(config: &Config, verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("TBX_LOG")
        .from_env_lossy();

    let log_dir = config.logs_dir();
    if verbose > 0 {
        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!(
                "{} Failed to create log directory {}: {}",
                "Warning:".yellow().bold(),
                log_dir.display(),
                e
            );
        } else {
            let file_appender = tracing_appender::rolling::daily(&log_dir, "tbx.log");
            let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

            let stderr_writer = std::io::stderr.with_max_level(max_log_level);
            let file_writer = non_blocking_appender.with_max_level(max_log_level);

            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(stderr_writer.and(file_writer))
                .with_ansi(true)
                .without_time()
                .try_init();

            Box::leak(Box::new(guard));
            debug!("Writing logs to: {}/tbx.log", log_dir.display());
            return;
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .without_time()
        .try_init();
}

fn apply_overrides(config: &mut Config, cli_args: &CliArgs) -> TbxResult<()> {
    if !cli_args.repositories.is_empty() {
        config.remote_repositories = cli_args
            .repositories
            .iter()
            .map(|spec| RemoteRepository::parse_spec(spec))
            .collect::<TbxResult<Vec<_>>>()?;
    }
    if cli_args.offline {
        config.offline = true;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> TbxResult<()> {
    let cli_args = CliArgs::parse();

    let mut config = Config::load()
        .map_err(|e| TbxError::Config(format!("Could not load config: {e}")))?;
    init_logging(&config, cli_args.verbose);

    let outcome = async {
        apply_overrides(&mut config, &cli_args)?;
        debug!(
            "Using local repository {} and remotes [{}]",
            config.local_repository().display(),
            config
                .remote_repositories
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let engine = Arc::new(MavenEngine::new(&config)?);
        let resolver = ToolboxResolver::new(
            engine,
            SessionConfig::default(),
            config.remote_repositories.clone(),
        );
        cli_args.command.run(&resolver).await
    }
    .await;

    if let Err(e) = outcome {
        error!("Command failed: {:#}", e);
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        process::exit(1);
    }

    debug!("Command completed successfully.");
    Ok(())
}
