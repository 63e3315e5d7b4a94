//! pkcon - console client for the package service
//!
//! Parses the command line, loads configuration, connects to the service
//! and runs one command through the client crate.

mod cli;
mod error;

use crate::cli::{Cli, GlobalArgs};
use crate::error::{CliError, EXIT_FAILURE, EXIT_INTERRUPTED};
use clap::Parser;
use pkc_bus::socket::SocketBus;
use pkc_bus::EventChannel;
use pkc_client::{CancellationCoordinator, Command, Interrupt, TransactionContextBuilder};
use pkc_config::Config;
use pkc_types::ColorChoice;
use std::process;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

// Prompts hand their worker off while they wait, which needs this flavor
#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    // Configuration decides where debug logs go, so it comes first
    let config = match load_config(&cli.global).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(e.exit_code());
        }
    };

    init_tracing(&cli.global, &config);

    let code = match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("{e}");
            e.exit_code()
        }
    };
    process::exit(code);
}

/// Main application logic; returns the exit code
async fn run(cli: Cli, config: Config) -> Result<i32, CliError> {
    info!("Starting pkcon v{}", env!("CARGO_PKG_VERSION"));

    let bus: Arc<dyn EventChannel> = Arc::new(SocketBus::connect(&config.bus.socket_path).await?);

    let interactive = config
        .general
        .progress
        .is_interactive(console::Term::stdout().is_term());
    let mut ctx = TransactionContextBuilder::new()
        .with_bus(bus)
        .with_config(&config)
        .with_terminal(interactive, colors_enabled(config.general.color))
        .with_filters(cli.global.filter.clone())
        .with_nowait(cli.global.nowait)
        .build()
        .await?;

    let listener = spawn_interrupt_listener(ctx.cancellation.clone());
    let command = Command::from(cli.command);
    debug!(command = command.name(), "running command");
    let result = ctx.cancellation.token().guard(command.execute(&mut ctx)).await;
    listener.abort();

    if result.as_ref().is_ok_and(|outcome| outcome.is_success()) {
        info!("Command completed successfully");
        return Ok(0);
    }
    let outcome = result?;
    debug!(?outcome, "command did not succeed");
    ctx.console.failure("Command failed")?;
    Ok(EXIT_FAILURE)
}

/// Load configuration with precedence: file < environment < CLI flags
async fn load_config(global: &GlobalArgs) -> Result<Config, CliError> {
    let mut config = Config::load_or_default(global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, global);
    config.validate()?;
    Ok(config)
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs) {
    if let Some(color) = global.color {
        config.general.color = color;
    }
    if let Some(progress) = global.progress {
        config.general.progress = progress;
    }
    if let Some(socket) = &global.socket {
        config.bus.socket_path.clone_from(socket);
    }
}

fn colors_enabled(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stdout().features().colors_supported(),
    }
}

/// Cancel outstanding handles on the first interrupt, exit on the second
///
/// A prompt blocks the command task, so the second interrupt exits from
/// here rather than waiting for the command to notice.
fn spawn_interrupt_listener(cancellation: CancellationCoordinator) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for interrupts");
                return;
            }
            match cancellation.interrupt().await {
                Interrupt::Graceful { cancelled, failed } => {
                    debug!(cancelled, failed, "interrupted, cancelled outstanding handles");
                    if failed > 0 {
                        eprintln!("Failed to cancel {failed} transaction(s)");
                    }
                }
                Interrupt::Forced => {
                    eprintln!();
                    process::exit(EXIT_INTERRUPTED);
                }
            }
        }
    })
}

/// Initialize tracing/logging
fn init_tracing(global: &GlobalArgs, config: &Config) {
    if global.debug {
        // Debug mode: structured JSON logs to file
        let log_dir = config.log_dir();
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Warning: Failed to create log directory: {e}");
        }

        let log_file = log_dir.join(format!(
            "pkcon-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_env_filter(env_filter("debug"))
                    .init();

                eprintln!("Debug logging enabled: {}", log_file.display());
                return;
            }
            Err(e) => eprintln!("Warning: Failed to create log file: {e}"),
        }
    }

    let default = if global.verbose || global.debug {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(default))
        .init();
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
