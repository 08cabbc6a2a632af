mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use homedeck_core::Controller;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The control surface owns the terminal, so its logs go to a file.
    let guard = match &cli.command {
        Command::Control(args) => {
            let log_file = args.log_file.clone().unwrap_or_else(default_log_file);
            Some(init_file_tracing(cli.global.verbose, &log_file))
        }
        _ => {
            init_tracing(cli.global.verbose);
            None
        }
    };

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        drop(guard);
        std::process::exit(code);
    }
}

fn level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level(verbosity))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_log_file() -> PathBuf {
    homedeck_config::config_path()
        .parent()
        .map_or_else(std::env::temp_dir, Path::to_path_buf)
        .join("control.log")
}

/// File-based tracing for the control surface. The returned guard must be
/// held until exit so buffered lines are flushed.
fn init_file_tracing(verbosity: u8, log_file: &Path) -> WorkerGuard {
    let level = level(verbosity);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("homedeck={level},homedeck_core={level},homedeck_api={level}"))
    });

    let log_dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(std::env::temp_dir, Path::to_path_buf);
    let _ = std::fs::create_dir_all(&log_dir);
    let file_name = log_file
        .file_name()
        .map_or_else(|| "control.log".into(), std::ffi::OsStr::to_os_string);

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a server connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "homedeck", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let controller_config = config::build_controller_config(&cli.global)?;
            let controller = Controller::new(controller_config)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &controller, &cli.global).await
        }
    }
}
