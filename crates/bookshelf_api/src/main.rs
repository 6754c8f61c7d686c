//! `bookshelf` server entry point.

use bookshelf_api::config::{AppConfig, Cli};
use bookshelf_core::{default_log_level, init_logging};
use clap::Parser;
use log::error;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match AppConfig::resolve(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("bookshelf: {err}");
            return ExitCode::FAILURE;
        }
    };

    let level = config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    if let Err(err) = init_logging(&level, config.logging.dir.as_deref()) {
        eprintln!("bookshelf: {err}");
        return ExitCode::FAILURE;
    }

    match bookshelf_api::serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_exit module=api status=error error={err}");
            eprintln!("bookshelf: {err}");
            ExitCode::FAILURE
        }
    }
}
