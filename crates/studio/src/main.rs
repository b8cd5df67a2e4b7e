//! Main entry point for ultra-studio
//!
//! - Web mode: no subcommand, or `serve`, starts the control panel.
//! - CLI mode: any other subcommand runs once and exits.

use anyhow::Result;
use clap::Parser;
use studio_cli::{Cli, Command, ServeArgs};
use studio_core::logging::{LoggingDestination, init_logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => serve(ServeArgs::default()).await,
        Some(Command::Serve(args)) => serve(args).await,
        Some(command) => {
            // Jobs block on ffmpeg; keep them off the async workers.
            let outcome = tokio::task::spawn_blocking(move || studio_cli::dispatch(command)).await?;
            if let Err(err) = outcome {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let log_path = match init_logging(LoggingDestination::FileAndStderr) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("Warning: structured logging unavailable: {err}");
            None
        }
    };

    let (settings, warnings) = studio_cli::load_settings(&args.to_runtime_overrides());
    for warning in warnings {
        eprintln!("Warning: {warning}");
    }
    if let Some(path) = log_path {
        info!(log = %path.display(), "writing logs");
    }

    if let Err(err) = studio_web::serve(settings).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
