//! Command-line front end: argument parsing, settings resolution and one-shot job runs.

pub mod cli_args;

use std::sync::Arc;

use studio_core::config::{config_path, save_config};
use studio_core::logging::{LoggingDestination, init_logging};
use studio_core::{
    FileConfig, JobRequest, ProcessRunner, RecordingRunner, RuntimeOverrides, Studio,
    StudioSettings, ToolRunner, apply_runtime_overrides, load_config, resolve_settings,
};
use tracing::warn;

pub use cli_args::{Cli, Command, ConfigCommand, RunArgs, ServeArgs};

/// Load `config.toml`, apply CLI overrides and resolve the result.
///
/// Warnings are returned rather than printed so callers decide where they go.
pub fn load_settings(overrides: &RuntimeOverrides) -> (StudioSettings, Vec<String>) {
    let (config, warnings) = load_effective_config(overrides);
    (resolve_settings(&config, None), warnings)
}

fn load_effective_config(overrides: &RuntimeOverrides) -> (FileConfig, Vec<String>) {
    let load = load_config();
    let mut warnings = load.warnings;
    let mut config = load.config;
    if !overrides.is_empty() {
        apply_runtime_overrides(&mut config, overrides, &mut warnings);
    }
    (config, warnings)
}

/// Run every command except `serve`, which the umbrella binary hands to the web crate.
pub fn dispatch(command: Command) -> Result<(), String> {
    match command {
        Command::Config(cmd) => handle_config_command(cmd),
        Command::Serve(_) => Err("The web server is started by the ultra-studio binary.".into()),
        Command::UltraClean(args) => run_job(args.to_request(), &args.run),
        Command::StandardClean(args) => run_job(args.to_request(), &args.run),
        Command::Split(args) => run_job(args.to_request(), &args.run),
        Command::Extract(args) => run_job(args.to_request(), &args.run),
        Command::Merge(args) => run_job(args.to_request(), &args.run),
        Command::Compress(args) => run_job(args.to_request(), &args.run),
    }
}

fn run_job(request: JobRequest, run: &RunArgs) -> Result<(), String> {
    let (settings, warnings) = load_settings(&run.paths.to_runtime_overrides());
    for warning in warnings {
        eprintln!("Warning: {warning}");
    }

    if run.dry_run {
        let studio = Studio::new(settings.workspace(), Arc::new(RecordingRunner::new()));
        let plan = studio.plan(&request).map_err(|err| err.to_string())?;
        println!("{}", plan.command);
        return Ok(());
    }

    if let Err(err) = init_logging(LoggingDestination::StderrOnly) {
        eprintln!("Warning: logging unavailable: {err}");
    }

    let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner);
    let studio = Studio::new(settings.workspace(), runner);
    let report = studio.run(&request).map_err(|err| {
        warn!(job = %request.kind(), error = %err, "job failed");
        err.to_string()
    })?;

    for output in &report.outputs {
        println!("{}", output.display());
    }
    if report.outputs.is_empty() {
        eprintln!("No output files were produced.");
    }
    Ok(())
}

fn handle_config_command(command: ConfigCommand) -> Result<(), String> {
    match command {
        ConfigCommand::Path => {
            println!("{}", config_path().display());
            Ok(())
        }
        ConfigCommand::Show => {
            let (config, warnings) = load_effective_config(&RuntimeOverrides::default());
            for warning in warnings {
                eprintln!("Warning: {warning}");
            }
            let rendered = toml::to_string_pretty(&config).map_err(|err| err.to_string())?;
            print!("{rendered}");
            Ok(())
        }
        ConfigCommand::Init { force } => {
            let path = config_path();
            if path.exists() && !force {
                return Err(format!(
                    "{} already exists. Pass --force to overwrite it.",
                    path.display()
                ));
            }
            let written = save_config(&FileConfig::default()).map_err(|err| err.to_string())?;
            println!("Wrote {}", written.display());
            Ok(())
        }
    }
}
