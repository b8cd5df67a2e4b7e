use clap::Parser;
use studio_cli::Cli;

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Some(command) => studio_cli::dispatch(command),
        None => Err("Choose a subcommand; run the ultra-studio binary for the web panel.".into()),
    };
    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

