use clap::Parser;
use colored::*;
use std::process;
use stratus::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging with STRATUS_LOG environment variable support
    let log_level = std::env::var("STRATUS_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        // Use appropriate exit codes based on error type
        let exit_code = match e.downcast_ref::<stratus::StratusError>() {
            Some(stratus::StratusError::Config(_))
            | Some(stratus::StratusError::UnrecognizedMode(_)) => 2,
            Some(stratus::StratusError::Io(_))
            | Some(stratus::StratusError::Destination(_)) => 3,
            Some(stratus::StratusError::Archive(_)) => 4,
            Some(stratus::StratusError::Template(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => stratus::cli::commands::generate::run(args),
        Commands::Init(args) => stratus::cli::commands::init::run(args),
    }
}
