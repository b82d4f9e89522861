pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stratus",
    version,
    about = "Template-driven weather report generation",
    long_about = "Stratus renders human-readable weather reports from a time-series archive: \
                  NOAA-style period summaries partitioned by calendar month or year, and \
                  to-date pages covering the rolling day/week/month/year/rain-year windows."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate all configured reports
    Generate(commands::generate::GenerateArgs),

    /// Write a default configuration file
    Init(commands::init::InitArgs),
}
