use anyhow::{bail, Context as _};
use chrono::{Local, LocalResult, NaiveDate, TimeZone};
use clap::Args;
use colored::*;
use std::path::PathBuf;

use crate::config::load_config;
use crate::generate::ReportEngine;
use crate::render::SubstitutionEngine;
use crate::stats::Archive;

#[derive(Args)]
pub struct GenerateArgs {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = "stratus.toml")]
    pub config: PathBuf,

    /// First instant of the range (unix timestamp or YYYY-MM-DD);
    /// defaults to the start of the archive
    #[arg(long)]
    pub start: Option<String>,

    /// Last instant of the range (unix timestamp or YYYY-MM-DD);
    /// defaults to the end of the archive
    #[arg(long)]
    pub stop: Option<String>,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let archive = Archive::load(&config.archive.path)?;
    if archive.is_empty() {
        bail!(
            "archive {} holds no records",
            config.archive.path.display()
        );
    }

    let range_start = match &args.start {
        Some(text) => parse_instant(text)?,
        None => archive.first_timestamp().unwrap_or_default(),
    };
    let range_stop = match &args.stop {
        Some(text) => parse_instant(text)?,
        None => archive.last_timestamp().unwrap_or_default(),
    };
    if range_start > range_stop {
        bail!("range start {} is after range stop {}", range_start, range_stop);
    }

    let renderer = SubstitutionEngine;
    let mut engine = ReportEngine::new(&config, Local, &archive, &renderer);
    let current = archive.latest_at(range_stop);
    let batches = engine.run(range_start, range_stop, current)?;

    let mut total = 0;
    for batch in &batches {
        total += batch.files_written;
        println!(
            "{} {}: {} files in {:.2}s",
            "✓".green().bold(),
            batch.mode,
            batch.files_written,
            batch.elapsed.as_secs_f64()
        );
    }
    println!("{} {} files generated", "Done:".bold(), total);
    Ok(())
}

/// Accepts a unix timestamp or a `YYYY-MM-DD` local calendar date
/// (interpreted as local midnight).
fn parse_instant(text: &str) -> anyhow::Result<i64> {
    if let Ok(ts) = text.parse::<i64>() {
        if !crate::timespan::representable(ts) {
            bail!("timestamp {} is outside the supported calendar range", ts);
        }
        return Ok(ts);
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("'{}' is neither a timestamp nor YYYY-MM-DD", text))?;
    let naive = date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time");
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt.timestamp()),
        LocalResult::None => bail!("'{}' falls in a DST gap", text),
    }
}
