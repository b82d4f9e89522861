use anyhow::bail;
use clap::Args;
use colored::*;
use std::path::PathBuf;

use crate::config::{default_config, save_config};

#[derive(Args)]
pub struct InitArgs {
    /// Where to write the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "stratus.toml")]
    pub config: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    if args.config.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            args.config.display()
        );
    }
    save_config(&args.config, &default_config())?;
    println!(
        "{} wrote default configuration to {}",
        "✓".green().bold(),
        args.config.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stratus.toml");
        run(InitArgs {
            config: path.clone(),
            force: false,
        })
        .unwrap();
        let config = crate::config::load_config(&path).unwrap();
        assert_eq!(config.station.week_start, 6);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stratus.toml");
        std::fs::write(&path, "# mine").unwrap();
        assert!(run(InitArgs {
            config: path.clone(),
            force: false,
        })
        .is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");
    }
}
