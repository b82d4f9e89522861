//! TOML configuration: station metadata, archive location, unit labels,
//! almanac settings, and the per-mode subreport definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::render::Encoding;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub units: UnitsConfig,
    #[serde(default)]
    pub almanac: AlmanacConfig,
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude_m: f64,
    /// First day of the week for week windows, 0 = Monday .. 6 = Sunday.
    #[serde(default = "default_week_start")]
    pub week_start: u32,
    /// Month (1..=12) on which the rain year begins.
    #[serde(default = "default_rain_year_start")]
    pub rain_year_start: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// JSON file holding the archive records.
    pub path: PathBuf,
}

/// Unit label preferences handed to the statistics views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitsConfig {
    /// Observable name -> display label, e.g. `out_temp = "°F"`.
    #[serde(default)]
    pub labels: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlmanacConfig {
    /// Eight moon phase names, new moon first.
    #[serde(default = "default_moon_phases")]
    pub moon_phases: Vec<String>,
}

impl Default for AlmanacConfig {
    fn default() -> Self {
        AlmanacConfig {
            moon_phases: default_moon_phases(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Directory holding the template files.
    pub skin_root: PathBuf,
    /// Root of the generated output tree.
    pub html_root: PathBuf,
    /// Summary-by subreports, keyed by granularity name ("month" or
    /// "year"). Keys are validated by the report engine before any file
    /// is written; an unknown key fails the invocation.
    #[serde(default)]
    pub summary: IndexMap<String, Vec<SubreportDefinition>>,
    /// To-date subreports, rendered as of a single instant.
    #[serde(default)]
    pub to_date: Vec<SubreportDefinition>,
}

/// One report artifact: a template and where its output lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubreportDefinition {
    /// Template path relative to `skin_root`. The basename may embed the
    /// `YYYY` and `MM` placeholders and a trailing `.tmpl` suffix.
    pub template: PathBuf,
    /// Destination subdirectory under `html_root`. Defaults to the
    /// template's own parent directory.
    #[serde(default)]
    pub destination: Option<PathBuf>,
    #[serde(default)]
    pub encoding: Encoding,
}

fn default_week_start() -> u32 {
    6
}

fn default_rain_year_start() -> u32 {
    1
}

fn default_moon_phases() -> Vec<String> {
    [
        "New",
        "Waxing crescent",
        "First quarter",
        "Waxing gibbous",
        "Full",
        "Waning gibbous",
        "Last quarter",
        "Waning crescent",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig {
                name: "My Weather Station".to_string(),
                latitude: 45.0,
                longitude: -122.0,
                altitude_m: 100.0,
                week_start: default_week_start(),
                rain_year_start: default_rain_year_start(),
            },
            archive: ArchiveConfig {
                path: PathBuf::from("archive.json"),
            },
            units: UnitsConfig::default(),
            almanac: AlmanacConfig::default(),
            reports: ReportsConfig {
                skin_root: PathBuf::from("skins/standard"),
                html_root: PathBuf::from("public_html"),
                summary: IndexMap::from([
                    (
                        "month".to_string(),
                        vec![SubreportDefinition {
                            template: PathBuf::from("NOAA/NOAA-YYYY-MM.txt.tmpl"),
                            destination: None,
                            encoding: Encoding::StrictAscii,
                        }],
                    ),
                    (
                        "year".to_string(),
                        vec![SubreportDefinition {
                            template: PathBuf::from("NOAA/NOAA-YYYY.txt.tmpl"),
                            destination: None,
                            encoding: Encoding::StrictAscii,
                        }],
                    ),
                ]),
                to_date: vec![SubreportDefinition {
                    template: PathBuf::from("index.html.tmpl"),
                    destination: None,
                    encoding: Encoding::HtmlEntities,
                }],
            },
        }
    }
}

impl Config {
    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), crate::StratusError> {
        if !(-90.0..=90.0).contains(&self.station.latitude) {
            return Err(crate::StratusError::Config(format!(
                "latitude out of range: {}",
                self.station.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.station.longitude) {
            return Err(crate::StratusError::Config(format!(
                "longitude out of range: {}",
                self.station.longitude
            )));
        }
        if self.station.week_start > 6 {
            return Err(crate::StratusError::Config(format!(
                "week_start must be 0..=6, got {}",
                self.station.week_start
            )));
        }
        if !(1..=12).contains(&self.station.rain_year_start) {
            return Err(crate::StratusError::Config(format!(
                "rain_year_start must be 1..=12, got {}",
                self.station.rain_year_start
            )));
        }
        if self.almanac.moon_phases.len() != 8 {
            return Err(crate::StratusError::Config(format!(
                "moon_phases must list exactly 8 names, got {}",
                self.almanac.moon_phases.len()
            )));
        }
        Ok(())
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, crate::StratusError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| crate::StratusError::Config(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), crate::StratusError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::StratusError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.station.name, config.station.name);
        assert_eq!(parsed.station.week_start, 6);
        assert_eq!(parsed.reports.summary.len(), 2);
        parsed.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_rain_year_start() {
        let mut config = Config::default();
        config.station.rain_year_start = 13;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_phase_table() {
        let mut config = Config::default();
        config.almanac.moon_phases.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn minimal_config_parses_with_defaults() {
        let toml = r#"
            [station]
            name = "Backyard"
            latitude = 44.0
            longitude = -121.3

            [archive]
            path = "archive.json"

            [reports]
            skin_root = "skins/standard"
            html_root = "out"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.station.week_start, 6);
        assert_eq!(config.station.rain_year_start, 1);
        assert_eq!(config.almanac.moon_phases.len(), 8);
        assert!(config.reports.summary.is_empty());
        assert!(config.reports.to_date.is_empty());
    }
}
