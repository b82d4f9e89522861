//! Output identity resolution and the regeneration policy.
//!
//! The resolver is a pure function from (subreport, period) to a
//! destination path; the policy is the pipeline's only caching rule.

use chrono::{Datelike, TimeZone};
use std::path::{Path, PathBuf};

use crate::config::SubreportDefinition;
use crate::render::Encoding;
use crate::timespan::{local_date, Granularity, Timespan};

/// Placeholder tokens substituted in a template's base name.
const YEAR_TOKEN: &str = "YYYY";
const MONTH_TOKEN: &str = "MM";
const TEMPLATE_SUFFIX: &str = ".tmpl";

/// The resolved destination for one (subreport, period) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputIdentity {
    pub full_path: PathBuf,
    pub encoding: Encoding,
}

/// Whether an existing output may be reused or must be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerationDecision {
    /// Existing output is final and reusable.
    Skip,
    Rebuild,
}

/// Destination directory for a subreport: its configured subdirectory, or
/// the template's own parent directory, under `html_root`.
pub fn destination_dir(definition: &SubreportDefinition, html_root: &Path) -> PathBuf {
    match &definition.destination {
        Some(sub) => html_root.join(sub),
        None => match definition.template.parent() {
            Some(parent) => html_root.join(parent),
            None => html_root.to_path_buf(),
        },
    }
}

/// Resolve the output identity for one period of a summary-by subreport.
///
/// The base name has its `.tmpl` suffix stripped, `YYYY` replaced with the
/// period's 4-digit start year, and, at month granularity, `MM` replaced
/// with the 2-digit start month. Pure function: no filesystem access.
pub fn resolve_period_output<Tz: TimeZone>(
    definition: &SubreportDefinition,
    html_root: &Path,
    tz: &Tz,
    granularity: Granularity,
    span: &Timespan,
) -> OutputIdentity {
    let start = local_date(tz, span.start);
    let mut name = base_name(&definition.template).replace(YEAR_TOKEN, &format!("{:04}", start.year()));
    if granularity == Granularity::Month {
        name = name.replace(MONTH_TOKEN, &format!("{:02}", start.month()));
    }
    OutputIdentity {
        full_path: destination_dir(definition, html_root).join(name),
        encoding: definition.encoding,
    }
}

/// Resolve the output identity for a to-date subreport: the template's base
/// name with the `.tmpl` suffix stripped.
pub fn resolve_to_date_output(definition: &SubreportDefinition, html_root: &Path) -> OutputIdentity {
    OutputIdentity {
        full_path: destination_dir(definition, html_root).join(base_name(&definition.template)),
        encoding: definition.encoding,
    }
}

fn base_name(template: &Path) -> String {
    let name = template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(TEMPLATE_SUFFIX) {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

/// Ensure the destination directory exists. An already-existing directory
/// is a no-op; any other creation failure is `Destination`.
pub fn ensure_destination(dir: &Path) -> crate::Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| crate::StratusError::Destination(format!("{}: {}", dir.display(), e)))
}

/// The pipeline's only caching rule: a closed historical period whose file
/// already exists is reused; everything else is rebuilt. Existence, not
/// recency, is the reuse signal, and a period still touching the tail of
/// the requested range is always rebuilt because new archive records may
/// have arrived since its output was produced.
pub fn regeneration_decision(
    output: &OutputIdentity,
    is_final_period_candidate: bool,
) -> RegenerationDecision {
    if output.full_path.exists() && !is_final_period_candidate {
        RegenerationDecision::Skip
    } else {
        RegenerationDecision::Rebuild
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn definition(template: &str) -> SubreportDefinition {
        SubreportDefinition {
            template: PathBuf::from(template),
            destination: None,
            encoding: Encoding::StrictAscii,
        }
    }

    fn july_2021() -> Timespan {
        Timespan::new(
            Utc.with_ymd_and_hms(2021, 7, 1, 0, 0, 0).unwrap().timestamp(),
            Utc.with_ymd_and_hms(2021, 8, 1, 0, 0, 0).unwrap().timestamp(),
        )
    }

    #[test]
    fn month_tokens_substituted_into_base_name() {
        let output = resolve_period_output(
            &definition("NOAA/NOAA-YYYY-MM.txt.tmpl"),
            Path::new("out"),
            &Utc,
            Granularity::Month,
            &july_2021(),
        );
        assert_eq!(output.full_path, Path::new("out/NOAA/NOAA-2021-07.txt"));
        assert_eq!(output.encoding, Encoding::StrictAscii);
    }

    #[test]
    fn year_granularity_leaves_month_token_alone() {
        let output = resolve_period_output(
            &definition("NOAA/NOAA-YYYY.txt.tmpl"),
            Path::new("out"),
            &Utc,
            Granularity::Year,
            &july_2021(),
        );
        assert_eq!(output.full_path, Path::new("out/NOAA/NOAA-2021.txt"));
    }

    #[test]
    fn explicit_destination_overrides_template_parent() {
        let mut def = definition("NOAA/NOAA-YYYY-MM.txt.tmpl");
        def.destination = Some(PathBuf::from("summaries"));
        let output = resolve_period_output(
            &def,
            Path::new("out"),
            &Utc,
            Granularity::Month,
            &july_2021(),
        );
        assert_eq!(output.full_path, Path::new("out/summaries/NOAA-2021-07.txt"));
    }

    #[test]
    fn distinct_periods_resolve_to_distinct_paths() {
        let def = definition("NOAA/NOAA-YYYY-MM.txt.tmpl");
        let spans: Vec<Timespan> = crate::timespan::calendar_spans(
            Granularity::Month,
            &Utc,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap().timestamp(),
            Utc.with_ymd_and_hms(2021, 12, 31, 0, 0, 0).unwrap().timestamp(),
        )
        .collect();
        let mut paths: Vec<PathBuf> = spans
            .iter()
            .map(|s| {
                resolve_period_output(&def, Path::new("out"), &Utc, Granularity::Month, s).full_path
            })
            .collect();
        let total = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), total);
    }

    #[test]
    fn to_date_output_strips_template_suffix_only() {
        let output = resolve_to_date_output(&definition("index.html.tmpl"), Path::new("out"));
        assert_eq!(output.full_path, Path::new("out/index.html"));
    }

    #[test]
    fn regeneration_truth_table() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("NOAA-2020-01.txt");
        std::fs::write(&existing, "report").unwrap();

        let present = OutputIdentity {
            full_path: existing,
            encoding: Encoding::Utf8,
        };
        let missing = OutputIdentity {
            full_path: dir.path().join("NOAA-2020-02.txt"),
            encoding: Encoding::Utf8,
        };

        assert_eq!(
            regeneration_decision(&present, false),
            RegenerationDecision::Skip
        );
        assert_eq!(
            regeneration_decision(&present, true),
            RegenerationDecision::Rebuild
        );
        assert_eq!(
            regeneration_decision(&missing, false),
            RegenerationDecision::Rebuild
        );
        assert_eq!(
            regeneration_decision(&missing, true),
            RegenerationDecision::Rebuild
        );
    }

    #[test]
    fn ensure_destination_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a/b");
        ensure_destination(&dest).unwrap();
        // Second call on an existing directory is a no-op, not an error
        ensure_destination(&dest).unwrap();
        assert!(dest.is_dir());
    }
}
