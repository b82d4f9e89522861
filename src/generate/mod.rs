//! The report driver: orchestrates subreports and periods through output
//! resolution, the regeneration policy, context assembly, rendering, and
//! the period registry.
//!
//! The pipeline is a single-threaded synchronous batch: periods and
//! subreports are processed strictly in sequence, so the registry and the
//! existence checks in the regeneration policy need no locking. A failure
//! local to one period or subreport is logged and the batch continues;
//! only configuration-level errors abort the invocation.

pub mod context;
pub mod output;
pub mod registry;

use chrono::TimeZone;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{Config, SubreportDefinition};
use crate::render::TemplateEngine;
use crate::stats::{ArchiveRecord, StatsSource};
use crate::timespan::{
    calendar_spans, day_span, local_date, month_span, rain_year_span, week_span, year_span,
    Granularity,
};
use chrono::Datelike;
use context::{encoding_layer, merge_layers, summary_context, to_date_base_context, ToDateViews};
use output::{
    destination_dir, ensure_destination, regeneration_decision, resolve_period_output,
    resolve_to_date_output, RegenerationDecision,
};
use registry::PeriodRegistry;

/// The report modes the driver knows how to partition for. Parsed from
/// configuration exactly once, before any file is written; an unknown mode
/// name fails the whole invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Month,
    Year,
    ToDate,
}

impl ReportMode {
    /// Key under which this mode's period labels are recorded.
    pub fn registry_key(self) -> &'static str {
        match self {
            ReportMode::Month => "summary_month",
            ReportMode::Year => "summary_year",
            ReportMode::ToDate => "to_date",
        }
    }

    /// Parse a `[reports.summary]` table key.
    pub fn from_summary_key(key: &str) -> crate::Result<ReportMode> {
        match key {
            "month" => Ok(ReportMode::Month),
            "year" => Ok(ReportMode::Year),
            other => Err(crate::StratusError::UnrecognizedMode(other.to_string())),
        }
    }

    /// The calendar granularity of a summary-by mode.
    pub fn granularity(self) -> Option<Granularity> {
        match self {
            ReportMode::Month => Some(Granularity::Month),
            ReportMode::Year => Some(Granularity::Year),
            ReportMode::ToDate => None,
        }
    }
}

impl From<Granularity> for ReportMode {
    fn from(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Month => ReportMode::Month,
            Granularity::Year => ReportMode::Year,
        }
    }
}

impl std::fmt::Display for ReportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.registry_key())
    }
}

/// Terminal report for one subreport batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub mode: ReportMode,
    pub files_written: usize,
    pub elapsed: Duration,
}

/// Drives the whole pipeline for one build invocation.
///
/// Owns the period registry; collaborators are borrowed so tests can swap
/// in their own stats sources and engines.
pub struct ReportEngine<'a, Tz, S, E>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    S: StatsSource,
    E: TemplateEngine,
{
    config: &'a Config,
    tz: Tz,
    stats: &'a S,
    engine: &'a E,
    registry: PeriodRegistry,
}

impl<'a, Tz, S, E> ReportEngine<'a, Tz, S, E>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    S: StatsSource,
    E: TemplateEngine,
{
    pub fn new(config: &'a Config, tz: Tz, stats: &'a S, engine: &'a E) -> Self {
        ReportEngine {
            config,
            tz,
            stats,
            engine,
            registry: PeriodRegistry::new(),
        }
    }

    /// Periods materialized so far, for navigation.
    pub fn registry(&self) -> &PeriodRegistry {
        &self.registry
    }

    /// Run every configured subreport: all summary-by batches over
    /// `[range_start, range_stop]`, then the to-date batch as of
    /// `range_stop` when a current observation is available.
    ///
    /// All summary mode keys are validated up front, so an unrecognized
    /// mode fails the invocation before any file is written.
    pub fn run(
        &mut self,
        range_start: i64,
        range_stop: i64,
        current: Option<&ArchiveRecord>,
    ) -> crate::Result<Vec<BatchSummary>> {
        let config = self.config;
        let mut planned: Vec<(ReportMode, &[SubreportDefinition])> = Vec::new();
        for (key, definitions) in &config.reports.summary {
            planned.push((ReportMode::from_summary_key(key)?, definitions.as_slice()));
        }

        let mut batches = Vec::new();
        for (mode, definitions) in planned {
            if let Some(granularity) = mode.granularity() {
                batches.push(self.generate_summary(
                    granularity,
                    definitions,
                    range_start,
                    range_stop,
                )?);
            }
        }
        if !config.reports.to_date.is_empty() {
            if let Some(record) = current {
                batches.push(self.generate_to_date(record, range_stop)?);
            } else {
                warn!("no current observation; skipping to_date reports");
            }
        }
        Ok(batches)
    }

    /// One summary-by batch: for each subreport, enumerate the calendar
    /// periods covering the range, decide per period whether the existing
    /// output is reusable, and render the rest.
    pub fn generate_summary(
        &mut self,
        granularity: Granularity,
        definitions: &[SubreportDefinition],
        range_start: i64,
        range_stop: i64,
    ) -> crate::Result<BatchSummary> {
        let mode = ReportMode::from(granularity);
        let started = Instant::now();
        let mut files_written = 0;

        for definition in definitions {
            let dir = destination_dir(definition, &self.config.reports.html_root);
            if let Err(e) = ensure_destination(&dir) {
                // Fatal to this subreport only; the batch continues
                warn!(mode = %mode, template = %definition.template.display(), "{}", e);
                continue;
            }
            let template_path = self.config.reports.skin_root.join(&definition.template);
            let subreport_started = Instant::now();
            let mut generated = 0;

            for span in calendar_spans(granularity, &self.tz, range_start, range_stop) {
                let label = self.period_label(granularity, span.start);
                // Recorded even when the file is skipped as already built,
                // so navigation covers the whole range
                self.registry.record(mode.registry_key(), label.as_str());

                let identity = resolve_period_output(
                    definition,
                    &self.config.reports.html_root,
                    &self.tz,
                    granularity,
                    &span,
                );
                let is_final = span.includes_end(range_stop);
                if regeneration_decision(&identity, is_final) == RegenerationDecision::Skip {
                    debug!(mode = %mode, period = %label, "output exists and period is closed; skipping");
                    continue;
                }

                let view = self.stats.aggregate(&span, &self.config.units);
                let ctx = summary_context(
                    &self.config.station,
                    &self.tz,
                    granularity,
                    &span,
                    &view,
                    identity.encoding,
                );
                let text = match self.engine.render(&template_path, &ctx, identity.encoding) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(mode = %mode, period = %label,
                              template = %template_path.display(), "{}", e);
                        continue;
                    }
                };
                if let Err(e) = std::fs::write(&identity.full_path, text) {
                    warn!(mode = %mode, period = %label,
                          path = %identity.full_path.display(), "write failed: {}", e);
                    continue;
                }
                generated += 1;
            }

            info!(
                "generated {} '{}' files in {:.2}s",
                generated,
                mode,
                subreport_started.elapsed().as_secs_f64()
            );
            files_written += generated;
        }

        let elapsed = started.elapsed();
        Ok(BatchSummary {
            mode,
            files_written,
            elapsed,
        })
    }

    /// The to-date batch: five rolling windows ending at `as_of`, one
    /// almanac snapshot shared across every subreport, always rebuilt.
    pub fn generate_to_date(
        &mut self,
        current: &ArchiveRecord,
        as_of: i64,
    ) -> crate::Result<BatchSummary> {
        let started = Instant::now();
        let mut files_written = 0;

        let station = &self.config.station;
        let views = ToDateViews {
            day: self.aggregate(day_span(&self.tz, as_of)),
            week: self.aggregate(week_span(&self.tz, as_of, station.week_start)),
            month: self.aggregate(month_span(&self.tz, as_of)),
            year: self.aggregate(year_span(&self.tz, as_of)),
            rainyear: self.aggregate(rain_year_span(&self.tz, as_of, station.rain_year_start)),
        };
        // Expensive; computed exactly once and shared across subreports
        let almanac = crate::almanac::compute(
            &self.tz,
            as_of,
            station.latitude,
            station.longitude,
            &self.config.almanac.moon_phases,
        );
        let base = to_date_base_context(station, current, &views, &almanac, &self.registry);

        for definition in &self.config.reports.to_date {
            let dir = destination_dir(definition, &self.config.reports.html_root);
            if let Err(e) = ensure_destination(&dir) {
                warn!(mode = "to_date", template = %definition.template.display(), "{}", e);
                continue;
            }
            let identity = resolve_to_date_output(definition, &self.config.reports.html_root);
            let template_path = self.config.reports.skin_root.join(&definition.template);
            let ctx = merge_layers([base.clone(), encoding_layer(identity.encoding)]);

            let text = match self.engine.render(&template_path, &ctx, identity.encoding) {
                Ok(text) => text,
                Err(e) => {
                    warn!(mode = "to_date", template = %template_path.display(), "{}", e);
                    continue;
                }
            };
            if let Err(e) = std::fs::write(&identity.full_path, text) {
                warn!(mode = "to_date", path = %identity.full_path.display(), "write failed: {}", e);
                continue;
            }
            files_written += 1;
        }

        let elapsed = started.elapsed();
        info!(
            "generated {} 'to_date' files in {:.2}s",
            files_written,
            elapsed.as_secs_f64()
        );
        Ok(BatchSummary {
            mode: ReportMode::ToDate,
            files_written,
            elapsed,
        })
    }

    fn aggregate(&self, span: crate::timespan::Timespan) -> crate::stats::StatisticsView {
        self.stats.aggregate(&span, &self.config.units)
    }

    /// Navigation label for a period: `YYYY` or `YYYY-MM`.
    fn period_label(&self, granularity: Granularity, period_start: i64) -> String {
        let date = local_date(&self.tz, period_start);
        match granularity {
            Granularity::Month => format!("{:04}-{:02}", date.year(), date.month()),
            Granularity::Year => format!("{:04}", date.year()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_keys_parse_to_modes() {
        assert_eq!(
            ReportMode::from_summary_key("month").unwrap(),
            ReportMode::Month
        );
        assert_eq!(
            ReportMode::from_summary_key("year").unwrap(),
            ReportMode::Year
        );
    }

    #[test]
    fn unknown_summary_key_is_unrecognized_mode() {
        let err = ReportMode::from_summary_key("decade").unwrap_err();
        match err {
            crate::StratusError::UnrecognizedMode(name) => assert_eq!(name, "decade"),
            other => panic!("expected UnrecognizedMode, got {other:?}"),
        }
    }

    #[test]
    fn registry_keys_are_stable() {
        assert_eq!(ReportMode::Month.registry_key(), "summary_month");
        assert_eq!(ReportMode::Year.registry_key(), "summary_year");
        assert_eq!(ReportMode::ToDate.registry_key(), "to_date");
    }

    #[test]
    fn granularity_round_trips_through_mode() {
        assert_eq!(
            ReportMode::from(Granularity::Month).granularity(),
            Some(Granularity::Month)
        );
        assert_eq!(ReportMode::ToDate.granularity(), None);
    }
}
