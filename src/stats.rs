//! Aggregate statistics over a timespan of archive records.
//!
//! The report engine only depends on the [`StatsSource`] trait; the archive
//! implementation here keeps the aggregation deliberately simple
//! (min/max/sum/avg per observable).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::UnitsConfig;
use crate::timespan::Timespan;

/// One archive row: a timestamp plus the observed values.
///
/// By archive convention a record timestamped exactly on a period boundary
/// belongs to the period it closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub timestamp: i64,
    #[serde(flatten)]
    pub values: IndexMap<String, f64>,
}

/// In-memory time-series archive, sorted by timestamp.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    records: Vec<ArchiveRecord>,
}

impl Archive {
    pub fn new(mut records: Vec<ArchiveRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Archive { records }
    }

    /// Load archive records from a JSON array file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            crate::StratusError::Archive(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let records: Vec<ArchiveRecord> = serde_json::from_str(&contents).map_err(|e| {
            crate::StratusError::Archive(format!(
                "cannot parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        if let Some(bad) = records
            .iter()
            .find(|r| !crate::timespan::representable(r.timestamp))
        {
            return Err(crate::StratusError::Archive(format!(
                "{}: timestamp {} is outside the supported calendar range",
                path.as_ref().display(),
                bad.timestamp
            )));
        }
        Ok(Archive::new(records))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.records.last().map(|r| r.timestamp)
    }

    /// The most recent record at or before `instant`, used as the current
    /// observation for to-date reports.
    pub fn latest_at(&self, instant: i64) -> Option<&ArchiveRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.timestamp <= instant)
    }
}

/// Aggregates for a single observable over one timespan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservableStats {
    pub count: usize,
    pub min: f64,
    pub min_time: i64,
    pub max: f64,
    pub max_time: i64,
    pub sum: f64,
    pub avg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The statistics view for one timespan, handed to the rendering context.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsView {
    pub span: Timespan,
    pub observables: IndexMap<String, ObservableStats>,
}

/// Source of aggregate statistics, keyed by timespan and unit preferences.
pub trait StatsSource {
    fn aggregate(&self, span: &Timespan, units: &UnitsConfig) -> StatisticsView;
}

impl StatsSource for Archive {
    fn aggregate(&self, span: &Timespan, units: &UnitsConfig) -> StatisticsView {
        let mut observables: IndexMap<String, ObservableStats> = IndexMap::new();
        for record in self
            .records
            .iter()
            .filter(|r| span.includes_end(r.timestamp))
        {
            for (name, &value) in &record.values {
                match observables.get_mut(name) {
                    Some(stats) => {
                        if value < stats.min {
                            stats.min = value;
                            stats.min_time = record.timestamp;
                        }
                        if value > stats.max {
                            stats.max = value;
                            stats.max_time = record.timestamp;
                        }
                        stats.sum += value;
                        stats.count += 1;
                    }
                    None => {
                        observables.insert(
                            name.clone(),
                            ObservableStats {
                                count: 1,
                                min: value,
                                min_time: record.timestamp,
                                max: value,
                                max_time: record.timestamp,
                                sum: value,
                                avg: value,
                                label: units.labels.get(name).cloned(),
                            },
                        );
                    }
                }
            }
        }
        for stats in observables.values_mut() {
            stats.avg = stats.sum / stats.count as f64;
        }
        StatisticsView {
            span: *span,
            observables,
        }
    }
}
