//! Registry of materialized periods, used by templates to render
//! navigation links to previously generated summaries.

use indexmap::IndexMap;
use serde_json::Value;

/// Insertion-ordered, append-only record of the period labels materialized
/// during one build invocation. Owned by the report engine; never global.
#[derive(Debug, Clone, Default)]
pub struct PeriodRegistry {
    entries: IndexMap<String, Vec<String>>,
}

impl PeriodRegistry {
    pub fn new() -> Self {
        PeriodRegistry::default()
    }

    /// Append `label` to the sequence for `mode`, creating it on first use.
    /// Labels are not deduplicated; the registry lives for one invocation.
    pub fn record(&mut self, mode: &str, label: impl Into<String>) {
        self.entries
            .entry(mode.to_string())
            .or_default()
            .push(label.into());
    }

    /// The ordered labels recorded for `mode`.
    pub fn snapshot(&self, mode: &str) -> &[String] {
        self.entries.get(mode).map(Vec::as_slice).unwrap_or(&[])
    }

    /// JSON rendering for the to-date context, one array per mode.
    pub fn as_context_value(&self) -> Value {
        serde_json::to_value(&self.entries).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_preserves_insertion_order() {
        let mut registry = PeriodRegistry::new();
        registry.record("summary_month", "2020-01");
        registry.record("summary_month", "2020-02");
        registry.record("summary_year", "2020");
        registry.record("summary_month", "2020-03");

        assert_eq!(
            registry.snapshot("summary_month"),
            ["2020-01", "2020-02", "2020-03"]
        );
        assert_eq!(registry.snapshot("summary_year"), ["2020"]);
    }

    #[test]
    fn snapshot_of_unknown_mode_is_empty() {
        let registry = PeriodRegistry::new();
        assert!(registry.snapshot("summary_month").is_empty());
    }

    #[test]
    fn duplicate_labels_are_kept() {
        let mut registry = PeriodRegistry::new();
        registry.record("summary_year", "2020");
        registry.record("summary_year", "2020");
        assert_eq!(registry.snapshot("summary_year").len(), 2);
    }

    #[test]
    fn context_value_maps_mode_to_label_array() {
        let mut registry = PeriodRegistry::new();
        registry.record("summary_month", "2020-01");
        let value = registry.as_context_value();
        assert_eq!(value["summary_month"][0], "2020-01");
    }
}
