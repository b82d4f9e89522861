//! Assembly of the layered data context handed to the rendering engine.
//!
//! Layers merge left-to-right with later layers overriding earlier ones on
//! key collision. Station metadata and the almanac form a cheap base layer,
//! kept separate from the per-period statistics layer.

use chrono::TimeZone;
use serde_json::{Map, Value};

use crate::almanac::AlmanacSnapshot;
use crate::config::StationConfig;
use crate::generate::registry::PeriodRegistry;
use crate::render::Encoding;
use crate::stats::{ArchiveRecord, StatisticsView};
use crate::timespan::{local_date, Granularity, Timespan};

/// Symbolic names mapped to report-facing data; built fresh per render and
/// consumed once by the rendering engine.
pub type Context = Map<String, Value>;

/// Merge layers left-to-right; later layers win on key collision.
pub fn merge_layers<I: IntoIterator<Item = Context>>(layers: I) -> Context {
    let mut merged = Context::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key, value);
        }
    }
    merged
}

/// Station metadata base layer.
pub fn station_layer(station: &StationConfig) -> Context {
    let mut layer = Context::new();
    layer.insert(
        "station".to_string(),
        serde_json::json!({
            "name": station.name,
            "latitude": station.latitude,
            "longitude": station.longitude,
            "altitude_m": station.altitude_m,
        }),
    );
    layer
}

/// Context for one period of a summary-by report: station metadata, the
/// period's resolved year (and month name at month granularity), and the
/// aggregate statistics view under the granularity's key.
pub fn summary_context<Tz: TimeZone>(
    station: &StationConfig,
    tz: &Tz,
    granularity: Granularity,
    span: &Timespan,
    view: &StatisticsView,
    encoding: Encoding,
) -> Context {
    let start = local_date(tz, span.start);

    let mut period_layer = Context::new();
    period_layer.insert(
        "year_name".to_string(),
        Value::from(start.format("%Y").to_string()),
    );
    if granularity == Granularity::Month {
        period_layer.insert(
            "month_name".to_string(),
            Value::from(start.format("%b").to_string()),
        );
    }
    period_layer.insert(
        granularity.context_key().to_string(),
        serde_json::to_value(view).unwrap_or(Value::Null),
    );

    merge_layers([
        station_layer(station),
        period_layer,
        encoding_layer(encoding),
    ])
}

/// The five rolling windows of a to-date report, all ending at `as_of`.
pub struct ToDateViews {
    pub day: StatisticsView,
    pub week: StatisticsView,
    pub month: StatisticsView,
    pub year: StatisticsView,
    pub rainyear: StatisticsView,
}

/// Shared base context for all to-date subreports of one invocation:
/// current observation, the five window views, station metadata, the
/// almanac snapshot, and the period registry for navigation links.
/// The per-subreport encoding marker is layered on by the driver.
pub fn to_date_base_context(
    station: &StationConfig,
    current: &ArchiveRecord,
    views: &ToDateViews,
    almanac: &AlmanacSnapshot,
    registry: &PeriodRegistry,
) -> Context {
    let mut stats_layer = Context::new();
    stats_layer.insert(
        "current".to_string(),
        serde_json::to_value(current).unwrap_or(Value::Null),
    );
    for (key, view) in [
        ("day", &views.day),
        ("week", &views.week),
        ("month", &views.month),
        ("year", &views.year),
        ("rainyear", &views.rainyear),
    ] {
        stats_layer.insert(
            key.to_string(),
            serde_json::to_value(view).unwrap_or(Value::Null),
        );
    }

    let mut base_layer = station_layer(station);
    base_layer.insert(
        "almanac".to_string(),
        serde_json::to_value(almanac).unwrap_or(Value::Null),
    );
    base_layer.insert("outputs".to_string(), registry.as_context_value());

    merge_layers([base_layer, stats_layer])
}

/// Encoding marker so the engine and its filters can select output
/// character-set handling.
pub fn encoding_layer(encoding: Encoding) -> Context {
    let mut layer = Context::new();
    layer.insert("encoding".to_string(), Value::from(encoding.name()));
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn station() -> StationConfig {
        StationConfig {
            name: "Backyard".to_string(),
            latitude: 44.0,
            longitude: -121.3,
            altitude_m: 1100.0,
            week_start: 6,
            rain_year_start: 1,
        }
    }

    fn view(span: Timespan) -> StatisticsView {
        StatisticsView {
            span,
            observables: IndexMap::new(),
        }
    }

    fn july_2021() -> Timespan {
        Timespan::new(
            Utc.with_ymd_and_hms(2021, 7, 1, 0, 0, 0).unwrap().timestamp(),
            Utc.with_ymd_and_hms(2021, 8, 1, 0, 0, 0).unwrap().timestamp(),
        )
    }

    #[test]
    fn later_layers_override_on_collision() {
        let mut a = Context::new();
        a.insert("k".to_string(), Value::from(1));
        a.insert("only_a".to_string(), Value::from(true));
        let mut b = Context::new();
        b.insert("k".to_string(), Value::from(2));

        let merged = merge_layers([a, b]);
        assert_eq!(merged["k"], Value::from(2));
        assert_eq!(merged["only_a"], Value::from(true));
    }

    #[test]
    fn month_summary_context_has_month_keys() {
        let span = july_2021();
        let ctx = summary_context(
            &station(),
            &Utc,
            Granularity::Month,
            &span,
            &view(span),
            Encoding::StrictAscii,
        );
        assert_eq!(ctx["year_name"], "2021");
        assert_eq!(ctx["month_name"], "Jul");
        assert!(ctx.contains_key("month"));
        assert!(!ctx.contains_key("year"));
        assert_eq!(ctx["encoding"], "strict_ascii");
        assert_eq!(ctx["station"]["name"], "Backyard");
    }

    #[test]
    fn year_summary_context_has_no_month_name() {
        let span = Timespan::new(
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap().timestamp(),
            Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap().timestamp(),
        );
        let ctx = summary_context(
            &station(),
            &Utc,
            Granularity::Year,
            &span,
            &view(span),
            Encoding::Utf8,
        );
        assert_eq!(ctx["year_name"], "2021");
        assert!(!ctx.contains_key("month_name"));
        assert!(ctx.contains_key("year"));
    }

    #[test]
    fn to_date_context_carries_all_windows_and_navigation() {
        let span = july_2021();
        let views = ToDateViews {
            day: view(span),
            week: view(span),
            month: view(span),
            year: view(span),
            rainyear: view(span),
        };
        let current = ArchiveRecord {
            timestamp: span.stop,
            values: IndexMap::from([("out_temp".to_string(), 71.2)]),
        };
        let almanac = crate::almanac::compute(
            &Utc,
            span.stop,
            44.0,
            -121.3,
            &crate::config::AlmanacConfig::default().moon_phases,
        );
        let mut registry = PeriodRegistry::new();
        registry.record("summary_month", "2021-07");

        let ctx = to_date_base_context(&station(), &current, &views, &almanac, &registry);
        for key in ["current", "day", "week", "month", "year", "rainyear", "almanac"] {
            assert!(ctx.contains_key(key), "missing key {key}");
        }
        assert_eq!(ctx["current"]["out_temp"], 71.2);
        assert_eq!(ctx["outputs"]["summary_month"][0], "2021-07");
        // Encoding marker is appended per subreport, not here
        assert!(!ctx.contains_key("encoding"));
    }
}
