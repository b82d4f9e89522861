//! Almanac snapshot: sunrise, sunset, and moon phase for one instant.
//!
//! Computed once per to-date invocation and shared across all subreports;
//! the celestial data changes slowly compared to the weather.

use chrono::{Datelike, TimeZone};
use serde::Serialize;

use crate::timespan::local_date;

/// Mean length of the synodic month, in days.
const SYNODIC_MONTH: f64 = 29.530_588_853;

/// A reference new moon: 2000-01-06 18:14 UTC.
const NEW_MOON_EPOCH: i64 = 947_182_440;

/// Zenith angle for sunrise/sunset, degrees (accounts for refraction and
/// the solar disc radius).
const SUN_ZENITH: f64 = 90.833;

#[derive(Debug, Clone, Serialize)]
pub struct AlmanacSnapshot {
    /// Sunrise as a unix timestamp; `None` during polar day or night.
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    /// Local-time `HH:MM` renderings for templates.
    pub sunrise_text: Option<String>,
    pub sunset_text: Option<String>,
    pub moon_phase: String,
    pub moon_index: usize,
    /// Illuminated fraction of the moon, 0..=100.
    pub moon_fullness: f64,
}

/// Compute the almanac snapshot for `instant` at the given site.
///
/// `phases` is the eight-entry moon phase name table, new moon first.
pub fn compute<Tz: TimeZone>(
    tz: &Tz,
    instant: i64,
    latitude: f64,
    longitude: f64,
    phases: &[String],
) -> AlmanacSnapshot
where
    Tz::Offset: std::fmt::Display,
{
    let date = local_date(tz, instant);
    let (sunrise, sunset) = sun_events(date, latitude, longitude);

    let age = moon_age_days(instant);
    let cycle = age / SYNODIC_MONTH;
    let moon_index = (cycle * 8.0).round() as usize % 8;
    let moon_fullness = (1.0 - (2.0 * std::f64::consts::PI * cycle).cos()) / 2.0 * 100.0;

    let format_time = |ts: i64| {
        tz.timestamp_opt(ts, 0)
            .single()
            .map(|dt| dt.format("%H:%M").to_string())
    };

    AlmanacSnapshot {
        sunrise,
        sunset,
        sunrise_text: sunrise.and_then(format_time),
        sunset_text: sunset.and_then(format_time),
        moon_phase: phases
            .get(moon_index)
            .cloned()
            .unwrap_or_else(|| moon_index.to_string()),
        moon_index,
        moon_fullness,
    }
}

/// Days since the reference new moon, folded into one synodic month.
fn moon_age_days(instant: i64) -> f64 {
    let days = (instant - NEW_MOON_EPOCH) as f64 / 86_400.0;
    days.rem_euclid(SYNODIC_MONTH)
}

/// Sunrise and sunset (unix timestamps) for the given calendar date, using
/// the NOAA low-accuracy solar position approximation. Longitude is
/// positive east. Returns `None` when the sun does not cross the horizon.
fn sun_events(date: chrono::NaiveDate, latitude: f64, longitude: f64) -> (Option<i64>, Option<i64>) {
    let day_of_year = date.ordinal() as f64;
    let gamma = 2.0 * std::f64::consts::PI / 365.0 * (day_of_year - 1.0);

    // Equation of time (minutes) and solar declination (radians)
    let eqtime = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());
    let decl = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    let lat_rad = latitude.to_radians();
    let cos_ha = SUN_ZENITH.to_radians().cos() / (lat_rad.cos() * decl.cos())
        - lat_rad.tan() * decl.tan();
    if !(-1.0..=1.0).contains(&cos_ha) {
        return (None, None);
    }
    let ha_deg = cos_ha.acos().to_degrees();

    let utc_midnight = date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
        .timestamp();
    let sunrise_min = 720.0 - 4.0 * (longitude + ha_deg) - eqtime;
    let sunset_min = 720.0 - 4.0 * (longitude - ha_deg) - eqtime;

    (
        Some(utc_midnight + (sunrise_min * 60.0).round() as i64),
        Some(utc_midnight + (sunset_min * 60.0).round() as i64),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn phases() -> Vec<String> {
        crate::config::AlmanacConfig::default().moon_phases
    }

    #[test]
    fn equinox_sunrise_near_six_at_equator() {
        // 2021-03-20, equator, prime meridian: sunrise close to 06:00 UTC.
        let instant = Utc
            .with_ymd_and_hms(2021, 3, 20, 12, 0, 0)
            .unwrap()
            .timestamp();
        let snapshot = compute(&Utc, instant, 0.0, 0.0, &phases());

        let sunrise = snapshot.sunrise.unwrap();
        let six_am = Utc
            .with_ymd_and_hms(2021, 3, 20, 6, 0, 0)
            .unwrap()
            .timestamp();
        assert!(
            (sunrise - six_am).abs() < 30 * 60,
            "sunrise {} not within 30min of 06:00",
            snapshot.sunrise_text.unwrap()
        );
        assert!(snapshot.sunset.unwrap() > sunrise);
    }

    #[test]
    fn polar_night_has_no_sun_events() {
        let instant = Utc
            .with_ymd_and_hms(2021, 12, 21, 12, 0, 0)
            .unwrap()
            .timestamp();
        let snapshot = compute(&Utc, instant, 80.0, 0.0, &phases());
        assert!(snapshot.sunrise.is_none());
        assert!(snapshot.sunset.is_none());
        assert!(snapshot.sunrise_text.is_none());
    }

    #[test]
    fn new_moon_at_reference_epoch() {
        let snapshot = compute(&Utc, NEW_MOON_EPOCH, 0.0, 0.0, &phases());
        assert_eq!(snapshot.moon_index, 0);
        assert_eq!(snapshot.moon_phase, "New");
        assert!(snapshot.moon_fullness < 1.0);
    }

    #[test]
    fn full_moon_half_cycle_after_epoch() {
        let instant = NEW_MOON_EPOCH + (SYNODIC_MONTH / 2.0 * 86_400.0) as i64;
        let snapshot = compute(&Utc, instant, 0.0, 0.0, &phases());
        assert_eq!(snapshot.moon_index, 4);
        assert_eq!(snapshot.moon_phase, "Full");
        assert!(snapshot.moon_fullness > 99.0);
    }
}
