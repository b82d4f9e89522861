//! Calendar timespans and the sequencing of a date range into periods.
//!
//! A [`Timespan`] is a half-open interval `[start, stop)` of unix timestamps.
//! [`calendar_spans`] partitions a requested range into month or year periods
//! anchored to calendar boundaries in the station's local time zone.

use chrono::{Datelike, LocalResult, NaiveDate, TimeZone};
use serde::Serialize;

/// Calendar unit used to partition a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Month,
    Year,
}

impl Granularity {
    /// Key under which the period's statistics view appears in the
    /// rendering context.
    pub fn context_key(self) -> &'static str {
        match self {
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

/// A half-open interval `[start, stop)` of unix timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timespan {
    pub start: i64,
    pub stop: i64,
}

impl Timespan {
    /// Invariant: `start < stop`.
    pub fn new(start: i64, stop: i64) -> Self {
        debug_assert!(start < stop, "timespan must have start < stop");
        Timespan { start, stop }
    }

    /// Whether `instant` falls inside the interval.
    pub fn includes(&self, instant: i64) -> bool {
        self.start <= instant && instant < self.stop
    }

    /// Whether `instant` falls in the trailing `(start, stop]` portion.
    ///
    /// An archive record timestamped exactly on a period boundary belongs to
    /// the period it closes, so the final period of a range is detected with
    /// this test rather than [`Timespan::includes`].
    pub fn includes_end(&self, instant: i64) -> bool {
        self.start < instant && instant <= self.stop
    }
}

/// Iterator over the calendar periods covering a requested range.
///
/// Periods are contiguous, non-overlapping, and forward-ordered; the first
/// period contains `range_start` and the last is the period holding
/// `range_stop` under the boundary convention: a stop exactly on a period
/// boundary belongs to the period it closes, so no span starting at
/// `range_stop` is yielded. Re-invoking with identical inputs yields an
/// identical sequence.
pub struct SpanIter<Tz: TimeZone> {
    tz: Tz,
    granularity: Granularity,
    year: i32,
    month: u32,
    stop_ts: i64,
}

impl<Tz: TimeZone> Iterator for SpanIter<Tz> {
    type Item = Timespan;

    fn next(&mut self) -> Option<Timespan> {
        let start = period_start(&self.tz, self.year, self.month);
        // A period starting exactly at the range's stop holds no instant of
        // the range: the boundary instant belongs to the period it closes
        if start >= self.stop_ts {
            return None;
        }
        let (next_year, next_month) = match self.granularity {
            Granularity::Month => {
                if self.month == 12 {
                    (self.year + 1, 1)
                } else {
                    (self.year, self.month + 1)
                }
            }
            Granularity::Year => (self.year + 1, 1),
        };
        let stop = period_start(&self.tz, next_year, next_month);
        self.year = next_year;
        self.month = next_month;
        Some(Timespan::new(start, stop))
    }
}

/// Partition `[range_start, range_stop]` into calendar periods of the given
/// granularity, anchored to local calendar boundaries in `tz`.
pub fn calendar_spans<Tz: TimeZone>(
    granularity: Granularity,
    tz: &Tz,
    range_start: i64,
    range_stop: i64,
) -> SpanIter<Tz> {
    let first = local_date(tz, range_start);
    let month = match granularity {
        Granularity::Month => first.month(),
        Granularity::Year => 1,
    };
    SpanIter {
        tz: tz.clone(),
        granularity,
        year: first.year(),
        month,
        stop_ts: range_stop,
    }
}

/// The day containing `instant`: `[local midnight, next local midnight)`.
///
/// An instant exactly on a midnight boundary resolves to the day it closes.
pub fn day_span<Tz: TimeZone>(tz: &Tz, instant: i64) -> Timespan {
    let date = containing_date(tz, instant);
    Timespan::new(
        local_midnight(tz, date),
        local_midnight(tz, next_day(date)),
    )
}

/// The week containing `instant`, starting on `week_start`
/// (0 = Monday .. 6 = Sunday).
pub fn week_span<Tz: TimeZone>(tz: &Tz, instant: i64, week_start: u32) -> Timespan {
    let date = containing_date(tz, instant);
    let offset = (date.weekday().num_days_from_monday() + 7 - week_start % 7) % 7;
    let start = date - chrono::Days::new(u64::from(offset));
    Timespan::new(
        local_midnight(tz, start),
        local_midnight(tz, start + chrono::Days::new(7)),
    )
}

/// The calendar month containing `instant`.
pub fn month_span<Tz: TimeZone>(tz: &Tz, instant: i64) -> Timespan {
    let date = containing_date(tz, instant);
    let (next_year, next_month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    Timespan::new(
        period_start(tz, date.year(), date.month()),
        period_start(tz, next_year, next_month),
    )
}

/// The calendar year containing `instant`.
pub fn year_span<Tz: TimeZone>(tz: &Tz, instant: i64) -> Timespan {
    let date = containing_date(tz, instant);
    Timespan::new(
        period_start(tz, date.year(), 1),
        period_start(tz, date.year() + 1, 1),
    )
}

/// The rain year containing `instant`: a year-long accounting period
/// beginning on the first of `start_month` (1..=12), used for
/// precipitation totals.
pub fn rain_year_span<Tz: TimeZone>(tz: &Tz, instant: i64, start_month: u32) -> Timespan {
    let date = containing_date(tz, instant);
    let year = if date.month() >= start_month {
        date.year()
    } else {
        date.year() - 1
    };
    Timespan::new(
        period_start(tz, year, start_month),
        period_start(tz, year + 1, start_month),
    )
}

/// First instant of the given local calendar month, as a unix timestamp.
fn period_start<Tz: TimeZone>(tz: &Tz, year: i32, month: u32) -> i64 {
    let date = NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar month");
    local_midnight(tz, date)
}

/// Midnight of `date` in `tz`. When a DST transition skips or repeats
/// midnight, the earliest valid instant of the day is used.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> i64 {
    let naive = date.and_hms_opt(0, 0, 0).expect("midnight is a valid time");
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp(),
        LocalResult::None => {
            // Midnight was skipped by a DST transition; the day starts an
            // hour later.
            let shifted = date
                .and_hms_opt(1, 0, 0)
                .expect("01:00 is a valid time");
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp(),
                LocalResult::None => unreachable!("two consecutive skipped hours"),
            }
        }
    }
}

/// The local date whose span contains `instant`, applying the
/// boundary-belongs-to-the-closing-period convention.
fn containing_date<Tz: TimeZone>(tz: &Tz, instant: i64) -> NaiveDate {
    let date = local_date(tz, instant);
    if local_midnight(tz, date) == instant {
        date.pred_opt().expect("date has a predecessor")
    } else {
        date
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().expect("date has a successor")
}

/// Whether `instant` is representable in chrono's calendar. Inputs are
/// validated at the archive and CLI boundaries so the calendar math below
/// never sees an out-of-range timestamp.
pub fn representable(instant: i64) -> bool {
    chrono::DateTime::from_timestamp(instant, 0).is_some()
}

pub(crate) fn local_date<Tz: TimeZone>(tz: &Tz, instant: i64) -> NaiveDate {
    tz.timestamp_opt(instant, 0)
        .single()
        .expect("timestamp validated at the input boundary")
        .date_naive()
}
