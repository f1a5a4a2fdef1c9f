//! Time bucketing for trend charts.
//!
//! A set of timestamps is spread over at most [`MAX_BUCKETS`] date buckets that
//! cover a day-aligned window. Windows of up to six days get one bucket per
//! day; longer windows widen every bucket to `ceil(days / 6)` days.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::types::EventRow;

/// Upper bound on the number of buckets in a series.
pub const MAX_BUCKETS: i64 = 6;

/// Days covered by the fallback window when nothing else is known.
const DEFAULT_WINDOW_DAYS: i64 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesBucket {
    /// Short month/day label, e.g. "Mar 4"
    pub label: String,
    pub count: i64,
}

/// Inclusive, day-aligned date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Date-range filter selectable on the reporting tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    /// Use the event's window
    #[default]
    All,
    Last7Days,
    Last30Days,
    Last90Days,
}

impl DateRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::All => "all",
            DateRange::Last7Days => "7d",
            DateRange::Last30Days => "30d",
            DateRange::Last90Days => "90d",
        }
    }

    fn days(&self) -> Option<i64> {
        match self {
            DateRange::All => None,
            DateRange::Last7Days => Some(7),
            DateRange::Last30Days => Some(30),
            DateRange::Last90Days => Some(90),
        }
    }

    /// Trailing window ending `today`, or None for [`DateRange::All`].
    pub fn window(&self, today: NaiveDate) -> Option<DateWindow> {
        self.days().map(|days| DateWindow {
            start: today - Duration::days(days - 1),
            end: today,
        })
    }
}

impl std::str::FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DateRange::All),
            "7d" => Ok(DateRange::Last7Days),
            "30d" => Ok(DateRange::Last30Days),
            "90d" => Ok(DateRange::Last90Days),
            _ => Err(format!("unknown date range: {}", s)),
        }
    }
}

/// Pick the window for a series.
///
/// Precedence: an active date-range filter, then the event's declared
/// start/end, then the observed min/max timestamp, then a trailing six-day
/// window ending `today`. A declared start without an end (or the reverse)
/// borrows the missing bound from the observed timestamps.
pub fn resolve_window(
    event: Option<&EventRow>,
    timestamps: &[DateTime<Utc>],
    range: DateRange,
    today: NaiveDate,
) -> DateWindow {
    if let Some(window) = range.window(today) {
        return window;
    }

    let observed_min = timestamps.iter().min().map(|ts| ts.date_naive());
    let observed_max = timestamps.iter().max().map(|ts| ts.date_naive());
    let declared_start = event.and_then(|e| e.starts_at).map(|ts| ts.date_naive());
    let declared_end = event.and_then(|e| e.ends_at).map(|ts| ts.date_naive());

    match (
        declared_start.or(observed_min),
        declared_end.or(observed_max),
    ) {
        (Some(start), Some(end)) => DateWindow { start, end },
        (Some(start), None) => DateWindow { start, end: start },
        (None, Some(end)) => DateWindow { start: end, end },
        (None, None) => DateWindow {
            start: today - Duration::days(DEFAULT_WINDOW_DAYS),
            end: today,
        },
    }
}

/// Bucket width in days for a window of `total_days`.
pub fn step_days(total_days: i64) -> i64 {
    if total_days <= MAX_BUCKETS {
        1
    } else {
        (total_days + MAX_BUCKETS - 1) / MAX_BUCKETS
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

pub fn bucket_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Count `timestamps` into buckets spanning `window`.
///
/// Rows after the end of the window's last day are never counted, even when
/// the last bucket's nominal width would reach past it. The result always has
/// at least one bucket.
pub fn bucket_series(timestamps: &[DateTime<Utc>], window: DateWindow) -> Vec<TimeSeriesBucket> {
    let total_days = ((window.end - window.start).num_days() + 1).max(1);
    let step = step_days(total_days);
    let hard_end = midnight(window.end) + Duration::days(1);

    let mut buckets = Vec::new();
    let mut offset = 0;
    while offset < total_days {
        let day = window.start + Duration::days(offset);
        let bucket_start = midnight(day);
        let bucket_end = (bucket_start + Duration::days(step)).min(hard_end);
        let count = timestamps
            .iter()
            .filter(|ts| **ts >= bucket_start && **ts < bucket_end)
            .count() as i64;
        buckets.push(TimeSeriesBucket {
            label: bucket_label(day),
            count,
        });
        offset += step;
    }

    if buckets.is_empty() {
        buckets.push(TimeSeriesBucket {
            label: bucket_label(window.start),
            count: 0,
        });
    }
    buckets
}
