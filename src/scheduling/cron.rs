//! Five-field cron expressions.
//!
//! ```text
//! ┌───────────── minute (0-59)
//! │ ┌───────────── hour (0-23)
//! │ │ ┌───────────── day of month (1-31)
//! │ │ │ ┌───────────── month (1-12)
//! │ │ │ │ ┌───────────── day of week (0-7, 0 and 7 = Sunday)
//! │ │ │ │ │
//! * * * * *
//! ```
//!
//! When both day fields are restricted a date matches if either does.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronParseError {
    #[error("expected 5 fields, got {0}")]
    FieldCount(usize),

    #[error("invalid {field} value '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("{field} value {value} out of range {min}-{max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("invalid {field} range {start}-{end}")]
    InvalidRange { field: &'static str, start: u32, end: u32 },

    #[error("invalid {field} step '{step}'")]
    InvalidStep { field: &'static str, step: String },
}

/// Search horizon for `next_run`. Covers leap days and rare day-of-month
/// and weekday combinations.
const MAX_SEARCH_DAYS: i64 = 366 * 5;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    values: BTreeSet<u32>,
    wildcard: bool,
}

impl Field {
    fn parse(name: &'static str, expr: &str, min: u32, max: u32) -> Result<Self, CronParseError> {
        let mut values = BTreeSet::new();
        let wildcard = expr.starts_with('*');

        for part in expr.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step_value = step.parse::<u32>().ok().filter(|s| *s > 0).ok_or_else(|| {
                        CronParseError::InvalidStep { field: name, step: step.to_string() }
                    })?;
                    (range, Some(step_value))
                }
                None => (part, None),
            };

            let (start, end) = if range == "*" {
                (min, max)
            } else if let Some((a, b)) = range.split_once('-') {
                let start = parse_value(name, a)?;
                let end = parse_value(name, b)?;
                if start > end {
                    return Err(CronParseError::InvalidRange { field: name, start, end });
                }
                (start, end)
            } else {
                let value = parse_value(name, range)?;
                // `5/15` means from 5 to the end of the range every 15
                match step {
                    Some(_) => (value, max),
                    None => (value, value),
                }
            };

            for value in [start, end] {
                if value < min || value > max {
                    return Err(CronParseError::OutOfRange { field: name, value, min, max });
                }
            }

            values.extend((start..=end).step_by(step.unwrap_or(1) as usize));
        }

        Ok(Self { values, wildcard })
    }

    fn contains(&self, value: u32) -> bool {
        self.values.contains(&value)
    }
}

fn parse_value(field: &'static str, raw: &str) -> Result<u32, CronParseError> {
    raw.parse::<u32>().map_err(|_| CronParseError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

/// A parsed cron expression, evaluated in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    source: String,
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(CronParseError::FieldCount(parts.len()));
        }

        let mut day_of_week = Field::parse("day-of-week", parts[4], 0, 7)?;
        if day_of_week.values.remove(&7) {
            day_of_week.values.insert(0);
        }

        Ok(Self {
            source: parts.join(" "),
            minute: Field::parse("minute", parts[0], 0, 59)?,
            hour: Field::parse("hour", parts[1], 0, 23)?,
            day_of_month: Field::parse("day-of-month", parts[2], 1, 31)?,
            month: Field::parse("month", parts[3], 1, 12)?,
            day_of_week,
        })
    }

    /// Normalized source text (fields separated by single spaces).
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn matches_date(&self, date: NaiveDate) -> bool {
        if !self.month.contains(date.month()) {
            return false;
        }
        let dom = self.day_of_month.contains(date.day());
        let dow = self.day_of_week.contains(date.weekday().num_days_from_sunday());
        match (self.day_of_month.wildcard, self.day_of_week.wildcard) {
            (true, true) => true,
            (true, false) => dow,
            (false, true) => dom,
            (false, false) => dom || dow,
        }
    }

    pub fn matches(&self, at: &DateTime<Utc>) -> bool {
        self.matches_date(at.date_naive())
            && self.hour.contains(at.hour())
            && self.minute.contains(at.minute())
    }

    /// First matching minute strictly after `after`.
    pub fn next_run(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let first_day = start.date_naive();

        for offset in 0..MAX_SEARCH_DAYS {
            let date = first_day + Duration::days(offset);
            if !self.matches_date(date) {
                continue;
            }

            let (floor_hour, floor_minute) = if offset == 0 {
                (start.hour(), start.minute())
            } else {
                (0, 0)
            };
            for &hour in self.hour.values.range(floor_hour..) {
                let min_minute = if hour == floor_hour { floor_minute } else { 0 };
                if let Some(&minute) = self.minute.values.range(min_minute..).next() {
                    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
                    return Some(Utc.from_utc_datetime(&date.and_time(time)));
                }
            }
        }

        None
    }
}

impl FromStr for CronExpr {
    type Err = CronParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronExpr::parse(s)
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
