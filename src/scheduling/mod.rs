//! Schedule timing. Schedules are stored and their next run computed here;
//! nothing in this crate executes them.

pub mod cron;

use chrono::{DateTime, Duration, Utc};

pub use cron::{CronExpr, CronParseError};

/// How often a schedule fires.
#[derive(Debug, Clone)]
pub enum Cadence {
    Cron(CronExpr),
    Interval { hours: i32 },
}

impl Cadence {
    /// Interval schedules count from the previous run when there was one.
    pub fn next_run(&self, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Cadence::Cron(expr) => expr.next_run(&now),
            Cadence::Interval { hours } => {
                Some(last_run.unwrap_or(now) + Duration::hours(i64::from(*hours)))
            }
        }
    }
}

/// `next_run` for a schedule row; `None` when disabled.
pub fn derive_next_run(
    enabled: bool,
    cadence: Option<&Cadence>,
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !enabled {
        return None;
    }
    cadence.and_then(|c| c.next_run(last_run, now))
}
