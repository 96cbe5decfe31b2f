//! Punctuality against the printed schedule.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// How an item's actual start compares with its scheduled time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "minutes", rename_all = "snake_case")]
pub enum Punctuality {
    OnTime,
    Late(i64),
    Early(i64),
}

/// Compares at minute precision; seconds are truncated on both sides.
pub fn punctuality(scheduled: NaiveTime, actual: NaiveTime) -> Punctuality {
    match minute_of_day(actual) - minute_of_day(scheduled) {
        0 => Punctuality::OnTime,
        d if d > 0 => Punctuality::Late(d),
        d => Punctuality::Early(-d),
    }
}

fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

impl fmt::Display for Punctuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnTime => f.write_str("on time"),
            Self::Late(m) => write!(f, "{m} min late"),
            Self::Early(m) => write!(f, "{m} min early"),
        }
    }
}
