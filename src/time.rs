//! Time-of-day values for pickup windows and the simulation clock.
//!
//! Appointment times are stored as a time of day; any date part a caller
//! sends is dropped so windows compare structurally on a single reference day.

use std::fmt;
use std::ops::{Add, Sub};

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SECONDS_PER_DAY: i32 = 24 * 60 * 60;

/// Seconds from midnight.
///
/// The simulation clock can run past midnight when a day overflows, so the
/// value is not clamped to a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(i32);

impl TimeOfDay {
    pub const fn from_seconds(seconds: i32) -> Self {
        Self(seconds)
    }

    pub const fn from_hm(hours: i32, minutes: i32) -> Self {
        Self(hours * 3600 + minutes * 60)
    }

    pub const fn seconds(self) -> i32 {
        self.0
    }

    /// Saturates instead of overflowing.
    pub fn add_minutes(self, minutes: i32) -> Self {
        Self(self.0.saturating_add(minutes.saturating_mul(60)))
    }

    /// Minutes from `earlier` to `self` (negative if `self` is earlier).
    pub fn minutes_since(self, earlier: TimeOfDay) -> f64 {
        (self.0 as f64 - earlier.0 as f64) / 60.0
    }

    /// Parse a stored time value.
    ///
    /// Accepts `HH:MM`, `HH:MM:SS`, RFC 3339 timestamps and
    /// `YYYY-MM-DD HH:MM[:SS]` datetimes. Returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        for format in ["%H:%M", "%H:%M:%S"] {
            if let Ok(time) = NaiveTime::parse_from_str(value, format) {
                return Some(Self::from(time));
            }
        }

        if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
            return Some(Self::from(datetime.time()));
        }

        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
                return Some(Self::from(datetime.time()));
            }
        }

        None
    }

    /// Current local wall-clock time of day.
    pub fn now_local() -> Self {
        Self::from(chrono::Local::now().time())
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self(time.num_seconds_from_midnight() as i32)
    }
}

impl Add<i32> for TimeOfDay {
    type Output = TimeOfDay;

    /// Adds seconds, saturating.
    fn add(self, seconds: i32) -> Self::Output {
        TimeOfDay(self.0.saturating_add(seconds))
    }
}

impl Sub for TimeOfDay {
    type Output = i32;

    /// Difference in seconds, saturating.
    fn sub(self, rhs: TimeOfDay) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.rem_euclid(SECONDS_PER_DAY);
        let (hours, rest) = (total / 3600, total % 3600);
        let (minutes, seconds) = (rest / 60, rest % 60);
        if seconds == 0 {
            write!(f, "{:02}:{:02}", hours, minutes)
        } else {
            write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)
        }
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeOfDay::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {raw:?}")))
    }
}

/// A closed `[start, end]` pickup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeWindow {
    /// Builds a window, rejecting one that ends before it starts.
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.start <= time && time <= self.end
    }
}
