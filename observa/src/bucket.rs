//! Time bucket codec.
//!
//! Consolidated samples are stored per *shift*: a fixed six-hour period, four
//! per day. Each shift maps to a bucket key built from its UTC calendar
//! position:
//!
//! ```text
//! <day-of-month>_<Mon>_Lcycle_<year mod 3>_<Night|Morning|Afternoon|Evening>
//! ```
//!
//! The year only enters as `year mod 3`, so the key space covers a rolling
//! three-year cycle and a timestamp aliases the same shift one and two
//! cycles earlier. That bound is what keeps the store small.
//!
//! Timestamps are Unix seconds (`i64`), always interpreted in UTC.

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::{BucketError, Result};

/// Seconds in one minute.
pub const SECONDS_PER_MINUTE: i64 = 60;

/// Seconds in one hour.
pub const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Seconds in one week.
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Seconds in one shift.
pub const SECONDS_PER_SHIFT: i64 = SECONDS_PER_DAY / SHIFTS_PER_DAY as i64;

/// Shifts in one day.
pub const SHIFTS_PER_DAY: usize = 4;

/// Shifts in one week.
pub const SHIFTS_PER_WEEK: usize = 7 * SHIFTS_PER_DAY;

/// Number of years before bucket keys repeat.
pub const CYCLE_YEARS: i32 = 3;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One of the four six-hour periods of a UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shift {
    /// 00:00 to 05:59.
    Night,
    /// 06:00 to 11:59.
    Morning,
    /// 12:00 to 17:59.
    Afternoon,
    /// 18:00 to 23:59.
    Evening,
}

impl Shift {
    /// All shifts in day order.
    pub const ALL: [Shift; SHIFTS_PER_DAY] =
        [Self::Night, Self::Morning, Self::Afternoon, Self::Evening];

    /// The shift containing `hour` (0-23). Hours past 23 clamp to
    /// [`Shift::Evening`].
    pub fn of_hour(hour: u32) -> Self {
        match hour / 6 {
            0 => Self::Night,
            1 => Self::Morning,
            2 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    /// Position within the day, 0 to 3.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label used in bucket keys.
    pub fn label(self) -> &'static str {
        match self {
            Self::Night => "Night",
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Evening => "Evening",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Address of one consolidated record in the bucket store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    key: String,
    shift: Shift,
}

impl BucketKey {
    /// Builds a key from its calendar components.
    ///
    /// `month0` is the zero-based month and is clamped to December.
    pub fn from_parts(day: u32, month0: u32, cycle: i32, shift: Shift) -> Self {
        let month = MONTH_ABBREVIATIONS[(month0 as usize).min(MONTH_ABBREVIATIONS.len() - 1)];
        Self {
            key: format!("{day}_{month}_Lcycle_{cycle}_{shift}"),
            shift,
        }
    }

    /// The key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The shift this key addresses.
    pub fn shift(&self) -> Shift {
        self.shift
    }

    /// Consumes the key, returning the string.
    pub fn into_string(self) -> String {
        self.key
    }
}

impl AsRef<str> for BucketKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn utc(timestamp: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| BucketError::TimestampOutOfRange { timestamp }.into())
}

/// Start (00:00:00 UTC) of the Monday on or before `t`.
///
/// # Errors
///
/// Returns [`BucketError::TimestampOutOfRange`] if `t` has no UTC calendar
/// representation.
///
/// # Examples
///
/// ```rust
/// use observa::bucket::week_start;
///
/// // Wednesday 2024-03-13 15:30:00 UTC -> Monday 2024-03-11 00:00:00 UTC
/// assert_eq!(week_start(1_710_343_800)?, 1_710_115_200);
/// # Ok::<(), observa::ObservaError>(())
/// ```
pub fn week_start(t: i64) -> Result<i64> {
    let dt = utc(t)?;
    let days_back = i64::from(dt.weekday().num_days_from_monday());
    let into_day = i64::from(dt.num_seconds_from_midnight());
    Ok(t - days_back * SECONDS_PER_DAY - into_day)
}

/// Moves `t` back by `weeks` whole weeks.
pub fn step_back_weeks(t: i64, weeks: i64) -> i64 {
    t.saturating_sub(weeks.saturating_mul(SECONDS_PER_WEEK))
}

/// Moves `t` forward by one shift.
pub fn next_shift(t: i64) -> i64 {
    t.saturating_add(SECONDS_PER_SHIFT)
}

/// Bucket key for the shift containing `t`.
///
/// # Errors
///
/// Returns [`BucketError::TimestampOutOfRange`] if `t` has no UTC calendar
/// representation.
///
/// # Examples
///
/// ```rust
/// use observa::bucket::bucket_key;
///
/// // 2024-03-15 08:00:00 UTC
/// assert_eq!(bucket_key(1_710_489_600)?.as_str(), "15_Mar_Lcycle_2_Morning");
/// # Ok::<(), observa::ObservaError>(())
/// ```
pub fn bucket_key(t: i64) -> Result<BucketKey> {
    let dt = utc(t)?;
    Ok(BucketKey::from_parts(
        dt.day(),
        dt.month0(),
        dt.year().rem_euclid(CYCLE_YEARS),
        Shift::of_hour(dt.hour()),
    ))
}

/// Start times of the [`SHIFTS_PER_WEEK`] shifts in the week containing
/// `t`, beginning with Monday night.
///
/// # Errors
///
/// Returns [`BucketError::TimestampOutOfRange`] if `t` has no UTC calendar
/// representation.
pub fn week_shifts(t: i64) -> Result<impl Iterator<Item = i64>> {
    let start = week_start(t)?;
    Ok(std::iter::successors(Some(start), |&shift| Some(next_shift(shift))).take(SHIFTS_PER_WEEK))
}
