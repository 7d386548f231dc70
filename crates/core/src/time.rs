//! Points and intervals on the simulation clock.
//!
//! A [`Time`] is a stamp measured in days since the Modified Julian Day epoch
//! (1858-11-17T00:00) plus a non-negative duration in days.
//! A zero duration is an instantaneous stamp; a positive duration is the
//! half-open span `[stamp, stamp + duration)`.

use std::{cmp::Ordering, fmt};

use jiff::{
    SignedDuration,
    civil::{DateTime, date},
};
use thiserror::Error;
use uom::si::{f64::Time as Duration, time::day};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance in days used whenever two times are compared.
///
/// Roughly one millisecond, `1 / (24 * 60 * 60 * 1000) = 1.157e-8`.
pub const EPSILON: f64 = 1e-8;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A stamp or span on the simulation clock.
///
/// Equality and ordering tolerate differences up to [`EPSILON`].
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Time {
    stamp: f64,
    duration: f64,
}

/// Errors that can occur when constructing or converting a [`Time`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum TimeError {
    #[error("time stamp must be finite, got {stamp}")]
    NonFiniteStamp { stamp: f64 },

    #[error("time duration must be finite and non-negative, got {duration}")]
    InvalidDuration { duration: f64 },

    #[error("time stamp {stamp} is outside the supported calendar range")]
    OutOfCalendarRange { stamp: f64 },
}

impl Time {
    /// Creates an instantaneous time stamp at `stamp` days.
    #[must_use]
    pub const fn at(stamp: f64) -> Self {
        Self {
            stamp,
            duration: 0.0,
        }
    }

    /// Creates a span starting at `start` and lasting `duration` days.
    ///
    /// # Errors
    ///
    /// Returns an error if `start` is not finite or `duration` is negative or
    /// not finite.
    pub fn span(start: f64, duration: f64) -> Result<Self, TimeError> {
        if !start.is_finite() {
            return Err(TimeError::NonFiniteStamp { stamp: start });
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(TimeError::InvalidDuration { duration });
        }
        Ok(Self {
            stamp: start,
            duration,
        })
    }

    /// Creates a span covering `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `end` precedes `start` or either is not finite.
    pub fn between(start: f64, end: f64) -> Result<Self, TimeError> {
        Self::span(start, end - start)
    }

    /// Creates a span starting at `start` days with a dimensioned duration.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting duration is negative or not finite.
    pub fn span_of(start: f64, duration: Duration) -> Result<Self, TimeError> {
        Self::span(start, duration.get::<day>())
    }

    /// Creates a time stamp from a civil date and time.
    #[must_use]
    pub fn from_datetime(datetime: DateTime) -> Self {
        let elapsed = datetime.duration_since(mjd_epoch());
        Self::at(elapsed.as_secs_f64() / SECONDS_PER_DAY)
    }

    /// Returns the start of this time as a civil date and time.
    ///
    /// # Errors
    ///
    /// Returns an error if the stamp lies outside the range `jiff` supports.
    pub fn to_datetime(&self) -> Result<DateTime, TimeError> {
        to_datetime(self.stamp)
    }

    /// Returns the start of this time in days.
    #[must_use]
    pub fn stamp(&self) -> f64 {
        self.stamp
    }

    /// Returns the duration of this time in days, zero for a stamp.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Returns the duration as a dimensioned quantity.
    #[must_use]
    pub fn duration_quantity(&self) -> Duration {
        Duration::new::<day>(self.duration)
    }

    /// Returns the end of this time in days, equal to the stamp for a stamp.
    #[must_use]
    pub fn end(&self) -> f64 {
        self.stamp + self.duration
    }

    /// Returns `true` if this time has a positive duration.
    #[must_use]
    pub fn is_span(&self) -> bool {
        self.duration > 0.0
    }

    /// Returns `true` if this time is an instantaneous stamp.
    #[must_use]
    pub fn is_stamp(&self) -> bool {
        !self.is_span()
    }

    /// Returns the instantaneous stamp at the start of this time.
    #[must_use]
    pub fn start_stamp(&self) -> Self {
        Self::at(self.stamp)
    }

    /// Returns the instantaneous stamp at the end of this time.
    #[must_use]
    pub fn end_stamp(&self) -> Self {
        Self::at(self.end())
    }

    /// Returns `true` if `stamp` lies in `[start - EPSILON, end + EPSILON]`.
    #[must_use]
    pub fn contains(&self, stamp: f64) -> bool {
        stamp >= self.stamp - EPSILON && stamp <= self.end() + EPSILON
    }
}

/// Returns `true` if two day values are equal within [`EPSILON`].
#[must_use]
pub fn days_equal(a: f64, b: f64) -> bool {
    a >= b - EPSILON && a <= b + EPSILON
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        days_equal(self.stamp, other.stamp) && days_equal(self.duration, other.duration)
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !days_equal(self.stamp, other.stamp) {
            return self.stamp.partial_cmp(&other.stamp);
        }
        if days_equal(self.duration, other.duration) {
            Some(Ordering::Equal)
        } else {
            self.duration.partial_cmp(&other.duration)
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match to_datetime(self.stamp) {
            Ok(start) if self.is_span() => match to_datetime(self.end()) {
                Ok(end) => write!(f, "{start} - {end}"),
                Err(_) => write!(f, "{start} + {}d", self.duration),
            },
            Ok(start) => write!(f, "{start}"),
            Err(_) if self.is_span() => write!(f, "MJD {} + {}d", self.stamp, self.duration),
            Err(_) => write!(f, "MJD {}", self.stamp),
        }
    }
}

impl From<DateTime> for Time {
    fn from(datetime: DateTime) -> Self {
        Self::from_datetime(datetime)
    }
}

fn mjd_epoch() -> DateTime {
    date(1858, 11, 17).at(0, 0, 0, 0)
}

fn to_datetime(stamp: f64) -> Result<DateTime, TimeError> {
    let elapsed = SignedDuration::try_from_secs_f64(stamp * SECONDS_PER_DAY)
        .map_err(|_| TimeError::OutOfCalendarRange { stamp })?;
    mjd_epoch()
        .checked_add(elapsed)
        .map_err(|_| TimeError::OutOfCalendarRange { stamp })
}
