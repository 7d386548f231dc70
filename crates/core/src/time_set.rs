//! Ordered collections of times with an optional horizon.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::time::{EPSILON, Time, days_equal};

/// An ordered sequence of times sharing one kind, stamps or spans.
///
/// Times are strictly increasing and never overlap, within [`EPSILON`].
/// The optional horizon declares the overall interval the set may cover.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeSet {
    times: Vec<Time>,
    has_durations: bool,
    horizon: Option<Time>,
}

/// Errors that can occur when modifying a [`TimeSet`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum TimeSetError {
    #[error("cannot add a time {} to a set of {}s", kind_name(.is_span), other_kind_name(.is_span))]
    MixedTimeKinds { is_span: bool },

    #[error("time stamp {stamp} does not follow the last stamp {last}")]
    OutOfOrder { stamp: f64, last: f64 },

    #[error("time span starting at {start} overlaps the previous span ending at {last_end}")]
    Overlap { start: f64, last_end: f64 },
}

fn kind_name(is_span: &bool) -> &'static str {
    if *is_span { "span" } else { "stamp" }
}

fn other_kind_name(is_span: &bool) -> &'static str {
    kind_name(&!*is_span)
}

/// Which end of each time an interval lookup is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKey {
    Start,
    End,
}

impl IntervalKey {
    fn of(self, time: &Time) -> f64 {
        match self {
            IntervalKey::Start => time.stamp(),
            IntervalKey::End => time.end(),
        }
    }
}

/// Result of an interval lookup.
///
/// `index` is the first entry whose key is at or after the argument, or the
/// length of the set if the argument lies beyond the last key. `fraction` is
/// the position of the argument between the keys at `index - 1` and `index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub index: usize,
    pub fraction: f64,
}

impl TimeSet {
    /// Creates an empty set of stamps.
    #[must_use]
    pub fn stamps() -> Self {
        Self::default()
    }

    /// Creates an empty set of spans.
    #[must_use]
    pub fn spans() -> Self {
        Self {
            has_durations: true,
            ..Self::default()
        }
    }

    /// Creates an empty set of the given kind.
    #[must_use]
    pub fn new(has_durations: bool) -> Self {
        Self {
            has_durations,
            ..Self::default()
        }
    }

    /// Creates a set from already ordered times.
    ///
    /// The kind of the set is taken from the first time.
    ///
    /// # Errors
    ///
    /// Returns an error if the times mix stamps and spans, are out of order,
    /// or overlap.
    pub fn from_times(times: impl IntoIterator<Item = Time>) -> Result<Self, TimeSetError> {
        let mut times = times.into_iter().peekable();
        let mut set = Self::new(times.peek().is_some_and(Time::is_span));
        for time in times {
            set.push(time)?;
        }
        Ok(set)
    }

    /// Appends a time after the last entry.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the set unchanged, if the time's kind
    /// disagrees with the set, or if it does not strictly follow the last
    /// entry.
    pub fn push(&mut self, time: Time) -> Result<(), TimeSetError> {
        self.check_append(&time)?;
        self.times.push(time);
        Ok(())
    }

    /// Checks whether `time` could be appended without modifying the set.
    ///
    /// # Errors
    ///
    /// Returns the error [`TimeSet::push`] would return.
    pub fn check_append(&self, time: &Time) -> Result<(), TimeSetError> {
        if time.is_span() != self.has_durations {
            return Err(TimeSetError::MixedTimeKinds {
                is_span: time.is_span(),
            });
        }
        let Some(last) = self.times.last() else {
            return Ok(());
        };
        if self.has_durations {
            if time.stamp() + EPSILON < last.end() {
                return Err(TimeSetError::Overlap {
                    start: time.stamp(),
                    last_end: last.end(),
                });
            }
        } else if time.stamp() - EPSILON < last.stamp() {
            return Err(TimeSetError::OutOfOrder {
                stamp: time.stamp(),
                last: last.stamp(),
            });
        }
        Ok(())
    }

    /// Replaces the contents with exactly one time.
    ///
    /// # Errors
    ///
    /// Returns an error if the time's kind disagrees with the set.
    pub fn set_single_time(&mut self, time: Time) -> Result<(), TimeSetError> {
        if time.is_span() != self.has_durations {
            return Err(TimeSetError::MixedTimeKinds {
                is_span: time.is_span(),
            });
        }
        self.times.clear();
        self.times.push(time);
        Ok(())
    }

    /// Removes all times, keeping the kind and horizon.
    pub fn clear(&mut self) {
        self.times.clear();
    }

    /// Removes the first `count` times.
    pub fn remove_first(&mut self, count: usize) {
        self.times.drain(..count.min(self.times.len()));
    }

    /// Keeps only the first `len` times.
    pub fn truncate(&mut self, len: usize) {
        self.times.truncate(len);
    }

    /// Returns the times in order.
    #[must_use]
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Returns the time at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Time> {
        self.times.get(index)
    }

    /// Returns the first time, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Time> {
        self.times.first()
    }

    /// Returns the last time, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Time> {
        self.times.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Returns `true` if the set holds spans rather than stamps.
    #[must_use]
    pub fn has_durations(&self) -> bool {
        self.has_durations
    }

    /// Returns the declared horizon, if any.
    #[must_use]
    pub fn horizon(&self) -> Option<Time> {
        self.horizon
    }

    pub fn set_horizon(&mut self, horizon: Option<Time>) {
        self.horizon = horizon;
    }

    /// Moves the start of the horizon to `start`, keeping its end.
    ///
    /// Without a horizon, a stamp horizon at `start` is created.
    /// If the end already lies before `start` the horizon collapses to a stamp.
    pub fn set_horizon_start(&mut self, start: Time) {
        let end = self.horizon.map_or(start.stamp(), |horizon| horizon.end());
        let duration = (end - start.stamp()).max(0.0);
        self.horizon = Some(Time::span(start.stamp(), duration).unwrap_or(start.start_stamp()));
    }

    /// Sets the horizon to cover all times, from the first start to the last end.
    pub fn set_horizon_from_times(&mut self) {
        self.horizon = match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => Time::between(first.stamp(), last.end()).ok(),
            _ => None,
        };
    }

    /// Finds the exact index of `time`, or where it would be inserted.
    ///
    /// # Errors
    ///
    /// Returns `Err(index)` with the insertion point if no time matches within
    /// [`EPSILON`].
    pub fn binary_search(&self, time: &Time) -> Result<usize, usize> {
        self.times.binary_search_by(|entry| {
            entry
                .partial_cmp(time)
                .unwrap_or(std::cmp::Ordering::Less)
        })
    }

    /// Locates `arg` among the keys of the times by bisection.
    ///
    /// If `arg` precedes the first key the result is index 0 with fraction 0.
    /// If it follows the last key the result is the length with fraction 1.
    /// Otherwise `index` is the first entry whose key is at or after `arg`.
    ///
    /// # Panics
    ///
    /// Panics if the set is empty.
    #[must_use]
    pub fn interval(&self, arg: f64, key: IntervalKey) -> Interval {
        let key_at = |i: usize| key.of(&self.times[i]);

        let mut high = self.times.len() - 1;
        let mut low = 0;

        if arg < key_at(low) {
            return Interval {
                index: 0,
                fraction: 0.0,
            };
        }
        if arg > key_at(high) {
            return Interval {
                index: high + 1,
                fraction: 1.0,
            };
        }
        if high == 0 {
            return Interval {
                index: 0,
                fraction: 0.0,
            };
        }

        while high - low > 1 {
            let mid = low + (high - low) / 2;
            if arg <= key_at(mid) {
                high = mid;
            } else {
                low = mid;
            }
        }
        let (k_low, k_high) = (key_at(low), key_at(high));
        let fraction = if days_equal(k_low, k_high) {
            1.0
        } else {
            (arg - k_low) / (k_high - k_low)
        };
        Interval {
            index: high,
            fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn span(start: f64, duration: f64) -> Time {
        Time::span(start, duration).unwrap()
    }

    #[test]
    fn push_enforces_ordering() {
        let mut set = TimeSet::stamps();
        set.push(Time::at(1.0)).unwrap();
        set.push(Time::at(2.0)).unwrap();

        assert_eq!(
            set.push(Time::at(2.0)),
            Err(TimeSetError::OutOfOrder {
                stamp: 2.0,
                last: 2.0
            })
        );
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn push_enforces_kind() {
        let mut set = TimeSet::stamps();
        assert_eq!(
            set.push(span(1.0, 1.0)),
            Err(TimeSetError::MixedTimeKinds { is_span: true })
        );
        assert!(set.is_empty());
    }

    #[test]
    fn spans_may_touch_but_not_overlap() {
        let mut set = TimeSet::spans();
        set.push(span(0.0, 1.0)).unwrap();
        set.push(span(1.0, 1.0)).unwrap();

        let err = set.push(span(1.5, 1.0)).unwrap_err();
        assert!(matches!(err, TimeSetError::Overlap { .. }));
        assert!(err.to_string().contains("overlaps"));
    }

    #[test]
    fn from_times_adopts_first_kind() {
        let set = TimeSet::from_times([span(0.0, 1.0), span(2.0, 1.0)]).unwrap();
        assert!(set.has_durations());

        let err = TimeSet::from_times([Time::at(0.0), span(2.0, 1.0)]).unwrap_err();
        assert_eq!(err.to_string(), "cannot add a time span to a set of stamps");
    }

    #[test]
    fn single_time() {
        let mut set = TimeSet::from_times([Time::at(1.0), Time::at(2.0)]).unwrap();
        set.set_single_time(Time::at(5.0)).unwrap();
        assert_eq!(set.times(), &[Time::at(5.0)]);

        assert!(set.set_single_time(span(5.0, 1.0)).is_err());
        assert_eq!(set.times(), &[Time::at(5.0)]);
    }

    #[test]
    fn horizon_start_keeps_end() {
        let mut set = TimeSet::stamps();
        set.set_horizon(Some(span(0.0, 10.0)));

        set.set_horizon_start(Time::at(4.0));
        let horizon = set.horizon().unwrap();
        assert_relative_eq!(horizon.stamp(), 4.0);
        assert_relative_eq!(horizon.end(), 10.0);

        set.set_horizon_start(Time::at(12.0));
        assert_eq!(set.horizon(), Some(Time::at(12.0)));
    }

    #[test]
    fn horizon_from_times() {
        let mut set = TimeSet::from_times([span(1.0, 1.0), span(3.0, 2.0)]).unwrap();
        set.set_horizon_from_times();
        assert_eq!(set.horizon(), Some(span(1.0, 4.0)));
    }

    #[test]
    fn interval_lookup() {
        let set =
            TimeSet::from_times([Time::at(1.0), Time::at(2.0), Time::at(4.0), Time::at(8.0)])
                .unwrap();

        assert_eq!(
            set.interval(0.5, IntervalKey::Start),
            Interval {
                index: 0,
                fraction: 0.0
            }
        );
        assert_eq!(
            set.interval(9.0, IntervalKey::Start),
            Interval {
                index: 4,
                fraction: 1.0
            }
        );

        let Interval { index, fraction } = set.interval(3.0, IntervalKey::Start);
        assert_eq!(index, 2);
        assert_relative_eq!(fraction, 0.5);

        let Interval { index, fraction } = set.interval(4.0, IntervalKey::Start);
        assert_eq!(index, 2);
        assert_relative_eq!(fraction, 1.0);
    }

    #[test]
    fn interval_lookup_by_end() {
        let set = TimeSet::from_times([span(0.0, 1.0), span(1.0, 1.0), span(2.0, 1.0)]).unwrap();
        assert_eq!(set.interval(1.5, IntervalKey::End).index, 1);
        assert_eq!(set.interval(2.5, IntervalKey::End).index, 2);
        assert_eq!(set.interval(0.5, IntervalKey::End).index, 0);
    }

    #[test]
    fn binary_search_tolerates_epsilon() {
        let set = TimeSet::from_times([Time::at(1.0), Time::at(2.0), Time::at(3.0)]).unwrap();
        assert_eq!(set.binary_search(&Time::at(2.0 + 0.5 * EPSILON)), Ok(1));
        assert_eq!(set.binary_search(&Time::at(2.5)), Err(2));
    }

    #[test]
    fn bulk_removal() {
        let mut set =
            TimeSet::from_times([Time::at(1.0), Time::at(2.0), Time::at(3.0), Time::at(4.0)])
                .unwrap();
        set.remove_first(1);
        set.truncate(2);
        assert_eq!(set.times(), &[Time::at(2.0), Time::at(3.0)]);
    }
}
