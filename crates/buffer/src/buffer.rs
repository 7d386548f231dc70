use confluence_core::{EPSILON, Time, TimeSet, ValueSet, ValueSetError};
use tracing::{debug, trace};

use crate::{
    config::{BufferConfig, ConfigError},
    error::BufferError,
    mapping::{self, Samples},
};

/// Time-indexed values that answer queries for arbitrary times.
///
/// Holds either stamps or spans, decided by the first insertion, and one
/// vector of values per time with the same length for every time.
/// Queries may ask for a stamp or a span regardless of what is stored; the
/// answer is interpolated, aggregated or extrapolated as needed.
#[derive(Debug, Clone, Default)]
pub struct SmartBuffer {
    times: TimeSet,
    values: Vec<Vec<f64>>,
    config: BufferConfig,
    last_size_message: usize,
}

impl SmartBuffer {
    /// Creates an empty buffer with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with the given config.
    #[must_use]
    pub fn with_config(config: BufferConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Changes the relaxation factor used when extrapolating.
    ///
    /// # Errors
    ///
    /// Returns an error if the factor lies outside `[0, 1]`.
    pub fn set_relaxation_factor(&mut self, relaxation_factor: f64) -> Result<(), ConfigError> {
        self.config = self.config.with_relaxation_factor(relaxation_factor)?;
        Ok(())
    }

    pub fn set_extrapolate(&mut self, extrapolate: bool) {
        self.config = self.config.with_extrapolate(extrapolate);
    }

    /// Appends values for a time after the last buffered time.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the buffer unmodified, if the time mixes
    /// stamps and spans with the buffered times, does not follow the last
    /// buffered time, or the number of values differs from earlier entries.
    pub fn add_values(&mut self, time: Time, values: impl Into<Vec<f64>>) -> Result<(), BufferError> {
        let values = values.into();
        self.check_arity(&values)?;

        if self.times.is_empty() && self.times.has_durations() != time.is_span() {
            let horizon = self.times.horizon();
            self.times = TimeSet::new(time.is_span());
            self.times.set_horizon(horizon);
        }
        self.times.push(time)?;
        self.values.push(values);

        self.report_growth();
        Ok(())
    }

    /// Replaces the values of an equal buffered time, or appends them.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the buffer unmodified, if the number of
    /// values differs from earlier entries or an append would fail.
    pub fn set_or_add_values(
        &mut self,
        time: Time,
        values: impl Into<Vec<f64>>,
    ) -> Result<(), BufferError> {
        let values = values.into();
        match self.times.binary_search(&time) {
            Ok(index) if self.times.has_durations() == time.is_span() => {
                self.check_arity(&values)?;
                self.values[index] = values;
                Ok(())
            }
            _ => self.add_values(time, values),
        }
    }

    /// Returns the values for `requested`, which may be a stamp or a span.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty, or if extrapolation is
    /// disabled and `requested` reaches outside the buffered times by more
    /// than [`EPSILON`].
    pub fn get_values(&self, requested: &Time) -> Result<Vec<f64>, BufferError> {
        let (Some(first), Some(last)) = (self.times.first(), self.times.last()) else {
            return Err(BufferError::Empty);
        };

        if !self.config.extrapolate()
            && (requested.end() > last.end() + EPSILON || requested.stamp() < first.stamp() - EPSILON)
        {
            return Err(BufferError::ExtrapolationNotPermitted {
                requested: *requested,
                first: first.stamp(),
                last: last.end(),
            });
        }

        let samples = Samples {
            times: &self.times,
            values: &self.values,
            relaxation_factor: self.config.relaxation_factor(),
            extrapolate: self.config.extrapolate(),
        };
        Ok(mapping::map(&samples, requested))
    }

    /// Removes entries that end before `time`, keeping the latest of them.
    ///
    /// The kept entry lets queries just after `time` still interpolate.
    pub fn clear_before(&mut self, time: &Time) {
        let clear_time = time.stamp() - EPSILON;
        let Some(index) = self
            .times
            .times()
            .iter()
            .rposition(|buffered| buffered.end() < clear_time)
        else {
            return;
        };
        if index > 0 {
            trace!(removed = index, remaining = self.len() - index, "buffer trimmed");
        }
        self.times.remove_first(index);
        self.values.drain(..index);
        self.last_size_message = self.len();
    }

    /// Removes entries starting at or after `time`.
    pub fn clear_after(&mut self, time: &Time) {
        let clear_time = time.stamp() - EPSILON;
        let Some(index) = self
            .times
            .times()
            .iter()
            .position(|buffered| clear_time <= buffered.stamp())
        else {
            return;
        };
        trace!(removed = self.len() - index, remaining = index, "buffer truncated");
        self.times.truncate(index);
        self.values.truncate(index);
        self.last_size_message = self.len();
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.times.clear();
        self.values.clear();
        self.last_size_message = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of values per time, if any entry exists.
    #[must_use]
    pub fn element_count(&self) -> Option<usize> {
        self.values.first().map(Vec::len)
    }

    /// Returns the buffered times.
    #[must_use]
    pub fn time_set(&self) -> &TimeSet {
        &self.times
    }

    #[must_use]
    pub fn last_time(&self) -> Option<&Time> {
        self.times.last()
    }

    /// Sets the horizon carried on the buffered time set.
    pub fn set_horizon(&mut self, horizon: Option<Time>) {
        self.times.set_horizon(horizon);
    }

    /// Returns the time at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn time_at(&self, index: usize) -> Result<&Time, BufferError> {
        self.times.get(index).ok_or(BufferError::IndexOutOfRange {
            index,
            len: self.len(),
        })
    }

    /// Returns the values stored for the time at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range.
    pub fn values_at(&self, index: usize) -> Result<&[f64], BufferError> {
        self.values
            .get(index)
            .map(Vec::as_slice)
            .ok_or(BufferError::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Returns every buffered value, one row per time.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot form a value set.
    pub fn all_values(&self) -> Result<ValueSet, ValueSetError> {
        ValueSet::from_rows(&self.values)
    }

    fn check_arity(&self, values: &[f64]) -> Result<(), BufferError> {
        match self.element_count() {
            Some(expected) if expected != values.len() => Err(BufferError::ArityMismatch {
                expected,
                found: values.len(),
            }),
            _ => Ok(()),
        }
    }

    fn report_growth(&mut self) {
        let len = self.len();
        if len > self.last_size_message && len % self.config.size_message_frequency() == 0 {
            debug!(size = len, "buffer size has increased");
            self.last_size_message = len;
        }
    }
}
