//! Reconciliation of a requested time against buffered times.
//!
//! One function per (stored kind, requested kind) pair. Callers check the
//! extrapolation policy and non-emptiness before dispatching here, so every
//! mapping is infallible.

mod span_to_span;
mod span_to_stamp;
mod stamp_to_span;
mod stamp_to_stamp;

use confluence_core::{Time, TimeSet};

/// Stored spans are narrowed by bisection once the buffer holds more than
/// this many intervals.
const SPAN_SEARCH_THRESHOLD: usize = 10;

/// Stored stamps are narrowed by bisection once the buffer holds more than
/// this many intervals between stamps.
const STAMP_SEARCH_THRESHOLD: usize = 4;

/// A read-only view of a non-empty buffer.
pub(crate) struct Samples<'a> {
    pub times: &'a TimeSet,
    pub values: &'a [Vec<f64>],
    pub relaxation_factor: f64,
    pub extrapolate: bool,
}

impl Samples<'_> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn arity(&self) -> usize {
        self.values[0].len()
    }

    fn time(&self, index: usize) -> &Time {
        &self.times.times()[index]
    }

    fn values(&self, index: usize) -> &[f64] {
        &self.values[index]
    }

    /// Returns `true` if boundary extrapolation blends in the linear trend.
    fn is_linear(&self) -> bool {
        self.len() >= 2 && self.relaxation_factor < 1.0
    }

    /// Weight of the linear trend in extrapolated values.
    fn linear_weight(&self) -> f64 {
        1.0 - self.relaxation_factor
    }
}

/// Returns the values for `requested` from a non-empty buffer.
pub(crate) fn map(samples: &Samples<'_>, requested: &Time) -> Vec<f64> {
    match (samples.times.has_durations(), requested.is_span()) {
        (true, true) => span_to_span::map(samples, requested),
        (true, false) => span_to_stamp::map(samples, requested.stamp()),
        (false, true) => stamp_to_span::map(samples, requested),
        (false, false) => stamp_to_stamp::map(samples, requested.stamp()),
    }
}

fn zip_map(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

fn accumulate(acc: &mut [f64], a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) {
    for ((sum, &x), &y) in acc.iter_mut().zip(a).zip(b) {
        *sum += f(x, y);
    }
}

fn accumulate_scaled(acc: &mut [f64], values: &[f64], weight: f64) {
    for (sum, &x) in acc.iter_mut().zip(values) {
        *sum += x * weight;
    }
}
