use confluence_core::{Argument, ArgumentError, Time, ValueSet};
use ndarray::Array2;

use super::linear::double;

pub(crate) const AMPLITUDE: &str = "Amplitude";
pub(crate) const PHASE: &str = "Phase";
pub(crate) const FREQUENCY: &str = "Frequency";

pub(crate) fn arguments() -> Vec<Argument> {
    vec![
        Argument::new(AMPLITUDE, 1.0).with_description("A in y = A*sin(F*t + P)"),
        Argument::new(PHASE, 0.0).with_description("P in y = A*sin(F*t + P)"),
        Argument::new(FREQUENCY, 1.0).with_description("F in y = A*sin(F*t + P)"),
    ]
}

/// Replaces every value by the wave at the stamp of its time.
///
/// Rows without a matching time use the last time.
pub(crate) fn apply(
    values: &ValueSet,
    times: &[Time],
    arguments: &[Argument],
) -> Result<ValueSet, ArgumentError> {
    let amplitude = double(arguments, AMPLITUDE)?;
    let phase = double(arguments, PHASE)?;
    let frequency = double(arguments, FREQUENCY)?;

    let wave = Array2::from_shape_fn(values.shape(), |(row, element)| {
        match times.get(row).or(times.last()) {
            Some(time) => amplitude * (frequency * time.stamp() + phase).sin(),
            None => values.as_array()[[row, element]],
        }
    });
    Ok(ValueSet::from(wave))
}
