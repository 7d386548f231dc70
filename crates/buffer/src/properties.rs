//! Property tests for buffer ordering, knots and retention.

use confluence_core::{EPSILON, Time};
use proptest::prelude::*;

use crate::{BufferConfig, SmartBuffer};

/// Strictly increasing stamps, at least `EPSILON` apart.
fn increasing_stamps(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01..10.0_f64, 1..max_len).prop_map(|gaps| {
        gaps.iter()
            .scan(0.0, |stamp, gap| {
                *stamp += gap;
                Some(*stamp)
            })
            .collect()
    })
}

fn filled(stamps: &[f64], values: &[f64]) -> SmartBuffer {
    let mut buffer = SmartBuffer::new();
    for (stamp, value) in stamps.iter().zip(values) {
        buffer.add_values(Time::at(*stamp), vec![*value]).unwrap();
    }
    buffer
}

proptest! {
    #[test]
    fn prop_buffered_stamps_stay_increasing(
        stamps in prop::collection::vec(-100.0..100.0_f64, 1..40),
    ) {
        let mut buffer = SmartBuffer::new();
        for stamp in stamps {
            let before = buffer.len();
            match buffer.add_values(Time::at(stamp), vec![stamp]) {
                Ok(()) => prop_assert_eq!(buffer.len(), before + 1),
                Err(_) => prop_assert_eq!(buffer.len(), before),
            }
        }

        let times = buffer.time_set().times();
        for pair in times.windows(2) {
            prop_assert!(pair[0].stamp() < pair[1].stamp());
        }
        prop_assert!(times.iter().all(Time::is_stamp));
    }

    #[test]
    fn prop_knots_return_stored_values(
        stamps in increasing_stamps(30),
        values in prop::collection::vec(-1e3..1e3_f64, 30),
        relaxation_factor in 0.0..=1.0_f64,
    ) {
        let mut buffer = filled(&stamps, &values);
        buffer.set_relaxation_factor(relaxation_factor).unwrap();

        for (stamp, value) in stamps.iter().zip(&values) {
            prop_assert_eq!(buffer.get_values(&Time::at(*stamp)).unwrap(), vec![*value]);
        }
    }

    #[test]
    fn prop_clear_before_keeps_an_earlier_entry(
        stamps in increasing_stamps(30),
        at in 0.0..300.0_f64,
    ) {
        let values = vec![0.0; stamps.len()];
        let mut buffer = filled(&stamps, &values);
        let had_earlier = stamps.iter().any(|&stamp| stamp < at - EPSILON);

        buffer.clear_before(&Time::at(at));

        prop_assert!(!buffer.is_empty());
        if had_earlier {
            prop_assert!(buffer.time_at(0).unwrap().stamp() < at);
        }
    }

    #[test]
    fn prop_interpolation_stays_within_neighbors(
        stamps in increasing_stamps(20),
        values in prop::collection::vec(-1e3..1e3_f64, 20),
        position in 0.0..1.0_f64,
    ) {
        prop_assume!(stamps.len() >= 2);
        let buffer = filled(&stamps, &values);
        let (first, last) = (stamps[0], stamps[stamps.len() - 1]);
        let query = first + position * (last - first);

        let result = buffer.get_values(&Time::at(query)).unwrap()[0];
        let index = stamps.partition_point(|&stamp| stamp < query).clamp(1, stamps.len() - 1);
        let (low, high) = (values[index - 1], values[index]);
        prop_assert!(result >= low.min(high) - 1e-9);
        prop_assert!(result <= low.max(high) + 1e-9);
    }

    #[test]
    fn prop_disabled_extrapolation_accepts_inside_queries(
        stamps in increasing_stamps(20),
        position in 0.0..=1.0_f64,
        beyond in 0.001..10.0_f64,
    ) {
        let values = vec![1.0; stamps.len()];
        let mut buffer = filled(&stamps, &values);
        buffer.set_extrapolate(false);
        let (first, last) = (stamps[0], stamps[stamps.len() - 1]);

        prop_assert!(buffer.get_values(&Time::at(first + position * (last - first))).is_ok());
        prop_assert!(buffer.get_values(&Time::at(last + beyond)).is_err());
        prop_assert!(buffer.get_values(&Time::at(first - beyond)).is_err());
    }
}

#[test]
fn default_config_extrapolates_nearest() {
    let config = BufferConfig::default();
    assert!(config.extrapolate());
    assert!((config.relaxation_factor() - 1.0).abs() < f64::EPSILON);
}
