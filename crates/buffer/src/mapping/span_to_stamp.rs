use confluence_core::{Interval, IntervalKey};

use super::{Samples, zip_map};

/// The value of the span containing the stamp.
///
/// A single stored span answers every stamp. Beyond the stored spans the
/// boundary value is blended with the trend of the two boundary spans.
pub(super) fn map(samples: &Samples<'_>, tr: f64) -> Vec<f64> {
    let n = samples.len();
    if n == 1 {
        return samples.values(0).to_vec();
    }

    let weight = samples.linear_weight();

    let tbb0 = samples.time(0).stamp();
    if tr <= tbb0 {
        if !samples.extrapolate {
            return samples.values(0).to_vec();
        }
        let tbb1 = samples.time(1).stamp();
        let fraction = (tr - tbb0) / (tbb0 - tbb1) * weight;
        return zip_map(samples.values(0), samples.values(1), |s0, s1| {
            (s0 - s1) * fraction + s0
        });
    }

    let tben1 = samples.time(n - 1).end();
    if tr >= tben1 {
        if !samples.extrapolate {
            return samples.values(n - 1).to_vec();
        }
        let tben2 = samples.time(n - 2).end();
        let fraction = (tr - tben1) / (tben1 - tben2) * weight;
        return zip_map(samples.values(n - 2), samples.values(n - 1), |sn2, sn1| {
            (sn1 - sn2) * fraction + sn1
        });
    }

    // Keyed on span ends, the interval index is the span holding `tr`.
    let Interval { index, .. } = samples.times.interval(tr, IntervalKey::End);
    samples.values(index.min(n - 1)).to_vec()
}
