use confluence_core::{Interval, IntervalKey, Time};

use super::{Samples, zip_map};

/// Linear interpolation between the bracketing stamps.
///
/// Outside the stored stamps the nearest value is blended with the linear
/// trend of the two boundary stamps.
pub(super) fn map(samples: &Samples<'_>, tr: f64) -> Vec<f64> {
    let n = samples.len();
    if n == 1 {
        return samples.values(0).to_vec();
    }
    if let Ok(index) = samples.times.binary_search(&Time::at(tr)) {
        return samples.values(index).to_vec();
    }

    let weight = samples.linear_weight();

    let (tb0, tb1) = (samples.time(0).stamp(), samples.time(1).stamp());
    if tr <= tb0 {
        return zip_map(samples.values(0), samples.values(1), |s0, s1| {
            (s0 - s1) / (tb0 - tb1) * (tr - tb0) * weight + s0
        });
    }

    let (tbn2, tbn1) = (samples.time(n - 2).stamp(), samples.time(n - 1).stamp());
    if tr > tbn1 {
        return zip_map(samples.values(n - 2), samples.values(n - 1), |sn2, sn1| {
            (sn1 - sn2) / (tbn1 - tbn2) * (tr - tbn1) * weight + sn1
        });
    }

    let Interval { index, fraction } = samples.times.interval(tr, IntervalKey::Start);
    zip_map(samples.values(index - 1), samples.values(index), |a, b| {
        a + fraction * (b - a)
    })
}
