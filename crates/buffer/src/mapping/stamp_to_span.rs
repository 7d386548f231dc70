use confluence_core::{IntervalKey, Time};

use super::{STAMP_SEARCH_THRESHOLD, Samples, accumulate, zip_map};

/// Time-weighted trapezoidal average over the stored stamps.
///
/// Parts of the request outside the stored stamps are extrapolated from the
/// two boundary stamps and weighted by their share of the request.
pub(super) fn map(samples: &Samples<'_>, requested: &Time) -> Vec<f64> {
    let n = samples.len();
    if n == 1 {
        return samples.values(0).to_vec();
    }

    let mut xr = vec![0.0; samples.arity()];

    let trb = requested.stamp();
    let tre = requested.end();
    let trl = tre - trb;

    // Interval k lies between stamps k - 1 and k.
    let (first, last) = if n - 1 > STAMP_SEARCH_THRESHOLD {
        (
            samples.times.interval(trb, IntervalKey::Start).index.max(1),
            samples
                .times
                .interval(tre, IntervalKey::Start)
                .index
                .min(n - 1),
        )
    } else {
        (1, n - 1)
    };

    for k in first..=last {
        let tbn = samples.time(k - 1).stamp();
        let tbnp1 = samples.time(k).stamp();
        let (before, after) = (samples.values(k - 1), samples.values(k));

        if trb <= tbn && tre >= tbnp1 {
            let share = (tbnp1 - tbn) / trl;
            accumulate(&mut xr, before, after, |sn, snp1| 0.5 * (sn + snp1) * share);
        } else if tbn <= trb && tre <= tbnp1 {
            let fraction = (0.5 * (tre + trb) - tbn) / (tbnp1 - tbn);
            accumulate(&mut xr, before, after, |sn, snp1| sn + (snp1 - sn) * fraction);
        } else if tbn < trb && trb < tbnp1 && tre > tbnp1 {
            let fraction = 0.5 * (tbnp1 - trb) / (tbnp1 - tbn);
            let share = (tbnp1 - trb) / trl;
            accumulate(&mut xr, before, after, |sn, snp1| {
                (snp1 - (snp1 - sn) * fraction) * share
            });
        } else if trb < tbn && tre > tbn && tre < tbnp1 {
            let fraction = 0.5 * (tre - tbn) / (tbnp1 - tbn);
            let share = (tre - tbn) / trl;
            accumulate(&mut xr, before, after, |sn, snp1| {
                (sn + (snp1 - sn) * fraction) * share
            });
        }
    }

    let weight = samples.linear_weight();
    let tb0 = samples.time(0).stamp();
    let tb1 = samples.time(1).stamp();
    let tbn1 = samples.time(n - 1).stamp();
    let tbn2 = samples.time(n - 2).stamp();

    // Starts before the first stamp.
    if trb < tb0 && tre > tb0 {
        let fraction = weight * 0.5 * (tb0 - trb) / (tb1 - tb0);
        let share = (tb0 - trb) / trl;
        accumulate(&mut xr, samples.values(0), samples.values(1), |s0, s1| {
            share * (s0 - fraction * (s1 - s0))
        });
    }

    // Ends after the last stamp.
    if tre > tbn1 && trb < tbn1 {
        let share = (tre - tbn1) / trl;
        let fraction = weight * 0.5 * (tre - tbn1) / (tbn1 - tbn2);
        accumulate(&mut xr, samples.values(n - 1), samples.values(n - 2), |sn1, sn2| {
            share * (sn1 + fraction * (sn1 - sn2))
        });
    }

    // Entirely after the last stamp.
    if trb >= tbn1 {
        let fraction = weight * (0.5 * (trb + tre) - tbn1) / (tbn1 - tbn2);
        return zip_map(samples.values(n - 1), samples.values(n - 2), |sn1, sn2| {
            sn1 + (sn1 - sn2) * fraction
        });
    }

    // Entirely before the first stamp.
    if tre <= tb0 {
        let fraction = weight / (tb1 - tb0) * (tb0 - 0.5 * (trb + tre));
        return zip_map(samples.values(0), samples.values(1), |s0, s1| {
            s0 - (s1 - s0) * fraction
        });
    }

    xr
}
