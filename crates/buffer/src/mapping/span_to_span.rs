use confluence_core::{IntervalKey, Time};

use super::{SPAN_SEARCH_THRESHOLD, Samples, accumulate, accumulate_scaled, zip_map};

/// Overlap-weighted average of every stored span intersecting the request.
///
/// Parts of the request outside the stored spans are extrapolated from the
/// boundary spans and weighted by their share of the request.
pub(super) fn map(samples: &Samples<'_>, requested: &Time) -> Vec<f64> {
    let n = samples.len();
    let mut xr = vec![0.0; samples.arity()];

    let trb = requested.stamp();
    let tre = requested.end();
    let trl = tre - trb;

    let weight = samples.linear_weight();
    let linear = samples.is_linear();

    if samples.extrapolate {
        let tbb0 = samples.time(0).stamp();
        let tbe0 = samples.time(0).end();

        // Entirely before the buffer.
        if tre <= tbb0 {
            if !linear {
                return samples.values(0).to_vec();
            }
            let tbe1 = samples.time(1).end();
            return zip_map(samples.values(0), samples.values(1), |s0, s1| {
                s0 - weight * (s1 - s0) * (tbe0 + tbb0 - tre - trb) / (tbe1 - tbb0)
            });
        }

        // Starts before the buffer.
        if trb < tbb0 {
            let share = (tbb0 - trb) / trl;
            if linear {
                let tbe1 = samples.time(1).end();
                accumulate(&mut xr, samples.values(0), samples.values(1), |s0, s1| {
                    share * (s0 - weight * (s1 - s0) * (tbe0 - trb) / (tbe1 - tbb0))
                });
            } else {
                accumulate_scaled(&mut xr, samples.values(0), share);
            }
        }

        let tben0 = samples.time(n - 1).end();

        // Entirely after the buffer.
        if tben0 < trb {
            if !linear {
                return samples.values(n - 1).to_vec();
            }
            let tben1 = samples.time(n - 2).end();
            let tbbn1 = samples.time(n - 2).stamp();
            return zip_map(samples.values(n - 1), samples.values(n - 2), |sn0, sn1| {
                sn0 + weight * (sn0 - sn1) * (trb + tre - tben0 - tben1) / (tben0 - tbbn1)
            });
        }

        // Ends after the buffer.
        if tben0 < tre {
            let share = (tre - tben0) / trl;
            if linear {
                let tben1 = samples.time(n - 2).end();
                let tbbn1 = samples.time(n - 2).stamp();
                accumulate(&mut xr, samples.values(n - 1), samples.values(n - 2), |sn0, sn1| {
                    share * (sn0 + weight * (sn0 - sn1) * (tre - tben1) / (tben0 - tbbn1))
                });
            } else {
                accumulate_scaled(&mut xr, samples.values(n - 1), share);
            }
        }
    }

    let (first, last) = if n - 1 > SPAN_SEARCH_THRESHOLD {
        (
            samples.times.interval(trb, IntervalKey::End).index,
            samples
                .times
                .interval(tre, IntervalKey::End)
                .index
                .min(n - 1),
        )
    } else {
        (0, n - 1)
    };

    for k in first..=last {
        let tbbn = samples.time(k).stamp();
        let tben = samples.time(k).end();

        let share = if trb <= tbbn && tre >= tben {
            // Stored span inside the request.
            (tben - tbbn) / trl
        } else if tbbn <= trb && tre <= tben {
            // Request inside the stored span.
            1.0
        } else if tbbn < trb && trb < tben && tre > tben {
            // Overlaps the start of the request.
            (tben - trb) / trl
        } else if trb < tbbn && tre > tbbn && tre < tben {
            // Overlaps the end of the request.
            (tre - tbbn) / trl
        } else {
            continue;
        };
        accumulate_scaled(&mut xr, samples.values(k), share);
    }

    xr
}
