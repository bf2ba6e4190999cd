//! Threshold selection over ordered field-value samples.
//!
//! A sample sequence of length `K` describes `K − 1` inter-sample buckets of
//! nominally equal population. Selecting every `(K − 1) / N`-th sample
//! therefore splits the population into `N` parts of approximately equal
//! count. The first and last samples are the observed minimum and maximum
//! and are never usable as separators.

use std::cmp::Ordering;

use itertools::Itertools;

use crate::bail;
use crate::error::PaginationError;
use crate::value_space::FieldValue;

/// Minimum sample count needed to split into `subdivisions` parts.
///
/// With fewer than `2N + 1` samples the inter-sample buckets are coarser
/// than the requested pages and any split would be dominated by sampling
/// noise, so the planner refuses instead.
pub(crate) fn required_sample_count(subdivisions: usize) -> usize {
    2 * subdivisions + 1
}

/// First index in `samples` whose value is not less than `value`.
pub(crate) fn bisect_left(
    samples: &[FieldValue],
    value: &FieldValue,
) -> Result<usize, PaginationError> {
    let mut lo = 0usize;
    let mut hi = samples.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if samples[mid].try_cmp(value)? == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// Index of the `i`-th of `n − 1` separators within a trimmed sample slice,
/// between the narrowed positions `min_q` (inclusive) and `max_q`
/// (exclusive).
pub(crate) fn threshold_index(min_q: usize, max_q: usize, i: usize, n: usize) -> usize {
    let span = max_q.saturating_sub(min_q) + 1;
    min_q + (i * span).div_ceil(n)
}

/// The `n − 1` separator values for `samples`, restricted to an inclusive
/// `[lower, upper]` value range, with consecutive duplicates dropped.
/// Pathological distributions may yield fewer than `n − 1` values.
pub(crate) fn select_thresholds(
    samples: &[FieldValue],
    lower: Option<&FieldValue>,
    upper: Option<&FieldValue>,
    n: usize,
) -> Result<Vec<FieldValue>, PaginationError> {
    if n < 2 {
        bail!("cannot partition into {n} subdivisions");
    }
    if samples.len() < 3 {
        return Ok(Vec::new());
    }
    let proper = &samples[1..samples.len() - 1];
    let min_q = match lower {
        Some(bound) => bisect_left(proper, bound)?,
        None => 0,
    };
    let max_q = match upper {
        Some(bound) => bisect_left(proper, bound)?,
        None => proper.len(),
    };
    let thresholds = (1..n)
        .map(|i| {
            let index = threshold_index(min_q, max_q, i, n).min(proper.len() - 1);
            proper[index]
        })
        .dedup()
        .collect();
    Ok(thresholds)
}
