//! Exhaustive pair scan (AGNES).

use tracing::instrument;

use crate::{
    error::{HacError, Result},
    history::ClusterMergeHistoryBuilder,
    linkage::Linkage,
    matrix::ClusterDistanceMatrix,
};

/// Merges the globally closest active pair `n - 1` times.
///
/// Each step scans every active pair `(x, y)` with `y < x`. Ties go to the
/// pair found last, which favours high rows and lets the active set shrink
/// sooner.
///
/// # Errors
/// Returns [`HacError::InvariantViolation`] if the bookkeeping rejects a
/// merge or no active pair remains before `n - 1` merges were made.
#[instrument(
    name = "hac.naive",
    skip_all,
    fields(size = matrix.size(), linkage = linkage.name()),
)]
pub fn run_naive(
    matrix: &mut ClusterDistanceMatrix,
    linkage: &dyn Linkage,
    builder: &mut ClusterMergeHistoryBuilder,
) -> Result<()> {
    let mut end = matrix.size();
    for _ in 1..matrix.size() {
        let (x, y, value) = closest_pair(matrix, end).ok_or_else(|| {
            HacError::invariant("no active pair left", end, end, builder.merge_count())
        })?;
        matrix.merge_rows((x, y), value, end, linkage, builder, |_, _| {})?;
        end = matrix.shrink_active_set(end, x);
    }
    Ok(())
}

fn closest_pair(matrix: &ClusterDistanceMatrix, end: usize) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for x in 1..end {
        if !matrix.is_active(x) {
            continue;
        }
        for (y, &value) in matrix.row(x).iter().enumerate() {
            if !matrix.is_active(y) {
                continue;
            }
            if best.is_none_or(|(_, _, min)| value <= min) {
                best = Some((x, y, value));
            }
        }
    }
    best
}
