//! Anderberg's nearest-neighbour cache.
//!
//! Every active row caches its closest active row with a smaller index, so
//! picking the next merge costs one pass over the cache instead of one pass
//! over the matrix. After a merge only rows whose cached neighbour was
//! touched need a full rescan.

use tracing::instrument;

use crate::{
    error::{HacError, Result},
    history::ClusterMergeHistoryBuilder,
    linkage::Linkage,
    matrix::ClusterDistanceMatrix,
};

/// Returns the closest active row below `row` and its distance.
///
/// Rows without an active predecessor yield `(f64::INFINITY, None)`. Ties go
/// to the highest index, matching the exhaustive scan.
///
/// # Examples
/// ```
/// use agglo_core::{ClusterDistanceMatrix, SingleLinkage, best_in_row};
///
/// // d(1,0) = 4, d(2,0) = 1, d(2,1) = 3
/// let matrix =
///     ClusterDistanceMatrix::from_condensed(vec![4.0, 1.0, 3.0], 3, &SingleLinkage, false)?;
/// assert_eq!(best_in_row(&matrix, 2), (1.0, Some(0)));
/// assert_eq!(best_in_row(&matrix, 0), (f64::INFINITY, None));
/// # Ok::<(), agglo_core::HacError>(())
/// ```
#[must_use]
pub fn best_in_row(matrix: &ClusterDistanceMatrix, row: usize) -> (f64, Option<usize>) {
    let mut best = (f64::INFINITY, None);
    for (y, &value) in matrix.row(row).iter().enumerate() {
        if !matrix.is_active(y) {
            continue;
        }
        if best.1.is_none() || value <= best.0 {
            best = (value, Some(y));
        }
    }
    best
}

#[derive(Debug)]
struct NeighbourCache {
    distance: Vec<f64>,
    index: Vec<Option<usize>>,
}

impl NeighbourCache {
    fn new(matrix: &ClusterDistanceMatrix) -> Self {
        let (distance, index): (Vec<f64>, Vec<Option<usize>>) = (0..matrix.size())
            .map(|row| best_in_row(matrix, row))
            .unzip();
        Self { distance, index }
    }

    fn rescan(&mut self, matrix: &ClusterDistanceMatrix, row: usize) {
        (self.distance[row], self.index[row]) = best_in_row(matrix, row);
    }

    fn clear(&mut self, row: usize) {
        self.distance[row] = f64::INFINITY;
        self.index[row] = None;
    }

    /// Row and neighbour of the smallest cached distance, last row on ties.
    fn closest(&self, matrix: &ClusterDistanceMatrix, end: usize) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        for x in 1..end {
            let Some(y) = self.index[x] else {
                continue;
            };
            if !matrix.is_active(x) {
                continue;
            }
            if best.is_none_or(|(bx, _)| self.distance[x] <= self.distance[bx]) {
                best = Some((x, y));
            }
        }
        best
    }

    /// Reacts to the new distance between merged row `y` and row `j`, given
    /// that row `x` was absorbed. Returns `true` when row `j` needs a rescan.
    fn observe(&mut self, (x, y): (usize, usize), j: usize, value: f64) -> bool {
        if j < y {
            // Entry belongs to row y, which is rescanned anyway.
            return false;
        }
        let cached = self.index[j];
        if j > x && (cached == Some(x) || cached == Some(y)) {
            return true;
        }
        // Ties go to the higher neighbour, as in `best_in_row`.
        if value < self.distance[j] || (value == self.distance[j] && cached.is_some_and(|c| y > c))
        {
            self.distance[j] = value;
            self.index[j] = Some(y);
            return false;
        }
        cached == Some(y)
    }
}

/// Merges the globally closest active pair `n - 1` times, finding it through
/// a per-row nearest-neighbour cache.
///
/// # Errors
/// Returns [`HacError::InvariantViolation`] if the bookkeeping rejects a
/// merge or the cache runs dry before `n - 1` merges were made.
#[instrument(
    name = "hac.anderberg",
    skip_all,
    fields(size = matrix.size(), linkage = linkage.name()),
)]
pub fn run_anderberg(
    matrix: &mut ClusterDistanceMatrix,
    linkage: &dyn Linkage,
    builder: &mut ClusterMergeHistoryBuilder,
) -> Result<()> {
    let mut cache = NeighbourCache::new(matrix);
    let mut stale = Vec::new();
    let mut end = matrix.size();
    for _ in 1..matrix.size() {
        let (x, y) = cache.closest(matrix, end).ok_or_else(|| {
            HacError::invariant("no cached neighbour left", end, end, builder.merge_count())
        })?;
        let value = matrix.get(x, y);
        stale.clear();
        matrix.merge_rows((x, y), value, end, linkage, builder, |j, combined| {
            if cache.observe((x, y), j, combined) {
                stale.push(j);
            }
        })?;
        cache.clear(x);
        cache.rescan(matrix, y);
        for &row in &stale {
            cache.rescan(matrix, row);
        }
        end = matrix.shrink_active_set(end, x);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkage::{CompleteLinkage, SingleLinkage};

    fn line(positions: &[f64], linkage: &dyn Linkage) -> ClusterDistanceMatrix {
        let mut values = Vec::new();
        for x in 1..positions.len() {
            for y in 0..x {
                values.push((positions[x] - positions[y]).abs());
            }
        }
        ClusterDistanceMatrix::from_condensed(values, positions.len(), linkage, false)
            .expect("valid matrix")
    }

    #[test]
    fn best_in_row_skips_inactive_rows() {
        let mut matrix = line(&[0.0, 4.0, 5.0], &SingleLinkage);
        let mut builder = ClusterMergeHistoryBuilder::new(3, false);
        matrix
            .merge_rows((1, 0), 4.0, 3, &SingleLinkage, &mut builder, |_, _| {})
            .expect("merge");
        // Row 1 is gone; row 0 now holds {0, 1} at single-link distance 1.
        assert_eq!(best_in_row(&matrix, 2), (1.0, Some(0)));
    }

    #[test]
    fn cache_matches_full_rescan_after_every_merge() {
        let positions = [0.0, 2.5, 3.1, 7.0, 7.4, 12.0, 20.0, 20.9];
        let mut matrix = line(&positions, &CompleteLinkage);
        let mut builder = ClusterMergeHistoryBuilder::new(positions.len(), false);
        let mut cache = NeighbourCache::new(&matrix);
        let mut end = matrix.size();
        for _ in 1..matrix.size() {
            let (x, y) = cache.closest(&matrix, end).expect("pair available");
            let value = matrix.get(x, y);
            let mut stale = Vec::new();
            matrix
                .merge_rows((x, y), value, end, &CompleteLinkage, &mut builder, |j, v| {
                    if cache.observe((x, y), j, v) {
                        stale.push(j);
                    }
                })
                .expect("merge");
            cache.clear(x);
            cache.rescan(&matrix, y);
            for row in stale {
                cache.rescan(&matrix, row);
            }
            end = matrix.shrink_active_set(end, x);

            for row in 1..end {
                if matrix.is_active(row) {
                    let (distance, _) = best_in_row(&matrix, row);
                    assert_eq!(cache.distance[row], distance, "row {row}");
                }
            }
        }
    }
}
