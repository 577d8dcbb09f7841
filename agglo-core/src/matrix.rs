//! Packed lower-triangular distance matrix with live row bookkeeping.
//!
//! Row `x` stores its distances to every row `y < x`, so the entry for
//! `(x, y)` lives at `triangle_size(x) + y`. Rows are never removed: a merge
//! re-points the surviving row at the new cluster id and marks the absorbed
//! row inactive. Algorithms keep an exclusive upper bound `end` on the rows
//! still worth scanning and shrink it with
//! [`ClusterDistanceMatrix::shrink_active_set`].

use std::sync::Arc;

use tracing::{instrument, trace};

use crate::{
    datasource::DataSource,
    error::{HacError, Result},
    history::ClusterMergeHistoryBuilder,
    linkage::Linkage,
};

/// Largest object count the matrix accepts.
pub const MAX_MATRIX_SIZE: usize = 65_535;

/// Number of packed entries preceding row `x`, which is also the number of
/// entries in a matrix over `x` objects.
///
/// # Examples
/// ```
/// use agglo_core::triangle_size;
///
/// assert_eq!(triangle_size(0), 0);
/// assert_eq!(triangle_size(1), 0);
/// assert_eq!(triangle_size(4), 6);
/// ```
#[must_use]
pub const fn triangle_size(x: usize) -> usize {
    x.saturating_mul(x.saturating_sub(1)) / 2
}

/// Checks that `size` objects fit into a packed matrix.
///
/// # Errors
/// Returns [`HacError::Capacity`] when `size > MAX_MATRIX_SIZE`.
pub const fn ensure_capacity(size: usize) -> Result<()> {
    if size > MAX_MATRIX_SIZE {
        return Err(HacError::Capacity {
            size,
            max: MAX_MATRIX_SIZE,
        });
    }
    Ok(())
}

/// Pairwise cluster distances for one agglomeration run.
///
/// Values are stored on the linkage's internal scale (for example halved
/// squared distances for Ward); [`Linkage::restore`] converts them back when
/// a merge is recorded.
///
/// # Examples
/// ```
/// use agglo_core::{ClusterDistanceMatrix, CompleteLinkage};
///
/// // d(1,0) = 2, d(2,0) = 5, d(2,1) = 3
/// let matrix =
///     ClusterDistanceMatrix::from_condensed(vec![2.0, 5.0, 3.0], 3, &CompleteLinkage, false)?;
/// assert_eq!(matrix.get(0, 2), 5.0);
/// assert_eq!(matrix.get(2, 0), 5.0);
/// assert_eq!(matrix.get(1, 1), 0.0);
/// # Ok::<(), agglo_core::HacError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterDistanceMatrix {
    matrix: Vec<f64>,
    clustermap: Vec<Option<usize>>,
    size: usize,
}

impl ClusterDistanceMatrix {
    /// Allocates a zeroed matrix over `size` singleton clusters.
    ///
    /// # Errors
    /// Returns [`HacError::Capacity`] before allocating when `size` exceeds
    /// [`MAX_MATRIX_SIZE`].
    pub fn new(size: usize) -> Result<Self> {
        ensure_capacity(size)?;
        Ok(Self {
            matrix: vec![0.0; triangle_size(size)],
            clustermap: (0..size).map(Some).collect(),
            size,
        })
    }

    /// Fills a matrix from `source`, computing each pairwise distance once
    /// and seeding it through [`Linkage::initial`].
    ///
    /// # Errors
    /// Returns [`HacError::Capacity`] for oversized sources,
    /// [`HacError::DataSource`] when the source fails, and
    /// [`HacError::NonFiniteDistance`] for NaN or infinite distances.
    #[instrument(
        name = "hac.matrix.fill",
        skip(source, linkage),
        fields(data_source = source.name(), items = source.len()),
    )]
    pub fn from_source<D: DataSource + ?Sized>(source: &D, linkage: &dyn Linkage) -> Result<Self> {
        let mut matrix = Self::new(source.len())?;
        let squared = source.is_squared();
        let mut slot = 0;
        for x in 1..matrix.size {
            for y in 0..x {
                let distance = source
                    .distance(x, y)
                    .map_err(|error| HacError::DataSource {
                        data_source: Arc::from(source.name()),
                        error,
                    })?;
                matrix.matrix[slot] = seed(linkage, distance, squared, x, y)?;
                slot += 1;
            }
        }
        Ok(matrix)
    }

    /// Builds a matrix from a condensed lower-triangular array of raw
    /// distances in the packing described at module level.
    ///
    /// # Errors
    /// Returns [`HacError::Capacity`], [`HacError::CondensedLength`] when
    /// `values` does not hold `triangle_size(size)` entries, and
    /// [`HacError::NonFiniteDistance`] for NaN or infinite entries.
    pub fn from_condensed(
        mut values: Vec<f64>,
        size: usize,
        linkage: &dyn Linkage,
        squared: bool,
    ) -> Result<Self> {
        ensure_capacity(size)?;
        let expected = triangle_size(size);
        if values.len() != expected {
            return Err(HacError::CondensedLength {
                expected,
                got: values.len(),
            });
        }
        let mut slot = 0;
        for x in 1..size {
            for y in 0..x {
                values[slot] = seed(linkage, values[slot], squared, x, y)?;
                slot += 1;
            }
        }
        Ok(Self {
            matrix: values,
            clustermap: (0..size).map(Some).collect(),
            size,
        })
    }

    /// Returns the number of rows, active or not.
    #[must_use]
    #[rustfmt::skip]
    pub fn size(&self) -> usize { self.size }

    /// Returns the packed position of `(x, y)` for `x > y`.
    #[must_use]
    pub const fn offset(x: usize, y: usize) -> usize {
        debug_assert!(x > y);
        triangle_size(x) + y
    }

    /// Returns the stored value between rows `x` and `y` in either order.
    ///
    /// # Panics
    /// Panics when either row is out of range.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        match x.cmp(&y) {
            std::cmp::Ordering::Greater => self.matrix[Self::offset(x, y)],
            std::cmp::Ordering::Less => self.matrix[Self::offset(y, x)],
            std::cmp::Ordering::Equal => 0.0,
        }
    }

    /// Returns the packed entries of `row` against rows `0..row`.
    ///
    /// # Panics
    /// Panics when `row` is out of range.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        let base = triangle_size(row);
        &self.matrix[base..base + row]
    }

    /// Yields `(j, value)` for every row `j` in `y + 1..end`, reading the
    /// entries of column `y` straight from the packed storage.
    pub fn column(&self, y: usize, end: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        (y + 1..end.min(self.size)).map(move |j| (j, self.matrix[triangle_size(j) + y]))
    }

    /// Returns the cluster id currently held by `row`, or `None` once the row
    /// has been absorbed.
    #[must_use]
    pub fn cluster_id(&self, row: usize) -> Option<usize> {
        self.clustermap.get(row).copied().flatten()
    }

    /// Returns `true` while `row` still represents a cluster.
    #[must_use]
    pub fn is_active(&self, row: usize) -> bool {
        self.cluster_id(row).is_some()
    }

    /// Returns the first active row in `from..end`.
    #[must_use]
    pub fn first_active(&self, from: usize, end: usize) -> Option<usize> {
        (from..end.min(self.size)).find(|&row| self.is_active(row))
    }

    /// Lowers `end` past trailing inactive rows after row `x` was absorbed.
    ///
    /// Nothing changes unless `x` was the last row below `end`.
    #[must_use]
    pub fn shrink_active_set(&self, end: usize, x: usize) -> usize {
        let mut end = end;
        if x + 1 == end {
            while end > 0 && !self.is_active(end - 1) {
                end -= 1;
            }
        }
        end
    }

    /// Merges row `x` into row `y` (`x > y`) at internal value `value`.
    ///
    /// Records the merge in `builder`, re-points row `y` at the new cluster,
    /// deactivates row `x`, and recomputes the distance from the merged
    /// cluster to every other active row below `end`. Each recomputed entry
    /// is reported to `on_update` as `(row, value)`.
    ///
    /// # Errors
    /// Returns [`HacError::InvariantViolation`] when either row is inactive
    /// or when the builder rejects the merge.
    pub(crate) fn merge_rows(
        &mut self,
        (x, y): (usize, usize),
        value: f64,
        end: usize,
        linkage: &dyn Linkage,
        builder: &mut ClusterMergeHistoryBuilder,
        mut on_update: impl FnMut(usize, f64),
    ) -> Result<usize> {
        let (Some(xx), Some(yy)) = (self.cluster_id(x), self.cluster_id(y)) else {
            return Err(HacError::invariant(
                "merge of an absorbed row",
                x,
                y,
                builder.merge_count(),
            ));
        };
        if x <= y {
            return Err(HacError::invariant(
                "absorbed row must follow survivor",
                x,
                y,
                builder.merge_count(),
            ));
        }
        let size_x = builder.size_of(xx);
        let size_y = builder.size_of(yy);
        let height = linkage.restore(value, builder.is_squared());
        let merged = builder.strict_add(xx, height, yy)?;
        trace!(merged, source = xx, target = yy, height, "recorded merge");
        #[cfg(feature = "metrics")]
        metrics::counter!("hac_merges_total").increment(1);

        self.clustermap[y] = Some(merged);
        self.clustermap[x] = None;

        let xbase = triangle_size(x);
        let ybase = triangle_size(y);
        let mut update = |matrix: &mut [f64], j: usize, xslot: usize, yslot: usize, size_j: usize| {
            let combined =
                linkage.combine(size_x, matrix[xslot], size_y, matrix[yslot], size_j, value);
            matrix[yslot] = combined;
            on_update(j, combined);
        };
        for j in 0..end {
            if j == x || j == y {
                continue;
            }
            let Some(jj) = self.clustermap[j] else {
                continue;
            };
            let size_j = builder.size_of(jj);
            if j < y {
                update(&mut self.matrix, j, xbase + j, ybase + j, size_j);
            } else if j < x {
                update(&mut self.matrix, j, xbase + j, triangle_size(j) + y, size_j);
            } else {
                let jbase = triangle_size(j);
                update(&mut self.matrix, j, jbase + x, jbase + y, size_j);
            }
        }
        Ok(merged)
    }
}

fn seed(linkage: &dyn Linkage, distance: f64, squared: bool, x: usize, y: usize) -> Result<f64> {
    if !distance.is_finite() {
        return Err(HacError::NonFiniteDistance { left: x, right: y });
    }
    Ok(linkage.initial(distance, squared))
}
