//! Merge histories (dendrograms) and the builder that records them.
//!
//! Cluster ids follow one numbering scheme throughout the crate: `0..n` are
//! the original objects and `n + k` is the cluster created by the `k`-th
//! merge. A finished history therefore describes a binary tree whose internal
//! nodes are addressed by merge index alone, which keeps reordering a plain
//! permutation of columnar arrays.

mod builder;
mod union_find;

pub use self::builder::ClusterMergeHistoryBuilder;

/// A single recorded merge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Merge {
    id: usize,
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

impl Merge {
    /// Returns the cluster id created by this merge.
    #[must_use]
    #[rustfmt::skip]
    pub fn id(&self) -> usize { self.id }

    /// Returns the cluster absorbed by this merge.
    #[must_use]
    #[rustfmt::skip]
    pub fn left(&self) -> usize { self.left }

    /// Returns the cluster that absorbed `left`.
    #[must_use]
    #[rustfmt::skip]
    pub fn right(&self) -> usize { self.right }

    /// Returns the linkage height of the merge.
    #[must_use]
    #[rustfmt::skip]
    pub fn distance(&self) -> f64 { self.distance }

    /// Returns the number of objects in the merged cluster.
    #[must_use]
    #[rustfmt::skip]
    pub fn size(&self) -> usize { self.size }
}

/// An immutable, finished merge history.
///
/// # Examples
/// ```
/// use agglo_core::ClusterMergeHistoryBuilder;
///
/// let mut builder = ClusterMergeHistoryBuilder::new(3, false);
/// let pair = builder.strict_add(1, 0.5, 0)?;
/// builder.strict_add(2, 2.0, pair)?;
/// let history = builder.complete();
///
/// assert!(history.is_complete());
/// assert_eq!(history.root(), Some(4));
/// assert_eq!(history.size(1), 3);
/// assert!(history.is_monotone());
/// # Ok::<(), agglo_core::HacError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MergeHistory {
    leaf_count: usize,
    merges: Vec<usize>,
    distances: Vec<f64>,
    sizes: Vec<usize>,
    prototypes: Option<Vec<usize>>,
    squared: bool,
}

impl MergeHistory {
    pub(crate) fn new(
        leaf_count: usize,
        merges: Vec<usize>,
        distances: Vec<f64>,
        sizes: Vec<usize>,
        prototypes: Option<Vec<usize>>,
        squared: bool,
    ) -> Self {
        debug_assert_eq!(merges.len(), distances.len() * 2);
        debug_assert_eq!(sizes.len(), distances.len());
        Self {
            leaf_count,
            merges,
            distances,
            sizes,
            prototypes,
            squared,
        }
    }

    /// Returns the number of original objects.
    #[must_use]
    #[rustfmt::skip]
    pub fn leaf_count(&self) -> usize { self.leaf_count }

    /// Returns the number of recorded merges.
    #[must_use]
    pub fn merge_count(&self) -> usize {
        self.distances.len()
    }

    /// Returns `true` when the history joins every object into one cluster.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.merge_count() + 1 == self.leaf_count
    }

    /// Returns the id of the final cluster, if the history is complete and
    /// contains at least one merge.
    #[must_use]
    pub fn root(&self) -> Option<usize> {
        if self.is_complete() && self.merge_count() > 0 {
            Some(self.leaf_count + self.merge_count() - 1)
        } else {
            None
        }
    }

    /// Returns the absorbed cluster of merge `index`.
    ///
    /// # Panics
    /// Panics when `index >= merge_count()`.
    #[must_use]
    pub fn left(&self, index: usize) -> usize {
        self.merges[index << 1]
    }

    /// Returns the absorbing cluster of merge `index`.
    ///
    /// # Panics
    /// Panics when `index >= merge_count()`.
    #[must_use]
    pub fn right(&self, index: usize) -> usize {
        self.merges[(index << 1) + 1]
    }

    /// Returns the height of merge `index`.
    ///
    /// # Panics
    /// Panics when `index >= merge_count()`.
    #[must_use]
    pub fn distance(&self, index: usize) -> f64 {
        self.distances[index]
    }

    /// Returns the size of the cluster created by merge `index`.
    ///
    /// # Panics
    /// Panics when `index >= merge_count()`.
    #[must_use]
    pub fn size(&self, index: usize) -> usize {
        self.sizes[index]
    }

    /// Returns the size of any cluster id, leaves included.
    #[must_use]
    pub fn cluster_size(&self, id: usize) -> Option<usize> {
        if id < self.leaf_count {
            Some(1)
        } else {
            self.sizes.get(id - self.leaf_count).copied()
        }
    }

    /// Returns merge `index` as a [`Merge`] value.
    #[must_use]
    pub fn merge(&self, index: usize) -> Option<Merge> {
        (index < self.merge_count()).then(|| self.merge_at(index))
    }

    /// Iterates over the merges in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Merge> + '_ {
        (0..self.merge_count()).map(|index| self.merge_at(index))
    }

    fn merge_at(&self, index: usize) -> Merge {
        Merge {
            id: self.leaf_count + index,
            left: self.merges[index << 1],
            right: self.merges[(index << 1) + 1],
            distance: self.distances[index],
            size: self.sizes[index],
        }
    }

    /// Returns all merge heights in order.
    #[must_use]
    #[rustfmt::skip]
    pub fn distances(&self) -> &[f64] { &self.distances }

    /// Returns the height of the last merge.
    #[must_use]
    pub fn final_height(&self) -> Option<f64> {
        self.distances.last().copied()
    }

    /// Returns the representative object recorded per merge, when the history
    /// was built with a prototype channel.
    #[must_use]
    pub fn prototypes(&self) -> Option<&[usize]> {
        self.prototypes.as_deref()
    }

    /// Returns whether heights were reported on the squared scale.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_squared(&self) -> bool { self.squared }

    /// Returns `true` when merge heights never decrease.
    #[must_use]
    pub fn is_monotone(&self) -> bool {
        is_non_decreasing(&self.distances)
    }
}

pub(crate) fn is_non_decreasing(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] <= pair[1])
}
