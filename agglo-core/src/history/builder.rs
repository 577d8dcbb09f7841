//! Incremental construction of merge histories.
//!
//! The builder keeps the merge log as parallel, append-only columns sized for
//! `n - 1` merges. Agglomeration algorithms that track canonical cluster ids
//! themselves call [`ClusterMergeHistoryBuilder::strict_add`]; collaborators
//! that only know some member of each cluster use
//! [`ClusterMergeHistoryBuilder::add`], which resolves members through a
//! lazily allocated parent arena.

use tracing::{instrument, warn};

use crate::error::{HacError, Result};

use super::{MergeHistory, is_non_decreasing, union_find::MergeForest};

/// Records merges as they happen and finalises them into a [`MergeHistory`].
///
/// # Examples
/// ```
/// use agglo_core::ClusterMergeHistoryBuilder;
///
/// let mut builder = ClusterMergeHistoryBuilder::new(4, false);
/// builder.add(0, 1.0, 1)?; // creates cluster 4
/// builder.add(3, 1.0, 2)?; // creates cluster 5
/// // Any member resolves to its current cluster.
/// let root = builder.add(1, 7.0, 2)?;
/// assert_eq!(root, 6);
///
/// let history = builder.complete();
/// assert_eq!(history.size(2), 4);
/// # Ok::<(), agglo_core::HacError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ClusterMergeHistoryBuilder {
    leaf_count: usize,
    merges: Vec<usize>,
    merge_distance: Vec<f64>,
    cluster_size: Vec<usize>,
    prototypes: Option<Vec<usize>>,
    merged: Vec<bool>,
    forest: Option<MergeForest>,
    squared: bool,
}

impl ClusterMergeHistoryBuilder {
    /// Creates a builder for `leaf_count` objects.
    ///
    /// `squared` records whether heights are reported on the squared scale.
    #[must_use]
    pub fn new(leaf_count: usize, squared: bool) -> Self {
        let capacity = leaf_count.saturating_sub(1);
        Self {
            leaf_count,
            merges: Vec::with_capacity(capacity << 1),
            merge_distance: Vec::with_capacity(capacity),
            cluster_size: Vec::with_capacity(capacity),
            prototypes: None,
            merged: vec![false; id_space(leaf_count)],
            forest: None,
            squared,
        }
    }

    /// Creates a builder that additionally records one representative object
    /// per merge.
    #[must_use]
    pub fn with_prototypes(leaf_count: usize, squared: bool) -> Self {
        let mut builder = Self::new(leaf_count, squared);
        builder.prototypes = Some(Vec::with_capacity(leaf_count.saturating_sub(1)));
        builder
    }

    /// Returns the number of original objects.
    #[must_use]
    #[rustfmt::skip]
    pub fn leaf_count(&self) -> usize { self.leaf_count }

    /// Returns the number of merges recorded so far.
    #[must_use]
    pub fn merge_count(&self) -> usize {
        self.merge_distance.len()
    }

    /// Returns whether heights are reported on the squared scale.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_squared(&self) -> bool { self.squared }

    /// Returns the number of objects in cluster `id`.
    ///
    /// # Panics
    /// Panics when `id` refers to a merge that has not been recorded yet.
    #[must_use]
    pub fn size_of(&self, id: usize) -> usize {
        if id < self.leaf_count {
            1
        } else {
            self.cluster_size[id - self.leaf_count]
        }
    }

    /// Returns `true` once `id` has participated in a merge.
    #[must_use]
    pub fn is_merged(&self, id: usize) -> bool {
        self.merged.get(id).copied().unwrap_or(false)
    }

    /// Records a merge of two canonical cluster ids and returns the id of the
    /// new cluster, `leaf_count + merge_count` before the call.
    ///
    /// `source` is absorbed into `target`. Both must exist and must not have
    /// taken part in an earlier merge.
    ///
    /// # Errors
    /// Returns [`HacError::InvariantViolation`] for self-merges, ids that do
    /// not exist yet, ids that were already merged, or when all `n - 1` merges
    /// have been recorded. Also fails on builders created with
    /// [`Self::with_prototypes`], which require
    /// [`Self::strict_add_with_prototype`].
    pub fn strict_add(&mut self, source: usize, distance: f64, target: usize) -> Result<usize> {
        self.record(source, distance, target, None)
    }

    /// Like [`Self::strict_add`], additionally recording `prototype` as the
    /// representative of the merged cluster.
    ///
    /// # Errors
    /// Fails like [`Self::strict_add`], and when the builder was created
    /// without a prototype channel.
    pub fn strict_add_with_prototype(
        &mut self,
        source: usize,
        distance: f64,
        target: usize,
        prototype: usize,
    ) -> Result<usize> {
        self.record(source, distance, target, Some(prototype))
    }

    /// Records a merge between the clusters currently containing `i` and `j`.
    ///
    /// Both ids may be any member ever seen, leaf or merge. They are resolved
    /// to their current roots; the larger root is absorbed into the smaller.
    ///
    /// # Errors
    /// Returns [`HacError::InvariantViolation`] when an id does not exist yet,
    /// when both ids already belong to the same cluster, or when the builder
    /// carries a prototype channel.
    pub fn add(&mut self, i: usize, distance: f64, j: usize) -> Result<usize> {
        let merge_count = self.merge_count();
        let pending = self.leaf_count + merge_count;
        if i >= pending || j >= pending {
            return Err(HacError::invariant(
                "cluster id out of range",
                i,
                j,
                merge_count,
            ));
        }
        if merge_count + 1 >= self.leaf_count {
            return Err(HacError::invariant(
                "merge count exceeds leaf_count - 1",
                i,
                j,
                merge_count,
            ));
        }
        if self.prototypes.is_some() {
            return Err(HacError::invariant("prototype required", i, j, merge_count));
        }
        let forest = self.forest_mut();
        let (root_i, root_j) = (forest.find(i), forest.find(j));
        if root_i == root_j {
            return Err(HacError::invariant("self-merge", i, j, merge_count));
        }
        forest.redirect(i, pending);
        forest.redirect(j, pending);
        let (source, target) = if root_i > root_j {
            (root_i, root_j)
        } else {
            (root_j, root_i)
        };
        self.strict_add(source, distance, target)
    }

    fn record(
        &mut self,
        source: usize,
        distance: f64,
        target: usize,
        prototype: Option<usize>,
    ) -> Result<usize> {
        let merge_count = self.merge_count();
        let id = self.leaf_count + merge_count;
        let violation = |invariant: &'static str| -> Result<usize> {
            Err(HacError::invariant(invariant, source, target, merge_count))
        };
        if source == target {
            return violation("self-merge");
        }
        if source >= id || target >= id {
            return violation("cluster id out of range");
        }
        if merge_count + 1 >= self.leaf_count {
            return violation("merge count exceeds leaf_count - 1");
        }
        if self.merged[source] || self.merged[target] {
            return violation("cluster merged twice");
        }
        match (&mut self.prototypes, prototype) {
            (Some(prototypes), Some(prototype)) => prototypes.push(prototype),
            (None, None) => {}
            (Some(_), None) => return violation("prototype required"),
            (None, Some(_)) => return violation("prototype channel disabled"),
        }

        let size = self.size_of(source) + self.size_of(target);
        self.merges.push(source);
        self.merges.push(target);
        self.merge_distance.push(distance);
        self.cluster_size.push(size);
        self.merged[source] = true;
        self.merged[target] = true;
        if let Some(forest) = self.forest.as_mut() {
            forest.link(source, id);
            forest.link(target, id);
        }
        Ok(id)
    }

    fn forest_mut(&mut self) -> &mut MergeForest {
        let Self {
            leaf_count,
            merges,
            forest,
            ..
        } = self;
        forest.get_or_insert_with(|| {
            let mut forest = MergeForest::new(id_space(*leaf_count));
            for (index, pair) in merges.chunks_exact(2).enumerate() {
                forest.link(pair[0], *leaf_count + index);
                forest.link(pair[1], *leaf_count + index);
            }
            forest
        })
    }

    /// Reorders the recorded merges so that every merge follows both of its
    /// constituents, for histories whose heights are not monotone.
    ///
    /// Returns `None` when the heights are already non-decreasing, or when the
    /// merges are already in `(size, height)` order from an earlier call.
    /// Otherwise the merges are sorted by subtree size, then height, then
    /// descending creation index, emitted in post-order, and every column is
    /// rewritten. The returned vector maps each old merge index to its new
    /// index so callers can remap auxiliary per-merge data.
    ///
    /// The parent arena used by [`Self::add`] is discarded; it is rebuilt on
    /// demand from the reordered log.
    #[instrument(
        name = "hac.optimize_order",
        skip(self),
        fields(merges = self.merge_count()),
    )]
    pub fn optimize_order(&mut self) -> Option<Vec<usize>> {
        if is_non_decreasing(&self.merge_distance) || self.is_size_ordered() {
            return None;
        }
        let mut order: Vec<usize> = (0..self.merge_count()).collect();
        order.sort_by(|&a, &b| {
            self.cluster_size[a]
                .cmp(&self.cluster_size[b])
                .then_with(|| self.merge_distance[a].total_cmp(&self.merge_distance[b]))
                .then_with(|| b.cmp(&a))
        });
        let permutation = self.apply_post_order(&order);

        #[cfg(feature = "metrics")]
        metrics::counter!("hac_order_repairs_total").increment(1);
        Some(permutation)
    }

    /// Reorders the recorded merges by height, keeping every merge after its
    /// constituents.
    ///
    /// Strategies that discover merges out of height order, such as the
    /// nearest-neighbour chain, use this to restore a monotone sequence for
    /// reducible linkages. Ties keep their creation order. Returns `None`
    /// when the heights are already non-decreasing, otherwise the old to new
    /// permutation as for [`Self::optimize_order`].
    pub fn sort_by_height(&mut self) -> Option<Vec<usize>> {
        if is_non_decreasing(&self.merge_distance) {
            return None;
        }
        let mut order: Vec<usize> = (0..self.merge_count()).collect();
        order.sort_by(|&a, &b| self.merge_distance[a].total_cmp(&self.merge_distance[b]));
        Some(self.apply_post_order(&order))
    }

    /// Emits merges following `order`, pulling in unvisited constituents
    /// first, rewrites every column, and returns the old to new permutation.
    fn apply_post_order(&mut self, order: &[usize]) -> Vec<usize> {
        let merge_count = self.merge_count();
        let mut visited = vec![false; merge_count];
        let mut emitted = Vec::with_capacity(merge_count);
        for &start in order {
            self.emit_post_order(start, &mut visited, &mut emitted);
        }

        let mut permutation = vec![0; merge_count];
        for (new_index, &old_index) in emitted.iter().enumerate() {
            permutation[old_index] = new_index;
        }
        self.apply_order(&emitted, &permutation);
        permutation
    }

    fn is_size_ordered(&self) -> bool {
        (1..self.merge_count()).all(|index| {
            let previous = (self.cluster_size[index - 1], self.merge_distance[index - 1]);
            let current = (self.cluster_size[index], self.merge_distance[index]);
            previous.0 < current.0 || (previous.0 == current.0 && previous.1 <= current.1)
        })
    }

    fn emit_post_order(&self, start: usize, visited: &mut [bool], emitted: &mut Vec<usize>) {
        let mut stack = vec![(start, false)];
        while let Some((merge, children_done)) = stack.pop() {
            if visited[merge] {
                continue;
            }
            if children_done {
                visited[merge] = true;
                emitted.push(merge);
                continue;
            }
            stack.push((merge, true));
            for child in [self.merges[merge << 1], self.merges[(merge << 1) + 1]] {
                if let Some(child_merge) = child.checked_sub(self.leaf_count)
                    && !visited[child_merge]
                {
                    stack.push((child_merge, false));
                }
            }
        }
    }

    fn apply_order(&mut self, emitted: &[usize], permutation: &[usize]) {
        let leaf_count = self.leaf_count;
        let remap = |id: usize| {
            if id < leaf_count {
                id
            } else {
                leaf_count + permutation[id - leaf_count]
            }
        };

        let mut merges = Vec::with_capacity(self.merges.len());
        for &old in emitted {
            merges.push(remap(self.merges[old << 1]));
            merges.push(remap(self.merges[(old << 1) + 1]));
        }
        self.merge_distance = emitted.iter().map(|&old| self.merge_distance[old]).collect();
        self.cluster_size = emitted.iter().map(|&old| self.cluster_size[old]).collect();
        if let Some(prototypes) = self.prototypes.as_mut() {
            *prototypes = emitted.iter().map(|&old| prototypes[old]).collect();
        }
        self.merges = merges;

        self.merged.fill(false);
        for &id in &self.merges {
            self.merged[id] = true;
        }
        self.forest = None;
    }

    /// Finalises the builder into an immutable [`MergeHistory`].
    ///
    /// A history with fewer than `n - 1` merges is still returned; the
    /// shortfall is logged as a warning.
    #[must_use]
    pub fn complete(self) -> MergeHistory {
        let expected = self.leaf_count.saturating_sub(1);
        if self.merge_count() != expected {
            warn!(
                merges = self.merge_count(),
                expected, "merge history is incomplete"
            );
        }
        MergeHistory::new(
            self.leaf_count,
            self.merges,
            self.merge_distance,
            self.cluster_size,
            self.prototypes,
            self.squared,
        )
    }
}

fn id_space(leaf_count: usize) -> usize {
    (leaf_count << 1).saturating_sub(1)
}
