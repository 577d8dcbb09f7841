//! Parent-pointer arena used to resolve arbitrary member ids to the cluster
//! that currently contains them.
//!
//! Slots cover the full id space: `0..n` for the original objects and
//! `n..2n-1` for merge results. A slot without a parent is the current root of
//! its cluster. Resolution does not compress paths beyond redirecting the
//! visited nodes straight to the merge that is about to absorb them.

#[derive(Clone, Debug)]
pub(super) struct MergeForest {
    parent: Vec<Option<usize>>,
}

impl MergeForest {
    pub(super) fn new(slots: usize) -> Self {
        Self {
            parent: vec![None; slots],
        }
    }

    /// Records that `child` was absorbed into `merged`.
    pub(super) fn link(&mut self, child: usize, merged: usize) {
        self.parent[child] = Some(merged);
    }

    /// Returns the root currently containing `node` without modifying the arena.
    pub(super) fn find(&self, node: usize) -> usize {
        let mut root = node;
        while let Some(next) = self.parent[root] {
            root = next;
        }
        root
    }

    /// Points every node on the path from `node` to its root at `merged` and
    /// returns the root.
    pub(super) fn redirect(&mut self, mut node: usize, merged: usize) -> usize {
        while let Some(next) = self.parent[node] {
            self.parent[node] = Some(merged);
            node = next;
        }
        node
    }
}
