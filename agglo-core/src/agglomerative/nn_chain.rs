//! Reciprocal nearest-neighbour chain.
//!
//! The chain is a stack of rows in which every entry is the nearest neighbour
//! of the one below it. It grows until its top two rows are each other's
//! nearest neighbours, merges them, and resumes from what is left, so no
//! global minimum is ever computed. Merges are therefore found out of height
//! order. For reducible linkages they equal those of the exhaustive scan up
//! to ties and are sorted by height once the chain is exhausted; for other
//! linkages the chain may lose its invariant, which is reported once per run.

use tracing::{debug, instrument, warn};

use crate::{
    error::{HacError, Result},
    history::ClusterMergeHistoryBuilder,
    linkage::Linkage,
    matrix::ClusterDistanceMatrix,
};

#[derive(Debug, Default)]
struct Chain {
    rows: Vec<usize>,
    warned: bool,
}

impl Chain {
    /// Picks the pair `(a, b)` to grow from. `a` is the chain top, `b` a
    /// candidate neighbour to compare against.
    fn resume(
        &mut self,
        matrix: &ClusterDistanceMatrix,
        end: usize,
        linkage: &dyn Linkage,
    ) -> Option<(usize, usize)> {
        if self.rows.len() >= 2 {
            let survivor = self.rows.pop()?;
            let top = *self.rows.last()?;
            if top != survivor && matrix.is_active(top) {
                return Some((top, survivor));
            }
            self.report_irreducible(linkage);
        }
        let a = matrix.first_active(0, end)?;
        let b = matrix.first_active(a + 1, end)?;
        self.rows.clear();
        self.rows.push(a);
        Some((a, b))
    }

    fn report_irreducible(&mut self, linkage: &dyn Linkage) {
        #[cfg(feature = "metrics")]
        metrics::counter!("hac_irreducible_chain_total").increment(1);
        if !self.warned {
            self.warned = true;
            warn!(
                linkage = linkage.name(),
                "nearest-neighbour chain lost a member; linkage is not reducible, results are best effort"
            );
        }
    }

    /// Grows the chain from `(a, b)` until its top two rows are reciprocal
    /// nearest neighbours and returns them.
    fn grow(
        &mut self,
        matrix: &ClusterDistanceMatrix,
        end: usize,
        (mut a, mut b): (usize, usize),
    ) -> (usize, usize) {
        loop {
            let mut next = b;
            let mut min = matrix.get(a, b);
            let below = matrix.row(a).iter().copied().enumerate();
            for (row, value) in below.chain(matrix.column(a, end)) {
                if row == b || !matrix.is_active(row) {
                    continue;
                }
                if value < min {
                    min = value;
                    next = row;
                }
            }
            self.rows.push(next);
            b = a;
            a = next;
            let len = self.rows.len();
            if len >= 3 && self.rows[len - 3] == a {
                return (a, b);
            }
        }
    }
}

/// Builds the hierarchy by following nearest-neighbour chains.
///
/// # Errors
/// Returns [`HacError::InvariantViolation`] if the bookkeeping rejects a
/// merge or fewer than two active rows remain before `n - 1` merges were
/// made.
#[instrument(
    name = "hac.nn_chain",
    skip_all,
    fields(size = matrix.size(), linkage = linkage.name()),
)]
pub fn run_nn_chain(
    matrix: &mut ClusterDistanceMatrix,
    linkage: &dyn Linkage,
    builder: &mut ClusterMergeHistoryBuilder,
) -> Result<()> {
    let mut chain = Chain {
        rows: Vec::with_capacity(matrix.size()),
        warned: false,
    };
    let mut end = matrix.size();
    for _ in 1..matrix.size() {
        let seed = chain.resume(matrix, end, linkage).ok_or_else(|| {
            HacError::invariant("fewer than two active rows", end, end, builder.merge_count())
        })?;
        let (a, b) = chain.grow(matrix, end, seed);
        let (x, y) = if a > b { (a, b) } else { (b, a) };
        let value = matrix.get(x, y);
        matrix.merge_rows((x, y), value, end, linkage, builder, |_, _| {})?;
        end = matrix.shrink_active_set(end, x);
        let len = chain.rows.len();
        chain.rows.truncate(len - 3);
        chain.rows.push(y);
    }
    if linkage.is_reducible() && builder.sort_by_height().is_some() {
        debug!("sorted chain merges by height");
    }
    Ok(())
}
