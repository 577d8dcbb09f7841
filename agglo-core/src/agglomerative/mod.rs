//! Agglomeration strategies over a [`ClusterDistanceMatrix`].
//!
//! Every strategy performs `n - 1` merges, feeding each one into a
//! [`ClusterMergeHistoryBuilder`] through the shared
//! [`ClusterDistanceMatrix`] merge step, so they differ only in how they pick
//! the next pair.

mod anderberg;
mod naive;
mod nn_chain;

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::{
    error::Result, history::ClusterMergeHistoryBuilder, linkage::Linkage,
    matrix::ClusterDistanceMatrix,
};

pub use self::{
    anderberg::{best_in_row, run_anderberg},
    naive::run_naive,
    nn_chain::run_nn_chain,
};

/// Selects the pair-finding strategy.
///
/// # Examples
/// ```
/// use agglo_core::Algorithm;
///
/// assert_eq!(Algorithm::default(), Algorithm::NnChain);
/// assert_eq!("agnes".parse::<Algorithm>()?, Algorithm::Naive);
/// assert_eq!(Algorithm::Anderberg.to_string(), "anderberg");
/// # Ok::<(), agglo_core::UnknownAlgorithm>(())
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Full scan of all active pairs per merge.
    Naive,
    /// Nearest-neighbour cache per row.
    Anderberg,
    /// Reciprocal nearest-neighbour chain.
    #[default]
    NnChain,
}

impl Algorithm {
    /// Every available strategy.
    pub const ALL: [Self; 3] = [Self::Naive, Self::Anderberg, Self::NnChain];

    /// Short identifier used in logs and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Anderberg => "anderberg",
            Self::NnChain => "nn-chain",
        }
    }

    /// Runs the strategy to completion, recording merges in `builder`.
    ///
    /// # Errors
    /// Propagates [`crate::HacError::InvariantViolation`] from the merge
    /// bookkeeping.
    pub fn agglomerate(
        self,
        matrix: &mut ClusterDistanceMatrix,
        linkage: &dyn Linkage,
        builder: &mut ClusterMergeHistoryBuilder,
    ) -> Result<()> {
        match self {
            Self::Naive => run_naive(matrix, linkage, builder),
            Self::Anderberg => run_anderberg(matrix, linkage, builder),
            Self::NnChain => run_nn_chain(matrix, linkage, builder),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unknown algorithm name.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown algorithm `{0}`")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(raw: &str) -> core::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "naive" | "agnes" => Ok(Self::Naive),
            "anderberg" => Ok(Self::Anderberg),
            "nn-chain" | "nnchain" | "nn_chain" => Ok(Self::NnChain),
            other => Err(UnknownAlgorithm(other.to_owned())),
        }
    }
}
