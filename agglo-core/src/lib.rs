//! Hierarchical agglomerative clustering over a packed distance matrix.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod agglomerative;
mod builder;
mod datasource;
mod error;
mod hac;
mod history;
mod linkage;
mod matrix;

#[cfg(test)]
mod test_utils;

pub use crate::{
    agglomerative::{
        Algorithm, UnknownAlgorithm, best_in_row, run_anderberg, run_naive, run_nn_chain,
    },
    builder::HacBuilder,
    datasource::{DataSource, PrecomputedDistances},
    error::{DataSourceError, DataSourceErrorCode, HacError, HacErrorCode, Result},
    hac::Hac,
    history::{ClusterMergeHistoryBuilder, Merge, MergeHistory},
    linkage::{
        CentroidLinkage, CompleteLinkage, GroupAverageLinkage, Linkage, LinkageKind,
        MedianLinkage, SingleLinkage, UnknownLinkage, WardLinkage, WeightedAverageLinkage,
    },
    matrix::{ClusterDistanceMatrix, MAX_MATRIX_SIZE, ensure_capacity, triangle_size},
};
