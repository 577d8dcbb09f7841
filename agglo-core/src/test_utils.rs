//! Shared test utilities for `agglo-core`.

use agglo_test_support::property_profile::ProptestRunProfile;
use proptest::test_runner::Config as ProptestConfig;

use crate::{
    Algorithm,
    history::{ClusterMergeHistoryBuilder, MergeHistory},
    linkage::Linkage,
    matrix::{ClusterDistanceMatrix, triangle_size},
};

/// Builds the proptest configuration from `PROPTEST_CASES` and
/// `AGGLO_PBT_FORK`.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

/// Condensed Euclidean distances between `points`.
#[must_use]
pub(crate) fn condensed_euclidean(points: &[[f64; 2]]) -> Vec<f64> {
    let mut values = Vec::with_capacity(triangle_size(points.len()));
    for x in 1..points.len() {
        for y in 0..x {
            let dx = points[x][0] - points[y][0];
            let dy = points[x][1] - points[y][1];
            values.push(dx.hypot(dy));
        }
    }
    values
}

/// Runs `algorithm` over a condensed matrix without reordering.
pub(crate) fn agglomerate_condensed(
    algorithm: Algorithm,
    values: &[f64],
    size: usize,
    linkage: &dyn Linkage,
) -> MergeHistory {
    let mut matrix = ClusterDistanceMatrix::from_condensed(values.to_vec(), size, linkage, false)
        .expect("condensed matrix must be valid");
    let mut builder = ClusterMergeHistoryBuilder::new(size, false);
    algorithm
        .agglomerate(&mut matrix, linkage, &mut builder)
        .expect("agglomeration must succeed");
    builder.complete()
}

/// Merge heights in ascending order.
#[must_use]
pub(crate) fn sorted_heights(history: &MergeHistory) -> Vec<f64> {
    let mut heights = history.distances().to_vec();
    heights.sort_by(f64::total_cmp);
    heights
}
