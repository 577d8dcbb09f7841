//! Tests for the `Hac` orchestration API.

mod common;

use std::sync::Arc;

use agglo_core::{
    Algorithm, DataSource, DataSourceErrorCode, HacBuilder, HacError, HacErrorCode, LinkageKind,
    MAX_MATRIX_SIZE, PrecomputedDistances,
};
use agglo_test_support::tracing::RecordingLayer;
use common::{Points, Ragged, Truncated, tree_problem};
use rstest::{fixture, rstest};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

#[fixture]
fn two_pairs() -> Points {
    Points::new(vec![[0.0, 0.0], [0.0, 1.0], [5.0, 5.0], [5.0, 6.0]])
}

#[rstest]
fn builder_defaults() {
    let builder = HacBuilder::new();
    assert_eq!(builder.linkage(), LinkageKind::GroupAverage);
    assert_eq!(builder.algorithm(), Algorithm::NnChain);
    assert!(builder.optimize_order());

    let hac = builder.clone().build();
    assert_eq!(hac.linkage(), LinkageKind::GroupAverage);
    assert_eq!(hac.algorithm(), Algorithm::NnChain);
    assert!(hac.optimize_order());
}

#[rstest]
#[case::single(LinkageKind::Single, 41.0_f64.sqrt())]
#[case::centroid(LinkageKind::Centroid, 50.0_f64.sqrt())]
fn two_pairs_merge_before_joining(
    two_pairs: Points,
    #[values(Algorithm::Naive, Algorithm::Anderberg, Algorithm::NnChain)] algorithm: Algorithm,
    #[case] linkage: LinkageKind,
    #[case] final_height: f64,
) {
    let history = HacBuilder::new()
        .with_linkage(linkage)
        .with_algorithm(algorithm)
        .build()
        .run(&two_pairs)
        .expect("run must succeed");

    assert_eq!(tree_problem(&history), None);
    assert_eq!(history.merge_count(), 3);
    assert!((history.distance(0) - 1.0).abs() < 1e-12);
    assert!((history.distance(1) - 1.0).abs() < 1e-12);
    assert!((history.distance(2) - final_height).abs() < 1e-9);
    assert_eq!(history.size(2), 4);
    let final_merge = history.merge(2).expect("final merge");
    let mut children = [final_merge.left(), final_merge.right()];
    children.sort_unstable();
    assert_eq!(children, [4, 5]);
}

#[rstest]
fn ward_reports_euclidean_scale(two_pairs: Points) {
    let history = HacBuilder::new()
        .with_linkage(LinkageKind::Ward)
        .build()
        .run(&two_pairs)
        .expect("run must succeed");
    assert!((history.distance(0) - 1.0).abs() < 1e-12);
    // Two pairs whose centroids are sqrt(50) apart.
    assert!((history.distance(2) - 50.0_f64.sqrt() * 2.0_f64.sqrt()).abs() < 1e-9);
    assert!(!history.is_squared());
}

#[rstest]
fn squared_sources_stay_squared() {
    // Squared distances of the two-pairs layout.
    let values = vec![1.0, 50.0, 41.0, 61.0, 50.0, 1.0];
    let source = PrecomputedDistances::new("squared", 4, values)
        .expect("valid length")
        .with_squared(true);
    let history = HacBuilder::new()
        .with_linkage(LinkageKind::Centroid)
        .build()
        .run(&source)
        .expect("run must succeed");
    assert!(history.is_squared());
    assert!((history.distance(2) - 50.0).abs() < 1e-9);
}

#[rstest]
fn run_records_tracing(two_pairs: Points) {
    let hac = HacBuilder::new()
        .with_linkage(LinkageKind::Complete)
        .with_algorithm(Algorithm::Anderberg)
        .build();
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    let history = tracing::subscriber::with_default(subscriber, || hac.run(&two_pairs))
        .expect("run must succeed");
    assert_eq!(history.merge_count(), 3);

    let run_span = layer.span("hac.run").expect("hac.run span must exist");
    assert_eq!(run_span.fields.get("data_source"), Some(&"points".to_owned()));
    assert_eq!(run_span.fields.get("items"), Some(&"4".to_owned()));
    assert_eq!(run_span.fields.get("linkage"), Some(&"complete".to_owned()));
    assert_eq!(run_span.fields.get("algorithm"), Some(&"anderberg".to_owned()));

    let fill_span = layer.span("hac.matrix.fill").expect("fill span must exist");
    assert_eq!(fill_span.fields.get("items"), Some(&"4".to_owned()));
    assert!(layer.span("hac.anderberg").is_some());

    assert_eq!(layer.count_messages("recorded merge"), 3);
    assert!(layer.has_event(Level::INFO, "agglomeration completed"));
    assert!(layer.events_at(Level::WARN).is_empty());
}

#[rstest]
fn run_logs_empty_source_warning() {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let hac = HacBuilder::new().build();

    let err = tracing::subscriber::with_default(subscriber, || hac.run(&Points::new(vec![])))
        .expect_err("empty sources must fail");
    assert_eq!(
        err,
        HacError::EmptySource {
            data_source: Arc::from("points")
        }
    );
    assert_eq!(err.code(), HacErrorCode::EmptySource);

    let run_span = layer.span("hac.run").expect("hac.run span must exist");
    assert_eq!(run_span.fields.get("items"), Some(&"0".to_owned()));
    assert!(layer.has_event(Level::WARN, "data source is empty, returning error"));
}

#[rstest]
fn single_object_yields_empty_history() {
    let history = HacBuilder::new()
        .build()
        .run(&Points::new(vec![[3.0, 4.0]]))
        .expect("run must succeed");
    assert_eq!(history.leaf_count(), 1);
    assert_eq!(history.merge_count(), 0);
    assert!(history.is_complete());
}

#[rstest]
#[case::just_over(MAX_MATRIX_SIZE + 1)]
#[case::far_over(1 << 20)]
fn oversized_sources_fail_before_reading(#[case] len: usize) {
    // Any distance call would fail, so reaching the capacity error proves no
    // distance was requested.
    let source = Truncated { len, readable: 0 };
    let err = HacBuilder::new()
        .build()
        .run(&source)
        .expect_err("capacity must be enforced");
    assert_eq!(
        err,
        HacError::Capacity {
            size: len,
            max: MAX_MATRIX_SIZE
        }
    );
}

#[rstest]
fn source_failures_are_wrapped() {
    let source = Truncated {
        len: 5,
        readable: 3,
    };
    let err = HacBuilder::new()
        .build()
        .run(&source)
        .expect_err("unreadable rows must fail");
    assert_eq!(err.code(), HacErrorCode::DataSourceFailure);
    assert_eq!(err.data_source_code(), Some(DataSourceErrorCode::OutOfBounds));
    assert!(err.to_string().starts_with("data source `truncated` failed"));
}

#[rstest]
fn dimension_mismatches_keep_their_code() {
    let source = Ragged(vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0]]);
    let err = HacBuilder::new()
        .with_algorithm(Algorithm::Naive)
        .build()
        .run(&source)
        .expect_err("mixed dimensions must fail");
    assert_eq!(
        err.data_source_code(),
        Some(DataSourceErrorCode::DimensionMismatch)
    );
}

#[rstest]
fn non_finite_distances_are_rejected() {
    let source = PrecomputedDistances::new("nan", 3, vec![1.0, f64::NAN, 2.0])
        .expect("valid length");
    let err = HacBuilder::new()
        .build()
        .run(&source)
        .expect_err("NaN must be rejected");
    assert_eq!(err, HacError::NonFiniteDistance { left: 2, right: 0 });
}

#[rstest]
fn chain_with_centroid_is_best_effort(two_pairs: Points) {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let hac = HacBuilder::new()
        .with_linkage(LinkageKind::Median)
        .with_algorithm(Algorithm::NnChain)
        .build();

    let history = tracing::subscriber::with_default(subscriber, || hac.run(&two_pairs))
        .expect("best-effort runs still succeed");
    assert_eq!(tree_problem(&history), None);
    let warnings = layer.events_at(Level::WARN);
    assert!(!warnings.is_empty());
    assert!(warnings.iter().all(|event| event.field("linkage") == Some("median")));
}

#[rstest]
fn precomputed_and_condensed_runs_agree(two_pairs: Points) {
    let mut values = Vec::new();
    for x in 1..two_pairs.len() {
        for y in 0..x {
            values.push(two_pairs.distance(x, y).expect("in range"));
        }
    }
    let hac = HacBuilder::new().with_linkage(LinkageKind::Ward).build();
    let from_source = hac.run(&two_pairs).expect("run must succeed");
    let from_values = hac
        .run_condensed(values, two_pairs.len(), false)
        .expect("run must succeed");
    assert_eq!(from_source, from_values);
}
