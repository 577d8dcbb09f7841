//! Run orchestration for hierarchical agglomerative clustering.
//!
//! Provides the [`Hac`] entry point which fills the distance matrix, drives the
//! selected algorithm, and hands back a finished [`MergeHistory`].

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    Result,
    agglomerative::Algorithm,
    datasource::DataSource,
    error::HacError,
    history::{ClusterMergeHistoryBuilder, MergeHistory},
    linkage::LinkageKind,
    matrix::{ClusterDistanceMatrix, ensure_capacity},
};

const CONDENSED_SOURCE: &str = "condensed";

/// Entry point for running an agglomeration.
///
/// # Examples
/// ```
/// use agglo_core::{DataSource, DataSourceError, HacBuilder, LinkageKind};
///
/// struct Line(Vec<f64>);
///
/// impl DataSource for Line {
///     fn len(&self) -> usize { self.0.len() }
///     fn name(&self) -> &str { "line" }
///     fn distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
///         let a = self.0.get(i).ok_or(DataSourceError::OutOfBounds { index: i })?;
///         let b = self.0.get(j).ok_or(DataSourceError::OutOfBounds { index: j })?;
///         Ok((a - b).abs())
///     }
/// }
///
/// let hac = HacBuilder::new().with_linkage(LinkageKind::Single).build();
/// let history = hac.run(&Line(vec![0.0, 1.0, 3.0, 7.0]))?;
/// assert_eq!(history.distances(), &[1.0, 2.0, 4.0]);
/// assert_eq!(history.root(), Some(6));
/// # Ok::<(), agglo_core::HacError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Hac {
    linkage: LinkageKind,
    algorithm: Algorithm,
    optimize_order: bool,
}

impl Hac {
    pub(crate) fn new(linkage: LinkageKind, algorithm: Algorithm, optimize_order: bool) -> Self {
        Self {
            linkage,
            algorithm,
            optimize_order,
        }
    }

    /// Returns the linkage strategy used by this instance.
    #[must_use]
    pub fn linkage(&self) -> LinkageKind {
        self.linkage
    }

    /// Returns the agglomeration algorithm used by this instance.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns whether finished histories are reordered.
    #[must_use]
    pub fn optimize_order(&self) -> bool {
        self.optimize_order
    }

    /// Clusters every item of `source`.
    ///
    /// # Errors
    /// Returns [`HacError::EmptySource`] when the source is empty,
    /// [`HacError::Capacity`] when it holds more than
    /// [`crate::MAX_MATRIX_SIZE`] items, [`HacError::DataSource`] or
    /// [`HacError::NonFiniteDistance`] when a distance cannot be used, and
    /// [`HacError::InvariantViolation`] if the merge bookkeeping breaks.
    #[instrument(
        name = "hac.run",
        err,
        skip(self, source),
        fields(
            data_source = %source.name(),
            items = source.len(),
            linkage = %self.linkage,
            algorithm = %self.algorithm,
        ),
    )]
    pub fn run<D: DataSource + ?Sized>(&self, source: &D) -> Result<MergeHistory> {
        let items = source.len();
        if items == 0 {
            warn!(
                data_source = source.name(),
                "data source is empty, returning error"
            );
            return Err(HacError::EmptySource {
                data_source: Arc::from(source.name()),
            });
        }
        ensure_capacity(items)?;
        self.announce();
        let matrix = ClusterDistanceMatrix::from_source(source, self.linkage.linkage())?;
        self.agglomerate(matrix, source.is_squared())
    }

    /// Clusters `size` objects given as a condensed lower-triangular array
    /// of raw distances (see [`crate::ClusterDistanceMatrix`] for the
    /// packing).
    ///
    /// # Errors
    /// As [`Hac::run`], plus [`HacError::CondensedLength`] when `values`
    /// does not match `size`.
    ///
    /// # Examples
    /// ```
    /// use agglo_core::{HacBuilder, LinkageKind};
    ///
    /// let hac = HacBuilder::new().with_linkage(LinkageKind::Complete).build();
    /// // d(1,0) = 1, d(2,0) = 4, d(2,1) = 3
    /// let history = hac.run_condensed(vec![1.0, 4.0, 3.0], 3, false)?;
    /// assert_eq!(history.distances(), &[1.0, 4.0]);
    /// # Ok::<(), agglo_core::HacError>(())
    /// ```
    #[instrument(
        name = "hac.run",
        err,
        skip(self, values),
        fields(
            data_source = CONDENSED_SOURCE,
            items = size,
            linkage = %self.linkage,
            algorithm = %self.algorithm,
        ),
    )]
    pub fn run_condensed(
        &self,
        values: Vec<f64>,
        size: usize,
        squared: bool,
    ) -> Result<MergeHistory> {
        if size == 0 {
            warn!(
                data_source = CONDENSED_SOURCE,
                "data source is empty, returning error"
            );
            return Err(HacError::EmptySource {
                data_source: Arc::from(CONDENSED_SOURCE),
            });
        }
        ensure_capacity(size)?;
        self.announce();
        let matrix =
            ClusterDistanceMatrix::from_condensed(values, size, self.linkage.linkage(), squared)?;
        self.agglomerate(matrix, squared)
    }

    fn announce(&self) {
        let linkage = self.linkage.linkage();
        if linkage.is_single_linkage() {
            debug!("single linkage runs in quadratic memory here; SLINK needs only linear memory");
        }
        if self.algorithm == Algorithm::NnChain && !linkage.is_reducible() {
            warn!(
                linkage = linkage.name(),
                "linkage is not reducible; nearest-neighbour chain results are best effort"
            );
        }
    }

    fn agglomerate(
        &self,
        mut matrix: ClusterDistanceMatrix,
        squared: bool,
    ) -> Result<MergeHistory> {
        let linkage = self.linkage.linkage();
        let mut builder = ClusterMergeHistoryBuilder::new(matrix.size(), squared);
        self.algorithm.agglomerate(&mut matrix, linkage, &mut builder)?;
        if self.optimize_order && builder.optimize_order().is_some() {
            debug!("reordered merge history");
        }
        let history = builder.complete();
        info!(merges = history.merge_count(), "agglomeration completed");
        Ok(history)
    }
}
