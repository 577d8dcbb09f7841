//! Builder utilities for configuring [`Hac`] runs.
//!
//! Exposes linkage and algorithm selection plus the optional order repair
//! applied to finished histories.

use crate::{agglomerative::Algorithm, hac::Hac, linkage::LinkageKind};

/// Configures and constructs [`Hac`] instances.
///
/// # Examples
/// ```
/// use agglo_core::{Algorithm, HacBuilder, LinkageKind};
///
/// let hac = HacBuilder::new()
///     .with_linkage(LinkageKind::Ward)
///     .with_algorithm(Algorithm::Anderberg)
///     .build();
/// assert_eq!(hac.linkage(), LinkageKind::Ward);
/// assert_eq!(hac.algorithm(), Algorithm::Anderberg);
/// assert!(hac.optimize_order());
/// ```
#[derive(Debug, Clone)]
pub struct HacBuilder {
    linkage: LinkageKind,
    algorithm: Algorithm,
    optimize_order: bool,
}

impl Default for HacBuilder {
    fn default() -> Self {
        Self {
            linkage: LinkageKind::GroupAverage,
            algorithm: Algorithm::NnChain,
            optimize_order: true,
        }
    }
}

impl HacBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use agglo_core::{Algorithm, HacBuilder, LinkageKind};
    ///
    /// let builder = HacBuilder::new();
    /// assert_eq!(builder.linkage(), LinkageKind::GroupAverage);
    /// assert_eq!(builder.algorithm(), Algorithm::NnChain);
    /// assert!(builder.optimize_order());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the linkage strategy.
    #[must_use]
    pub fn with_linkage(mut self, linkage: LinkageKind) -> Self {
        self.linkage = linkage;
        self
    }

    /// Returns the configured linkage strategy.
    #[must_use]
    pub fn linkage(&self) -> LinkageKind {
        self.linkage
    }

    /// Selects the agglomeration algorithm.
    ///
    /// [`Algorithm::NnChain`] may be paired with centroid or median linkage;
    /// such runs are best effort and say so in the logs.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Returns the configured agglomeration algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Enables or disables the order repair applied after agglomeration.
    ///
    /// # Examples
    /// ```
    /// use agglo_core::HacBuilder;
    ///
    /// let builder = HacBuilder::new().with_optimize_order(false);
    /// assert!(!builder.optimize_order());
    /// ```
    #[must_use]
    pub fn with_optimize_order(mut self, enabled: bool) -> Self {
        self.optimize_order = enabled;
        self
    }

    /// Returns whether the order repair is enabled.
    #[must_use]
    pub fn optimize_order(&self) -> bool {
        self.optimize_order
    }

    /// Constructs the configured [`Hac`] instance.
    ///
    /// Every combination of settings is valid, so building cannot fail.
    #[must_use]
    pub fn build(self) -> Hac {
        Hac::new(self.linkage, self.algorithm, self.optimize_order)
    }
}
