//! Lance–Williams linkage strategies.
//!
//! A linkage tells the engine how to seed the distance matrix from raw
//! pairwise distances, how to update the distance from a freshly merged
//! cluster `A ∪ B` to an unaffected cluster `C`, and how to turn an internal
//! matrix value back into a reportable merge height. The engine never looks
//! behind this contract, so any recurrence of the Lance–Williams family can be
//! plugged in.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// The three-operation contract consumed by the agglomeration algorithms.
pub trait Linkage {
    /// Converts a raw pairwise distance into the value stored in the matrix.
    ///
    /// `squared` reports whether `distance` is already a squared distance.
    fn initial(&self, distance: f64, squared: bool) -> f64 {
        let _ = squared;
        distance
    }

    /// Computes the distance from `A ∪ B` to `C`.
    ///
    /// `d_ac` and `d_bc` are the previous matrix values between `A`/`C` and
    /// `B`/`C`; `d_ab` is the value at which `A` and `B` merged.
    fn combine(
        &self,
        size_a: usize,
        d_ac: f64,
        size_b: usize,
        d_bc: f64,
        size_c: usize,
        d_ab: f64,
    ) -> f64;

    /// Converts a matrix value back into a linkage height.
    fn restore(&self, value: f64, squared: bool) -> f64 {
        let _ = squared;
        value
    }

    /// Short lower-case identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether this is single linkage. Only used for diagnostics.
    fn is_single_linkage(&self) -> bool {
        false
    }

    /// Whether greedy nearest merges always yield non-decreasing heights.
    fn is_reducible(&self) -> bool {
        true
    }
}

// Cluster sizes are bounded by the matrix ceiling, so the cast is exact.
fn weight(size: usize) -> f64 {
    size as f64
}

/// Single linkage: minimum distance between members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SingleLinkage;

impl Linkage for SingleLinkage {
    fn combine(&self, _: usize, d_ac: f64, _: usize, d_bc: f64, _: usize, _: f64) -> f64 {
        d_ac.min(d_bc)
    }

    fn name(&self) -> &'static str {
        "single"
    }

    fn is_single_linkage(&self) -> bool {
        true
    }
}

/// Complete linkage: maximum distance between members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompleteLinkage;

impl Linkage for CompleteLinkage {
    fn combine(&self, _: usize, d_ac: f64, _: usize, d_bc: f64, _: usize, _: f64) -> f64 {
        d_ac.max(d_bc)
    }

    fn name(&self) -> &'static str {
        "complete"
    }
}

/// Group average linkage (UPGMA).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupAverageLinkage;

impl Linkage for GroupAverageLinkage {
    fn combine(&self, size_a: usize, d_ac: f64, size_b: usize, d_bc: f64, _: usize, _: f64) -> f64 {
        let wa = weight(size_a);
        let wb = weight(size_b);
        (wa * d_ac + wb * d_bc) / (wa + wb)
    }

    fn name(&self) -> &'static str {
        "average"
    }
}

/// Weighted average linkage (WPGMA, McQuitty).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeightedAverageLinkage;

impl Linkage for WeightedAverageLinkage {
    fn combine(&self, _: usize, d_ac: f64, _: usize, d_bc: f64, _: usize, _: f64) -> f64 {
        0.5 * (d_ac + d_bc)
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}

/// Centroid linkage (UPGMC). Operates on squared distances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CentroidLinkage;

impl Linkage for CentroidLinkage {
    fn initial(&self, distance: f64, squared: bool) -> f64 {
        if squared { distance } else { distance * distance }
    }

    fn combine(
        &self,
        size_a: usize,
        d_ac: f64,
        size_b: usize,
        d_bc: f64,
        _: usize,
        d_ab: f64,
    ) -> f64 {
        let total = weight(size_a) + weight(size_b);
        let wa = weight(size_a) / total;
        let wb = weight(size_b) / total;
        wa * d_ac + wb * d_bc - wa * wb * d_ab
    }

    fn restore(&self, value: f64, squared: bool) -> f64 {
        if squared { value } else { value.sqrt() }
    }

    fn name(&self) -> &'static str {
        "centroid"
    }

    fn is_reducible(&self) -> bool {
        false
    }
}

/// Median linkage (WPGMC). Operates on squared distances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MedianLinkage;

impl Linkage for MedianLinkage {
    fn initial(&self, distance: f64, squared: bool) -> f64 {
        if squared { distance } else { distance * distance }
    }

    fn combine(&self, _: usize, d_ac: f64, _: usize, d_bc: f64, _: usize, d_ab: f64) -> f64 {
        0.5 * (d_ac + d_bc) - 0.25 * d_ab
    }

    fn restore(&self, value: f64, squared: bool) -> f64 {
        if squared { value } else { value.sqrt() }
    }

    fn name(&self) -> &'static str {
        "median"
    }

    fn is_reducible(&self) -> bool {
        false
    }
}

/// Ward's minimum variance linkage.
///
/// The matrix holds half the squared distance so that the reported height of
/// two singletons equals their Euclidean distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WardLinkage;

impl Linkage for WardLinkage {
    fn initial(&self, distance: f64, squared: bool) -> f64 {
        0.5 * if squared { distance } else { distance * distance }
    }

    fn combine(
        &self,
        size_a: usize,
        d_ac: f64,
        size_b: usize,
        d_bc: f64,
        size_c: usize,
        d_ab: f64,
    ) -> f64 {
        let wa = weight(size_a);
        let wb = weight(size_b);
        let wc = weight(size_c);
        ((wa + wc) * d_ac + (wb + wc) * d_bc - wc * d_ab) / (wa + wb + wc)
    }

    fn restore(&self, value: f64, squared: bool) -> f64 {
        if squared { 2.0 * value } else { (2.0 * value).sqrt() }
    }

    fn name(&self) -> &'static str {
        "ward"
    }
}

/// Selects one of the built-in linkages.
///
/// # Examples
/// ```
/// use agglo_core::{Linkage, LinkageKind};
///
/// let kind: LinkageKind = "ward".parse()?;
/// assert_eq!(kind, LinkageKind::Ward);
/// assert_eq!(kind.linkage().name(), "ward");
/// assert!(!LinkageKind::Centroid.linkage().is_reducible());
/// # Ok::<(), agglo_core::UnknownLinkage>(())
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LinkageKind {
    /// [`SingleLinkage`].
    Single,
    /// [`CompleteLinkage`].
    Complete,
    /// [`GroupAverageLinkage`].
    #[default]
    GroupAverage,
    /// [`WeightedAverageLinkage`].
    WeightedAverage,
    /// [`CentroidLinkage`].
    Centroid,
    /// [`MedianLinkage`].
    Median,
    /// [`WardLinkage`].
    Ward,
}

impl LinkageKind {
    /// Every built-in linkage, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Single,
        Self::Complete,
        Self::GroupAverage,
        Self::WeightedAverage,
        Self::Centroid,
        Self::Median,
        Self::Ward,
    ];

    /// Resolves the kind to its strategy implementation.
    #[must_use]
    pub fn linkage(self) -> &'static dyn Linkage {
        match self {
            Self::Single => &SingleLinkage,
            Self::Complete => &CompleteLinkage,
            Self::GroupAverage => &GroupAverageLinkage,
            Self::WeightedAverage => &WeightedAverageLinkage,
            Self::Centroid => &CentroidLinkage,
            Self::Median => &MedianLinkage,
            Self::Ward => &WardLinkage,
        }
    }
}

impl fmt::Display for LinkageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.linkage().name())
    }
}

/// Returned when parsing an unknown linkage name.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown linkage `{0}`")]
pub struct UnknownLinkage(pub String);

impl FromStr for LinkageKind {
    type Err = UnknownLinkage;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "complete" => Ok(Self::Complete),
            "average" | "group-average" | "upgma" => Ok(Self::GroupAverage),
            "weighted" | "weighted-average" | "wpgma" => Ok(Self::WeightedAverage),
            "centroid" | "upgmc" => Ok(Self::Centroid),
            "median" | "wpgmc" => Ok(Self::Median),
            "ward" => Ok(Self::Ward),
            other => Err(UnknownLinkage(other.to_owned())),
        }
    }
}
