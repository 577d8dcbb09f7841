//! Data source abstractions feeding the pairwise distance matrix.

use crate::{
    error::{DataSourceError, HacError, Result},
    matrix::triangle_size,
};

/// Abstraction over a collection of items that can yield pairwise distances.
///
/// # Examples
/// ```
/// use agglo_core::{DataSource, DataSourceError};
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
/// let src = Line(vec![1.0, 2.0, 4.0]);
/// assert_eq!(src.len(), 3);
/// assert_eq!(src.distance(0, 2)?, 3.0);
/// assert!(!src.is_squared());
/// # Ok::<(), DataSourceError>(())
/// ```
pub trait DataSource {
    /// Returns number of items in the source.
    fn len(&self) -> usize;

    /// Returns whether the source contains no items.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a human-readable name.
    fn name(&self) -> &str;

    /// Computes the distance between two items.
    ///
    /// # Errors
    /// Implementations must return [`DataSourceError::OutOfBounds`] for
    /// invalid indices.
    fn distance(&self, i: usize, j: usize) -> core::result::Result<f64, DataSourceError>;

    /// Reports whether [`DataSource::distance`] already yields squared values
    /// (for example squared Euclidean distance). Variance-based linkages use
    /// this to avoid squaring twice.
    fn is_squared(&self) -> bool {
        false
    }
}

/// A named, precomputed lower-triangular distance matrix.
///
/// Entries follow the packing of [`crate::ClusterDistanceMatrix`]: the
/// distance between `x` and `y` with `y < x` lives at
/// `triangle_size(x) + y`.
///
/// # Examples
/// ```
/// use agglo_core::{DataSource, PrecomputedDistances};
///
/// // d(1,0) = 2, d(2,0) = 5, d(2,1) = 3
/// let src = PrecomputedDistances::new("tiny", 3, vec![2.0, 5.0, 3.0])?;
/// assert_eq!(src.distance(0, 2)?, 5.0);
/// assert_eq!(src.distance(1, 1)?, 0.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PrecomputedDistances {
    name: String,
    len: usize,
    values: Vec<f64>,
    squared: bool,
}

impl PrecomputedDistances {
    /// Wraps a condensed matrix over `len` items.
    ///
    /// # Errors
    /// Returns [`HacError::CondensedLength`] when `values` does not hold
    /// exactly `len * (len - 1) / 2` entries.
    pub fn new(name: impl Into<String>, len: usize, values: Vec<f64>) -> Result<Self> {
        let expected = triangle_size(len);
        if values.len() != expected {
            return Err(HacError::CondensedLength {
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            len,
            values,
            squared: false,
        })
    }

    /// Marks the stored values as squared distances.
    #[must_use]
    pub fn with_squared(mut self, squared: bool) -> Self {
        self.squared = squared;
        self
    }

    /// Returns the condensed values.
    #[must_use]
    #[rustfmt::skip]
    pub fn values(&self) -> &[f64] { &self.values }
}

impl DataSource for PrecomputedDistances {
    fn len(&self) -> usize {
        self.len
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn distance(&self, i: usize, j: usize) -> core::result::Result<f64, DataSourceError> {
        for index in [i, j] {
            if index >= self.len {
                return Err(DataSourceError::OutOfBounds { index });
            }
        }
        if i == j {
            return Ok(0.0);
        }
        let (x, y) = if i > j { (i, j) } else { (j, i) };
        self.values
            .get(triangle_size(x) + y)
            .copied()
            .ok_or(DataSourceError::OutOfBounds { index: x })
    }

    fn is_squared(&self) -> bool {
        self.squared
    }
}
