//! Plain-text point files compared by Euclidean distance.
//!
//! One point per line, coordinates separated by commas or whitespace. Blank
//! lines and anything after `#` are ignored. Every point must have the same
//! number of coordinates.

use std::io::{self, BufRead};

use agglo_core::{DataSource, DataSourceError};
use thiserror::Error;

/// Errors raised while reading a points file.
#[derive(Debug, Error)]
pub enum PointsError {
    /// Reading from the underlying stream failed.
    #[error("failed to read line {line}: {source}")]
    Read {
        /// One-based line number.
        line: usize,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A coordinate was not a finite number.
    #[error("line {line}: `{token}` is not a finite number")]
    InvalidNumber {
        /// One-based line number.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A point had a different number of coordinates than the first one.
    #[error("line {line}: expected {expected} coordinates, found {got}")]
    Ragged {
        /// One-based line number.
        line: usize,
        /// Coordinates per point established by the first point.
        expected: usize,
        /// Coordinates found on this line.
        got: usize,
    },
}

/// Points read from a text file, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    name: String,
    len: usize,
    dims: usize,
    coords: Vec<f64>,
    squared: bool,
}

impl PointCloud {
    /// Parses points from `reader`.
    ///
    /// # Errors
    /// Returns [`PointsError`] when a line cannot be read, holds a token that
    /// is not a finite number, or has the wrong number of coordinates.
    ///
    /// # Examples
    /// ```
    /// use agglo_cli::cli::PointCloud;
    /// use agglo_core::DataSource;
    ///
    /// let input = "# x, y\n0, 0\n3 4\n";
    /// let points = PointCloud::try_from_reader("demo", input.as_bytes())?;
    /// assert_eq!(points.len(), 2);
    /// assert_eq!(points.distance(0, 1)?, 5.0);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_from_reader(
        name: impl Into<String>,
        reader: impl BufRead,
    ) -> Result<Self, PointsError> {
        let mut cloud = Self {
            name: name.into(),
            len: 0,
            dims: 0,
            coords: Vec::new(),
            squared: false,
        };
        for (index, raw) in reader.lines().enumerate() {
            let line = index + 1;
            let raw = raw.map_err(|source| PointsError::Read { line, source })?;
            cloud.push_line(line, &raw)?;
        }
        Ok(cloud)
    }

    fn push_line(&mut self, line: usize, raw: &str) -> Result<(), PointsError> {
        let content = raw.split('#').next().unwrap_or_default();
        let start = self.coords.len();
        for token in content
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
        {
            let value = token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| PointsError::InvalidNumber {
                    line,
                    token: token.to_owned(),
                })?;
            self.coords.push(value);
        }
        let got = self.coords.len() - start;
        if got == 0 {
            return Ok(());
        }
        if self.len == 0 {
            self.dims = got;
        } else if got != self.dims {
            return Err(PointsError::Ragged {
                line,
                expected: self.dims,
                got,
            });
        }
        self.len += 1;
        Ok(())
    }

    /// Reports squared Euclidean distances instead of plain ones.
    #[must_use]
    pub fn with_squared(mut self, squared: bool) -> Self {
        self.squared = squared;
        self
    }

    /// Returns the number of coordinates per point.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    fn row(&self, index: usize) -> Result<&[f64], DataSourceError> {
        if index >= self.len {
            return Err(DataSourceError::OutOfBounds { index });
        }
        let start = index * self.dims;
        self.coords
            .get(start..start + self.dims)
            .ok_or(DataSourceError::OutOfBounds { index })
    }
}

impl DataSource for PointCloud {
    fn len(&self) -> usize {
        self.len
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
        let a = self.row(i)?;
        let b = self.row(j)?;
        let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
        Ok(if self.squared { sum } else { sum.sqrt() })
    }

    fn is_squared(&self) -> bool {
        self.squared
    }
}
