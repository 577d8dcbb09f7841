//! Error types for the agglo core library.
//!
//! Defines the error enums exposed by the public API, their stable
//! machine-readable codes, and a convenient result alias.

use std::{fmt, sync::Arc};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced by [`crate::DataSource`] operations.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DataSourceError {
    /// Requested index was outside the source's bounds.
    #[error("index {index} is out of bounds")]
    OutOfBounds {
        /// The requested item that exceeded the source bounds.
        index: usize,
    },
    /// Compared vectors had different dimensions.
    #[error("dimension mismatch: left={left}, right={right}")]
    DimensionMismatch {
        /// Dimensionality of the left-hand vector.
        left: usize,
        /// Dimensionality of the right-hand vector.
        right: usize,
    },
    /// Data source contained no items.
    #[error("data source contains no items")]
    EmptyData,
}

define_error_codes! {
    /// Stable codes describing [`DataSourceError`] variants.
    enum DataSourceErrorCode for DataSourceError {
        /// Requested index was outside the source's bounds.
        OutOfBounds => OutOfBounds { .. } => "DATA_SOURCE_OUT_OF_BOUNDS",
        /// Compared vectors had different dimensions.
        DimensionMismatch => DimensionMismatch { .. } => "DATA_SOURCE_DIMENSION_MISMATCH",
        /// Data source contained no items.
        EmptyData => EmptyData => "DATA_SOURCE_EMPTY",
    }
}

/// Error type produced while building distance matrices, recording merges, or
/// running an agglomeration.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum HacError {
    /// The supplied [`crate::DataSource`] contained no items.
    #[error("data source `{data_source}` contains no items")]
    EmptySource {
        /// Identifier for the empty data source.
        data_source: Arc<str>,
    },
    /// The number of objects exceeds what the packed distance matrix can hold.
    #[error("cannot cluster {size} objects; the distance matrix supports at most {max}")]
    Capacity {
        /// Number of objects requested by the caller.
        size: usize,
        /// Largest supported object count.
        max: usize,
    },
    /// Merge bookkeeping detected an inconsistent request. This indicates a
    /// logic error in the calling algorithm and aborts the run.
    #[error(
        "merge invariant violated: {invariant} (source {source_id}, target {target_id}, after {merge_count} merges)"
    )]
    InvariantViolation {
        /// Name of the violated invariant to assist debugging.
        invariant: &'static str,
        /// Cluster id presented as the merge source.
        source_id: usize,
        /// Cluster id presented as the merge target.
        target_id: usize,
        /// Number of merges recorded before the failing request.
        merge_count: usize,
    },
    /// A pairwise distance was NaN or infinite.
    #[error("distance between {left} and {right} is not finite")]
    NonFiniteDistance {
        /// Row index of the offending pair.
        left: usize,
        /// Column index of the offending pair.
        right: usize,
    },
    /// A condensed distance matrix did not match the declared object count.
    #[error("condensed matrix has {got} entries but {expected} were expected")]
    CondensedLength {
        /// Number of entries implied by the object count.
        expected: usize,
        /// Number of entries supplied by the caller.
        got: usize,
    },
    /// A [`crate::DataSource`] operation failed while filling the matrix.
    #[error("data source `{data_source}` failed: {error}")]
    DataSource {
        /// Identifier for the data source that produced the error.
        data_source: Arc<str>,
        #[source]
        /// Underlying data source error.
        error: DataSourceError,
    },
}

define_error_codes! {
    /// Stable codes describing [`HacError`] variants.
    enum HacErrorCode for HacError {
        /// The supplied [`crate::DataSource`] contained no items.
        EmptySource => EmptySource { .. } => "HAC_EMPTY_SOURCE",
        /// The object count exceeds the matrix ceiling.
        Capacity => Capacity { .. } => "HAC_CAPACITY",
        /// Merge bookkeeping detected an inconsistent request.
        InvariantViolation => InvariantViolation { .. } => "HAC_INVARIANT_VIOLATION",
        /// A pairwise distance was NaN or infinite.
        NonFiniteDistance => NonFiniteDistance { .. } => "HAC_NON_FINITE_DISTANCE",
        /// A condensed matrix had the wrong length.
        CondensedLength => CondensedLength { .. } => "HAC_CONDENSED_LENGTH",
        /// A [`crate::DataSource`] operation failed.
        DataSourceFailure => DataSource { .. } => "HAC_DATA_SOURCE_FAILURE",
    }
}

impl HacError {
    /// Retrieve the inner [`DataSourceErrorCode`] when the error originated in a [`crate::DataSource`].
    #[must_use]
    pub const fn data_source_code(&self) -> Option<DataSourceErrorCode> {
        match self {
            Self::DataSource { error, .. } => Some(error.code()),
            _ => None,
        }
    }

    pub(crate) const fn invariant(
        invariant: &'static str,
        source_id: usize,
        target_id: usize,
        merge_count: usize,
    ) -> Self {
        Self::InvariantViolation {
            invariant,
            source_id,
            target_id,
            merge_count,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, HacError>;
