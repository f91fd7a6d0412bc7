//! Error types for ndexec

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using ndexec's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error category reported alongside every [`Error`].
///
/// The dispatch layer that hosts the kernels translates errors by kind, so the
/// tag must stay stable even when new variants are added.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid rank, axis, shape or broadcast incompatibility
    Shape,
    /// Index-like input outside its declared range
    Range,
    /// Unsupported data type or data type combination
    Type,
    /// Buffer or workspace allocation failure
    Allocation,
    /// Any other invalid operation argument
    InvalidArgument,
    /// Broken internal invariant
    Internal,
}

impl ErrorKind {
    /// Short tag used in log lines
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shape => "shape",
            Self::Range => "range",
            Self::Type => "type",
            Self::Allocation => "allocation",
            Self::InvalidArgument => "invalid_argument",
            Self::Internal => "internal",
        }
    }
}

/// Errors that can occur in ndexec operations
#[derive(Error, Debug)]
pub enum Error {
    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Shapes cannot be broadcast together
    #[error("Cannot broadcast shape {from:?} to {to:?}")]
    BroadcastError {
        /// Source shape
        from: Vec<usize>,
        /// Target shape
        to: Vec<usize>,
    },

    /// Invalid dimension index
    #[error("Invalid dimension {dim} for tensor with {ndim} dimensions")]
    InvalidDimension {
        /// The invalid dimension
        dim: isize,
        /// Number of dimensions
        ndim: usize,
    },

    /// The same axis appears twice in an axis list
    #[error("Duplicate axis {axis} in axis list {axes:?}")]
    DuplicateAxis {
        /// The repeated (normalized) axis
        axis: usize,
        /// The axis list as supplied
        axes: Vec<isize>,
    },

    /// Wrong tensor rank for an operation
    #[error("{op} expects {expected}D tensor for '{arg}', got {got}D")]
    InvalidRank {
        /// Operation name
        op: &'static str,
        /// Argument name
        arg: &'static str,
        /// Expected rank
        expected: usize,
        /// Actual rank
        got: usize,
    },

    /// Index-like value outside its valid range
    #[error("{op}: {what} should be in range [0, {bound}), but got {value}")]
    IndexOutOfRange {
        /// Operation name
        op: &'static str,
        /// What kind of index was checked
        what: &'static str,
        /// Offending value
        value: i128,
        /// Exclusive upper bound
        bound: i64,
    },

    /// Unsupported dtype for an operation
    #[error("Unsupported dtype {dtype:?} for operation '{op}'")]
    UnsupportedDType {
        /// The unsupported dtype
        dtype: DType,
        /// The operation name
        op: &'static str,
    },

    /// No kernel registered for a dtype pair
    #[error("No '{op}' kernel registered for dtype pair ({lhs}, {rhs})")]
    UnsupportedDTypePair {
        /// The operation name
        op: &'static str,
        /// First dtype of the key
        lhs: DType,
        /// Second dtype of the key
        rhs: DType,
    },

    /// DType mismatch between operands
    #[error("DType mismatch: {lhs:?} vs {rhs:?}")]
    DTypeMismatch {
        /// Left-hand side dtype
        lhs: DType,
        /// Right-hand side dtype
        rhs: DType,
    },

    /// Out of memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Workspace limit exceeded
    #[error("Workspace limit exceeded: requested {requested} bytes with {in_use} of {limit} in use")]
    WorkspaceExhausted {
        /// Requested size in bytes
        requested: usize,
        /// Bytes already held by live buffers
        in_use: usize,
        /// Configured limit in bytes
        limit: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ShapeMismatch { .. }
            | Self::BroadcastError { .. }
            | Self::InvalidDimension { .. }
            | Self::DuplicateAxis { .. }
            | Self::InvalidRank { .. } => ErrorKind::Shape,
            Self::IndexOutOfRange { .. } => ErrorKind::Range,
            Self::UnsupportedDType { .. }
            | Self::UnsupportedDTypePair { .. }
            | Self::DTypeMismatch { .. } => ErrorKind::Type,
            Self::OutOfMemory { .. } | Self::WorkspaceExhausted { .. } => ErrorKind::Allocation,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create a broadcast error
    pub fn broadcast(from: &[usize], to: &[usize]) -> Self {
        Self::BroadcastError {
            from: from.to_vec(),
            to: to.to_vec(),
        }
    }

    /// Create an unsupported dtype error
    pub fn unsupported_dtype(dtype: DType, op: &'static str) -> Self {
        Self::UnsupportedDType { dtype, op }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
