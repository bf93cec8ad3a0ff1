use thiserror::Error;

use crate::colorization::colorize::Channel;
use crate::utils::PairShapeError;

/// Errors produced while extracting a scribble mask.
#[derive(Debug, Error, PartialEq)]
pub enum ScribbleMaskError {
    #[error("Image and scribbles dimensions must match: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("Difference threshold must be finite and non-negative, got {eps}")]
    InvalidThreshold { eps: f64 },
}

/// Errors produced by sparse matrix construction and the iterative solver.
#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error("Vector length {actual} does not match system size {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Column {column} in row {row} is outside a {dim}x{dim} matrix")]
    ColumnOutOfBounds {
        row: usize,
        column: usize,
        dim: usize,
    },

    #[error("Matrix has a zero diagonal entry in row {row}")]
    ZeroDiagonal { row: usize },

    #[error("Solver tolerance must be finite and non-negative, got {tolerance}")]
    InvalidTolerance { tolerance: f64 },

    #[error("Solver did not converge after {iterations} iterations (relative residual {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },
}

/// Errors produced by `colorize` and its variants.
#[derive(Debug, Error, PartialEq)]
pub enum ColorizeError {
    #[error("Image and scribbles dimensions must match: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Image and scribbles channel counts must match: expected {expected}, got {actual}")]
    ChannelCountMismatch { expected: u8, actual: u8 },

    #[error("Scribble mask dimensions must match the image: expected {expected:?}, got {actual:?}")]
    MaskDimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("Gamma must be finite and non-negative, got {gamma}")]
    InvalidGamma { gamma: f64 },

    #[error("Scribble mask has no known pixels; the linear system would be singular")]
    NoScribbles,

    #[error("Plane length {actual} does not match pixel count {expected}")]
    PlaneLengthMismatch { expected: usize, actual: usize },

    #[error("Failed to set up the linear solver: {0}")]
    Solver(#[from] SolveError),

    #[error("Failed to solve for {channel} channel: {source}")]
    Convergence {
        channel: Channel,
        #[source]
        source: SolveError,
    },
}

impl ColorizeError {
    /// The chrominance channel whose solve failed, if this is a convergence failure.
    #[must_use]
    pub const fn channel(&self) -> Option<Channel> {
        match self {
            Self::Convergence { channel, .. } => Some(*channel),
            _ => None,
        }
    }
}

impl From<PairShapeError> for ScribbleMaskError {
    fn from(err: PairShapeError) -> Self {
        match err {
            PairShapeError::Empty { width, height } => Self::EmptyImage { width, height },
            PairShapeError::Mismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
        }
    }
}

impl From<PairShapeError> for ColorizeError {
    fn from(err: PairShapeError) -> Self {
        match err {
            PairShapeError::Empty { width, height } => Self::EmptyImage { width, height },
            PairShapeError::Mismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
        }
    }
}
