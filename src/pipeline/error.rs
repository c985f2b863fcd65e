//! Error types for the 2D binning pipeline.
//!
//! Configuration and unfit-model errors are user-facing. Solver outcomes
//! that carry no solution are not errors; they are reported through
//! [`SolverStatus`](super::solver::SolverStatus).

use thiserror::Error;

/// Errors raised by fitting and transforming a 2D binning.
#[derive(Debug, Error, PartialEq)]
pub enum BinningError {
    /// A configuration option is outside its allowed domain.
    #[error("invalid value for {name}: {reason}")]
    InvalidParameter {
        /// Option name as it appears in the configuration
        name: &'static str,
        /// Human readable description of the violated rule
        reason: String,
    },

    /// The x, y and z arrays do not have the same length.
    #[error("x, y and z must have the same length; got {x}, {y} and {z}")]
    LengthMismatch { x: usize, y: usize, z: usize },

    /// The x and y arrays passed to transform do not have the same length.
    #[error("x and y must have the same length; got {x} and {y}")]
    TransformLengthMismatch { x: usize, y: usize },

    /// A clean sample has a NaN or infinite target value.
    #[error("target value at index {index} is not finite")]
    NonFiniteTarget { index: usize },

    /// A query was issued before a successful fit.
    #[error("this binning instance is not fitted yet; call fit with appropriate arguments")]
    NotFitted,
}

impl BinningError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        BinningError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
