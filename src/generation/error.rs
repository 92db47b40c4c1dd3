//! Generation error types.
//!
//! Inference failures, tensor mismatches and state misuse are distinct
//! kinds; nothing here is retried automatically.

use thiserror::Error;

use crate::tokenizer::TokenizerError;

use super::tensor::DataType;

/// Shape or element-type problems with a [`super::Tensor`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("Shape {shape:?} needs {expected} elements, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Expected {expected:?} tensor, got {actual:?}")]
    WrongType { expected: DataType, actual: DataType },

    #[error("Axis {axis} out of range for rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },

    #[error("Index {index} out of range for dimension of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
}

/// Failures reported by an [`super::InferenceSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Inference failed: {0}")]
    InferenceFailure(String),

    #[error("Session already closed")]
    Closed,

    #[error("Model could not be loaded: {0}")]
    Load(String),
}

/// Errors from generation sessions and the greedy generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Tensor error: {0}")]
    Tensor(#[from] TensorError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("decode() called before prefill()")]
    NotPrimed,

    #[error("Input token sequence is empty")]
    EmptyInput,

    #[error("Model output missing: {0}")]
    MissingOutput(String),

    #[error("Cache layout discovery failed: {0}")]
    Discovery(String),

    #[error("Close failed for {} sub-session(s): {}", .failures.len(), .failures.join("; "))]
    CloseFailed { failures: Vec<String> },
}

impl GenerationError {
    /// True when the native forward pass itself failed.
    pub fn is_inference_failure(&self) -> bool {
        matches!(self, Self::Session(SessionError::InferenceFailure(_)))
    }

    /// True when the session was driven in an invalid order.
    pub fn is_state_misuse(&self) -> bool {
        matches!(self, Self::NotPrimed | Self::Session(SessionError::Closed))
    }
}
