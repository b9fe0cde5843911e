use crate::algorithm::ReduceAlgorithm;
use crate::types::DType;
use thiserror::Error;

/// Custom error type for the Reductor engine.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum ReductorError {
    #[error("Invalid reduction axis {axis} for tensor of rank {rank}")]
    InvalidAxis { axis: isize, rank: usize },

    #[error("Empty axis set: algorithm {algorithm:?} requires at least one reduced axis")]
    EmptyAxisSet { algorithm: ReduceAlgorithm },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Buffer size mismatch: expected {expected}, got {actual} during operation {operation}")]
    BufferSizeMismatch {
        expected: usize,
        actual: usize,
        operation: String,
    },

    #[error("Data type mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    DataTypeMismatch {
        expected: DType,
        actual: DType,
        operation: String,
    },

    #[error("Padding inconsistency in blocked layout: {message}")]
    PaddingInconsistency { message: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
