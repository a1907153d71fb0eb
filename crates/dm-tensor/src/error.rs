use thiserror::Error;

use crate::shape::Shape;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },
    #[error("buffer length {len} does not match shape {shape}")]
    LengthMismatch { len: usize, shape: Shape },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}]")]
    MatmulMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("failed to allocate buffer of {elements} f64 elements")]
    Allocation { elements: usize },
    #[error("row range {start}..{end} out of bounds for {rows} rows")]
    RowRange { start: usize, end: usize, rows: usize },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
