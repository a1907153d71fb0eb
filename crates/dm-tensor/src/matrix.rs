use std::fmt;

use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::try_zeros;

/// A dense, row-major f64 matrix.
///
/// Used both for full `n x n` operands and for row blocks (`local_rows x n`)
/// owned by a single worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    shape: Shape,
}

impl Matrix {
    /// Create a new matrix from row-major data and a shape.
    ///
    /// # Panics
    /// Panics if `data.len() != shape.numel()`.
    pub fn new(data: Vec<f64>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} does not match shape {}",
            data.len(),
            shape
        );
        Matrix { data, shape }
    }

    /// Create a matrix from row-major data, checking the length.
    pub fn from_vec(data: Vec<f64>, shape: Shape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(TensorError::LengthMismatch {
                len: data.len(),
                shape,
            });
        }
        Ok(Matrix { data, shape })
    }

    /// Create a zero-filled matrix, reporting allocation failure.
    pub fn zeros(shape: Shape) -> Result<Self> {
        let data = try_zeros(shape.numel())?;
        Ok(Matrix { data, shape })
    }

    /// Returns the matrix shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape.rows()
    }

    pub fn cols(&self) -> usize {
        self.shape.cols()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the underlying row-major data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Returns the underlying row-major data mutably.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Element at `(row, col)`, or `None` if out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some(self.data[row * self.cols() + col])
    }

    /// First element (`[0][0]`), if any.
    pub fn first(&self) -> Option<f64> {
        self.data.first().copied()
    }

    /// Last element (`[rows-1][cols-1]`), if any.
    pub fn last(&self) -> Option<f64> {
        self.data.last().copied()
    }

    /// Borrow the contiguous rows `start..end` as a flat slice.
    pub fn row_slice(&self, start: usize, end: usize) -> Result<&[f64]> {
        if start > end || end > self.rows() {
            return Err(TensorError::RowRange {
                start,
                end,
                rows: self.rows(),
            });
        }
        let cols = self.cols();
        Ok(&self.data[start * cols..end * cols])
    }

    /// Matrix multiplication using the given backend.
    ///
    /// self is [m, k], other is [k, n], result is [m, n].
    pub fn matmul(&self, other: &Matrix, backend: &dyn ComputeBackend) -> Result<Matrix> {
        let m = self.rows();
        let k = self.cols();
        let k2 = other.rows();
        let n = other.cols();

        if k != k2 {
            return Err(TensorError::MatmulMismatch { m, k, k2, n });
        }

        let result = backend.matmul(&self.data, &other.data, m, k, n)?;
        Matrix::from_vec(result, Shape::new(m, n))
    }

    /// Largest per-element relative error of `self` against `reference`.
    ///
    /// Elements whose reference magnitude is below 1.0 are compared
    /// absolutely, so exact zeros do not blow the ratio up.
    pub fn max_relative_error(&self, reference: &Matrix) -> Result<f64> {
        if self.shape != reference.shape {
            return Err(TensorError::ShapeMismatch {
                expected: reference.shape,
                got: self.shape,
            });
        }
        Ok(self
            .data
            .iter()
            .zip(reference.data.iter())
            .map(|(&got, &want)| (got - want).abs() / want.abs().max(1.0))
            .fold(0.0, f64::max))
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.chunks(self.cols().max(1)) {
            for (j, v) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:.2}", v)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
