//! `dm-tensor` - Dense matrices and local multiply kernels for distmm.
//!
//! This crate provides:
//! - A `Matrix` type: a dense, row-major f64 buffer with a 2D shape
//! - A `ComputeBackend` trait for pluggable local multiply kernels
//! - A reference `CpuBackend` implementation (plain triple loop)
//! - Seeded, reproducible matrix initialization
//! - Fallible buffer allocation

pub mod backend;
pub mod cpu;
pub mod error;
pub mod init;
pub mod matrix;
pub mod shape;
pub mod storage;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
pub use error::{Result, TensorError};
pub use init::seeded_matrix;
pub use matrix::Matrix;
pub use shape::Shape;
