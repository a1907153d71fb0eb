use std::fmt::Debug;

use crate::error::Result;

/// Trait for pluggable local multiply kernels.
///
/// Data is passed in as row-major f64 slices and the product is returned as
/// an owned vector. Implementations must be pure functions of their inputs:
/// every worker runs its kernel on disjoint memory, so a backend may be
/// shared across threads.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Matrix multiplication: C = A @ B.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - Returns: row-major data of shape [m, n]
    ///
    /// `m == 0` is valid and yields an empty result.
    fn matmul(&self, a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Result<Vec<f64>>;
}
