use std::fmt;
use std::time::Duration;

use dm_tensor::Matrix;

/// Floating-point operations of an `n x n` by `n x n` multiply, counting
/// each multiply-add as two.
pub fn flop_count(n: usize) -> f64 {
    2.0 * (n as f64).powi(3)
}

/// Throughput in GFLOPS for an `n x n` multiply that took `elapsed`.
///
/// Returns 0.0 for a zero-length interval.
pub fn gflops(n: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        flop_count(n) / secs / 1e9
    } else {
        0.0
    }
}

/// End-to-end measurements of one run, taken at the coordinator.
///
/// `elapsed` spans from just after the opening barrier to the completion of
/// the gather, so it includes initialization, distribution, compute, and
/// collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub n: usize,
    pub size: usize,
    pub elapsed: Duration,
    /// `C[0][0]`, absent when `n == 0`.
    pub first: Option<f64>,
    /// `C[n-1][n-1]`, absent when `n == 0`.
    pub last: Option<f64>,
}

impl Metrics {
    pub fn new(n: usize, size: usize, elapsed: Duration, product: &Matrix) -> Self {
        Metrics {
            n,
            size,
            elapsed,
            first: product.first(),
            last: product.last(),
        }
    }

    pub fn gflops(&self) -> f64 {
        gflops(self.n, self.elapsed)
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix size: {} x {}", self.n, self.n)?;
        writeln!(f, "Workers: {}", self.size)?;
        if let (Some(first), Some(last)) = (self.first, self.last) {
            let end = self.n - 1;
            writeln!(f, "C[0][0] = {:.6}", first)?;
            writeln!(f, "C[{}][{}] = {:.6}", end, end, last)?;
        }
        writeln!(f, "Elapsed: {:.2} s", self.elapsed.as_secs_f64())?;
        write!(f, "Performance: {:.2} GFLOPS", self.gflops())
    }
}
