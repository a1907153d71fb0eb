use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};
use crate::storage::try_zeros;

/// Pure-Rust CPU compute backend.
///
/// The textbook i-j-k triple loop, summing each dot product in `k` order
/// with no compensation. Intended as the reference kernel: distributed and
/// single-process runs that use it produce bit-identical rows.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn matmul(&self, a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Result<Vec<f64>> {
        if a.len() != m * k {
            return Err(TensorError::Other(format!(
                "matmul: a.len()={} but expected m*k={}",
                a.len(),
                m * k
            )));
        }
        if b.len() != k * n {
            return Err(TensorError::Other(format!(
                "matmul: b.len()={} but expected k*n={}",
                b.len(),
                k * n
            )));
        }

        let mut c = try_zeros(m * n)?;
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0f64;
                for p in 0..k {
                    sum += a[i * k + p] * b[p * n + j];
                }
                c[i * n + j] = sum;
            }
        }
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> CpuBackend {
        CpuBackend::new()
    }

    #[test]
    fn test_matmul_identity() {
        let b = backend();
        let a = vec![1.0, 0.0, 0.0, 1.0];
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let c = b.matmul(&a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_matmul_basic() {
        let b = backend();
        // [1,2;3,4] @ [5,6;7,8] = [19,22;43,50]
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let x = vec![5.0, 6.0, 7.0, 8.0];
        let c = b.matmul(&a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_row_block() {
        let b = backend();
        // Second row of [1,2;3,4] times [5,6;7,8].
        let c = b.matmul(&[3.0, 4.0], &[5.0, 6.0, 7.0, 8.0], 1, 2, 2).unwrap();
        assert_eq!(c, vec![43.0, 50.0]);
    }

    #[test]
    fn test_matmul_zero_rows() {
        let b = backend();
        let c = b.matmul(&[], &[1.0, 2.0, 3.0, 4.0], 0, 2, 2).unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn test_matmul_length_mismatch() {
        let b = backend();
        assert!(b.matmul(&[1.0, 2.0, 3.0], &[1.0; 4], 2, 2, 2).is_err());
        assert!(b.matmul(&[1.0; 4], &[1.0; 3], 2, 2, 2).is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(backend().name(), "cpu");
    }
}
