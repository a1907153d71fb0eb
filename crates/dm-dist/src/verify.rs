use dm_tensor::{seeded_matrix, ComputeBackend, Matrix};

use crate::config::RunConfig;
use crate::error::Result;

/// Per-element relative error accepted when comparing against the
/// single-process product.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Outcome of comparing a distributed product with the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    pub max_relative_error: f64,
    pub tolerance: f64,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.max_relative_error <= self.tolerance
    }
}

/// Multiply the seeded operands of `config` in a single process.
pub fn reference_product(config: &RunConfig, backend: &dyn ComputeBackend) -> Result<Matrix> {
    let a = seeded_matrix(config.n, config.seed_a)?;
    let b = seeded_matrix(config.n, config.seed_b)?;
    Ok(a.matmul(&b, backend)?)
}

/// Compare `product` with [`reference_product`] element by element.
pub fn verify(
    product: &Matrix,
    config: &RunConfig,
    backend: &dyn ComputeBackend,
    tolerance: f64,
) -> Result<Verification> {
    let reference = reference_product(config, backend)?;
    Ok(Verification {
        max_relative_error: product.max_relative_error(&reference)?,
        tolerance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_tensor::{CpuBackend, Shape};

    #[test]
    fn test_reference_is_deterministic() {
        let config = RunConfig::new(4, 2);
        let backend = CpuBackend::new();
        let a = reference_product(&config, &backend).unwrap();
        let b = reference_product(&config, &backend).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_verify_detects_corruption() {
        let config = RunConfig::new(3, 1);
        let backend = CpuBackend::new();
        let mut product = reference_product(&config, &backend).unwrap();
        assert!(verify(&product, &config, &backend, DEFAULT_TOLERANCE).unwrap().passed());

        product.data_mut()[4] += 1.0;
        let v = verify(&product, &config, &backend, DEFAULT_TOLERANCE).unwrap();
        assert!(!v.passed());
    }

    #[test]
    fn test_verify_shape_mismatch() {
        let config = RunConfig::new(3, 1);
        let wrong = Matrix::zeros(Shape::square(2)).unwrap();
        assert!(verify(&wrong, &config, &CpuBackend::new(), DEFAULT_TOLERANCE).is_err());
    }
}
