use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::matrix::Matrix;
use crate::shape::Shape;
use crate::storage::try_zeros;

/// Upper bound (exclusive) of generated element values.
pub const VALUE_SCALE: f64 = 10.0;

/// Fill `buf` with values uniformly drawn from `[0, VALUE_SCALE)` using a
/// `StdRng` seeded with `seed`.
///
/// The sequence depends only on `seed` and the buffer length, never on the
/// calling worker, so every worker that fills a buffer with the same seed
/// ends up with bit-identical contents.
fn fill_uniform(buf: &mut [f64], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for v in buf.iter_mut() {
        *v = rng.gen::<f64>() * VALUE_SCALE;
    }
}

/// Allocate an `n x n` matrix of seeded uniform values in `[0, VALUE_SCALE)`.
pub fn seeded_matrix(n: usize, seed: u64) -> Result<Matrix> {
    let mut data = try_zeros(n * n)?;
    fill_uniform(&mut data, seed);
    Matrix::from_vec(data, Shape::square(n))
}
