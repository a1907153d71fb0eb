use crate::error::{Result, TensorError};

/// Allocate a zero-filled f64 buffer of `n` elements.
///
/// Unlike `vec![0.0; n]`, allocation failure is reported as
/// `TensorError::Allocation` instead of aborting the process, so the caller
/// can take the whole worker group down in an orderly way.
pub fn try_zeros(n: usize) -> Result<Vec<f64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(n)
        .map_err(|_| TensorError::Allocation { elements: n })?;
    buf.resize(n, 0.0);
    Ok(buf)
}

/// Copy `data` into a freshly allocated buffer, reporting allocation failure.
pub fn try_copy(data: &[f64]) -> Result<Vec<f64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(data.len())
        .map_err(|_| TensorError::Allocation {
            elements: data.len(),
        })?;
    buf.extend_from_slice(data);
    Ok(buf)
}
