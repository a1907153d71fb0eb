pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi;

use crate::displacement::DisplacementTable;
use crate::error::TransportError;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Blocking group-wide collectives over f64 buffers.
///
/// Every rank in the group must make the same sequence of collective calls
/// with the same `root` (and, for scatter/gather, the same table). A call
/// returns only once every rank has matched it. Implementations: the
/// in-process [`local::LocalTransport`] and, behind the `mpi` feature,
/// `mpi::MpiTransport`.
pub trait GroupTransport {
    /// This worker's zero-based rank.
    fn rank(&self) -> usize;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Block until every rank has reached the barrier.
    fn barrier(&self) -> TransportResult<()>;

    /// Variable-length scatter.
    ///
    /// The root passes the full buffer in `send` (length `table.total()`);
    /// every other rank passes `None`. Each rank receives the
    /// `table.chunk(rank).count` elements starting at its offset.
    fn scatter(
        &self,
        root: usize,
        send: Option<&[f64]>,
        table: &DisplacementTable,
    ) -> TransportResult<Vec<f64>>;

    /// Variable-length gather, the inverse of [`GroupTransport::scatter`].
    ///
    /// Each rank contributes exactly `table.chunk(rank).count` elements.
    /// The root receives the assembled `table.total()`-element buffer;
    /// every other rank receives `None`.
    fn gather(
        &self,
        root: usize,
        send: &[f64],
        table: &DisplacementTable,
    ) -> TransportResult<Option<Vec<f64>>>;

    /// Replicate `len` elements from the root to every rank.
    fn broadcast(&self, root: usize, send: Option<&[f64]>, len: usize)
        -> TransportResult<Vec<f64>>;

    /// Bring the whole group down. Every rank blocked in a collective, and
    /// every later collective call, fails with `TransportError::Aborted`.
    fn abort(&self, reason: &str);
}

pub(crate) fn check_root(root: usize, size: usize) -> TransportResult<()> {
    if root >= size {
        return Err(TransportError::InvalidRoot { root, size });
    }
    Ok(())
}

pub(crate) fn check_table(table: &DisplacementTable, size: usize) -> TransportResult<()> {
    if table.size() != size {
        return Err(TransportError::TableSize {
            table: table.size(),
            group: size,
        });
    }
    Ok(())
}
