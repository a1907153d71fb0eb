//! Distribution and collection of row blocks.
//!
//! Both directions use the same [`DisplacementTable`]: rank `r`'s rows live
//! at elements `offset(r)..offset(r) + count(r)` of the full buffer, on the
//! way out (scatter of A) and on the way back (gather of C).

use dm_tensor::{seeded_matrix, Matrix, Shape};
use log::debug;

use crate::config::Replication;
use crate::displacement::DisplacementTable;
use crate::error::{DistError, Result, TransportError};
use crate::transport::GroupTransport;

/// Scatter the row blocks of `left` from `root` and return this rank's
/// block as a `local_rows x n` matrix.
///
/// `left` must be `Some` (and `n x n`) at the root; it is ignored elsewhere.
pub fn distribute_rows<T: GroupTransport + ?Sized>(
    transport: &T,
    root: usize,
    left: Option<&Matrix>,
    table: &DisplacementTable,
) -> Result<Matrix> {
    let rank = transport.rank();
    let n = table.n();
    let part = table.partition(rank)?;
    let chunk = table.chunk(rank)?;

    let send = if rank == root {
        let left = left.ok_or(TransportError::MissingRootBuffer { rank })?;
        if left.shape() != Shape::square(n) {
            return Err(DistError::TableMismatch {
                n,
                detail: format!("left operand has shape {}", left.shape()),
            });
        }
        Some(left.data())
    } else {
        None
    };

    let recv = transport.scatter(root, send, table)?;
    if recv.len() != chunk.count {
        return Err(TransportError::CountMismatch {
            rank,
            expected: chunk.count,
            got: recv.len(),
        }
        .into());
    }
    debug!(
        "rank {}: received rows {}..{} ({} elements)",
        rank, part.start_row, part.end_row, chunk.count
    );
    Ok(Matrix::from_vec(recv, Shape::new(part.local_rows(), n))?)
}

/// Obtain the full `n x n` right operand on every rank.
///
/// With [`Replication::Regenerate`] every rank builds B from `seed` on its
/// own; with [`Replication::Broadcast`] only `root` builds it and broadcasts
/// the result. Either way all ranks end up with bit-identical values.
pub fn replicate_right<T: GroupTransport + ?Sized>(
    transport: &T,
    root: usize,
    n: usize,
    seed: u64,
    mode: Replication,
) -> Result<Matrix> {
    match mode {
        Replication::Regenerate => Ok(seeded_matrix(n, seed)?),
        Replication::Broadcast => {
            let source = if transport.rank() == root {
                Some(seeded_matrix(n, seed)?)
            } else {
                None
            };
            let data = transport.broadcast(root, source.as_ref().map(Matrix::data), n * n)?;
            Ok(Matrix::from_vec(data, Shape::square(n))?)
        }
    }
}

/// Gather every rank's `local_rows x n` result block at `root`.
///
/// Returns the assembled `n x n` product at the root and `None` elsewhere.
pub fn collect_rows<T: GroupTransport + ?Sized>(
    transport: &T,
    root: usize,
    local: &Matrix,
    table: &DisplacementTable,
) -> Result<Option<Matrix>> {
    let rank = transport.rank();
    let n = table.n();
    let chunk = table.chunk(rank)?;
    if local.len() != chunk.count {
        return Err(TransportError::CountMismatch {
            rank,
            expected: chunk.count,
            got: local.len(),
        }
        .into());
    }

    match transport.gather(root, local.data(), table)? {
        Some(data) if rank == root => {
            debug!("rank {}: assembled {}x{} product", rank, n, n);
            Ok(Some(Matrix::from_vec(data, Shape::square(n))?))
        }
        None if rank != root => Ok(None),
        _ => Err(DistError::MissingResult),
    }
}
