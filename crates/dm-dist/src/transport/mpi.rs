//! Multi-process transport over MPI (`mpi` feature).
//!
//! Launch with `mpirun -n <size> dm-cli --transport mpi ...`. Rank and size
//! come from `MPI_COMM_WORLD`; `abort` calls `MPI_Abort`, which tears down
//! every process in the job.

use dm_tensor::storage::{try_copy, try_zeros};
use log::error;
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use mpi::Count;

use super::{check_root, check_table, GroupTransport, TransportResult};
use crate::displacement::DisplacementTable;
use crate::error::TransportError;

/// Exit code passed to `MPI_Abort`.
const ABORT_CODE: i32 = 1;

pub struct MpiTransport {
    world: SimpleCommunicator,
    rank: usize,
    size: usize,
}

impl MpiTransport {
    /// Wrap a communicator (normally `universe.world()`). The universe must
    /// outlive the transport.
    pub fn new(world: SimpleCommunicator) -> Self {
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        MpiTransport { world, rank, size }
    }
}

fn to_count(elements: usize) -> TransportResult<Count> {
    Count::try_from(elements).map_err(|_| TransportError::CountOverflow { elements })
}

/// Counts and displacements in MPI's `int` representation.
fn counts_and_displs(table: &DisplacementTable) -> TransportResult<(Vec<Count>, Vec<Count>)> {
    let counts = table.counts().map(to_count).collect::<TransportResult<Vec<_>>>()?;
    let displs = table.offsets().map(to_count).collect::<TransportResult<Vec<_>>>()?;
    Ok((counts, displs))
}

fn alloc(elements: usize) -> TransportResult<Vec<f64>> {
    try_zeros(elements).map_err(|_| TransportError::Allocation { elements })
}

impl GroupTransport for MpiTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> TransportResult<()> {
        self.world.barrier();
        Ok(())
    }

    fn scatter(
        &self,
        root: usize,
        send: Option<&[f64]>,
        table: &DisplacementTable,
    ) -> TransportResult<Vec<f64>> {
        check_root(root, self.size)?;
        check_table(table, self.size)?;
        let mut recv = alloc(table.chunks()[self.rank].count)?;
        let root_process = self.world.process_at_rank(root as i32);

        if self.rank == root {
            let send = send.ok_or(TransportError::MissingRootBuffer { rank: self.rank })?;
            if send.len() != table.total() {
                return Err(TransportError::CountMismatch {
                    rank: self.rank,
                    expected: table.total(),
                    got: send.len(),
                });
            }
            let (counts, displs) = counts_and_displs(table)?;
            let partition = Partition::new(send, counts, displs);
            root_process.scatter_varcount_into_root(&partition, &mut recv[..]);
        } else {
            root_process.scatter_varcount_into(&mut recv[..]);
        }
        Ok(recv)
    }

    fn gather(
        &self,
        root: usize,
        send: &[f64],
        table: &DisplacementTable,
    ) -> TransportResult<Option<Vec<f64>>> {
        check_root(root, self.size)?;
        check_table(table, self.size)?;
        let expected = table.chunks()[self.rank].count;
        if send.len() != expected {
            return Err(TransportError::CountMismatch {
                rank: self.rank,
                expected,
                got: send.len(),
            });
        }
        let root_process = self.world.process_at_rank(root as i32);

        if self.rank == root {
            let mut assembled = alloc(table.total())?;
            let (counts, displs) = counts_and_displs(table)?;
            {
                let mut partition = PartitionMut::new(&mut assembled[..], counts, displs);
                root_process.gather_varcount_into_root(send, &mut partition);
            }
            Ok(Some(assembled))
        } else {
            root_process.gather_varcount_into(send);
            Ok(None)
        }
    }

    fn broadcast(
        &self,
        root: usize,
        send: Option<&[f64]>,
        len: usize,
    ) -> TransportResult<Vec<f64>> {
        check_root(root, self.size)?;
        let mut buf = if self.rank == root {
            let send = send.ok_or(TransportError::MissingRootBuffer { rank: self.rank })?;
            try_copy(send).map_err(|_| TransportError::Allocation { elements: len })?
        } else {
            alloc(len)?
        };
        if buf.len() != len {
            return Err(TransportError::CountMismatch {
                rank: self.rank,
                expected: len,
                got: buf.len(),
            });
        }
        self.world
            .process_at_rank(root as i32)
            .broadcast_into(&mut buf[..]);
        Ok(buf)
    }

    fn abort(&self, reason: &str) {
        error!("rank {}: aborting MPI job: {}", self.rank, reason);
        self.world.abort(ABORT_CODE)
    }
}
