//! `dm-dist` - Distributed row-block matrix multiplication for distmm.
//!
//! This crate provides:
//! - A pure `partition` function assigning contiguous row ranges to ranks
//! - A `DisplacementTable` of per-rank `(count, offset)` chunks
//! - A `GroupTransport` trait for collectives (barrier, scatter, gather,
//!   broadcast, abort), with an in-process `LocalGroup` implementation and
//!   an optional MPI implementation (`mpi` feature)
//! - The distribution and collection protocols and the per-worker pipeline
//! - Barrier-synchronized timing and GFLOPS metrics

pub mod config;
pub mod displacement;
pub mod error;
pub mod metrics;
pub mod partition;
pub mod protocol;
pub mod transport;
pub mod verify;
pub mod worker;

pub use config::{Replication, RunConfig};
pub use displacement::{Chunk, DisplacementTable};
pub use error::{DistError, Result, TransportError};
pub use metrics::{gflops, Metrics};
pub use partition::{partition, Partition};
pub use transport::local::{LocalGroup, LocalTransport};
pub use transport::GroupTransport;
pub use worker::{run_local, run_worker, RunReport, COORDINATOR};
