use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;

use dm_tensor::{seeded_matrix, ComputeBackend, Matrix};
use log::{debug, error, info};

use crate::config::RunConfig;
use crate::displacement::DisplacementTable;
use crate::error::{DistError, Result};
use crate::metrics::Metrics;
use crate::partition::partition;
use crate::protocol::{collect_rows, distribute_rows, replicate_right};
use crate::transport::local::LocalGroup;
use crate::transport::GroupTransport;

/// Rank that owns the full matrices before scatter and after gather.
pub const COORDINATOR: usize = 0;

/// What the coordinator holds after a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub metrics: Metrics,
    pub product: Matrix,
}

/// Run one worker's share of the distributed multiplication.
///
/// Every rank in the group must call this with the same `config`. The
/// coordinator returns `Some(report)`, every other rank `None`. Any failure
/// on this rank aborts the whole group before the error is returned, so no
/// peer is left blocked in a collective.
pub fn run_worker<T: GroupTransport + ?Sized>(
    transport: &T,
    config: &RunConfig,
    backend: &dyn ComputeBackend,
) -> Result<Option<RunReport>> {
    let result = pipeline(transport, config, backend);
    if let Err(e) = &result {
        if !e.is_abort() {
            error!("rank {}: {}", transport.rank(), e);
            transport.abort(&e.to_string());
        }
    }
    result
}

fn pipeline<T: GroupTransport + ?Sized>(
    transport: &T,
    config: &RunConfig,
    backend: &dyn ComputeBackend,
) -> Result<Option<RunReport>> {
    config.validate()?;
    let rank = transport.rank();
    let size = transport.size();
    if size != config.size {
        return Err(DistError::Config(format!(
            "configured for {} workers but the group has {}",
            config.size, size
        )));
    }
    let n = config.n;
    let is_coordinator = rank == COORDINATOR;

    let part = partition(n, size, rank)?;
    let table = DisplacementTable::build(n, size)?;
    debug!(
        "rank {}: rows {}..{} ({} rows)",
        rank,
        part.start_row,
        part.end_row,
        part.local_rows()
    );
    if is_coordinator {
        info!(
            "{}x{} multiply on {} workers, B replication: {}",
            n, n, size, config.replication
        );
        info!(
            "coordinator owns rows {}..{} ({} rows)",
            part.start_row,
            part.end_row,
            part.local_rows()
        );
    }

    transport.barrier()?;
    let started = is_coordinator.then(Instant::now);

    let right = replicate_right(transport, COORDINATOR, n, config.seed_b, config.replication)?;
    let left = if is_coordinator {
        let left = seeded_matrix(n, config.seed_a)?;
        info!("matrices initialized");
        Some(left)
    } else {
        None
    };

    let local_left = distribute_rows(transport, COORDINATOR, left.as_ref(), &table)?;
    if is_coordinator {
        info!("row blocks distributed, computing");
    }

    let local_product = local_left.matmul(&right, backend)?;
    debug!("rank {}: local multiply done on {}", rank, backend.name());

    let product = collect_rows(transport, COORDINATOR, &local_product, &table)?;

    match (product, started) {
        (Some(product), Some(started)) => {
            let elapsed = started.elapsed();
            info!("results collected in {:.3} s", elapsed.as_secs_f64());
            let metrics = Metrics::new(n, size, elapsed, &product);
            Ok(Some(RunReport { metrics, product }))
        }
        (None, None) => Ok(None),
        _ => Err(DistError::MissingResult),
    }
}

/// Run the whole group in this process, one thread per rank, and return
/// the coordinator's report.
///
/// If any rank fails, the first error that is not merely an abort
/// notification is returned.
pub fn run_local(config: &RunConfig, backend: &dyn ComputeBackend) -> Result<RunReport> {
    launch(config, backend, |rank| {
        Ok(thread::Builder::new().name(format!("rank-{}", rank)))
    })
}

/// Spawn one thread per rank from the builder `worker_thread` returns.
///
/// If a thread cannot be started, the ranks already running are aborted
/// out of their collectives and the spawn failure is returned.
fn launch<B>(
    config: &RunConfig,
    backend: &dyn ComputeBackend,
    worker_thread: B,
) -> Result<RunReport>
where
    B: Fn(usize) -> io::Result<thread::Builder>,
{
    config.validate()?;
    let group = LocalGroup::new(config.size)?;
    let transports = group.clone().into_transports();

    let (outcomes, spawn_error) = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(transports.len());
        let mut spawn_error = None;
        for transport in transports {
            let rank = transport.rank();
            let spawned = worker_thread(rank).and_then(|builder| {
                builder.spawn_scoped(scope, move || {
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        run_worker(&transport, config, backend)
                    }))
                    .unwrap_or_else(|_| {
                        transport.abort("worker panicked");
                        Err(DistError::WorkerPanicked { rank })
                    })
                })
            });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    error!("rank {}: failed to spawn worker thread: {}", rank, source);
                    group.abort(&format!("failed to spawn rank {}: {}", rank, source));
                    spawn_error = Some(DistError::Spawn { rank, source });
                    break;
                }
            }
        }
        let outcomes: Vec<Result<Option<RunReport>>> = handles
            .into_iter()
            .enumerate()
            .map(|(rank, handle)| {
                handle
                    .join()
                    .unwrap_or(Err(DistError::WorkerPanicked { rank }))
            })
            .collect();
        (outcomes, spawn_error)
    });

    if let Some(e) = spawn_error {
        return Err(e);
    }

    let mut report = None;
    let mut root_cause = None;
    let mut abort = None;
    for outcome in outcomes {
        match outcome {
            Ok(Some(r)) => report = Some(r),
            Ok(None) => {}
            Err(e) if e.is_abort() => {
                abort.get_or_insert(e);
            }
            Err(e) => {
                root_cause.get_or_insert(e);
            }
        }
    }

    if let Some(e) = root_cause.or(abort) {
        return Err(e);
    }
    report.ok_or(DistError::MissingResult)
}
