//! In-process transport: each worker is a thread, collectives rendezvous
//! through a shared mutex/condvar pair.
//!
//! Every collective call deposits the caller's operation and payload into
//! its rank's slot. The last rank to arrive checks that all ranks called the
//! same collective with the same arguments, computes every rank's output,
//! advances the generation counter, and wakes the others. Any failure along
//! the way (mismatched calls, wrong counts, an explicit `abort`) poisons the
//! group: all waiting and future calls return `TransportError::Aborted`.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use dm_tensor::storage::{try_copy, try_zeros};
use log::{error, trace};

use super::{check_root, check_table, GroupTransport, TransportResult};
use crate::displacement::DisplacementTable;
use crate::error::{DistError, Result, TransportError};

#[derive(Debug, Clone, PartialEq)]
enum Collective {
    Barrier,
    Scatter { root: usize, table: DisplacementTable },
    Gather { root: usize, table: DisplacementTable },
    Broadcast { root: usize, len: usize },
}

impl fmt::Display for Collective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collective::Barrier => write!(f, "barrier"),
            Collective::Scatter { root, table } => write!(
                f,
                "scatter(root={}, n={}, ranks={})",
                root,
                table.n(),
                table.size()
            ),
            Collective::Gather { root, table } => write!(
                f,
                "gather(root={}, n={}, ranks={})",
                root,
                table.n(),
                table.size()
            ),
            Collective::Broadcast { root, len } => {
                write!(f, "broadcast(root={}, len={})", root, len)
            }
        }
    }
}

struct Arrival {
    op: Collective,
    payload: Option<Vec<f64>>,
}

struct State {
    arrivals: Vec<Option<Arrival>>,
    arrived: usize,
    outputs: Vec<Option<Vec<f64>>>,
    generation: u64,
    aborted: Option<String>,
}

struct Shared {
    size: usize,
    state: Mutex<State>,
    turn: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn abort(&self, reason: &str) {
        let mut state = self.lock();
        if state.aborted.is_none() {
            error!("aborting process group: {}", reason);
            state.aborted = Some(reason.to_string());
        }
        self.turn.notify_all();
    }

    fn exchange(
        &self,
        rank: usize,
        op: Collective,
        payload: Option<Vec<f64>>,
    ) -> TransportResult<Vec<f64>> {
        let mut state = self.lock();
        if let Some(reason) = &state.aborted {
            return Err(TransportError::Aborted {
                reason: reason.clone(),
            });
        }

        trace!("rank {}: entering {}", rank, op);
        state.arrivals[rank] = Some(Arrival { op, payload });
        state.arrived += 1;
        let generation = state.generation;

        if state.arrived == self.size {
            let arrivals: Vec<Arrival> = state.arrivals.iter_mut().filter_map(Option::take).collect();
            state.arrived = 0;
            match complete(arrivals, self.size) {
                Ok(outputs) => {
                    for (slot, out) in state.outputs.iter_mut().zip(outputs) {
                        *slot = Some(out);
                    }
                }
                Err(e) => {
                    error!("aborting process group: {}", e);
                    state.aborted = Some(e.to_string());
                }
            }
            state.generation = state.generation.wrapping_add(1);
            self.turn.notify_all();
        } else {
            while state.generation == generation && state.aborted.is_none() {
                state = self
                    .turn
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }

        if let Some(reason) = &state.aborted {
            return Err(TransportError::Aborted {
                reason: reason.clone(),
            });
        }
        state.outputs[rank]
            .take()
            .ok_or_else(|| TransportError::Aborted {
                reason: format!("rank {} woke without an output", rank),
            })
    }
}

/// Match every rank's arrival and compute each rank's output.
fn complete(arrivals: Vec<Arrival>, size: usize) -> TransportResult<Vec<Vec<f64>>> {
    let op = arrivals[0].op.clone();
    for (rank, arrival) in arrivals.iter().enumerate().skip(1) {
        if arrival.op != op {
            return Err(TransportError::CollectiveMismatch {
                rank,
                expected: op.to_string(),
                got: arrival.op.to_string(),
            });
        }
    }

    match op {
        Collective::Barrier => Ok(vec![Vec::new(); size]),
        Collective::Scatter { root, table } => {
            let send = root_buffer(&arrivals, root, table.total())?;
            table
                .chunks()
                .iter()
                .map(|chunk| {
                    try_copy(&send[chunk.range()]).map_err(|_| TransportError::Allocation {
                        elements: chunk.count,
                    })
                })
                .collect()
        }
        Collective::Gather { root, table } => {
            let mut assembled = try_zeros(table.total()).map_err(|_| {
                TransportError::Allocation {
                    elements: table.total(),
                }
            })?;
            for (rank, (arrival, chunk)) in arrivals.iter().zip(table.chunks()).enumerate() {
                let send = arrival.payload.as_deref().unwrap_or(&[]);
                if send.len() != chunk.count {
                    return Err(TransportError::CountMismatch {
                        rank,
                        expected: chunk.count,
                        got: send.len(),
                    });
                }
                assembled[chunk.range()].copy_from_slice(send);
            }
            let mut outputs = vec![Vec::new(); size];
            outputs[root] = assembled;
            Ok(outputs)
        }
        Collective::Broadcast { root, len } => {
            let send = root_buffer(&arrivals, root, len)?;
            (0..size)
                .map(|_| {
                    try_copy(send).map_err(|_| TransportError::Allocation { elements: len })
                })
                .collect()
        }
    }
}

fn root_buffer(arrivals: &[Arrival], root: usize, expected: usize) -> TransportResult<&[f64]> {
    let send = arrivals[root]
        .payload
        .as_deref()
        .ok_or(TransportError::MissingRootBuffer { rank: root })?;
    if send.len() != expected {
        return Err(TransportError::CountMismatch {
            rank: root,
            expected,
            got: send.len(),
        });
    }
    Ok(send)
}

/// A group of in-process workers sharing one rendezvous.
///
/// ```
/// use dm_dist::{GroupTransport, LocalGroup};
///
/// let group = LocalGroup::new(2).unwrap();
/// let handles: Vec<_> = group
///     .into_transports()
///     .into_iter()
///     .map(|t| std::thread::spawn(move || t.barrier()))
///     .collect();
/// for h in handles {
///     h.join().unwrap().unwrap();
/// }
/// ```
#[derive(Clone)]
pub struct LocalGroup {
    shared: Arc<Shared>,
}

impl LocalGroup {
    /// Create a group of `size` workers.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(DistError::InvalidGroup { rank: 0, size });
        }
        let state = State {
            arrivals: (0..size).map(|_| None).collect(),
            arrived: 0,
            outputs: vec![None; size],
            generation: 0,
            aborted: None,
        };
        Ok(LocalGroup {
            shared: Arc::new(Shared {
                size,
                state: Mutex::new(state),
                turn: Condvar::new(),
            }),
        })
    }

    /// Abort the group from outside, as an external supervisor would.
    pub fn abort(&self, reason: &str) {
        self.shared.abort(reason);
    }

    /// One transport per rank, in rank order.
    pub fn into_transports(self) -> Vec<LocalTransport> {
        (0..self.shared.size)
            .map(|rank| LocalTransport {
                rank,
                shared: Arc::clone(&self.shared),
            })
            .collect()
    }
}

/// One rank's handle on a [`LocalGroup`].
pub struct LocalTransport {
    rank: usize,
    shared: Arc<Shared>,
}

impl LocalTransport {
    /// Abort the group if `result` carries a failure detected on this rank.
    fn guard<T>(&self, result: TransportResult<T>) -> TransportResult<T> {
        if let Err(e) = &result {
            if !matches!(e, TransportError::Aborted { .. }) {
                self.abort(&e.to_string());
            }
        }
        result
    }

    fn root_payload(
        &self,
        root: usize,
        send: Option<&[f64]>,
    ) -> TransportResult<Option<Vec<f64>>> {
        check_root(root, self.shared.size)?;
        if self.rank != root {
            return Ok(None);
        }
        let send = send.ok_or(TransportError::MissingRootBuffer { rank: self.rank })?;
        let copy = try_copy(send).map_err(|_| TransportError::Allocation {
            elements: send.len(),
        })?;
        Ok(Some(copy))
    }
}

impl GroupTransport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) -> TransportResult<()> {
        self.shared
            .exchange(self.rank, Collective::Barrier, None)
            .map(|_| ())
    }

    fn scatter(
        &self,
        root: usize,
        send: Option<&[f64]>,
        table: &DisplacementTable,
    ) -> TransportResult<Vec<f64>> {
        let payload = self.guard(
            check_table(table, self.shared.size).and_then(|()| self.root_payload(root, send)),
        )?;
        let op = Collective::Scatter {
            root,
            table: table.clone(),
        };
        self.shared.exchange(self.rank, op, payload)
    }

    fn gather(
        &self,
        root: usize,
        send: &[f64],
        table: &DisplacementTable,
    ) -> TransportResult<Option<Vec<f64>>> {
        let payload = self.guard(
            check_root(root, self.shared.size)
                .and_then(|()| check_table(table, self.shared.size))
                .and_then(|()| {
                    try_copy(send).map_err(|_| TransportError::Allocation {
                        elements: send.len(),
                    })
                }),
        )?;
        let op = Collective::Gather {
            root,
            table: table.clone(),
        };
        let out = self.shared.exchange(self.rank, op, Some(payload))?;
        Ok((self.rank == root).then_some(out))
    }

    fn broadcast(
        &self,
        root: usize,
        send: Option<&[f64]>,
        len: usize,
    ) -> TransportResult<Vec<f64>> {
        let payload = self.guard(self.root_payload(root, send))?;
        self.shared
            .exchange(self.rank, Collective::Broadcast { root, len }, payload)
    }

    fn abort(&self, reason: &str) {
        self.shared.abort(&format!("rank {}: {}", self.rank, reason));
    }
}

/// Run `f` once per rank on its own thread and collect results in rank
/// order.
#[cfg(test)]
pub(crate) fn run_group<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(LocalTransport) -> T + Sync,
{
    let transports = LocalGroup::new(size).unwrap().into_transports();
    std::thread::scope(|s| {
        let handles: Vec<_> = transports
            .into_iter()
            .map(|t| {
                let f = &f;
                s.spawn(move || f(t))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}
