//! Fixed pool of search workers.
//!
//! Each worker owns a thread, a FIFO of pending work items and its own
//! [`SearchArena`]. Queuing an item does not wake the worker; the orchestrator
//! fills every queue first and then calls [`WorkerPool::start_all`], so one
//! iteration's work is released at once.

use std::{
    mem,
    num::NonZeroUsize,
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::{
    arena::SearchArena,
    error::{EngineError, SearchError},
    node::GameTreeNode,
    search::Searcher,
    state::GameState,
};

/// Outcome of one work item: the candidate with its fresh score, or the
/// failure that aborted its search.
pub type NodeResult<M> = Result<GameTreeNode<M>, SearchError>;

/// Scratch sizing handed to every worker's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaLimits {
    pub shallow_depth: u32,
    pub capacity: usize,
}

struct WorkItem<P: GameState> {
    position: P,
    node: GameTreeNode<P::Move>,
    ply: u32,
    result: Sender<NodeResult<P::Move>>,
}

struct Queue<P: GameState> {
    items: Vec<WorkItem<P>>,
    /// Set by [`Worker::start`], cleared when the worker takes its batch.
    started: bool,
    finished: bool,
}

struct Inbox<P: GameState> {
    queue: Mutex<Queue<P>>,
    signal: Condvar,
}

/// One search thread.
pub struct Worker<P: GameState> {
    id: usize,
    inbox: Arc<Inbox<P>>,
    handle: Option<JoinHandle<()>>,
}

impl<P: GameState> Worker<P> {
    fn spawn(id: usize, tables: Arc<P::Tables>, player: P::Side, limits: ArenaLimits) -> Result<Self, EngineError> {
        let inbox = Arc::new(Inbox {
            queue: Mutex::new(Queue { items: Vec::new(), started: false, finished: false }),
            signal: Condvar::new(),
        });
        let handle = thread::Builder::new()
            .name(format!("negascout-worker-{id}"))
            .spawn({
                let inbox = Arc::clone(&inbox);
                move || run::<P>(id, &inbox, &*tables, player, SearchArena::new(limits.shallow_depth, limits.capacity))
            })
            .map_err(|err| EngineError::Spawn(err.to_string()))?;
        Ok(Self { id, inbox, handle: Some(handle) })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Queues `node` for a search of depth `ply` from the `position` snapshot,
    /// which must already have the node's move applied.
    ///
    /// The returned channel yields exactly one result once the worker has been
    /// started and reaches the item. If the worker shuts down first the
    /// channel disconnects instead.
    pub fn eval(&self, position: P, node: GameTreeNode<P::Move>, ply: u32) -> Receiver<NodeResult<P::Move>> {
        let (tx, rx) = bounded(1);
        self.inbox.queue.lock().items.push(WorkItem { position, node, ply, result: tx });
        rx
    }

    /// Releases everything queued so far. Does nothing on an empty queue.
    pub fn start(&self) {
        let mut queue = self.inbox.queue.lock();
        if !queue.items.is_empty() {
            queue.started = true;
            self.inbox.signal.notify_one();
        }
    }

    pub fn queued(&self) -> usize {
        self.inbox.queue.lock().items.len()
    }
}

impl<P: GameState> Drop for Worker<P> {
    fn drop(&mut self) {
        self.inbox.queue.lock().finished = true;
        self.inbox.signal.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run<P: GameState>(id: usize, inbox: &Inbox<P>, tables: &P::Tables, player: P::Side, mut arena: SearchArena<P::Move>) {
    debug!(worker = id, "search worker started");
    loop {
        let batch = {
            let mut queue = inbox.queue.lock();
            while !queue.finished && !(queue.started && !queue.items.is_empty()) {
                inbox.signal.wait(&mut queue);
            }
            if queue.finished {
                break;
            }
            queue.started = false;
            mem::take(&mut queue.items)
        };

        for item in batch {
            let WorkItem { mut position, mut node, ply, result } = item;
            arena.reset_nodes();
            let outcome = Searcher::new(tables, &mut position, &mut arena, ply)
                .search(&mut node, player)
                .map(|score| {
                    node.eval = Some(score);
                    node
                });
            if let Ok(scored) = &outcome {
                trace!(
                    worker = id,
                    ply,
                    mv = ?scored.mv,
                    score = scored.score(),
                    nodes = arena.nodes(),
                    "candidate searched"
                );
            }
            // The orchestrator may have given up on this iteration.
            let _ = result.send(outcome);
        }
    }
    debug!(worker = id, "search worker stopped");
}

/// Hardware concurrency, falling back to one.
pub fn default_threads() -> usize {
    thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

/// All workers of one engine, searching on behalf of a single player.
pub struct WorkerPool<P: GameState> {
    workers: Vec<Worker<P>>,
}

impl<P: GameState> WorkerPool<P> {
    /// Spawns `threads` workers (at least one).
    pub fn new(threads: usize, tables: Arc<P::Tables>, player: P::Side, limits: ArenaLimits) -> Result<Self, EngineError> {
        let workers = (0..threads.max(1))
            .map(|id| Worker::spawn(id, Arc::clone(&tables), player, limits))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(threads = workers.len(), "worker pool ready");
        Ok(Self { workers })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn workers(&self) -> &[Worker<P>] {
        &self.workers
    }

    /// Queues each candidate on the next worker in turn. Every candidate
    /// gets its own copy of `position` with the candidate's move applied.
    pub fn dispatch_round_robin<I>(&self, position: &P, nodes: I, ply: u32) -> Vec<Receiver<NodeResult<P::Move>>>
    where
        I: IntoIterator<Item = GameTreeNode<P::Move>>,
    {
        nodes
            .into_iter()
            .zip(self.workers.iter().cycle())
            .map(|(node, worker)| {
                let mut snapshot = position.clone();
                if let Some(mv) = node.mv {
                    snapshot.apply_move(mv);
                }
                worker.eval(snapshot, node, ply)
            })
            .collect()
    }

    pub fn start_all(&self) {
        for worker in &self.workers {
            worker.start();
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod pool_tests;
