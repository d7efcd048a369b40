//! The engine controller: owns the game position, the cached search tree, the
//! worker pool and a background thread that searches on request.

use std::{
    cell::RefCell,
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex, ReentrantMutex};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::{
    config::EngineConfig,
    error::EngineError,
    events::{AiEvent, EventBus},
    node::{sort_by_score, GameTreeNode},
    pool::WorkerPool,
    state::{GameState, Side},
};

/// Result of one completed search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision<M> {
    pub mv: M,
    pub score: f64,
    /// The best score cleared the mate cutoff and was played without
    /// tie-breaking.
    pub forced: bool,
    /// Size of the top bucket the move was drawn from.
    pub similar: usize,
    /// Deepest iteration that completed.
    pub ply: u32,
}

/// The cached tree together with the history length it was built for.
struct CachedRoot<M> {
    node: GameTreeNode<M>,
    history_len: usize,
}

struct Signal {
    playing: bool,
    finished: bool,
}

struct Shared<P: GameState> {
    side: P::Side,
    config: EngineConfig,
    tables: Arc<P::Tables>,
    position: ReentrantMutex<RefCell<P>>,
    root: Mutex<Option<CachedRoot<P::Move>>>,
    signal: Mutex<Signal>,
    wake: Condvar,
    searching: AtomicBool,
    stop_requested: AtomicBool,
    pool: WorkerPool<P>,
    events: EventBus<P::Move, P::Side>,
    rng: Mutex<StdRng>,
}

/// Clears the in-progress flags however a search ends.
struct ActiveSearch<'a> {
    searching: &'a AtomicBool,
    stop_requested: &'a AtomicBool,
}

impl Drop for ActiveSearch<'_> {
    fn drop(&mut self) {
        self.stop_requested.store(false, Ordering::Release);
        self.searching.store(false, Ordering::Release);
    }
}

/// A game-playing engine for one side.
///
/// Moves reach it in three ways: [`Ai::play`] asks the background thread to
/// search and play for its own side, [`Ai::play_move`] applies a move chosen
/// elsewhere, and [`Ai::greet`] mirrors another engine's moves automatically.
/// All of them report through [`Ai::subscribe`].
pub struct Ai<P: GameState> {
    shared: Arc<Shared<P>>,
    thinker: Option<JoinHandle<()>>,
}

impl<P: GameState> Ai<P> {
    /// An engine for `side`, starting from the initial position.
    pub fn new(side: P::Side, config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_position(side, config, P::initial())
    }

    pub fn with_position(side: P::Side, config: EngineConfig, position: P) -> Result<Self, EngineError> {
        config.validate()?;
        let tables = Arc::new(P::generate_tables());
        let pool = WorkerPool::new(config.thread_count(), Arc::clone(&tables), side, config.arena_limits())?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let shared = Arc::new(Shared {
            side,
            config,
            tables,
            position: ReentrantMutex::new(RefCell::new(position)),
            root: Mutex::new(None),
            signal: Mutex::new(Signal { playing: false, finished: false }),
            wake: Condvar::new(),
            searching: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            pool,
            events: EventBus::new(),
            rng: Mutex::new(rng),
        });

        let thinker = thread::Builder::new()
            .name("negascout-ai".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || shared.think_loop()
            })
            .map_err(|err| EngineError::Spawn(err.to_string()))?;

        info!(
            side = ?shared.side,
            threads = shared.pool.len(),
            max_ply = shared.config.max_ply,
            "engine ready"
        );
        Ok(Self { shared, thinker: Some(thinker) })
    }

    pub fn side(&self) -> P::Side {
        self.shared.side
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn tables(&self) -> &P::Tables {
        &self.shared.tables
    }

    /// A snapshot of the current position.
    pub fn position(&self) -> P {
        self.shared.position.lock().borrow().clone()
    }

    pub fn subscribe(&self) -> Receiver<AiEvent<P::Move, P::Side>> {
        self.shared.events.subscribe()
    }

    /// True from [`Ai::play`] until the background search has played its
    /// move or failed.
    pub fn is_playing(&self) -> bool {
        self.shared.signal.lock().playing
    }

    /// Asks the background thread to search and play a move for our side.
    pub fn play(&self) {
        self.shared.play();
    }

    /// Applies `mv` for whoever is on move.
    pub fn play_move(&self, mv: P::Move) -> Result<(), EngineError> {
        self.shared.play_move(mv)
    }

    /// Takes back the last move and discards the cached tree.
    pub fn undo(&self) -> Result<Option<P::Move>, EngineError> {
        self.shared.undo()
    }

    /// Replaces the position and discards the cached tree.
    pub fn setup(&self, position: P) -> Result<(), EngineError> {
        self.shared.setup(position)
    }

    /// Like [`Ai::setup`], parsing the position from text.
    pub fn setup_from(&self, text: &str) -> Result<(), EngineError> {
        let position = P::parse_setup(text).map_err(|err| EngineError::InvalidSetup(err.to_string()))?;
        self.shared.setup(position)
    }

    /// Ends the running or requested search after its current iteration.
    /// Ignored while idle, so it never cuts short a later search.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Runs one full search on the calling thread and returns the chosen move
    /// without applying it. `Ok(None)` means our side has no legal move.
    pub fn execute(&self) -> Result<Option<Decision<P::Move>>, EngineError> {
        self.shared.execute()
    }

    /// Mirrors every move `opponent` plays for its own side into this engine.
    ///
    /// The relay only holds a weak reference to us and ends when either
    /// engine is dropped.
    pub fn greet(&self, opponent: &Ai<P>) -> Result<(), EngineError> {
        let events = opponent.subscribe();
        let theirs = opponent.side();
        let me = Arc::downgrade(&self.shared);
        thread::Builder::new()
            .name("negascout-relay".into())
            .spawn(move || relay(me, events, theirs))
            .map_err(|err| EngineError::Spawn(err.to_string()))?;
        debug!(ours = ?self.side(), theirs = ?theirs, "greeted opponent");
        Ok(())
    }
}

impl<P: GameState> Drop for Ai<P> {
    fn drop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::Release);
        self.shared.signal.lock().finished = true;
        self.shared.wake.notify_all();
        if let Some(handle) = self.thinker.take() {
            let _ = handle.join();
        }
    }
}

fn relay<P: GameState>(me: Weak<Shared<P>>, events: Receiver<AiEvent<P::Move, P::Side>>, theirs: P::Side) {
    for event in events {
        let AiEvent::Moved { mv, by } = event else { continue };
        if by != theirs {
            continue;
        }
        let Some(shared) = me.upgrade() else { break };
        if let Err(err) = shared.play_move(mv) {
            warn!(%err, %mv, "could not mirror opponent move");
        }
    }
}

impl<P: GameState> Shared<P> {
    fn busy(&self) -> bool {
        self.searching.load(Ordering::Acquire) || self.signal.lock().playing
    }

    fn stop(&self) {
        let signal = self.signal.lock();
        if signal.playing || self.searching.load(Ordering::Acquire) {
            self.stop_requested.store(true, Ordering::Release);
        }
    }

    fn play(&self) {
        self.stop_requested.store(false, Ordering::Release);
        self.signal.lock().playing = true;
        self.wake.notify_all();
    }

    fn play_move(&self, mv: P::Move) -> Result<(), EngineError> {
        let guard = self.position.lock();
        if self.busy() {
            return Err(EngineError::SearchInProgress);
        }
        let by = {
            let mut position = guard.borrow_mut();
            let by = position.side_to_move();
            let mut legal = Vec::new();
            position.legal_moves_into(&self.tables, by, &mut legal);
            if !legal.contains(&mv) {
                return Err(EngineError::IllegalMove(mv.to_string()));
            }
            position.apply_move(mv);
            by
        };
        debug!(%mv, ?by, "move applied");
        self.events.publish(AiEvent::Moved { mv, by });
        Ok(())
    }

    fn undo(&self) -> Result<Option<P::Move>, EngineError> {
        let guard = self.position.lock();
        if self.busy() {
            return Err(EngineError::SearchInProgress);
        }
        *self.root.lock() = None;
        let undone = guard.borrow_mut().undo_move();
        debug!(?undone, "move taken back");
        Ok(undone)
    }

    fn setup(&self, position: P) -> Result<(), EngineError> {
        let guard = self.position.lock();
        if self.busy() {
            return Err(EngineError::SearchInProgress);
        }
        *self.root.lock() = None;
        *guard.borrow_mut() = position;
        info!("position replaced");
        Ok(())
    }

    fn think_loop(&self) {
        let timeout = self.config.liveness_timeout();
        loop {
            {
                let mut signal = self.signal.lock();
                if !signal.playing && !signal.finished {
                    self.wake.wait_for(&mut signal, timeout);
                }
                if signal.finished {
                    break;
                }
                if !signal.playing {
                    continue;
                }
            }
            self.think();
        }
        debug!("background thread stopped");
    }

    /// One background turn: search, then play the result while still marked
    /// as playing so no external move can slip in between.
    fn think(&self) {
        match self.execute() {
            Ok(Some(decision)) => {
                let guard = self.position.lock();
                self.signal.lock().playing = false;
                guard.borrow_mut().apply_move(decision.mv);
                self.events.publish(AiEvent::Decided(decision.mv));
                self.events.publish(AiEvent::Moved { mv: decision.mv, by: self.side });
            }
            Ok(None) => {
                self.signal.lock().playing = false;
                info!("no legal move to play");
            }
            Err(err) => {
                self.signal.lock().playing = false;
                *self.root.lock() = None;
                error!(%err, "background search failed");
                self.events.publish(AiEvent::SearchFailed(err));
            }
        }
    }

    fn execute(&self) -> Result<Option<Decision<P::Move>>, EngineError> {
        let started = Instant::now();

        let guard = self.position.lock();
        if self.searching.swap(true, Ordering::AcqRel) {
            return Err(EngineError::SearchInProgress);
        }
        let _active = ActiveSearch { searching: &self.searching, stop_requested: &self.stop_requested };
        let prepared = self.prepare();
        drop(guard);
        let (snapshot, mut root) = prepared?;

        let history_len = snapshot.move_history().len();
        let mut pending = root.children.take().unwrap_or_default();
        if pending.is_empty() {
            return Ok(None);
        }

        let mut ranked = Vec::with_capacity(pending.len());
        let mut completed = 0;
        for ply in 1..=self.config.max_ply {
            if ply > 1 && self.stop_requested.load(Ordering::Acquire) {
                info!(ply = completed, "search stopped early");
                break;
            }
            if pending.is_empty() {
                mem::swap(&mut pending, &mut ranked);
            }

            let receivers = self.pool.dispatch_round_robin(&snapshot, pending.drain(..), ply);
            self.pool.start_all();
            for rx in receivers {
                let node = rx.recv().map_err(|_| EngineError::WorkerDisconnected)??;
                ranked.push(node);
            }
            sort_by_score(&mut ranked);
            completed = ply;
            debug!(ply, best = ranked[0].score(), candidates = ranked.len(), "iteration complete");
        }

        let Some((node, decision)) = self.choose(ranked, history_len, completed) else {
            return Ok(None);
        };
        *self.root.lock() = Some(CachedRoot { node, history_len: history_len + 1 });

        info!(
            mv = %decision.mv,
            score = decision.score,
            ply = decision.ply,
            similar = decision.similar,
            forced = decision.forced,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "move chosen"
        );
        Ok(Some(decision))
    }

    /// Brings the cached tree in line with the position and orders the root's
    /// children for dispatch. Returns the position snapshot to search from.
    fn prepare(&self) -> Result<(P, GameTreeNode<P::Move>), EngineError> {
        let guard = self.position.lock();
        let mut position = guard.borrow_mut();
        if position.side_to_move() != self.side {
            return Err(EngineError::OutOfTurn);
        }
        let mut root = self.sync_root(&mut position)?;
        self.order_children(&mut position, &mut root);
        Ok((position.clone(), root))
    }

    /// The root node for the current position.
    ///
    /// When exactly one move was played since the cached tree was built, the
    /// child for that move becomes the new root and keeps its subtree.
    /// Otherwise the tree is rebuilt from scratch.
    fn sync_root(&self, position: &mut P) -> Result<GameTreeNode<P::Move>, EngineError> {
        let len = position.move_history().len();
        let cached = self.root.lock().take();

        let mut root = match cached {
            Some(CachedRoot { mut node, history_len }) if history_len + 1 == len && self.on_path(&node, position, history_len) => {
                let last = position.move_history()[len - 1];
                if !node.is_expanded() {
                    position.undo_move();
                    node.expand(&mut *position, &self.tables, self.side.opponent(), &mut Vec::new());
                    position.apply_move(last);
                }
                let child = node
                    .take_child(last)
                    .ok_or_else(|| EngineError::NodeNotFound { mv: last.to_string() })?;
                debug!(mv = %last, "reusing cached subtree");
                child
            }
            Some(_) => {
                debug!("cached tree is stale, rebuilding");
                GameTreeNode::root(position.move_history().last().copied())
            }
            None => GameTreeNode::root(position.move_history().last().copied()),
        };

        if !root.is_expanded() {
            root.expand(&mut *position, &self.tables, self.side, &mut Vec::new());
        }
        Ok(root)
    }

    /// The cached root must have been reached by the move the history records
    /// for it.
    fn on_path(&self, node: &GameTreeNode<P::Move>, position: &P, history_len: usize) -> bool {
        match history_len.checked_sub(1) {
            Some(index) => node.mv == position.move_history().get(index).copied(),
            None => true,
        }
    }

    /// Gives unscored children a static score after their move and sorts them
    /// best first.
    fn order_children(&self, position: &mut P, root: &mut GameTreeNode<P::Move>) {
        let opponent = self.side.opponent();
        if let Some(children) = root.children.as_mut() {
            for child in children.iter_mut().filter(|c| c.eval.is_none()) {
                let Some(mv) = child.mv else { continue };
                position.apply_move(mv);
                child.eval = Some(-position.evaluate(&self.tables, opponent, 1));
                position.undo_move();
            }
        }
        root.sort_children();
    }

    /// Picks the move from the final ranking, best first.
    fn choose(
        &self,
        mut ranked: Vec<GameTreeNode<P::Move>>,
        history_len: usize,
        ply: u32,
    ) -> Option<(GameTreeNode<P::Move>, Decision<P::Move>)> {
        let top = ranked.first()?.score();
        let (index, similar, forced) = if top > self.config.mate_cutoff {
            (0, 1, true)
        } else {
            let decimator = self.config.decimator_step * (history_len as f64 + 1.0);
            let similar = similar_prefix(&ranked, decimator);
            (self.rng.lock().gen_range(0..similar), similar, false)
        };
        let node = ranked.swap_remove(index);
        let mv = node.mv?;
        let score = node.score();
        Some((node, Decision { mv, score, forced, similar, ply }))
    }
}

/// Number of leading candidates (sorted best first) whose score lands in the
/// same `floor(score * decimator)` bucket as the best one.
///
/// The decimator grows with the game, so buckets narrow and play becomes
/// less random as it goes on.
pub fn similar_prefix<M>(ranked: &[GameTreeNode<M>], decimator: f64) -> usize {
    let bucket = |node: &GameTreeNode<M>| (node.eval.unwrap_or(f64::NEG_INFINITY) * decimator).floor();
    let Some(best) = ranked.first().map(bucket) else {
        return 0;
    };
    ranked.iter().take_while(|node| bucket(node) == best).count()
}

#[cfg(test)]
#[path = "ai_tests.rs"]
mod ai_tests;
