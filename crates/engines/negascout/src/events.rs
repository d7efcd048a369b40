//! Notifications published by an [`Ai`](crate::Ai).

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub enum AiEvent<M, S> {
    /// The engine finished a search and chose `M`.
    Decided(M),
    /// `mv` was applied to the engine's position, played by `by`.
    Moved { mv: M, by: S },
    /// A background search failed; the cached tree has been discarded.
    SearchFailed(EngineError),
}

/// Fan-out of [`AiEvent`]s to any number of subscribers.
///
/// Subscribers whose receiver has been dropped are pruned on the next publish.
pub struct EventBus<M, S> {
    subscribers: Mutex<Vec<Sender<AiEvent<M, S>>>>,
}

impl<M, S> Default for EventBus<M, S> {
    fn default() -> Self {
        Self { subscribers: Mutex::new(Vec::new()) }
    }
}

impl<M: Clone, S: Clone> EventBus<M, S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<AiEvent<M, S>> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: AiEvent<M, S>) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
