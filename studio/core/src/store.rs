//! Card State Store
//!
//! The one place the session's [`CardConfig`] lives. The store is owned by
//! whoever owns the session and handed to the orchestrator, export surface
//! and presentation layer as an `Arc<CardStore>`; nothing reaches it through
//! globals.
//!
//! Every [`CardStore::update`] swaps in a fresh `Arc<CardConfig>`, so an
//! observer holding the previous snapshot can detect a change with
//! [`Arc::ptr_eq`]. Observers subscribe through a `tokio::sync::watch`
//! channel and always see the latest value.

use std::sync::Arc;

use tokio::sync::watch;

use crate::card::{CardConfig, CardUpdate};

/// Single source of truth for the session's card
#[derive(Debug)]
pub struct CardStore {
    tx: watch::Sender<Arc<CardConfig>>,
}

impl Default for CardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CardStore {
    /// Create a store holding a default card
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CardConfig::default())
    }

    /// Create a store holding `config`
    #[must_use]
    pub fn with_config(config: CardConfig) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(config));
        Self { tx }
    }

    /// Current card, by value
    #[must_use]
    pub fn get(&self) -> CardConfig {
        CardConfig::clone(&self.tx.borrow())
    }

    /// Current card as a shared immutable snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<CardConfig> {
        Arc::clone(&self.tx.borrow())
    }

    /// Merge `update` into the current card and notify observers
    ///
    /// The merge happens under the channel's write lock, so concurrent
    /// updates never lose each other's fields.
    pub fn update(&self, update: CardUpdate) {
        self.tx.send_modify(|current| {
            *current = Arc::new(update.apply(current));
        });
        tracing::debug!(?update, "Card updated");
    }

    /// Register an observer
    ///
    /// The receiver starts out holding the current card.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<CardConfig>> {
        self.tx.subscribe()
    }

    /// Number of live observers
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
