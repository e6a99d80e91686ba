// Item registry
//
// This module provides the ItemRegistry which holds the tracked workshop items behind
// Arc<RwLock<T>> and emits change events for whatever presentation layer is attached.

use crate::models::{CopyStatus, TrackedItem, WorkshopRecord};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Change events emitted when the registry is modified
///
/// Subscribers run on their own context (a CLI loop, a GUI thread) and are expected to
/// re-read the registry on the thread that renders it.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryChange {
    /// A parsed snapshot has been merged into the registry
    ItemsReconciled {
        total: usize,
        added: usize,
        updated: usize,
        removed: usize,
    },

    /// One item's copy status has changed
    ItemStatusChanged {
        id: String,
        status: CopyStatus,
        message: Option<String>,
    },

    /// Non-successful items were put back to NotCopied before a new batch
    StatusesReset {
        reset: usize,
    },
}

/// The tracked items, keyed by workshop id in insertion order
#[derive(Clone, Debug, Default)]
pub struct RegistryState {
    items: IndexMap<String, TrackedItem>,
}

impl RegistryState {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TrackedItem> {
        self.items.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedItem> {
        self.items.values()
    }

    /// Number of items that still need copying
    pub fn actual_copy_count(&self) -> usize {
        self.items.values().filter(|item| !item.is_copied()).count()
    }
}

/// Thread-safe store of the tracked workshop items
///
/// This is the single piece of shared mutable state in the application:
/// - the watcher callback merges parsed snapshots in via [`reconcile()`](Self::reconcile)
/// - the copy worker records progress via [`set_item_status()`](Self::set_item_status)
/// - the presentation layer reads via [`items()`](Self::items) or [`read()`](Self::read)
///
/// Every mutation replaces whole [`TrackedItem`] values under the write lock, so a
/// reader never observes a record from one update paired with a status from another.
pub struct ItemRegistry {
    state: Arc<RwLock<RegistryState>>,

    /// Broadcast channel for registry change events
    change_tx: broadcast::Sender<RegistryChange>,
}

impl ItemRegistry {
    /// Create an empty registry with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            change_tx,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, change: RegistryChange) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.change_tx.send(change);
    }

    /// Execute a function with read access to the registry
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&RegistryState) -> R,
    {
        let state = self.read_state();
        f(&state)
    }

    /// Ordered copy of every tracked item
    pub fn items(&self) -> Vec<TrackedItem> {
        self.read(|state| state.iter().cloned().collect())
    }

    pub fn item(&self, id: &str) -> Option<TrackedItem> {
        self.read(|state| state.get(id).cloned())
    }

    pub fn total_count(&self) -> usize {
        self.read(RegistryState::len)
    }

    /// Count of items whose status is not Success, i.e. the work a new batch would do
    pub fn actual_copy_count(&self) -> usize {
        self.read(RegistryState::actual_copy_count)
    }

    /// Subscribe to registry change events
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryChange> {
        self.change_tx.subscribe()
    }

    /// Merge a parsed snapshot into the registry
    ///
    /// Existing ids get the new record while keeping their copy status, unknown ids are
    /// added as NotCopied, and every tracked id missing from the snapshot is removed.
    /// `None` or an empty snapshot clears the registry.
    ///
    /// Exactly one [`RegistryChange::ItemsReconciled`] is emitted per call.
    pub fn reconcile(&self, snapshot: Option<&[WorkshopRecord]>) -> RegistryChange {
        let snapshot = snapshot.unwrap_or_default();

        let change = {
            let mut state = self.write_state();

            let mut added = 0;
            let mut updated = 0;
            let mut current_ids = HashSet::with_capacity(snapshot.len());

            for record in snapshot {
                current_ids.insert(record.id.as_str());

                match state.items.get_mut(&record.id) {
                    Some(existing) => {
                        if existing.record != *record {
                            *existing = existing.with_record(record.clone());
                            updated += 1;
                        }
                    }
                    None => {
                        state
                            .items
                            .insert(record.id.clone(), TrackedItem::new(record.clone()));
                        added += 1;
                    }
                }
            }

            let before = state.items.len();
            state.items.retain(|id, _| current_ids.contains(id.as_str()));
            let removed = before - state.items.len();

            RegistryChange::ItemsReconciled {
                total: state.items.len(),
                added,
                updated,
                removed,
            }
        };

        tracing::debug!("Reconciled workshop snapshot: {:?}", change);
        self.emit(change.clone());

        change
    }

    /// Put every item that is not Success back to NotCopied and clear its message
    ///
    /// Called before a new batch so failed or interrupted items are retried while
    /// successful ones are skipped.
    pub fn reset_non_success_statuses(&self) -> usize {
        let reset = {
            let mut state = self.write_state();
            let mut reset = 0;

            for item in state.items.values_mut() {
                if item.copy_status != CopyStatus::Success {
                    *item = item.with_status(CopyStatus::NotCopied, None);
                    reset += 1;
                }
            }

            reset
        };

        self.emit(RegistryChange::StatusesReset { reset });
        reset
    }

    /// Replace one item's copy status
    ///
    /// # Returns
    /// `false` if the id is no longer tracked (it may have been reconciled away while a
    /// copy job was running)
    pub fn set_item_status(&self, id: &str, status: CopyStatus, message: Option<String>) -> bool {
        let updated = {
            let mut state = self.write_state();
            match state.items.get_mut(id) {
                Some(item) => {
                    *item = item.with_status(status, message);
                    Some(item.copy_message.clone())
                }
                None => None,
            }
        };

        match updated {
            Some(message) => {
                self.emit(RegistryChange::ItemStatusChanged {
                    id: id.to_string(),
                    status,
                    message,
                });
                true
            }
            None => {
                tracing::debug!("Status update for untracked item {} ignored", id);
                false
            }
        }
    }
}

impl Default for ItemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Cloning shares the underlying state and channel
impl Clone for ItemRegistry {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            change_tx: self.change_tx.clone(),
        }
    }
}
