//! In-memory presenter store.
//!
//! Retains presenters by (logical type, tag) for as long as the owning
//! context lives. Nothing is persisted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{HafizError, PresenterTypeMismatchError, Result};
use crate::key::{ClassKey, PresenterType, StoreKey, Tag};
use crate::presenter::PresenterHandle;

type Entry = Arc<OnceCell<PresenterHandle>>;

/// Keyed cache of live presenters.
///
/// Each key owns a [`OnceCell`]. The map lock is only held to find or
/// create that cell, so constructions for different keys run in
/// parallel, while racers on the same key wait for the one constructor.
#[derive(Default)]
pub struct PresenterStore {
    entries: Mutex<HashMap<StoreKey, Entry>>,
}

impl PresenterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The presenter stored under (`presenter_type`, `tag`), if it is an
    /// `expected` one.
    pub fn get(
        &self,
        presenter_type: PresenterType,
        tag: &Tag,
        expected: &ClassKey,
    ) -> Option<PresenterHandle> {
        let key = StoreKey::new(presenter_type, tag.clone());
        let entry = self.entries.lock().get(&key).cloned()?;
        entry.get().filter(|handle| handle.class() == *expected).cloned()
    }

    /// Stores `handle` under (`presenter_type`, `tag`), replacing any
    /// previous entry.
    pub fn add(&self, presenter_type: PresenterType, tag: Tag, handle: PresenterHandle) {
        let key = StoreKey::new(presenter_type, tag);
        debug!(key = %key, class = %handle.class(), "Storing presenter");
        self.entries.lock().insert(key, Arc::new(OnceCell::with_value(handle)));
    }

    /// Returns the stored presenter, or runs `construct` exactly once for
    /// this key and stores its result.
    ///
    /// Concurrent callers for the same key all observe the presenter of
    /// the single successful construction. A failed construction leaves
    /// the key empty.
    ///
    /// `construct` must not resolve the same (`presenter_type`, `tag`)
    /// again: the nested call waits on the construction it is part of
    /// and never returns.
    ///
    /// # Errors
    /// - [`HafizError::PresenterTypeMismatch`] if the key is held by a
    ///   presenter of another class
    /// - whatever `construct` returns
    pub fn get_or_try_insert(
        &self,
        presenter_type: PresenterType,
        tag: &Tag,
        expected: &ClassKey,
        construct: impl FnOnce() -> Result<PresenterHandle>,
    ) -> Result<PresenterHandle> {
        let key = StoreKey::new(presenter_type, tag.clone());
        let entry = self.entries.lock().entry(key.clone()).or_default().clone();

        let mut constructed = false;
        let handle = match entry.get_or_try_init(|| {
            constructed = true;
            construct()
        }) {
            Ok(handle) => handle,
            Err(err) => {
                self.discard_failed(&key, &entry);
                return Err(err);
            }
        };

        if handle.class() != *expected {
            return Err(HafizError::PresenterTypeMismatch(PresenterTypeMismatchError {
                presenter_type,
                tag: tag.clone(),
                expected: *expected,
                found: handle.class(),
            }));
        }

        if !constructed {
            trace!(%presenter_type, %tag, "Reusing stored presenter");
        }
        Ok(handle.clone())
    }

    // Drops the cell of a failed construction unless another caller still
    // waits on it (map + `entry` are the only owners then).
    fn discard_failed(&self, key: &StoreKey, entry: &Entry) {
        let mut entries = self.entries.lock();
        let unused = entries.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, entry) && current.get().is_none() && Arc::strong_count(current) == 2
        });
        if unused {
            entries.remove(key);
            trace!(key = %key, "Dropped empty entry after failed construction");
        }
    }

    /// Evicts the presenter stored under (`presenter_type`, `tag`).
    pub fn remove(&self, presenter_type: PresenterType, tag: &Tag) -> Option<PresenterHandle> {
        let key = StoreKey::new(presenter_type, tag.clone());
        let removed = self.entries.lock().remove(&key)?;
        debug!(key = %key, "Evicted presenter");
        removed.get().cloned()
    }

    /// Number of stored presenters.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|entry| entry.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of all stored presenters, in no particular order.
    pub fn keys(&self) -> Vec<StoreKey> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.get().is_some())
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl fmt::Debug for PresenterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenterStore")
            .field("presenters", &self.len())
            .finish()
    }
}
