// SPDX-License-Identifier: MIT
//! Process-wide table of live backends and the number of views using each.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Result, StreamError};
use crate::source::{SharedSource, StreamLock, StreamSource};

static ARENA: Lazy<Mutex<ArenaState>> = Lazy::new(|| Mutex::new(ArenaState::default()));

/// Key of one backend in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

struct ArenaEntry {
    source: SharedSource,
    lock: StreamLock,
    views: usize,
    /// Identity of the caller-owned stream this backend adapts, if any
    identity: Option<usize>,
}

#[derive(Default)]
struct ArenaState {
    next_id: u64,
    entries: HashMap<SourceId, ArenaEntry>,
    by_identity: HashMap<usize, SourceId>,
}

impl ArenaState {
    fn insert(&mut self, source: Box<dyn StreamSource>, identity: Option<usize>) -> SourceHandle {
        self.next_id += 1;
        let id = SourceId(self.next_id);
        let entry = ArenaEntry {
            source: Arc::new(Mutex::new(source)),
            lock: StreamLock::new(),
            views: 1,
            identity,
        };
        let handle = SourceHandle {
            id,
            source: Arc::clone(&entry.source),
            lock: entry.lock.clone(),
        };

        if let Some(identity) = identity {
            self.by_identity.insert(identity, id);
        }
        self.entries.insert(id, entry);
        debug!(source = %id, ?identity, "Registered stream source");
        handle
    }

    fn acquire(&mut self, id: SourceId) -> Option<SourceHandle> {
        let entry = self.entries.get_mut(&id)?;
        entry.views += 1;
        trace!(source = %id, views = entry.views, "Acquired stream source");
        Some(SourceHandle {
            id,
            source: Arc::clone(&entry.source),
            lock: entry.lock.clone(),
        })
    }
}

/// A view's claim on one arena entry
pub(crate) struct SourceHandle {
    id: SourceId,
    source: SharedSource,
    lock: StreamLock,
}

impl SourceHandle {
    pub(crate) fn id(&self) -> SourceId {
        self.id
    }

    pub(crate) fn source(&self) -> &SharedSource {
        &self.source
    }

    pub(crate) fn lock(&self) -> &StreamLock {
        &self.lock
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle").field("id", &self.id).finish()
    }
}

/// Reference counts of every backend in use.
///
/// Views register a backend when they create it and acquire an existing one
/// when they share it. Each view releases its handle once; the backend is
/// disposed when the last handle is released. The arena lock only guards the
/// table and is never held while a backend is disposed.
pub(crate) struct SourceArena;

impl SourceArena {
    /// Add a new backend with one view
    pub(crate) fn register(source: Box<dyn StreamSource>) -> SourceHandle {
        ARENA.lock().insert(source, None)
    }

    /// Share the backend registered for `identity`, creating it with `make`
    /// when none is live
    pub(crate) fn register_shared(
        identity: usize,
        make: impl FnOnce() -> Box<dyn StreamSource>,
    ) -> SourceHandle {
        let mut state = ARENA.lock();
        if let Some(&id) = state.by_identity.get(&identity) {
            if let Some(handle) = state.acquire(id) {
                return handle;
            }
        }
        state.insert(make(), Some(identity))
    }

    /// Add one view to the backend behind `handle`
    pub(crate) fn acquire(handle: &SourceHandle) -> Result<SourceHandle> {
        ARENA
            .lock()
            .acquire(handle.id)
            .ok_or(StreamError::Disposed)
    }

    /// Drop one view; disposes the backend when it was the last one.
    ///
    /// Returns whether the backend was released.
    pub(crate) fn release(handle: SourceHandle) -> bool {
        let released = {
            let mut state = ARENA.lock();
            let Some(entry) = state.entries.get_mut(&handle.id) else {
                return false;
            };

            entry.views = entry.views.saturating_sub(1);
            trace!(source = %handle.id, views = entry.views, "Released stream view");
            if entry.views > 0 {
                return false;
            }

            let entry = state.entries.remove(&handle.id);
            if let Some(identity) = entry.as_ref().and_then(|e| e.identity) {
                state.by_identity.remove(&identity);
            }
            entry
        };

        match released {
            Some(entry) => {
                entry.source.lock().dispose();
                debug!(source = %handle.id, "Disposed stream source");
                true
            }
            None => false,
        }
    }

    /// Number of views holding the backend, zero once it is released
    pub(crate) fn view_count(id: SourceId) -> usize {
        ARENA.lock().entries.get(&id).map_or(0, |entry| entry.views)
    }

    /// Whether a backend is registered for `identity`
    #[cfg(test)]
    pub(crate) fn is_registered(identity: usize) -> bool {
        ARENA.lock().by_identity.contains_key(&identity)
    }
}
