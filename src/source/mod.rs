// SPDX-License-Identifier: MIT
//! Physical byte backends shared by [`DataStream`](crate::stream::DataStream) views.
//!
//! A backend owns a cursor and raw read/write primitives over exactly one
//! resource: a heap buffer ([`MemorySource`]), a file opened on first use
//! ([`LazyFileSource`]) or a caller-provided stream ([`ExternalSource`]).

mod external;
mod file;
mod memory;

pub use external::{ByteStream, ExternalSource};
pub use file::{FileOpenMode, LazyFileSource};
pub use memory::{BufferPool, MemorySource};

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;

/// Capability contract implemented by every physical backend.
///
/// Backends are not synchronized on their own; the view layer serializes
/// access through an internal mutex per resource.
#[cfg_attr(test, automock)]
pub trait StreamSource: Send {
    /// Current cursor of the backend
    fn position(&self) -> u64;

    fn set_position(&mut self, position: u64) -> Result<()>;

    /// Current size of the resource
    fn length(&mut self) -> Result<u64>;

    fn set_length(&mut self, length: u64) -> Result<()>;

    fn is_disposed(&self) -> bool;

    /// Whether writing past the end extends the resource
    fn can_grow(&self) -> bool;

    fn flush(&mut self) -> Result<()>;

    /// Read up to `buffer.len()` bytes, returning how many were read
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write all of `buffer` at the cursor
    fn write(&mut self, buffer: &[u8]) -> Result<()>;

    /// Release the underlying resource; further I/O fails
    fn dispose(&mut self);

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            1 => Ok(byte[0]),
            _ => Err(crate::error::StreamError::end_of_stream(1, 0)),
        }
    }

    fn write_byte(&mut self, value: u8) -> Result<()> {
        self.write(&[value])
    }
}

/// A backend shared by every view of one resource
pub(crate) type SharedSource = Arc<Mutex<Box<dyn StreamSource>>>;

/// Lock handed to callers that coordinate access to one physical resource
/// across threads.
///
/// Every view of the same resource returns a clone of the same lock. Views
/// never take this lock themselves.
#[derive(Clone, Default)]
pub struct StreamLock(Arc<Mutex<()>>);

impl StreamLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is acquired
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.0.lock()
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, ()>> {
        self.0.try_lock()
    }

    /// Whether both handles refer to the same lock
    pub fn ptr_eq(&self, other: &StreamLock) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for StreamLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamLock")
            .field("ptr", &Arc::as_ptr(&self.0))
            .field("locked", &self.0.is_locked())
            .finish()
    }
}
