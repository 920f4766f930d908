// SPDX-License-Identifier: MIT
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::StreamSource;
use crate::config::Config;
use crate::error::{Result, StreamError};

static POOL: Lazy<Mutex<Vec<Vec<u8>>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Process-wide pool of released memory buffers.
///
/// Disposed [`MemorySource`]s hand their buffer back so the next one can
/// reuse the allocation. Limits come from [`Config::current`].
pub struct BufferPool;

impl BufferPool {
    /// Take an empty buffer, reusing a pooled allocation when one exists
    pub fn take() -> Vec<u8> {
        POOL.lock().pop().unwrap_or_default()
    }

    /// Return a buffer to the pool; oversized buffers are dropped
    pub fn give_back(mut buffer: Vec<u8>) {
        let config = Config::current();
        if buffer.capacity() == 0 || buffer.capacity() > config.max_recycled_buffer_size {
            return;
        }

        buffer.clear();
        let mut pool = POOL.lock();
        if pool.len() < config.max_pooled_buffers {
            pool.push(buffer);
        }
    }

    /// Number of buffers waiting for reuse
    pub fn pooled() -> usize {
        POOL.lock().len()
    }
}

/// Heap-backed source that grows on demand
#[derive(Debug)]
pub struct MemorySource {
    buffer: Vec<u8>,
    position: u64,
    expandable: bool,
    recycle: bool,
    disposed: bool,
}

impl MemorySource {
    /// Empty, growable buffer
    pub fn new() -> Self {
        let recycle = Config::current().recycle_memory_buffers;
        let buffer = if recycle {
            BufferPool::take()
        } else {
            Vec::new()
        };

        Self {
            buffer,
            position: 0,
            expandable: true,
            recycle,
            disposed: false,
        }
    }

    /// Growable source initialized with `data`
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            buffer: data,
            position: 0,
            expandable: true,
            recycle: false,
            disposed: false,
        }
    }

    /// Source over `data` that can be overwritten but never resized
    pub fn fixed(data: Vec<u8>) -> Self {
        Self {
            expandable: false,
            ..Self::from_vec(data)
        }
    }

    /// Borrow the current content
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.disposed {
            Err(StreamError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSource for MemorySource {
    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.ensure_alive()?;
        self.position = position;
        Ok(())
    }

    fn length(&mut self) -> Result<u64> {
        self.ensure_alive()?;
        Ok(self.buffer.len() as u64)
    }

    fn set_length(&mut self, length: u64) -> Result<()> {
        self.ensure_alive()?;
        if !self.expandable {
            return Err(StreamError::InvalidOperation(
                "memory source is not resizable".to_string(),
            ));
        }

        let length = usize::try_from(length)
            .map_err(|_| StreamError::out_of_range("length", "exceeds addressable memory"))?;
        self.buffer.resize(length, 0);
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn can_grow(&self) -> bool {
        self.expandable
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_alive()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        self.ensure_alive()?;
        let start = (self.position as usize).min(self.buffer.len());
        let count = buffer.len().min(self.buffer.len() - start);

        buffer[..count].copy_from_slice(&self.buffer[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }

    fn write(&mut self, buffer: &[u8]) -> Result<()> {
        self.ensure_alive()?;
        let start = usize::try_from(self.position)
            .map_err(|_| StreamError::out_of_range("position", "exceeds addressable memory"))?;
        let end = start
            .checked_add(buffer.len())
            .ok_or_else(|| StreamError::out_of_range("position", "write overflows"))?;

        if end > self.buffer.len() {
            if !self.expandable {
                return Err(StreamError::InvalidOperation(
                    "memory source is not resizable".to_string(),
                ));
            }
            self.buffer.resize(end, 0);
        }

        self.buffer[start..end].copy_from_slice(buffer);
        self.position = end as u64;
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        self.disposed = true;
        let buffer = std::mem::take(&mut self.buffer);
        if self.recycle {
            BufferPool::give_back(buffer);
        }
    }
}
