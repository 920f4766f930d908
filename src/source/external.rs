// SPDX-License-Identifier: MIT
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::StreamSource;
use crate::error::{Result, StreamError};

/// Any seekable read/write stream that can be adapted as a backend
pub trait ByteStream: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> ByteStream for T {}

enum Inner {
    /// Closed on dispose
    Owned(Box<dyn ByteStream>),
    /// The caller keeps its own handle; dispose only detaches
    Shared(Arc<Mutex<dyn ByteStream>>),
    Released,
}

/// Adapter over a caller-provided stream.
///
/// An owned stream is dropped when the source is disposed. A shared stream
/// stays usable by the caller after every view over it is gone.
pub struct ExternalSource {
    inner: Inner,
    position: u64,
}

impl ExternalSource {
    /// Take ownership of `stream`
    pub fn owned<S: ByteStream + 'static>(stream: S) -> Self {
        Self {
            inner: Inner::Owned(Box::new(stream)),
            position: 0,
        }
    }

    /// Borrow a stream the caller keeps using
    pub fn shared(stream: Arc<Mutex<dyn ByteStream>>) -> Self {
        Self {
            inner: Inner::Shared(stream),
            position: 0,
        }
    }

    /// Identity of a shared stream, used to find an existing backend for it
    pub fn identity_of(stream: &Arc<Mutex<dyn ByteStream>>) -> usize {
        Arc::as_ptr(stream) as *const () as usize
    }

    /// Whether the adapter owns the wrapped stream
    pub fn owns_stream(&self) -> bool {
        matches!(self.inner, Inner::Owned(_))
    }

    fn with_stream<R>(
        &mut self,
        op: impl FnOnce(&mut dyn ByteStream) -> std::io::Result<R>,
    ) -> Result<R> {
        let position = self.position;
        let run = |stream: &mut dyn ByteStream| -> std::io::Result<R> {
            stream.seek(SeekFrom::Start(position))?;
            op(stream)
        };

        match &mut self.inner {
            Inner::Owned(stream) => Ok(run(stream.as_mut())?),
            Inner::Shared(stream) => {
                let mut guard = stream.lock();
                Ok(run(&mut *guard)?)
            }
            Inner::Released => Err(StreamError::Disposed),
        }
    }
}

impl std::fmt::Debug for ExternalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.inner {
            Inner::Owned(_) => "owned",
            Inner::Shared(_) => "shared",
            Inner::Released => "released",
        };
        f.debug_struct("ExternalSource")
            .field("state", &state)
            .field("position", &self.position)
            .finish()
    }
}

impl StreamSource for ExternalSource {
    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        if matches!(self.inner, Inner::Released) {
            return Err(StreamError::Disposed);
        }
        self.position = position;
        Ok(())
    }

    fn length(&mut self) -> Result<u64> {
        // Seek to the end without moving the adapter cursor
        self.with_stream(|stream| stream.seek(SeekFrom::End(0)))
    }

    fn set_length(&mut self, length: u64) -> Result<()> {
        let current = self.length()?;
        if length < current {
            return Err(StreamError::InvalidOperation(
                "external streams cannot be truncated".to_string(),
            ));
        }
        if length == current {
            return Ok(());
        }

        let padding = vec![0u8; (length - current) as usize];
        let saved = self.position;
        self.position = current;
        let written = self.with_stream(|stream| stream.write_all(&padding));
        self.position = saved;
        written
    }

    fn is_disposed(&self) -> bool {
        matches!(self.inner, Inner::Released)
    }

    fn can_grow(&self) -> bool {
        true
    }

    fn flush(&mut self) -> Result<()> {
        match &mut self.inner {
            Inner::Owned(stream) => Ok(stream.flush()?),
            Inner::Shared(stream) => Ok(stream.lock().flush()?),
            Inner::Released => Err(StreamError::Disposed),
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }

        let count = self.with_stream(|stream| {
            let mut total = 0;
            while total < buffer.len() {
                match stream.read(&mut buffer[total..]) {
                    Ok(0) => break,
                    Ok(n) => total += n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            Ok(total)
        })?;

        self.position += count as u64;
        Ok(count)
    }

    fn write(&mut self, buffer: &[u8]) -> Result<()> {
        self.with_stream(|stream| stream.write_all(buffer))?;
        self.position += buffer.len() as u64;
        Ok(())
    }

    fn dispose(&mut self) {
        if let Inner::Owned(stream) = &mut self.inner {
            if let Err(e) = stream.flush() {
                warn!("Failed to flush owned stream on dispose: {}", e);
            }
        }
        self.inner = Inner::Released;
    }
}
