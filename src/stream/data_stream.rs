// SPDX-License-Identifier: MIT
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::arena::{SourceArena, SourceHandle, SourceId};
use crate::config::Config;
use crate::error::{Result, StreamError};
use crate::format::{BinaryFormat, ConverterRegistry};
use crate::io::BinaryStream;
use crate::source::{
    ByteStream, ExternalSource, FileOpenMode, LazyFileSource, MemorySource, StreamLock,
    StreamSource,
};

static NEXT_VIEW: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        ViewId(NEXT_VIEW.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Origin of a [`DataStream::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekMode {
    #[default]
    Start,
    Current,
    End,
}

/// A bounded window over a shared byte backend.
///
/// Every view has an offset into the backend, a length and a cursor in
/// `0..=length`. Views over the same backend share it, along with its
/// [`StreamLock`]; the backend is disposed when the last view is.
///
/// Windows created with an explicit offset and length are fixed: they never
/// grow, and writes past their end fail. Views over a whole resource grow as
/// they are written to.
///
/// Views do not synchronize with each other. Callers sharing a backend across
/// threads coordinate through [`DataStream::lock`].
#[derive(Debug)]
pub struct DataStream {
    handle: Option<SourceHandle>,
    id: ViewId,
    parent: Option<ViewId>,
    offset: u64,
    length: u64,
    position: u64,
    fixed: bool,
    positions: Vec<u64>,
}

fn check_window(offset: u64, length: u64, available: u64) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= available => Ok(()),
        _ => Err(StreamError::out_of_range(
            "offset",
            format!("window {offset}+{length} exceeds the {available} bytes available"),
        )),
    }
}

impl DataStream {
    fn with_handle(
        handle: SourceHandle,
        offset: u64,
        length: u64,
        fixed: bool,
        parent: Option<ViewId>,
    ) -> Self {
        Self {
            handle: Some(handle),
            id: ViewId::next(),
            parent,
            offset,
            length,
            position: 0,
            fixed,
            positions: Vec::new(),
        }
    }

    /// Empty growable view over a new memory buffer
    pub fn new() -> Self {
        let handle = SourceArena::register(Box::new(MemorySource::new()));
        Self::with_handle(handle, 0, 0, false, None)
    }

    /// View over the whole of `source`, taking ownership of it.
    ///
    /// The cursor starts where the backend's own cursor is, so an append-mode
    /// file view starts at the end of the existing content.
    pub fn from_source(source: impl StreamSource + 'static) -> Result<Self> {
        let mut source: Box<dyn StreamSource> = Box::new(source);
        if source.is_disposed() {
            return Err(StreamError::Disposed);
        }

        let length = source.length()?;
        let start = source.position().min(length);
        let handle = SourceArena::register(source);
        let mut view = Self::with_handle(handle, 0, length, false, None);
        view.position = start;
        Ok(view)
    }

    /// Fixed window over `source`, taking ownership of it
    pub fn from_source_window(
        source: impl StreamSource + 'static,
        offset: u64,
        length: u64,
    ) -> Result<Self> {
        let mut source: Box<dyn StreamSource> = Box::new(source);
        if source.is_disposed() {
            return Err(StreamError::Disposed);
        }

        check_window(offset, length, source.length()?)?;
        let start = source.position().saturating_sub(offset).min(length);
        let handle = SourceArena::register(source);
        let mut view = Self::with_handle(handle, offset, length, true, None);
        view.position = start;
        Ok(view)
    }

    /// Growable view initialized with `data`
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let length = data.len() as u64;
        let handle = SourceArena::register(Box::new(MemorySource::from_vec(data)));
        Self::with_handle(handle, 0, length, false, None)
    }

    /// Fixed window over `data`
    pub fn from_bytes_window(data: Vec<u8>, offset: u64, length: u64) -> Result<Self> {
        Self::from_source_window(MemorySource::fixed(data), offset, length)
    }

    /// View over a file opened on first use
    pub fn from_file(path: impl AsRef<Path>, mode: FileOpenMode) -> Result<Self> {
        Self::from_source(LazyFileSource::new(path, mode)?)
    }

    /// Fixed window over part of a file
    pub fn from_file_window(
        path: impl AsRef<Path>,
        mode: FileOpenMode,
        offset: u64,
        length: u64,
    ) -> Result<Self> {
        Self::from_source_window(LazyFileSource::new(path, mode)?, offset, length)
    }

    /// View over a stream the caller keeps using.
    ///
    /// Every view created from the same `Arc` shares one backend and one lock.
    /// Disposing the views never closes the stream.
    pub fn from_shared_stream(stream: Arc<Mutex<dyn ByteStream>>) -> Result<Self> {
        let handle = Self::register_shared_stream(stream);
        let length = handle.source().lock().length();
        match length {
            Ok(length) => Ok(Self::with_handle(handle, 0, length, false, None)),
            Err(e) => {
                SourceArena::release(handle);
                Err(e)
            }
        }
    }

    /// Fixed window over a stream the caller keeps using
    pub fn from_shared_stream_window(
        stream: Arc<Mutex<dyn ByteStream>>,
        offset: u64,
        length: u64,
    ) -> Result<Self> {
        let handle = Self::register_shared_stream(stream);
        let checked = handle
            .source()
            .lock()
            .length()
            .and_then(|available| check_window(offset, length, available));
        match checked {
            Ok(()) => Ok(Self::with_handle(handle, offset, length, true, None)),
            Err(e) => {
                SourceArena::release(handle);
                Err(e)
            }
        }
    }

    fn register_shared_stream(stream: Arc<Mutex<dyn ByteStream>>) -> SourceHandle {
        let identity = ExternalSource::identity_of(&stream);
        SourceArena::register_shared(identity, move || Box::new(ExternalSource::shared(stream)))
    }

    /// Fixed window over part of this view, sharing its backend
    pub fn substream(&self, offset: u64, length: u64) -> Result<DataStream> {
        let handle = self.handle()?;
        check_window(offset, length, self.length)?;

        let shared = SourceArena::acquire(handle)?;
        Ok(Self::with_handle(
            shared,
            self.offset + offset,
            length,
            true,
            Some(self.id),
        ))
    }

    fn handle(&self) -> Result<&SourceHandle> {
        self.handle.as_ref().ok_or(StreamError::Disposed)
    }

    fn ensure_alive(&self) -> Result<()> {
        self.handle().map(|_| ())
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    /// View this one was carved from
    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    /// Start of the view inside the backend
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Cursor relative to the start of the backend
    pub fn absolute_position(&self) -> u64 {
        self.offset + self.position
    }

    pub fn remaining(&self) -> u64 {
        self.length - self.position
    }

    pub fn end_of_stream(&self) -> bool {
        self.position >= self.length
    }

    pub fn is_disposed(&self) -> bool {
        self.handle.is_none()
    }

    /// Whether the length is fixed by an explicit window
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Lock shared by every view over the same backend
    pub fn lock(&self) -> Result<StreamLock> {
        Ok(self.handle()?.lock().clone())
    }

    /// Whether both views read and write the same backend
    pub fn shares_source_with(&self, other: &DataStream) -> bool {
        match (&self.handle, &other.handle) {
            (Some(a), Some(b)) => a.id() == b.id(),
            _ => false,
        }
    }

    /// Number of live views over this view's backend
    pub fn live_view_count(&self) -> usize {
        self.handle
            .as_ref()
            .map_or(0, |handle| SourceArena::view_count(handle.id()))
    }

    /// Arena key of the backend, `None` once disposed
    pub fn source_id(&self) -> Option<SourceId> {
        self.handle.as_ref().map(SourceHandle::id)
    }

    pub fn set_position(&mut self, position: u64) -> Result<()> {
        self.ensure_alive()?;
        if position > self.length {
            return Err(StreamError::out_of_range(
                "position",
                format!("{position} is outside 0..={}", self.length),
            ));
        }
        self.position = position;
        Ok(())
    }

    /// Change the length of a growable view.
    ///
    /// Shrinking moves the cursor back when it would be past the new end.
    /// The backend itself is not resized, so a view cannot grow beyond it.
    pub fn set_length(&mut self, length: u64) -> Result<()> {
        let handle = self.handle()?;
        if self.fixed {
            return Err(StreamError::InvalidOperation(
                "cannot change the length of a fixed window".to_string(),
            ));
        }

        let available = handle.source().lock().length()?;
        check_window(self.offset, length, available)?;

        self.length = length;
        self.position = self.position.min(length);
        Ok(())
    }

    /// Move the cursor relative to `mode`, returning the new position
    pub fn seek(&mut self, distance: i64, mode: SeekMode) -> Result<u64> {
        self.ensure_alive()?;
        let base = match mode {
            SeekMode::Start => 0,
            SeekMode::Current => self.position,
            SeekMode::End => self.length,
        };

        let target = base.checked_add_signed(distance).ok_or_else(|| {
            StreamError::out_of_range(
                "distance",
                format!("{distance} from {base} is before the start"),
            )
        })?;
        self.set_position(target)?;
        Ok(self.position)
    }

    /// Save the cursor and seek
    pub fn push_to_position(&mut self, distance: i64, mode: SeekMode) -> Result<()> {
        let current = self.position;
        self.seek(distance, mode)?;
        self.positions.push(current);
        Ok(())
    }

    /// Save the cursor without moving it
    pub fn push_current_position(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.positions.push(self.position);
        Ok(())
    }

    /// Restore the most recently saved cursor
    pub fn pop_position(&mut self) -> Result<()> {
        let Some(&position) = self.positions.last() else {
            return Err(StreamError::out_of_range(
                "positions",
                "no saved position to restore",
            ));
        };

        self.set_position(position)?;
        self.positions.pop();
        Ok(())
    }

    /// Number of saved positions
    pub fn saved_positions(&self) -> usize {
        self.positions.len()
    }

    /// Seek, run `action` and restore the cursor.
    ///
    /// The cursor is restored only when `action` succeeds. On error the saved
    /// position stays on the stack so the caller can pop it.
    pub fn run_in_position<R>(
        &mut self,
        distance: i64,
        mode: SeekMode,
        action: impl FnOnce(&mut DataStream) -> Result<R>,
    ) -> Result<R> {
        self.push_to_position(distance, mode)?;
        let value = action(self)?;
        self.pop_position()?;
        Ok(value)
    }

    /// Read into `buffer` from `absolute` without touching the cursor
    fn read_raw(&self, absolute: u64, buffer: &mut [u8]) -> Result<()> {
        let handle = self.handle()?;
        let mut source = handle.source().lock();
        source.set_position(absolute)?;

        let mut total = 0;
        while total < buffer.len() {
            let count = source.read(&mut buffer[total..])?;
            if count == 0 {
                return Err(StreamError::end_of_stream(
                    buffer.len() as u64,
                    total as u64,
                ));
            }
            total += count;
        }
        Ok(())
    }

    fn write_raw(&self, absolute: u64, buffer: &[u8]) -> Result<()> {
        let handle = self.handle()?;
        let mut source = handle.source().lock();
        source.set_position(absolute)?;
        source.write(buffer)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_bytes(&mut byte)?;
        Ok(byte[0])
    }

    /// Fill `buffer` from the cursor.
    ///
    /// Fails with [`StreamError::EndOfStream`] without reading anything when
    /// fewer than `buffer.len()` bytes remain.
    pub fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.ensure_alive()?;
        let available = self.remaining();
        if buffer.len() as u64 > available {
            return Err(StreamError::end_of_stream(buffer.len() as u64, available));
        }

        self.read_raw(self.absolute_position(), buffer)?;
        self.position += buffer.len() as u64;
        Ok(())
    }

    /// Read `count` bytes into a new vector
    pub fn read_to_vec(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; count];
        self.read_bytes(&mut buffer)?;
        Ok(buffer)
    }

    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Write `buffer` at the cursor, growing the view when it is not fixed
    pub fn write_bytes(&mut self, buffer: &[u8]) -> Result<()> {
        self.ensure_alive()?;
        let end = self
            .position
            .checked_add(buffer.len() as u64)
            .ok_or_else(|| StreamError::out_of_range("buffer", "write overflows the view"))?;

        if end > self.length && self.fixed {
            return Err(StreamError::InvalidOperation(format!(
                "cannot write {} bytes at {} past the end of a fixed {}-byte window",
                buffer.len(),
                self.position,
                self.length
            )));
        }

        if buffer.is_empty() {
            return Ok(());
        }

        self.write_raw(self.absolute_position(), buffer)?;
        self.position = end;
        self.length = self.length.max(end);
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.handle()?.source().lock().flush()
    }

    /// Copy the whole view into `other` at its cursor.
    ///
    /// The copy runs in chunks of [`Config::copy_buffer_size`] and leaves this
    /// view's cursor where it was.
    pub fn write_to(&self, other: &mut DataStream) -> Result<()> {
        self.write_segment_to(0, self.length, other)
    }

    /// Copy `length` bytes starting at `start` into `other` at its cursor
    pub fn write_segment_to(&self, start: u64, length: u64, other: &mut DataStream) -> Result<()> {
        self.ensure_alive()?;
        other.ensure_alive()?;
        check_window(start, length, self.length)?;

        let chunk_size = Config::current().copy_buffer_size.max(1);
        let mut buffer = vec![0u8; (length.min(chunk_size as u64)) as usize];
        let mut copied = 0u64;
        while copied < length {
            let count = (length - copied).min(buffer.len() as u64) as usize;
            self.read_raw(self.offset + start + copied, &mut buffer[..count])?;
            other.write_bytes(&buffer[..count])?;
            copied += count as u64;
        }
        Ok(())
    }

    /// Copy the whole view into a new file, creating parent directories
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StreamError::invalid_argument("path", "path is empty"));
        }
        self.ensure_alive()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        debug!(path = %path.display(), bytes = self.length, "Writing stream to file");
        let mut output = DataStream::from_file(path, FileOpenMode::Write)?;
        self.write_to(&mut output)?;
        output.flush()?;
        output.dispose();
        Ok(())
    }

    /// Compare the content of both views byte by byte.
    ///
    /// Cursors are not used or changed.
    pub fn compare(&self, other: &DataStream) -> Result<bool> {
        self.ensure_alive()?;
        other.ensure_alive()?;
        if self.length != other.length {
            return Ok(false);
        }

        let chunk_size = Config::current().copy_buffer_size.max(1) as u64;
        let size = self.length.min(chunk_size) as usize;
        let mut ours = vec![0u8; size];
        let mut theirs = vec![0u8; size];

        let mut compared = 0u64;
        while compared < self.length {
            let count = (self.length - compared).min(size as u64) as usize;
            self.read_raw(self.offset + compared, &mut ours[..count])?;
            other.read_raw(other.offset + compared, &mut theirs[..count])?;
            if ours[..count] != theirs[..count] {
                return Ok(false);
            }
            compared += count as u64;
        }
        Ok(true)
    }

    /// Convert the rest of the view, from the cursor, into a `T`
    pub fn read_format<T: Send + 'static>(&self, registry: &ConverterRegistry) -> Result<T> {
        let window = self.substream(self.position, self.remaining())?;
        registry.convert::<BinaryFormat, T>(BinaryFormat::new(window))
    }

    /// Release this view; the backend is disposed with its last view.
    ///
    /// Disposing twice does nothing.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.handle.take() {
            SourceArena::release(handle);
            self.positions.clear();
        }
    }
}

impl Default for DataStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DataStream {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl BinaryStream for DataStream {
    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        DataStream::set_position(self, position)
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()> {
        DataStream::read_bytes(self, buffer)
    }

    fn write_bytes(&mut self, buffer: &[u8]) -> Result<()> {
        DataStream::write_bytes(self, buffer)
    }
}

impl std::io::Read for DataStream {
    /// Short reads happen only at the end of the view
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let count = (buf.len() as u64).min(self.remaining()) as usize;
        self.read_bytes(&mut buf[..count])?;
        Ok(count)
    }
}

impl std::io::Write for DataStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(DataStream::flush(self)?)
    }
}

impl std::io::Seek for DataStream {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        let position = match pos {
            std::io::SeekFrom::Start(position) => {
                self.set_position(position)?;
                self.position
            }
            std::io::SeekFrom::Current(distance) => {
                DataStream::seek(self, distance, SeekMode::Current)?
            }
            std::io::SeekFrom::End(distance) => DataStream::seek(self, distance, SeekMode::End)?,
        };
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockStreamSource;
    use std::io::{Read, Seek, SeekFrom, Write};

    #[test]
    fn test_substream_window() {
        let stream = DataStream::from_bytes(vec![0x01, 0x02, 0x03]);
        let mut sub = stream.substream(1, 2).unwrap();

        assert_eq!(sub.position(), 0);
        assert_eq!(sub.length(), 2);
        assert_eq!(sub.offset(), 1);
        assert_eq!(sub.parent(), Some(stream.id()));
        assert_eq!(sub.read_to_vec(2).unwrap(), vec![0x02, 0x03]);
    }

    #[test]
    fn test_substream_out_of_parent_bounds() {
        let stream = DataStream::from_bytes(vec![0; 4]);
        assert!(matches!(
            stream.substream(3, 2),
            Err(StreamError::OutOfRange { .. })
        ));
        assert!(stream.substream(u64::MAX, 2).is_err());
        assert!(stream.substream(4, 0).is_ok());
    }

    #[test]
    fn test_nested_substream_offsets_accumulate() {
        let stream = DataStream::from_bytes((0u8..10).collect());
        let outer = stream.substream(2, 6).unwrap();
        let mut inner = outer.substream(1, 3).unwrap();

        assert_eq!(inner.offset(), 3);
        assert_eq!(inner.read_to_vec(3).unwrap(), vec![3, 4, 5]);
    }

    #[test]
    fn test_read_is_all_or_nothing() {
        let mut stream = DataStream::from_bytes(vec![1, 2, 3]);
        stream.set_position(2).unwrap();

        let mut buffer = [0u8; 2];
        let err = stream.read_bytes(&mut buffer).unwrap_err();
        assert!(matches!(
            err,
            StreamError::EndOfStream {
                requested: 2,
                available: 1
            }
        ));
        assert_eq!(stream.position(), 2);
    }

    #[test]
    fn test_write_grows_unbounded_view() {
        let mut stream = DataStream::new();
        stream.write_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(stream.length(), 3);
        assert_eq!(stream.position(), 3);

        stream.set_position(1).unwrap();
        stream.write_bytes(&[9, 9, 9]).unwrap();
        assert_eq!(stream.length(), 4);
    }

    #[test]
    fn test_fixed_window_rejects_growth() {
        let stream = DataStream::from_bytes(vec![0; 4]);
        let mut sub = stream.substream(1, 2).unwrap();

        sub.write_bytes(&[7, 7]).unwrap();
        assert!(matches!(
            sub.write_byte(1),
            Err(StreamError::InvalidOperation(_))
        ));
        assert!(matches!(
            sub.set_length(1),
            Err(StreamError::InvalidOperation(_))
        ));
        assert_eq!(stream.length(), 4);

        let mut check = stream.substream(0, 4).unwrap();
        assert_eq!(check.read_to_vec(4).unwrap(), vec![0, 7, 7, 0]);
    }

    #[test]
    fn test_set_length_clamps_position() {
        let mut stream = DataStream::from_bytes(vec![0; 8]);
        stream.set_position(6).unwrap();
        stream.set_length(4).unwrap();
        assert_eq!(stream.position(), 4);

        stream.set_length(8).unwrap();
        assert!(matches!(
            stream.set_length(9),
            Err(StreamError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_seek_modes() {
        let mut stream = DataStream::from_bytes(vec![0; 10]);
        assert_eq!(stream.seek(4, SeekMode::Start).unwrap(), 4);
        assert_eq!(stream.seek(2, SeekMode::Current).unwrap(), 6);
        assert_eq!(stream.seek(-3, SeekMode::End).unwrap(), 7);

        assert!(stream.seek(-1, SeekMode::Start).is_err());
        assert!(stream.seek(1, SeekMode::End).is_err());
        assert_eq!(stream.position(), 7);
    }

    #[test]
    fn test_position_stack() {
        let mut stream = DataStream::from_bytes(vec![0; 10]);
        stream.set_position(3).unwrap();

        stream.push_to_position(8, SeekMode::Start).unwrap();
        assert_eq!(stream.position(), 8);
        stream.push_current_position().unwrap();
        stream.set_position(1).unwrap();

        stream.pop_position().unwrap();
        assert_eq!(stream.position(), 8);
        stream.pop_position().unwrap();
        assert_eq!(stream.position(), 3);

        assert!(matches!(
            stream.pop_position(),
            Err(StreamError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_failed_push_leaves_stack_untouched() {
        let mut stream = DataStream::from_bytes(vec![0; 2]);
        assert!(stream.push_to_position(5, SeekMode::Start).is_err());
        assert_eq!(stream.saved_positions(), 0);
    }

    #[test]
    fn test_run_in_position_restores_on_success() {
        let mut stream = DataStream::from_bytes(vec![10, 20, 30]);
        stream.set_position(1).unwrap();

        let value = stream
            .run_in_position(2, SeekMode::Start, |s| s.read_byte())
            .unwrap();
        assert_eq!(value, 30);
        assert_eq!(stream.position(), 1);
        assert_eq!(stream.saved_positions(), 0);
    }

    #[test]
    fn test_run_in_position_keeps_entry_on_error() {
        let mut stream = DataStream::from_bytes(vec![10]);
        let result = stream.run_in_position(1, SeekMode::Start, |s| s.read_byte());

        assert!(result.is_err());
        assert_eq!(stream.saved_positions(), 1);
        stream.pop_position().unwrap();
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_dispose_is_idempotent_and_blocks_io() {
        let mut stream = DataStream::from_bytes(vec![1]);
        stream.dispose();
        stream.dispose();

        assert!(stream.is_disposed());
        assert!(matches!(stream.read_byte(), Err(StreamError::Disposed)));
        assert!(matches!(stream.write_byte(1), Err(StreamError::Disposed)));
        assert!(matches!(stream.substream(0, 0), Err(StreamError::Disposed)));
        assert!(stream.lock().is_err());
    }

    #[test]
    fn test_source_disposed_after_last_view() {
        let mut mock = MockStreamSource::new();
        mock.expect_is_disposed().return_const(false);
        mock.expect_length().returning(|| Ok(16));
        mock.expect_position().return_const(0u64);
        mock.expect_dispose().times(1).return_const(());

        let mut root = DataStream::from_source(mock).unwrap();
        let mut child = root.substream(0, 8).unwrap();
        let mut grandchild = child.substream(2, 2).unwrap();
        assert_eq!(root.live_view_count(), 3);

        child.dispose();
        root.dispose();
        assert_eq!(grandchild.live_view_count(), 1);
        grandchild.dispose();
    }

    #[test]
    fn test_views_share_lock() {
        let stream = DataStream::from_bytes(vec![0; 4]);
        let sub = stream.substream(0, 2).unwrap();
        assert!(stream.lock().unwrap().ptr_eq(&sub.lock().unwrap()));
        assert!(stream.shares_source_with(&sub));

        let other = DataStream::from_bytes(vec![0; 4]);
        assert!(!stream.lock().unwrap().ptr_eq(&other.lock().unwrap()));
        assert!(!stream.shares_source_with(&other));
    }

    #[test]
    fn test_write_to_and_compare() {
        let mut source = DataStream::from_bytes((0u8..=255).cycle().take(1000).collect());
        source.set_position(17).unwrap();

        let mut copy = DataStream::new();
        source.write_to(&mut copy).unwrap();

        assert_eq!(source.position(), 17);
        assert_eq!(copy.length(), 1000);
        assert!(source.compare(&copy).unwrap());

        copy.set_position(10).unwrap();
        copy.write_byte(0xFF).unwrap();
        assert!(!source.compare(&copy).unwrap());
    }

    #[test]
    fn test_compare_length_mismatch() {
        let a = DataStream::from_bytes(vec![1, 2]);
        let b = DataStream::from_bytes(vec![1, 2, 3]);
        assert!(!a.compare(&b).unwrap());
    }

    #[test]
    fn test_write_segment_to() {
        let source = DataStream::from_bytes(vec![1, 2, 3, 4, 5]);
        let mut target = DataStream::new();
        source.write_segment_to(1, 3, &mut target).unwrap();

        target.set_position(0).unwrap();
        assert_eq!(target.read_to_vec(3).unwrap(), vec![2, 3, 4]);
        assert!(source.write_segment_to(4, 2, &mut target).is_err());
    }

    #[test]
    fn test_std_io_traits() {
        let mut stream = DataStream::new();
        stream.write_all(b"hello").unwrap();
        Seek::seek(&mut stream, SeekFrom::Start(1)).unwrap();

        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "ello");

        assert_eq!(Seek::seek(&mut stream, SeekFrom::End(-2)).unwrap(), 3);
        let err = Seek::seek(&mut stream, SeekFrom::Current(-10)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
