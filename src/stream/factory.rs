// SPDX-License-Identifier: MIT
//! Construction entry points for [`DataStream`] views
//!
//! Unless a method name says otherwise, the created view owns what it wraps:
//! the backing resource is released once the view, and every view carved
//! from it, has been disposed. The `keeping_ownership` variants leave the
//! stream with the caller.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::DataStream;
use crate::error::Result;
use crate::source::{ByteStream, ExternalSource, FileOpenMode};

/// Factory for [`DataStream`] views over memory, files and external streams
pub struct DataStreamFactory;

impl DataStreamFactory {
    /// Empty growable in-memory view
    pub fn create_from_memory() -> DataStream {
        DataStream::new()
    }

    /// Growable view initialized with `data`
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> DataStream {
        DataStream::from_bytes(data.into())
    }

    /// Fixed window over `data`
    pub fn from_bytes_window(
        data: impl Into<Vec<u8>>,
        offset: u64,
        length: u64,
    ) -> Result<DataStream> {
        DataStream::from_bytes_window(data.into(), offset, length)
    }

    /// View over `stream`, which is closed with the last view
    pub fn from_stream<S: ByteStream + 'static>(stream: S) -> Result<DataStream> {
        DataStream::from_source(ExternalSource::owned(stream))
    }

    /// Fixed window over `stream`, which is closed with the last view
    pub fn from_stream_window<S: ByteStream + 'static>(
        stream: S,
        offset: u64,
        length: u64,
    ) -> Result<DataStream> {
        DataStream::from_source_window(ExternalSource::owned(stream), offset, length)
    }

    /// View over a stream the caller keeps using after the view is disposed.
    ///
    /// Calls with clones of the same `Arc` share one backend and lock, so
    /// several sibling windows can be carved from one stream.
    pub fn from_stream_keeping_ownership(
        stream: Arc<Mutex<dyn ByteStream>>,
    ) -> Result<DataStream> {
        DataStream::from_shared_stream(stream)
    }

    /// Fixed window over a stream the caller keeps using
    pub fn from_stream_window_keeping_ownership(
        stream: Arc<Mutex<dyn ByteStream>>,
        offset: u64,
        length: u64,
    ) -> Result<DataStream> {
        DataStream::from_shared_stream_window(stream, offset, length)
    }

    /// New view over the whole of `stream`, reusing its backend and lock
    pub fn from_data_stream(stream: &DataStream) -> Result<DataStream> {
        stream.substream(0, stream.length())
    }

    /// Window over part of `stream`, reusing its backend and lock
    pub fn from_data_stream_window(
        stream: &DataStream,
        offset: u64,
        length: u64,
    ) -> Result<DataStream> {
        stream.substream(offset, length)
    }

    /// View over a file, opened on first read or write
    pub fn from_file(path: impl AsRef<Path>, mode: FileOpenMode) -> Result<DataStream> {
        DataStream::from_file(path, mode)
    }

    /// Fixed window over part of a file
    pub fn from_file_window(
        path: impl AsRef<Path>,
        mode: FileOpenMode,
        offset: u64,
        length: u64,
    ) -> Result<DataStream> {
        DataStream::from_file_window(path, mode, offset, length)
    }
}
