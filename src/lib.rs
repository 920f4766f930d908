// SPDX-License-Identifier: MIT
//! # binstream - Shared Binary Stream Views
//!
//! Many logical views over one byte backend, with reference-counted
//! lifetimes and typed binary/text codecs on top.
//!
//! ## Layers
//!
//! - **Backends** ([`source`]): memory buffers, files opened on first use and
//!   caller-provided streams behind one [`StreamSource`] contract
//! - **Views** ([`stream`]): [`DataStream`] windows with their own cursor and
//!   position stack; the backend is released with its last view
//! - **Codecs** ([`io`]): [`DataReader`]/[`DataWriter`] for integers
//!   (including 24-bit), floats and strings; [`TextReader`]/[`TextWriter`] for
//!   lines and tokens in several encodings
//! - **Formats** ([`format`]): [`BinaryFormat`] and the converter registry
//!
//! ## Sharing Model
//!
//! | Created with | Fixed length | Releases the resource |
//! |--------------|--------------|-----------------------|
//! | [`DataStream::new`], [`DataStream::from_bytes`] | No | With the last view |
//! | [`DataStream::substream`] | Yes | With the last view |
//! | [`DataStreamFactory::from_stream`] | No | With the last view |
//! | [`DataStreamFactory::from_stream_keeping_ownership`] | No | Never, the caller keeps it |
//!
//! ## Usage
//!
//! ```rust
//! use binstream::{DataReader, DataStream, DataWriter, Endianness};
//!
//! let mut stream = DataStream::new();
//! let mut writer = DataWriter::new(&mut stream).with_endianness(Endianness::BigEndian);
//! writer.write_u16(0xCAFE).unwrap();
//! writer.write_u24(0x010203).unwrap();
//!
//! let header = stream.substream(0, 2).unwrap();
//! let mut reader = DataReader::new(header).with_endianness(Endianness::BigEndian);
//! assert_eq!(reader.read_u16().unwrap(), 0xCAFE);
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod numeric;
pub mod source;
pub mod stream;

// Re-export main types
pub use config::Config;
pub use error::{ConversionError, ErrorKind, Result, StreamError};
pub use format::{BinaryFormat, CloneableFormat, Converter, ConverterRegistry, Format};
pub use io::{
    BinaryStream, BoolEncoding, DataReader, DataType, DataValue, DataWriter, Endianness,
    NewLine, TextEncoding, TextReader, TextWriter,
};
pub use numeric::Padding;
pub use source::{FileOpenMode, StreamLock, StreamSource};
pub use stream::{DataStream, DataStreamFactory, SeekMode, ViewId};
