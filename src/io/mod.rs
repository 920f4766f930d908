// SPDX-License-Identifier: MIT
//! Typed binary and text codecs layered on [`BinaryStream`].

mod binary_stream;
mod data_reader;
mod data_type;
mod data_writer;
mod encoding;
mod endianness;
mod text_reader;
mod text_writer;

pub use binary_stream::BinaryStream;
pub use data_reader::{BoolEncoding, DataReader};
pub use data_type::{DataType, DataValue};
pub use data_writer::DataWriter;
pub use encoding::{DecodeStep, DecodedPrefix, TextEncoding};
pub use endianness::Endianness;
pub use text_reader::{NewLine, TextReader};
pub use text_writer::TextWriter;
