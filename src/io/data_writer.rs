// SPDX-License-Identifier: MIT
use super::binary_stream::BinaryStream;
use super::data_reader::BoolEncoding;
use super::data_type::{DataType, DataValue, I24_MAX, I24_MIN, U24_MAX};
use super::encoding::TextEncoding;
use super::endianness::Endianness;
use crate::config::Config;
use crate::error::{Result, StreamError};
use crate::numeric::Padding;

/// Typed writes over a [`BinaryStream`]
#[derive(Debug)]
pub struct DataWriter<S> {
    stream: S,
    endianness: Endianness,
    encoding: TextEncoding,
}

macro_rules! write_number {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                let bytes = match self.endianness {
                    Endianness::LittleEndian => value.to_le_bytes(),
                    Endianness::BigEndian => value.to_be_bytes(),
                };
                self.stream.write_bytes(&bytes)
            }
        )*
    };
}

impl<S: BinaryStream> DataWriter<S> {
    /// Writer with the configured default byte order and encoding
    pub fn new(stream: S) -> Self {
        let config = Config::current();
        Self {
            stream,
            endianness: config.default_endianness,
            encoding: config.default_encoding,
        }
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: TextEncoding) {
        self.encoding = encoding;
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.stream.write_byte(value)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.stream.write_byte(value as u8)
    }

    write_number! {
        write_u16 => u16,
        write_i16 => i16,
        write_u32 => u32,
        write_i32 => i32,
        write_u64 => u64,
        write_i64 => i64,
        write_f32 => f32,
        write_f64 => f64,
    }

    /// Unsigned 24-bit integer; values above `0xFFFFFF` are rejected
    pub fn write_u24(&mut self, value: u32) -> Result<()> {
        if value > U24_MAX {
            return Err(StreamError::out_of_range(
                "value",
                format!("{value:#x} does not fit in 24 bits"),
            ));
        }

        let low = (value & 0xFF) as u8;
        let mid = ((value >> 8) & 0xFF) as u8;
        let high = ((value >> 16) & 0xFF) as u8;
        let bytes = match self.endianness {
            Endianness::LittleEndian => [low, mid, high],
            Endianness::BigEndian => [high, mid, low],
        };
        self.stream.write_bytes(&bytes)
    }

    /// Signed 24-bit integer in two's complement
    pub fn write_i24(&mut self, value: i32) -> Result<()> {
        if !(I24_MIN..=I24_MAX).contains(&value) {
            return Err(StreamError::out_of_range(
                "value",
                format!("{value} does not fit in 24 bits"),
            ));
        }
        self.write_u24((value as u32) & U24_MAX)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_bytes(bytes)
    }

    /// Write `value` `count` times
    pub fn write_times(&mut self, value: u8, count: u64) -> Result<()> {
        const CHUNK: u64 = 4096;
        let buffer = vec![value; count.min(CHUNK) as usize];
        let mut written = 0;
        while written < count {
            let step = (count - written).min(CHUNK) as usize;
            self.stream.write_bytes(&buffer[..step])?;
            written += step as u64;
        }
        Ok(())
    }

    /// Append `value` at the end of the stream until it is `length` bytes long
    pub fn write_until_length(&mut self, value: u8, length: u64) -> Result<()> {
        let current = self.stream.length();
        self.stream.set_position(current)?;
        self.write_times(value, length.saturating_sub(current))
    }

    /// Fill with `value` up to the next multiple of `alignment`
    pub fn write_padding(&mut self, value: u8, alignment: u64) -> Result<()> {
        let position = self.stream.position();
        let target = position.checked_pad(alignment).ok_or_else(|| {
            StreamError::out_of_range(
                "alignment",
                format!("padding {position} to a multiple of {alignment} overflows"),
            )
        })?;
        self.write_times(value, target - position)
    }

    pub fn write_bool_with(&mut self, value: bool, encoding: BoolEncoding) -> Result<()> {
        let raw = if value {
            encoding.true_value
        } else {
            encoding.false_value
        };
        let value = DataValue::from_integer(encoding.storage, raw)?;
        self.write_value(value)
    }

    pub fn write_char(&mut self, ch: char) -> Result<()> {
        let mut bytes = Vec::with_capacity(self.encoding.max_char_len());
        self.encoding.encode_char(ch, &mut bytes);
        self.stream.write_bytes(&bytes)
    }

    /// Encoded text with no terminator or size
    pub fn write_string(&mut self, text: &str) -> Result<()> {
        self.write_string_with(text, self.encoding)
    }

    pub fn write_string_with(&mut self, text: &str, encoding: TextEncoding) -> Result<()> {
        self.stream.write_bytes(&encoding.encode(text))
    }

    /// Encoded text followed by a NUL character
    pub fn write_null_terminated_string(&mut self, text: &str) -> Result<()> {
        let mut bytes = self.encoding.encode(text);
        self.encoding.encode_char('\0', &mut bytes);
        self.stream.write_bytes(&bytes)
    }

    /// Text in a field of exactly `byte_count` bytes, padded with NULs
    pub fn write_fixed_string(&mut self, text: &str, byte_count: usize) -> Result<()> {
        let mut bytes = self.encoding.encode(text);
        if bytes.len() > byte_count {
            return Err(StreamError::out_of_range(
                "text",
                format!(
                    "{} encoded bytes do not fit in a {byte_count}-byte field",
                    bytes.len()
                ),
            ));
        }

        bytes.resize(byte_count, 0);
        self.stream.write_bytes(&bytes)
    }

    /// Text prefixed with its encoded byte length stored as `size_type`
    pub fn write_sized_string(&mut self, text: &str, size_type: DataType) -> Result<()> {
        let bytes = self.encoding.encode(text);
        let size = DataValue::from_integer(size_type, bytes.len() as i128)?;
        self.write_value(size)?;
        self.stream.write_bytes(&bytes)
    }

    /// Write a tagged value.
    ///
    /// [`DataValue::Bool`] has no implicit framing and is rejected; use
    /// [`write_bool_with`](Self::write_bool_with) instead.
    pub fn write_value(&mut self, value: DataValue) -> Result<()> {
        match value {
            DataValue::U8(v) => self.write_u8(v),
            DataValue::I8(v) => self.write_i8(v),
            DataValue::U16(v) => self.write_u16(v),
            DataValue::I16(v) => self.write_i16(v),
            DataValue::U24(v) => self.write_u24(v),
            DataValue::I24(v) => self.write_i24(v),
            DataValue::U32(v) => self.write_u32(v),
            DataValue::I32(v) => self.write_i32(v),
            DataValue::U64(v) => self.write_u64(v),
            DataValue::I64(v) => self.write_i64(v),
            DataValue::F32(v) => self.write_f32(v),
            DataValue::F64(v) => self.write_f64(v),
            DataValue::Char(v) => self.write_char(v),
            DataValue::Bool(_) => Err(StreamError::UnsupportedType(
                "bool requires an explicit encoding".to_string(),
            )),
        }
    }

    /// Write `value` after checking it has kind `data_type`
    pub fn write_of_type(&mut self, data_type: DataType, value: DataValue) -> Result<()> {
        if value.data_type() != data_type {
            return Err(StreamError::TypeMismatch {
                expected: data_type.to_string(),
                actual: value.data_type().to_string(),
            });
        }
        self.write_value(value)
    }
}
