// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use super::binary_stream::BinaryStream;
use super::data_type::{DataType, DataValue};
use super::encoding::{DecodeStep, TextEncoding};
use super::endianness::Endianness;
use crate::config::Config;
use crate::error::{Result, StreamError};
use crate::numeric::Padding;

/// How a boolean is stored on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolEncoding {
    /// Integer kind holding the flag
    pub storage: DataType,
    pub true_value: i128,
    pub false_value: i128,
}

impl BoolEncoding {
    pub fn new(storage: DataType, true_value: i128, false_value: i128) -> Self {
        Self {
            storage,
            true_value,
            false_value,
        }
    }
}

impl Default for BoolEncoding {
    /// One byte, 1 for true and 0 for false
    fn default() -> Self {
        Self::new(DataType::U8, 1, 0)
    }
}

/// Read `count` characters, leaving the stream right after the last one.
///
/// Reads an upper-bound estimate of the bytes needed, decodes exactly
/// `count` characters from it and rewinds to the byte that follows them.
pub(crate) fn read_chars_from<S: BinaryStream + ?Sized>(
    stream: &mut S,
    encoding: TextEncoding,
    count: usize,
) -> Result<String> {
    if count == 0 {
        return Ok(String::new());
    }

    let start = stream.position();
    let remaining = stream.remaining();
    let estimate = (encoding.max_byte_count(count) as u64).min(remaining) as usize;

    let mut bytes = vec![0u8; estimate];
    stream.read_bytes(&mut bytes)?;

    let at_end = estimate as u64 == remaining;
    let decoded = encoding.decode_prefix(&bytes, count, at_end);
    if decoded.chars < count {
        stream.set_position(start)?;
        return Err(StreamError::end_of_stream(
            count as u64,
            decoded.chars as u64,
        ));
    }

    stream.set_position(start + decoded.consumed as u64)?;
    Ok(decoded.text)
}

/// Read one character a byte at a time, rewinding any byte past it
fn read_char_bytewise<S: BinaryStream + ?Sized>(
    stream: &mut S,
    encoding: TextEncoding,
) -> Result<char> {
    let mut unit = Vec::with_capacity(encoding.max_char_len());
    loop {
        unit.push(stream.read_byte()?);
        match encoding.decode_step(&unit) {
            DecodeStep::Char { ch, len } => {
                let extra = (unit.len() - len) as u64;
                if extra > 0 {
                    let position = stream.position();
                    stream.set_position(position - extra)?;
                }
                return Ok(ch);
            }
            DecodeStep::Incomplete if unit.len() >= encoding.max_char_len() => {
                return Ok(char::REPLACEMENT_CHARACTER);
            }
            DecodeStep::Incomplete => {}
        }
    }
}

/// Typed reads over a [`BinaryStream`].
///
/// The reader keeps only its byte order and default text encoding; every
/// call starts from the stream's current position.
#[derive(Debug)]
pub struct DataReader<S> {
    stream: S,
    endianness: Endianness,
    encoding: TextEncoding,
}

macro_rules! read_number {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                let bytes = self.read_array::<{ std::mem::size_of::<$ty>() }>()?;
                Ok(match self.endianness {
                    Endianness::LittleEndian => <$ty>::from_le_bytes(bytes),
                    Endianness::BigEndian => <$ty>::from_be_bytes(bytes),
                })
            }
        )*
    };
}

impl<S: BinaryStream> DataReader<S> {
    /// Reader with the configured default byte order and encoding
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

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        self.stream.read_bytes(&mut bytes)?;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.stream.read_byte()
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.stream.read_byte()? as i8)
    }

    read_number! {
        read_u16 => u16,
        read_i16 => i16,
        read_u32 => u32,
        read_i32 => i32,
        read_u64 => u64,
        read_i64 => i64,
        read_f32 => f32,
        read_f64 => f64,
    }

    /// Unsigned 24-bit integer, assembled from three bytes
    pub fn read_u24(&mut self) -> Result<u32> {
        let [b0, b1, b2] = self.read_array::<3>()?;
        let (low, mid, high) = match self.endianness {
            Endianness::LittleEndian => (b0, b1, b2),
            Endianness::BigEndian => (b2, b1, b0),
        };
        Ok(u32::from(low) | (u32::from(mid) << 8) | (u32::from(high) << 16))
    }

    /// Signed 24-bit integer, sign-extended to 32 bits
    pub fn read_i24(&mut self) -> Result<i32> {
        let value = self.read_u24()?;
        Ok(((value << 8) as i32) >> 8)
    }

    /// Read `count` raw bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; count];
        self.stream.read_bytes(&mut bytes)?;
        Ok(bytes)
    }

    /// Read a boolean stored as described by `encoding`
    pub fn read_bool_with(&mut self, encoding: BoolEncoding) -> Result<bool> {
        let raw = self.read_by_type(encoding.storage)?;
        let value = raw.as_integer().ok_or_else(|| {
            StreamError::UnsupportedType(format!(
                "{} cannot store a boolean",
                encoding.storage
            ))
        })?;

        if value == encoding.true_value {
            Ok(true)
        } else if value == encoding.false_value {
            Ok(false)
        } else {
            Err(StreamError::TypeMismatch {
                expected: format!("{} or {}", encoding.true_value, encoding.false_value),
                actual: value.to_string(),
            })
        }
    }

    /// One character in the default encoding
    pub fn read_char(&mut self) -> Result<char> {
        self.read_char_with(self.encoding)
    }

    pub fn read_char_with(&mut self, encoding: TextEncoding) -> Result<char> {
        let text = read_chars_from(&mut self.stream, encoding, 1)?;
        text.chars()
            .next()
            .ok_or_else(|| StreamError::end_of_stream(1, 0))
    }

    /// Exactly `count` characters in the default encoding
    pub fn read_chars(&mut self, count: usize) -> Result<String> {
        read_chars_from(&mut self.stream, self.encoding, count)
    }

    pub fn read_chars_with(&mut self, count: usize, encoding: TextEncoding) -> Result<String> {
        read_chars_from(&mut self.stream, encoding, count)
    }

    /// Characters up to a NUL, which is consumed but not returned.
    ///
    /// Fails with [`StreamError::EndOfStream`] when the stream ends before a
    /// NUL; the position is then restored.
    pub fn read_null_terminated_string(&mut self) -> Result<String> {
        self.read_null_terminated_string_with(self.encoding)
    }

    pub fn read_null_terminated_string_with(&mut self, encoding: TextEncoding) -> Result<String> {
        let start = self.stream.position();
        let mut text = String::new();
        loop {
            match read_char_bytewise(&mut self.stream, encoding) {
                Ok('\0') => return Ok(text),
                Ok(ch) => text.push(ch),
                Err(e) => {
                    self.stream.set_position(start)?;
                    return Err(e);
                }
            }
        }
    }

    /// Decode exactly `byte_count` bytes as text
    pub fn read_string(&mut self, byte_count: usize) -> Result<String> {
        self.read_string_with(byte_count, self.encoding)
    }

    pub fn read_string_with(&mut self, byte_count: usize, encoding: TextEncoding) -> Result<String> {
        let bytes = self.read_bytes(byte_count)?;
        Ok(encoding.decode(&bytes))
    }

    /// Fixed-size text field with trailing NULs removed
    pub fn read_padded_string(&mut self, byte_count: usize) -> Result<String> {
        let text = self.read_string(byte_count)?;
        Ok(text.trim_end_matches('\0').to_string())
    }

    /// Text prefixed with its byte length stored as `size_type`
    pub fn read_sized_string(&mut self, size_type: DataType) -> Result<String> {
        self.read_sized_string_with(size_type, self.encoding)
    }

    pub fn read_sized_string_with(
        &mut self,
        size_type: DataType,
        encoding: TextEncoding,
    ) -> Result<String> {
        let size = self
            .read_by_type(size_type)?
            .as_integer()
            .ok_or_else(|| {
                StreamError::UnsupportedType(format!("{size_type} cannot store a string size"))
            })?;
        let size = usize::try_from(size)
            .map_err(|_| StreamError::out_of_range("size", format!("invalid string size {size}")))?;

        self.read_string_with(size, encoding)
    }

    /// Move forward to the next multiple of `alignment`; 0 and 1 do nothing
    pub fn skip_padding(&mut self, alignment: u64) -> Result<()> {
        let position = self.stream.position();
        let target = position.checked_pad(alignment).ok_or_else(|| {
            StreamError::out_of_range(
                "alignment",
                format!("padding {position} to a multiple of {alignment} overflows"),
            )
        })?;
        if target != position {
            self.stream.set_position(target)?;
        }
        Ok(())
    }

    /// Read a value of kind `data_type`.
    ///
    /// [`DataType::Bool`] has no implicit framing and is rejected; use
    /// [`read_bool_with`](Self::read_bool_with) instead.
    pub fn read_by_type(&mut self, data_type: DataType) -> Result<DataValue> {
        let value = match data_type {
            DataType::U8 => DataValue::U8(self.read_u8()?),
            DataType::I8 => DataValue::I8(self.read_i8()?),
            DataType::U16 => DataValue::U16(self.read_u16()?),
            DataType::I16 => DataValue::I16(self.read_i16()?),
            DataType::U24 => DataValue::U24(self.read_u24()?),
            DataType::I24 => DataValue::I24(self.read_i24()?),
            DataType::U32 => DataValue::U32(self.read_u32()?),
            DataType::I32 => DataValue::I32(self.read_i32()?),
            DataType::U64 => DataValue::U64(self.read_u64()?),
            DataType::I64 => DataValue::I64(self.read_i64()?),
            DataType::F32 => DataValue::F32(self.read_f32()?),
            DataType::F64 => DataValue::F64(self.read_f64()?),
            DataType::Char => DataValue::Char(self.read_char()?),
            DataType::Bool => {
                return Err(StreamError::UnsupportedType(
                    "bool requires an explicit encoding".to_string(),
                ));
            }
        };
        Ok(value)
    }
}
