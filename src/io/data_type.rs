// SPDX-License-Identifier: MIT
//! Closed set of primitive kinds for dynamic reads and writes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};

/// Primitive kinds understood by [`DataReader::read_by_type`](crate::io::DataReader::read_by_type)
/// and [`DataWriter::write_of_type`](crate::io::DataWriter::write_of_type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    U8,
    I8,
    U16,
    I16,
    /// Unsigned 24-bit integer
    U24,
    /// Signed 24-bit integer
    I24,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    /// One character in the reader's text encoding
    Char,
    /// Only readable with an explicit [`BoolEncoding`](crate::io::BoolEncoding)
    Bool,
}

impl DataType {
    /// Encoded size in bytes, `None` for kinds without a fixed size
    pub fn size(self) -> Option<usize> {
        match self {
            DataType::U8 | DataType::I8 => Some(1),
            DataType::U16 | DataType::I16 => Some(2),
            DataType::U24 | DataType::I24 => Some(3),
            DataType::U32 | DataType::I32 | DataType::F32 => Some(4),
            DataType::U64 | DataType::I64 | DataType::F64 => Some(8),
            DataType::Char | DataType::Bool => None,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            DataType::F32 | DataType::F64 | DataType::Char | DataType::Bool
        )
    }

    /// Inclusive range of an integer kind
    fn integer_range(self) -> Option<(i128, i128)> {
        let range = match self {
            DataType::U8 => (0, u8::MAX as i128),
            DataType::I8 => (i8::MIN as i128, i8::MAX as i128),
            DataType::U16 => (0, u16::MAX as i128),
            DataType::I16 => (i16::MIN as i128, i16::MAX as i128),
            DataType::U24 => (0, U24_MAX as i128),
            DataType::I24 => (I24_MIN as i128, I24_MAX as i128),
            DataType::U32 => (0, u32::MAX as i128),
            DataType::I32 => (i32::MIN as i128, i32::MAX as i128),
            DataType::U64 => (0, u64::MAX as i128),
            DataType::I64 => (i64::MIN as i128, i64::MAX as i128),
            DataType::F32 | DataType::F64 | DataType::Char | DataType::Bool => return None,
        };
        Some(range)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::U8 => "u8",
            DataType::I8 => "i8",
            DataType::U16 => "u16",
            DataType::I16 => "i16",
            DataType::U24 => "u24",
            DataType::I24 => "i24",
            DataType::U32 => "u32",
            DataType::I32 => "i32",
            DataType::U64 => "u64",
            DataType::I64 => "i64",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::Char => "char",
            DataType::Bool => "bool",
        };
        f.write_str(name)
    }
}

pub(crate) const U24_MAX: u32 = 0x00FF_FFFF;
pub(crate) const I24_MIN: i32 = -0x0080_0000;
pub(crate) const I24_MAX: i32 = 0x007F_FFFF;

/// A value tagged with its [`DataType`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U24(u32),
    I24(i32),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    Bool(bool),
}

impl DataValue {
    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::U8(_) => DataType::U8,
            DataValue::I8(_) => DataType::I8,
            DataValue::U16(_) => DataType::U16,
            DataValue::I16(_) => DataType::I16,
            DataValue::U24(_) => DataType::U24,
            DataValue::I24(_) => DataType::I24,
            DataValue::U32(_) => DataType::U32,
            DataValue::I32(_) => DataType::I32,
            DataValue::U64(_) => DataType::U64,
            DataValue::I64(_) => DataType::I64,
            DataValue::F32(_) => DataType::F32,
            DataValue::F64(_) => DataType::F64,
            DataValue::Char(_) => DataType::Char,
            DataValue::Bool(_) => DataType::Bool,
        }
    }

    /// Integer payload, `None` for non-integer kinds
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            DataValue::U8(v) => Some(v.into()),
            DataValue::I8(v) => Some(v.into()),
            DataValue::U16(v) => Some(v.into()),
            DataValue::I16(v) => Some(v.into()),
            DataValue::U24(v) | DataValue::U32(v) => Some(v.into()),
            DataValue::I24(v) | DataValue::I32(v) => Some(v.into()),
            DataValue::U64(v) => Some(v.into()),
            DataValue::I64(v) => Some(v.into()),
            DataValue::F32(_) | DataValue::F64(_) | DataValue::Char(_) | DataValue::Bool(_) => {
                None
            }
        }
    }

    /// Build an integer value of kind `data_type`, rejecting values it cannot hold
    pub fn from_integer(data_type: DataType, value: i128) -> Result<Self> {
        let Some((min, max)) = data_type.integer_range() else {
            return Err(StreamError::UnsupportedType(format!(
                "{data_type} is not an integer type"
            )));
        };
        if value < min || value > max {
            return Err(StreamError::out_of_range(
                "value",
                format!("{value} does not fit in {data_type}"),
            ));
        }

        // Range checked above, so the narrowing casts are lossless
        let value = match data_type {
            DataType::U8 => DataValue::U8(value as u8),
            DataType::I8 => DataValue::I8(value as i8),
            DataType::U16 => DataValue::U16(value as u16),
            DataType::I16 => DataValue::I16(value as i16),
            DataType::U24 => DataValue::U24(value as u32),
            DataType::I24 => DataValue::I24(value as i32),
            DataType::U32 => DataValue::U32(value as u32),
            DataType::I32 => DataValue::I32(value as i32),
            DataType::U64 => DataValue::U64(value as u64),
            DataType::I64 => DataValue::I64(value as i64),
            DataType::F32 | DataType::F64 | DataType::Char | DataType::Bool => {
                return Err(StreamError::UnsupportedType(data_type.to_string()));
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_integer_range_checks() {
        assert_eq!(
            DataValue::from_integer(DataType::U8, 255).unwrap(),
            DataValue::U8(255)
        );
        assert!(matches!(
            DataValue::from_integer(DataType::U8, 256),
            Err(StreamError::OutOfRange { .. })
        ));
        assert!(DataValue::from_integer(DataType::I24, -0x80_0001).is_err());
        assert!(DataValue::from_integer(DataType::U24, 0xFF_FFFF).is_ok());
        assert!(DataValue::from_integer(DataType::U32, -1).is_err());
    }

    #[test]
    fn test_from_integer_rejects_non_integers() {
        assert!(matches!(
            DataValue::from_integer(DataType::F32, 1),
            Err(StreamError::UnsupportedType(_))
        ));
        assert!(DataValue::from_integer(DataType::Bool, 1).is_err());
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(DataValue::I16(-3).as_integer(), Some(-3));
        assert_eq!(DataValue::U64(u64::MAX).as_integer(), Some(u64::MAX as i128));
        assert_eq!(DataValue::F64(1.0).as_integer(), None);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(DataType::U24.size(), Some(3));
        assert_eq!(DataType::F64.size(), Some(8));
        assert_eq!(DataType::Char.size(), None);
        assert!(DataType::I24.is_integer());
        assert!(!DataType::Bool.is_integer());
    }
}
