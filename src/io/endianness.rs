// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Byte order used by [`DataReader`](crate::io::DataReader) and
/// [`DataWriter`](crate::io::DataWriter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Endianness {
    /// Least significant byte first
    #[default]
    LittleEndian,
    /// Most significant byte first
    BigEndian,
}

impl Endianness {
    /// Byte order of the host
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::BigEndian
        } else {
            Endianness::LittleEndian
        }
    }

    /// Whether bytes must be reversed to convert between this order and the host order
    #[inline]
    pub fn differs_from_native(self) -> bool {
        self != Self::native()
    }
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endianness::LittleEndian => write!(f, "little-endian"),
            Endianness::BigEndian => write!(f, "big-endian"),
        }
    }
}

impl std::str::FromStr for Endianness {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "le" | "little" | "little-endian" | "littleendian" => Ok(Endianness::LittleEndian),
            "be" | "big" | "big-endian" | "bigendian" => Ok(Endianness::BigEndian),
            _ => Err(StreamError::UnsupportedEndianness(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!("LE".parse::<Endianness>().unwrap(), Endianness::LittleEndian);
        assert_eq!(
            "big-endian".parse::<Endianness>().unwrap(),
            Endianness::BigEndian
        );
    }

    #[test]
    fn test_parse_unknown_label_fails() {
        let err = "middle".parse::<Endianness>().unwrap_err();
        assert!(matches!(err, StreamError::UnsupportedEndianness(ref s) if s == "middle"));
    }

    #[test]
    fn test_display_round_trips() {
        for endianness in [Endianness::LittleEndian, Endianness::BigEndian] {
            let parsed: Endianness = endianness.to_string().parse().unwrap();
            assert_eq!(parsed, endianness);
        }
    }
}
