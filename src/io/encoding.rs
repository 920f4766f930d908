// SPDX-License-Identifier: MIT
//! Text encodings with exact byte accounting.
//!
//! Decoding works one character at a time through [`TextEncoding::decode_step`],
//! which reports how many bytes the character occupied or that the input ends
//! in the middle of a character. Readers rely on this to rewind a stream to
//! the exact byte after the last decoded character.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Supported text encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    /// 7-bit ASCII; unrepresentable characters encode as `?`
    Ascii,
    /// ISO-8859-1; unrepresentable characters encode as `?`
    Latin1,
}

/// Outcome of decoding the first character of a byte slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// A character and the number of bytes it used. Invalid sequences decode
    /// as U+FFFD covering the bytes that were skipped.
    Char { ch: char, len: usize },
    /// The slice ends inside a character
    Incomplete,
}

/// Result of decoding a prefix of a byte slice
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedPrefix {
    pub text: String,
    /// Number of characters decoded
    pub chars: usize,
    /// Number of bytes those characters used
    pub consumed: usize,
}

impl TextEncoding {
    /// Canonical label
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Utf32Le => "utf-32le",
            TextEncoding::Utf32Be => "utf-32be",
            TextEncoding::Ascii => "us-ascii",
            TextEncoding::Latin1 => "iso-8859-1",
        }
    }

    /// Parse an encoding label such as `utf-8`, `UTF16BE` or `latin1`
    pub fn from_label(label: &str) -> Result<Self, StreamError> {
        let normalized: String = label
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "utf8" => Ok(TextEncoding::Utf8),
            "utf16" | "utf16le" | "unicode" => Ok(TextEncoding::Utf16Le),
            "utf16be" | "bigendianunicode" => Ok(TextEncoding::Utf16Be),
            "utf32" | "utf32le" => Ok(TextEncoding::Utf32Le),
            "utf32be" => Ok(TextEncoding::Utf32Be),
            "ascii" | "usascii" => Ok(TextEncoding::Ascii),
            "latin1" | "iso88591" => Ok(TextEncoding::Latin1),
            _ => Err(StreamError::UnsupportedEncoding(label.to_string())),
        }
    }

    /// Byte order mark written at the start of a text stream
    pub fn preamble(self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            TextEncoding::Utf16Le => &[0xFF, 0xFE],
            TextEncoding::Utf16Be => &[0xFE, 0xFF],
            TextEncoding::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
            TextEncoding::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
            TextEncoding::Ascii | TextEncoding::Latin1 => &[],
        }
    }

    /// Largest number of bytes a single character can use
    pub fn max_char_len(self) -> usize {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf16Le | TextEncoding::Utf16Be => 4,
            TextEncoding::Utf32Le | TextEncoding::Utf32Be => 4,
            TextEncoding::Ascii | TextEncoding::Latin1 => 1,
        }
    }

    /// Smallest number of bytes a single character can use
    pub fn min_char_len(self) -> usize {
        match self {
            TextEncoding::Utf8 | TextEncoding::Ascii | TextEncoding::Latin1 => 1,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
            TextEncoding::Utf32Le | TextEncoding::Utf32Be => 4,
        }
    }

    /// Upper bound of the bytes needed to hold `chars` characters
    #[inline]
    pub fn max_byte_count(self, chars: usize) -> usize {
        chars.saturating_mul(self.max_char_len())
    }

    /// Append the encoded form of `ch` to `out`
    pub fn encode_char(self, ch: char, out: &mut Vec<u8>) {
        match self {
            TextEncoding::Utf8 => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let bytes = if self == TextEncoding::Utf16Le {
                        unit.to_le_bytes()
                    } else {
                        unit.to_be_bytes()
                    };
                    out.extend_from_slice(&bytes);
                }
            }
            TextEncoding::Utf32Le => out.extend_from_slice(&(ch as u32).to_le_bytes()),
            TextEncoding::Utf32Be => out.extend_from_slice(&(ch as u32).to_be_bytes()),
            TextEncoding::Ascii => out.push(if ch.is_ascii() { ch as u8 } else { b'?' }),
            TextEncoding::Latin1 => out.push(u8::try_from(u32::from(ch)).unwrap_or(b'?')),
        }
    }

    /// Encode a whole string
    pub fn encode(self, text: &str) -> Vec<u8> {
        if self == TextEncoding::Utf8 {
            return text.as_bytes().to_vec();
        }

        let mut out = Vec::with_capacity(text.len() * self.min_char_len());
        for ch in text.chars() {
            self.encode_char(ch, &mut out);
        }
        out
    }

    /// Number of bytes `text` uses in this encoding
    pub fn byte_count(self, text: &str) -> usize {
        match self {
            TextEncoding::Utf8 => text.len(),
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
                text.chars().map(|c| c.len_utf16() * 2).sum()
            }
            TextEncoding::Utf32Le | TextEncoding::Utf32Be => text.chars().count() * 4,
            TextEncoding::Ascii | TextEncoding::Latin1 => text.chars().count(),
        }
    }

    /// Decode the first character of `bytes`
    pub fn decode_step(self, bytes: &[u8]) -> DecodeStep {
        if bytes.is_empty() {
            return DecodeStep::Incomplete;
        }

        match self {
            TextEncoding::Utf8 => decode_utf8_step(bytes),
            TextEncoding::Utf16Le => decode_utf16_step(bytes, u16::from_le_bytes),
            TextEncoding::Utf16Be => decode_utf16_step(bytes, u16::from_be_bytes),
            TextEncoding::Utf32Le => decode_utf32_step(bytes, u32::from_le_bytes),
            TextEncoding::Utf32Be => decode_utf32_step(bytes, u32::from_be_bytes),
            TextEncoding::Ascii => DecodeStep::Char {
                ch: if bytes[0].is_ascii() {
                    bytes[0] as char
                } else {
                    char::REPLACEMENT_CHARACTER
                },
                len: 1,
            },
            TextEncoding::Latin1 => DecodeStep::Char {
                ch: bytes[0] as char,
                len: 1,
            },
        }
    }

    /// Decode up to `max_chars` characters from the start of `bytes`.
    ///
    /// A character cut at the end of the slice is left undecoded unless
    /// `at_end` is set, in which case the remaining bytes decode as U+FFFD.
    pub fn decode_prefix(self, bytes: &[u8], max_chars: usize, at_end: bool) -> DecodedPrefix {
        let mut decoded = DecodedPrefix::default();

        while decoded.chars < max_chars && decoded.consumed < bytes.len() {
            match self.decode_step(&bytes[decoded.consumed..]) {
                DecodeStep::Char { ch, len } => {
                    decoded.text.push(ch);
                    decoded.consumed += len;
                }
                DecodeStep::Incomplete if at_end => {
                    decoded.text.push(char::REPLACEMENT_CHARACTER);
                    decoded.consumed = bytes.len();
                }
                DecodeStep::Incomplete => break,
            }
            decoded.chars += 1;
        }

        decoded
    }

    /// Decode a complete byte slice, replacing invalid sequences with U+FFFD
    pub fn decode(self, bytes: &[u8]) -> String {
        if self == TextEncoding::Utf8 {
            return String::from_utf8_lossy(bytes).into_owned();
        }
        self.decode_prefix(bytes, usize::MAX, true).text
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

fn decode_utf8_step(bytes: &[u8]) -> DecodeStep {
    let prefix = &bytes[..bytes.len().min(4)];
    let valid = match std::str::from_utf8(prefix) {
        Ok(text) => text,
        // The first character is valid, only later ones are not
        Err(err) if err.valid_up_to() > 0 => {
            std::str::from_utf8(&prefix[..err.valid_up_to()]).unwrap_or_default()
        }
        Err(err) => {
            return match err.error_len() {
                None => DecodeStep::Incomplete,
                Some(len) => DecodeStep::Char {
                    ch: char::REPLACEMENT_CHARACTER,
                    len,
                },
            };
        }
    };

    match valid.chars().next() {
        Some(ch) => DecodeStep::Char {
            ch,
            len: ch.len_utf8(),
        },
        None => DecodeStep::Incomplete,
    }
}

fn decode_utf16_step(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> DecodeStep {
    if bytes.len() < 2 {
        return DecodeStep::Incomplete;
    }

    let first = to_unit([bytes[0], bytes[1]]);
    match first {
        0xD800..=0xDBFF => {
            if bytes.len() < 4 {
                return DecodeStep::Incomplete;
            }
            let second = to_unit([bytes[2], bytes[3]]);
            if (0xDC00..=0xDFFF).contains(&second) {
                let scalar =
                    0x10000 + ((u32::from(first) - 0xD800) << 10) + (u32::from(second) - 0xDC00);
                DecodeStep::Char {
                    ch: char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER),
                    len: 4,
                }
            } else {
                DecodeStep::Char {
                    ch: char::REPLACEMENT_CHARACTER,
                    len: 2,
                }
            }
        }
        0xDC00..=0xDFFF => DecodeStep::Char {
            ch: char::REPLACEMENT_CHARACTER,
            len: 2,
        },
        unit => DecodeStep::Char {
            ch: char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER),
            len: 2,
        },
    }
}

fn decode_utf32_step(bytes: &[u8], to_scalar: fn([u8; 4]) -> u32) -> DecodeStep {
    if bytes.len() < 4 {
        return DecodeStep::Incomplete;
    }

    let scalar = to_scalar([bytes[0], bytes[1], bytes[2], bytes[3]]);
    DecodeStep::Char {
        ch: char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER),
        len: 4,
    }
}
