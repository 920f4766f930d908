// SPDX-License-Identifier: MIT
use super::binary_stream::BinaryStream;
use super::data_reader::read_chars_from;
use super::encoding::{DecodeStep, TextEncoding};
use crate::config::Config;
use crate::error::{Result, StreamError};

/// Line separator used by [`TextReader::read_line`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NewLine {
    /// Split on `\n` and drop a trailing `\r`
    #[default]
    Auto,
    /// Split on this exact token
    Token(String),
}

/// Line and token oriented text reads over a [`BinaryStream`].
///
/// A byte order mark is skipped whenever a read starts at position 0.
///
/// Token and line reads that reach the end of the stream without finding
/// the token return everything read so far. They fail with
/// [`StreamError::EndOfStream`] only when the stream is already at its end.
#[derive(Debug)]
pub struct TextReader<S> {
    stream: S,
    encoding: TextEncoding,
    newline: NewLine,
    chunk_size: usize,
}

impl<S: BinaryStream> TextReader<S> {
    /// Reader with the configured default encoding
    pub fn new(stream: S) -> Self {
        Self::with_encoding(stream, Config::current().default_encoding)
    }

    pub fn with_encoding(stream: S, encoding: TextEncoding) -> Self {
        Self {
            stream,
            encoding,
            newline: NewLine::Auto,
            chunk_size: Config::current().text_chunk_size.max(1),
        }
    }

    pub fn with_newline(mut self, newline: NewLine) -> Self {
        self.newline = newline;
        self
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn newline(&self) -> &NewLine {
        &self.newline
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

    pub fn end_of_stream(&self) -> bool {
        self.stream.remaining() == 0
    }

    /// Skip the encoding's byte order mark if the stream starts with it.
    ///
    /// Only acts at position 0. When the bytes do not match, the stream is
    /// rewound to 0. Returns whether a mark was skipped.
    pub fn skip_preamble(&mut self) -> Result<bool> {
        let preamble = self.encoding.preamble();
        if self.stream.position() != 0 || preamble.is_empty() {
            return Ok(false);
        }

        for &expected in preamble {
            let matches = self.stream.remaining() > 0 && self.stream.read_byte()? == expected;
            if !matches {
                self.stream.set_position(0)?;
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn read_char(&mut self) -> Result<char> {
        self.skip_preamble()?;
        let text = read_chars_from(&mut self.stream, self.encoding, 1)?;
        text.chars()
            .next()
            .ok_or_else(|| StreamError::end_of_stream(1, 0))
    }

    /// Exactly `count` characters
    pub fn read_chars(&mut self, count: usize) -> Result<String> {
        self.skip_preamble()?;
        read_chars_from(&mut self.stream, self.encoding, count)
    }

    /// Text up to `token`, leaving the stream right after the token.
    ///
    /// Bytes are pulled in chunks and decoded incrementally, so a character
    /// split across two chunks is decoded once both halves are available.
    pub fn read_to_token(&mut self, token: &str) -> Result<String> {
        if token.is_empty() {
            return Err(StreamError::invalid_argument("token", "token is empty"));
        }

        self.skip_preamble()?;
        if self.stream.remaining() == 0 {
            return Err(StreamError::end_of_stream(1, 0));
        }

        let start = self.stream.position();
        let mut bytes: Vec<u8> = Vec::new();
        let mut decoded = 0usize;
        let mut text = String::new();
        // Byte offset, relative to `start`, after each decoded character
        let mut char_ends: Vec<usize> = Vec::new();
        let mut search_from = 0usize;

        loop {
            let chunk = (self.stream.remaining()).min(self.chunk_size as u64) as usize;
            if chunk > 0 {
                let filled = bytes.len();
                bytes.resize(filled + chunk, 0);
                self.stream.read_bytes(&mut bytes[filled..])?;
            }
            let at_end = self.stream.remaining() == 0;

            while decoded < bytes.len() {
                match self.encoding.decode_step(&bytes[decoded..]) {
                    DecodeStep::Char { ch, len } => {
                        text.push(ch);
                        decoded += len;
                    }
                    DecodeStep::Incomplete if at_end => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        decoded = bytes.len();
                    }
                    DecodeStep::Incomplete => break,
                }
                char_ends.push(decoded);
            }

            if let Some(found) = text[search_from..].find(token) {
                let match_end = search_from + found + token.len();
                let chars_through_token = text[..match_end].chars().count();
                let consumed = char_ends[chars_through_token - 1];

                self.stream.set_position(start + consumed as u64)?;
                text.truncate(search_from + found);
                return Ok(text);
            }

            if at_end {
                self.stream.set_position(start + bytes.len() as u64)?;
                return Ok(text);
            }

            // A match may start in the last `token.len() - 1` bytes of text
            search_from = text.len().saturating_sub(token.len() - 1);
            while !text.is_char_boundary(search_from) {
                search_from -= 1;
            }
        }
    }

    /// One line without its terminator
    pub fn read_line(&mut self) -> Result<String> {
        match self.newline.clone() {
            NewLine::Auto => {
                let mut line = self.read_to_token("\n")?;
                if line.ends_with('\r') {
                    line.pop();
                }
                Ok(line)
            }
            NewLine::Token(token) => self.read_to_token(&token),
        }
    }

    /// Every remaining line
    pub fn read_lines(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        self.skip_preamble()?;
        while !self.end_of_stream() {
            lines.push(self.read_line()?);
        }
        Ok(lines)
    }

    /// All remaining text; empty at the end of the stream
    pub fn read_to_end(&mut self) -> Result<String> {
        self.skip_preamble()?;
        let mut bytes = vec![0u8; self.stream.remaining() as usize];
        self.stream.read_bytes(&mut bytes)?;
        Ok(self.encoding.decode(&bytes))
    }

    fn peek<R>(&mut self, read: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let position = self.stream.position();
        let result = read(self);
        self.stream.set_position(position)?;
        result
    }

    pub fn peek_char(&mut self) -> Result<char> {
        self.peek(|reader| reader.read_char())
    }

    pub fn peek_chars(&mut self, count: usize) -> Result<String> {
        self.peek(|reader| reader.read_chars(count))
    }

    pub fn peek_line(&mut self) -> Result<String> {
        self.peek(|reader| reader.read_line())
    }

    pub fn peek_to_token(&mut self, token: &str) -> Result<String> {
        self.peek(|reader| reader.read_to_token(token))
    }
}
