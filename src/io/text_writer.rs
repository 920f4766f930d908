// SPDX-License-Identifier: MIT
use super::binary_stream::BinaryStream;
use super::encoding::TextEncoding;
use crate::config::Config;
use crate::error::{Result, StreamError};

/// Text writes over a [`BinaryStream`]
#[derive(Debug)]
pub struct TextWriter<S> {
    stream: S,
    encoding: TextEncoding,
    newline: String,
    auto_preamble: bool,
}

impl<S: BinaryStream> TextWriter<S> {
    /// Writer with the configured default encoding and `\n` line endings
    pub fn new(stream: S) -> Self {
        Self::with_encoding(stream, Config::current().default_encoding)
    }

    pub fn with_encoding(stream: S, encoding: TextEncoding) -> Self {
        Self {
            stream,
            encoding,
            newline: "\n".to_string(),
            auto_preamble: false,
        }
    }

    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    /// Write the byte order mark before the first text written at position 0
    pub fn with_auto_preamble(mut self, enabled: bool) -> Self {
        self.auto_preamble = enabled;
        self
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn newline(&self) -> &str {
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

    /// Write the encoding's byte order mark; only valid at position 0
    pub fn write_preamble(&mut self) -> Result<()> {
        if self.stream.position() != 0 {
            return Err(StreamError::InvalidOperation(
                "preamble can only be written at position 0".to_string(),
            ));
        }
        self.stream.write_bytes(self.encoding.preamble())
    }

    fn write_encoded(&mut self, bytes: &[u8]) -> Result<()> {
        if self.auto_preamble && self.stream.position() == 0 {
            self.write_preamble()?;
        }
        self.stream.write_bytes(bytes)
    }

    pub fn write(&mut self, text: &str) -> Result<()> {
        let bytes = self.encoding.encode(text);
        self.write_encoded(&bytes)
    }

    pub fn write_char(&mut self, ch: char) -> Result<()> {
        let mut bytes = Vec::with_capacity(self.encoding.max_char_len());
        self.encoding.encode_char(ch, &mut bytes);
        self.write_encoded(&bytes)
    }

    /// Text followed by the configured newline
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        let mut line = String::with_capacity(text.len() + self.newline.len());
        line.push_str(text);
        line.push_str(&self.newline);
        self.write(&line)
    }

    pub fn write_lines<I, T>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for line in lines {
            self.write_line(line.as_ref())?;
        }
        Ok(())
    }

    /// Support for `write!` and `writeln!`
    pub fn write_fmt(&mut self, args: std::fmt::Arguments<'_>) -> Result<()> {
        match args.as_str() {
            Some(text) => self.write(text),
            None => self.write(&args.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn writer(encoding: TextEncoding) -> TextWriter<Cursor<Vec<u8>>> {
        TextWriter::with_encoding(Cursor::new(Vec::new()), encoding)
    }

    #[test]
    fn test_write_multibyte_text() {
        let mut w = writer(TextEncoding::Utf8);
        w.write("あア").unwrap();
        assert_eq!(w.stream().position(), 6);
    }

    #[test]
    fn test_preamble_only_at_start() {
        let mut w = writer(TextEncoding::Utf16Le);
        w.write_preamble().unwrap();
        w.write("a").unwrap();
        assert!(matches!(
            w.write_preamble(),
            Err(StreamError::InvalidOperation(_))
        ));
        assert_eq!(w.into_inner().into_inner(), vec![0xFF, 0xFE, b'a', 0]);
    }

    #[test]
    fn test_auto_preamble_written_once() {
        let mut w = writer(TextEncoding::Utf8).with_auto_preamble(true);
        w.write("a").unwrap();
        w.write("b").unwrap();
        assert_eq!(
            w.into_inner().into_inner(),
            vec![0xEF, 0xBB, 0xBF, b'a', b'b']
        );
    }

    #[test]
    fn test_write_lines_with_custom_newline() {
        let mut w = writer(TextEncoding::Ascii).with_newline("\r\n");
        w.write_lines(["a", "b"]).unwrap();
        w.write_char('c').unwrap();
        assert_eq!(w.into_inner().into_inner(), b"a\r\nb\r\nc".to_vec());
    }

    #[test]
    fn test_write_macro() {
        let mut w = writer(TextEncoding::Utf8);
        write!(w, "{}-{}", 1, 2).unwrap();
        assert_eq!(w.into_inner().into_inner(), b"1-2".to_vec());
    }
}
