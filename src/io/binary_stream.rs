// SPDX-License-Identifier: MIT
use std::io::{Cursor, Write};

#[cfg(test)]
use mockall::automock;

use crate::error::{Result, StreamError};

/// Minimal seekable byte stream used by the readers and writers.
///
/// Reads are all-or-nothing: when fewer bytes remain than requested the call
/// fails with [`StreamError::EndOfStream`] and the position does not move.
#[cfg_attr(test, automock)]
pub trait BinaryStream {
    /// Current cursor, relative to the start of the stream
    fn position(&self) -> u64;

    /// Move the cursor; positions past [`length`](Self::length) are rejected
    fn set_position(&mut self, position: u64) -> Result<()>;

    fn length(&self) -> u64;

    /// Fill `buffer` completely from the current position
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()>;

    /// Write all of `buffer` at the current position
    fn write_bytes(&mut self, buffer: &[u8]) -> Result<()>;

    /// Bytes between the cursor and the end of the stream
    #[inline]
    fn remaining(&self) -> u64 {
        self.length().saturating_sub(self.position())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_bytes(&mut byte)?;
        Ok(byte[0])
    }

    fn write_byte(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }
}

impl<T: BinaryStream + ?Sized> BinaryStream for &mut T {
    fn position(&self) -> u64 {
        (**self).position()
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        (**self).set_position(position)
    }

    fn length(&self) -> u64 {
        (**self).length()
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()> {
        (**self).read_bytes(buffer)
    }

    fn write_bytes(&mut self, buffer: &[u8]) -> Result<()> {
        (**self).write_bytes(buffer)
    }
}

/// Plain in-memory byte buffers
impl BinaryStream for Cursor<Vec<u8>> {
    fn position(&self) -> u64 {
        Cursor::position(self)
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        let length = self.get_ref().len() as u64;
        if position > length {
            return Err(StreamError::out_of_range(
                "position",
                format!("{position} is past the end of a {length}-byte buffer"),
            ));
        }
        Cursor::set_position(self, position);
        Ok(())
    }

    fn length(&self) -> u64 {
        self.get_ref().len() as u64
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()> {
        let length = self.get_ref().len() as u64;
        let available = length.saturating_sub(Cursor::position(self));
        if buffer.len() as u64 > available {
            return Err(StreamError::end_of_stream(buffer.len() as u64, available));
        }

        let start = Cursor::position(self) as usize;
        buffer.copy_from_slice(&self.get_ref()[start..start + buffer.len()]);
        Cursor::set_position(self, (start + buffer.len()) as u64);
        Ok(())
    }

    fn write_bytes(&mut self, buffer: &[u8]) -> Result<()> {
        self.write_all(buffer)?;
        Ok(())
    }
}
