// SPDX-License-Identifier: MIT
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::StreamSource;
use crate::error::{Result, StreamError};

/// How a file-backed source opens its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOpenMode {
    /// Read only; the file must exist
    Read,
    /// Create the file, truncating existing content
    Write,
    /// Read and write; the file is created when missing and never truncated
    ReadWrite,
    /// Write after the existing content; the file must exist
    Append,
}

impl FileOpenMode {
    /// Whether the mode requires the file to exist up front
    pub fn requires_existing(self) -> bool {
        matches!(self, FileOpenMode::Read | FileOpenMode::Append)
    }

    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            FileOpenMode::Read => {
                options.read(true);
            }
            FileOpenMode::Write => {
                options.read(true).write(true).create(true).truncate(true);
            }
            FileOpenMode::ReadWrite => {
                options.read(true).write(true).create(true).truncate(false);
            }
            FileOpenMode::Append => {
                options.read(true).write(true);
            }
        }
        options
    }
}

impl std::fmt::Display for FileOpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOpenMode::Read => write!(f, "read"),
            FileOpenMode::Write => write!(f, "write"),
            FileOpenMode::ReadWrite => write!(f, "read-write"),
            FileOpenMode::Append => write!(f, "append"),
        }
    }
}

#[derive(Debug)]
enum FileState {
    /// Not opened yet
    Pending,
    Open { file: File, cursor: u64 },
    Closed,
}

/// File-backed source that opens its handle on the first I/O call.
///
/// Constructing one is cheap; open failures surface on first use. Modes that
/// need an existing file ([`FileOpenMode::Read`], [`FileOpenMode::Append`])
/// check for it at construction. Symbolic links resolve to their target.
#[derive(Debug)]
pub struct LazyFileSource {
    path: PathBuf,
    mode: FileOpenMode,
    state: FileState,
    position: u64,
    /// Size reported before the file is opened
    initial_length: u64,
    /// Append mode never writes below this offset
    append_floor: u64,
}

impl LazyFileSource {
    pub fn new(path: impl AsRef<Path>, mode: FileOpenMode) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StreamError::invalid_argument("path", "path is empty"));
        }

        let existing_length = match fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => {
                return Err(StreamError::invalid_argument(
                    "path",
                    format!("{} is a directory", path.display()),
                ));
            }
            Ok(metadata) => Some(metadata.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !mode.requires_existing() => {
                None
            }
            Err(e) => return Err(StreamError::Io(e)),
        };

        let initial_length = match mode {
            FileOpenMode::Write => 0,
            _ => existing_length.unwrap_or(0),
        };
        let append_floor = if mode == FileOpenMode::Append {
            initial_length
        } else {
            0
        };

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            state: FileState::Pending,
            position: append_floor,
            initial_length,
            append_floor,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> FileOpenMode {
        self.mode
    }

    /// Whether the file handle has been opened
    pub fn is_open(&self) -> bool {
        matches!(self.state, FileState::Open { .. })
    }

    /// Open the handle if needed and position it at the cursor
    fn file_at_position(&mut self) -> Result<&mut File> {
        if matches!(self.state, FileState::Pending) {
            debug!(path = %self.path.display(), mode = %self.mode, "Opening file");
            let file = self.mode.options().open(&self.path)?;
            self.state = FileState::Open { file, cursor: 0 };
        }

        match &mut self.state {
            FileState::Open { file, cursor } => {
                if *cursor != self.position {
                    file.seek(SeekFrom::Start(self.position))?;
                    *cursor = self.position;
                }
                Ok(file)
            }
            FileState::Pending | FileState::Closed => Err(StreamError::Disposed),
        }
    }

    fn advance(&mut self, count: u64) {
        self.position += count;
        if let FileState::Open { cursor, .. } = &mut self.state {
            *cursor = self.position;
        }
    }
}

impl StreamSource for LazyFileSource {
    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        if matches!(self.state, FileState::Closed) {
            return Err(StreamError::Disposed);
        }
        self.position = position;
        Ok(())
    }

    fn length(&mut self) -> Result<u64> {
        match &self.state {
            FileState::Pending => Ok(self.initial_length),
            FileState::Open { file, .. } => Ok(file.metadata()?.len()),
            FileState::Closed => Err(StreamError::Disposed),
        }
    }

    fn set_length(&mut self, length: u64) -> Result<()> {
        if self.mode == FileOpenMode::Read {
            return Err(StreamError::InvalidOperation(
                "file is opened read-only".to_string(),
            ));
        }
        let file = self.file_at_position()?;
        file.set_len(length)?;
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        matches!(self.state, FileState::Closed)
    }

    fn can_grow(&self) -> bool {
        self.mode != FileOpenMode::Read
    }

    fn flush(&mut self) -> Result<()> {
        match &mut self.state {
            FileState::Pending => Ok(()),
            FileState::Open { file, .. } => Ok(file.flush()?),
            FileState::Closed => Err(StreamError::Disposed),
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }

        let file = self.file_at_position()?;
        let mut total = 0;
        while total < buffer.len() {
            match file.read(&mut buffer[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        self.advance(total as u64);
        Ok(total)
    }

    fn write(&mut self, buffer: &[u8]) -> Result<()> {
        match self.mode {
            FileOpenMode::Read => {
                return Err(StreamError::InvalidOperation(
                    "file is opened read-only".to_string(),
                ));
            }
            FileOpenMode::Append if self.position < self.append_floor => {
                return Err(StreamError::InvalidOperation(format!(
                    "append mode cannot overwrite existing content before offset {}",
                    self.append_floor
                )));
            }
            _ => {}
        }

        let file = self.file_at_position()?;
        file.write_all(buffer)?;
        self.advance(buffer.len() as u64);
        Ok(())
    }

    fn dispose(&mut self) {
        if let FileState::Open { file, .. } = &mut self.state {
            if let Err(e) = file.flush() {
                warn!(path = %self.path.display(), "Failed to flush file on dispose: {}", e);
            }
        }
        self.state = FileState::Closed;
    }
}

impl Drop for LazyFileSource {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_construction_does_not_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lazy.bin");

        let source = LazyFileSource::new(&path, FileOpenMode::Write).unwrap();
        assert!(!source.is_open());
        assert!(!path.exists());
    }

    #[test]
    fn test_read_mode_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let result = LazyFileSource::new(dir.path().join("missing.bin"), FileOpenMode::Read);
        assert!(matches!(result, Err(StreamError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound));

        let result = LazyFileSource::new(dir.path().join("missing.bin"), FileOpenMode::Append);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_path_is_invalid_argument() {
        let result = LazyFileSource::new("", FileOpenMode::ReadWrite);
        assert!(matches!(result, Err(StreamError::InvalidArgument { .. })));
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");

        let mut source = LazyFileSource::new(&path, FileOpenMode::ReadWrite).unwrap();
        source.write(&[1, 2, 3, 4]).unwrap();
        assert!(source.is_open());
        assert_eq!(source.length().unwrap(), 4);

        source.set_position(1).unwrap();
        let mut buffer = [0u8; 2];
        assert_eq!(source.read(&mut buffer).unwrap(), 2);
        assert_eq!(buffer, [2, 3]);
        assert_eq!(source.position(), 3);
    }

    #[test]
    fn test_write_mode_truncates_on_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, [9u8; 10]).unwrap();

        let mut source = LazyFileSource::new(&path, FileOpenMode::Write).unwrap();
        assert_eq!(source.length().unwrap(), 0);
        source.write(&[1]).unwrap();
        source.dispose();

        assert_eq!(fs::read(&path).unwrap(), vec![1]);
    }

    #[test]
    fn test_read_mode_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, [1u8, 2]).unwrap();

        let mut source = LazyFileSource::new(&path, FileOpenMode::Read).unwrap();
        assert_eq!(source.length().unwrap(), 2);
        assert!(matches!(
            source.write(&[0]),
            Err(StreamError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_append_starts_at_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.bin");
        fs::write(&path, [1u8, 2]).unwrap();

        let mut source = LazyFileSource::new(&path, FileOpenMode::Append).unwrap();
        assert_eq!(source.position(), 2);
        source.write(&[3]).unwrap();

        source.set_position(0).unwrap();
        assert!(source.write(&[0]).is_err());
        source.dispose();

        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_dispose_closes() {
        let dir = TempDir::new().unwrap();
        let mut source = LazyFileSource::new(dir.path().join("x.bin"), FileOpenMode::Write).unwrap();
        source.dispose();
        assert!(source.is_disposed());
        assert!(matches!(source.length(), Err(StreamError::Disposed)));
        assert!(matches!(source.write(&[1]), Err(StreamError::Disposed)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_resolves_to_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.bin");
        let link = dir.path().join("link.bin");
        fs::write(&target, [5u8, 6, 7]).unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let mut source = LazyFileSource::new(&link, FileOpenMode::Read).unwrap();
        assert_eq!(source.length().unwrap(), 3);
        let mut buffer = [0u8; 3];
        source.read(&mut buffer).unwrap();
        assert_eq!(buffer, [5, 6, 7]);
    }
}
