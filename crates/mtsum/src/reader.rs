//! Positional file reading
//!
//! The engine reads leaves through the [`ReadAt`] seam: fill a caller buffer
//! from an absolute offset, exactly, or fail. [`ChunkReader`] is the plain
//! filesystem implementation; the cluster transport can substitute its own
//! when the underlying file system offers parallel I/O.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Read error taxonomy for the positional reader.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("short read at offset {offset}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        offset: u64,
        wanted: usize,
        got: usize,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Positional random-access reads over some byte source.
///
/// Implementations take `&self` and must be safe for concurrent readers;
/// open/seek/close stay hidden behind the type.
pub trait ReadAt: Send + Sync {
    /// Fill all of `buf` from `offset`, surfacing short reads as
    /// [`ReadError::ShortRead`].
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), ReadError>;
}

/// Positional reader over a regular file.
///
/// Holds the file open for its lifetime; reads never move a shared cursor,
/// so any number of leaf tasks can read through one instance concurrently.
#[derive(Debug)]
pub struct ChunkReader {
    file: File,
    path: PathBuf,
}

impl ChunkReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| ReadError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File length in bytes.
    pub fn len(&self) -> Result<u64, ReadError> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ReadError> {
        Ok(self.len()? == 0)
    }

    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.read_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file.seek_read(buf, offset)
    }
}

impl ReadAt for ChunkReader {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), ReadError> {
        let wanted = buf.len();
        let mut filled = 0;
        while filled < wanted {
            match self.read_at(offset + filled as u64, &mut buf[filled..]) {
                Ok(0) => {
                    return Err(ReadError::ShortRead {
                        offset,
                        wanted,
                        got: filled,
                    })
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
