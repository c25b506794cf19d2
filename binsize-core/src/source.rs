use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{FormatError, Result, SizeError};

/// Seekable stream of bytes with a known total length.
///
/// Owns the underlying reader; for files, dropping the source closes the
/// handle.
#[derive(Debug)]
pub struct ByteSource<R> {
    inner: R,
    len: u64,
}

impl ByteSource<File> {
    /// Opens the file at `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SizeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file)
    }
}

impl<R: Read + Seek> ByteSource<R> {
    /// Wraps an already-open reader, probing its total length.
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| SizeError::short_read("stream bounds", e))?;
        inner
            .seek(SeekFrom::Start(0))
            .map_err(|e| SizeError::short_read("stream bounds", e))?;
        Ok(Self { inner, len })
    }

    /// Total length of the stream in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.seek_to(0)
    }

    /// Seeks to an absolute offset, rejecting offsets beyond the end.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        if offset > self.len {
            return Err(FormatError::OffsetOutOfRange {
                offset,
                len: self.len,
            }
            .into());
        }
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|e| SizeError::short_read("stream bounds", e))?;
        Ok(())
    }
}

impl<R: Read> Read for ByteSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
