//! Random-access byte sources
//!
//! A [`ReadAdapter`] is the read side of the package contract: the package
//! reader only ever asks for the total size and for bytes at an offset.

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// Random-access, read-only byte source
///
/// Implementations must be `Send + Sync`; concurrent `read_at` calls on one
/// adapter must not interfere with each other.
pub trait ReadAdapter: Send + Sync {
    /// Total size in bytes
    fn size(&self) -> u64;

    /// Read up to `buf.len()` bytes starting at `pos`.
    ///
    /// Returns the number of bytes read; 0 means `pos` is at or past the end.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Read the whole source into memory
    fn read_all(&self) -> io::Result<Vec<u8>> {
        let size = usize::try_from(self.size())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "source too large"))?;
        let mut data = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let n = self.read_at(filled as u64, &mut data[filled..])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended at {} of {} bytes", filled, size),
                ));
            }
            filled += n;
        }
        Ok(data)
    }
}

/// Adapter over a file on disk
pub struct FileAdapter {
    file: Mutex<File>,
    size: u64,
}

impl FileAdapter {
    /// Open a file for random-access reads
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }
}

impl ReadAdapter for FileAdapter {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        if pos >= self.size {
            return Ok(0);
        }
        // Seek and read must happen as one unit
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pos))?;
        file.read(buf)
    }
}

/// Adapter over bytes already in memory
#[derive(Clone)]
pub struct MemoryAdapter {
    data: Arc<[u8]>,
}

impl MemoryAdapter {
    /// Wrap an in-memory buffer
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    /// Drain a stream into memory
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::new(data))
    }
}

impl ReadAdapter for MemoryAdapter {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.data.len() as u64;
        if pos >= len {
            return Ok(0);
        }
        let start = pos as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn read_all(&self) -> io::Result<Vec<u8>> {
        Ok(self.data.to_vec())
    }
}
