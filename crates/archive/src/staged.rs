//! Staged file output with atomic commit
//!
//! Package bytes for a named destination are written to a sibling temp file
//! first. [`StagedFile::commit`] renames it over the destination; dropping an
//! uncommitted stage removes the temp file, so a failed run never leaves a
//! partial package at the caller-visible path.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Temp-file stage for a destination path
pub struct StagedFile {
    final_path: PathBuf,
    temp_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl StagedFile {
    /// Create the temp file next to `path`
    ///
    /// Creates the parent directory if it does not exist. The destination
    /// itself is not touched until [`commit`](Self::commit).
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = Self::temp_path_for(path);
        let file = File::create(&temp_path)?;

        Ok(Self {
            final_path: path.to_path_buf(),
            temp_path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Temp path used for a destination: `<name>.tmp` in the same directory
    pub fn temp_path_for(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        path.with_file_name(name)
    }

    /// Destination path
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Temp file path
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Move the staged bytes to the destination
    ///
    /// With `sync`, the file is fsynced before the rename and the parent
    /// directory after it.
    pub fn commit(mut self, sync: bool) -> io::Result<PathBuf> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stage already closed"))?;

        if let Err(e) = Self::persist(writer, sync, &self.temp_path, &self.final_path) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(e);
        }

        if sync {
            if let Some(parent) = self.final_path.parent() {
                if !parent.as_os_str().is_empty() {
                    File::open(parent)?.sync_all()?;
                }
            }
        }

        debug!(target: "modelport::archive", path = %self.final_path.display(), "Committed staged file");
        Ok(self.final_path.clone())
    }
}

impl StagedFile {
    fn persist(
        writer: BufWriter<File>,
        sync: bool,
        temp_path: &Path,
        final_path: &Path,
    ) -> io::Result<()> {
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        if sync {
            file.sync_all()?;
        }
        drop(file);
        fs::rename(temp_path, final_path)
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(w) => w.write(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "stage already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // Uncommitted: discard the temp file
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.temp_path) {
                warn!(target: "modelport::archive", path = %self.temp_path.display(), error = %e, "Failed to remove staged file");
            }
        }
    }
}
