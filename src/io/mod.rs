//! File opening and memory mapping.
//!
//! [`MappedRegion`] owns the mapping a context parses. Read-only files are
//! mapped privately, read-write files are mapped shared so that writes reach
//! the file and every other mapping of it. Zero-length files cannot be mapped
//! and are represented by an empty region instead.

use crate::error::{PeError, Result};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::{File, OpenOptions as FsOpenOptions};
use std::path::Path;
use tracing::{debug, trace};

/// Open `path` for reading, and for writing too when `writable` is set.
pub fn open_file(path: &Path, writable: bool) -> Result<File> {
    FsOpenOptions::new()
        .read(true)
        .write(writable)
        .open(path)
        .map_err(|source| PeError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Stat an open handle and return its length, rejecting anything that is
/// not a regular file.
pub fn regular_file_len(file: &File, path: &Path) -> Result<u64> {
    let metadata = file.metadata().map_err(|source| PeError::FstatFailed {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(PeError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok(metadata.len())
}

/// The mapped bytes of one file.
#[derive(Debug)]
pub enum MappedRegion {
    /// Private read-only mapping.
    ReadOnly(Mmap),
    /// Shared writable mapping.
    Writable(MmapMut),
    /// Zero-length file; nothing is mapped.
    Empty,
}

impl MappedRegion {
    /// Map all `len` bytes of `file`.
    pub fn map(file: &File, path: &Path, len: u64, writable: bool) -> Result<Self> {
        if len == 0 {
            debug!(path = %path.display(), "empty file, skipping mmap");
            return Ok(Self::Empty);
        }

        let mapped = if writable {
            // Safety: the mapping is owned by the context and never outlives
            // it; concurrent modification by other processes is the caller's
            // responsibility, as with any shared mapping.
            unsafe { MmapMut::map_mut(file) }.map(Self::Writable)
        } else {
            // Safety: private copy-on-write mapping of a regular file.
            unsafe { MmapOptions::new().map_copy_read_only(file) }.map(Self::ReadOnly)
        };

        let region = mapped.map_err(|source| PeError::MmapFailed {
            path: path.to_path_buf(),
            source,
        })?;
        trace!(path = %path.display(), size = len, writable, "mapped file");
        Ok(region)
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::ReadOnly(map) => &map[..],
            Self::Writable(map) => &map[..],
            Self::Empty => &[],
        }
    }

    /// Mutable bytes, only for writable mappings.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Writable(map) => Some(&mut map[..]),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Writable(_))
    }

    /// Hint that the region will be read front to back. Best-effort.
    #[cfg(unix)]
    pub fn advise_sequential(&self) -> std::io::Result<()> {
        use memmap2::Advice;
        match self {
            Self::ReadOnly(map) => map.advise(Advice::Sequential),
            Self::Writable(map) => map.advise(Advice::Sequential),
            Self::Empty => Ok(()),
        }
    }

    #[cfg(not(unix))]
    pub fn advise_sequential(&self) -> std::io::Result<()> {
        Ok(())
    }

    /// Write dirty pages of a writable mapping back to the file.
    pub fn flush(&self) -> std::io::Result<()> {
        match self {
            Self::Writable(map) => map.flush(),
            _ => Ok(()),
        }
    }
}
