//! Error types for the peoverlay library.
//!
//! Every fallible operation returns [`PeError`]. Callers that need to branch
//! on the failure should match on [`PeError::kind`], which is a closed,
//! copyable enumeration; the `Display` text is for humans only.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for peoverlay operations.
#[derive(Debug, Error)]
pub enum PeError {
    /// Storage for an index array could not be reserved
    #[error("Allocation failure: could not reserve {count} {what} entries")]
    AllocationFailure { what: &'static str, count: usize },

    /// The file could not be opened
    #[error("Failed to open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The opened handle could not be stat'ed
    #[error("Failed to stat {}: {source}", path.display())]
    FstatFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The path does not name a regular file
    #[error("{} is not a regular file", path.display())]
    NotAFile { path: PathBuf },

    /// The memory mapping could not be created
    #[error("Failed to map {}: {source}", path.display())]
    MmapFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing back and releasing the mapping failed
    #[error("Failed to unmap {}: {source}", path.display())]
    UnmapFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The region does not start with the `MZ` magic
    #[error("Not a PE file: missing MZ signature")]
    NotAPeFile,

    /// `e_lfanew` cannot be read or points outside the mapped region.
    /// `lfanew` is 0 when the DOS header itself is truncated.
    #[error("Invalid e_lfanew {lfanew:#x}: signature lies outside the mapped region")]
    InvalidLfanew { lfanew: u32 },

    /// The NT signature is neither `PE\0\0` nor `NE\0\0`
    #[error("Invalid signature: {signature:#010x}")]
    InvalidSignature { signature: u32 },

    /// The COFF file header is truncated
    #[error("Missing COFF header at offset {offset:#x}")]
    MissingCoffHeader { offset: usize },

    /// The optional header magic or body is truncated
    #[error("Missing optional header at offset {offset:#x}")]
    MissingOptionalHeader { offset: usize },

    /// ROM images and unknown optional header magics
    #[error("Unsupported image: optional header magic {magic:#06x}")]
    UnsupportedImage { magic: u16 },

    /// `NumberOfRvaAndSizes` exceeds the directory guard
    #[error("Too many directories: {count} (limit {limit})")]
    TooManyDirectories { count: u32, limit: u32 },

    /// `NumberOfSections` exceeds the section guard
    #[error("Too many sections: {count} (limit {limit})")]
    TooManySections { count: u16, limit: u16 },

    /// A data directory entry lies outside the mapped region
    #[error("Data directory table at offset {offset:#x} truncated after {valid} of {count} entries")]
    TruncatedDirectoryTable {
        offset: usize,
        valid: usize,
        count: usize,
    },

    /// A section header lies outside the mapped region
    #[error("Section table at offset {offset:#x} truncated after {valid} of {count} headers")]
    TruncatedSectionTable {
        offset: usize,
        valid: usize,
        count: usize,
    },

    /// The context has no file open
    #[error("No file is loaded")]
    NotLoaded,

    /// The context holds a file that has not been parsed yet
    #[error("File has not been parsed")]
    NotParsed,
}

/// Closed classification of [`PeError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AllocationFailure,
    OpenFailed,
    FstatFailed,
    NotAFile,
    MmapFailed,
    UnmapFailed,
    NotAPeFile,
    InvalidLfanew,
    InvalidSignature,
    MissingCoffHeader,
    MissingOptionalHeader,
    UnsupportedImage,
    TooManyDirectories,
    TooManySections,
    TruncatedDirectoryTable,
    TruncatedSectionTable,
    NotLoaded,
    NotParsed,
}

impl ErrorKind {
    /// Failures acquiring or releasing OS resources.
    pub fn is_resource(self) -> bool {
        matches!(
            self,
            Self::AllocationFailure
                | Self::OpenFailed
                | Self::FstatFailed
                | Self::NotAFile
                | Self::MmapFailed
                | Self::UnmapFailed
        )
    }

    /// Failures validating the PE structure.
    pub fn is_format(self) -> bool {
        matches!(
            self,
            Self::NotAPeFile
                | Self::InvalidLfanew
                | Self::InvalidSignature
                | Self::MissingCoffHeader
                | Self::MissingOptionalHeader
                | Self::UnsupportedImage
                | Self::TooManyDirectories
                | Self::TooManySections
                | Self::TruncatedDirectoryTable
                | Self::TruncatedSectionTable
        )
    }
}

impl PeError {
    /// The kind callers should branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            Self::OpenFailed { .. } => ErrorKind::OpenFailed,
            Self::FstatFailed { .. } => ErrorKind::FstatFailed,
            Self::NotAFile { .. } => ErrorKind::NotAFile,
            Self::MmapFailed { .. } => ErrorKind::MmapFailed,
            Self::UnmapFailed { .. } => ErrorKind::UnmapFailed,
            Self::NotAPeFile => ErrorKind::NotAPeFile,
            Self::InvalidLfanew { .. } => ErrorKind::InvalidLfanew,
            Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            Self::MissingCoffHeader { .. } => ErrorKind::MissingCoffHeader,
            Self::MissingOptionalHeader { .. } => ErrorKind::MissingOptionalHeader,
            Self::UnsupportedImage { .. } => ErrorKind::UnsupportedImage,
            Self::TooManyDirectories { .. } => ErrorKind::TooManyDirectories,
            Self::TooManySections { .. } => ErrorKind::TooManySections,
            Self::TruncatedDirectoryTable { .. } => ErrorKind::TruncatedDirectoryTable,
            Self::TruncatedSectionTable { .. } => ErrorKind::TruncatedSectionTable,
            Self::NotLoaded => ErrorKind::NotLoaded,
            Self::NotParsed => ErrorKind::NotParsed,
        }
    }
}

/// Result type alias for peoverlay operations
pub type Result<T> = std::result::Result<T, PeError>;
