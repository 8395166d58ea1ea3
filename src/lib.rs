//! Zero-copy, bounds-checked PE/PE32+ parsing over memory-mapped files.
//!
//! A [`PeContext`] maps a file and validates its header chain (DOS header,
//! NT signature, COFF header, optional header, data directories, section
//! table) into a [`Layout`]. [`PeContext::pe`] then hands out a [`PeFile`]
//! whose typed views borrow straight from the mapping, together with
//! RVA/file-offset translation over the section table.
//!
//! Input is treated as hostile: every structure is bounds-checked before it
//! is overlaid, header counts are capped by [`MAX_DIRECTORIES`] and
//! [`MAX_SECTIONS`], and all address arithmetic is overflow-free.

pub mod config;
pub mod context;
pub mod error;
pub mod formats;
pub mod io;
pub mod logging;

pub use config::OpenOptions;
pub use context::{CacheSlot, CachedArtifact, ContextState, LifecycleHook, PeContext};
pub use error::{ErrorKind, PeError, Result};
pub use formats::pe::{
    catalog, DirectoryEntry, Layout, OptionalHeaderKind, PeFile, SectionTable, MAX_DIRECTORIES,
    MAX_SECTIONS,
};
