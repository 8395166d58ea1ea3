//! Open/parse/query/close lifecycle over one mapped PE file.

pub mod cache;

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OpenOptions;
use crate::error::{PeError, Result};
use crate::formats::pe::{Layout, PeFile};
use crate::io::{open_file, regular_file_len, MappedRegion};

pub use cache::{AsAny, CacheSlot, CachedArtifact, DerivedCache, LifecycleHook};

/// Where a context is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextState {
    /// Nothing mapped.
    Empty,
    /// A file is mapped but its headers have not been validated.
    Opened,
    /// The headers were validated; [`PeContext::pe`] is available.
    Parsed,
}

/// Owns one mapped file, its parsed layout and any collaborator artifacts.
///
/// ```no_run
/// use peoverlay::{OpenOptions, PeContext};
///
/// let ctx = PeContext::load("sample.exe", &OpenOptions::default())?;
/// let pe = ctx.pe()?;
/// println!("entry point {:#x}", pe.entry_point());
/// # Ok::<(), peoverlay::PeError>(())
/// ```
///
/// Views returned by [`pe`](Self::pe) borrow the context, so it cannot be
/// closed, reopened or mutated while any of them is alive.
pub struct PeContext {
    path: Option<PathBuf>,
    stream: Option<BufReader<File>>,
    region: Option<MappedRegion>,
    writable: bool,
    layout: Option<Layout>,
    cache: DerivedCache,
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl Default for PeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PeContext {
    pub fn new() -> Self {
        Self {
            path: None,
            stream: None,
            region: None,
            writable: false,
            layout: None,
            cache: DerivedCache::new(),
            hooks: Vec::new(),
        }
    }

    /// Open and parse `path` in one step.
    pub fn load(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Self> {
        let mut ctx = Self::new();
        ctx.open(path, options)?;
        ctx.parse()?;
        Ok(ctx)
    }

    /// Open and map `path`, closing whatever was open before.
    ///
    /// On failure the context keeps whatever it acquired before the failing
    /// step; [`close`](Self::close) (or dropping the context) releases it.
    pub fn open(&mut self, path: impl AsRef<Path>, options: &OpenOptions) -> Result<()> {
        if self.path.is_some() || self.region.is_some() {
            self.close()?;
        }

        let path = path.as_ref();
        let _span = tracing::debug_span!("pe_open", path = %path.display()).entered();
        self.path = Some(path.to_path_buf());

        let file = open_file(path, options.read_write)?;
        let len = regular_file_len(&file, path)?;
        let region = MappedRegion::map(&file, path, len, options.read_write)?;
        self.region = Some(region);
        self.writable = options.read_write;

        if options.keep_handle_open {
            self.stream = Some(BufReader::new(file));
        }

        if let Some(Err(e)) = self.region.as_ref().map(MappedRegion::advise_sequential) {
            debug!(error = %e, "sequential access advice rejected, continuing");
        }

        for hook in &self.hooks {
            hook.on_open(path);
        }

        debug!(
            size = len,
            writable = options.read_write,
            keep_handle_open = options.keep_handle_open,
            "opened file"
        );
        Ok(())
    }

    /// Validate the mapped bytes and index their headers.
    ///
    /// May be called again after mutating a writable mapping. The previous
    /// layout is discarded first, so a failed parse leaves the context
    /// `Opened`, never half-parsed.
    pub fn parse(&mut self) -> Result<()> {
        let region = self.region.as_ref().ok_or(PeError::NotLoaded)?;
        self.layout = None;

        let _span = tracing::debug_span!("pe_parse", size = region.len()).entered();
        let layout = Layout::parse(region.as_slice()).inspect_err(|e| {
            debug!(error = %e, kind = ?e.kind(), "parse rejected");
        })?;
        self.layout = Some(layout);
        Ok(())
    }

    /// A non-empty region is mapped.
    pub fn is_loaded(&self) -> bool {
        self.region.as_ref().is_some_and(|r| !r.is_empty())
    }

    pub fn state(&self) -> ContextState {
        match (&self.region, &self.layout) {
            (None, _) => ContextState::Empty,
            (Some(_), None) => ContextState::Opened,
            (Some(_), Some(_)) => ContextState::Parsed,
        }
    }

    /// Typed views over the parsed image.
    pub fn pe(&self) -> Result<PeFile<'_>> {
        let layout = self.layout.as_ref().ok_or(PeError::NotParsed)?;
        let region = self.region.as_ref().ok_or(PeError::NotLoaded)?;
        PeFile::bind(region.as_slice(), layout)
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.region.as_ref().map(MappedRegion::as_slice)
    }

    /// Mutable bytes of a read-write mapping. Changes reach the file; call
    /// [`parse`](Self::parse) again if headers were touched.
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.region.as_mut().and_then(MappedRegion::as_mut_slice)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The retained file handle, when opened with `keep_handle_open`.
    ///
    /// The buffer only serves reads. With `read_write` the underlying file is
    /// opened for writing too; write through [`BufReader::get_mut`].
    pub fn stream_mut(&mut self) -> Option<&mut BufReader<File>> {
        self.stream.as_mut()
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Size of the mapped region, 0 when nothing is mapped.
    pub fn filesize(&self) -> usize {
        self.region.as_ref().map_or(0, MappedRegion::len)
    }

    /// Synchronously write a read-write mapping back to its file.
    pub fn flush(&self) -> Result<()> {
        let region = self.region.as_ref().ok_or(PeError::NotLoaded)?;
        region.flush().map_err(|source| PeError::UnmapFailed {
            path: self.path.clone().unwrap_or_default(),
            source,
        })
    }

    /// Park a collaborator artifact in `slot`, releasing any previous one.
    pub fn attach_cached<A: CachedArtifact + 'static>(&mut self, slot: CacheSlot, artifact: A) {
        self.cache.attach(slot, Box::new(artifact));
    }

    pub fn cached(&self, slot: CacheSlot) -> Option<&dyn CachedArtifact> {
        self.cache.get(slot)
    }

    pub fn cached_as<T: CachedArtifact + 'static>(&self, slot: CacheSlot) -> Option<&T> {
        self.cache.get_as::<T>(slot)
    }

    /// Register a hook notified on every later open and close. Hooks stay
    /// registered across `close`.
    pub fn register_hook(&mut self, hook: Arc<dyn LifecycleHook>) {
        self.hooks.push(hook);
    }

    /// Release everything and return to [`ContextState::Empty`].
    ///
    /// Every resource is released even when writing back the mapping fails;
    /// that failure is reported as [`PeError::UnmapFailed`] afterwards.
    pub fn close(&mut self) -> Result<()> {
        let flushed = self.region.take().map(|region| region.flush());
        self.finish_close(flushed)
    }

    /// Teardown after the region is gone. `flushed` is `None` when nothing
    /// was mapped, otherwise the outcome of writing the mapping back.
    fn finish_close(&mut self, flushed: Option<io::Result<()>>) -> Result<()> {
        self.stream = None;
        let path = self.path.take();
        self.layout = None;

        let released = self.cache.release_all();

        if flushed.is_some() {
            for hook in &self.hooks {
                hook.on_close();
            }
        }
        self.writable = false;

        let result = match flushed {
            Some(Err(source)) => {
                warn!(error = %source, "failed to write back mapping on close");
                Err(PeError::UnmapFailed {
                    path: path.clone().unwrap_or_default(),
                    source,
                })
            }
            _ => Ok(()),
        };

        debug!(
            path = %path.as_deref().unwrap_or_else(|| Path::new("")).display(),
            released,
            "closed"
        );
        result
    }
}

impl Drop for PeContext {
    fn drop(&mut self) {
        if self.path.is_none() && self.region.is_none() && self.cache.is_empty() {
            return;
        }
        if let Err(e) = self.close() {
            warn!(error = %e, "close during drop failed");
        }
    }
}

impl fmt::Debug for PeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeContext")
            .field("path", &self.path)
            .field("state", &self.state())
            .field("filesize", &self.filesize())
            .field("writable", &self.writable)
            .field("stream", &self.stream.is_some())
            .field("cache", &self.cache)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
