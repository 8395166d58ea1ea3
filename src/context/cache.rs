//! Collaborator-owned data attached to a context.
//!
//! Import/export walkers, hashers and resource decoders build their results
//! on top of a parsed image and park them here. The context never looks
//! inside an artifact; it only releases it when the file is closed.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::path::Path;

/// The fixed set of slots a context carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheSlot {
    Imports,
    Exports,
    HeaderHashes,
    SectionHashes,
    FileHash,
    Resources,
}

impl CacheSlot {
    pub const ALL: [CacheSlot; 6] = [
        Self::Imports,
        Self::Exports,
        Self::HeaderHashes,
        Self::SectionHashes,
        Self::FileHash,
        Self::Resources,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Downcasting support for artifacts. Implemented for every `'static` type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Derived data produced by a collaborator.
pub trait CachedArtifact: AsAny + Send {
    /// Teardown hook, called once when the owning context closes or the slot
    /// is overwritten. The artifact is dropped right after.
    fn release(&mut self) {}
}

/// Init/teardown notifications for collaborators with process-wide state,
/// such as a digest registry.
pub trait LifecycleHook: Send + Sync {
    /// A file was opened and mapped.
    fn on_open(&self, _path: &Path) {}

    /// The context is being torn down.
    fn on_close(&self) {}
}

/// Six optional artifact slots.
#[derive(Default)]
pub struct DerivedCache {
    slots: [Option<Box<dyn CachedArtifact>>; 6],
}

impl DerivedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `artifact` in `slot`, releasing whatever was there.
    pub fn attach(&mut self, slot: CacheSlot, artifact: Box<dyn CachedArtifact>) {
        if let Some(mut previous) = self.slots[slot.index()].replace(artifact) {
            previous.release();
        }
    }

    pub fn get(&self, slot: CacheSlot) -> Option<&dyn CachedArtifact> {
        self.slots[slot.index()].as_deref()
    }

    /// Borrow the artifact in `slot` as a concrete type.
    pub fn get_as<T: CachedArtifact + 'static>(&self, slot: CacheSlot) -> Option<&T> {
        let artifact = self.get(slot)?;
        AsAny::as_any(artifact).downcast_ref::<T>()
    }

    pub fn contains(&self, slot: CacheSlot) -> bool {
        self.slots[slot.index()].is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Release and drop every artifact. Returns how many were present.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for slot in self.slots.iter_mut() {
            if let Some(mut artifact) = slot.take() {
                artifact.release();
                released += 1;
            }
        }
        released
    }
}

impl Drop for DerivedCache {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl fmt::Debug for DerivedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled: Vec<CacheSlot> = CacheSlot::ALL
            .into_iter()
            .filter(|slot| self.contains(*slot))
            .collect();
        f.debug_struct("DerivedCache").field("filled", &filled).finish()
    }
}
