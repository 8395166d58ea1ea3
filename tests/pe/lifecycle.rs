use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use peoverlay::{
    CacheSlot, CachedArtifact, ContextState, ErrorKind, LifecycleHook, OpenOptions, PeContext,
};

use crate::common::{create_temp_file, PeImage, COFF};

struct ImportSummary {
    count: usize,
    released: Arc<AtomicUsize>,
}

impl CachedArtifact for ImportSummary {
    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl LifecycleHook for Recorder {
    fn on_open(&self, path: &Path) {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.events.lock().unwrap().push(format!("open {name}"));
    }

    fn on_close(&self) {
        self.events.lock().unwrap().push("close".to_string());
    }
}

#[test]
fn full_lifecycle() {
    let file = create_temp_file(&PeImage::pe32().build());
    let recorder = Arc::new(Recorder::default());
    let released = Arc::new(AtomicUsize::new(0));

    let mut ctx = PeContext::new();
    ctx.register_hook(recorder.clone());
    assert_eq!(ctx.state(), ContextState::Empty);

    ctx.open(file.path(), &OpenOptions::default()).unwrap();
    assert_eq!(ctx.state(), ContextState::Opened);
    assert_eq!(ctx.filesize(), PeImage::pe32().build().len());
    assert_eq!(ctx.path(), Some(file.path()));

    ctx.parse().unwrap();
    assert_eq!(ctx.state(), ContextState::Parsed);

    ctx.attach_cached(
        CacheSlot::Imports,
        ImportSummary {
            count: 3,
            released: released.clone(),
        },
    );
    assert_eq!(ctx.cached_as::<ImportSummary>(CacheSlot::Imports).unwrap().count, 3);

    ctx.close().unwrap();
    assert_eq!(ctx.state(), ContextState::Empty);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(ctx.cached(CacheSlot::Imports).is_none());

    let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![format!("open {name}"), "close".to_string()]
    );
}

#[test]
fn queries_require_the_right_state() {
    let mut ctx = PeContext::new();
    assert_eq!(ctx.parse().unwrap_err().kind(), ErrorKind::NotLoaded);
    assert_eq!(ctx.pe().unwrap_err().kind(), ErrorKind::NotParsed);
    assert_eq!(ctx.flush().unwrap_err().kind(), ErrorKind::NotLoaded);
    assert!(ctx.bytes().is_none());

    let file = create_temp_file(&PeImage::pe32().build());
    ctx.open(file.path(), &OpenOptions::default()).unwrap();
    assert_eq!(ctx.pe().unwrap_err().kind(), ErrorKind::NotParsed);
}

#[test]
fn failed_reparse_discards_layout() {
    let file = create_temp_file(&PeImage::pe32().build());
    let mut ctx = PeContext::new();
    ctx.open(file.path(), &OpenOptions::new().read_write(true)).unwrap();
    ctx.parse().unwrap();

    ctx.bytes_mut().unwrap()[0] = b'X';
    assert_eq!(ctx.parse().unwrap_err().kind(), ErrorKind::NotAPeFile);
    assert_eq!(ctx.state(), ContextState::Opened);
    assert_eq!(ctx.pe().unwrap_err().kind(), ErrorKind::NotParsed);
}

#[test]
fn writable_mapping_reaches_the_file() {
    let file = create_temp_file(&PeImage::pe32().build());
    let mut ctx = PeContext::load(file.path(), &OpenOptions::new().read_write(true)).unwrap();
    assert!(ctx.is_writable());
    assert_eq!(ctx.pe().unwrap().sections_count(), 2);

    // Drop the declared section count to one and re-parse
    ctx.bytes_mut().unwrap()[COFF + 2..COFF + 4].copy_from_slice(&1u16.to_le_bytes());
    ctx.parse().unwrap();
    assert_eq!(ctx.pe().unwrap().sections_count(), 1);
    ctx.close().unwrap();

    let on_disk = std::fs::read(file.path()).unwrap();
    assert_eq!(u16::from_le_bytes([on_disk[COFF + 2], on_disk[COFF + 3]]), 1);
}

#[test]
fn read_only_mapping_is_private() {
    let original = PeImage::pe32().build();
    let file = create_temp_file(&original);
    let ctx = PeContext::load(file.path(), &OpenOptions::default()).unwrap();
    assert!(!ctx.is_writable());
    drop(ctx);
    assert_eq!(std::fs::read(file.path()).unwrap(), original);
}

#[test]
fn directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = PeContext::new();
    let err = ctx.open(dir.path(), &OpenOptions::default()).unwrap_err();
    // Some platforms refuse to open a directory at all
    assert!(matches!(err.kind(), ErrorKind::NotAFile | ErrorKind::OpenFailed));
    ctx.close().unwrap();
    assert_eq!(ctx.state(), ContextState::Empty);
}

#[test]
fn missing_file_is_open_failed() {
    let dir = tempfile::tempdir().unwrap();
    let err = PeContext::load(dir.path().join("absent.exe"), &OpenOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OpenFailed);
    assert!(err.kind().is_resource());
}

#[test]
fn drop_releases_everything() {
    let file = create_temp_file(&PeImage::pe32().build());
    let recorder = Arc::new(Recorder::default());
    let released = Arc::new(AtomicUsize::new(0));
    {
        let mut ctx = PeContext::new();
        ctx.register_hook(recorder.clone());
        ctx.open(file.path(), &OpenOptions::new().keep_handle_open(true))
            .unwrap();
        ctx.attach_cached(
            CacheSlot::SectionHashes,
            ImportSummary {
                count: 0,
                released: released.clone(),
            },
        );
    }
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.events.lock().unwrap().last().unwrap(), "close");
}

#[test]
fn reopen_switches_files() {
    let first = create_temp_file(&PeImage::pe32().build());
    let second = create_temp_file(&PeImage::pe32plus_dll().build());
    let recorder = Arc::new(Recorder::default());

    let mut ctx = PeContext::new();
    ctx.register_hook(recorder.clone());
    ctx.open(first.path(), &OpenOptions::default()).unwrap();
    ctx.parse().unwrap();
    ctx.open(second.path(), &OpenOptions::default()).unwrap();
    ctx.parse().unwrap();

    assert!(ctx.pe().unwrap().is_dll());
    assert_eq!(recorder.events.lock().unwrap().len(), 3);
}
