//! In-memory stand-ins for the pipeline's external collaborators

use async_trait::async_trait;
use coverfill::models::{
    CanonicalMetadata, CoverOutcome, LookupOutcome, ReconcileOrder, TagSnapshot, TagUpdate,
};
use coverfill::services::{
    Catalog, CoverResolver, CoverSource, MetadataProvider, MetadataResolver, ScanError, TagStore,
    TagStoreError,
};
use coverfill::workflow::ReconciliationEngine;
use coverfill_common::events::EventBus;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Minimal JPEG header
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

pub fn discovery() -> CanonicalMetadata {
    CanonicalMetadata::new("Daft Punk", "One More Time", Some("Discovery")).unwrap()
}

pub fn snapshot(artist: Option<&str>, album: Option<&str>, title: Option<&str>, image: bool) -> TagSnapshot {
    TagSnapshot::new(
        artist.map(str::to_string),
        album.map(str::to_string),
        title.map(str::to_string),
        image,
    )
}

// =============================================================================
// TagStore
// =============================================================================

/// Tag store keeping snapshots in a map
///
/// Unknown paths read as empty tags. `rewrite_with` makes the store persist
/// something other than what was requested; `fail_reads` makes the next N
/// reads of a path fail.
#[derive(Default)]
pub struct MemoryTagStore {
    tags: Mutex<HashMap<PathBuf, TagSnapshot>>,
    tag_writes: Mutex<Vec<(PathBuf, TagUpdate)>>,
    cover_writes: Mutex<Vec<(PathBuf, Vec<u8>)>>,
    reads: Mutex<Vec<PathBuf>>,
    failing_reads: Mutex<HashMap<PathBuf, usize>>,
    rewrite: Mutex<Option<TagUpdate>>,
}

impl MemoryTagStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, path: &Path, tags: TagSnapshot) {
        self.tags.lock().unwrap().insert(path.to_path_buf(), tags);
    }

    pub fn get(&self, path: &Path) -> TagSnapshot {
        self.tags.lock().unwrap().get(path).cloned().unwrap_or_default()
    }

    /// Persist `update` instead of whatever is requested
    pub fn rewrite_with(&self, update: TagUpdate) {
        *self.rewrite.lock().unwrap() = Some(update);
    }

    pub fn fail_reads(&self, path: &Path, times: usize) {
        self.failing_reads.lock().unwrap().insert(path.to_path_buf(), times);
    }

    pub fn tag_writes(&self) -> Vec<(PathBuf, TagUpdate)> {
        self.tag_writes.lock().unwrap().clone()
    }

    pub fn cover_writes(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.cover_writes.lock().unwrap().clone()
    }

    pub fn reads_of(&self, path: &Path) -> usize {
        self.reads.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().unwrap().len()
    }
}

impl TagStore for MemoryTagStore {
    fn read(&self, path: &Path) -> Result<TagSnapshot, TagStoreError> {
        self.reads.lock().unwrap().push(path.to_path_buf());

        if let Some(left) = self.failing_reads.lock().unwrap().get_mut(path) {
            if *left > 0 {
                *left -= 1;
                return Err(TagStoreError::Read(path.to_path_buf(), "injected fault".into()));
            }
        }

        Ok(self.get(path))
    }

    fn write_tags(&self, path: &Path, update: &TagUpdate) -> Result<(), TagStoreError> {
        self.tag_writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), update.clone()));

        let applied = self.rewrite.lock().unwrap().clone().unwrap_or_else(|| update.clone());
        let mut tags = self.tags.lock().unwrap();
        let current = tags.entry(path.to_path_buf()).or_default();
        *current = TagSnapshot::new(
            applied.artist.or(current.artist.clone()),
            applied.album.or(current.album.clone()),
            applied.title.or(current.title.clone()),
            current.has_embedded_image,
        );
        Ok(())
    }

    fn write_cover(&self, path: &Path, image: &[u8]) -> Result<(), TagStoreError> {
        self.cover_writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), image.to_vec()));
        self.tags
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default()
            .has_embedded_image = true;
        Ok(())
    }
}

// =============================================================================
// Metadata providers and cover sources
// =============================================================================

/// Provider answering every search with the same outcome
pub struct ScriptedProvider {
    name: &'static str,
    outcome: LookupOutcome,
    queries: Mutex<Vec<(Option<String>, String)>>,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, outcome: LookupOutcome) -> Arc<Self> {
        Arc::new(Self {
            name,
            outcome,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    /// (artist, title) of every search
    pub fn queries(&self) -> Vec<(Option<String>, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, artist: Option<&str>, title: &str) -> LookupOutcome {
        self.queries
            .lock()
            .unwrap()
            .push((artist.map(str::to_string), title.to_string()));
        self.outcome.clone()
    }
}

/// Cover source answering every lookup with the same outcome
pub struct ScriptedCoverSource {
    outcome: CoverOutcome,
    calls: AtomicUsize,
}

impl ScriptedCoverSource {
    pub fn new(outcome: CoverOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoverSource for ScriptedCoverSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn find_cover(&self, _artist: &str, _album: &str) -> CoverOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Fixed file list; scans can be told to fail
pub struct FakeCatalog {
    files: Vec<PathBuf>,
    failing_scans: Mutex<Vec<usize>>,
    scans: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(files: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            files: files.iter().map(PathBuf::from).collect(),
            failing_scans: Mutex::new(Vec::new()),
            scans: AtomicUsize::new(0),
        })
    }

    /// Make the scan with this 1-based number fail
    pub fn fail_scan(&self, scan_number: usize) {
        self.failing_scans.lock().unwrap().push(scan_number);
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl Catalog for FakeCatalog {
    fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let scan_number = self.scans.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_scans.lock().unwrap().contains(&scan_number) {
            return Err(ScanError::Io(root.to_path_buf(), "injected fault".into()));
        }
        Ok(self.files.clone())
    }
}

// =============================================================================
// Assembly
// =============================================================================

/// Engine over fakes
pub fn build_engine(
    store: &Arc<MemoryTagStore>,
    providers: &[&Arc<ScriptedProvider>],
    sources: &[&Arc<ScriptedCoverSource>],
    cache_dir: &Path,
    order: ReconcileOrder,
    bus: &EventBus,
) -> ReconciliationEngine {
    let providers = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn MetadataProvider>)
        .collect();
    let sources = sources
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn CoverSource>)
        .collect();

    ReconciliationEngine::new(
        Arc::clone(store) as Arc<dyn TagStore>,
        MetadataResolver::new(providers, bus.clone()),
        CoverResolver::new(cache_dir.to_path_buf(), sources, bus.clone()),
        order,
        bus.clone(),
    )
}
