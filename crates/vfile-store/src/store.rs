//! In-memory content store

use crate::checksum::Checksum;
use crate::entry::ContentEntry;
use crate::error::StoreError;
use crate::id::FileId;
use crate::media::MediaType;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome of [`ContentStore::register`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The payload was stored under this identifier
    Stored(FileId),
    /// Virtual files are disabled; the caller must carry the bytes inline
    Inline,
}

impl Registration {
    /// Identifier, if the payload was stored
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&FileId> {
        match self {
            Self::Stored(id) => Some(id),
            Self::Inline => None,
        }
    }
}

/// Mapping from identifier to stored payload
///
/// Pure storage: the store never decides on its own when an entry dies.
/// Eviction is requested by the reference tracker once the last claim on an
/// entry is released, or by a lifecycle sweep for entries that were never
/// claimed.
///
/// # Concurrency
///
/// Reads take a read lock and hand out an `Arc<ContentEntry>`, so the
/// retrieval path can run on another thread while cells register and evict.
/// A read racing an eviction observes either the full entry or `NotFound`.
///
/// # Example
///
/// ```rust
/// use vfile_store::{ContentStore, MediaType};
///
/// let store = ContentStore::new();
/// let reg = store.register(b"%PDF-1.4".as_slice(), MediaType::new(MediaType::PDF)).unwrap();
/// let id = reg.id().unwrap();
/// assert_eq!(&store.read(id).unwrap().bytes()[..], b"%PDF-1.4");
/// assert!(store.evict(id));
/// assert!(store.read(id).is_err());
/// ```
#[derive(Debug)]
pub struct ContentStore {
    entries: RwLock<HashMap<FileId, Arc<ContentEntry>>>,
    enabled: AtomicBool,
    clock: AtomicU64,
}

impl ContentStore {
    /// Create an empty store with virtual files enabled
    #[must_use]
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Create an empty store with the feature gate set
    #[must_use]
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            enabled: AtomicBool::new(enabled),
            clock: AtomicU64::new(0),
        }
    }

    /// Whether registrations create entries
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Flip the feature gate; returns the previous value
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }

    /// Store a payload under a freshly generated identifier
    ///
    /// Does not touch any reference count; the caller must track the
    /// returned identifier separately.
    ///
    /// # Errors
    /// `DuplicateIdentifier` if the generated identifier already exists.
    pub fn register(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        media_type: MediaType,
    ) -> Result<Registration, StoreError> {
        if !self.is_enabled() {
            tracing::debug!(media_type = %media_type, "virtual files disabled, payload stays inline");
            return Ok(Registration::Inline);
        }
        let id = FileId::generate(media_type.extension());
        self.register_with_id(id, bytes, media_type)
            .map(Registration::Stored)
    }

    /// Store a payload under a caller-chosen identifier
    ///
    /// Ignores the feature gate.
    ///
    /// # Errors
    /// `DuplicateIdentifier` if `id` is already present. The existing entry
    /// is left untouched.
    pub fn register_with_id(
        &self,
        id: FileId,
        bytes: impl Into<Arc<[u8]>>,
        media_type: MediaType,
    ) -> Result<FileId, StoreError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            tracing::error!(id = %id, "virtual file identifier collision");
            return Err(StoreError::DuplicateIdentifier(id));
        }
        let created_at = self.clock.fetch_add(1, Ordering::Relaxed);
        let entry = ContentEntry::new(id.clone(), bytes.into(), media_type, created_at);
        tracing::debug!(id = %id, len = entry.len(), "registered virtual file");
        entries.insert(id.clone(), Arc::new(entry));
        Ok(id)
    }

    /// Read an entry
    ///
    /// # Errors
    /// `NotFound` if the entry was never registered or has been evicted.
    pub fn read(&self, id: &FileId) -> Result<Arc<ContentEntry>, StoreError> {
        self.entries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Remove an entry; returns whether it was present
    ///
    /// Idempotent.
    pub fn evict(&self, id: &FileId) -> bool {
        let removed = self.entries.write().remove(id).is_some();
        if removed {
            tracing::debug!(id = %id, "evicted virtual file");
        }
        removed
    }

    /// Remove every entry for which `pred` returns true
    pub fn evict_where(&self, mut pred: impl FnMut(&FileId) -> bool) -> Vec<FileId> {
        let mut entries = self.entries.write();
        let doomed: Vec<FileId> = entries.keys().filter(|id| pred(id)).cloned().collect();
        for id in &doomed {
            entries.remove(id);
        }
        doomed
    }

    /// Oldest entry whose bytes and media type equal the given payload and
    /// for which `accept` returns true
    #[must_use]
    pub fn find_by_content(
        &self,
        checksum: Checksum,
        media_type: &MediaType,
        mut accept: impl FnMut(&FileId) -> bool,
    ) -> Option<FileId> {
        self.entries
            .read()
            .values()
            .filter(|e| e.checksum() == checksum && e.media_type() == media_type)
            .filter(|e| accept(e.id()))
            .min_by_key(|e| e.created_at())
            .map(|e| e.id().clone())
    }

    /// Whether an entry exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &FileId) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Snapshot of all stored identifiers
    #[must_use]
    pub fn identifiers(&self) -> BTreeSet<FileId> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload bytes across all entries
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.entries.read().values().map(|e| e.len()).sum()
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf() -> MediaType {
        MediaType::new(MediaType::PDF)
    }

    #[test]
    fn register_read_evict() {
        let store = ContentStore::new();
        let reg = store.register(b"hello world".as_slice(), pdf()).unwrap();
        let id = reg.id().unwrap().clone();
        assert!(id.as_str().ends_with(".pdf"));

        let entry = store.read(&id).unwrap();
        assert_eq!(&entry.bytes()[..], b"hello world");
        assert_eq!(entry.media_type(), &pdf());
        assert!(entry.verify());

        assert!(store.evict(&id));
        assert!(!store.evict(&id));
        assert!(matches!(store.read(&id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn equal_payloads_get_independent_entries() {
        let store = ContentStore::new();
        let a = store.register(b"same".as_slice(), pdf()).unwrap();
        let b = store.register(b"same".as_slice(), pdf()).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn duplicate_identifier_keeps_existing_entry() {
        let store = ContentStore::new();
        let id: FileId = "fixed.pdf".parse().unwrap();
        store.register_with_id(id.clone(), b"first".as_slice(), pdf()).unwrap();
        let err = store
            .register_with_id(id.clone(), b"second".as_slice(), pdf())
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(&store.read(&id).unwrap().bytes()[..], b"first");
    }

    #[test]
    fn disabled_store_registers_nothing() {
        let store = ContentStore::with_enabled(false);
        for _ in 0..5 {
            assert_eq!(store.register(b"x".as_slice(), pdf()).unwrap(), Registration::Inline);
        }
        assert!(store.identifiers().is_empty());
        assert!(!store.set_enabled(true));
        assert!(store.register(b"x".as_slice(), pdf()).unwrap().id().is_some());
    }

    #[test]
    fn created_at_is_monotonic() {
        let store = ContentStore::new();
        let a = store.register(b"a".as_slice(), pdf()).unwrap();
        let b = store.register(b"b".as_slice(), pdf()).unwrap();
        let ta = store.read(a.id().unwrap()).unwrap().created_at();
        let tb = store.read(b.id().unwrap()).unwrap().created_at();
        assert!(ta < tb);
    }

    #[test]
    fn evict_where_and_totals() {
        let store = ContentStore::new();
        let keep = store.register(b"12345".as_slice(), pdf()).unwrap();
        store.register(b"123".as_slice(), MediaType::new(MediaType::CSV)).unwrap();
        assert_eq!(store.total_bytes(), 8);

        let evicted = store.evict_where(|id| id.extension() == Some("csv"));
        assert_eq!(evicted.len(), 1);
        assert_eq!(store.identifiers().into_iter().collect::<Vec<_>>(), vec![keep.id().unwrap().clone()]);
    }

    #[test]
    fn find_by_content_matches_bytes_and_type() {
        let store = ContentStore::new();
        let reg = store.register(b"payload".as_slice(), pdf()).unwrap();
        let sum = Checksum::compute(b"payload");
        assert_eq!(store.find_by_content(sum, &pdf(), |_| true).as_ref(), reg.id());
        assert!(store.find_by_content(sum, &MediaType::new(MediaType::CSV), |_| true).is_none());
        assert!(store.find_by_content(sum, &pdf(), |_| false).is_none());
    }

    #[test]
    fn find_by_content_skips_rejected_candidates() {
        let store = ContentStore::new();
        let wanted = store.register(b"same".as_slice(), pdf()).unwrap();
        let wanted = wanted.id().unwrap().clone();
        for _ in 0..4 {
            store.register(b"same".as_slice(), pdf()).unwrap();
        }
        let sum = Checksum::compute(b"same");
        let found = store.find_by_content(sum, &pdf(), |id| *id == wanted);
        assert_eq!(found, Some(wanted));
    }

    #[test]
    fn read_snapshot_survives_eviction() {
        let store = ContentStore::new();
        let reg = store.register(b"snapshot".as_slice(), pdf()).unwrap();
        let id = reg.id().unwrap();
        let entry = store.read(id).unwrap();
        store.evict(id);
        assert_eq!(&entry.bytes()[..], b"snapshot");
        assert!(store.read(id).unwrap_err().is_not_found());
    }
}
