//! The registry service
//!
//! One [`VirtualFileRegistry`] per kernel. It is constructed with the kernel,
//! handed to every cell execution through the execution context, and torn
//! down with it; there is no process-global registry.

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::file::VirtualFile;
use crate::tracker::{Claim, ReferenceTracker};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use vfile_store::url::format_url;
use vfile_store::{AccessGateway, ContentStore, FileId, MediaType, Registration};

/// Result of a collection pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Entries evicted by this pass
    pub evicted: Vec<FileId>,
    /// Entries left in the store afterwards
    pub remaining: usize,
}

/// Registry statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Stored entries
    pub entries: usize,
    /// Payload bytes across all entries
    pub total_bytes: usize,
    /// Identifiers with live claims
    pub tracked: usize,
    /// Live claims across all identifiers
    pub claims: usize,
    /// Whether registrations are stored
    pub enabled: bool,
}

/// Content store, reference tracker and read gateway wired together
#[derive(Debug)]
pub struct VirtualFileRegistry {
    config: RegistryConfig,
    store: Arc<ContentStore>,
    tracker: ReferenceTracker,
    gateway: AccessGateway,
}

impl VirtualFileRegistry {
    /// Create a registry
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        let store = Arc::new(ContentStore::with_enabled(config.virtual_files_enabled));
        let tracker = ReferenceTracker::new(Arc::clone(&store));
        let gateway = AccessGateway::with_prefix(Arc::clone(&store), config.url_prefix.clone());
        tracing::info!(
            enabled = config.virtual_files_enabled,
            dedup = ?config.dedup,
            "virtual file registry started"
        );
        Self {
            config,
            store,
            tracker,
            gateway,
        }
    }

    /// Register a payload and return a handle holding its first claim
    ///
    /// With the feature gate off the handle carries the bytes inline and
    /// nothing is stored.
    ///
    /// # Errors
    /// `DuplicateIdentifier` if the identifier generator collides.
    pub fn create(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        media_type: impl Into<MediaType>,
    ) -> Result<VirtualFile, RegistryError> {
        let bytes: Arc<[u8]> = bytes.into();
        let media_type = media_type.into();
        let byte_len = bytes.len();

        match self
            .tracker
            .register_and_track(Arc::clone(&bytes), media_type.clone(), self.config.dedup)?
        {
            Some(claim) => {
                let url = format_url(&self.config.url_prefix, byte_len, claim.id());
                Ok(VirtualFile::stored(claim, media_type, byte_len, url))
            }
            None => Ok(VirtualFile::inline(bytes, media_type)),
        }
    }

    /// Store a payload without claiming it
    ///
    /// The entry is dropped by the next sweep unless tracked first.
    ///
    /// # Errors
    /// `DuplicateIdentifier` from the store.
    pub fn register(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        media_type: impl Into<MediaType>,
    ) -> Result<Registration, RegistryError> {
        Ok(self.store.register(bytes, media_type.into())?)
    }

    /// See [`ReferenceTracker::track`]
    ///
    /// # Errors
    /// `NotFound` if the entry does not exist.
    pub fn track(&self, id: &FileId) -> Result<Claim, RegistryError> {
        self.tracker.track(id)
    }

    /// See [`ReferenceTracker::acquire_additional`]
    ///
    /// # Errors
    /// `NotTracked` if the identifier has no live claims.
    pub fn acquire_additional(&self, id: &FileId) -> Result<Claim, RegistryError> {
        self.tracker.acquire_additional(id)
    }

    /// Current count for an identifier
    #[must_use]
    pub fn refcount(&self, id: &FileId) -> usize {
        self.tracker.refcount(id)
    }

    /// Snapshot of stored identifiers
    #[must_use]
    pub fn identifiers(&self) -> BTreeSet<FileId> {
        self.store.identifiers()
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no entries are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Whether an entry is stored
    #[must_use]
    pub fn contains(&self, id: &FileId) -> bool {
        self.store.contains(id)
    }

    /// Whether registrations are stored
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    /// Flip the feature gate; returns the previous value
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let previous = self.store.set_enabled(enabled);
        if previous != enabled {
            tracing::info!(enabled, "virtual file support toggled");
        }
        previous
    }

    /// Collection pass: evict every entry without a live claim
    pub fn sweep(&self) -> SweepReport {
        let evicted = self.tracker.sweep();
        let remaining = self.store.len();
        if evicted.is_empty() {
            tracing::debug!(remaining, "collection pass found nothing to evict");
        } else {
            tracing::info!(evicted = evicted.len(), remaining, "collection pass evicted unclaimed files");
        }
        SweepReport { evicted, remaining }
    }

    /// Registry statistics
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            entries: self.store.len(),
            total_bytes: self.store.total_bytes(),
            tracked: self.tracker.tracked().len(),
            claims: self.tracker.total_claims(),
            enabled: self.store.is_enabled(),
        }
    }

    /// Read gateway for the transport layer
    #[inline]
    #[must_use]
    pub fn gateway(&self) -> &AccessGateway {
        &self.gateway
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    /// Underlying tracker
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &ReferenceTracker {
        &self.tracker
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for VirtualFileRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DedupPolicy;

    #[test]
    fn create_yields_one_entry_with_refcount_one() {
        let registry = VirtualFileRegistry::default();
        let file = registry.create(&b"hello world"[..], MediaType::PDF).unwrap();
        let id = file.id().unwrap().clone();

        assert_eq!(registry.len(), 1);
        assert!(id.as_str().ends_with(".pdf"));
        assert_eq!(registry.refcount(&id), 1);

        drop(file);
        assert!(registry.is_empty());
    }

    #[test]
    fn clone_borrows_acquire_counts() {
        let registry = VirtualFileRegistry::default();
        let file = registry.create(&b"x"[..], MediaType::PNG).unwrap();
        let id = file.id().unwrap().clone();

        let borrowed = file.clone();
        assert!(borrowed.shares_claim(&file));
        assert_eq!(registry.refcount(&id), 1);

        let acquired = file.acquire().unwrap();
        assert!(!acquired.shares_claim(&file));
        assert_eq!(registry.refcount(&id), 2);

        drop(file);
        assert_eq!(registry.refcount(&id), 1);
        drop(acquired);
        assert_eq!(registry.refcount(&id), 1);
        drop(borrowed);
        assert_eq!(registry.refcount(&id), 0);
        assert!(!registry.contains(&id));
    }

    #[test]
    fn url_resolves_through_gateway() {
        let registry = VirtualFileRegistry::default();
        let file = registry.create(&b"a,b\n"[..], MediaType::CSV).unwrap();
        let url = file.url().into_owned();
        assert!(url.starts_with("./@file/4-"));

        let fetched = registry.gateway().fetch_url(&url).unwrap();
        assert_eq!(&fetched.bytes[..], b"a,b\n");
        assert_eq!(file.refcount(), 1);

        drop(file);
        assert!(registry.gateway().fetch_url(&url).unwrap_err().is_not_found());
    }

    #[test]
    fn disabled_registry_inlines() {
        let registry = VirtualFileRegistry::new(RegistryConfig::new().with_virtual_files(false));
        for _ in 0..3 {
            let file = registry.create(&b"hi"[..], MediaType::PNG).unwrap();
            assert!(file.is_inline());
            assert_eq!(file.url(), "data:image/png;base64,aGk=");
            assert_eq!(file.refcount(), 0);
        }
        assert!(registry.identifiers().is_empty());
    }

    #[test]
    fn sweep_drops_unclaimed_registrations() {
        let registry = VirtualFileRegistry::default();
        let kept = registry.create(&b"kept"[..], MediaType::PDF).unwrap();
        registry.register(&b"orphan"[..], MediaType::PDF).unwrap();
        assert_eq!(registry.len(), 2);

        let report = registry.sweep();
        assert_eq!(report.evicted.len(), 1);
        assert_eq!(report.remaining, 1);
        assert!(registry.contains(kept.id().unwrap()));
    }

    #[test]
    fn stats_track_claims() {
        let registry = VirtualFileRegistry::new(RegistryConfig::new().with_dedup(DedupPolicy::ContentHash));
        let a = registry.create(&b"same"[..], MediaType::PDF).unwrap();
        let _b = registry.create(&b"same"[..], MediaType::PDF).unwrap();
        let _c = a.acquire().unwrap();

        let stats = registry.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.tracked, 1);
        assert_eq!(stats.claims, 3);
        assert_eq!(stats.total_bytes, 4);
        assert!(stats.enabled);
    }
}
