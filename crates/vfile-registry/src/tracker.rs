//! Reference tracking
//!
//! Every live use of a stored file is represented by a [`Claim`]. The
//! tracker keeps one [`ReferenceRecord`] per identifier holding the set of
//! live claim ids, so the count is always the size of that set. Dropping a
//! claim releases it; releasing the last claim removes the record and evicts
//! the entry from the store before `drop` returns.
//!
//! # Lock order
//!
//! `records` is always taken before any store lock. Claims are never
//! dropped while `records` is held.

use crate::config::DedupPolicy;
use crate::error::RegistryError;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use vfile_store::{Checksum, ContentStore, FileId, MediaType, Registration, StoreError};

/// Identity of one counted claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimId(u64);

impl ClaimId {
    /// Raw claim number
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bookkeeping for one identifier
#[derive(Debug, Clone)]
pub struct ReferenceRecord {
    id: FileId,
    watched: HashSet<ClaimId>,
}

impl ReferenceRecord {
    fn new(id: FileId) -> Self {
        Self {
            id,
            watched: HashSet::new(),
        }
    }

    /// Identifier this record counts
    #[inline]
    #[must_use]
    pub fn id(&self) -> &FileId {
        &self.id
    }

    /// Number of live claims
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.watched.len()
    }

    /// Whether a claim is among the watched ones
    #[inline]
    #[must_use]
    pub fn watches(&self, claim: ClaimId) -> bool {
        self.watched.contains(&claim)
    }
}

#[derive(Debug)]
struct TrackerInner {
    store: Arc<ContentStore>,
    records: Mutex<HashMap<FileId, ReferenceRecord>>,
    next_claim: AtomicU64,
}

/// Per-identifier reference counts over a [`ContentStore`]
///
/// Cheap to clone; clones share the same records.
#[derive(Debug, Clone)]
pub struct ReferenceTracker {
    inner: Arc<TrackerInner>,
}

impl ReferenceTracker {
    /// Create a tracker that evicts from `store`
    #[must_use]
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                store,
                records: Mutex::new(HashMap::new()),
                next_claim: AtomicU64::new(1),
            }),
        }
    }

    /// Store this tracker evicts from
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<ContentStore> {
        &self.inner.store
    }

    /// Start tracking a stored entry, returning the first (or another) claim
    ///
    /// # Errors
    /// `NotFound` if the store holds no entry under `id`.
    pub fn track(&self, id: &FileId) -> Result<Claim, RegistryError> {
        let mut records = self.inner.records.lock();
        if !records.contains_key(id) && !self.inner.store.contains(id) {
            return Err(StoreError::NotFound(id.to_string()).into());
        }
        Ok(self.attach(&mut records, id))
    }

    /// Take an independent claim on an entry that is already tracked
    ///
    /// Used when a second structure (for example a rendered composite) must
    /// keep the content alive on its own, regardless of what happens to the
    /// value it was embedded from.
    ///
    /// # Errors
    /// `NotTracked` if the identifier has no live claims. An entry whose
    /// count reached zero is dead and is never revived.
    pub fn acquire_additional(&self, id: &FileId) -> Result<Claim, RegistryError> {
        let mut records = self.inner.records.lock();
        if !records.contains_key(id) {
            return Err(RegistryError::NotTracked(id.clone()));
        }
        Ok(self.attach(&mut records, id))
    }

    /// Register a payload and claim it in one step
    ///
    /// No other caller can observe the identifier before its count is
    /// established. Returns `None` when the store's feature gate is off.
    ///
    /// # Errors
    /// `DuplicateIdentifier` from the store.
    pub fn register_and_track(
        &self,
        bytes: Arc<[u8]>,
        media_type: MediaType,
        dedup: DedupPolicy,
    ) -> Result<Option<Claim>, RegistryError> {
        let mut records = self.inner.records.lock();
        let store = &self.inner.store;

        if dedup == DedupPolicy::ContentHash && store.is_enabled() {
            let checksum = Checksum::compute(&bytes);
            if let Some(id) = store.find_by_content(checksum, &media_type, |id| records.contains_key(id)) {
                tracing::debug!(id = %id, "reusing live virtual file with identical content");
                return Ok(Some(self.attach(&mut records, &id)));
            }
        }

        match store.register(bytes, media_type)? {
            Registration::Stored(id) => Ok(Some(self.attach(&mut records, &id))),
            Registration::Inline => Ok(None),
        }
    }

    /// Current count for an identifier (0 if untracked)
    #[must_use]
    pub fn refcount(&self, id: &FileId) -> usize {
        self.inner
            .records
            .lock()
            .get(id)
            .map_or(0, ReferenceRecord::count)
    }

    /// Snapshot of one record
    #[must_use]
    pub fn record(&self, id: &FileId) -> Option<ReferenceRecord> {
        self.inner.records.lock().get(id).cloned()
    }

    /// Identifiers with at least one live claim
    #[must_use]
    pub fn tracked(&self) -> BTreeSet<FileId> {
        self.inner.records.lock().keys().cloned().collect()
    }

    /// Sum of all counts
    #[must_use]
    pub fn total_claims(&self) -> usize {
        self.inner.records.lock().values().map(ReferenceRecord::count).sum()
    }

    /// Evict every stored entry that has no live record
    ///
    /// Catches payloads that were registered but never claimed.
    pub fn sweep(&self) -> Vec<FileId> {
        let records = self.inner.records.lock();
        self.inner.store.evict_where(|id| !records.contains_key(id))
    }

    fn attach(&self, records: &mut HashMap<FileId, ReferenceRecord>, id: &FileId) -> Claim {
        let claim = ClaimId(self.inner.next_claim.fetch_add(1, Ordering::Relaxed));
        let record = records
            .entry(id.clone())
            .or_insert_with(|| ReferenceRecord::new(id.clone()));
        record.watched.insert(claim);
        tracing::debug!(id = %id, claim = claim.0, refcount = record.count(), "claim attached");
        Claim {
            id: id.clone(),
            claim,
            tracker: self.clone(),
        }
    }

    /// Decrement protocol: drop one claim, evict at zero
    pub(crate) fn release(&self, id: &FileId, claim: ClaimId) -> Result<usize, RegistryError> {
        let mut records = self.inner.records.lock();
        let underflow = || RegistryError::RefcountUnderflow {
            id: id.clone(),
            claim: claim.0,
        };
        let record = records.get_mut(id).ok_or_else(underflow)?;
        if !record.watched.remove(&claim) {
            return Err(underflow());
        }
        let remaining = record.count();
        if remaining == 0 {
            records.remove(id);
            self.inner.store.evict(id);
            tracing::debug!(id = %id, "last claim released, virtual file evicted");
        } else {
            tracing::debug!(id = %id, claim = claim.0, refcount = remaining, "claim released");
        }
        Ok(remaining)
    }
}

/// One counted claim on a stored entry
///
/// Dropping the claim releases it exactly once. The claim holds the
/// tracker, never the other way around, so releasing cannot resurrect it.
#[must_use = "dropping a claim releases it immediately"]
pub struct Claim {
    id: FileId,
    claim: ClaimId,
    tracker: ReferenceTracker,
}

impl Claim {
    /// Identifier this claim keeps alive
    #[inline]
    pub fn id(&self) -> &FileId {
        &self.id
    }

    /// Identity of this claim
    #[inline]
    pub fn claim_id(&self) -> ClaimId {
        self.claim
    }

    /// Tracker owning the count
    #[inline]
    pub fn tracker(&self) -> &ReferenceTracker {
        &self.tracker
    }
}

impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claim")
            .field("id", &self.id)
            .field("claim", &self.claim)
            .finish_non_exhaustive()
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if let Err(err) = self.tracker.release(&self.id, self.claim) {
            tracing::error!(error = %err, "virtual file tracking invariant violated");
            if cfg!(any(debug_assertions, feature = "strict-debug")) && !std::thread::panicking() {
                panic!("{err}");
            }
        }
    }
}
