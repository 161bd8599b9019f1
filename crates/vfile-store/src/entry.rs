//! Stored entries

use crate::checksum::Checksum;
use crate::id::FileId;
use crate::media::MediaType;
use std::sync::Arc;

/// One registered payload
///
/// Entries are immutable once stored. The byte buffer is shared
/// (`Arc<[u8]>`), so a reader that obtained an entry keeps a complete
/// snapshot even if the store evicts it a moment later.
#[derive(Debug, Clone)]
pub struct ContentEntry {
    id: FileId,
    bytes: Arc<[u8]>,
    media_type: MediaType,
    created_at: u64,
    checksum: Checksum,
}

impl ContentEntry {
    pub(crate) fn new(id: FileId, bytes: Arc<[u8]>, media_type: MediaType, created_at: u64) -> Self {
        let checksum = Checksum::compute(&bytes);
        Self {
            id,
            bytes,
            media_type,
            created_at,
            checksum,
        }
    }

    /// Identifier of this entry
    #[inline]
    #[must_use]
    pub fn id(&self) -> &FileId {
        &self.id
    }

    /// Stored bytes
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    /// Media type
    #[inline]
    #[must_use]
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// Store-local monotonic registration counter
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Blake3 checksum taken at registration
    #[inline]
    #[must_use]
    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    /// Payload length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Recompute the checksum over the stored bytes
    #[inline]
    #[must_use]
    pub fn verify(&self) -> bool {
        self.checksum.matches(&self.bytes)
    }
}
