//! The handle cells hold on to

use crate::error::RegistryError;
use crate::tracker::{Claim, ClaimId};
use base64::Engine;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use vfile_store::{FileId, MediaType};

/// A usable reference to one virtual file
///
/// Two ways to share a handle:
///
/// - **borrow**: [`Clone`] (and [`VirtualFile::url`]) share the existing
///   claim. The count does not change; the content lives as long as the
///   longest-lived clone.
/// - **acquire**: [`VirtualFile::acquire`] takes a new, independent claim.
///   Use it when embedding into a structure whose lifetime is managed
///   separately from the value that produced the handle.
///
/// When virtual files are disabled the handle carries its bytes inline and
/// formats itself as a `data:` URL.
#[derive(Clone)]
pub struct VirtualFile {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Stored {
        claim: Arc<Claim>,
        media_type: MediaType,
        byte_len: usize,
        url: Arc<str>,
    },
    Inline {
        bytes: Arc<[u8]>,
        media_type: MediaType,
    },
}

impl VirtualFile {
    pub(crate) fn stored(claim: Claim, media_type: MediaType, byte_len: usize, url: String) -> Self {
        Self {
            repr: Repr::Stored {
                claim: Arc::new(claim),
                media_type,
                byte_len,
                url: url.into(),
            },
        }
    }

    pub(crate) fn inline(bytes: Arc<[u8]>, media_type: MediaType) -> Self {
        Self {
            repr: Repr::Inline { bytes, media_type },
        }
    }

    /// Identifier of the stored entry; `None` for inline files
    #[must_use]
    pub fn id(&self) -> Option<&FileId> {
        match &self.repr {
            Repr::Stored { claim, .. } => Some(claim.id()),
            Repr::Inline { .. } => None,
        }
    }

    /// Media type
    #[must_use]
    pub fn media_type(&self) -> &MediaType {
        match &self.repr {
            Repr::Stored { media_type, .. } | Repr::Inline { media_type, .. } => media_type,
        }
    }

    /// Payload length in bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match &self.repr {
            Repr::Stored { byte_len, .. } => *byte_len,
            Repr::Inline { bytes, .. } => bytes.len(),
        }
    }

    /// Whether the bytes are carried inline instead of stored
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self.repr, Repr::Inline { .. })
    }

    /// Reference token to embed into rendered output
    ///
    /// Formatting is a borrow and never changes the count.
    #[must_use]
    pub fn url(&self) -> Cow<'_, str> {
        match &self.repr {
            Repr::Stored { url, .. } => Cow::Borrowed(&**url),
            Repr::Inline { bytes, media_type } => Cow::Owned(format!(
                "data:{media_type};base64,{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            )),
        }
    }

    /// Take a new independent claim on the same content
    ///
    /// Inline files have nothing to count and are simply cloned.
    ///
    /// # Errors
    /// `NotTracked` cannot happen while `self` is alive, since `self` holds
    /// a claim; it is still propagated rather than assumed away.
    pub fn acquire(&self) -> Result<Self, RegistryError> {
        match &self.repr {
            Repr::Stored {
                claim,
                media_type,
                byte_len,
                url,
            } => {
                let fresh = claim.tracker().acquire_additional(claim.id())?;
                Ok(Self {
                    repr: Repr::Stored {
                        claim: Arc::new(fresh),
                        media_type: media_type.clone(),
                        byte_len: *byte_len,
                        url: Arc::clone(url),
                    },
                })
            }
            Repr::Inline { .. } => Ok(self.clone()),
        }
    }

    /// Current count on the underlying entry (0 for inline files)
    #[must_use]
    pub fn refcount(&self) -> usize {
        match &self.repr {
            Repr::Stored { claim, .. } => claim.tracker().refcount(claim.id()),
            Repr::Inline { .. } => 0,
        }
    }

    /// Claim this handle holds, if stored
    #[must_use]
    pub fn claim_id(&self) -> Option<ClaimId> {
        match &self.repr {
            Repr::Stored { claim, .. } => Some(claim.claim_id()),
            Repr::Inline { .. } => None,
        }
    }

    /// Whether two handles share the same claim (one is a borrow of the other)
    #[must_use]
    pub fn shares_claim(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Stored { claim: a, .. }, Repr::Stored { claim: b, .. }) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for VirtualFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

impl fmt::Debug for VirtualFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Stored { claim, media_type, byte_len, .. } => f
                .debug_struct("VirtualFile")
                .field("id", claim.id())
                .field("claim", &claim.claim_id())
                .field("media_type", media_type)
                .field("byte_len", byte_len)
                .finish(),
            Repr::Inline { bytes, media_type } => f
                .debug_struct("VirtualFile")
                .field("inline", &true)
                .field("media_type", media_type)
                .field("byte_len", &bytes.len())
                .finish(),
        }
    }
}
