//! Read path for the transport layer

use crate::error::StoreError;
use crate::id::FileId;
use crate::media::MediaType;
use crate::store::ContentStore;
use crate::url::{parse_url, DEFAULT_URL_PREFIX};
use std::sync::Arc;

/// Bytes and media type returned to the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    /// Payload snapshot
    pub bytes: Arc<[u8]>,
    /// Media type recorded at registration
    pub media_type: MediaType,
}

/// Stateless facade over [`ContentStore`] for retrieval
///
/// Reading never extends a lifetime: the gateway holds no claims and does
/// not touch reference counts.
#[derive(Debug, Clone)]
pub struct AccessGateway {
    store: Arc<ContentStore>,
    url_prefix: String,
}

impl AccessGateway {
    /// Create a gateway using the default reference token prefix
    #[must_use]
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self::with_prefix(store, DEFAULT_URL_PREFIX)
    }

    /// Create a gateway using a custom reference token prefix
    #[must_use]
    pub fn with_prefix(store: Arc<ContentStore>, url_prefix: impl Into<String>) -> Self {
        Self {
            store,
            url_prefix: url_prefix.into(),
        }
    }

    /// Fetch by identifier
    ///
    /// # Errors
    /// `NotFound` if the entry was evicted or never existed.
    pub fn fetch(&self, id: &FileId) -> Result<FetchedContent, StoreError> {
        let entry = self.store.read(id)?;
        Ok(FetchedContent {
            bytes: Arc::clone(entry.bytes()),
            media_type: entry.media_type().clone(),
        })
    }

    /// Fetch by reference token as embedded in rendered output
    ///
    /// A token whose length segment disagrees with the stored entry refers
    /// to some other payload and is reported as `NotFound`.
    ///
    /// # Errors
    /// `InvalidUrl` for malformed tokens, `NotFound` otherwise.
    pub fn fetch_url(&self, url: &str) -> Result<FetchedContent, StoreError> {
        let (len, id) = parse_url(&self.url_prefix, url)?;
        let content = self.fetch(&id)?;
        if content.bytes.len() != len {
            tracing::warn!(url, stored_len = content.bytes.len(), "virtual file length mismatch");
            return Err(StoreError::NotFound(url.to_string()));
        }
        Ok(content)
    }

    /// Reference token prefix
    #[inline]
    #[must_use]
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::format_url;

    fn setup() -> (Arc<ContentStore>, AccessGateway) {
        let store = Arc::new(ContentStore::new());
        let gateway = AccessGateway::new(Arc::clone(&store));
        (store, gateway)
    }

    #[test]
    fn fetch_returns_bytes_and_media_type() {
        let (store, gateway) = setup();
        let reg = store.register(b"a,b\n1,2\n".as_slice(), MediaType::new(MediaType::CSV)).unwrap();
        let content = gateway.fetch(reg.id().unwrap()).unwrap();
        assert_eq!(&content.bytes[..], b"a,b\n1,2\n");
        assert_eq!(content.media_type.as_str(), "text/csv");
    }

    #[test]
    fn fetch_after_evict_is_not_found() {
        let (store, gateway) = setup();
        let reg = store.register(b"gone".as_slice(), MediaType::new(MediaType::PNG)).unwrap();
        let id = reg.id().unwrap();
        store.evict(id);
        assert!(gateway.fetch(id).unwrap_err().is_not_found());
        assert!(gateway.fetch(&FileId::generate("png")).unwrap_err().is_not_found());
    }

    #[test]
    fn fetch_url_checks_length() {
        let (store, gateway) = setup();
        let reg = store.register(b"12345".as_slice(), MediaType::new(MediaType::PDF)).unwrap();
        let id = reg.id().unwrap();

        let good = format_url(gateway.url_prefix(), 5, id);
        assert_eq!(&gateway.fetch_url(&good).unwrap().bytes[..], b"12345");

        let stale = format_url(gateway.url_prefix(), 4, id);
        assert!(gateway.fetch_url(&stale).unwrap_err().is_not_found());
        assert!(matches!(gateway.fetch_url("nonsense"), Err(StoreError::InvalidUrl(_))));
    }
}
