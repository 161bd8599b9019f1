//! Registry configuration

use serde::{Deserialize, Serialize};
use vfile_store::DEFAULT_URL_PREFIX;

/// What to do when a payload equal to a live entry is registered again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Every registration creates its own entry
    #[default]
    Independent,
    /// Reuse a live entry with identical bytes and media type, adding a
    /// claim to it. Entries whose count already reached zero are never
    /// reused.
    ContentHash,
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Whether payloads go to the store (otherwise they stay inline)
    pub virtual_files_enabled: bool,
    /// Deduplication policy
    pub dedup: DedupPolicy,
    /// Prefix of reference tokens embedded into rendered output
    pub url_prefix: String,
}

impl RegistryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With virtual files enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_virtual_files(mut self, enabled: bool) -> Self {
        self.virtual_files_enabled = enabled;
        self
    }

    /// With deduplication policy
    #[inline]
    #[must_use]
    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    /// With reference token prefix
    #[inline]
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            virtual_files_enabled: true,
            dedup: DedupPolicy::Independent,
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RegistryConfig::new();
        assert!(config.virtual_files_enabled);
        assert_eq!(config.dedup, DedupPolicy::Independent);
        assert_eq!(config.url_prefix, "./@file/");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RegistryConfig = toml::from_str("dedup = \"content_hash\"").unwrap();
        assert_eq!(config.dedup, DedupPolicy::ContentHash);
        assert!(config.virtual_files_enabled);
    }

    #[test]
    fn builder() {
        let config = RegistryConfig::new()
            .with_virtual_files(false)
            .with_url_prefix("/files/");
        assert!(!config.virtual_files_enabled);
        assert_eq!(config.url_prefix, "/files/");
    }
}
