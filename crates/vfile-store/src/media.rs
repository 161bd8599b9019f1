//! Media types
//!
//! A deliberately small table: the kernel only needs to know which file
//! extension to put on an identifier and which media type to hand back to
//! the transport layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media (MIME) type of a stored payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

/// Known media types and their extensions
const EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/json", "json"),
    ("application/octet-stream", "bin"),
    ("text/csv", "csv"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("image/png", "png"),
    ("image/jpeg", "jpeg"),
    ("image/gif", "gif"),
    ("image/svg+xml", "svg"),
    ("image/webp", "webp"),
    ("audio/wav", "wav"),
    ("video/mp4", "mp4"),
];

impl MediaType {
    /// `application/pdf`
    pub const PDF: &'static str = "application/pdf";
    /// `text/csv`
    pub const CSV: &'static str = "text/csv";
    /// `application/json`
    pub const JSON: &'static str = "application/json";
    /// `image/png`
    pub const PNG: &'static str = "image/png";
    /// `application/octet-stream`
    pub const OCTET_STREAM: &'static str = "application/octet-stream";

    /// Create a media type; parameters after `;` are dropped and the
    /// essence is lowercased
    #[must_use]
    pub fn new(media_type: impl AsRef<str>) -> Self {
        let essence = media_type
            .as_ref()
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence.is_empty() {
            Self(Self::OCTET_STREAM.to_string())
        } else {
            Self(essence)
        }
    }

    /// Guess a media type from a file extension
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        let ext = if ext == "jpg" { "jpeg".to_string() } else { ext };
        EXTENSIONS
            .iter()
            .find(|(_, e)| *e == ext)
            .map_or_else(|| Self::new(Self::OCTET_STREAM), |(m, _)| Self::new(m))
    }

    /// File extension used for identifiers of this media type
    #[must_use]
    pub fn extension(&self) -> &str {
        if let Some((_, ext)) = EXTENSIONS.iter().find(|(m, _)| *m == self.0) {
            return ext;
        }
        // image/x-icon -> x-icon, otherwise bin
        match self.0.split_once('/') {
            Some((_, sub)) if !sub.is_empty() && sub.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') => sub,
            _ => "bin",
        }
    }

    /// Borrow as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MediaType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(MediaType::new(MediaType::PDF).extension(), "pdf");
        assert_eq!(MediaType::new("text/csv; charset=utf-8").extension(), "csv");
        assert_eq!(MediaType::new("IMAGE/PNG").as_str(), "image/png");
    }

    #[test]
    fn unknown_types_fall_back() {
        assert_eq!(MediaType::new("image/x-icon").extension(), "x-icon");
        assert_eq!(MediaType::new("application/vnd.ms-excel").extension(), "bin");
        assert_eq!(MediaType::new("").as_str(), MediaType::OCTET_STREAM);
    }

    #[test]
    fn from_extension_roundtrips_table() {
        assert_eq!(MediaType::from_extension("jpg").as_str(), "image/jpeg");
        assert_eq!(MediaType::from_extension(".svg").as_str(), "image/svg+xml");
        assert_eq!(MediaType::from_extension("weird").as_str(), MediaType::OCTET_STREAM);
    }
}
