//! Virtual file identifiers

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Identifier of one stored virtual file
///
/// Rendered as `{ulid}.{extension}`, e.g. `01J9Z3T0Q7V2W5K8M4N6P1R3S5.pdf`.
/// ULIDs are unique for the lifetime of the process, so an identifier is
/// never handed out twice, even after the entry it named has been evicted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Generate a fresh identifier carrying the given extension
    #[must_use]
    pub fn generate(extension: &str) -> Self {
        Self(format!("{}.{extension}", Ulid::new()))
    }

    /// Borrow the identifier as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File extension part of the identifier, if any
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }

    fn validate(s: &str) -> Result<(), StoreError> {
        let valid = !s.is_empty()
            && s.bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
        if valid {
            Ok(())
        } else {
            Err(StoreError::InvalidIdentifier(s.to_string()))
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FileId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for FileId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::validate(&value)?;
        Ok(Self(value))
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_carries_extension() {
        let id = FileId::generate("pdf");
        assert!(id.as_str().ends_with(".pdf"));
        assert_eq!(id.extension(), Some("pdf"));
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = FileId::generate("csv");
        let b = FileId::generate("csv");
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_path_separators() {
        assert!("../etc/passwd".parse::<FileId>().is_err());
        assert!("".parse::<FileId>().is_err());
        assert!("abc.png".parse::<FileId>().is_ok());
    }

    #[test]
    fn serde_validates() {
        let id = FileId::generate("png");
        let json = serde_json::to_string(&id).unwrap();
        let back: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
        assert!(serde_json::from_str::<FileId>("\"a/b\"").is_err());
    }
}
