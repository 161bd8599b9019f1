//! Reference tokens
//!
//! A stored file is referenced from rendered output as
//! `{prefix}{byte_len}-{identifier}`, e.g. `./@file/11-01J9...pdf`.

use crate::error::StoreError;
use crate::id::FileId;

/// Default prefix for reference tokens
pub const DEFAULT_URL_PREFIX: &str = "./@file/";

/// Format the reference token for a stored file
#[must_use]
pub fn format_url(prefix: &str, byte_len: usize, id: &FileId) -> String {
    format!("{prefix}{byte_len}-{id}")
}

/// Split a reference token into its byte length and identifier
///
/// Accepts the token with or without the leading `.` of the prefix, so both
/// `./@file/…` and `/@file/…` resolve.
///
/// # Errors
/// `InvalidUrl` if the token does not carry the prefix, the length is not a
/// number, or the identifier is malformed.
pub fn parse_url(prefix: &str, url: &str) -> Result<(usize, FileId), StoreError> {
    let invalid = || StoreError::InvalidUrl(url.to_string());
    let rest = url
        .strip_prefix(prefix)
        .or_else(|| url.strip_prefix(prefix.trim_start_matches('.')))
        .ok_or_else(invalid)?;
    let (len, id) = rest.split_once('-').ok_or_else(invalid)?;
    let len = len.parse::<usize>().map_err(|_| invalid())?;
    let id = id.parse::<FileId>().map_err(|_| invalid())?;
    Ok((len, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_then_parse() {
        let id = FileId::generate("pdf");
        let url = format_url(DEFAULT_URL_PREFIX, 11, &id);
        assert!(url.starts_with("./@file/11-"));
        assert_eq!(parse_url(DEFAULT_URL_PREFIX, &url).unwrap(), (11, id.clone()));

        let absolute = url.trim_start_matches('.');
        assert_eq!(parse_url(DEFAULT_URL_PREFIX, absolute).unwrap(), (11, id));
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["", "./@file/", "./@file/abc-x.pdf", "./@file/12", "/other/12-x.pdf", "./@file/3-a/b"] {
            assert!(
                matches!(parse_url(DEFAULT_URL_PREFIX, bad), Err(StoreError::InvalidUrl(_))),
                "{bad} should be rejected"
            );
        }
    }
}
