//! Composite rendered output
//!
//! A rendered composite (markdown, HTML) is its own lifetime unit: it may
//! outlive the expression whose value it embeds. [`RenderedOutput::embed`]
//! therefore acquires a fresh claim for every embedded file, while
//! [`RenderedOutput::embed_borrowed`] only shares the caller's claim.

use crate::error::KernelError;
use std::fmt;
use vfile_registry::VirtualFile;

/// Output format of a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `text/markdown`
    Markdown,
    /// `text/html`
    Html,
}

impl OutputFormat {
    /// Media type of the rendered text
    #[must_use]
    pub fn mimetype(self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown",
            Self::Html => "text/html",
        }
    }
}

/// Rendered text plus the files it references
#[derive(Clone)]
pub struct RenderedOutput {
    format: OutputFormat,
    text: String,
    embedded: Vec<VirtualFile>,
}

impl RenderedOutput {
    /// Start a markdown composite
    #[must_use]
    pub fn markdown(text: impl Into<String>) -> Self {
        Self::new(OutputFormat::Markdown, text)
    }

    /// Start an HTML composite
    #[must_use]
    pub fn html(text: impl Into<String>) -> Self {
        Self::new(OutputFormat::Html, text)
    }

    fn new(format: OutputFormat, text: impl Into<String>) -> Self {
        Self {
            format,
            text: text.into(),
            embedded: Vec::new(),
        }
    }

    /// Append plain text
    #[must_use]
    pub fn push_str(mut self, text: &str) -> Self {
        self.text.push_str(text);
        self
    }

    /// Embed a file, taking an independent claim on it
    ///
    /// # Errors
    /// Propagates tracker failures from [`VirtualFile::acquire`].
    pub fn embed(mut self, file: &VirtualFile) -> Result<Self, KernelError> {
        let owned = file.acquire()?;
        self.text.push_str(&owned.url());
        self.embedded.push(owned);
        Ok(self)
    }

    /// Embed a file by sharing the caller's claim; the count is unchanged
    #[must_use]
    pub fn embed_borrowed(mut self, file: &VirtualFile) -> Self {
        self.text.push_str(&file.url());
        self.embedded.push(file.clone());
        self
    }

    /// Rendered text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Output format
    #[inline]
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Files referenced from the text
    #[inline]
    #[must_use]
    pub fn embedded(&self) -> &[VirtualFile] {
        &self.embedded
    }
}

impl fmt::Debug for RenderedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedOutput")
            .field("format", &self.format)
            .field("text", &self.text)
            .field("embedded", &self.embedded.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfile_registry::VirtualFileRegistry;
    use vfile_store::MediaType;

    #[test]
    fn embed_acquires_embed_borrowed_shares() {
        let registry = VirtualFileRegistry::default();
        let file = registry.create(&b"hello world"[..], MediaType::PDF).unwrap();
        let id = file.id().unwrap().clone();

        let md = RenderedOutput::markdown("see ").embed(&file).unwrap();
        assert_eq!(registry.refcount(&id), 2);
        assert!(md.text().starts_with("see ./@file/11-"));

        let html = RenderedOutput::html("<a>").embed_borrowed(&file).push_str("</a>");
        assert_eq!(registry.refcount(&id), 2);
        assert_eq!(html.format().mimetype(), "text/html");

        drop(file);
        assert_eq!(registry.refcount(&id), 1);
        drop(md);
        // the borrowed embed still shares the original claim
        assert_eq!(registry.refcount(&id), 1);
        drop(html);
        assert!(registry.is_empty());
    }
}
