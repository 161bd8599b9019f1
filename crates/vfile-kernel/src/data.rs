//! Helpers that turn raw payloads into file handles
//!
//! All helpers go through the context's registry, so they honour the
//! feature gate: with virtual files disabled they return inline handles.

use crate::context::ExecutionContext;
use crate::error::KernelError;
use std::sync::Arc;
use vfile_registry::VirtualFile;
use vfile_store::MediaType;

/// A PDF document
///
/// # Errors
/// Registry failures.
pub fn pdf(ctx: &ExecutionContext, bytes: impl Into<Arc<[u8]>>) -> Result<VirtualFile, KernelError> {
    Ok(ctx.registry().create(bytes, MediaType::PDF)?)
}

/// An image; the media type defaults to PNG
///
/// # Errors
/// Registry failures.
pub fn image(
    ctx: &ExecutionContext,
    bytes: impl Into<Arc<[u8]>>,
    media_type: Option<&str>,
) -> Result<VirtualFile, KernelError> {
    let media_type = media_type.map_or_else(|| MediaType::from(MediaType::PNG), MediaType::new);
    Ok(ctx.registry().create(bytes, media_type)?)
}

/// CSV text
///
/// # Errors
/// Registry failures.
pub fn csv(ctx: &ExecutionContext, text: impl AsRef<str>) -> Result<VirtualFile, KernelError> {
    Ok(ctx.registry().create(text.as_ref().as_bytes(), MediaType::CSV)?)
}

/// A JSON document
///
/// # Errors
/// Registry failures.
pub fn json(ctx: &ExecutionContext, value: &serde_json::Value) -> Result<VirtualFile, KernelError> {
    let bytes = value.to_string().into_bytes();
    Ok(ctx.registry().create(bytes, MediaType::JSON)?)
}

/// Arbitrary bytes, typed from a file extension
///
/// # Errors
/// Registry failures.
pub fn any_data(
    ctx: &ExecutionContext,
    bytes: impl Into<Arc<[u8]>>,
    extension: &str,
) -> Result<VirtualFile, KernelError> {
    Ok(ctx.registry().create(bytes, MediaType::from_extension(extension))?)
}
