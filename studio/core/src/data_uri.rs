//! `data:` URI helpers
//!
//! Generated illustrations and captured cards travel through the system as
//! base64 `data:` URIs, the same form a browser `<img src>` accepts.

use base64::Engine as _;
use thiserror::Error;

/// Errors from parsing a `data:` URI
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    /// The string does not start with `data:`
    #[error("Not a data URI")]
    NotDataUri,

    /// Only base64 payloads are supported
    #[error("Data URI is not base64 encoded")]
    NotBase64,

    /// Payload failed to decode
    #[error("Invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// A decoded `data:` URI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUri {
    /// Declared MIME type (may be empty)
    pub mime_type: String,
    /// Decoded payload
    pub bytes: Vec<u8>,
}

/// Build a `data:` URI from a MIME type and an already base64-encoded payload
#[must_use]
pub fn from_base64(mime_type: &str, data: &str) -> String {
    format!("data:{mime_type};base64,{data}")
}

/// Build a `data:` URI from raw bytes
#[must_use]
pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> String {
    from_base64(
        mime_type,
        &base64::engine::general_purpose::STANDARD.encode(bytes),
    )
}

/// Whether `uri` looks like a `data:` URI
#[must_use]
pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Decode a base64 `data:` URI
///
/// # Errors
///
/// Returns an error if `uri` is not a base64 `data:` URI or the payload is
/// not valid base64.
pub fn parse(uri: &str) -> Result<DataUri, DataUriError> {
    let rest = uri.strip_prefix("data:").ok_or(DataUriError::NotDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUriError::NotBase64)?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or(DataUriError::NotBase64)?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| DataUriError::InvalidPayload(e.to_string()))?;

    Ok(DataUri {
        mime_type: mime_type.to_string(),
        bytes,
    })
}
