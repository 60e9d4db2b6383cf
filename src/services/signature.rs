//! Registration signature handling
//!
//! The registration form submits the drawn signature as a PNG data URL.
//! This module validates the payload before it is stored on the user
//! record.

use data_encoding::BASE64;

/// Error types for signature validation
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature must be an image data URL")]
    NotADataUrl,

    #[error("Signature payload is not valid base64")]
    InvalidPayload,

    #[error("Signature payload is empty")]
    EmptyPayload,
}

/// Validate a signature data URL and return it in normalized form.
///
/// Accepts `data:image/<format>;base64,<payload>` where the payload decodes
/// as base64 to a non-empty image.
pub fn normalize(raw: &str) -> Result<String, SignatureError> {
    let raw = raw.trim();

    let rest = raw
        .strip_prefix("data:image/")
        .ok_or(SignatureError::NotADataUrl)?;

    let (_format, payload) = rest
        .split_once(";base64,")
        .ok_or(SignatureError::NotADataUrl)?;

    if payload.is_empty() {
        return Err(SignatureError::EmptyPayload);
    }

    let decoded = BASE64
        .decode(payload.as_bytes())
        .map_err(|_| SignatureError::InvalidPayload)?;

    if decoded.is_empty() {
        return Err(SignatureError::EmptyPayload);
    }

    Ok(raw.to_string())
}
