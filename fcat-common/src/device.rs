//! Device token helpers
//!
//! A device token is a client-generated opaque identifier used as the voting
//! principal. It is persisted in browser storage and never issued or
//! authenticated server-side; the server only validates its shape. Anyone can
//! mint a fresh token by clearing storage. That is a documented trust
//! trade-off, not a gap.

use uuid::Uuid;

/// Maximum accepted device token length
pub const MAX_DEVICE_ID_LEN: usize = 64;

/// Generate a fresh device token (UUID v4 string)
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Validate the shape of a client-supplied device token.
///
/// Accepts any non-empty printable string up to [`MAX_DEVICE_ID_LEN`] bytes.
/// The token is opaque; no format beyond that is required.
pub fn validate(device_id: &str) -> bool {
    !device_id.is_empty()
        && device_id.len() <= MAX_DEVICE_ID_LEN
        && !device_id.chars().any(|c| c.is_control())
}
