//! Error types for the protocol layer.
//!
//! Each internhub crate defines its own error enum. A `ProtocolError`
//! always means the problem is in the shape of the data (serialization,
//! an unknown enum value), not in networking or session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON from the backend, missing required
    /// fields, or a truncated realtime frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A role string that is not one of the known roles.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}
