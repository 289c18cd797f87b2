//! Unified error type for the internhub crates.

use internhub_protocol::ProtocolError;
use internhub_realtime::RealtimeError;
use internhub_session::AuthError;
use internhub_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `internhub` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum InternhubError {
    /// A realtime feed connection error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session action failed (sign-in, sign-up, password flows).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The change notifier is gone or a subscription was malformed.
    #[error(transparent)]
    Realtime(#[from] RealtimeError),
}
