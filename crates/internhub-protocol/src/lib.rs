//! Shared data shapes for internhub.
//!
//! This crate defines what travels between the dashboard core and its
//! backends:
//!
//! - **Identity types** ([`AccountId`], [`Role`], [`AccountStatus`],
//!   [`UserRecord`], [`ProfileRecord`], [`SignUpMetadata`]): the records
//!   the identity service hands back, before they are mapped into a
//!   session account.
//! - **Realtime types** ([`ChangeEvent`], [`ChangeKind`]): "something in
//!   collection X changed" notifications.
//! - **Envelopes** ([`AuthResponse`], [`ProfileResponse`]): the
//!   `{ user, error }` shapes the REST/BaaS backend replies with.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, typed values out.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (records, events) → Session / Realtime
//! ```

mod codec;
mod envelope;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use envelope::{AuthResponse, BackendError, ProfileResponse};
pub use error::ProtocolError;
pub use types::{
    AccountId, AccountStatus, ChangeEvent, ChangeKind, ProfileRecord, Role,
    SignUpMetadata, UserRecord,
};
