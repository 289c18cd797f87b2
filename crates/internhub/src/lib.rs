//! # Internhub
//!
//! Session and realtime core for the internhub internship dashboard.
//!
//! A dashboard front end builds one [`DashboardClient`] around its
//! [`IdentityService`](internhub_session::IdentityService) implementation.
//! The client owns the authentication session (restore, sign-in, sign-out,
//! archived-account watch) and a change notifier that page components
//! watch for invalidation signals from the backend's realtime feed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use internhub::prelude::*;
//!
//! // Implement IdentityService for your backend, then:
//! // internhub::init_tracing();
//! // let client = DashboardClientBuilder::new()
//! //     .realtime_url("ws://127.0.0.1:4000/changes")
//! //     .build(my_identity)
//! //     .await?;
//! // client.session().initialize().await;
//! // let _tasks = client.watch(["tasks"], || refetch_tasks()).await?;
//! ```

mod bridge;
mod client;
mod error;

pub use bridge::{BridgeStats, RealtimeBridge};
pub use client::{ClientConfig, DashboardClient, DashboardClientBuilder, RoleStore};
pub use error::InternhubError;

pub use internhub_protocol as protocol;
pub use internhub_realtime as realtime;
pub use internhub_session as session;
pub use internhub_transport as transport;

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that writes to stderr.
///
/// Honours `RUST_LOG`; defaults to `info` when it is unset or invalid.
/// Calling it again after a subscriber is installed does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Everything a dashboard front end usually needs.
pub mod prelude {
    pub use crate::{
        ClientConfig, DashboardClient, DashboardClientBuilder, InternhubError,
        RealtimeBridge,
    };
    pub use internhub_protocol::{
        AccountId, AccountStatus, ChangeEvent, ChangeKind, ProfileRecord,
        Role, SignUpMetadata, UserRecord,
    };
    pub use internhub_realtime::{
        CollectionWatch, NotifierHandle, RealtimeError, Subscription,
    };
    pub use internhub_session::{
        Account, AuthError, AuthErrorKind, AuthEvent, IdentityError,
        IdentityService, RoleCache, Session, SessionConfig, SessionManager,
        SessionState, SignUpOutcome,
    };
}
