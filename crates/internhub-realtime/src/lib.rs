//! Collection change notifications for internhub.
//!
//! Dashboard pages list tasks, attendance, announcements, and so on. When
//! the backend reports that a collection changed, every page showing it
//! should re-fetch. This crate provides:
//!
//! - [`spawn_notifier`] / [`NotifierHandle`]: an actor that owns all
//!   subscriptions and fans change events out to them.
//! - [`Subscription`]: an RAII guard; dropping it unsubscribes.
//! - [`CollectionWatch`]: the per-component helper that keeps one
//!   subscription stable across callback changes and only re-subscribes
//!   when the watched collection list really changes.
//!
//! Notifications carry no payload. Treat them as "your data may be stale"
//! and re-fetch idempotently.

mod error;
mod notifier;
mod watch;

pub use error::RealtimeError;
pub use notifier::{
    spawn_notifier, Callback, NotifierHandle, NotifierInfo, Subscription,
    SubscriptionId,
};
pub use watch::CollectionWatch;
