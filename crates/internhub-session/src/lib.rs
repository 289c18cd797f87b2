//! Authentication session management for internhub.
//!
//! This crate owns "who is signed in" for the whole dashboard:
//!
//! 1. **Identity backend**: the [`IdentityService`] trait is the seam to
//!    the remote account service (sign-in, registration, profiles).
//! 2. **Session tracking**: [`SessionManager`] restores, establishes, and
//!    ends the session and publishes every change as a [`Session`]
//!    snapshot.
//! 3. **Deactivation**: while signed in, the account is re-checked on an
//!    interval and signed out as soon as it is archived.
//! 4. **Role hint**: the last-known role is kept in a [`RoleCache`] for
//!    optimistic layout decisions.
//!
//! # How it fits in the stack
//!
//! ```text
//! Dashboard UI (above)      ← reads Session snapshots, calls actions
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below)    ← UserRecord, ProfileRecord, Role
//! ```

mod cache;
mod error;
mod identity;
mod manager;
mod session;

pub use cache::{FileRoleCache, MemoryRoleCache, RoleCache};
pub use error::{
    AuthError, AuthErrorKind, IdentityError, ACCOUNT_DEACTIVATED_MESSAGE,
    MISSING_USER_MESSAGE, UNEXPECTED_MESSAGE,
};
pub use identity::IdentityService;
pub use manager::SessionManager;
pub use session::{
    Account, AuthEvent, Session, SessionConfig, SessionState, SignUpOutcome,
};
