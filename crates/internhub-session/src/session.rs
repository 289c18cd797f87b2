//! Session types: what the UI sees of the authentication state.
//!
//! A [`Session`] answers three questions for every render:
//! - WHO is signed in (`user`)
//! - ARE we still finding out (`is_loading`)
//! - DID they arrive through a password-recovery link
//!   (`is_password_recovery`)

use std::time::Duration;

use internhub_protocol::{AccountId, Role, UserRecord};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timing knobs for the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long `initialize` waits for the stored session before it stops
    /// reporting `is_loading`. The lookup itself is not cancelled.
    ///
    /// Default: 5 seconds.
    pub restore_timeout: Duration,

    /// How often a signed-in account's status is re-checked for
    /// archival. `Duration::ZERO` disables the check.
    ///
    /// Default: 5 minutes.
    pub deactivation_poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restore_timeout: Duration::from_millis(5_000),
            deactivation_poll_interval: Duration::from_millis(300_000),
        }
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The signed-in identity, as the dashboard presents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    /// Full name, or the local part of the email when none is set.
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,
}

impl Account {
    /// Projects a backend record into an account.
    ///
    /// Does not look at `record.status`; callers reject archived records
    /// before mapping.
    pub fn from_record(record: &UserRecord) -> Self {
        let name = record
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email_local_part(&record.email).to_string());

        let role = match record.role.as_deref().map(str::parse::<Role>) {
            Some(Ok(role)) => role,
            Some(Err(e)) => {
                tracing::warn!(
                    account_id = %record.id,
                    error = %e,
                    "unrecognised role, treating as intern"
                );
                Role::Intern
            }
            None => {
                tracing::warn!(account_id = %record.id, "account has no role, treating as intern");
                Role::Intern
            }
        };

        Self {
            id: record.id.clone(),
            name,
            email: record.email.clone(),
            role,
            avatar_url: record.avatar_url.clone(),
        }
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Coarse lifecycle state, derived from a [`Session`].
///
/// ```text
///   Loading ──(restore)──→ Authenticated ⇄ Unauthenticated
///      └────(no session / timeout)──↗
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Unauthenticated,
    Authenticated,
}

/// A snapshot of the authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<Account>,
    pub is_loading: bool,
    pub is_password_recovery: bool,
}

impl Session {
    /// The state every manager starts in.
    pub(crate) fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
            is_password_recovery: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn state(&self) -> SessionState {
        match (&self.user, self.is_loading) {
            (Some(_), _) => SessionState::Authenticated,
            (None, true) => SessionState::Loading,
            (None, false) => SessionState::Unauthenticated,
        }
    }

    /// The signed-in account's id, if any.
    pub fn account_id(&self) -> Option<&AccountId> {
        self.user.as_ref().map(|account| &account.id)
    }
}

/// How a successful registration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The backend opened a session straight away.
    SignedIn(Account),
    /// The backend wants the email confirmed first; no session yet.
    ConfirmationRequired,
}

/// Auth state changes pushed by the backend SDK (other tabs, magic links,
/// recovery links).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(UserRecord),
    /// The user followed a password-recovery link and now holds a session
    /// whose only purpose is setting a new password.
    PasswordRecovery(UserRecord),
    /// Profile or metadata changed for the current user.
    UserUpdated(UserRecord),
    SignedOut,
}
