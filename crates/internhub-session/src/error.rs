//! Error types for the session layer.
//!
//! Two levels:
//!
//! - [`IdentityError`] is what an [`IdentityService`](crate::IdentityService)
//!   implementation returns. It may carry a structured kind, or only the
//!   backend's free text.
//! - [`AuthError`] is what session actions return to UI code. It always
//!   has an [`AuthErrorKind`], so callers branch on the kind instead of
//!   searching the message.
//!
//! Free-text backend messages are translated into a kind exactly once,
//! in [`AuthErrorKind::classify`], when an `IdentityError` is converted.

use internhub_protocol::BackendError;

/// Message returned when an archived account tries to sign in.
pub const ACCOUNT_DEACTIVATED_MESSAGE: &str =
    "account deactivated: contact an administrator to restore access";

/// Message returned when the backend reports success but sends no user.
pub const MISSING_USER_MESSAGE: &str =
    "sign in succeeded but no user was returned";

/// Message used when a failure carries no message of its own.
pub const UNEXPECTED_MESSAGE: &str = "an unexpected error occurred";

/// What went wrong, in terms the UI can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// Wrong email/password pair.
    InvalidCredentials,
    /// The account exists but the email address was never confirmed.
    /// The sign-in form offers a "resend confirmation" link for this one.
    EmailNotConfirmed,
    /// Sign-up with an email that is already registered.
    UserAlreadyExists,
    /// The backend rejected the password as too weak.
    WeakPassword,
    /// Too many attempts in a short window.
    RateLimited,
    /// The account is archived.
    AccountDeactivated,
    /// The backend reported success without returning a user.
    MissingUser,
    /// The request never got a usable answer.
    Network,
    /// A backend message we don't recognise.
    Other,
    /// A failure with no message at all.
    Unexpected,
}

impl AuthErrorKind {
    /// Maps a backend error code to a kind.
    ///
    /// Returns `None` for codes we have no special handling for, so the
    /// caller can fall back to [`classify`](Self::classify).
    pub fn from_code(code: &str) -> Option<Self> {
        let kind = match code {
            "invalid_credentials" | "invalid_grant" => Self::InvalidCredentials,
            "email_not_confirmed" => Self::EmailNotConfirmed,
            "user_already_exists" | "email_exists" => Self::UserAlreadyExists,
            "weak_password" => Self::WeakPassword,
            "over_request_rate_limit" | "over_email_send_rate_limit" => {
                Self::RateLimited
            }
            "user_banned" | "account_archived" => Self::AccountDeactivated,
            _ => return None,
        };
        Some(kind)
    }

    /// Infers a kind from a free-text backend message.
    ///
    /// Case-insensitive substring match. An empty message is
    /// `Unexpected`; anything unrecognised is `Other`.
    pub fn classify(message: &str) -> Self {
        let msg = message.trim().to_ascii_lowercase();
        if msg.is_empty() {
            return Self::Unexpected;
        }

        const TABLE: &[(&str, AuthErrorKind)] = &[
            ("email not confirmed", AuthErrorKind::EmailNotConfirmed),
            ("not confirmed", AuthErrorKind::EmailNotConfirmed),
            ("invalid login credentials", AuthErrorKind::InvalidCredentials),
            ("invalid credentials", AuthErrorKind::InvalidCredentials),
            ("invalid email or password", AuthErrorKind::InvalidCredentials),
            ("already registered", AuthErrorKind::UserAlreadyExists),
            ("already exists", AuthErrorKind::UserAlreadyExists),
            ("password should be", AuthErrorKind::WeakPassword),
            ("weak password", AuthErrorKind::WeakPassword),
            ("rate limit", AuthErrorKind::RateLimited),
            ("too many requests", AuthErrorKind::RateLimited),
            ("deactivated", AuthErrorKind::AccountDeactivated),
            ("archived", AuthErrorKind::AccountDeactivated),
            ("failed to fetch", AuthErrorKind::Network),
            ("network", AuthErrorKind::Network),
            ("timed out", AuthErrorKind::Network),
        ];

        TABLE
            .iter()
            .find(|(needle, _)| msg.contains(needle))
            .map(|(_, kind)| *kind)
            .unwrap_or(Self::Other)
    }
}

/// The error every mutating session action returns.
///
/// `Display` is the human-readable message, suitable for inline form
/// errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    kind: AuthErrorKind,
    message: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The archived-account error.
    pub fn deactivated() -> Self {
        Self::new(AuthErrorKind::AccountDeactivated, ACCOUNT_DEACTIVATED_MESSAGE)
    }

    /// The success-without-user error.
    pub fn missing_user() -> Self {
        Self::new(AuthErrorKind::MissingUser, MISSING_USER_MESSAGE)
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors an [`IdentityService`](crate::IdentityService) can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The backend refused the request and said why in a structured way.
    #[error("{message}")]
    Rejected {
        kind: AuthErrorKind,
        message: String,
    },

    /// The backend refused the request with free text only.
    #[error("{0}")]
    Backend(String),

    /// The request failed before the backend answered.
    #[error("network error: {0}")]
    Transport(String),

    /// Something failed without saying what.
    #[error("an unexpected error occurred")]
    Unknown,
}

impl From<BackendError> for IdentityError {
    fn from(err: BackendError) -> Self {
        match err.code.as_deref().and_then(AuthErrorKind::from_code) {
            Some(kind) => IdentityError::Rejected {
                kind,
                message: err.message,
            },
            None => IdentityError::Backend(err.message),
        }
    }
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected { kind, message } => {
                AuthError::new(kind, message)
            }
            IdentityError::Backend(message) => {
                match AuthErrorKind::classify(&message) {
                    AuthErrorKind::Unexpected => AuthError::new(
                        AuthErrorKind::Unexpected,
                        UNEXPECTED_MESSAGE,
                    ),
                    kind => AuthError::new(kind, message),
                }
            }
            IdentityError::Transport(message) => {
                AuthError::new(AuthErrorKind::Network, message)
            }
            IdentityError::Unknown => {
                AuthError::new(AuthErrorKind::Unexpected, UNEXPECTED_MESSAGE)
            }
        }
    }
}
