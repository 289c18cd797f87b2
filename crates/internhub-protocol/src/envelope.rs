//! Response envelopes returned by the identity backend.
//!
//! The auth endpoints answer with `{ "user": ..., "error": ... }` where
//! either side may be missing. Success-without-user is a legitimate
//! shape (e.g. sign-up awaiting email confirmation), so `into_result`
//! keeps the user optional instead of treating its absence as an error.

use serde::{Deserialize, Serialize};

use crate::{ProfileRecord, UserRecord};

/// An error as the backend reports it.
///
/// `code` is present on newer backend versions (`"invalid_credentials"`,
/// `"email_not_confirmed"`, ...); older ones only send free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Reply to session lookup, sign-in, and sign-up calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default)]
    pub error: Option<BackendError>,
}

impl AuthResponse {
    /// An error, if present, wins over a user.
    pub fn into_result(self) -> Result<Option<UserRecord>, BackendError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.user),
        }
    }
}

/// Reply to a profile lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub profile: Option<ProfileRecord>,
}
