//! The identity backend, seen from the session layer.
//!
//! internhub doesn't authenticate anyone itself. Credential checks,
//! registration, password mail, and profile storage all live in a remote
//! service (a REST API, a BaaS auth endpoint, ...). [`IdentityService`]
//! is the seam: the [`SessionManager`](crate::SessionManager) drives the
//! lifecycle, the implementation talks to the backend.
//!
//! Tests plug in an in-memory implementation; production plugs in an HTTP
//! client.

use std::future::Future;

use internhub_protocol::{AccountId, ProfileRecord, SignUpMetadata, UserRecord};

use crate::IdentityError;

/// Remote account operations the session lifecycle depends on.
///
/// # Trait bounds
///
/// - `Send + Sync` → one service instance is shared by the manager, the
///   restore task, and the deactivation watch.
/// - `'static` → it lives as long as the session manager.
///
/// Every returned future is `Send` so the manager can run calls on
/// background tasks.
///
/// # Optional results
///
/// `Ok(None)` from `get_session`, `sign_in`, or `sign_up` means "the call
/// succeeded but there is no user": no stored session, a malformed sign-in
/// reply, or a registration awaiting email confirmation. The manager gives
/// each case its own meaning.
///
/// # Example
///
/// ```rust
/// use internhub_protocol::{AccountId, ProfileRecord, SignUpMetadata, UserRecord};
/// use internhub_session::{IdentityError, IdentityService};
///
/// /// Accepts one hard-coded account. Only for demos.
/// struct SingleUser;
///
/// impl IdentityService for SingleUser {
///     async fn get_session(&self) -> Result<Option<UserRecord>, IdentityError> {
///         Ok(None)
///     }
///
///     async fn sign_in(
///         &self,
///         email: &str,
///         password: &str,
///     ) -> Result<Option<UserRecord>, IdentityError> {
///         if email == "demo@example.com" && password == "demo" {
///             Ok(Some(UserRecord::new("1", email).with_role("intern")))
///         } else {
///             Err(IdentityError::Backend("Invalid login credentials".into()))
///         }
///     }
///
///     async fn sign_up(
///         &self,
///         _email: &str,
///         _password: &str,
///         _metadata: &SignUpMetadata,
///     ) -> Result<Option<UserRecord>, IdentityError> {
///         Ok(None)
///     }
///
///     async fn sign_out(&self) -> Result<(), IdentityError> {
///         Ok(())
///     }
///
///     async fn reset_password(&self, _email: &str) -> Result<(), IdentityError> {
///         Ok(())
///     }
///
///     async fn update_password(&self, _new_password: &str) -> Result<(), IdentityError> {
///         Ok(())
///     }
///
///     async fn get_user_profile(
///         &self,
///         _id: &AccountId,
///     ) -> Result<Option<ProfileRecord>, IdentityError> {
///         Ok(None)
///     }
/// }
/// ```
pub trait IdentityService: Send + Sync + 'static {
    /// Looks up the session persisted by the backend SDK, if any.
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<UserRecord>, IdentityError>> + Send;

    /// Verifies an email/password pair.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, IdentityError>> + Send;

    /// Registers a new account with its profile metadata.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> impl Future<Output = Result<Option<UserRecord>, IdentityError>> + Send;

    /// Ends the backend session. Callers treat this as best-effort.
    fn sign_out(
        &self,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Sends a password-reset mail.
    fn reset_password(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Changes the signed-in account's password.
    fn update_password(
        &self,
        new_password: &str,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Fetches the dashboard profile row for an account.
    fn get_user_profile(
        &self,
        id: &AccountId,
    ) -> impl Future<Output = Result<Option<ProfileRecord>, IdentityError>> + Send;
}
