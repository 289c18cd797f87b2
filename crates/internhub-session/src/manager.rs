//! The session manager: owns the authentication state for the whole app.
//!
//! Responsibilities:
//! - Restoring the stored session on start (with a loading timeout)
//! - Sign-in / sign-up / sign-out and password flows
//! - Keeping the last-known-role cache in step with the session
//! - Watching the signed-in account for archival and signing it out
//!
//! # Concurrency note
//!
//! `SessionManager` is a cheap handle around shared state, so it can be
//! cloned into every component that needs it. Actions are async and are
//! NOT serialized against each other: two sign-ins racing each other
//! apply in completion order. Every state write first checks that the
//! manager has not been shut down.
//!
//! Background work (the restore lookup, the deactivation watch) holds a
//! `Weak` reference to the state, so dropping the last handle tears
//! everything down.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use internhub_protocol::{AccountId, Role, SignUpMetadata, UserRecord};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{
    Account, AuthError, AuthEvent, IdentityError, IdentityService, RoleCache,
    Session, SessionConfig, SignUpOutcome,
};

/// Owns the authentication state and mediates every change to it.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ [Loading] ──initialize()──→ [Authenticated] ──sign_out()──→ [Unauthenticated]
///                │                          ↑     │                          │
///                │                          │     └─(archived on poll)──────→│
///                └──(no session/timeout)──→ [Unauthenticated] ──sign_in()────┘
/// ```
pub struct SessionManager<I: IdentityService, C: RoleCache> {
    inner: Arc<Inner<I, C>>,
}

impl<I: IdentityService, C: RoleCache> Clone for SessionManager<I, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// A running deactivation watch and the account it watches.
struct DeactivationWatch {
    account_id: AccountId,
    task: JoinHandle<()>,
}

struct Inner<I, C> {
    identity: Arc<I>,
    cache: C,
    config: SessionConfig,
    state: watch::Sender<Session>,
    /// Cleared by `shutdown`; every state write checks it.
    alive: AtomicBool,
    /// Set by the first `initialize` call.
    initialized: AtomicBool,
    deactivation: Mutex<Option<DeactivationWatch>>,
}

impl<I: IdentityService, C: RoleCache> SessionManager<I, C> {
    /// Creates a manager in the `Loading` state.
    ///
    /// Nothing talks to the backend until [`initialize`](Self::initialize).
    pub fn new(identity: I, cache: C, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(Session::loading());
        Self {
            inner: Arc::new(Inner {
                identity: Arc::new(identity),
                cache,
                config,
                state,
                alive: AtomicBool::new(true),
                initialized: AtomicBool::new(false),
                deactivation: Mutex::new(None),
            }),
        }
    }

    /// Restores the stored session. Runs once; later calls return the
    /// current snapshot without touching the backend.
    ///
    /// Never fails: lookup errors degrade to signed-out. If the lookup
    /// takes longer than `restore_timeout`, `is_loading` is cleared anyway
    /// and the lookup keeps running; its result is applied when it lands,
    /// unless the manager has been shut down by then.
    pub async fn initialize(&self) -> Session {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return self.session();
        }

        let weak = Arc::downgrade(&self.inner);
        let identity = Arc::clone(&self.inner.identity);
        let lookup = tokio::spawn(async move {
            let result = identity.get_session().await;
            if let Some(inner) = weak.upgrade() {
                inner.finish_restore(result);
            }
        });

        let timeout = self.inner.config.restore_timeout;
        match time::timeout(timeout, lookup).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "session restore task failed");
                self.inner.write(|s| s.is_loading = false);
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "session restore timed out, continuing signed out"
                );
                self.inner.write(|s| s.is_loading = false);
            }
        }

        self.session()
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    /// - the backend's error, mapped to an [`AuthError`]; state untouched
    /// - [`AuthErrorKind::MissingUser`](crate::AuthErrorKind::MissingUser)
    ///   when the backend answers success without a user; state untouched
    /// - [`AuthErrorKind::AccountDeactivated`](crate::AuthErrorKind::AccountDeactivated)
    ///   for archived accounts; the session ends up signed out
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let record = self
            .inner
            .identity
            .sign_in(email, password)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "sign in rejected");
                AuthError::from(e)
            })?;

        let record = record.ok_or_else(|| {
            tracing::warn!("sign in succeeded without a user");
            AuthError::missing_user()
        })?;

        self.inner.accept(record, false)
    }

    /// Registers a new account.
    ///
    /// When the backend opens a session immediately the manager moves to
    /// `Authenticated` exactly as after [`sign_in`](Self::sign_in). When it
    /// answers with neither a user nor an error, the account awaits email
    /// confirmation and the state is left alone.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome, AuthError> {
        let record = self
            .inner
            .identity
            .sign_up(email, password, metadata)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "sign up rejected");
                AuthError::from(e)
            })?;

        match record {
            Some(record) => {
                self.inner.accept(record, false).map(SignUpOutcome::SignedIn)
            }
            None => {
                tracing::info!(role = %metadata.role, "sign up awaiting email confirmation");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
        }
    }

    /// Signs out.
    ///
    /// The local session is cleared before this returns; the backend call
    /// runs on the returned task. A failed backend sign-out is logged and
    /// never brings the session back. Callers are free to drop the handle.
    pub fn sign_out(&self) -> JoinHandle<()> {
        self.inner.end_locally();
        tracing::info!("signed out");
        self.inner.spawn_remote_sign_out()
    }

    /// Sends a password-reset mail. Does not touch the session.
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.inner
            .identity
            .reset_password(email)
            .await
            .map_err(AuthError::from)
    }

    /// Changes the current account's password. Does not touch the session.
    pub async fn update_password(
        &self,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.inner
            .identity
            .update_password(new_password)
            .await
            .map_err(AuthError::from)
    }

    /// Drops the password-recovery flag. Idempotent.
    pub fn clear_password_recovery(&self) {
        self.inner
            .write_if(|s| mem::replace(&mut s.is_password_recovery, false));
    }

    /// Applies an auth state change pushed by the backend.
    pub fn apply_auth_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(record) => {
                let _ = self.inner.accept(record, false);
            }
            AuthEvent::PasswordRecovery(record) => {
                let _ = self.inner.accept(record, true);
            }
            AuthEvent::UserUpdated(record) => {
                let recovery = self.inner.state.borrow().is_password_recovery;
                let _ = self.inner.accept(record, recovery);
            }
            AuthEvent::SignedOut => {
                self.inner.end_locally();
                tracing::info!("backend reported sign out");
            }
        }
    }

    /// The current state.
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// The advisory last-known role. Never use it for authorization.
    pub fn cached_role(&self) -> Option<Role> {
        self.inner.cache.load()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Tears the manager down. Pending background results are discarded
    /// and the deactivation watch stops. The role cache is left as is.
    pub fn shutdown(&self) {
        if self.inner.alive.swap(false, Ordering::SeqCst) {
            self.inner.stop_watch();
            tracing::debug!("session manager shut down");
        }
    }
}

impl<I: IdentityService, C: RoleCache> Inner<I, C> {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Applies `f` to the state unless the manager is torn down.
    fn write(&self, f: impl FnOnce(&mut Session)) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state.send_modify(f);
        true
    }

    /// Like [`write`](Self::write), but observers are only notified when
    /// `f` reports a change.
    fn write_if(&self, f: impl FnOnce(&mut Session) -> bool) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state.send_if_modified(f)
    }

    /// Applies the stored-session lookup result.
    fn finish_restore(
        self: &Arc<Self>,
        result: Result<Option<UserRecord>, IdentityError>,
    ) {
        if !self.is_alive() {
            return;
        }
        if self.state.borrow().user.is_some() {
            // A sign-in landed while the lookup was pending; it wins.
            tracing::debug!("session already established, ignoring stored session");
            self.write(|s| s.is_loading = false);
            return;
        }
        match result {
            Ok(Some(record)) if record.status.is_archived() => {
                tracing::info!(
                    account_id = %record.id,
                    "stored session belongs to an archived account"
                );
                self.end_locally();
                self.write(|s| s.is_loading = false);
                let _ = self.spawn_remote_sign_out();
            }
            Ok(Some(record)) => {
                let account = Account::from_record(&record);
                tracing::info!(account_id = %account.id, role = %account.role, "session restored");
                self.establish(account, false);
            }
            Ok(None) => {
                tracing::debug!("no stored session");
                self.write(|s| s.is_loading = false);
            }
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed");
                self.write(|s| s.is_loading = false);
            }
        }
    }

    /// Shared tail of sign-in, sign-up, and pushed auth events.
    fn accept(
        self: &Arc<Self>,
        record: UserRecord,
        password_recovery: bool,
    ) -> Result<Account, AuthError> {
        if record.status.is_archived() {
            tracing::warn!(account_id = %record.id, "archived account refused");
            self.end_locally();
            let _ = self.spawn_remote_sign_out();
            return Err(AuthError::deactivated());
        }

        let account = Account::from_record(&record);
        tracing::info!(account_id = %account.id, role = %account.role, "signed in");
        self.establish(account.clone(), password_recovery);
        Ok(account)
    }

    /// Moves to `Authenticated` and starts watching the account.
    fn establish(self: &Arc<Self>, account: Account, password_recovery: bool) {
        if !self.is_alive() {
            return;
        }
        self.cache.store(account.role);
        let account_id = account.id.clone();
        self.write(|s| {
            s.user = Some(account);
            s.is_loading = false;
            s.is_password_recovery = password_recovery;
        });
        self.start_watch(account_id);
    }

    /// Local half of every sign-out: cache, watch, state.
    fn end_locally(&self) {
        self.stop_watch();
        self.cache.clear();
        self.write(|s| {
            s.user = None;
            s.is_password_recovery = false;
        });
    }

    /// Remote half of every sign-out, best-effort.
    fn spawn_remote_sign_out(&self) -> JoinHandle<()> {
        let identity = Arc::clone(&self.identity);
        tokio::spawn(async move {
            if let Err(e) = identity.sign_out().await {
                tracing::warn!(error = %e, "remote sign out failed, local session already cleared");
            }
        })
    }

    /// Starts the deactivation watch for `account_id`, replacing a watch on
    /// any other account. A live watch on the same account is kept.
    fn start_watch(self: &Arc<Self>, account_id: AccountId) {
        let period = self.config.deactivation_poll_interval;
        if period.is_zero() || !self.is_alive() {
            return;
        }

        let mut slot = self
            .deactivation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.as_ref() {
            if current.account_id == account_id && !current.task.is_finished() {
                return;
            }
        }
        if let Some(old) = slot.take() {
            old.task.abort();
        }

        let task = tokio::spawn(watch_for_deactivation(
            Arc::downgrade(self),
            Arc::clone(&self.identity),
            account_id.clone(),
            period,
        ));
        tracing::debug!(
            %account_id,
            period_ms = period.as_millis() as u64,
            "deactivation watch started"
        );
        *slot = Some(DeactivationWatch { account_id, task });
    }

    fn stop_watch(&self) {
        let watch = self
            .deactivation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watch) = watch {
            watch.task.abort();
            tracing::debug!(account_id = %watch.account_id, "deactivation watch stopped");
        }
    }

    /// Signs out because `account_id` was found archived, provided it is
    /// still the signed-in account.
    fn deactivate(&self, account_id: &AccountId) {
        if !self.is_alive() {
            return;
        }
        if self.state.borrow().account_id() != Some(account_id) {
            return;
        }
        tracing::info!(%account_id, "account archived, signing out");
        self.end_locally();
        let _ = self.spawn_remote_sign_out();
    }
}

impl<I, C> Drop for Inner<I, C> {
    fn drop(&mut self) {
        let watch = self
            .deactivation
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watch) = watch {
            watch.task.abort();
        }
    }
}

/// Periodically re-checks `account_id` and signs out once it is archived.
///
/// Lookup failures are swallowed: only an explicit "archived" answer may
/// end the session.
async fn watch_for_deactivation<I: IdentityService, C: RoleCache>(
    inner: Weak<Inner<I, C>>,
    identity: Arc<I>,
    account_id: AccountId,
    period: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if !inner.upgrade().is_some_and(|inner| inner.is_alive()) {
            break;
        }

        match identity.get_user_profile(&account_id).await {
            Ok(Some(profile)) if profile.status.is_archived() => {
                if let Some(inner) = inner.upgrade() {
                    inner.deactivate(&account_id);
                }
                break;
            }
            Ok(_) => {
                tracing::trace!(%account_id, "account still active");
            }
            Err(e) => {
                tracing::debug!(%account_id, error = %e, "deactivation check failed, will retry");
            }
        }
    }
}
