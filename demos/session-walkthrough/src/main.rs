use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use internhub::prelude::*;

// ---------------------------------------------------------------------------
// In-memory identity directory
// ---------------------------------------------------------------------------

struct Entry {
    password: String,
    record: UserRecord,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<String, Entry>, // keyed by email
    current: Option<String>,
    next_id: u64,
}

/// An identity backend that lives in process memory. Cloning shares it,
/// so the walkthrough can archive accounts behind the session's back.
#[derive(Clone, Default)]
struct DemoIdentity(Arc<Mutex<Directory>>);

impl DemoIdentity {
    fn with<R>(&self, f: impl FnOnce(&mut Directory) -> R) -> R {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn archive(&self, email: &str) {
        self.with(|d| {
            if let Some(entry) = d.accounts.get_mut(email) {
                entry.record.status = AccountStatus::Archived;
            }
        });
    }
}

impl IdentityService for DemoIdentity {
    async fn get_session(&self) -> Result<Option<UserRecord>, IdentityError> {
        Ok(self.with(|d| {
            let email = d.current.as_ref()?;
            d.accounts.get(email).map(|e| e.record.clone())
        }))
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, IdentityError> {
        self.with(|d| match d.accounts.get(email) {
            Some(entry) if entry.password == password => {
                d.current = Some(email.to_string());
                Ok(Some(entry.record.clone()))
            }
            _ => Err(IdentityError::Backend("Invalid login credentials".into())),
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<UserRecord>, IdentityError> {
        if password.len() < 6 {
            return Err(IdentityError::Rejected {
                kind: AuthErrorKind::WeakPassword,
                message: "Password should be at least 6 characters".into(),
            });
        }
        self.with(|d| {
            if d.accounts.contains_key(email) {
                return Err(IdentityError::Backend("User already registered".into()));
            }
            d.next_id += 1;
            let record = UserRecord::new(d.next_id.to_string(), email)
                .with_full_name(metadata.full_name.clone())
                .with_role(metadata.role.as_str());
            let entry = Entry {
                password: password.to_string(),
                record: record.clone(),
            };
            d.accounts.insert(email.to_string(), entry);
            d.current = Some(email.to_string());
            Ok(Some(record))
        })
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.with(|d| d.current = None);
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), IdentityError> {
        tracing::info!(email, "password reset mail queued");
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<(), IdentityError> {
        self.with(|d| {
            let email = d
                .current
                .clone()
                .ok_or_else(|| IdentityError::Backend("Auth session missing".into()))?;
            if let Some(entry) = d.accounts.get_mut(&email) {
                entry.password = new_password.to_string();
            }
            Ok(())
        })
    }

    async fn get_user_profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<ProfileRecord>, IdentityError> {
        Ok(self.with(|d| {
            d.accounts
                .values()
                .find(|e| e.record.id == *id)
                .map(|e| ProfileRecord::new(id.as_str(), e.record.status))
        }))
    }
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

const EMAIL: &str = "ada@example.com";

fn describe(session: &Session) -> String {
    match &session.user {
        Some(user) => format!("{:?} as {} ({})", session.state(), user.name, user.role),
        None => format!("{:?}", session.state()),
    }
}

/// Runs every session flow once and returns the final session.
async fn walkthrough(identity: DemoIdentity, poll: Duration) -> Result<Session, InternhubError> {
    let client = DashboardClientBuilder::new()
        .session_config(SessionConfig {
            deactivation_poll_interval: poll,
            ..SessionConfig::default()
        })
        .build(identity.clone())
        .await?;
    let session = client.session();

    let restored = session.initialize().await;
    tracing::info!(state = %describe(&restored), "restored");

    let metadata =
        SignUpMetadata::new("Ada Lovelace", Role::Intern).with_field("university", "London");
    match session.sign_up(EMAIL, "analytical", &metadata).await? {
        SignUpOutcome::SignedIn(account) => {
            tracing::info!(name = %account.name, "signed up and in")
        }
        SignUpOutcome::ConfirmationRequired => tracing::info!("check your inbox"),
    }

    if let Err(e) = session.sign_up(EMAIL, "analytical", &metadata).await {
        tracing::info!(kind = ?e.kind(), error = %e, "second sign up refused");
    }

    let refreshes = Arc::new(AtomicUsize::new(0));
    let _tasks = {
        let refreshes = Arc::clone(&refreshes);
        client
            .watch(["tasks"], move || {
                refreshes.fetch_add(1, Ordering::SeqCst);
            })
            .await?
    };
    client.notifier().publish(ChangeEvent::new("tasks", ChangeKind::Insert))?;
    client.notifier().publish(ChangeEvent::new("feedback", ChangeKind::Update))?;
    client.notifier().flush().await?;
    tracing::info!(refreshes = refreshes.load(Ordering::SeqCst), "task list refreshed");

    let _ = session.sign_out().await;
    tracing::info!(
        state = %describe(&session.session()),
        cached_role = ?session.cached_role(),
        "after sign out"
    );

    if let Err(e) = session.sign_in(EMAIL, "wrong").await {
        tracing::info!(kind = ?e.kind(), error = %e, "sign in refused");
    }
    let account = session.sign_in(EMAIL, "analytical").await?;
    tracing::info!(name = %account.name, "signed in");

    session.reset_password(EMAIL).await?;
    session.update_password("difference-engine").await?;

    identity.archive(EMAIL);
    let _ = session.subscribe().wait_for(|s| !s.is_authenticated()).await;
    tracing::info!(state = %describe(&session.session()), "archived account signed out");

    if let Err(e) = session.sign_in(EMAIL, "difference-engine").await {
        tracing::info!(kind = ?e.kind(), error = %e, "archived sign in refused");
    }

    let last = session.session();
    client.shutdown();
    Ok(last)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    internhub::init_tracing();
    let last = walkthrough(DemoIdentity::default(), Duration::from_secs(2)).await?;
    eprintln!("walkthrough finished: {}", describe(&last));
    Ok(())
}
