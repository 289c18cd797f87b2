//! Integration tests for the dashboard client: session wiring, role cache
//! persistence, and the realtime feed over a real WebSocket.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::SinkExt;
use internhub::prelude::*;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Mock identity service
// =========================================================================

/// Always reports the same stored session and accepts any sign-in.
struct StaticIdentity {
    record: Option<UserRecord>,
}

impl StaticIdentity {
    fn signed_in() -> Self {
        Self {
            record: Some(
                UserRecord::new("7", "dana@example.com")
                    .with_full_name("Dana")
                    .with_role("supervisor"),
            ),
        }
    }

    fn signed_out() -> Self {
        Self { record: None }
    }
}

impl IdentityService for StaticIdentity {
    async fn get_session(&self) -> Result<Option<UserRecord>, IdentityError> {
        Ok(self.record.clone())
    }

    async fn sign_in(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<Option<UserRecord>, IdentityError> {
        Ok(Some(UserRecord::new("8", email).with_role("intern")))
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _metadata: &SignUpMetadata,
    ) -> Result<Option<UserRecord>, IdentityError> {
        Ok(None)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn reset_password(&self, _email: &str) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn update_password(&self, _new_password: &str) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn get_user_profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<ProfileRecord>, IdentityError> {
        Ok(Some(ProfileRecord::new(id.as_str(), AccountStatus::Active)))
    }
}

// =========================================================================
// Helpers
// =========================================================================

static NEXT_FILE: AtomicU64 = AtomicU64::new(0);

fn temp_role_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "internhub-client-{}-{}/role",
        std::process::id(),
        NEXT_FILE.fetch_add(1, Ordering::Relaxed)
    ))
}

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have addr");
    (listener, format!("ws://{addr}"))
}

/// Serves one feed connection: waits for `go`, sends `frames`, closes.
fn serve_feed(
    listener: TcpListener,
    go: oneshot::Receiver<()>,
    frames: Vec<&'static str>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        go.await.unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }
        ws.close(None).await.unwrap();
    })
}

// =========================================================================
// Session wiring
// =========================================================================

#[tokio::test]
async fn test_build_then_initialize_restores_session() {
    let client = DashboardClientBuilder::new()
        .build(StaticIdentity::signed_in())
        .await
        .unwrap();

    assert!(client.session().session().is_loading);
    let session = client.session().initialize().await;

    assert!(session.is_authenticated());
    let user = session.user.unwrap();
    assert_eq!(user.name, "Dana");
    assert_eq!(user.role, Role::Supervisor);
    assert!(!client.is_realtime_connected());
}

#[tokio::test]
async fn test_role_cache_path_persists_role_and_clears_on_sign_out() {
    let path = temp_role_path();
    let client = DashboardClientBuilder::new()
        .role_cache_path(&path)
        .build(StaticIdentity::signed_out())
        .await
        .unwrap();
    client.session().initialize().await;

    client.session().sign_in("new@example.com", "pw").await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "intern");

    client.session().sign_out().await.unwrap();
    assert_eq!(client.session().cached_role(), None);
    assert!(!client.session().session().is_authenticated());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_session_config_reaches_manager() {
    let config = SessionConfig {
        restore_timeout: Duration::from_millis(250),
        deactivation_poll_interval: Duration::ZERO,
    };
    let client = DashboardClientBuilder::new()
        .session_config(config.clone())
        .build(StaticIdentity::signed_out())
        .await
        .unwrap();

    assert_eq!(client.session().config(), &config);
}

// =========================================================================
// Realtime feed
// =========================================================================

#[tokio::test]
async fn test_realtime_frames_reach_watching_component() {
    let (listener, url) = listener().await;
    let (go_tx, go_rx) = oneshot::channel();
    let server = serve_feed(
        listener,
        go_rx,
        vec![
            r#"{"collection":"attendance","kind":"insert"}"#,
            "garbage",
            r#"{"collection":"tasks","kind":"update"}"#,
        ],
    );

    let client = DashboardClientBuilder::new()
        .realtime_url(&url)
        .build(StaticIdentity::signed_out())
        .await
        .unwrap();

    let (hit_tx, mut hit_rx) = mpsc::unbounded_channel();
    let _tasks = client
        .watch(["tasks"], move || {
            let _ = hit_tx.send("tasks");
        })
        .await
        .unwrap();
    go_tx.send(()).unwrap();

    let hit = tokio::time::timeout(Duration::from_secs(5), hit_rx.recv())
        .await
        .expect("change should arrive")
        .expect("watch should be live");
    assert_eq!(hit, "tasks");
    server.await.unwrap();

    client.notifier().flush().await.unwrap();
    assert!(hit_rx.try_recv().is_err(), "attendance must not reach tasks watch");
}

#[tokio::test]
async fn test_realtime_feed_close_ends_bridge() {
    let (listener, url) = listener().await;
    let (go_tx, go_rx) = oneshot::channel();
    let server = serve_feed(listener, go_rx, vec![]);

    let client = DashboardClientBuilder::new()
        .realtime_url(&url)
        .build(StaticIdentity::signed_out())
        .await
        .unwrap();
    assert!(client.is_realtime_connected());

    go_tx.send(()).unwrap();
    server.await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while client.is_realtime_connected() {
        assert!(tokio::time::Instant::now() < deadline, "bridge should stop");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_build_unreachable_feed_returns_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let (listener, url) = listener().await;
    drop(listener);

    let result = DashboardClientBuilder::new()
        .realtime_url(&url)
        .build(StaticIdentity::signed_out())
        .await;

    assert!(matches!(result, Err(InternhubError::Transport(_))));
}

#[tokio::test]
async fn test_shutdown_stops_notifier() {
    let client = DashboardClientBuilder::new()
        .build(StaticIdentity::signed_out())
        .await
        .unwrap();

    client.shutdown();

    assert_eq!(
        client.notifier().flush().await,
        Err(RealtimeError::Unavailable)
    );
}
