//! Realtime feed bridge: backend change frames → notifier.
//!
//! The backend pushes one JSON frame per row change on the realtime
//! connection. The bridge decodes each frame into a [`ChangeEvent`] and
//! hands it to the [`NotifierHandle`], which fans it out to whichever
//! subscriptions watch that collection.
//!
//! A frame that fails to decode is logged and skipped. One bad frame
//! must not cut every page off from updates.

use internhub_protocol::{ChangeEvent, Codec, JsonCodec};
use internhub_realtime::NotifierHandle;
use internhub_transport::{Connection, TransportError};

use crate::InternhubError;

/// Counters reported when a bridge run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Frames decoded and published.
    pub forwarded: u64,
    /// Frames that failed to decode.
    pub skipped: u64,
}

/// Forwards change frames from one connection into the notifier.
#[derive(Clone)]
pub struct RealtimeBridge<C: Codec = JsonCodec> {
    notifier: NotifierHandle,
    codec: C,
}

impl RealtimeBridge<JsonCodec> {
    /// Creates a bridge that decodes JSON frames.
    pub fn new(notifier: NotifierHandle) -> Self {
        Self::with_codec(notifier, JsonCodec)
    }
}

impl<C: Codec> RealtimeBridge<C> {
    pub fn with_codec(notifier: NotifierHandle, codec: C) -> Self {
        Self { notifier, codec }
    }

    /// Reads frames until the connection closes.
    ///
    /// Returns the run's counters on a clean close.
    ///
    /// # Errors
    /// - [`InternhubError::Transport`] if reading from the connection fails
    /// - [`InternhubError::Realtime`] if the notifier has stopped
    pub async fn run<N>(&self, conn: &N) -> Result<BridgeStats, InternhubError>
    where
        N: Connection<Error = TransportError>,
    {
        let conn_id = conn.id();
        let mut stats = BridgeStats::default();
        tracing::info!(conn = %conn_id, "realtime bridge started");

        while let Some(frame) = conn.recv().await? {
            let event: ChangeEvent = match self.codec.decode(&frame) {
                Ok(event) => event,
                Err(e) => {
                    stats.skipped += 1;
                    tracing::warn!(
                        conn = %conn_id,
                        error = %e,
                        "skipping undecodable change frame"
                    );
                    continue;
                }
            };

            tracing::trace!(
                conn = %conn_id,
                collection = %event.collection,
                kind = ?event.kind,
                "change frame"
            );
            self.notifier.publish(event)?;
            stats.forwarded += 1;
        }

        tracing::info!(
            conn = %conn_id,
            forwarded = stats.forwarded,
            skipped = stats.skipped,
            "realtime bridge stopped"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use internhub_realtime::{spawn_notifier, RealtimeError};
    use internhub_transport::ConnectionId;
    use tokio::sync::Mutex;

    use super::*;

    /// A connection that replays a fixed list of frames, then closes.
    struct ScriptedConnection {
        frames: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    }

    impl ScriptedConnection {
        fn new(frames: Vec<Result<Vec<u8>, TransportError>>) -> Self {
            Self {
                frames: Mutex::new(frames.into()),
            }
        }

        fn frames(frames: &[&str]) -> Self {
            Self::new(
                frames
                    .iter()
                    .map(|f| Ok(f.as_bytes().to_vec()))
                    .collect(),
            )
        }
    }

    impl Connection for ScriptedConnection {
        type Error = TransportError;

        async fn send(&self, _data: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }

        async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
            match self.frames.lock().await.pop_front() {
                Some(Ok(frame)) => Ok(Some(frame)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }

        fn id(&self) -> ConnectionId {
            ConnectionId::new(99)
        }
    }

    #[tokio::test]
    async fn test_run_forwards_frames_until_close() {
        let notifier = spawn_notifier();
        let hits = Arc::new(AtomicUsize::new(0));
        let _sub = {
            let hits = Arc::clone(&hits);
            notifier
                .subscribe(["tasks"], move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap()
        };
        let conn = ScriptedConnection::frames(&[
            r#"{"collection":"tasks","kind":"insert"}"#,
            r#"{"collection":"attendance","kind":"update"}"#,
            r#"{"collection":"tasks","kind":"delete"}"#,
        ]);

        let stats = RealtimeBridge::new(notifier.clone()).run(&conn).await.unwrap();
        notifier.flush().await.unwrap();

        assert_eq!(stats, BridgeStats { forwarded: 3, skipped: 0 });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_bad_frame_skipped() {
        let notifier = spawn_notifier();
        let conn = ScriptedConnection::frames(&[
            "not json",
            r#"{"collection":"tasks"}"#,
            r#"{"collection":"tasks","kind":"update"}"#,
        ]);

        let stats = RealtimeBridge::new(notifier).run(&conn).await.unwrap();

        assert_eq!(stats, BridgeStats { forwarded: 1, skipped: 2 });
    }

    #[tokio::test]
    async fn test_run_receive_error_returns_transport() {
        let notifier = spawn_notifier();
        let conn = ScriptedConnection::new(vec![Err(
            TransportError::ConnectionClosed("reset".into()),
        )]);

        let result = RealtimeBridge::new(notifier).run(&conn).await;

        assert!(matches!(result, Err(InternhubError::Transport(_))));
    }

    #[tokio::test]
    async fn test_run_stopped_notifier_returns_realtime() {
        let notifier = spawn_notifier();
        notifier.shutdown();
        notifier.flush().await.unwrap_err();
        let conn = ScriptedConnection::frames(&[
            r#"{"collection":"tasks","kind":"update"}"#,
        ]);

        let result = RealtimeBridge::new(notifier).run(&conn).await;

        assert!(matches!(
            result,
            Err(InternhubError::Realtime(RealtimeError::Unavailable))
        ));
    }
}
