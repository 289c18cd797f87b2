//! Notifier actor: an isolated Tokio task that owns every subscription.
//!
//! Subscribers, publishers, and guards all talk to the actor through one
//! unbounded mpsc channel. Because the channel is a single FIFO queue, a
//! subscription dropped before a new one is requested is always released
//! first.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use internhub_protocol::ChangeEvent;
use tokio::sync::{mpsc, oneshot};

use crate::RealtimeError;

/// Counter for generating unique subscription IDs.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// A change callback. Invoked on the notifier task with no arguments.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Identifies one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Commands sent to the notifier actor.
enum NotifierCommand {
    Subscribe {
        id: SubscriptionId,
        collections: Vec<String>,
        callback: Callback,
        reply: oneshot::Sender<()>,
    },
    Unsubscribe {
        id: SubscriptionId,
    },
    Publish(ChangeEvent),
    /// Replies once every command sent before it has been handled.
    Flush {
        reply: oneshot::Sender<()>,
    },
    GetInfo {
        reply: oneshot::Sender<NotifierInfo>,
    },
    Shutdown,
}

/// A snapshot of notifier bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierInfo {
    /// Live subscriptions.
    pub subscriptions: usize,
    /// Distinct collections with at least one subscriber.
    pub collections: usize,
    /// Events published since start.
    pub events_published: u64,
}

/// Handle to a running notifier. Cheap to clone.
#[derive(Clone)]
pub struct NotifierHandle {
    sender: mpsc::UnboundedSender<NotifierCommand>,
}

/// Starts a notifier actor on the current Tokio runtime.
pub fn spawn_notifier() -> NotifierHandle {
    let (sender, receiver) = mpsc::unbounded_channel();
    let actor = NotifierActor {
        receiver,
        subscriptions: HashMap::new(),
        watchers: HashMap::new(),
        events_published: 0,
    };
    tokio::spawn(actor.run());
    NotifierHandle { sender }
}

impl NotifierHandle {
    /// Subscribes `callback` to changes on any of `collections`.
    ///
    /// Returns once the subscription is live, so an event published
    /// after this returns is guaranteed to reach it.
    ///
    /// # Errors
    /// - [`RealtimeError::NoCollections`] for an empty list
    /// - [`RealtimeError::Unavailable`] if the notifier has stopped
    pub async fn subscribe<S, F>(
        &self,
        collections: impl IntoIterator<Item = S>,
        callback: F,
    ) -> Result<Subscription, RealtimeError>
    where
        S: Into<String>,
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_callback(
            collections.into_iter().map(Into::into).collect(),
            Arc::new(callback),
        )
        .await
    }

    /// Like [`subscribe`](Self::subscribe), for an already shared callback.
    pub async fn subscribe_callback(
        &self,
        collections: Vec<String>,
        callback: Callback,
    ) -> Result<Subscription, RealtimeError> {
        if collections.is_empty() {
            return Err(RealtimeError::NoCollections);
        }

        let id = SubscriptionId(
            NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(NotifierCommand::Subscribe {
                id,
                collections: collections.clone(),
                callback,
                reply: reply_tx,
            })
            .map_err(|_| RealtimeError::Unavailable)?;
        reply_rx.await.map_err(|_| RealtimeError::Unavailable)?;

        Ok(Subscription {
            id,
            collections,
            sender: self.sender.clone(),
        })
    }

    /// Announces a change (fire-and-forget).
    pub fn publish(&self, event: ChangeEvent) -> Result<(), RealtimeError> {
        self.sender
            .send(NotifierCommand::Publish(event))
            .map_err(|_| RealtimeError::Unavailable)
    }

    /// Waits until everything sent before this call has been handled,
    /// including the callbacks of earlier publishes.
    pub async fn flush(&self) -> Result<(), RealtimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(NotifierCommand::Flush { reply: reply_tx })
            .map_err(|_| RealtimeError::Unavailable)?;
        reply_rx.await.map_err(|_| RealtimeError::Unavailable)
    }

    /// Requests bookkeeping counters.
    pub async fn info(&self) -> Result<NotifierInfo, RealtimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(NotifierCommand::GetInfo { reply: reply_tx })
            .map_err(|_| RealtimeError::Unavailable)?;
        reply_rx.await.map_err(|_| RealtimeError::Unavailable)
    }

    /// Stops the actor. Outstanding subscriptions become inert.
    pub fn shutdown(&self) {
        let _ = self.sender.send(NotifierCommand::Shutdown);
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// A live subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriptionId,
    collections: Vec<String>,
    sender: mpsc::UnboundedSender<NotifierCommand>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The collections this subscription watches, in the order given.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("collections", &self.collections)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The actor may already be gone; nothing to release then.
        let _ = self
            .sender
            .send(NotifierCommand::Unsubscribe { id: self.id });
    }
}

struct Entry {
    collections: HashSet<String>,
    callback: Callback,
}

/// The internal actor state. Runs inside a Tokio task.
struct NotifierActor {
    receiver: mpsc::UnboundedReceiver<NotifierCommand>,
    subscriptions: HashMap<SubscriptionId, Entry>,
    /// Collection name → subscriptions watching it. Kept in sync with
    /// `subscriptions`.
    watchers: HashMap<String, HashSet<SubscriptionId>>,
    events_published: u64,
}

impl NotifierActor {
    async fn run(mut self) {
        tracing::debug!("notifier started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                NotifierCommand::Subscribe {
                    id,
                    collections,
                    callback,
                    reply,
                } => {
                    self.handle_subscribe(id, collections, callback);
                    let _ = reply.send(());
                }
                NotifierCommand::Unsubscribe { id } => {
                    self.handle_unsubscribe(id);
                }
                NotifierCommand::Publish(event) => {
                    self.handle_publish(&event);
                }
                NotifierCommand::Flush { reply } => {
                    let _ = reply.send(());
                }
                NotifierCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                NotifierCommand::Shutdown => {
                    tracing::debug!("notifier shutting down");
                    break;
                }
            }
        }

        tracing::debug!(
            events = self.events_published,
            "notifier stopped"
        );
    }

    fn handle_subscribe(
        &mut self,
        id: SubscriptionId,
        collections: Vec<String>,
        callback: Callback,
    ) {
        let collections: HashSet<String> = collections.into_iter().collect();
        for name in &collections {
            self.watchers.entry(name.clone()).or_default().insert(id);
        }
        tracing::debug!(
            subscription = %id,
            collections = ?collections,
            "subscribed"
        );
        self.subscriptions.insert(
            id,
            Entry {
                collections,
                callback,
            },
        );
    }

    fn handle_unsubscribe(&mut self, id: SubscriptionId) {
        let Some(entry) = self.subscriptions.remove(&id) else {
            return;
        };
        for name in &entry.collections {
            if let Some(ids) = self.watchers.get_mut(name) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.watchers.remove(name);
                }
            }
        }
        tracing::debug!(subscription = %id, "unsubscribed");
    }

    fn handle_publish(&mut self, event: &ChangeEvent) {
        self.events_published += 1;
        let Some(ids) = self.watchers.get(&event.collection) else {
            tracing::trace!(collection = %event.collection, "change with no subscribers");
            return;
        };

        for id in ids {
            let Some(entry) = self.subscriptions.get(id) else {
                continue;
            };
            let callback = Arc::clone(&entry.callback);
            if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                tracing::error!(
                    subscription = %id,
                    collection = %event.collection,
                    "change callback panicked"
                );
            }
        }

        tracing::trace!(
            collection = %event.collection,
            kind = ?event.kind,
            notified = ids.len(),
            "change delivered"
        );
    }

    fn info(&self) -> NotifierInfo {
        NotifierInfo {
            subscriptions: self.subscriptions.len(),
            collections: self.watchers.len(),
            events_published: self.events_published,
        }
    }
}
