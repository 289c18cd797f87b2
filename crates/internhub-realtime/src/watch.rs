//! Per-component change watching.
//!
//! A page component re-renders often, and each render may hand over a new
//! closure. Re-subscribing on every render would churn the backend
//! channel, so [`CollectionWatch`] routes events through a callback slot:
//! swapping the closure only replaces what is in the slot. The actual
//! subscription is rebuilt only when the watched list changes.

use std::sync::{Arc, PoisonError, RwLock};

use crate::{Callback, NotifierHandle, RealtimeError, Subscription, SubscriptionId};

/// Watches a list of collections and calls the latest callback on change.
pub struct CollectionWatch {
    notifier: NotifierHandle,
    collections: Vec<String>,
    slot: Arc<RwLock<Callback>>,
    subscription: Option<Subscription>,
}

impl CollectionWatch {
    /// Starts watching `collections`. An empty list watches nothing until
    /// [`set_collections`](Self::set_collections) supplies one.
    pub async fn new<S, F>(
        notifier: &NotifierHandle,
        collections: impl IntoIterator<Item = S>,
        callback: F,
    ) -> Result<Self, RealtimeError>
    where
        S: Into<String>,
        F: Fn() + Send + Sync + 'static,
    {
        let collections: Vec<String> =
            collections.into_iter().map(Into::into).collect();
        let callback: Callback = Arc::new(callback);
        let slot = Arc::new(RwLock::new(callback));
        let subscription = subscribe_slot(notifier, &collections, &slot).await?;

        Ok(Self {
            notifier: notifier.clone(),
            collections,
            slot,
            subscription,
        })
    }

    /// Replaces the callback. The subscription is untouched; the next
    /// change calls the new closure.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    /// Changes the watched list.
    ///
    /// A list equal to the current one (same names, same order) is a
    /// no-op and returns `Ok(false)`. Otherwise the old subscription is
    /// released before the new one is made, and `Ok(true)` is returned.
    /// On error the watch is left watching nothing, with an empty list.
    pub async fn set_collections<S>(
        &mut self,
        collections: impl IntoIterator<Item = S>,
    ) -> Result<bool, RealtimeError>
    where
        S: Into<String>,
    {
        let collections: Vec<String> =
            collections.into_iter().map(Into::into).collect();
        if collections == self.collections {
            return Ok(false);
        }

        drop(self.subscription.take());
        match subscribe_slot(&self.notifier, &collections, &self.slot).await {
            Ok(subscription) => {
                self.subscription = subscription;
                self.collections = collections;
                Ok(true)
            }
            Err(e) => {
                // Nothing is watched now; forget the list so a retry with
                // it subscribes again.
                self.collections.clear();
                Err(e)
            }
        }
    }

    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    /// The live subscription's id, if any.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription.as_ref().map(Subscription::id)
    }
}

async fn subscribe_slot(
    notifier: &NotifierHandle,
    collections: &[String],
    slot: &Arc<RwLock<Callback>>,
) -> Result<Option<Subscription>, RealtimeError> {
    if collections.is_empty() {
        return Ok(None);
    }

    let slot = Arc::clone(slot);
    let relay: Callback = Arc::new(move || {
        // Clone out of the lock so the callback may itself call
        // `set_callback` without deadlocking.
        let current: Callback =
            slot.read().unwrap_or_else(PoisonError::into_inner).clone();
        current();
    });

    notifier
        .subscribe_callback(collections.to_vec(), relay)
        .await
        .map(Some)
}
