//! `DashboardClient` builder and handle.
//!
//! This is the entry point for a dashboard front end. It ties together
//! all the layers: identity → session, realtime feed → notifier → page
//! watches.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use internhub_protocol::Role;
use internhub_realtime::{spawn_notifier, CollectionWatch, NotifierHandle};
use internhub_session::{
    FileRoleCache, IdentityService, MemoryRoleCache, RoleCache, SessionConfig,
    SessionManager,
};
use internhub_transport::{Connection, Connector, WebSocketConnector};
use tokio::task::JoinHandle;

use crate::{InternhubError, RealtimeBridge};

/// Everything a [`DashboardClient`] is configured with.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Restore timeout and deactivation poll interval.
    pub session: SessionConfig,
    /// `ws://` endpoint of the realtime change feed. `None` leaves the
    /// notifier local-only.
    pub realtime_url: Option<String>,
    /// File for the last-known role. `None` keeps it in memory.
    pub role_cache_path: Option<PathBuf>,
}

/// The role cache picked by [`ClientConfig::role_cache_path`].
#[derive(Debug)]
pub enum RoleStore {
    Memory(MemoryRoleCache),
    File(FileRoleCache),
}

impl RoleStore {
    fn from_config(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::File(FileRoleCache::new(path)),
            None => Self::Memory(MemoryRoleCache::new()),
        }
    }
}

impl RoleCache for RoleStore {
    fn load(&self) -> Option<Role> {
        match self {
            Self::Memory(cache) => cache.load(),
            Self::File(cache) => cache.load(),
        }
    }

    fn store(&self, role: Role) {
        match self {
            Self::Memory(cache) => cache.store(role),
            Self::File(cache) => cache.store(role),
        }
    }

    fn clear(&self) {
        match self {
            Self::Memory(cache) => cache.clear(),
            Self::File(cache) => cache.clear(),
        }
    }
}

/// Builder for configuring and starting a [`DashboardClient`].
///
/// # Example
///
/// ```rust,ignore
/// use internhub::prelude::*;
///
/// let client = DashboardClientBuilder::new()
///     .realtime_url("ws://127.0.0.1:4000/changes")
///     .role_cache_path("/var/lib/internhub/role")
///     .build(my_identity_service)
///     .await?;
/// client.session().initialize().await;
/// ```
pub struct DashboardClientBuilder {
    config: ClientConfig,
}

impl DashboardClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the realtime feed endpoint to connect on build.
    pub fn realtime_url(mut self, url: &str) -> Self {
        self.config.realtime_url = Some(url.to_string());
        self
    }

    /// Persists the last-known role in a file at `path`.
    pub fn role_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.role_cache_path = Some(path.into());
        self
    }

    /// Builds the client around `identity`.
    ///
    /// Starts the change notifier and, when a realtime URL is configured,
    /// connects the feed. The session is left in `Loading`; call
    /// [`SessionManager::initialize`] to restore it.
    ///
    /// # Errors
    /// [`InternhubError::Transport`] if the realtime feed cannot be
    /// reached.
    pub async fn build<I: IdentityService>(
        self,
        identity: I,
    ) -> Result<DashboardClient<I>, InternhubError> {
        let ClientConfig {
            session,
            realtime_url,
            role_cache_path,
        } = self.config;

        let client = DashboardClient {
            session: SessionManager::new(
                identity,
                RoleStore::from_config(role_cache_path),
                session,
            ),
            notifier: spawn_notifier(),
            bridge: Mutex::new(None),
        };

        if let Some(url) = realtime_url {
            client.connect_realtime(&url).await?;
        }

        Ok(client)
    }
}

impl Default for DashboardClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running dashboard client: one session plus one change notifier.
///
/// Created by [`DashboardClientBuilder::build`].
///
/// Dropping the client stops the realtime bridge. The session manager
/// and notifier handles it hands out stay usable on their own.
pub struct DashboardClient<I: IdentityService> {
    session: SessionManager<I, RoleStore>,
    notifier: NotifierHandle,
    bridge: Mutex<Option<JoinHandle<()>>>,
}

impl<I: IdentityService> DashboardClient<I> {
    pub fn session(&self) -> &SessionManager<I, RoleStore> {
        &self.session
    }

    pub fn notifier(&self) -> &NotifierHandle {
        &self.notifier
    }

    /// Watches `collections` for changes. See [`CollectionWatch`].
    pub async fn watch<S, F>(
        &self,
        collections: impl IntoIterator<Item = S>,
        callback: F,
    ) -> Result<CollectionWatch, InternhubError>
    where
        S: Into<String>,
        F: Fn() + Send + Sync + 'static,
    {
        Ok(CollectionWatch::new(&self.notifier, collections, callback).await?)
    }

    /// Connects the realtime feed at `url` and forwards its frames into
    /// the notifier. Replaces any previously connected feed.
    ///
    /// # Errors
    /// [`InternhubError::Transport`] if the connection cannot be opened.
    pub async fn connect_realtime(&self, url: &str) -> Result<(), InternhubError> {
        let conn = WebSocketConnector.connect(url).await?;
        let bridge = RealtimeBridge::new(self.notifier.clone());
        let url = url.to_string();

        let task = tokio::spawn(async move {
            match bridge.run(&conn).await {
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "realtime feed lost");
                    let _ = conn.close().await;
                }
            }
        });

        let previous = self
            .bridge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(())
    }

    /// Returns `true` while a realtime feed is being forwarded.
    pub fn is_realtime_connected(&self) -> bool {
        self.bridge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops everything: the session (see [`SessionManager::shutdown`]),
    /// the realtime bridge, and the notifier.
    pub fn shutdown(&self) {
        self.session.shutdown();
        self.stop_bridge();
        self.notifier.shutdown();
        tracing::debug!("dashboard client shut down");
    }

    fn stop_bridge(&self) {
        if let Some(task) = self
            .bridge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl<I: IdentityService> Drop for DashboardClient<I> {
    fn drop(&mut self) {
        self.stop_bridge();
    }
}
