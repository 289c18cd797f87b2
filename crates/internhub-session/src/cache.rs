//! The last-known-role cache.
//!
//! A single optional [`Role`] that survives a reload, so the dashboard can
//! pick a layout before the real session is confirmed. It is a hint, never
//! an authorization source: nothing in this crate reads it back to make a
//! decision.
//!
//! The trait is synchronous and infallible. A cache that cannot be read
//! behaves as empty; a cache that cannot be written logs and moves on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use internhub_protocol::Role;

/// Storage for the last-known role.
pub trait RoleCache: Send + Sync + 'static {
    /// The cached role, or `None` when absent or unreadable.
    fn load(&self) -> Option<Role>;

    /// Replaces the cached role.
    fn store(&self, role: Role);

    /// Forgets the cached role.
    fn clear(&self);
}

// ---------------------------------------------------------------------------
// MemoryRoleCache
// ---------------------------------------------------------------------------

/// A process-local cache. Does not survive a restart; used in tests and
/// when no storage path is configured.
#[derive(Debug, Default)]
pub struct MemoryRoleCache {
    role: Mutex<Option<Role>>,
}

impl MemoryRoleCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleCache for MemoryRoleCache {
    fn load(&self) -> Option<Role> {
        *self.role.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, role: Role) {
        *self.role.lock().unwrap_or_else(PoisonError::into_inner) = Some(role);
    }

    fn clear(&self) {
        *self.role.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ---------------------------------------------------------------------------
// FileRoleCache
// ---------------------------------------------------------------------------

/// A cache backed by one small file holding the role's wire name.
///
/// The desktop counterpart of browser local storage: one key, one value.
#[derive(Debug, Clone)]
pub struct FileRoleCache {
    path: PathBuf,
}

impl FileRoleCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RoleCache for FileRoleCache {
    fn load(&self) -> Option<Role> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "role cache unreadable");
                return None;
            }
        };
        match contents.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring invalid cached role"
                );
                None
            }
        }
    }

    fn store(&self, role: Role) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(
                        path = %parent.display(),
                        error = %e,
                        "cannot create role cache directory"
                    );
                    return;
                }
            }
        }
        if let Err(e) = fs::write(&self.path, role.as_str()) {
            tracing::warn!(path = %self.path.display(), error = %e, "cannot write role cache");
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot clear role cache");
            }
        }
    }
}
