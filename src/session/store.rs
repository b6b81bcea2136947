//! Shared, persisted session state.
//!
//! The presentation layer is the only writer. Controllers call `snapshot()` at
//! the top of each tick and work from that copy.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use super::anchors::AnchorRole;
use super::config::{MonitorConfig, SessionConfig, WatchItem};
use super::types::Coordinate;

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionConfig>>,
    /// Held from mutation through save so the file follows mutation order.
    save_lock: Arc<Mutex<()>>,
    path: Option<Arc<PathBuf>>,
}

impl SessionStore {
    /// A store that saves to `path` after every mutation.
    pub fn new(config: SessionConfig, path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            save_lock: Arc::new(Mutex::new(())),
            path: Some(Arc::new(path.into())),
        }
    }

    /// Loads `path` (falling back to defaults) and persists to it afterwards.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = SessionConfig::load_or_default(&path);
        Self::new(config, path)
    }

    /// A store that never touches the filesystem.
    pub fn in_memory(config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            save_lock: Arc::new(Mutex::new(())),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    /// Clone of the current document.
    pub fn snapshot(&self) -> SessionConfig {
        self.read().clone()
    }

    pub fn update_anchor(&self, role: AnchorRole, coordinate: Coordinate) -> Result<()> {
        info!("Anchor {} set to {}", role.key(), coordinate);
        self.update(|config| config.anchors.set(role, coordinate))
    }

    pub fn clear_anchor(&self, role: AnchorRole) -> Result<()> {
        self.update(|config| config.anchors.clear(role))
    }

    /// Adds an item, replacing any item of the same name.
    pub fn upsert_item(&self, item: WatchItem) -> Result<()> {
        info!(
            "Watch item '{}' at {} (threshold {})",
            item.name, item.coordinate, item.threshold
        );
        self.update(|config| config.mode_one.upsert(item))
    }

    /// Removes an item by name. Returns whether it existed.
    pub fn remove_item(&self, name: &str) -> Result<bool> {
        let mut removed = false;
        self.update(|config| removed = config.mode_one.remove(name))?;
        Ok(removed)
    }

    pub fn set_item_active(&self, name: &str, active: bool) -> Result<bool> {
        let mut found = false;
        self.update(|config| {
            if let Some(item) = config.mode_one.items.iter_mut().find(|i| i.name == name) {
                item.active = active;
                found = true;
            }
        })?;
        Ok(found)
    }

    pub fn update_mode_two(&self, f: impl FnOnce(&mut MonitorConfig)) -> Result<()> {
        self.update(|config| f(&mut config.mode_two))
    }

    /// Applies `f` under the write lock, then persists.
    ///
    /// Readers only wait for the mutation. Writers are serialized until their
    /// save completes.
    pub fn update(&self, f: impl FnOnce(&mut SessionConfig)) -> Result<()> {
        let _saving = self.lock_save();
        let snapshot = {
            let mut guard = self.write();
            f(&mut guard);
            guard.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, config: &SessionConfig) -> Result<()> {
        match self.path.as_deref() {
            Some(path) => config.save(path).inspect_err(|e| {
                warn!("Failed to save session: {:#}", e);
            }),
            None => Ok(()),
        }
    }

    // Poisoned locks are recovered; mutations are plain field assignments.
    fn read(&self) -> RwLockReadGuard<'_, SessionConfig> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionConfig> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_save(&self) -> MutexGuard<'_, ()> {
        self.save_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
