//! Process-wide config state: the three stores, each an `Arc` snapshot that
//! is swapped wholesale, plus a broadcast of "config changed" events.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

use crate::changeset::{ChangeSet, apply_and_persist};
use crate::config::files;
use crate::config_store::{ConfigStore, StoreShape};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Credentials,
    EngineIds,
    Domains,
}

impl StoreKind {
    pub const ALL: [StoreKind; 3] = [StoreKind::Credentials, StoreKind::EngineIds, StoreKind::Domains];

    pub fn shape(&self) -> StoreShape {
        match self {
            StoreKind::Credentials | StoreKind::EngineIds => StoreShape::Mapping,
            StoreKind::Domains => StoreShape::List,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            StoreKind::Credentials => files::API_KEYS,
            StoreKind::EngineIds => files::SEARCH_ENGINES,
            StoreKind::Domains => files::PROXIED_DOMAINS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Credentials => "credentials",
            StoreKind::EngineIds => "engine_ids",
            StoreKind::Domains => "domains",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credentials" | "api_keys" => Ok(StoreKind::Credentials),
            "engine_ids" | "engines" | "search_engines" => Ok(StoreKind::EngineIds),
            "domains" | "proxied_domains" => Ok(StoreKind::Domains),
            other => Err(ConfigError::UnknownStore(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "store", rename_all = "snake_case")]
pub enum ConfigEvent {
    /// A changeset was applied and written.
    Updated(StoreKind),
    /// The store was re-read from disk.
    Reloaded(StoreKind),
}

impl ConfigEvent {
    pub fn kind(&self) -> StoreKind {
        match self {
            ConfigEvent::Updated(kind) | ConfigEvent::Reloaded(kind) => *kind,
        }
    }
}

/// One file-backed store.
pub struct StoreHandle {
    kind: StoreKind,
    path: PathBuf,
    current: RwLock<Arc<ConfigStore>>,
    // held across read-modify-write so applies and reloads never interleave
    writer: Mutex<()>,
}

impl StoreHandle {
    pub fn open(kind: StoreKind, path: PathBuf) -> Result<StoreHandle, ConfigError> {
        let store = ConfigStore::load(&path, kind.shape())?;
        tracing::info!(store = %kind, entries = store.len(), path = %path.display(), "loaded store");
        Ok(StoreHandle {
            kind,
            path,
            current: RwLock::new(Arc::new(store)),
            writer: Mutex::new(()),
        })
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current contents. Later updates never change a snapshot already handed out.
    pub fn snapshot(&self) -> Arc<ConfigStore> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, store: ConfigStore) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(store);
    }

    /// Applies a changeset and persists it. Returns whether anything was written.
    pub async fn apply(&self, changeset: &ChangeSet) -> Result<bool, ConfigError> {
        let _guard = self.writer.lock().await;
        let current = self.snapshot();
        match apply_and_persist(&current, changeset, &self.path)? {
            Some(next) => {
                tracing::info!(store = %self.kind, entries = next.len(), "applied changeset");
                self.replace(next);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn reload(&self) -> Result<(), ConfigError> {
        let _guard = self.writer.lock().await;
        let store = ConfigStore::load(&self.path, self.kind.shape())?;
        tracing::info!(store = %self.kind, entries = store.len(), "reloaded store");
        self.replace(store);
        Ok(())
    }
}

pub struct Settings {
    data_dir: PathBuf,
    credentials: StoreHandle,
    engine_ids: StoreHandle,
    domains: StoreHandle,
    events: broadcast::Sender<ConfigEvent>,
}

impl Settings {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Settings, ConfigError> {
        let data_dir = data_dir.into();
        let open = |kind: StoreKind| StoreHandle::open(kind, data_dir.join(kind.file_name()));
        let credentials = open(StoreKind::Credentials)?;
        let engine_ids = open(StoreKind::EngineIds)?;
        let domains = open(StoreKind::Domains)?;
        let (events, _) = broadcast::channel(64);
        Ok(Settings {
            data_dir,
            credentials,
            engine_ids,
            domains,
            events,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Fails when any store file is absent. Only used at startup when the
    /// operator asks for it; at runtime a missing file is an empty store.
    pub fn require_all(&self) -> Result<(), ConfigError> {
        for kind in StoreKind::ALL {
            let path = self.store(kind).path();
            if !path.exists() {
                return Err(ConfigError::MissingStore(path.to_path_buf()));
            }
        }
        Ok(())
    }

    pub fn store(&self, kind: StoreKind) -> &StoreHandle {
        match kind {
            StoreKind::Credentials => &self.credentials,
            StoreKind::EngineIds => &self.engine_ids,
            StoreKind::Domains => &self.domains,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.events.subscribe()
    }

    /// Which store, if any, is backed by `path`.
    pub fn kind_for_path(&self, path: &Path) -> Option<StoreKind> {
        let file_name = path.file_name()?;
        StoreKind::ALL
            .into_iter()
            .find(|kind| file_name == kind.file_name())
    }

    pub async fn update(&self, kind: StoreKind, changeset: &ChangeSet) -> Result<bool, ConfigError> {
        let changed = self.store(kind).apply(changeset).await?;
        if changed {
            self.publish(ConfigEvent::Updated(kind));
        }
        Ok(changed)
    }

    pub async fn reload(&self, kind: StoreKind) -> Result<(), ConfigError> {
        self.store(kind).reload().await?;
        self.publish(ConfigEvent::Reloaded(kind));
        Ok(())
    }

    pub async fn reload_all(&self) -> Result<(), ConfigError> {
        for kind in StoreKind::ALL {
            self.reload(kind).await?;
        }
        Ok(())
    }

    fn publish(&self, event: ConfigEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Calls `on_event` for every event until the channel closes. A receiver that
/// falls behind skips the overwritten events and keeps listening.
pub async fn for_each_event(
    mut events: broadcast::Receiver<ConfigEvent>,
    mut on_event: impl FnMut(ConfigEvent),
) {
    loop {
        match events.recv().await {
            Ok(event) => on_event(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "config event listener fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
