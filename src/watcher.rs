//! Reloads stores when their files change on disk.

use std::collections::HashSet;
use std::sync::Arc;

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::settings::{Settings, StoreKind};

/// Starts watching the data directory. The returned task runs until
/// `shutdown` is cancelled.
pub fn spawn_watcher(
    settings: Arc<Settings>,
    shutdown: CancellationToken,
) -> notify::Result<JoinHandle<()>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        },
        NotifyConfig::default(),
    )?;
    std::fs::create_dir_all(settings.data_dir())?;
    watcher.watch(settings.data_dir(), RecursiveMode::NonRecursive)?;
    tracing::info!(dir = %settings.data_dir().display(), "watching store files");

    Ok(tokio::spawn(async move {
        // dropping the watcher stops the notifications
        let _watcher = watcher;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(Ok(event)) => reload_changed(&settings, &event).await,
                    Some(Err(err)) => tracing::warn!(error = ?err, "store watcher error"),
                    None => break,
                },
            }
        }
        tracing::debug!("store watcher stopped");
    }))
}

/// Stores touched by a filesystem event. Reads and our own temp files are ignored.
pub fn changed_stores(settings: &Settings, event: &Event) -> HashSet<StoreKind> {
    if matches!(event.kind, EventKind::Access(_)) {
        return HashSet::new();
    }
    event
        .paths
        .iter()
        .filter_map(|path| settings.kind_for_path(path))
        .collect()
}

async fn reload_changed(settings: &Settings, event: &Event) {
    for kind in changed_stores(settings, event) {
        if let Err(e) = settings.reload(kind).await {
            tracing::error!(store = %kind, error = %e, "failed to reload store");
        }
    }
}
