//! Configuration file watcher for early reloads.
//!
//! The watcher never loads anything itself. It sends a nudge into the
//! reload task, which keeps reloads serialized with the timer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A watcher that monitors the live configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    nudge_tx: mpsc::UnboundedSender<()>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver that yields one item per relevant
    /// file system event.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (nudge_tx, nudge_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                nudge_tx,
            },
            nudge_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    ///
    /// The parent directory is watched rather than the file, so editors that
    /// replace the file on save are still seen.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.nudge_tx.clone();
        let path = self.path.clone();
        let dir = watch_root(&self.path);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_relevant(&event, &path) {
                        tracing::debug!(path = ?path, kind = ?event.kind, "Config file change detected");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn watch_root(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether `event` touches `path` in a way that warrants a reload.
fn is_relevant(event: &Event, path: &Path) -> bool {
    let kind_matches =
        event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove();
    let file_name = path.file_name();

    kind_matches
        && event
            .paths
            .iter()
            .any(|p| p == path || (file_name.is_some() && p.file_name() == file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, EventKind, ModifyKind};

    #[test]
    fn test_modify_of_watched_file_is_relevant() {
        let path = Path::new("/etc/broker/dnsdiscovery.toml");
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/etc/broker/dnsdiscovery.toml"));
        assert!(is_relevant(&event, path));
    }

    #[test]
    fn test_sibling_files_are_ignored() {
        let path = Path::new("/etc/broker/dnsdiscovery.toml");
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/etc/broker/other.toml"));
        assert!(!is_relevant(&event, path));
    }

    #[test]
    fn test_access_events_are_ignored() {
        let path = Path::new("/etc/broker/dnsdiscovery.toml");
        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(path.to_path_buf());
        assert!(!is_relevant(&event, path));
    }

    #[test]
    fn test_bare_file_name_watches_current_dir() {
        assert_eq!(watch_root(Path::new("dnsdiscovery.toml")), PathBuf::from("."));
        assert_eq!(watch_root(Path::new("/etc/x.toml")), PathBuf::from("/etc"));
    }
}
