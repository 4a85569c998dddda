//! Live, periodically reloaded key/value configuration.
//!
//! # State Machine
//! ```text
//! Uninitialized → Loaded     file read at startup
//! Uninitialized → Disabled   file unreadable; every read uses the environment
//! Loaded → Loaded            each successful reload (swap + diff + notify)
//! ```
//! A failed reload keeps the previous snapshot. `Disabled` is never entered
//! from `Loaded`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::env::{EnvSource, ProcessEnv};
use crate::config::listeners::{ChangeListener, ListenerError, ListenerRegistry};
use crate::config::loader::{load_snapshot, ConfigError};
use crate::config::schema::DiscoverySettings;
use crate::config::snapshot::{ConfigChange, ConfigSnapshot};
use crate::config::watcher::ConfigWatcher;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Where the live configuration stands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigState {
    Uninitialized = 0,
    Loaded = 1,
    Disabled = 2,
}

impl From<u8> for ConfigState {
    fn from(val: u8) -> Self {
        match val {
            1 => ConfigState::Loaded,
            2 => ConfigState::Disabled,
            _ => ConfigState::Uninitialized,
        }
    }
}

/// Owner of the configuration snapshot.
///
/// Readers load the current snapshot lock-free. Only [`LiveConfig::reload`]
/// replaces it, and reloads are serialized.
pub struct LiveConfig {
    path: PathBuf,
    initial_delay: Duration,
    interval: Duration,
    watch_file: bool,
    state: AtomicU8,
    snapshot: ArcSwap<ConfigSnapshot>,
    listeners: ListenerRegistry,
    env: Arc<dyn EnvSource>,
    reload_lock: Mutex<()>,
    shutdown: Shutdown,
}

impl LiveConfig {
    pub fn new(settings: &DiscoverySettings) -> Self {
        Self {
            path: settings.config_path(),
            initial_delay: settings.reload_initial_delay(),
            interval: settings.reload_interval(),
            watch_file: settings.watch_file,
            state: AtomicU8::new(ConfigState::Uninitialized as u8),
            snapshot: ArcSwap::from_pointee(ConfigSnapshot::new()),
            listeners: ListenerRegistry::new(),
            env: Arc::new(ProcessEnv),
            reload_lock: Mutex::new(()),
            shutdown: Shutdown::new(),
        }
    }

    /// Replace the environment used for fallback reads.
    pub fn with_env_source(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ConfigState {
        ConfigState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_enabled(&self) -> bool {
        self.state() == ConfigState::Loaded
    }

    /// Best-effort initial load. Only acts while uninitialized.
    ///
    /// An unreadable file disables the store. A file that is readable but
    /// malformed still counts as loaded, with no values, so that a fixed
    /// file is picked up by the next reload.
    pub fn initialize(&self) -> ConfigState {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.state();
        if current != ConfigState::Uninitialized {
            return current;
        }

        let next = match load_snapshot(&self.path) {
            Ok(snapshot) => {
                tracing::info!(path = ?self.path, keys = snapshot.len(), "Discovery configuration loaded");
                self.snapshot.store(Arc::new(snapshot));
                ConfigState::Loaded
            }
            Err(ConfigError::Io(e)) => {
                tracing::warn!(
                    path = ?self.path,
                    error = %e,
                    "Not able to load configuration file, disabling (assuming environment variables are used)"
                );
                ConfigState::Disabled
            }
            Err(e) => {
                tracing::error!(
                    path = ?self.path,
                    error = %e,
                    "Configuration file is malformed, starting without file values until it is fixed"
                );
                self.snapshot.store(Arc::new(ConfigSnapshot::new()));
                ConfigState::Loaded
            }
        };
        self.state.store(next as u8, Ordering::Release);
        next
    }

    /// Current snapshot. Empty unless loaded.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.snapshot.load_full()
    }

    /// Non-empty value of `property` from the snapshot, if enabled.
    pub fn get(&self, property: &str) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        self.snapshot
            .load()
            .get(property)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    /// Snapshot value, falling back to the non-empty environment variable.
    pub fn get_or_env(&self, property: &str, env_var: &str) -> Option<String> {
        self.get(property)
            .or_else(|| self.env.var(env_var).filter(|v| !v.is_empty()))
    }

    /// Register a closure invoked whenever `property` changes.
    pub fn register_listener<F>(&self, property: &str, listener: F)
    where
        F: Fn(Option<&str>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.listeners.register(property, Arc::new(listener));
    }

    pub fn register_change_listener(&self, property: &str, listener: Arc<dyn ChangeListener>) {
        self.listeners.register(property, listener);
    }

    pub fn listener_count(&self, property: &str) -> usize {
        self.listeners.count(property)
    }

    /// Re-read the file, swap the snapshot in and notify listeners.
    ///
    /// On failure the previous snapshot is kept and nothing is notified.
    /// Listeners run after the reload lock is released and may call back
    /// into this `LiveConfig`.
    pub fn reload(&self) -> Result<Vec<ConfigChange>, ConfigError> {
        let changes = {
            let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

            if !self.is_enabled() {
                return Err(ConfigError::Disabled);
            }

            let fresh = match load_snapshot(&self.path) {
                Ok(snapshot) => Arc::new(snapshot),
                Err(e) => {
                    tracing::debug!(path = ?self.path, error = %e, "Not able to reload configuration file");
                    metrics::record_reload("failed");
                    return Err(e);
                }
            };

            let previous = self.snapshot.swap(fresh.clone());
            previous.diff(&fresh)
        };
        metrics::record_reload("applied");

        for change in &changes {
            tracing::debug!(
                key = %change.key,
                old = ?change.old,
                new = ?change.new,
                kind = change.kind().as_str(),
                "Discovery configuration value changed"
            );
            metrics::record_config_change(change.kind().as_str());
            self.listeners.notify(&change.key, change.new.as_deref());
        }

        Ok(changes)
    }

    /// Initialize if needed and spawn the reload task.
    ///
    /// Returns `None` when the file could not be read (no reloads in
    /// disabled mode) or when [`LiveConfig::stop`] was already called.
    /// Must be called from inside a Tokio runtime.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.initialize() != ConfigState::Loaded || self.shutdown.is_triggered() {
            return None;
        }

        let (watcher, nudges) = if self.watch_file {
            let (watcher, nudges) = ConfigWatcher::new(&self.path);
            match watcher.run() {
                Ok(handle) => (Some(handle), Some(nudges)),
                Err(e) => {
                    tracing::warn!(path = ?self.path, error = %e, "Config watcher unavailable, relying on periodic reload");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let shutdown = self.shutdown.subscribe();
        let live = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _watcher = watcher;
            live.run_reload_loop(nudges, shutdown).await;
        }))
    }

    /// Stop the reload task. Idempotent.
    pub fn stop(&self) {
        if self.shutdown.trigger() {
            tracing::debug!(path = ?self.path, "Configuration reload stopping");
        }
    }

    async fn run_reload_loop(
        self: Arc<Self>,
        mut nudges: Option<mpsc::UnboundedReceiver<()>>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(
            initial_delay_secs = self.initial_delay.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Configuration reload scheduled"
        );

        let mut ticker = time::interval_at(Instant::now() + self.initial_delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // nudges only count once the initial delay has passed
        let mut armed = false;

        loop {
            if self.shutdown.is_triggered() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    armed = true;
                    drain_nudges(&mut nudges);
                    self.reload_off_runtime().await;
                }
                Some(()) = next_nudge(&mut nudges), if armed => {
                    self.reload_off_runtime().await;
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }
        tracing::info!("Configuration reload stopped");
    }

    /// Run [`LiveConfig::reload`] on the blocking pool.
    async fn reload_off_runtime(self: &Arc<Self>) {
        let live = Arc::clone(self);
        if let Err(e) = tokio::task::spawn_blocking(move || live.reload()).await {
            tracing::error!(path = ?self.path, error = %e, "Configuration reload task failed");
        }
    }
}

/// Drop nudges that arrived before the reload about to run.
fn drain_nudges(nudges: &mut Option<mpsc::UnboundedReceiver<()>>) {
    if let Some(rx) = nudges {
        while rx.try_recv().is_ok() {}
    }
}

/// Next watcher nudge. Pends forever once the watcher is gone.
async fn next_nudge(nudges: &mut Option<mpsc::UnboundedReceiver<()>>) -> Option<()> {
    match nudges {
        Some(rx) => match rx.recv().await {
            Some(()) => Some(()),
            None => {
                *nudges = None;
                std::future::pending().await
            }
        },
        None => std::future::pending().await,
    }
}

impl std::fmt::Debug for LiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConfig")
            .field("path", &self.path)
            .field("state", &self.state())
            .field("keys", &self.snapshot.load().len())
            .field("listeners", &self.listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex as StdMutex;

    fn settings_in(dir: &Path) -> DiscoverySettings {
        DiscoverySettings {
            config_dir: dir.to_path_buf(),
            watch_file: false,
            ..Default::default()
        }
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_file_disables_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let live = LiveConfig::new(&settings_in(dir.path()))
            .with_env_source(env(&[("DNS_DISCOVERY_ADDRESS", "from-env.internal")]));

        assert_eq!(live.state(), ConfigState::Uninitialized);
        assert_eq!(live.initialize(), ConfigState::Disabled);
        assert_eq!(live.get("discoveryAddress"), None);
        assert_eq!(
            live.get_or_env("discoveryAddress", "DNS_DISCOVERY_ADDRESS").as_deref(),
            Some("from-env.internal")
        );
        assert!(matches!(live.reload(), Err(ConfigError::Disabled)));
    }

    #[test]
    fn test_disabled_state_is_sticky_after_file_appears() {
        let dir = tempfile::tempdir().unwrap();
        let live = LiveConfig::new(&settings_in(dir.path()));
        live.initialize();

        fs::write(live.path(), "discoveryAddress = \"late.internal\"\n").unwrap();
        assert_eq!(live.initialize(), ConfigState::Disabled);
        assert_eq!(live.get("discoveryAddress"), None);
    }

    #[test]
    fn test_empty_file_value_falls_back_to_env() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::write(settings.config_path(), "discoveryAddress = \"\"\n").unwrap();

        let live = LiveConfig::new(&settings)
            .with_env_source(env(&[("DNS_DISCOVERY_ADDRESS", "from-env.internal")]));
        assert_eq!(live.initialize(), ConfigState::Loaded);

        assert_eq!(live.get("discoveryAddress"), None);
        assert_eq!(
            live.get_or_env("discoveryAddress", "DNS_DISCOVERY_ADDRESS").as_deref(),
            Some("from-env.internal")
        );
    }

    #[test]
    fn test_file_value_wins_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::write(settings.config_path(), "discoveryAddress = \"from-file.internal\"\n").unwrap();

        let live = LiveConfig::new(&settings)
            .with_env_source(env(&[("DNS_DISCOVERY_ADDRESS", "from-env.internal")]));
        live.initialize();

        assert_eq!(
            live.get_or_env("discoveryAddress", "DNS_DISCOVERY_ADDRESS").as_deref(),
            Some("from-file.internal")
        );
    }

    #[test]
    fn test_reload_notifies_only_changed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::write(
            settings.config_path(),
            "discoveryAddress = \"cluster.internal\"\nresolutionTimeout = 30\n",
        )
        .unwrap();

        let live = LiveConfig::new(&settings);
        live.initialize();

        let timeouts = Arc::new(StdMutex::new(Vec::new()));
        let addresses = Arc::new(StdMutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = timeouts.clone();
            live.register_listener("resolutionTimeout", move |v| {
                seen.lock().unwrap().push(v.map(str::to_owned));
                Ok(())
            });
        }
        let seen = addresses.clone();
        live.register_listener("discoveryAddress", move |v| {
            seen.lock().unwrap().push(v.map(str::to_owned));
            Ok(())
        });

        fs::write(
            settings.config_path(),
            "discoveryAddress = \"cluster.internal\"\nresolutionTimeout = 45\n",
        )
        .unwrap();
        let changes = live.reload().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(
            *timeouts.lock().unwrap(),
            vec![Some("45".to_string()), Some("45".to_string())]
        );
        assert!(addresses.lock().unwrap().is_empty());
        assert_eq!(live.get("resolutionTimeout").as_deref(), Some("45"));
    }

    #[test]
    fn test_failed_reload_keeps_last_good_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::write(settings.config_path(), "discoveryAddress = \"cluster.internal\"\n").unwrap();

        let live = LiveConfig::new(&settings);
        live.initialize();

        fs::write(settings.config_path(), "discoveryAddress = ").unwrap();
        assert!(matches!(live.reload(), Err(ConfigError::Parse(_))));

        fs::remove_file(settings.config_path()).unwrap();
        assert!(matches!(live.reload(), Err(ConfigError::Io(_))));

        assert_eq!(live.state(), ConfigState::Loaded);
        assert_eq!(live.get("discoveryAddress").as_deref(), Some("cluster.internal"));
    }

    #[test]
    fn test_malformed_file_at_startup_stays_reloadable() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::write(
            settings.config_path(),
            "discoveryAddress = \"cluster.internal\"\nresolutionTimeout = abc\n",
        )
        .unwrap();

        let live = LiveConfig::new(&settings);
        assert_eq!(live.initialize(), ConfigState::Loaded);
        assert!(live.snapshot().is_empty());
        assert_eq!(live.get("discoveryAddress"), None);

        fs::write(
            settings.config_path(),
            "discoveryAddress = \"cluster.internal\"\nresolutionTimeout = 45\n",
        )
        .unwrap();
        let changes = live.reload().unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!(live.get("discoveryAddress").as_deref(), Some("cluster.internal"));
        assert_eq!(live.get("resolutionTimeout").as_deref(), Some("45"));
    }

    #[test]
    fn test_listener_may_reload_from_notify() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::write(settings.config_path(), "resolutionTimeout = 30\n").unwrap();

        let live = Arc::new(LiveConfig::new(&settings));
        live.initialize();

        let nested = Arc::new(StdMutex::new(Vec::new()));
        let (reloader, sink) = (Arc::downgrade(&live), nested.clone());
        live.register_listener("resolutionTimeout", move |_| {
            if let Some(live) = reloader.upgrade() {
                let changes = live.reload()?;
                sink.lock().unwrap().push(changes.len());
            }
            Ok(())
        });

        fs::write(settings.config_path(), "resolutionTimeout = 45\n").unwrap();
        let changes = live.reload().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(*nested.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_listener_may_read_config_during_notify() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::write(settings.config_path(), "resolutionTimeout = 30\n").unwrap();

        let live = Arc::new(LiveConfig::new(&settings));
        live.initialize();

        let observed = Arc::new(StdMutex::new(None));
        let (reader, slot) = (Arc::downgrade(&live), observed.clone());
        live.register_listener("resolutionTimeout", move |_| {
            if let Some(live) = reader.upgrade() {
                *slot.lock().unwrap() = live.get("resolutionTimeout");
            }
            Ok(())
        });

        fs::write(settings.config_path(), "resolutionTimeout = 45\n").unwrap();
        live.reload().unwrap();

        assert_eq!(observed.lock().unwrap().as_deref(), Some("45"));
    }

    #[tokio::test]
    async fn test_start_is_a_no_op_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let live = Arc::new(LiveConfig::new(&settings_in(dir.path())));
        assert!(live.start().is_none());
        assert_eq!(live.state(), ConfigState::Disabled);
    }

    #[tokio::test]
    async fn test_start_after_stop_does_not_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        fs::write(settings.config_path(), "resolutionTimeout = 30\n").unwrap();

        let live = Arc::new(LiveConfig::new(&settings));
        live.stop();
        live.stop();
        assert!(live.start().is_none());
    }
}
