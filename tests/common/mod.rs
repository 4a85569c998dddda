//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dns_discovery::config::{DiscoveryConfiguration, DiscoverySettings, LiveConfig};
use dns_discovery::discovery::{DiscoveryService, HostLookup, LookupError, PeerAddress};

/// What the scripted lookup answers.
#[derive(Clone)]
#[allow(dead_code)]
pub enum Script {
    Records(Vec<Option<String>>),
    Fail(LookupError),
    Hang,
}

/// A `HostLookup` that answers from a script and counts calls.
pub struct ScriptedLookup {
    script: Mutex<Script>,
    calls: AtomicUsize,
    names: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedLookup {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            names: Mutex::new(Vec::new()),
        })
    }

    pub fn records(items: &[Option<&str>]) -> Arc<Self> {
        Self::new(Script::Records(
            items.iter().map(|r| r.map(str::to_owned)).collect(),
        ))
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostLookup for ScriptedLookup {
    async fn lookup_all(&self, name: &str) -> Result<Vec<Option<String>>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.names.lock().unwrap().push(name.to_string());

        let script = self.script.lock().unwrap().clone();
        match script {
            Script::Records(records) => Ok(records),
            Script::Fail(e) => Err(e),
            Script::Hang => std::future::pending().await,
        }
    }
}

pub fn settings_in(dir: &Path) -> DiscoverySettings {
    DiscoverySettings {
        config_dir: dir.to_path_buf(),
        watch_file: false,
        ..Default::default()
    }
}

pub fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Write the live file, or leave it absent when `contents` is `None`.
pub fn write_config(settings: &DiscoverySettings, contents: Option<&str>) {
    if let Some(contents) = contents {
        fs::write(settings.config_path(), contents).unwrap();
    }
}

/// A fully wired, initialized service on the current runtime.
#[allow(dead_code)]
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub settings: DiscoverySettings,
    pub live: Arc<LiveConfig>,
    pub service: Arc<DiscoveryService>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(
        file: Option<&str>,
        env_pairs: &[(&str, &str)],
        lookup: Arc<ScriptedLookup>,
        own_port: u16,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        write_config(&settings, file);

        let live = Arc::new(LiveConfig::new(&settings).with_env_source(env(env_pairs)));
        live.initialize();

        let configuration = Arc::new(DiscoveryConfiguration::new(
            Arc::clone(&live),
            settings.default_resolution_timeout_secs,
        ));
        let service = Arc::new(DiscoveryService::new(configuration, lookup).unwrap());
        service.init(Some("test-cluster".into()), PeerAddress::new("10.0.0.9", own_port));

        Self {
            dir,
            settings,
            live,
            service,
        }
    }

    pub fn rewrite(&self, contents: &str) {
        fs::write(self.settings.config_path(), contents).unwrap();
    }
}
