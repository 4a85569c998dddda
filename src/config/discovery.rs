//! Typed view of the discovery properties.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::config::live::LiveConfig;
use crate::config::schema::{
    DISCOVERY_ADDRESS_ENV, DISCOVERY_ADDRESS_PROPERTY, DISCOVERY_TIMEOUT_ENV,
    RESOLUTION_TIMEOUT_PROPERTY,
};

/// Parameters for one discovery round, read fresh each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryParameters {
    /// DNS name to resolve. `None` means discovery is not configured.
    pub discovery_name: Option<String>,
    /// Resolution budget in seconds. Always positive.
    pub timeout_secs: u64,
}

/// Told when a discovery property changed so the host may rebuild state.
pub trait RestartListener: Send + Sync {
    fn restart(&self);
}

impl<F> RestartListener for F
where
    F: Fn() + Send + Sync,
{
    fn restart(&self) {
        self()
    }
}

type RestartSlot = ArcSwapOption<Box<dyn RestartListener>>;

/// Read-through access to `discoveryAddress` and `resolutionTimeout`.
///
/// Precedence per property: live file, then environment, then default.
pub struct DiscoveryConfiguration {
    live: Arc<LiveConfig>,
    default_timeout_secs: u64,
    restart: Arc<RestartSlot>,
}

impl DiscoveryConfiguration {
    /// Wrap `live` and subscribe to both discovery properties.
    pub fn new(live: Arc<LiveConfig>, default_timeout_secs: u64) -> Self {
        let restart: Arc<RestartSlot> = Arc::new(ArcSwapOption::empty());

        for property in [DISCOVERY_ADDRESS_PROPERTY, RESOLUTION_TIMEOUT_PROPERTY] {
            let slot = Arc::clone(&restart);
            live.register_listener(property, move |_| {
                if let Some(listener) = slot.load_full() {
                    listener.restart();
                }
                Ok(())
            });
        }

        Self {
            live,
            default_timeout_secs: default_timeout_secs.max(1),
            restart,
        }
    }

    pub fn live(&self) -> &Arc<LiveConfig> {
        &self.live
    }

    /// Install the restart listener, replacing any previous one.
    pub fn set_restart_listener(&self, listener: impl RestartListener + 'static) {
        let listener: Box<dyn RestartListener> = Box::new(listener);
        self.restart.store(Some(Arc::new(listener)));
    }

    pub fn clear_restart_listener(&self) {
        self.restart.store(None);
    }

    /// The DNS name to resolve, or `None` (logged) when configured nowhere.
    pub fn discovery_address(&self) -> Option<String> {
        let address = self
            .live
            .get_or_env(DISCOVERY_ADDRESS_PROPERTY, DISCOVERY_ADDRESS_ENV)
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        if address.is_none() {
            tracing::error!("No discovery address was set in the configuration file or environment variable");
        }
        address
    }

    /// Resolution timeout in seconds; the default when unset or malformed.
    pub fn resolution_timeout(&self) -> u64 {
        let Some(raw) = self
            .live
            .get_or_env(RESOLUTION_TIMEOUT_PROPERTY, DISCOVERY_TIMEOUT_ENV)
        else {
            tracing::warn!(
                default = self.default_timeout_secs,
                "No DNS resolution timeout configured in configuration file or environment variable, using default"
            );
            return self.default_timeout_secs;
        };

        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                tracing::error!(
                    value = %raw,
                    default = self.default_timeout_secs,
                    "Invalid format for DNS discovery property resolutionTimeout, using default"
                );
                self.default_timeout_secs
            }
        }
    }

    pub fn parameters(&self) -> DiscoveryParameters {
        DiscoveryParameters {
            discovery_name: self.discovery_address(),
            timeout_secs: self.resolution_timeout(),
        }
    }
}

impl std::fmt::Debug for DiscoveryConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryConfiguration")
            .field("live", &self.live)
            .field("default_timeout_secs", &self.default_timeout_secs)
            .field("has_restart_listener", &self.restart.load().is_some())
            .finish()
    }
}
