//! Configuration schema definitions.
//!
//! Two layers of configuration exist:
//! - [`DiscoverySettings`]: host-side settings fixed at startup (where the
//!   live file lives, how often it is reloaded).
//! - The live discovery properties inside that file, addressed by the
//!   `*_PROPERTY` keys below and read through `LiveConfig`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Property holding the DNS name to resolve.
pub const DISCOVERY_ADDRESS_PROPERTY: &str = "discoveryAddress";

/// Property holding the resolution budget in whole seconds.
pub const RESOLUTION_TIMEOUT_PROPERTY: &str = "resolutionTimeout";

/// Environment fallback for [`DISCOVERY_ADDRESS_PROPERTY`].
pub const DISCOVERY_ADDRESS_ENV: &str = "DNS_DISCOVERY_ADDRESS";

/// Environment fallback for [`RESOLUTION_TIMEOUT_PROPERTY`].
pub const DISCOVERY_TIMEOUT_ENV: &str = "DNS_DISCOVERY_TIMEOUT";

/// How long a resolution may take when nothing else is configured.
pub const DEFAULT_RESOLUTION_TIMEOUT_SECS: u64 = 30;

/// Host-side settings for the discovery subsystem.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Directory holding the live configuration file.
    pub config_dir: PathBuf,

    /// File name of the live configuration file inside `config_dir`.
    pub file_name: String,

    /// Delay before the first reload after a successful initial load.
    pub reload_initial_delay_secs: u64,

    /// Period between reloads.
    pub reload_interval_secs: u64,

    /// Reload early when the file system reports a change to the file.
    pub watch_file: bool,

    /// Resolution timeout used when neither file nor environment has one.
    pub default_resolution_timeout_secs: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("conf"),
            file_name: "dnsdiscovery.toml".to_string(),
            reload_initial_delay_secs: 10,
            reload_interval_secs: 3,
            watch_file: true,
            default_resolution_timeout_secs: DEFAULT_RESOLUTION_TIMEOUT_SECS,
        }
    }
}

impl DiscoverySettings {
    /// Full path of the live configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(&self.file_name)
    }

    pub fn reload_initial_delay(&self) -> Duration {
        Duration::from_secs(self.reload_initial_delay_secs)
    }

    /// Reload period. Never zero.
    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_schedule() {
        let settings = DiscoverySettings::default();
        assert_eq!(settings.reload_initial_delay(), Duration::from_secs(10));
        assert_eq!(settings.reload_interval(), Duration::from_secs(3));
        assert_eq!(settings.default_resolution_timeout_secs, 30);
        assert_eq!(settings.config_path(), PathBuf::from("conf/dnsdiscovery.toml"));
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: DiscoverySettings = toml::from_str(
            r#"
            config_dir = "/etc/broker"
            reload_interval_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.config_path(), PathBuf::from("/etc/broker/dnsdiscovery.toml"));
        assert_eq!(settings.reload_interval(), Duration::from_secs(5));
        assert_eq!(settings.reload_initial_delay_secs, 10);
        assert!(settings.watch_file);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let settings = DiscoverySettings {
            reload_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.reload_interval(), Duration::from_secs(1));
    }
}
