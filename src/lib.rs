//! DNS-based cluster peer discovery with live-reloaded parameters.

pub mod config;
pub mod discovery;
pub mod lifecycle;
pub mod observability;

pub use config::{DiscoveryConfiguration, DiscoverySettings, LiveConfig};
pub use discovery::{DiscoveryService, HickoryLookup, PeerAddress};
pub use lifecycle::Shutdown;
