//! Discovery service: the surface the cluster layer calls.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::DiscoveryConfiguration;
use crate::discovery::address::PeerAddress;
use crate::discovery::lookup::HostLookup;
use crate::discovery::resolver::AddressResolver;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no Tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

/// Identity the host hands over before the first round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub cluster_id: Option<String>,
    pub own_address: PeerAddress,
}

/// Resolves the current peer set on request.
///
/// Every round reads its parameters fresh, so a configuration change takes
/// effect on the next round. "Not configured", "failed" and "timed out" all
/// come back as an empty list.
pub struct DiscoveryService {
    configuration: Arc<DiscoveryConfiguration>,
    resolver: ArcSwapOption<AddressResolver>,
    identity: ArcSwapOption<NodeIdentity>,
    runtime: Handle,
}

impl DiscoveryService {
    /// Build a service that spawns rounds on the current Tokio runtime.
    pub fn new(
        configuration: Arc<DiscoveryConfiguration>,
        lookup: Arc<dyn HostLookup>,
    ) -> Result<Self, DiscoveryError> {
        Ok(Self::with_runtime(configuration, lookup, Handle::try_current()?))
    }

    pub fn with_runtime(
        configuration: Arc<DiscoveryConfiguration>,
        lookup: Arc<dyn HostLookup>,
        runtime: Handle,
    ) -> Self {
        Self {
            configuration,
            resolver: ArcSwapOption::from_pointee(AddressResolver::new(lookup)),
            identity: ArcSwapOption::empty(),
            runtime,
        }
    }

    /// Record this node's identity. Later calls replace it.
    pub fn init(&self, cluster_id: Option<String>, own_address: PeerAddress) {
        tracing::info!(
            cluster_id = ?cluster_id,
            own_address = %own_address,
            "DNS discovery initialized"
        );
        self.identity.store(Some(Arc::new(NodeIdentity {
            cluster_id,
            own_address,
        })));
    }

    pub fn identity(&self) -> Option<Arc<NodeIdentity>> {
        self.identity.load_full()
    }

    pub fn configuration(&self) -> &Arc<DiscoveryConfiguration> {
        &self.configuration
    }

    /// Start a discovery round without blocking the caller.
    pub fn discover_peers(self: &Arc<Self>) -> JoinHandle<Vec<PeerAddress>> {
        let service = Arc::clone(self);
        self.runtime
            .spawn(async move { service.resolve_peers().await })
    }

    /// Run one discovery round.
    pub async fn resolve_peers(&self) -> Vec<PeerAddress> {
        let params = self.configuration.parameters();

        let Some(name) = params.discovery_name else {
            metrics::record_round("empty_name", 0);
            return Vec::new();
        };

        let Some(resolver) = self.resolver.load_full() else {
            tracing::debug!(address = %name, "DNS discovery torn down, skipping resolution");
            metrics::record_round("torn_down", 0);
            return Vec::new();
        };

        let Some(identity) = self.identity.load_full() else {
            tracing::error!(address = %name, "DNS discovery used before init, own port unknown");
            metrics::record_round("not_initialized", 0);
            return Vec::new();
        };

        let (peers, outcome) = resolver
            .resolve(&name, params.timeout_secs, identity.own_address.port)
            .await;

        tracing::debug!(
            address = %name,
            peers = peers.len(),
            outcome = outcome.label(),
            "DNS discovery round finished"
        );
        metrics::record_round(outcome.label(), peers.len());
        peers
    }

    /// Release the shared resolver. Idempotent.
    ///
    /// Rounds already past the resolver check finish against their own
    /// timeout; later rounds return an empty list.
    pub fn teardown(&self) {
        if self.resolver.swap(None).is_some() {
            tracing::info!("DNS discovery resolver released");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.resolver.load().is_none()
    }
}

impl Drop for DiscoveryService {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for DiscoveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryService")
            .field("identity", &self.identity.load_full())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}
