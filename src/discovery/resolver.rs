//! Single-shot peer resolution under a time budget.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::discovery::address::PeerAddress;
use crate::discovery::lookup::HostLookup;
use crate::observability::metrics;

/// How a resolution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The lookup answered within budget.
    Resolved {
        accepted: usize,
        /// Null or non-IP records that were dropped.
        rejected: usize,
    },
    /// No name given; no lookup was made.
    EmptyName,
    Failed(String),
    TimedOut(Duration),
}

impl ResolutionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ResolutionOutcome::Failed(_) | ResolutionOutcome::TimedOut(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResolutionOutcome::Resolved { .. } => "resolved",
            ResolutionOutcome::EmptyName => "empty_name",
            ResolutionOutcome::Failed(_) => "failed",
            ResolutionOutcome::TimedOut(_) => "timed_out",
        }
    }
}

/// Turns a DNS name into validated peer addresses.
///
/// Holds no per-call state, so one instance serves concurrent calls.
#[derive(Clone)]
pub struct AddressResolver {
    lookup: Arc<dyn HostLookup>,
}

impl AddressResolver {
    pub fn new(lookup: Arc<dyn HostLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve `name` and pair every address with `own_port`.
    ///
    /// Response order is kept and duplicates pass through. Failures and
    /// timeouts produce an empty list; they are logged, never returned as
    /// errors.
    pub async fn resolve(
        &self,
        name: &str,
        timeout_secs: u64,
        own_port: u16,
    ) -> (Vec<PeerAddress>, ResolutionOutcome) {
        let name = name.trim();
        if name.is_empty() {
            return (Vec::new(), ResolutionOutcome::EmptyName);
        }

        let budget = Duration::from_secs(timeout_secs.max(1));
        let started = Instant::now();
        let result = time::timeout(budget, self.lookup.lookup_all(name)).await;
        metrics::record_resolution_duration(started.elapsed());

        match result {
            Ok(Ok(records)) => {
                let total = records.len();
                let peers: Vec<PeerAddress> = records
                    .into_iter()
                    .flatten()
                    .filter_map(|text| parse_ip(&text))
                    .map(|ip| PeerAddress::new(ip.to_string(), own_port))
                    .collect();

                for peer in &peers {
                    tracing::trace!(host = %peer.host, "Found address");
                }

                let accepted = peers.len();
                (
                    peers,
                    ResolutionOutcome::Resolved {
                        accepted,
                        rejected: total - accepted,
                    },
                )
            }
            Ok(Err(e)) => {
                tracing::warn!(address = %name, error = %e, "Failed to resolve DNS record");
                (Vec::new(), ResolutionOutcome::Failed(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(
                    address = %name,
                    timeout_secs = budget.as_secs(),
                    "Failed to resolve DNS record, error: timed out"
                );
                (Vec::new(), ResolutionOutcome::TimedOut(budget))
            }
        }
    }
}

impl std::fmt::Debug for AddressResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressResolver").finish_non_exhaustive()
    }
}

/// Strict IPv4/IPv6 literal check on a record's text.
fn parse_ip(text: &str) -> Option<IpAddr> {
    text.trim().parse::<IpAddr>().ok()
}
