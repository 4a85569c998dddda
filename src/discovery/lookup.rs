//! DNS lookup seam.
//!
//! [`HostLookup`] returns the raw textual record data for a name; the
//! resolver decides what is a usable address. [`HickoryLookup`] is the
//! production implementation.

use async_trait::async_trait;
use hickory_resolver::config::{LookupIpStrategy, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// The name exists nowhere, or has no address records.
    #[error("no address records found for {0}")]
    NoRecords(String),

    #[error("{0}")]
    Resolve(String),
}

impl From<ResolveError> for LookupError {
    fn from(e: ResolveError) -> Self {
        match e.kind() {
            ResolveErrorKind::NoRecordsFound { query, .. } => {
                LookupError::NoRecords(query.name().to_string())
            }
            _ => LookupError::Resolve(e.to_string()),
        }
    }
}

/// A multi-record address lookup.
#[async_trait]
pub trait HostLookup: Send + Sync {
    /// Textual data of every address record for `name`, in response order.
    ///
    /// `None` marks a record that carried no data.
    async fn lookup_all(&self, name: &str) -> Result<Vec<Option<String>>, LookupError>;
}

/// Lookup through hickory-dns.
///
/// Holds the resolver configuration for the lifetime of the process. Each
/// lookup builds its own resolver handle, dropped when the lookup finishes
/// or its future is abandoned on timeout.
#[derive(Debug, Clone)]
pub struct HickoryLookup {
    config: ResolverConfig,
    opts: ResolverOpts,
}

impl HickoryLookup {
    pub fn new(config: ResolverConfig, mut opts: ResolverOpts) -> Self {
        opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        Self { config, opts }
    }

    /// Use the host's resolver configuration, or public defaults when it
    /// cannot be read.
    pub fn from_system_conf() -> Self {
        match hickory_resolver::system_conf::read_system_conf() {
            Ok((config, opts)) => Self::new(config, opts),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read system resolver configuration, using defaults");
                Self::new(ResolverConfig::default(), ResolverOpts::default())
            }
        }
    }
}

#[async_trait]
impl HostLookup for HickoryLookup {
    async fn lookup_all(&self, name: &str) -> Result<Vec<Option<String>>, LookupError> {
        let resolver = TokioAsyncResolver::tokio(self.config.clone(), self.opts.clone());
        let response = resolver.lookup_ip(name).await?;

        Ok(response
            .as_lookup()
            .record_iter()
            .filter(|record| matches!(record.record_type(), RecordType::A | RecordType::AAAA))
            .map(|record| record.data().map(ToString::to_string))
            .collect())
    }
}
