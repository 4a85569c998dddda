//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resolver, service, live config produce:
//!     → tracing events (resolution failures, value changes)
//!     → metrics.rs (rounds, peers, reloads, changes)
//!
//! Consumers:
//!     → host log pipeline (logging.rs installs the subscriber)
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
