//! Peer discovery subsystem.
//!
//! # Data Flow
//! ```text
//! cluster layer calls discover_peers()
//!     → service.rs reads DiscoveryParameters (fresh every round)
//!     → no name? empty list, no lookup
//!     → resolver.rs: one lookup.rs query under the timeout budget
//!     → drop null / non-IP records, pair each IP with own port
//!     → Vec<PeerAddress> (empty on any failure)
//! ```
//!
//! # Design Decisions
//! - Failures never cross the service boundary; they are logged
//! - Results are not cached between rounds
//! - Duplicate records pass through; own address is not filtered

pub mod address;
pub mod lookup;
pub mod resolver;
pub mod service;

pub use address::PeerAddress;
pub use lookup::{HickoryLookup, HostLookup, LookupError};
pub use resolver::{AddressResolver, ResolutionOutcome};
pub use service::{DiscoveryError, DiscoveryService, NodeIdentity};
