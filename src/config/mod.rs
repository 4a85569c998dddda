//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! live file (TOML key/values)
//!     → loader.rs (parse & flatten)
//!     → ConfigSnapshot (immutable)
//!     → live.rs stores it behind an ArcSwap
//!
//! On reload tick (or watcher.rs nudge):
//!     → loader.rs loads new snapshot
//!     → atomic swap of Arc<ConfigSnapshot>
//!     → snapshot.rs diff (changed / removed / added)
//!     → listeners.rs notifies per key
//!
//! Reads (discovery.rs):
//!     snapshot value → environment variable → default
//! ```
//!
//! # Design Decisions
//! - Snapshots are replaced whole, never patched
//! - A missing file at startup disables the file, never fails startup
//! - A failed reload keeps the last good snapshot

pub mod discovery;
pub mod env;
pub mod listeners;
pub mod live;
pub mod loader;
pub mod schema;
pub mod snapshot;
pub mod validation;
pub mod watcher;

pub use discovery::{DiscoveryConfiguration, DiscoveryParameters, RestartListener};
pub use env::{EnvSource, ProcessEnv};
pub use listeners::{ChangeListener, ListenerError};
pub use live::{ConfigState, LiveConfig};
pub use loader::ConfigError;
pub use schema::DiscoverySettings;
pub use snapshot::{ChangeKind, ConfigChange, ConfigSnapshot};
