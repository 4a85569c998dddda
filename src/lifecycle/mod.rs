//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     stop requested → broadcast to background tasks → tasks exit their loop
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → host stops discovery rounds → teardown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
