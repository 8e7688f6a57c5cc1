//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight requests drain → exit
//! ```
//!
//! # Design Decisions
//! - Startup is ordered by the kernel builder: config, services, routes, listener
//! - Config reload never re-runs route discovery

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
