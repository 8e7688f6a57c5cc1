//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Discovery (at startup):
//!     modules_root/Role/Module/routes.toml
//!     → loader.rs (two-level walk, sorted)
//!     → table.rs (register under the module's context)
//!     → Manifest (what was found, for views and diagnostics)
//!
//! Incoming Request (method, path)
//!     → path.rs (strip query, trim slashes)
//!     → table.rs (exact lookup)
//!     → Return: Route or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes discovered once at startup, immutable at runtime
//! - Exact match only (no patterns)
//! - Last registration wins

pub mod loader;
pub mod path;
pub mod table;

pub use loader::{Manifest, ManifestEntry, RouteFileError, RouteLoader};
pub use path::{normalize_name, normalize_path, RoleModule};
pub use table::{Handler, Method, Route, RouteRegistrar, RouteTable};
