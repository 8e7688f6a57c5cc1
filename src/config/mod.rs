//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → KernelConfig (validated, immutable bootstrap settings)
//!
//! same file (and any extra sources)
//!     → store.rs (dot-addressed ConfigStore, shallow top-level merge)
//!     → injected into views as `config`
//!
//! On file change (optional):
//!     watcher.rs detects change
//!     → store.rs re-loads the file
//! ```
//!
//! # Design Decisions
//! - Typed config is immutable once loaded; only the store can change
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, DispatchConfig, I18nConfig, KernelConfig, ListenerConfig, ObservabilityConfig,
    PathsConfig, RoutesConfig, TimeoutConfig, ViewsConfig,
};
pub use store::{ConfigSource, ConfigStore};
