//! Shared services injected into views and reachable from controllers.
//!
//! # Data Flow
//! ```text
//! KernelConfig (i18n, app.base_url)
//!     → language.rs (message table for the active locale)
//!     → url.rs (link generation against the public base URL)
//!     → ServiceRegistry ("language", "url")
//!     → ViewRenderer bindings (`{{ t "key" }}`, `{{ url "path" }}`)
//! ```

pub mod language;
pub mod url;

pub use language::Language;
pub use url::UrlGenerator;
