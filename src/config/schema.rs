//! Configuration schema definitions.
//!
//! This module defines the typed bootstrap configuration for the kernel.
//! All types derive Serde traits for deserialization from config files.
//! Keys the kernel does not know about (site settings such as `app.name`)
//! are ignored here and remain reachable through the dynamic config store.

use serde::{Deserialize, Serialize};

/// Root configuration for the kernel.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KernelConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Filesystem layout of modules and layouts.
    pub paths: PathsConfig,

    /// View resolution settings.
    pub views: ViewsConfig,

    /// Route discovery settings.
    pub routes: RoutesConfig,

    /// Dispatch defaults and error verbosity.
    pub dispatch: DispatchConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Site-level settings used by the URL service.
    pub app: AppConfig,

    /// Localization settings.
    pub i18n: I18nConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Where modules and shared layouts live.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the `role/module` tree.
    pub modules_root: String,

    /// Root of the shared layouts.
    pub views_root: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            modules_root: "site/modules".to_string(),
            views_root: "site/views".to_string(),
        }
    }
}

/// View resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewsConfig {
    /// Extension appended to view and layout names.
    pub extension: String,

    /// Directory below each module holding its views.
    pub directory: String,

    /// Layout used by `ActionContext::page` when none is given.
    pub default_layout: String,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            extension: "html".to_string(),
            directory: "Views".to_string(),
            default_layout: "layouts/main".to_string(),
        }
    }
}

/// Route discovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Fixed name of the per-module route file.
    pub file_name: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            file_name: "routes.toml".to_string(),
        }
    }
}

/// Dispatch defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Role used when the request path has no first segment.
    pub default_role: String,

    /// Module used when the request path has no second segment.
    pub default_module: String,

    /// Include diagnostic detail in 404/500 bodies.
    pub expose_errors: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_role: "App".to_string(),
            default_module: "Home".to_string(),
            expose_errors: true,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a single dispatch (routing, action and rendering) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Site-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Public base URL used for link generation.
    pub base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Localization settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct I18nConfig {
    /// Active locale.
    pub locale: String,

    /// Directory holding `{locale}.toml` message files.
    pub directory: String,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            directory: "site/lang".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Reload the config store when the config file changes.
    pub watch_config: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            watch_config: false,
        }
    }
}
