//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject empty names that would produce unusable paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: KernelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::KernelConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("'{0}' must not be empty")]
    Empty(&'static str),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("invalid app.base_url '{0}'")]
    BaseUrl(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &KernelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let required = [
        ("paths.modules_root", &config.paths.modules_root),
        ("paths.views_root", &config.paths.views_root),
        ("views.extension", &config.views.extension),
        ("views.directory", &config.views.directory),
        ("routes.file_name", &config.routes.file_name),
        ("dispatch.default_role", &config.dispatch.default_role),
        ("dispatch.default_module", &config.dispatch.default_module),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            errors.push(ValidationError::Empty(name));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if url::Url::parse(&config.app.base_url).is_err() {
        errors.push(ValidationError::BaseUrl(config.app.base_url.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
