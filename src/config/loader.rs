//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::KernelConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config value conversion failed: {0}")]
    Convert(#[from] serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a TOML file into an untyped table.
pub fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<KernelConfig, ConfigError> {
    let table = read_table(path)?;
    let config: KernelConfig = toml::Value::Table(table)
        .try_into()
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [views]
            extension = "tpl"
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.views.extension, "tpl");
    }

    #[test]
    fn test_load_config_reports_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timeouts]\nrequest_secs = 0").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
