//! Convention-driven route discovery.
//!
//! # Responsibilities
//! - Walk `base/role/module` exactly two levels deep
//! - Read each module's fixed-name route file, if present
//! - Register its routes in the module's discovery context
//! - Record what was found in a [`Manifest`]
//!
//! # Design Decisions
//! - Directories are visited in sorted order; that order decides which
//!   registration wins when two modules claim the same route
//! - A module without a route file is valid and skipped
//! - A route file that does not parse is a startup error
//! - Narrowed scans match role/module names case-insensitively

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::routing::path::{normalize_name, RoleModule};
use crate::routing::table::{Method, RouteTable, UnsupportedMethod};
use crate::source::SourceTree;

#[derive(Debug, Error)]
pub enum RouteFileError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid route file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid route in {path:?}: {source}")]
    Method {
        path: PathBuf,
        #[source]
        source: UnsupportedMethod,
    },
}

/// On-disk shape of a module route file.
///
/// ```toml
/// [[routes]]
/// method = "GET"
/// path = "/home"
/// handler = "HomeController@index"
/// ```
#[derive(Debug, Deserialize)]
struct RouteFile {
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    method: String,
    path: String,
    handler: String,
}

/// A module found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Case-normalized role and module.
    pub origin: RoleModule,
    /// Module directory as found on disk.
    pub directory: PathBuf,
    /// Route file, when the module has one.
    pub routes_file: Option<PathBuf>,
    /// Number of routes registered from it.
    pub routes: usize,
}

/// Everything discovery visited, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn extend(&mut self, other: Manifest) {
        self.entries.extend(other.entries);
    }

    pub fn route_count(&self) -> usize {
        self.entries.iter().map(|e| e.routes).sum()
    }

    /// Directory of a discovered module.
    pub fn module_dir(&self, origin: &RoleModule) -> Option<&Path> {
        self.entries
            .iter()
            .rev()
            .find(|e| &e.origin == origin)
            .map(|e| e.directory.as_path())
    }
}

/// Populates a [`RouteTable`] from the module tree.
#[derive(Debug, Clone)]
pub struct RouteLoader {
    tree: Arc<dyn SourceTree>,
    file_name: String,
}

impl RouteLoader {
    pub fn new(tree: Arc<dyn SourceTree>, file_name: impl Into<String>) -> Self {
        Self {
            tree,
            file_name: file_name.into(),
        }
    }

    /// Scan every role and module below `base`.
    pub fn discover(
        &self,
        base: &Path,
        table: &mut RouteTable,
    ) -> Result<Manifest, RouteFileError> {
        let mut manifest = Manifest::default();
        for role in self.list(base)? {
            manifest.extend(self.scan_role(base, &role, table)?);
        }
        tracing::info!(
            base = ?base,
            modules = manifest.entries.len(),
            routes = manifest.route_count(),
            "Route discovery complete"
        );
        Ok(manifest)
    }

    /// Scan the modules of a single role.
    pub fn discover_role(
        &self,
        base: &Path,
        role: &str,
        table: &mut RouteTable,
    ) -> Result<Manifest, RouteFileError> {
        match self.find_dir(base, role)? {
            Some(role_dir) => self.scan_role(base, &role_dir, table),
            None => {
                tracing::info!(base = ?base, role, "Role directory not found");
                Ok(Manifest::default())
            }
        }
    }

    /// Load a single module.
    pub fn discover_module(
        &self,
        base: &Path,
        role: &str,
        module: &str,
        table: &mut RouteTable,
    ) -> Result<Manifest, RouteFileError> {
        let mut manifest = Manifest::default();
        let Some(role_dir) = self.find_dir(base, role)? else {
            tracing::info!(base = ?base, role, "Role directory not found");
            return Ok(manifest);
        };
        let role_path = base.join(&role_dir);
        match self.find_dir(&role_path, module)? {
            Some(module_dir) => {
                manifest.entries.push(self.load_module(&role_path, &role_dir, &module_dir, table)?);
            }
            None => tracing::info!(role = %role_dir, module, "Module directory not found"),
        }
        Ok(manifest)
    }

    fn scan_role(
        &self,
        base: &Path,
        role_dir: &str,
        table: &mut RouteTable,
    ) -> Result<Manifest, RouteFileError> {
        let role_path = base.join(role_dir);
        let mut manifest = Manifest::default();
        for module_dir in self.list(&role_path)? {
            manifest.entries.push(self.load_module(&role_path, role_dir, &module_dir, table)?);
        }
        Ok(manifest)
    }

    fn load_module(
        &self,
        role_path: &Path,
        role_dir: &str,
        module_dir: &str,
        table: &mut RouteTable,
    ) -> Result<ManifestEntry, RouteFileError> {
        let origin = RoleModule::new(role_dir, module_dir);
        let directory = role_path.join(module_dir);
        let file = directory.join(&self.file_name);

        let content = self.tree.read_file(&file).map_err(|source| RouteFileError::Io {
            path: file.clone(),
            source,
        })?;
        let Some(content) = content else {
            tracing::debug!(module = %origin, "Module has no route file");
            return Ok(ManifestEntry {
                origin,
                directory,
                routes_file: None,
                routes: 0,
            });
        };

        let parsed: RouteFile = toml::from_str(&content).map_err(|source| RouteFileError::Parse {
            path: file.clone(),
            source,
        })?;

        let mut registrar = table.module_registrar(origin.clone());
        for entry in &parsed.routes {
            let method: Method = entry.method.parse().map_err(|source| RouteFileError::Method {
                path: file.clone(),
                source,
            })?;
            registrar.add(method, &entry.path, entry.handler.as_str());
        }

        tracing::debug!(module = %origin, routes = parsed.routes.len(), "Module routes loaded");
        Ok(ManifestEntry {
            origin,
            directory,
            routes_file: Some(file),
            routes: parsed.routes.len(),
        })
    }

    fn list(&self, path: &Path) -> Result<Vec<String>, RouteFileError> {
        self.tree.list_dirs(path).map_err(|source| RouteFileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn find_dir(&self, parent: &Path, name: &str) -> Result<Option<String>, RouteFileError> {
        let wanted = normalize_name(name);
        Ok(self
            .list(parent)?
            .into_iter()
            .find(|dir| normalize_name(dir) == wanted))
    }
}
