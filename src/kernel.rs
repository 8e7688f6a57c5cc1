//! Kernel bootstrap.
//!
//! # Data Flow
//! ```text
//! KernelConfig (+ config files)
//!     → ConfigStore loaded, registered as "config"
//!     → Language, UrlGenerator registered as "language", "url"
//!     → builder routes applied to the RouteTable
//!     → RouteLoader discovery (all, one role, or one module)
//!     → ViewRenderer bound to the discovered module directories
//!     → Dispatcher frozen behind an Arc
//! ```
//!
//! # Design Decisions
//! - One explicit context object instead of process-wide registries
//! - Routes and controllers are fixed once `build` returns
//! - Services registered on the builder win over the built-in ones
//! - Any startup error is fatal to the caller, including an invalid config
//!   built in code

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::validation::validate_config;
use crate::config::{load_config, ConfigError, ConfigSource, ConfigStore, KernelConfig};
use crate::controller::ControllerRegistry;
use crate::dispatch::Dispatcher;
use crate::http::{Request, Response};
use crate::persistence::{self, Database};
use crate::registry::{self, ServiceRegistry};
use crate::routing::{Manifest, RouteFileError, RouteLoader, RouteRegistrar, RouteTable};
use crate::services::{Language, UrlGenerator};
use crate::source::{DiskTree, SourceTree};
use crate::view::{ViewRenderer, ViewSettings};

#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid app.base_url: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error(transparent)]
    Routes(#[from] RouteFileError),
}

/// Which part of the module tree route discovery scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    All,
    Role(String),
    Module { role: String, module: String },
}

/// Assembles a [`Kernel`].
pub struct KernelBuilder {
    config: KernelConfig,
    config_path: Option<PathBuf>,
    sources: Vec<ConfigSource>,
    tree: Arc<dyn SourceTree>,
    services: Arc<ServiceRegistry>,
    routes: RouteTable,
    controllers: ControllerRegistry,
    discovery: Option<Vec<Discovery>>,
}

impl KernelBuilder {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            config_path: None,
            sources: Vec::new(),
            tree: Arc::new(DiskTree),
            services: Arc::new(ServiceRegistry::new()),
            routes: RouteTable::new(),
            controllers: ControllerRegistry::new(),
            discovery: None,
        }
    }

    /// Load and validate `path`, and merge the same file into the config store.
    pub fn from_file(path: &Path) -> Result<Self, KernelError> {
        let config = load_config(path)?;
        let mut builder = Self::new(config);
        builder.config_path = Some(path.to_path_buf());
        builder.sources.push(ConfigSource::File(path.to_path_buf()));
        Ok(builder)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Read modules, views and translations from `tree`.
    pub fn with_tree(mut self, tree: Arc<dyn SourceTree>) -> Self {
        self.tree = tree;
        self
    }

    /// Another source merged into the config store, after earlier ones.
    pub fn config_source(mut self, source: impl Into<ConfigSource>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn service<T: Send + Sync + 'static>(self, name: &str, instance: Arc<T>) -> Self {
        self.services.set(name, instance);
        self
    }

    pub fn database(self, database: Arc<dyn Database>) -> Self {
        persistence::register(&self.services, database);
        self
    }

    /// Register bootstrap routes. They are applied before discovery, so a
    /// discovered route for the same pair replaces them.
    pub fn routes<F>(mut self, register: F) -> Self
    where
        F: FnOnce(&mut RouteRegistrar<'_>),
    {
        register(&mut self.routes.registrar());
        self
    }

    pub fn controllers<F>(mut self, register: F) -> Self
    where
        F: FnOnce(&mut ControllerRegistry),
    {
        register(&mut self.controllers);
        self
    }

    /// Add a discovery scope. Without any, the whole tree is scanned.
    pub fn discover(mut self, scope: Discovery) -> Self {
        self.discovery.get_or_insert_with(Vec::new).push(scope);
        self
    }

    /// Validate the config, load the store, register services, discover
    /// routes and freeze the dispatcher.
    pub fn build(self) -> Result<Kernel, KernelError> {
        validate_config(&self.config).map_err(ConfigError::Validation)?;

        let KernelBuilder {
            config,
            config_path,
            sources,
            tree,
            services,
            mut routes,
            controllers,
            discovery,
        } = self;

        let store = Arc::new(ConfigStore::new());
        for source in sources {
            store.load(source)?;
        }
        let url = UrlGenerator::new(&config.app.base_url)?;
        let language = Language::load(
            &*tree,
            Path::new(&config.i18n.directory),
            &config.i18n.locale,
        );

        register_default(&services, registry::CONFIG, store.clone());
        register_default(&services, registry::LANGUAGE, Arc::new(language));
        register_default(&services, registry::URL, Arc::new(url));

        let loader = RouteLoader::new(tree.clone(), config.routes.file_name.clone());
        let base = PathBuf::from(&config.paths.modules_root);
        let mut manifest = Manifest::default();
        for scope in discovery.unwrap_or_else(|| vec![Discovery::All]) {
            let found = match &scope {
                Discovery::All => loader.discover(&base, &mut routes)?,
                Discovery::Role(role) => loader.discover_role(&base, role, &mut routes)?,
                Discovery::Module { role, module } => {
                    loader.discover_module(&base, role, module, &mut routes)?
                }
            };
            manifest.extend(found);
        }

        let renderer = ViewRenderer::new(tree, ViewSettings::from(&config), services.clone())
            .with_manifest(&manifest);
        let dispatcher = Dispatcher::new(
            Arc::new(routes),
            Arc::new(controllers),
            Arc::new(renderer),
            services.clone(),
            config.dispatch.clone(),
            config.views.default_layout.clone(),
        );

        tracing::info!(
            routes = dispatcher.routes().len(),
            controllers = dispatcher.controllers().len(),
            modules = manifest.entries.len(),
            services = ?services.names(),
            "Kernel ready"
        );

        Ok(Kernel {
            config,
            config_path,
            store,
            services,
            dispatcher: Arc::new(dispatcher),
            manifest,
        })
    }
}

fn register_default<T: Send + Sync + 'static>(
    services: &ServiceRegistry,
    name: &str,
    instance: Arc<T>,
) {
    if services.contains(name) {
        tracing::debug!(service = name, "Keeping caller-registered service");
    } else {
        services.set(name, instance);
    }
}

/// Everything a running site needs, shared by `Arc`.
#[derive(Debug)]
pub struct Kernel {
    config: KernelConfig,
    config_path: Option<PathBuf>,
    store: Arc<ConfigStore>,
    services: Arc<ServiceRegistry>,
    dispatcher: Arc<Dispatcher>,
    manifest: Manifest,
}

impl Kernel {
    pub fn builder(config: KernelConfig) -> KernelBuilder {
        KernelBuilder::new(config)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// File the kernel was configured from, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn routes(&self) -> &RouteTable {
        self.dispatcher.routes()
    }

    pub fn dispatch(&self, request: &Request) -> Response {
        self.dispatcher.dispatch(request)
    }
}
