//! View resolution, service injection and layout composition.
//!
//! # Responsibilities
//! - Resolve `{modules_root}/{Role}/{Module}/Views/{file}.{ext}`
//! - Bind the caller's data plus the `config`, `language` and `url` services
//! - Compose a view into a layout under the reserved `content` key
//! - Register the `t`, `url` and `asset` helpers and every partial a view
//!   references before handing it to handlebars
//!
//! # Design Decisions
//! - Every render returns its output; nothing is written to an ambient buffer
//! - A missing view, layout or partial is a recorded warning, not an error
//! - Service names shadow data keys of the same name
//! - `{{> file }}` resolves in the rendering module, `{{> Role/Module/file }}`
//!   in any module; partial cycles are rejected before evaluation

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext as HelperScope,
    RenderErrorReason,
};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{ConfigStore, KernelConfig};
use crate::observability::metrics;
use crate::registry::{self, ServiceRegistry};
use crate::routing::{normalize_path, Manifest, RoleModule};
use crate::services::{Language, UrlGenerator};
use crate::source::SourceTree;

/// Data handed to a view: top-level binding names to values.
pub type ViewData = Map<String, Value>;

/// Key under which a layout receives the rendered view.
pub const CONTENT_KEY: &str = "content";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template error in {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: handlebars::TemplateError,
    },

    #[error("failed to evaluate {path:?}: {source}")]
    Evaluate {
        path: PathBuf,
        #[source]
        source: handlebars::RenderError,
    },

    #[error("partial '{0}' includes itself")]
    PartialCycle(String),
}

/// A non-fatal problem met while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderWarning {
    MissingView(PathBuf),
    MissingLayout(PathBuf),
}

/// Output of a render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub body: String,
    pub warnings: Vec<RenderWarning>,
}

impl Rendered {
    /// Append another render's output and warnings.
    pub fn append(&mut self, other: Rendered) {
        self.body.push_str(&other.body);
        self.warnings.extend(other.warnings);
    }
}

/// One render request. Built per call and dropped once output is returned.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub origin: RoleModule,
    pub file: String,
    pub data: ViewData,
    pub layout: Option<String>,
}

impl RenderContext {
    pub fn new(role: &str, module: &str, file: impl Into<String>) -> Self {
        Self {
            origin: RoleModule::new(role, module),
            file: file.into(),
            data: ViewData::new(),
            layout: None,
        }
    }

    pub fn with_data(mut self, data: ViewData) -> Self {
        self.data = data;
        self
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }
}

/// Where views and layouts live.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub modules_root: PathBuf,
    pub views_root: PathBuf,
    pub views_dir: String,
    pub extension: String,
}

impl From<&KernelConfig> for ViewSettings {
    fn from(config: &KernelConfig) -> Self {
        Self {
            modules_root: PathBuf::from(&config.paths.modules_root),
            views_root: PathBuf::from(&config.paths.views_root),
            views_dir: config.views.directory.clone(),
            extension: config.views.extension.clone(),
        }
    }
}

/// Renders views and layouts from a [`SourceTree`].
#[derive(Clone)]
pub struct ViewRenderer {
    tree: Arc<dyn SourceTree>,
    settings: ViewSettings,
    services: Arc<ServiceRegistry>,
    manifest: Manifest,
    handlebars: Handlebars<'static>,
}

impl fmt::Debug for ViewRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRenderer")
            .field("tree", &self.tree)
            .field("settings", &self.settings)
            .field("modules", &self.manifest.entries.len())
            .finish_non_exhaustive()
    }
}

impl ViewRenderer {
    pub fn new(
        tree: Arc<dyn SourceTree>,
        settings: ViewSettings,
        services: Arc<ServiceRegistry>,
    ) -> Self {
        let mut handlebars = Handlebars::new();
        for kind in ServiceHelper::ALL {
            handlebars.register_helper(
                kind.name(),
                Box::new(BoundHelper {
                    kind,
                    services: services.clone(),
                }),
            );
        }
        Self {
            tree,
            settings,
            services,
            manifest: Manifest::default(),
            handlebars,
        }
    }

    /// Resolve modules through the directories discovery actually found,
    /// so `app/home` on disk serves views for `App/Home`.
    pub fn with_manifest(mut self, manifest: &Manifest) -> Self {
        self.manifest = manifest.clone();
        self
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    /// Path of a module view.
    pub fn view_path(&self, origin: &RoleModule, file: &str) -> PathBuf {
        let module_dir = match self.manifest.module_dir(origin) {
            Some(dir) => dir.to_path_buf(),
            None => self
                .settings
                .modules_root
                .join(&origin.role)
                .join(&origin.module),
        };
        module_dir
            .join(&self.settings.views_dir)
            .join(format!("{}.{}", file, self.settings.extension))
    }

    /// Path of a layout below the shared views root.
    pub fn layout_path(&self, layout: &str) -> PathBuf {
        self.settings.views_root.join(format!(
            "{}.{}",
            normalize_path(layout),
            self.settings.extension
        ))
    }

    /// Render a module view. A missing file yields an empty body and a warning.
    pub fn render(
        &self,
        role: &str,
        module: &str,
        file: &str,
        data: &ViewData,
    ) -> Result<Rendered, RenderError> {
        let origin = RoleModule::new(role, module);
        let path = self.view_path(&origin, file);
        let mut pass = RenderPass::new(self, origin);
        let body = pass
            .render_file(&path, RenderWarning::MissingView, &self.bindings(data))?
            .unwrap_or_default();
        Ok(pass.finish(body))
    }

    /// Render a view, then the layout with the view's output under `content`.
    ///
    /// A caller-supplied `content` key is overwritten. If the layout is
    /// missing the raw view output is returned with a warning.
    pub fn render_with_layout(
        &self,
        layout: &str,
        role: &str,
        module: &str,
        view: &str,
        mut data: ViewData,
    ) -> Result<Rendered, RenderError> {
        let Rendered { body: inner, warnings } = self.render(role, module, view, &data)?;
        data.insert(CONTENT_KEY.to_string(), Value::String(inner.clone()));

        let mut pass = RenderPass::new(self, RoleModule::new(role, module));
        pass.warnings = warnings;
        let path = self.layout_path(layout);
        let body = pass
            .render_file(&path, RenderWarning::MissingLayout, &self.bindings(&data))?
            .unwrap_or(inner);
        Ok(pass.finish(body))
    }

    /// Render a view and append it to `out` (fragment inclusion).
    pub fn partial(
        &self,
        role: &str,
        module: &str,
        file: &str,
        data: &ViewData,
        out: &mut Rendered,
    ) -> Result<(), RenderError> {
        out.append(self.render(role, module, file, data)?);
        Ok(())
    }

    /// Render a [`RenderContext`], with its layout when it names one.
    pub fn render_context(&self, cx: RenderContext) -> Result<Rendered, RenderError> {
        let RenderContext {
            origin,
            file,
            data,
            layout,
        } = cx;
        match layout {
            Some(layout) => {
                self.render_with_layout(&layout, &origin.role, &origin.module, &file, data)
            }
            None => self.render(&origin.role, &origin.module, &file, &data),
        }
    }

    fn bindings(&self, data: &ViewData) -> Value {
        let mut bindings = data.clone();
        if let Some(config) = self.services.get::<ConfigStore>(registry::CONFIG) {
            bindings.insert(
                registry::CONFIG.into(),
                Value::Object(Map::clone(&config.snapshot())),
            );
        }
        if let Some(language) = self.services.get::<Language>(registry::LANGUAGE) {
            bindings.insert(registry::LANGUAGE.into(), language.to_value());
        }
        if let Some(url) = self.services.get::<UrlGenerator>(registry::URL) {
            bindings.insert(registry::URL.into(), url.to_value());
        }
        Value::Object(bindings)
    }
}

/// Per-call rendering state: the rendering module and the warnings collected.
struct RenderPass<'r> {
    renderer: &'r ViewRenderer,
    origin: RoleModule,
    warnings: Vec<RenderWarning>,
}

impl<'r> RenderPass<'r> {
    fn new(renderer: &'r ViewRenderer, origin: RoleModule) -> Self {
        Self {
            renderer,
            origin,
            warnings: Vec::new(),
        }
    }

    fn finish(self, body: String) -> Rendered {
        Rendered {
            body,
            warnings: self.warnings,
        }
    }

    fn read(
        &mut self,
        path: &Path,
        missing: fn(PathBuf) -> RenderWarning,
    ) -> Result<Option<String>, RenderError> {
        let source = self
            .renderer
            .tree
            .read_file(path)
            .map_err(|source| RenderError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if source.is_none() {
            let warning = missing(path.to_path_buf());
            tracing::warn!(
                path = ?path,
                warning = ?warning,
                "View file not found, rendering empty output"
            );
            metrics::record_render_warning(match warning {
                RenderWarning::MissingView(_) => "missing_view",
                RenderWarning::MissingLayout(_) => "missing_layout",
            });
            self.warnings.push(warning);
        }
        Ok(source)
    }

    /// Render the file at `path`. Returns `None` when it is missing.
    fn render_file(
        &mut self,
        path: &Path,
        missing: fn(PathBuf) -> RenderWarning,
        bindings: &Value,
    ) -> Result<Option<String>, RenderError> {
        let Some(source) = self.read(path, missing)? else {
            return Ok(None);
        };

        let mut handlebars = self.renderer.handlebars.clone();
        let name = path.to_string_lossy().into_owned();
        handlebars
            .register_template_string(&name, &source)
            .map_err(|source| RenderError::Template {
                path: path.to_path_buf(),
                source,
            })?;

        let mut registered = HashSet::new();
        let mut including = Vec::new();
        for partial in partial_names(&source) {
            self.register_partial(&mut handlebars, partial, &mut including, &mut registered)?;
        }

        handlebars
            .render(&name, bindings)
            .map(Some)
            .map_err(|source| RenderError::Evaluate {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Load `name` and everything it includes into `handlebars`. A missing
    /// partial is registered empty so it renders as nothing.
    fn register_partial(
        &mut self,
        handlebars: &mut Handlebars<'static>,
        name: &str,
        including: &mut Vec<String>,
        registered: &mut HashSet<String>,
    ) -> Result<(), RenderError> {
        if including.iter().any(|n| n == name) {
            return Err(RenderError::PartialCycle(name.to_string()));
        }
        if registered.contains(name) {
            return Ok(());
        }

        let (origin, file) = self.resolve_partial(name);
        let path = self.renderer.view_path(&origin, &file);
        let source = self
            .read(&path, RenderWarning::MissingView)?
            .unwrap_or_default();
        handlebars
            .register_partial(name, &source)
            .map_err(|source| RenderError::Template { path, source })?;

        including.push(name.to_string());
        for child in partial_names(&source) {
            self.register_partial(handlebars, child, including, registered)?;
        }
        including.pop();
        registered.insert(name.to_string());
        Ok(())
    }

    fn resolve_partial(&self, name: &str) -> (RoleModule, String) {
        let parts: Vec<&str> = name.trim_matches('/').splitn(3, '/').collect();
        match parts.as_slice() {
            [role, module, file] => (RoleModule::new(role, module), (*file).to_string()),
            _ => (self.origin.clone(), name.trim_matches('/').to_string()),
        }
    }
}

/// Names of the partials `source` includes with `{{> name }}`.
fn partial_names(source: &str) -> Vec<&str> {
    source
        .match_indices("{{")
        .filter_map(|(at, _)| {
            let tag = &source[at + 2..];
            let tag = tag.strip_prefix('~').unwrap_or(tag);
            let name = tag.strip_prefix('>')?.trim_start();
            let end = name
                .find(|c: char| c.is_whitespace() || c == '}' || c == '~')
                .unwrap_or(name.len());
            Some(&name[..end]).filter(|name| !name.is_empty())
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum ServiceHelper {
    Translate,
    Url,
    Asset,
}

impl ServiceHelper {
    const ALL: [ServiceHelper; 3] = [Self::Translate, Self::Url, Self::Asset];

    fn name(self) -> &'static str {
        match self {
            Self::Translate => "t",
            Self::Url => "url",
            Self::Asset => "asset",
        }
    }
}

/// `{{ t "key" }}`, `{{ url "path" }}` and `{{ asset "path" }}`, answered by
/// whatever the registry holds at render time.
struct BoundHelper {
    kind: ServiceHelper,
    services: Arc<ServiceRegistry>,
}

impl BoundHelper {
    fn expand(&self, arg: &str) -> String {
        match self.kind {
            ServiceHelper::Translate => match self.services.get::<Language>(registry::LANGUAGE) {
                Some(language) => language.translate(arg).to_string(),
                None => arg.to_string(),
            },
            ServiceHelper::Url => match self.services.get::<UrlGenerator>(registry::URL) {
                Some(url) => url.to(arg),
                None => format!("/{}", normalize_path(arg)),
            },
            ServiceHelper::Asset => match self.services.get::<UrlGenerator>(registry::URL) {
                Some(url) => url.asset(arg),
                None => format!("/assets/{}", normalize_path(arg)),
            },
        }
    }
}

impl HelperDef for BoundHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut HelperScope<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let arg = h
            .param(0)
            .and_then(|param| param.value().as_str())
            .ok_or(RenderErrorReason::ParamNotFoundForIndex(self.kind.name(), 0))?;
        out.write(&handlebars::html_escape(&self.expand(arg)))?;
        Ok(())
    }
}
