//! Per-request context handed to inline handlers and controller actions.
//!
//! # Responsibilities
//! - Borrow the request, the service registry and the view renderer
//! - Own the response being built
//! - Render views of the dispatching module into that response
//!
//! # Design Decisions
//! - Built fresh for every dispatch and dropped with it
//! - The module the route belongs to is fixed at construction, so views and
//!   partials resolve without repeating role and module

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::http::{Request, Response};
use crate::persistence::{self, DatabaseError, DatabaseHandle};
use crate::registry::ServiceRegistry;
use crate::routing::RoleModule;
use crate::view::{RenderError, RenderWarning, ViewData, ViewRenderer};

/// Failure raised by a handler or action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("service '{0}' is not registered")]
    MissingService(String),

    #[error("response serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

pub type ActionResult = Result<(), ActionError>;

/// What an action sees while it runs.
pub struct ActionContext<'d> {
    request: &'d Request,
    origin: RoleModule,
    renderer: &'d ViewRenderer,
    services: &'d ServiceRegistry,
    default_layout: &'d str,
    response: Response,
    warnings: Vec<RenderWarning>,
}

impl<'d> ActionContext<'d> {
    pub fn new(
        request: &'d Request,
        origin: RoleModule,
        renderer: &'d ViewRenderer,
        services: &'d ServiceRegistry,
        default_layout: &'d str,
    ) -> Self {
        Self {
            request,
            origin,
            renderer,
            services,
            default_layout,
            response: Response::new(),
            warnings: Vec::new(),
        }
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    /// Role and module the dispatched route belongs to.
    pub fn origin(&self) -> &RoleModule {
        &self.origin
    }

    pub fn services(&self) -> &ServiceRegistry {
        self.services
    }

    /// A registered service by name and type.
    pub fn service<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ActionError> {
        self.services
            .get::<T>(name)
            .ok_or_else(|| ActionError::MissingService(name.to_string()))
    }

    /// The registered database collaborator.
    pub fn database(&self) -> Result<Arc<DatabaseHandle>, ActionError> {
        persistence::lookup(self.services)
            .ok_or_else(|| ActionError::MissingService(crate::registry::DATABASE.into()))
    }

    /// Append raw text to the response body.
    pub fn echo(&mut self, text: &str) -> &mut Self {
        self.response.write(text);
        self
    }

    /// Render a view of this module and return its output.
    pub fn view(&mut self, file: &str, data: &ViewData) -> Result<String, ActionError> {
        let rendered = self
            .renderer
            .render(&self.origin.role, &self.origin.module, file, data)?;
        self.warnings.extend(rendered.warnings);
        Ok(rendered.body)
    }

    /// Render a view of this module into the response.
    pub fn render(&mut self, file: &str, data: &ViewData) -> ActionResult {
        let body = self.view(file, data)?;
        self.response.write(&body);
        Ok(())
    }

    /// Render a view wrapped in the configured default layout.
    pub fn page(&mut self, file: &str, data: ViewData) -> ActionResult {
        let layout = self.default_layout;
        self.page_with(layout, file, data)
    }

    /// Render a view wrapped in `layout`.
    pub fn page_with(&mut self, layout: &str, file: &str, data: ViewData) -> ActionResult {
        let rendered = self
            .renderer
            .render_with_layout(layout, &self.origin.role, &self.origin.module, file, data)?;
        self.warnings.extend(rendered.warnings);
        self.response.write(&rendered.body);
        Ok(())
    }

    /// Render a view of any module into the response.
    pub fn partial(
        &mut self,
        role: &str,
        module: &str,
        file: &str,
        data: &ViewData,
    ) -> ActionResult {
        let rendered = self.renderer.render(role, module, file, data)?;
        self.warnings.extend(rendered.warnings);
        self.response.write(&rendered.body);
        Ok(())
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.response.set_status(status);
        self
    }

    pub fn redirect(&mut self, location: &str) -> ActionResult {
        self.response.redirect(location);
        Ok(())
    }

    /// Replace the body with `value` as JSON.
    pub fn json<T: Serialize>(&mut self, value: &T) -> ActionResult {
        self.response.json(value)?;
        Ok(())
    }

    /// Render warnings collected so far.
    pub fn warnings(&self) -> &[RenderWarning] {
        &self.warnings
    }

    pub fn into_response(self) -> Response {
        if !self.warnings.is_empty() {
            tracing::debug!(
                request_id = %self.request.request_id(),
                warnings = self.warnings.len(),
                "Response rendered with warnings"
            );
        }
        self.response
    }
}
