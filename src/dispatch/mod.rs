//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! Request (method, path)
//!     → normalize path (strip query, trim slashes)
//!     → RouteTable lookup ─────────── miss → 404 "No route"
//!     → Handler::Inline → call closure
//!     → Handler::Action "Controller@method"
//!         → split on '@' ─────────── not two parts → 500 "Invalid callback format"
//!         → role/module from discovery context or path segments
//!         → ControllerRegistry ──────── miss → 404 "Controller not found"
//!         → instantiate, find action ─ miss → 404 "Method not found"
//!         → invoke with ActionContext
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Stages run strictly in order; the first failure ends the request
//! - Resolution failures are 404s, never retried
//! - Action failures (rendering, persistence) become 500s here
//! - Bodies carry diagnostic detail only when `dispatch.expose_errors` is set

pub mod context;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::DispatchConfig;
use crate::controller::{ControllerKey, ControllerRegistry};
use crate::http::{Request, Response};
use crate::registry::ServiceRegistry;
use crate::routing::{normalize_path, Handler, Method, RoleModule, Route, RouteTable};
use crate::view::ViewRenderer;

pub use context::{ActionContext, ActionError, ActionResult};

/// Why a request could not be served.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No route for {method} /{path}")]
    RouteNotFound { method: String, path: String },

    #[error("Invalid callback format '{0}', expected Controller@method")]
    InvalidCallback(String),

    #[error("Controller not found: {0}")]
    ControllerNotFound(ControllerKey),

    #[error("Method not found: {controller}@{method}")]
    MethodNotFound { controller: ControllerKey, method: String },

    #[error("Action failed: {0}")]
    Action(#[from] ActionError),

    #[error("Request exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("Handler panicked")]
    Panicked,
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::RouteNotFound { .. }
            | DispatchError::ControllerNotFound(_)
            | DispatchError::MethodNotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::InvalidCallback(_)
            | DispatchError::Action(_)
            | DispatchError::Panicked => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// `{ controller, method }` parsed from a `"Controller@method"` handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub controller: String,
    pub method: String,
}

impl HandlerDescriptor {
    /// Exactly one `@` with text on both sides.
    pub fn parse(target: &str) -> Result<Self, DispatchError> {
        let parts: Vec<&str> = target.split('@').collect();
        match parts.as_slice() {
            [controller, method]
                if !controller.trim().is_empty() && !method.trim().is_empty() =>
            {
                Ok(Self {
                    controller: controller.trim().to_string(),
                    method: method.trim().to_string(),
                })
            }
            _ => Err(DispatchError::InvalidCallback(target.to_string())),
        }
    }
}

/// Resolves requests to handlers and runs them.
#[derive(Debug)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    controllers: Arc<ControllerRegistry>,
    renderer: Arc<ViewRenderer>,
    services: Arc<ServiceRegistry>,
    settings: DispatchConfig,
    default_layout: String,
}

impl Dispatcher {
    pub fn new(
        routes: Arc<RouteTable>,
        controllers: Arc<ControllerRegistry>,
        renderer: Arc<ViewRenderer>,
        services: Arc<ServiceRegistry>,
        settings: DispatchConfig,
        default_layout: impl Into<String>,
    ) -> Self {
        Self {
            routes,
            controllers,
            renderer,
            services,
            settings,
            default_layout: default_layout.into(),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    /// Dispatch and turn any failure into its error response.
    pub fn dispatch(&self, request: &Request) -> Response {
        match self.try_dispatch(request) {
            Ok(response) => response,
            Err(e) => self.error_response(&e),
        }
    }

    /// Dispatch, surfacing the failure instead of rendering it.
    pub fn try_dispatch(&self, request: &Request) -> Result<Response, DispatchError> {
        let path = normalize_path(request.path());
        let not_found = || DispatchError::RouteNotFound {
            method: request.method().to_string(),
            path: path.clone(),
        };

        let method = Method::try_from(request.method()).map_err(|_| not_found())?;
        let route = self.routes.lookup(method, &path).ok_or_else(not_found)?;

        tracing::debug!(
            request_id = %request.request_id(),
            method = %method,
            path = %path,
            handler = %route.handler.describe(),
            "Route matched"
        );

        match &route.handler {
            Handler::Inline(handler) => {
                let origin = self.origin(route, &path);
                let mut cx = self.context(request, origin);
                handler(&mut cx)?;
                Ok(cx.into_response())
            }
            Handler::Action(target) => self.invoke_action(request, route, &path, target),
        }
    }

    fn invoke_action(
        &self,
        request: &Request,
        route: &Route,
        path: &str,
        target: &str,
    ) -> Result<Response, DispatchError> {
        let descriptor = HandlerDescriptor::parse(target)?;
        let origin = self.origin(route, path);
        let key = ControllerKey::for_origin(&origin, &descriptor.controller);

        let entry = self
            .controllers
            .get(&key)
            .ok_or_else(|| DispatchError::ControllerNotFound(key.clone()))?;

        let mut controller = entry.instantiate();
        if !controller.has_action(&descriptor.method) {
            return Err(DispatchError::MethodNotFound {
                controller: key,
                method: descriptor.method,
            });
        }

        let mut cx = self.context(request, origin);
        match controller.invoke(&descriptor.method, &mut cx) {
            Some(result) => result?,
            None => {
                return Err(DispatchError::MethodNotFound {
                    controller: key,
                    method: descriptor.method,
                })
            }
        }
        Ok(cx.into_response())
    }

    /// Discovery context when the route has one, otherwise the first two
    /// path segments with the configured defaults.
    fn origin(&self, route: &Route, path: &str) -> RoleModule {
        route.origin.clone().unwrap_or_else(|| {
            RoleModule::from_path(path, &self.settings.default_role, &self.settings.default_module)
        })
    }

    fn context<'d>(&'d self, request: &'d Request, origin: RoleModule) -> ActionContext<'d> {
        ActionContext::new(request, origin, &self.renderer, &self.services, &self.default_layout)
    }

    /// Response for a failed dispatch.
    pub fn error_response(&self, error: &DispatchError) -> Response {
        let status = error.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %error, "Dispatch failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %error, "Dispatch resolution failed");
        }

        let body = if self.settings.expose_errors {
            error.to_string()
        } else {
            status.canonical_reason().unwrap_or("Error").to_string()
        };
        Response::text(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_descriptor_requires_exactly_one_at() {
        assert_eq!(
            HandlerDescriptor::parse("HomeController@index").unwrap(),
            HandlerDescriptor {
                controller: "HomeController".into(),
                method: "index".into()
            }
        );
        for bad in ["BadFormatNoAtSign", "A@b@c", "@index", "Home@", ""] {
            assert!(
                matches!(HandlerDescriptor::parse(bad), Err(DispatchError::InvalidCallback(_))),
                "input {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_error_statuses() {
        let key = ControllerKey::new("App", "Home", "X");
        assert_eq!(
            DispatchError::RouteNotFound { method: "GET".into(), path: "x".into() }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(DispatchError::ControllerNotFound(key.clone()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            DispatchError::MethodNotFound { controller: key, method: "y".into() }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DispatchError::InvalidCallback("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DispatchError::Timeout(Duration::from_secs(1)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
