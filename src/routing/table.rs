//! Route storage and lookup.
//!
//! # Responsibilities
//! - Store one handler per (method, normalized path)
//! - Look up the handler for a request
//! - Offer the `get/post/put/delete` registration surface
//!
//! # Design Decisions
//! - Exact match after normalization, no patterns or wildcards
//! - Re-registering a pair overwrites silently; the overwrite is logged
//! - Frozen behind an `Arc` once discovery is done

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::dispatch::{ActionContext, ActionResult};
use crate::routing::path::{normalize_path, RoleModule};

/// HTTP methods routes can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported method '{0}'")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

impl TryFrom<&axum::http::Method> for Method {
    type Error = UnsupportedMethod;

    fn try_from(method: &axum::http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// Directly invocable route handler.
pub type InlineHandler = dyn Fn(&mut ActionContext<'_>) -> ActionResult + Send + Sync;

/// What a route resolves to.
#[derive(Clone)]
pub enum Handler {
    /// A closure called with the action context.
    Inline(Arc<InlineHandler>),
    /// A `"Controller@method"` string resolved at dispatch time.
    Action(String),
}

impl Handler {
    pub fn inline<F>(f: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>) -> ActionResult + Send + Sync + 'static,
    {
        Handler::Inline(Arc::new(f))
    }

    /// Short description for logs and route listings.
    pub fn describe(&self) -> &str {
        match self {
            Handler::Inline(_) => "<inline>",
            Handler::Action(target) => target,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Inline(_) => f.write_str("Inline"),
            Handler::Action(target) => f.debug_tuple("Action").field(target).finish(),
        }
    }
}

impl From<&str> for Handler {
    fn from(target: &str) -> Self {
        Handler::Action(target.to_string())
    }
}

impl From<String> for Handler {
    fn from(target: String) -> Self {
        Handler::Action(target)
    }
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub handler: Handler,
    /// Module whose route file registered this route, if any.
    pub origin: Option<RoleModule>,
}

/// In-memory mapping of (method, normalized path) to handler.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: BTreeMap<(String, Method), Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route without a discovery context.
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Into<Handler>,
    ) -> Option<Route> {
        self.insert(method, path, handler.into(), None)
    }

    /// Register a route on behalf of a module.
    pub fn add_module_route(
        &mut self,
        origin: RoleModule,
        method: Method,
        path: &str,
        handler: impl Into<Handler>,
    ) -> Option<Route> {
        self.insert(method, path, handler.into(), Some(origin))
    }

    fn insert(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
        origin: Option<RoleModule>,
    ) -> Option<Route> {
        let path = normalize_path(path);
        let route = Route {
            method,
            path: path.clone(),
            handler,
            origin,
        };
        let replaced = self.routes.insert((path, method), route);
        if let Some(old) = &replaced {
            tracing::warn!(
                method = %method,
                path = %old.path,
                previous = %old.handler.describe(),
                "Route re-registered, last registration wins"
            );
        }
        replaced
    }

    /// Handler registered for the pair, after normalizing `path`.
    pub fn lookup(&self, method: Method, path: &str) -> Option<&Route> {
        self.routes.get(&(normalize_path(path), method))
    }

    /// All routes, ordered by path then method.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registration surface for inline bootstrap routes.
    pub fn registrar(&mut self) -> RouteRegistrar<'_> {
        RouteRegistrar { table: self, origin: None }
    }

    /// Registration surface bound to a module's discovery context.
    pub fn module_registrar(&mut self, origin: RoleModule) -> RouteRegistrar<'_> {
        RouteRegistrar {
            table: self,
            origin: Some(origin),
        }
    }
}

/// `get/post/put/delete` registration bound to an optional module context.
pub struct RouteRegistrar<'a> {
    table: &'a mut RouteTable,
    origin: Option<RoleModule>,
}

impl RouteRegistrar<'_> {
    pub fn add(&mut self, method: Method, path: &str, handler: impl Into<Handler>) -> &mut Self {
        self.table.insert(method, path, handler.into(), self.origin.clone());
        self
    }

    pub fn get(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Self {
        self.add(Method::Get, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Self {
        self.add(Method::Post, path, handler)
    }

    pub fn put(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Self {
        self.add(Method::Put, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Self {
        self.add(Method::Delete, path, handler)
    }
}
