//! Front-controller kernel for a modular server-rendered site.
//!
//! Requests are matched against a route table populated from per-module
//! route files, resolved to typed controllers, and answered with views
//! composed into layouts.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod http;
pub mod kernel;
pub mod lifecycle;
pub mod observability;
pub mod persistence;
pub mod registry;
pub mod routing;
pub mod services;
pub mod source;
pub mod view;

pub use config::{ConfigStore, KernelConfig};
pub use controller::{ControllerKey, ControllerRegistry};
pub use dispatch::{ActionContext, ActionError, ActionResult, DispatchError, Dispatcher};
pub use http::{HttpServer, Request, Response};
pub use kernel::{Discovery, Kernel, KernelBuilder, KernelError};
pub use lifecycle::Shutdown;
pub use registry::ServiceRegistry;
pub use routing::{Handler, Method, RouteTable};
pub use view::{ViewData, ViewRenderer};
