//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with a single fallback into the dispatcher
//! - Wire up middleware (request id, tracing)
//! - Run synchronous dispatch on the blocking pool under the request deadline
//! - Record request metrics
//! - Serve with graceful shutdown

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::{HeaderName, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::dispatch::DispatchError;
use crate::http::request::{Request, X_REQUEST_ID};
use crate::http::response::Response;
use crate::kernel::Kernel;
use crate::observability::metrics;

/// Application state injected into the handler.
#[derive(Clone)]
struct AppState {
    kernel: Arc<Kernel>,
    deadline: Duration,
    body_limit: usize,
}

/// UUID v4 request ids for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        Uuid::new_v4().to_string().parse().ok().map(RequestId::new)
    }
}

/// HTTP front end of a [`Kernel`].
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(kernel: Arc<Kernel>) -> Self {
        let config = kernel.config();
        let state = AppState {
            deadline: Duration::from_secs(config.timeouts.request_secs),
            body_limit: config.listener.max_body_size,
            kernel,
        };
        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .fallback(kernel_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    /// The router, for driving the server without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn kernel_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = match Request::from_http(request, state.body_limit).await {
        Ok(request) => dispatch(&state, request).await,
        Err(e) => {
            tracing::warn!(method = %method, error = %e, "Rejected request body");
            Response::text(e.status(), e.to_string())
        }
    };

    let status = response.status();
    metrics::record_request(&method, status.as_u16(), outcome(status), start);
    response.into_response()
}

async fn dispatch(state: &AppState, request: Request) -> Response {
    let dispatcher = state.kernel.dispatcher().clone();
    let request_id = request.request_id().to_string();

    let worker = dispatcher.clone();
    let task = tokio::task::spawn_blocking(move || worker.dispatch(&request));

    match tokio::time::timeout(state.deadline, task).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, error = %e, "Dispatch task failed");
            dispatcher.error_response(&DispatchError::Panicked)
        }
        Err(_) => {
            tracing::warn!(
                request_id = %request_id,
                deadline = ?state.deadline,
                "Request deadline exceeded"
            );
            dispatcher.error_response(&DispatchError::Timeout(state.deadline))
        }
    }
}

fn outcome(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "server_error"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "success"
    }
}
