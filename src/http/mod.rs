//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing)
//!     → request.rs (buffer body, parse cookies and query)
//!     → Dispatcher on the blocking pool, under the request deadline
//!     → response.rs (status, headers, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Request, RequestError, X_REQUEST_ID};
pub use response::Response;
pub use server::{HttpServer, MakeRequestUuid};
