//! View rendering subsystem.
//!
//! # Data Flow
//! ```text
//! ActionContext::view / ::page
//!     → renderer.rs (resolve Role/Module/Views/file.ext, bind data + services)
//!     → partials referenced by the view loaded from the source tree
//!     → handlebars (evaluate with the t / url / asset helpers)
//!     → Rendered { body, warnings }
//!
//! With a layout:
//!     view body → data["content"] → views_root/layout.ext → Rendered
//! ```

pub mod renderer;

pub use renderer::{
    RenderContext, RenderError, RenderWarning, Rendered, ViewData, ViewRenderer, ViewSettings,
    CONTENT_KEY,
};
