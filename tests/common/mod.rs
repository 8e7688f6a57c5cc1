//! Shared utilities for integration tests.

use std::fs;
use std::path::Path;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use campus_kernel::KernelConfig;
use tempfile::TempDir;
use tower::ServiceExt;

/// A site laid out in a temporary directory.
pub struct Site {
    dir: TempDir,
}

#[allow(dead_code)]
impl Site {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Write `content` to `path` relative to the site root.
    pub fn file(&self, path: &str, content: &str) -> &Self {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Kernel config pointing at this site.
    pub fn config(&self) -> KernelConfig {
        let root = self.dir.path();
        let mut config = KernelConfig::default();
        config.paths.modules_root = root.join("modules").to_string_lossy().into_owned();
        config.paths.views_root = root.join("views").to_string_lossy().into_owned();
        config.i18n.directory = root.join("lang").to_string_lossy().into_owned();
        config.app.base_url = "https://school.example".into();
        config
    }
}

/// One route entry in route file syntax.
#[allow(dead_code)]
pub fn route(method: &str, path: &str, handler: &str) -> String {
    format!(
        "[[routes]]\nmethod = \"{}\"\npath = \"{}\"\nhandler = \"{}\"\n\n",
        method, path, handler
    )
}

/// Drive `router` with one request and collect the response.
#[allow(dead_code)]
pub async fn send(router: Router, method: &str, uri: &str) -> (StatusCode, HeaderMap, String) {
    let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}
