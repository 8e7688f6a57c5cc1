//! URL generation service.

use serde_json::{json, Value};
use url::Url;

use crate::routing::path::normalize_path;

/// Builds absolute links against the site's public base URL.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    base: Url,
}

impl UrlGenerator {
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base)?;
        // joining is relative to the last path segment without a trailing slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        self.base.as_str()
    }

    /// Absolute URL for a route path. Slashes are normalized the same way
    /// the route table normalizes them.
    pub fn to(&self, path: &str) -> String {
        let path = normalize_path(path);
        match self.base.join(&path) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.base, path),
        }
    }

    /// Absolute URL for a static asset.
    pub fn asset(&self, path: &str) -> String {
        self.to(&format!("assets/{}", normalize_path(path)))
    }

    /// Bound in views as `url`.
    pub fn to_value(&self) -> Value {
        json!({ "base": self.base.as_str() })
    }
}
