//! Path and name normalization shared by routing, dispatch and views.

/// Strip the query string and fragment, then trim leading and trailing slashes.
///
/// `/a/b/`, `a/b` and `/a/b?x=1` all normalize to `a/b`.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].trim_matches('/').to_string()
}

/// Non-empty segments of a normalized path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Case-normalize a role or module name: first letter upper case, rest lower.
pub fn normalize_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Role and module a request or a route file belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleModule {
    pub role: String,
    pub module: String,
}

impl RoleModule {
    /// Build a pair with both names case-normalized.
    pub fn new(role: &str, module: &str) -> Self {
        Self {
            role: normalize_name(role),
            module: normalize_name(module),
        }
    }

    /// Derive the pair from the first two segments of `path`, falling back
    /// to the defaults for missing segments.
    pub fn from_path(path: &str, default_role: &str, default_module: &str) -> Self {
        let mut parts = segments(path);
        let role = parts.next().unwrap_or(default_role);
        let module = parts.next().unwrap_or(default_module);
        Self::new(role, module)
    }
}

impl std::fmt::Display for RoleModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.role, self.module)
    }
}
