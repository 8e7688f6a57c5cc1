//! Dynamic, dot-addressed configuration store.
//!
//! The store holds a JSON tree so it can be handed to views unchanged.
//! `load` merges shallowly: a later source replaces a whole top-level key
//! instead of merging into it. `set` is destructive: a scalar found where a
//! mapping is needed is replaced by an empty mapping.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::loader::{read_table, ConfigError};

/// Where a batch of configuration comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// A literal mapping.
    Map(Map<String, Value>),
    /// A TOML file evaluated into a mapping.
    File(PathBuf),
}

impl From<Map<String, Value>> for ConfigSource {
    fn from(map: Map<String, Value>) -> Self {
        ConfigSource::Map(map)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::File(path.to_path_buf())
    }
}

/// Process-wide configuration tree.
///
/// Reads are lock-free snapshots; writes are copy-on-write.
#[derive(Debug, Default)]
pub struct ConfigStore {
    tree: ArcSwap<Map<String, Value>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a source into the store (top-level keys replace).
    pub fn load(&self, source: impl Into<ConfigSource>) -> Result<(), ConfigError> {
        let map = match source.into() {
            ConfigSource::Map(map) => map,
            ConfigSource::File(path) => {
                let table = read_table(&path)?;
                match serde_json::to_value(table)? {
                    Value::Object(map) => map,
                    _ => Map::new(),
                }
            }
        };

        let keys = map.len();
        self.tree.rcu(|current| {
            let mut next = Map::clone(current);
            for (key, value) in map.clone() {
                next.insert(key, value);
            }
            next
        });
        tracing::debug!(keys, "Config source merged");
        Ok(())
    }

    /// Value at `key`, or `default` when any segment is missing or a
    /// non-mapping is met before the last segment.
    pub fn get(&self, key: &str, default: Value) -> Value {
        let tree = self.tree.load();
        lookup(&tree, key).cloned().unwrap_or(default)
    }

    /// Value at `key` deserialized into `T`; `None` if absent or mistyped.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let tree = self.tree.load();
        lookup(&tree, key).and_then(|value| T::deserialize(value).ok())
    }

    /// Whether a value exists at `key`. A stored `null` counts as present.
    pub fn has(&self, key: &str) -> bool {
        let tree = self.tree.load();
        lookup(&tree, key).is_some()
    }

    /// Write `value` at `key`, creating (or clobbering) intermediate mappings.
    pub fn set(&self, key: &str, value: Value) {
        let segments: Vec<&str> = key.split('.').collect();
        self.tree.rcu(|current| {
            let mut next = Map::clone(current);
            insert_path(&mut next, &segments, value.clone());
            next
        });
    }

    /// The whole tree, for injection into views.
    pub fn snapshot(&self) -> Arc<Map<String, Value>> {
        self.tree.load_full()
    }
}

fn lookup<'a>(tree: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let first = segments.next()?;
    let mut current = tree.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert((*first).to_string(), value);
        return;
    }

    let entry = map
        .entry((*first).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(child) = entry {
        insert_path(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_get_returns_default_on_any_miss() {
        let store = ConfigStore::new();
        store.load(map(json!({ "a": { "b": 5 }, "x": { "y": { "z": 1 } } }))).unwrap();

        let default = json!("fallback");
        assert_eq!(store.get("missing.b.c", default.clone()), default);
        assert_eq!(store.get("x.missing.c", default.clone()), default);
        // a.b is a scalar, so a.b.c cannot be descended
        assert_eq!(store.get("a.b.c", default.clone()), default);
        assert_eq!(store.get("x.y.z", default), json!(1));
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let store = ConfigStore::new();
        store.set("db.primary.host", json!("10.0.0.5"));
        assert_eq!(store.get("db.primary.host", Value::Null), json!("10.0.0.5"));
        assert!(store.has("db.primary"));
    }

    #[test]
    fn test_set_clobbers_scalar_intermediate() {
        let store = ConfigStore::new();
        store.set("site", json!("plain"));
        store.set("site.title", json!("Greenfield"));
        assert_eq!(store.get("site", Value::Null), json!({ "title": "Greenfield" }));
    }

    #[test]
    fn test_load_is_shallow_merge() {
        let store = ConfigStore::new();
        store.load(map(json!({ "app": { "name": "A", "lang": "en" }, "keep": true }))).unwrap();
        store.load(map(json!({ "app": { "name": "B" } }))).unwrap();

        assert_eq!(store.get("app.name", Value::Null), json!("B"));
        assert!(!store.has("app.lang"), "top-level key is replaced, not merged");
        assert!(store.has("keep"));
    }

    #[test]
    fn test_has_counts_null_as_present() {
        let store = ConfigStore::new();
        store.set("feature.flag", Value::Null);
        assert!(store.has("feature.flag"));
        assert!(!store.has("feature.other"));
    }

    #[test]
    fn test_load_file_and_typed_get() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app]\nname = \"Greenfield High\"\nyear = 2026").unwrap();

        let store = ConfigStore::new();
        store.load(file.path()).unwrap();

        assert_eq!(store.get_as::<String>("app.name").as_deref(), Some("Greenfield High"));
        assert_eq!(store.get_as::<u32>("app.year"), Some(2026));
        assert_eq!(store.get_as::<u32>("app.name"), None);
    }
}
