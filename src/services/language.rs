//! Localization service.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use crate::source::SourceTree;

/// Message table for one locale.
///
/// Nested TOML tables are flattened into dot keys, so `[home] title = ".."`
/// is looked up as `home.title`.
#[derive(Debug, Clone, Default)]
pub struct Language {
    locale: String,
    messages: BTreeMap<String, String>,
}

impl Language {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            messages: BTreeMap::new(),
        }
    }

    /// Load `{directory}/{locale}.toml`. A missing or unparsable file yields
    /// an empty table and a warning.
    pub fn load(tree: &dyn SourceTree, directory: &Path, locale: &str) -> Self {
        let mut language = Self::new(locale);
        let path = directory.join(format!("{}.toml", locale));

        let content = match tree.read_file(&path) {
            Ok(Some(content)) => content,
            Ok(None) => {
                tracing::warn!(path = ?path, locale, "No message file for locale");
                return language;
            }
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to read message file");
                return language;
            }
        };

        match toml::from_str::<toml::Table>(&content) {
            Ok(table) => flatten("", &toml::Value::Table(table), &mut language.messages),
            Err(e) => tracing::warn!(path = ?path, error = %e, "Invalid message file"),
        }
        tracing::debug!(locale, messages = language.messages.len(), "Messages loaded");
        language
    }

    pub fn with_message(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(key.into(), text.into());
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Translation for `key`, or the key itself when unknown.
    pub fn translate<'a>(&'a self, key: &'a str) -> &'a str {
        self.messages.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Messages as a JSON object, bound in views as `language`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("locale".into(), Value::String(self.locale.clone()));
        let messages = self
            .messages
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        map.insert("messages".into(), Value::Object(messages));
        Value::Object(map)
    }
}

fn flatten(prefix: &str, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                let next = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&next, child, out);
            }
        }
        toml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}
