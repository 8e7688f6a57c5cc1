//! Named shared-service registry.
//!
//! # Responsibilities
//! - Store one shared instance per name (last write wins)
//! - Hand out typed `Arc` handles to controllers and views
//!
//! # Design Decisions
//! - Lookups never fail loudly: a missing name or a type mismatch is `None`
//! - Concurrent map so one registry can serve every request of the process
//! - Populated during bootstrap, read-mostly afterwards

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;

/// Name under which the [`ConfigStore`](crate::config::ConfigStore) is registered.
pub const CONFIG: &str = "config";
/// Name under which the [`Language`](crate::services::Language) service is registered.
pub const LANGUAGE: &str = "language";
/// Name under which the [`UrlGenerator`](crate::services::UrlGenerator) is registered.
pub const URL: &str = "url";
/// Name under which the database collaborator is registered.
pub const DATABASE: &str = "database";

type Instance = Arc<dyn Any + Send + Sync>;

/// Named-singleton container.
#[derive(Default)]
pub struct ServiceRegistry {
    services: DashMap<String, Instance>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace the instance registered under `name`.
    pub fn set<T: Send + Sync + 'static>(&self, name: impl Into<String>, instance: Arc<T>) {
        let name = name.into();
        if self.services.insert(name.clone(), instance).is_some() {
            tracing::debug!(service = %name, "Replaced registered service");
        }
    }

    /// The instance under `name`, if one exists and has type `T`.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        let instance = self.services.get(name)?.value().clone();
        instance.downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .finish()
    }
}
