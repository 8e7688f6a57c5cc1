//! Controller registration and instantiation.
//!
//! # Responsibilities
//! - Map `(role, module, name)` to a no-argument controller factory
//! - Map action names to bound invocables on that controller type
//!
//! # Design Decisions
//! - Registration is explicit and typed; nothing is resolved by reflection
//! - Role and module are case-normalized, controller and action names are exact
//! - A fresh controller instance is built for every dispatch

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::dispatch::{ActionContext, ActionError, ActionResult};
use crate::routing::RoleModule;

/// Fully-qualified controller identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControllerKey {
    pub origin: RoleModule,
    pub name: String,
}

impl ControllerKey {
    pub fn new(role: &str, module: &str, name: impl Into<String>) -> Self {
        Self {
            origin: RoleModule::new(role, module),
            name: name.into(),
        }
    }

    pub fn for_origin(origin: &RoleModule, name: impl Into<String>) -> Self {
        Self {
            origin: origin.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ControllerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::Controllers::{}::{}", self.origin.role, self.origin.module, self.name)
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;
type ErasedAction =
    Box<dyn Fn(&mut (dyn Any + Send), &mut ActionContext<'_>) -> ActionResult + Send + Sync>;

/// Factory and actions of one controller type.
pub struct ControllerEntry {
    type_name: &'static str,
    factory: Factory,
    actions: HashMap<String, ErasedAction>,
}

impl ControllerEntry {
    /// Build a fresh instance.
    pub fn instantiate(&self) -> ControllerInstance<'_> {
        ControllerInstance {
            entry: self,
            instance: (self.factory)(),
        }
    }

    /// Registered action names, sorted.
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ControllerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerEntry")
            .field("type", &self.type_name)
            .field("actions", &self.actions())
            .finish()
    }
}

/// A live controller, valid for one dispatch.
pub struct ControllerInstance<'a> {
    entry: &'a ControllerEntry,
    instance: Box<dyn Any + Send>,
}

impl ControllerInstance<'_> {
    pub fn has_action(&self, name: &str) -> bool {
        self.entry.actions.contains_key(name)
    }

    /// Invoke `name`; `None` if the controller has no such action.
    pub fn invoke(&mut self, name: &str, cx: &mut ActionContext<'_>) -> Option<ActionResult> {
        let action = self.entry.actions.get(name)?;
        Some(action(self.instance.as_mut(), cx))
    }
}

/// Startup-time table of every controller the site provides.
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    controllers: HashMap<ControllerKey, ControllerEntry>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register controller type `C` under `role/module/name` and return a
    /// builder for its actions. Registering the same key again replaces it.
    pub fn register<C>(&mut self, role: &str, module: &str, name: &str) -> ControllerBuilder<'_, C>
    where
        C: Default + Send + 'static,
    {
        let key = ControllerKey::new(role, module, name);
        tracing::debug!(controller = %key, "Registering controller");
        let entry = ControllerEntry {
            type_name: std::any::type_name::<C>(),
            factory: Box::new(|| Box::new(C::default()) as Box<dyn Any + Send>),
            actions: HashMap::new(),
        };
        let slot = match self.controllers.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut occupied) => {
                tracing::warn!(controller = %occupied.key(), "Controller re-registered, replacing");
                occupied.insert(entry);
                occupied.into_mut()
            }
            std::collections::hash_map::Entry::Vacant(vacant) => vacant.insert(entry),
        };
        ControllerBuilder {
            entry: slot,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn get(&self, key: &ControllerKey) -> Option<&ControllerEntry> {
        self.controllers.get(key)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Registered keys, sorted by display name.
    pub fn keys(&self) -> Vec<&ControllerKey> {
        let mut keys: Vec<&ControllerKey> = self.controllers.keys().collect();
        keys.sort_by_key(|k| k.to_string());
        keys
    }
}

/// Adds actions to a freshly registered controller.
pub struct ControllerBuilder<'a, C> {
    entry: &'a mut ControllerEntry,
    _marker: std::marker::PhantomData<fn() -> C>,
}

impl<C: Send + 'static> ControllerBuilder<'_, C> {
    pub fn action<F>(self, name: &str, action: F) -> Self
    where
        F: Fn(&mut C, &mut ActionContext<'_>) -> ActionResult + Send + Sync + 'static,
    {
        let type_name = self.entry.type_name;
        let erased: ErasedAction = Box::new(
            move |instance: &mut (dyn Any + Send), cx: &mut ActionContext<'_>| {
                match instance.downcast_mut::<C>() {
                    Some(controller) => action(controller, cx),
                    None => Err(ActionError::Failed(format!(
                        "controller instance is not a {}",
                        type_name
                    ))),
                }
            },
        );
        self.entry.actions.insert(name.to_string(), erased);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        hits: u32,
    }

    impl Counter {
        fn bump(&mut self, _cx: &mut ActionContext<'_>) -> ActionResult {
            self.hits += 1;
            Ok(())
        }
    }

    #[test]
    fn test_key_display_and_normalization() {
        let key = ControllerKey::new("admin", "USERS", "UsersController");
        assert_eq!(key.to_string(), "Admin::Controllers::Users::UsersController");
        assert_eq!(key, ControllerKey::new("Admin", "Users", "UsersController"));
    }

    #[test]
    fn test_register_and_lookup_actions() {
        let mut registry = ControllerRegistry::new();
        registry
            .register::<Counter>("App", "Home", "CounterController")
            .action("bump", Counter::bump)
            .action("noop", |_c: &mut Counter, _cx: &mut ActionContext<'_>| Ok(()));

        let entry = registry.get(&ControllerKey::new("app", "home", "CounterController")).unwrap();
        assert_eq!(entry.actions(), vec!["bump", "noop"]);

        let instance = entry.instantiate();
        assert!(instance.has_action("bump"));
        assert!(!instance.has_action("Bump"), "action names are exact");
        assert!(registry.get(&ControllerKey::new("App", "Home", "countercontroller")).is_none());
    }

    #[test]
    fn test_reregistration_replaces_actions() {
        let mut registry = ControllerRegistry::new();
        registry.register::<Counter>("App", "Home", "C").action("bump", Counter::bump);
        registry.register::<Counter>("App", "Home", "C");
        let entry = registry.get(&ControllerKey::new("App", "Home", "C")).unwrap();
        assert!(entry.actions().is_empty());
        assert_eq!(registry.len(), 1);
    }
}
