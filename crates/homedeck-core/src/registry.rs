// ── Device type registry ──
//
// Maps a device type tag to the factory that builds its control binder.
// Device-type modules register themselves; resolution happens once per
// mount.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::binder::{ControlBinder, garage_door, lightbulb, switch};
use crate::error::CoreError;
use crate::model::DeviceDescriptor;

/// Builds a fresh, unbound binder for one device.
pub type BinderFactory = Arc<dyn Fn(&DeviceDescriptor) -> Box<dyn ControlBinder> + Send + Sync>;

#[derive(Default)]
pub struct DeviceTypeRegistry {
    factories: DashMap<String, BinderFactory>,
}

impl DeviceTypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in device type installed.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        switch::register(&registry);
        lightbulb::register(&registry);
        garage_door::register(&registry);
        registry
    }

    /// Register `factory` for `type_tag`, replacing any previous factory.
    pub fn register<F>(&self, type_tag: impl Into<String>, factory: F)
    where
        F: Fn(&DeviceDescriptor) -> Box<dyn ControlBinder> + Send + Sync + 'static,
    {
        self.register_factory(type_tag, Arc::new(factory));
    }

    pub fn register_factory(&self, type_tag: impl Into<String>, factory: BinderFactory) {
        let type_tag = type_tag.into();
        if self.factories.insert(type_tag.clone(), factory).is_some() {
            debug!(type_tag = %type_tag, "replaced binder factory");
        } else {
            debug!(type_tag = %type_tag, "registered binder factory");
        }
    }

    pub fn resolve(&self, type_tag: &str) -> Result<BinderFactory, CoreError> {
        self.factories
            .get(type_tag)
            .map(|f| Arc::clone(f.value()))
            .ok_or_else(|| CoreError::UnknownDeviceType {
                type_tag: type_tag.to_owned(),
            })
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }

    /// Registered tags, sorted.
    pub fn type_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        tags.sort();
        tags
    }
}

impl std::fmt::Debug for DeviceTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceTypeRegistry")
            .field("types", &self.type_tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::fallback::UnsupportedBinder;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_types_are_registered() {
        let registry = DeviceTypeRegistry::with_builtin();
        assert_eq!(
            registry.type_tags(),
            vec!["GarageDoorOpener", "Lightbulb", "Outlet", "Switch"]
        );
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = DeviceTypeRegistry::with_builtin();
        let err = registry.resolve("Thermostat").err().expect("unknown");
        assert!(
            matches!(err, CoreError::UnknownDeviceType { ref type_tag } if type_tag == "Thermostat")
        );
    }

    #[test]
    fn reregistering_replaces_factory() {
        let registry = DeviceTypeRegistry::with_builtin();
        registry.register("Switch", |_| Box::new(UnsupportedBinder));

        let d = DeviceDescriptor::new("s1", "Switch");
        let binder = registry.resolve("Switch").expect("switch")(&d);
        assert!(binder.render(&d).notice().is_some());
    }
}
