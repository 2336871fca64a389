use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::debug;
use once_cell::sync::Lazy;

use crate::ApiDescriptor;

static GLOBAL: Lazy<Arc<DescriptorRegistry>> = Lazy::new(Default::default);

/// DescriptorRegistry maps API names to their descriptors.
///
/// Many callers may resolve concurrently; registration takes the write lock
/// only for the time needed to swap a map entry. Registering a name twice
/// replaces the earlier descriptor.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    apis: RwLock<HashMap<String, Arc<ApiDescriptor>>>,
}

impl DescriptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<DescriptorRegistry> {
        GLOBAL.clone()
    }

    /// Register `api` under `name`, replacing any earlier entry.
    pub fn register(&self, name: impl Into<String>, api: ApiDescriptor) {
        let name = name.into();
        debug!("register api descriptor `{name}`: {api:?}");

        let api = Arc::new(api);
        self.apis
            .write()
            .expect("lock poisoned")
            .insert(name, api);
    }

    /// Resolve the descriptor registered under `name`.
    pub fn resolve(&self, name: &str) -> Option<Arc<ApiDescriptor>> {
        self.apis.read().expect("lock poisoned").get(name).cloned()
    }

    /// Names of all registered descriptors, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .apis
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.apis.read().expect("lock poisoned").len()
    }

    /// Check if no descriptor is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_register_replaces() {
        let registry = DescriptorRegistry::new();
        let a = ApiDescriptor::new("http://a.example.com", "/a");
        let b = ApiDescriptor::new("http://b.example.com", "/b");

        registry.register("x", a.clone());
        assert_eq!(registry.resolve("x").as_deref(), Some(&a));

        registry.register("x", b.clone());
        assert_eq!(registry.resolve("x").as_deref(), Some(&b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_missing() {
        let registry = DescriptorRegistry::new();
        assert!(registry.resolve("missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolved_descriptor_survives_replacement() {
        let registry = DescriptorRegistry::new();
        registry.register("x", ApiDescriptor::new("http://old", "/"));
        let held = registry.resolve("x").unwrap();

        registry.register("x", ApiDescriptor::new("http://new", "/"));
        assert_eq!(held.host, "http://old");
        assert_eq!(registry.resolve("x").unwrap().host, "http://new");
    }

    #[test]
    fn test_concurrent_register_and_resolve() {
        let registry = Arc::new(DescriptorRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let name = format!("api-{i}");
                    for round in 0..100 {
                        registry.register(&name, ApiDescriptor::new(format!("http://{round}"), "/"));
                        let api = registry.resolve(&name).expect("registered above");
                        assert!(api.host.starts_with("http://"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.len(), 8);
        assert_eq!(registry.names()[0], "api-0");
        assert_eq!(registry.resolve("api-3").unwrap().host, "http://99");
    }
}
