//! Class map and identity cache.
//!
//! The class map is closed once a connection is set up: every proxy type is
//! registered, then all schemas compile in one pass so nested object fields
//! can refer to any registered class. The identity cache keeps at most one
//! live proxy per id for the lifetime of the connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use boxwire_types::ObjectId;

use crate::error::SchemaError;
use crate::proxy::{ProxyClass, ProxyCore, ProxyRef};
use crate::schema::{compile, Schema, StatusDecl};

type Constructor = fn(ProxyCore) -> ProxyRef;

fn construct<T: ProxyClass>(core: ProxyCore) -> ProxyRef {
    Arc::new(T::from_core(core))
}

pub struct ClassEntry {
    pub class: &'static str,
    pub schema: Arc<Schema>,
    construct: Constructor,
}

impl ClassEntry {
    pub(crate) fn construct(&self, core: ProxyCore) -> ProxyRef {
        (self.construct)(core)
    }
}

/// Proxy types awaiting schema compilation.
#[derive(Default)]
pub struct ClassMapBuilder {
    pending: Vec<(&'static str, StatusDecl, Constructor)>,
}

impl ClassMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with every proxy type this crate ships.
    pub fn with_defaults() -> Self {
        use crate::proxy::*;
        Self::new()
            .register::<Master>()
            .register::<EngineConfig>()
            .register::<Engine>()
            .register::<Scene>()
            .register::<Layer>()
            .register::<Instrument>()
            .register::<SoundEngine>()
            .register::<Pattern>()
            .register::<Song>()
            .register::<Track>()
    }

    pub fn register<T: ProxyClass>(mut self) -> Self {
        self.pending.push((T::CLASS, T::declare(), construct::<T> as Constructor));
        self
    }

    /// Compile every registered status description.
    pub fn build(self) -> Result<ClassMap, SchemaError> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.pending.len());
        for (class, _, _) in &self.pending {
            if seen.contains(class) {
                return Err(SchemaError::DuplicateClass(class.to_string()));
            }
            seen.push(*class);
        }
        let known = |name: &str| seen.contains(&name);

        let mut entries = HashMap::with_capacity(self.pending.len());
        for (class, decl, ctor) in &self.pending {
            let schema = compile(class, decl, &known)?;
            entries.insert(
                *class,
                ClassEntry {
                    class: *class,
                    schema: Arc::new(schema),
                    construct: *ctor,
                },
            );
        }
        log::debug!(target: "registry", "compiled {} proxy schemas", entries.len());
        Ok(ClassMap { entries })
    }
}

/// Closed mapping from remote class name to proxy constructor and schema.
pub struct ClassMap {
    entries: HashMap<&'static str, ClassEntry>,
}

impl ClassMap {
    pub fn get(&self, class: &str) -> Option<&ClassEntry> {
        self.entries.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.entries.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identity → proxy cache.
#[derive(Default)]
pub struct Registry {
    cache: Mutex<HashMap<ObjectId, ProxyRef>>,
}

impl Registry {
    pub fn get(&self, id: ObjectId) -> Option<ProxyRef> {
        self.lock().get(&id).cloned()
    }

    /// Cache `proxy` unless another caller got there first. Returns the
    /// cached instance and whether it is the one just offered.
    pub fn insert_or_existing(&self, id: ObjectId, proxy: ProxyRef) -> (ProxyRef, bool) {
        let mut cache = self.lock();
        match cache.get(&id) {
            Some(existing) => (existing.clone(), false),
            None => {
                cache.insert(id, proxy.clone());
                (proxy, true)
            }
        }
    }

    /// Drop a cached proxy, e.g. after its post-construction hook failed.
    pub fn forget(&self, id: ObjectId) -> Option<ProxyRef> {
        self.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ObjectId, ProxyRef>> {
        // Poisoning is ignored: every critical section is a single map operation.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{Master, Pattern};

    #[test]
    fn test_default_classes_compile() {
        let map = ClassMapBuilder::with_defaults().build().unwrap();
        assert!(map.contains(Pattern::CLASS));
        assert!(map.contains(Master::CLASS));
        assert!(!map.contains("nonexistent"));
        assert!(map.get(Pattern::CLASS).unwrap().schema.field("length").is_some());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = ClassMapBuilder::new()
            .register::<Pattern>()
            .register::<Pattern>()
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateClass(_))));
    }

    #[test]
    fn test_missing_nested_class_fails_at_build() {
        // Scene refers to layer and instrument classes that are not registered.
        use crate::proxy::Scene;
        let result = ClassMapBuilder::new().register::<Scene>().build();
        assert!(matches!(result, Err(SchemaError::UnknownClass { .. })));
    }
}
