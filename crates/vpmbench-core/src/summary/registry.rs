//! Name → factory registries.

use std::collections::BTreeMap;
use std::fmt;

type Factory<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

/// Ordered mapping from display name to a factory producing `T`.
///
/// Populated explicitly by each module's `register` function; nothing is
/// discovered implicitly.
pub struct Registry<T: ?Sized> {
    factories: BTreeMap<&'static str, Factory<T>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        if self.factories.insert(name, Box::new(factory)).is_some() {
            tracing::debug!(name, "replaced registry entry");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn instantiate(&self, name: &str) -> Option<Box<T>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// One fresh instance of every entry, in name order.
    pub fn all(&self) -> Vec<Box<T>> {
        self.factories.values().map(|factory| factory()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}
