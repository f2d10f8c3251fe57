//! Named-component registry.
//!
//! Configuration refers to generator stages, hooks and serializers by string
//! identifiers. A registry maps those identifiers to implementations once at
//! world start; nothing is re-resolved per call.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} `{name}` (known: {known})")]
pub struct UnknownComponent {
    pub kind: &'static str,
    pub name: String,
    pub known: String,
}

pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: BTreeMap<String, Arc<T>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, entries: BTreeMap::new() }
    }

    /// Register an implementation, returning any previous one under the same name.
    pub fn register(&mut self, name: impl Into<String>, component: Arc<T>) -> Option<Arc<T>> {
        self.entries.insert(name.into(), component)
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<T>, UnknownComponent> {
        self.get(name).ok_or_else(|| UnknownComponent {
            kind: self.kind,
            name: name.to_string(),
            known: self.names().collect::<Vec<_>>().join(", "),
        })
    }

    /// Resolve an ordered list of names, preserving order.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<T>>, UnknownComponent> {
        names.iter().map(|n| self.lookup(n.as_ref())).collect()
    }
}
