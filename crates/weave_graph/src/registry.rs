// SPDX-License-Identifier: MIT OR Apache-2.0
//! Catalog of element types.
//!
//! The registry is built once at startup, then shared read-only (usually
//! behind an `Arc`) with everything that constructs nodes: graph edits and
//! package loading. It is never mutated while packages evaluate.

use crate::element::Element;
use indexmap::IndexMap;
use std::fmt;

/// Factory producing a fresh, default-configured element
pub type ElementFactory = Box<dyn Fn() -> Box<dyn Element> + Send + Sync>;

/// Descriptive metadata for an element type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMeta {
    /// Display name
    pub name: String,
    /// Icon resource path
    pub icon: String,
    /// Description
    pub description: String,
}

impl ElementMeta {
    /// Create metadata with an empty description
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
            description: String::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Borrowed view of one catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaInfo<'a> {
    /// Display name
    pub name: &'a str,
    /// Registry type name
    pub type_name: &'a str,
    /// Icon resource path
    pub icon: &'a str,
    /// Description
    pub description: &'a str,
}

impl MetaInfo<'_> {
    /// Palette category: the first path segment of the type, capitalised.
    ///
    /// `logic/not` is in `Logic`; a type without a `/` is its own category.
    pub fn category(&self) -> String {
        let head = self.type_name.split('/').next().unwrap_or(self.type_name);
        let mut chars = head.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

struct Entry {
    meta: ElementMeta,
    factory: ElementFactory,
}

/// Registry of available element types
pub struct Registry {
    entries: IndexMap<String, Entry>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Create a registry holding every built-in element.
    ///
    /// Fails with [`RegistryError::DuplicateType`] if two built-ins share a
    /// type name; callers treat that as fatal at startup.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        crate::elements::register_builtins(&mut registry)?;
        tracing::debug!(types = registry.size(), "registered built-in elements");
        Ok(registry)
    }

    /// Register an element type
    pub fn register<F>(
        &mut self,
        type_name: impl Into<String>,
        meta: ElementMeta,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<dyn Element> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self.entries.contains_key(&type_name) {
            return Err(RegistryError::DuplicateType(type_name));
        }
        tracing::debug!(type_name = %type_name, "registered element type");
        self.entries.insert(
            type_name,
            Entry {
                meta,
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Construct a fresh element of the given type
    pub fn create(&self, type_name: &str) -> Result<Box<dyn Element>, RegistryError> {
        self.entries
            .get(type_name)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| RegistryError::UnknownType(type_name.to_string()))
    }

    /// Whether a type is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Number of registered types
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Catalog entry at a position, in registration order
    pub fn meta_info_at(&self, index: usize) -> Option<MetaInfo<'_>> {
        self.entries
            .get_index(index)
            .map(|(type_name, entry)| Self::info(type_name, entry))
    }

    /// Catalog entry for a type
    pub fn meta_info(&self, type_name: &str) -> Option<MetaInfo<'_>> {
        self.entries
            .get_key_value(type_name)
            .map(|(type_name, entry)| Self::info(type_name, entry))
    }

    /// All catalog entries, in registration order
    pub fn list(&self) -> impl Iterator<Item = MetaInfo<'_>> {
        self.entries.iter().map(|(type_name, entry)| Self::info(type_name, entry))
    }

    /// Catalog entries whose category matches
    pub fn types_in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = MetaInfo<'a>> {
        self.list().filter(move |info| info.category() == category)
    }

    fn info<'a>(type_name: &'a str, entry: &'a Entry) -> MetaInfo<'a> {
        MetaInfo {
            name: &entry.meta.name,
            type_name,
            icon: &entry.meta.icon,
            description: &entry.meta.description,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Error when registering or resolving element types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Type name registered twice
    #[error("Duplicate element type: {0}")]
    DuplicateType(String),

    /// Type name not registered
    #[error("Unknown element type: {0}")]
    UnknownType(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::logic::Not;

    #[test]
    fn test_duplicate_type_rejected() {
        let mut registry = Registry::new();
        let meta = ElementMeta::new("NOT", "icons/logic/not.png");
        registry
            .register("logic/not", meta.clone(), || Box::new(Not::new()))
            .unwrap();
        let err = registry
            .register("logic/not", meta, || Box::new(Not::new()))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateType("logic/not".to_string()));
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_builtins_register_cleanly() {
        let registry = Registry::with_builtins().unwrap();
        for type_name in ["logic/not", "logic/toggle", "values/const_string", "math/clamp", "package"] {
            assert!(registry.contains(type_name), "{type_name}");
        }
    }

    #[test]
    fn test_create_unknown_type() {
        let registry = Registry::with_builtins().unwrap();
        let err = registry.create("logic/flux_capacitor").unwrap_err();
        assert_eq!(err, RegistryError::UnknownType("logic/flux_capacitor".to_string()));
    }

    #[test]
    fn test_create_yields_fresh_instances() {
        let registry = Registry::with_builtins().unwrap();
        let element = registry.create("logic/not").unwrap();
        assert_eq!(element.type_name(), "logic/not");
        assert_eq!(element.sockets().inputs().len(), 1);
        assert_eq!(element.sockets().outputs().len(), 1);
    }

    #[test]
    fn test_catalog_browsing() {
        let registry = Registry::with_builtins().unwrap();
        assert!(registry.size() > 10);

        let first = registry.meta_info_at(0).unwrap();
        assert_eq!(first.type_name, "logic/not");
        assert_eq!(first.name, "NOT");
        assert_eq!(first.category(), "Logic");
        assert!(registry.meta_info_at(registry.size()).is_none());

        let values: Vec<_> = registry.types_in_category("Values").collect();
        assert!(values.iter().any(|info| info.type_name == "values/int_to_float"));
        assert_eq!(registry.list().count(), registry.size());
    }

    #[test]
    fn test_category_of_flat_type() {
        let registry = Registry::with_builtins().unwrap();
        assert_eq!(registry.meta_info("package").unwrap().category(), "Package");
    }
}
