//! In-memory store, used by tests and embedders that bring their own persistence.

use std::sync::RwLock;

use serde_json::{Map, Value};

use super::document;
use super::{DocumentStore, StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a whole collection document.
    pub fn dump(&self, collection: &str) -> StoreResult<Value> {
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        Ok(collections
            .get(collection)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    fn read<T>(&self, collection: &str, f: impl FnOnce(&Value) -> StoreResult<T>) -> StoreResult<T> {
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        match collections.get(collection) {
            Some(root) => f(root),
            None => f(&Value::Object(Map::new())),
        }
    }

    fn write<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Value) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut collections = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        let root = collections
            .entry(collection.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        f(root)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, path: &[&str]) -> StoreResult<Option<Value>> {
        self.read(collection, |root| Ok(document::lookup(root, path).cloned()))
    }

    fn set_field(&self, collection: &str, path: &[&str], value: Value) -> StoreResult<()> {
        self.write(collection, |root| document::set(root, path, value))
    }

    fn unset_field(&self, collection: &str, path: &[&str]) -> StoreResult<()> {
        self.write(collection, |root| document::unset(root, path))
    }

    fn add_to_set(&self, collection: &str, path: &[&str], value: Value) -> StoreResult<()> {
        self.write(collection, |root| document::add_to_set(root, path, value))
    }

    fn remove_from_set(&self, collection: &str, path: &[&str], value: &Value) -> StoreResult<()> {
        self.write(collection, |root| document::remove_from_set(root, path, value))
    }

    fn list_keys(&self, collection: &str, path: &[&str]) -> StoreResult<Vec<String>> {
        self.read(collection, |root| document::keys(root, path))
    }
}
