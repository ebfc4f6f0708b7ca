//! Document store adapters.
//!
//! The core only needs a handful of field-level operations from its store:
//! point lookups, `set`/`unset` of a single field, set-like array updates and
//! listing the keys of a sub-document. Each operation is atomic on its own;
//! nothing spans more than one call.

mod document;
mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde_json::Value;
use thiserror::Error;

/// Errors produced by store adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A path walks through (or targets) a value of the wrong type.
    #[error("Path conflict at '{0}'")]
    PathConflict(String),

    #[error("Empty document path")]
    EmptyPath,

    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Field-level document operations, addressed by collection and path.
pub trait DocumentStore: Send + Sync {
    /// Value at `path`, or None if any segment is missing.
    fn get(&self, collection: &str, path: &[&str]) -> StoreResult<Option<Value>>;

    /// Set the field at `path`, creating intermediate objects.
    fn set_field(&self, collection: &str, path: &[&str], value: Value) -> StoreResult<()>;

    /// Remove the field at `path`. Missing fields are not an error.
    fn unset_field(&self, collection: &str, path: &[&str]) -> StoreResult<()>;

    /// Append `value` to the array at `path` unless already present.
    fn add_to_set(&self, collection: &str, path: &[&str], value: Value) -> StoreResult<()>;

    /// Remove every occurrence of `value` from the array at `path`.
    fn remove_from_set(&self, collection: &str, path: &[&str], value: &Value) -> StoreResult<()>;

    /// Keys of the object at `path` (empty path lists the collection's top level).
    fn list_keys(&self, collection: &str, path: &[&str]) -> StoreResult<Vec<String>>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    fn get(&self, collection: &str, path: &[&str]) -> StoreResult<Option<Value>> {
        (**self).get(collection, path)
    }

    fn set_field(&self, collection: &str, path: &[&str], value: Value) -> StoreResult<()> {
        (**self).set_field(collection, path, value)
    }

    fn unset_field(&self, collection: &str, path: &[&str]) -> StoreResult<()> {
        (**self).unset_field(collection, path)
    }

    fn add_to_set(&self, collection: &str, path: &[&str], value: Value) -> StoreResult<()> {
        (**self).add_to_set(collection, path, value)
    }

    fn remove_from_set(&self, collection: &str, path: &[&str], value: &Value) -> StoreResult<()> {
        (**self).remove_from_set(collection, path, value)
    }

    fn list_keys(&self, collection: &str, path: &[&str]) -> StoreResult<Vec<String>> {
        (**self).list_keys(collection, path)
    }
}
