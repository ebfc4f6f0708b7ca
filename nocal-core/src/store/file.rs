//! JSON-file store: one file per collection inside a data directory.
//!
//! Every mutation holds an exclusive advisory lock on `<collection>.lock`
//! while it reads, edits and atomically replaces `<collection>.json`, so
//! request handling and maintenance jobs running in other processes each see
//! whole operations.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use super::document;
use super::{DocumentStore, StoreResult};

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

/// Releases the advisory lock when dropped.
struct CollectionLock {
    file: File,
}

impl Drop for CollectionLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn data_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    fn lock(&self, collection: &str, exclusive: bool) -> StoreResult<CollectionLock> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(format!("{collection}.lock")))?;

        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }
        Ok(CollectionLock { file })
    }

    fn load(&self, collection: &str) -> StoreResult<Value> {
        let path = self.data_path(collection);
        if !path.exists() {
            return Ok(Value::Object(Map::new()));
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn persist(&self, collection: &str, root: &Value) -> StoreResult<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, root)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.data_path(collection))
            .map_err(|e| e.error)?;
        Ok(())
    }

    fn read<T>(&self, collection: &str, f: impl FnOnce(&Value) -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.lock(collection, false)?;
        let root = self.load(collection)?;
        f(&root)
    }

    fn write<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Value) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let _guard = self.lock(collection, true)?;
        let mut root = self.load(collection)?;
        let result = f(&mut root)?;
        self.persist(collection, &root)?;
        Ok(result)
    }
}

impl DocumentStore for FileStore {
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
