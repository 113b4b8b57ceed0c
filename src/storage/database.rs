//! Database façade: named collections over one storage directory.

use crate::error::{Error, Result};
use crate::hnsw::Parameters;
use crate::storage::collection::{store_file, validate_name, Collection};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Maps collection names to collection handles. With a storage directory,
/// collections persist as `<dir>/<name>.db` + `<dir>/<name>.hnsw`; without
/// one, every collection lives purely in memory.
#[derive(Clone, Default)]
pub struct Database {
    dir: Option<PathBuf>,
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl Database {
    /// A database whose collections are never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A database backed by `dir`. Existing `.db` files are picked up
    /// lazily by [`get_or_open_collection`](Self::get_or_open_collection)
    /// or eagerly by [`open`](Self::open).
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            collections: Arc::default(),
        }
    }

    /// Opens a persistent database and loads every collection with a store
    /// snapshot in the directory.
    pub fn open(dir: impl Into<PathBuf>, params: Parameters) -> Result<Self> {
        let dir = dir.into();
        let db = Self::persistent(dir.clone());
        if !dir.exists() {
            return Ok(db);
        }
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(crate::config::STORE_FILE_EXT) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Collection::open(&dir, name, params.clone()) {
                Ok(collection) => {
                    db.collections.write().insert(name.to_string(), collection);
                }
                Err(e) => {
                    tracing::warn!("failed to open collection '{name}': {e}");
                }
            }
        }
        Ok(db)
    }

    /// Creates a new empty collection. Fails with `CollectionExists` when
    /// the name is already taken, in memory or on disk.
    pub fn create_collection(&self, name: &str, params: Parameters) -> Result<Collection> {
        validate_name(name)?;
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(Error::CollectionExists(name.to_string()));
        }
        let collection = match &self.dir {
            Some(dir) => {
                if store_file(dir, name).exists() {
                    return Err(Error::CollectionExists(name.to_string()));
                }
                Collection::persistent(dir, name, params)?
            }
            None => Collection::in_memory(name, params),
        };
        collections.insert(name.to_string(), collection.clone());
        Ok(collection)
    }

    /// Returns a handle to a cached collection.
    pub fn get_collection(&self, name: &str) -> Result<Collection> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Returns a cached collection, falling back to its on-disk files.
    pub fn get_or_open_collection(&self, name: &str, params: Parameters) -> Result<Collection> {
        if let Ok(collection) = self.get_collection(name) {
            return Ok(collection);
        }
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        if !store_file(dir, name).exists() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        let collection = Collection::open(dir, name, params)?;
        self.collections
            .write()
            .insert(name.to_string(), collection.clone());
        Ok(collection)
    }

    /// Drops a collection and removes its backing files.
    /// Returns `false` if the name was unknown.
    pub fn delete_collection(&self, name: &str) -> Result<bool> {
        let removed = self.collections.write().remove(name);
        match removed {
            Some(collection) => {
                collection.delete_persisted_storage()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Names of all cached collections.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Persists every cached collection. A no-op for in-memory databases.
    pub fn persist(&self) -> Result<()> {
        let collections: Vec<Collection> = self.collections.read().values().cloned().collect();
        for collection in collections {
            collection.persist()?;
        }
        Ok(())
    }
}
