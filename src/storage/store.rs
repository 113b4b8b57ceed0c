//! In-memory document store with snapshot persistence.
//!
//! Documents are keyed by dense `i32` ids handed out by a monotone counter
//! that is never rewound, so an id is never reused even after deletions.
//! Iteration order is id order, which equals insertion order. The store
//! serializes to a self-contained `.db` snapshot that includes the counter.

use crate::document::{Document, Metadata};
use crate::error::{Error, Result};
use crate::storage::persistence::{self, STORE_MAGIC};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Owns every document of a collection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocumentStore {
    next_id: i32,
    documents: BTreeMap<i32, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next added document will receive.
    pub fn next_id(&self) -> i32 {
        self.next_id
    }

    /// Allocates an id and inserts a new document with both timestamps set
    /// to the current wall-clock time. Returns the id.
    pub fn add_document(&mut self, text: String, vector: Vec<f32>, metadata: Metadata) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        self.documents.insert(id, Document::new(id, text, vector, metadata));
        id
    }

    /// Replaces a document's content, touching only `modified_at`.
    pub fn update_document(
        &mut self,
        id: i32,
        text: String,
        vector: Vec<f32>,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        let doc = self
            .documents
            .get_mut(&id)
            .ok_or(Error::DocumentNotFound(id))?;
        doc.text = text;
        doc.vector = vector;
        if let Some(metadata) = metadata {
            doc.metadata = metadata;
        }
        doc.modified_at = Utc::now();
        Ok(())
    }

    /// Removes a document. Returns `false` if the id was absent.
    pub fn delete_document(&mut self, id: i32) -> bool {
        self.documents.remove(&id).is_some()
    }

    pub fn get(&self, id: i32) -> Option<&Document> {
        self.documents.get(&id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.documents.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents in insertion (id) order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Writes a self-contained snapshot, `next_id` included.
    pub fn persist(&self, path: &Path) -> Result<()> {
        persistence::save_snapshot(self, path, STORE_MAGIC)
    }

    /// Replaces the store's contents with a snapshot read from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let store: Self = persistence::load_snapshot(path, STORE_MAGIC)?;
        if let Some(&max_id) = store.documents.keys().next_back() {
            if store.next_id <= max_id {
                return Err(Error::Corrupted(format!(
                    "next_id {} not beyond max document id {max_id}",
                    store.next_id
                )));
            }
        }
        tracing::info!("loaded store {:?} ({} documents)", path, store.documents.len());
        Ok(store)
    }
}
