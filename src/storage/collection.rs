//! Collection engine: documents plus an HNSW graph behind one lock.
//!
//! A collection pairs a [`DocumentStore`] with a [`Graph`] under a
//! single-writer / multi-reader lock. Graph node ids are dense and
//! allocation-ordered, so `id_map` translates them back to (possibly
//! sparse) document ids. Deletes and updates rebuild the graph from the
//! surviving documents: HNSW has no native deletion, and the rebuild
//! keeps every structural invariant intact at the cost of O(N) writes.
//!
//! Persistent collections keep two files per name: `<name>.db` (the store,
//! self-contained) and `<name>.hnsw` (graph topology only; vectors are
//! re-attached from the store on open).

use crate::config;
use crate::document::{Document, Metadata};
use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::hnsw::{Graph, GraphSnapshot, Parameters};
use crate::search::{SearchFilters, SearchResult};
use crate::storage::persistence::{self, GRAPH_MAGIC};
use crate::storage::store::DocumentStore;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
struct CollectionState {
    name: String,
    store: DocumentStore,
    graph: Graph,
    /// Graph node id → document id, in node allocation order.
    id_map: Vec<i32>,
    /// Directory of the backing files; `None` for in-memory collections.
    dir: Option<PathBuf>,
}

impl CollectionState {
    fn store_path(&self) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| d.join(format!("{}.{}", self.name, config::STORE_FILE_EXT)))
    }

    fn graph_path(&self) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| d.join(format!("{}.{}", self.name, config::GRAPH_FILE_EXT)))
    }

    /// Discards the graph and rebuilds it from every stored document,
    /// reusing the parameters (and therefore the kernel) of the old graph.
    fn rebuild_graph(&mut self) -> Result<()> {
        let params = self.graph.params().clone();
        let vectors: Vec<Vec<f32>> = self.store.documents().map(|d| d.vector.clone()).collect();
        let id_map: Vec<i32> = self.store.documents().map(|d| d.id).collect();

        let mut graph = Graph::new(params);
        graph.add_items(vectors)?;
        self.graph = graph;
        self.id_map = id_map;
        tracing::debug!(
            "rebuilt graph for collection '{}' ({} documents)",
            self.name,
            self.id_map.len()
        );
        Ok(())
    }
}

/// A named, internally synchronized set of documents with a vector index.
///
/// Cloning produces another handle to the same shared state. All writes
/// serialize on an internal writer lock; reads run concurrently.
#[derive(Clone, Debug)]
pub struct Collection {
    inner: Arc<RwLock<CollectionState>>,
}

/// A collection name doubles as a file-name stem, so it is restricted to
/// alphanumerics, `-`, and `_`.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidCollectionName(name.to_string()))
    }
}

impl Collection {
    /// Creates an empty collection with no backing files.
    pub fn in_memory(name: impl Into<String>, params: Parameters) -> Self {
        Self::from_state(name.into(), DocumentStore::new(), Graph::new(params), Vec::new(), None)
    }

    /// Creates an empty collection that will persist under `dir`.
    pub fn persistent(
        dir: impl Into<PathBuf>,
        name: impl Into<String>,
        params: Parameters,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self::from_state(
            name,
            DocumentStore::new(),
            Graph::new(params),
            Vec::new(),
            Some(dir.into()),
        ))
    }

    /// Opens a persisted collection: loads the `.db` store, then the
    /// `.hnsw` topology if present. When the topology file is missing or
    /// unreadable the graph is rebuilt from the stored documents with
    /// `params` and immediately re-persisted.
    pub fn open(dir: impl Into<PathBuf>, name: impl Into<String>, params: Parameters) -> Result<Self> {
        let dir = dir.into();
        let name = name.into();
        validate_name(&name)?;

        let store_path = dir.join(format!("{name}.{}", config::STORE_FILE_EXT));
        let graph_path = dir.join(format!("{name}.{}", config::GRAPH_FILE_EXT));

        let store = DocumentStore::load(&store_path)?;
        let vectors: Vec<Vec<f32>> = store.documents().map(|d| d.vector.clone()).collect();
        let id_map: Vec<i32> = store.documents().map(|d| d.id).collect();

        let loaded = if graph_path.exists() {
            persistence::load_snapshot::<GraphSnapshot>(&graph_path, GRAPH_MAGIC)
                .and_then(|snapshot| Graph::from_snapshot(snapshot, vectors.clone()))
                .map_err(|e| {
                    tracing::warn!("graph snapshot for '{name}' unusable, rebuilding: {e}");
                    e
                })
                .ok()
        } else {
            tracing::warn!("no graph snapshot for '{name}', rebuilding from documents");
            None
        };

        let collection = match loaded {
            Some(graph) => Self::from_state(name, store, graph, id_map, Some(dir)),
            None => {
                let mut graph = Graph::new(params);
                graph.add_items(vectors)?;
                let collection = Self::from_state(name, store, graph, id_map, Some(dir));
                collection.persist()?;
                collection
            }
        };
        Ok(collection)
    }

    fn from_state(
        name: String,
        store: DocumentStore,
        graph: Graph,
        id_map: Vec<i32>,
        dir: Option<PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CollectionState {
                name,
                store,
                graph,
                id_map,
                dir,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.read().name.clone()
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.read().dir.is_some()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.inner.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().store.is_empty()
    }

    /// Vector dimensionality, fixed by the first inserted document.
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().graph.dimension()
    }

    /// Inserts a document with a caller-supplied vector. Returns its id.
    pub fn add_document(
        &self,
        text: impl Into<String>,
        vector: Vec<f32>,
        metadata: Option<Metadata>,
    ) -> Result<i32> {
        let mut state = self.inner.write();
        check_dimension(&state.graph, vector.len())?;

        let id = state
            .store
            .add_document(text.into(), vector.clone(), metadata.unwrap_or_default());
        state.graph.add_items(vec![vector])?;
        state.id_map.push(id);
        Ok(id)
    }

    /// Embeds a batch of texts and inserts them in one graph operation.
    /// Missing metadata entries default to empty maps.
    pub async fn add_documents<E>(
        &self,
        embedder: &E,
        texts: Vec<String>,
        metadatas: Option<Vec<Metadata>>,
    ) -> Result<Vec<i32>>
    where
        E: Embedder + ?Sized,
    {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        // Embed before taking the writer lock; the lock is never held
        // across a suspension point.
        let vectors = embedder.encode_batch(&texts).await?;

        let mut metadatas = metadatas.unwrap_or_default();
        metadatas.resize_with(texts.len(), Metadata::new);

        let mut state = self.inner.write();
        // Reject the whole batch up front so the store and graph never
        // diverge on a partial failure.
        let expected = state
            .graph
            .dimension()
            .unwrap_or_else(|| vectors[0].len());
        for vector in &vectors {
            if vector.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    got: vector.len(),
                });
            }
        }

        let mut ids = Vec::with_capacity(texts.len());
        for ((text, vector), metadata) in texts.into_iter().zip(&vectors).zip(metadatas) {
            ids.push(state.store.add_document(text, vector.clone(), metadata));
        }
        state.graph.add_items(vectors)?;
        state.id_map.extend(&ids);
        Ok(ids)
    }

    /// Fetches a document by id, or `None`.
    pub fn try_get_document(&self, id: i32) -> Option<Document> {
        self.inner.read().store.get(id).cloned()
    }

    /// Fetches a document by id, failing with `DocumentNotFound`.
    pub fn get_document(&self, id: i32) -> Result<Document> {
        self.try_get_document(id)
            .ok_or(Error::DocumentNotFound(id))
    }

    pub fn contains(&self, id: i32) -> bool {
        self.inner.read().store.contains(id)
    }

    /// Snapshot of every document in insertion order.
    pub fn documents(&self) -> Vec<Document> {
        self.inner.read().store.documents().cloned().collect()
    }

    /// Deletes a document and rebuilds the graph over the survivors.
    /// Returns `false` if the id was absent.
    pub fn delete_document(&self, id: i32) -> Result<bool> {
        let mut state = self.inner.write();
        if !state.store.delete_document(id) {
            return Ok(false);
        }
        state.rebuild_graph()?;
        Ok(true)
    }

    /// Re-embeds a document's new text, updates the store, and rebuilds
    /// the graph.
    pub async fn update_document<E>(
        &self,
        embedder: &E,
        id: i32,
        text: impl Into<String>,
        metadata: Option<Metadata>,
    ) -> Result<()>
    where
        E: Embedder + ?Sized,
    {
        let text = text.into();
        let vector = embedder.encode(&text).await?;
        self.update_document_with_vector(id, text, vector, metadata)
    }

    /// Update variant for callers that already hold the new vector.
    pub fn update_document_with_vector(
        &self,
        id: i32,
        text: impl Into<String>,
        vector: Vec<f32>,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        let mut state = self.inner.write();
        check_dimension(&state.graph, vector.len())?;
        state.store.update_document(id, text.into(), vector, metadata)?;
        state.rebuild_graph()
    }

    /// k-NN search with optional post-filters. Results are in ascending
    /// distance; filtering may return fewer than `k` documents.
    pub fn search(
        &self,
        vector: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>> {
        let state = self.inner.read();
        let neighbors = state.graph.k_nearest(vector, k)?;

        let mut results: Vec<SearchResult> = neighbors
            .into_iter()
            .filter_map(|n| {
                let doc_id = *state.id_map.get(n.id as usize)?;
                let doc = state.store.get(doc_id)?;
                filters.matches(doc).then(|| SearchResult {
                    document: doc.clone(),
                    distance: n.distance,
                })
            })
            .collect();
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        Ok(results)
    }

    /// Embeds the query text and searches.
    pub async fn search_text<E>(
        &self,
        embedder: &E,
        text: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>>
    where
        E: Embedder + ?Sized,
    {
        let vector = embedder.encode(text).await?;
        self.search(&vector, k, filters)
    }

    /// Writes both backing files. A no-op for in-memory collections.
    pub fn persist(&self) -> Result<()> {
        let state = self.inner.write();
        let (Some(store_path), Some(graph_path)) = (state.store_path(), state.graph_path())
        else {
            return Ok(());
        };
        state.store.persist(&store_path)?;
        persistence::save_snapshot(&state.graph.snapshot(), &graph_path, GRAPH_MAGIC)
    }

    /// Removes the backing files, leaving the in-memory state untouched.
    pub fn delete_persisted_storage(&self) -> Result<()> {
        let state = self.inner.write();
        for path in [state.store_path(), state.graph_path()].into_iter().flatten() {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Construction-cache hit rate of the current graph, if caching is on.
    pub fn distance_cache_hit_rate(&self) -> Option<f64> {
        self.inner.read().graph.distance_cache_hit_rate()
    }

    /// Total distance computations performed by the current graph.
    pub fn distance_calculations(&self) -> u64 {
        self.inner.read().graph.distance_calculations()
    }

    /// Structural consistency check over graph and store, for tests and
    /// post-load validation.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let state = self.inner.read();
        state.graph.validate()?;
        if state.id_map.len() != state.graph.len() {
            return Err(format!(
                "id_map has {} entries for {} nodes",
                state.id_map.len(),
                state.graph.len()
            ));
        }
        for doc_id in &state.id_map {
            if !state.store.contains(*doc_id) {
                return Err(format!("id_map references missing document {doc_id}"));
            }
        }
        Ok(())
    }
}

fn check_dimension(graph: &Graph, got: usize) -> Result<()> {
    match graph.dimension() {
        Some(expected) if expected != got => Err(Error::DimensionMismatch { expected, got }),
        _ => Ok(()),
    }
}

/// Directory path of a collection's store file.
pub(crate) fn store_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{}", config::STORE_FILE_EXT))
}
