//! End-to-end collection scenarios: recall, filtering, persistence
//! round-trips, rebuild-on-delete, and concurrent readers with a writer.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use unichrome::{
    Collection, Database, DateRange, Embedder, FilterOperator, Metadata, MetadataFilter,
    Parameters, Result, SearchFilters,
};

fn meta(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|&(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn random_unit(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    let raw: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    raw.iter().map(|x| x / norm.max(1e-10)).collect()
}

/// Deterministic toy embedder: hashes bytes into a fixed-dim unit vector.
struct HashEmbedder {
    dim: usize,
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];
        for (i, b) in text.bytes().enumerate() {
            v[i % self.dim] += (b as f32 / 128.0) - 1.0 + (i as f32 * 0.01);
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        Ok(v.iter().map(|x| x / norm.max(1e-10)).collect())
    }
}

#[test]
fn insert_and_recall() {
    let col = Collection::in_memory("recall", Parameters::default());
    let c = 1.0 / 2.0f32.sqrt();
    let a = col.add_document("A", vec![1.0, 0.0, 0.0, 0.0], None).unwrap();
    col.add_document("B", vec![0.0, 1.0, 0.0, 0.0], None).unwrap();
    let cc = col.add_document("C", vec![c, c, 0.0, 0.0], None).unwrap();

    let hits = col
        .search(&[1.0, 0.0, 0.0, 0.0], 2, &SearchFilters::default())
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document.id, a);
    assert!(hits[0].distance.abs() < 1e-6);
    assert_eq!(hits[1].document.id, cc);
    assert!((hits[1].distance - (1.0 - c)).abs() < 1e-5);
}

#[test]
fn metadata_filter_returns_matching_documents_sorted() {
    let col = Collection::in_memory("sources", Parameters::default());
    col.add_document("n1", vec![1.0, 0.0], Some(meta(&[("source", "notion")])))
        .unwrap();
    col.add_document("s1", vec![0.95, 0.05], Some(meta(&[("source", "slack")])))
        .unwrap();
    col.add_document("n2", vec![0.8, 0.2], Some(meta(&[("source", "notion")])))
        .unwrap();

    let filters = SearchFilters {
        metadata: vec![MetadataFilter::new("source", FilterOperator::Eq, "notion")],
        ..Default::default()
    };
    let hits = col.search(&[1.0, 0.0], 3, &filters).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits
        .iter()
        .all(|h| h.document.metadata.get("source").map(String::as_str) == Some("notion")));
    assert!(hits[0].distance <= hits[1].distance);
}

#[test]
fn created_date_filter_selects_window() {
    let col = Collection::in_memory("dates", Parameters::default());
    col.add_document("first", vec![1.0, 0.0], None).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(10));
    let boundary = Utc::now();
    std::thread::sleep(std::time::Duration::from_millis(10));
    let second = col.add_document("second", vec![0.9, 0.1], None).unwrap();

    let filters = SearchFilters {
        created: Some(DateRange::new(boundary, boundary + Duration::hours(1))),
        ..Default::default()
    };
    let hits = col.search(&[1.0, 0.0], 2, &filters).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.id, second);
}

#[test]
fn persistence_roundtrip_matches_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    let col = Collection::persistent(dir.path(), "vectors", Parameters::default()).unwrap();
    for i in 0..100 {
        col.add_document(format!("doc-{i}"), random_unit(&mut rng, 64), None)
            .unwrap();
    }
    col.persist().unwrap();

    let reopened = Collection::open(dir.path(), "vectors", Parameters::default()).unwrap();
    reopened.validate().unwrap();

    for _ in 0..20 {
        let query = random_unit(&mut rng, 64);
        let before = col.search(&query, 10, &SearchFilters::default()).unwrap();
        let after = reopened
            .search(&query, 10, &SearchFilters::default())
            .unwrap();
        let before: Vec<(i32, f32)> = before.iter().map(|h| (h.document.id, h.distance)).collect();
        let after: Vec<(i32, f32)> = after.iter().map(|h| (h.document.id, h.distance)).collect();
        assert_eq!(before, after);
    }
}

#[test]
fn rebuild_after_delete_excludes_id_and_keeps_invariants() {
    let mut rng = StdRng::seed_from_u64(11);
    let col = Collection::in_memory("prune", Parameters::default());
    let mut vectors = Vec::new();
    for i in 0..50 {
        let v = random_unit(&mut rng, 16);
        vectors.push(v.clone());
        col.add_document(format!("doc-{i}"), v, None).unwrap();
    }

    let victim = 23;
    assert!(col.delete_document(victim).unwrap());
    col.validate().unwrap();
    assert!(!col.contains(victim));

    // Even a query aimed straight at the deleted vector must not return it.
    for query in [&vectors[23], &vectors[0], &vectors[49]] {
        let hits = col.search(query, 10, &SearchFilters::default()).unwrap();
        assert!(hits.iter().all(|h| h.document.id != victim));
        assert!(!hits.is_empty());
    }
}

#[test]
fn concurrent_readers_with_writer() {
    let col = Arc::new(Collection::in_memory("busy", Parameters::default()));
    let done = Arc::new(AtomicBool::new(false));
    let dim = 16;

    let mut readers = Vec::new();
    for seed in 0..4u64 {
        let col = Arc::clone(&col);
        let done = Arc::clone(&done);
        readers.push(std::thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(seed);
            while !done.load(Ordering::Relaxed) {
                let query = random_unit(&mut rng, dim);
                let hits = col
                    .search(&query, 10, &SearchFilters::default())
                    .expect("reader must not observe an error");
                for pair in hits.windows(2) {
                    assert!(pair[0].distance <= pair[1].distance);
                }
                for hit in &hits {
                    // Nothing is deleted in this test, so every returned id
                    // must belong to an already-assigned document.
                    assert!(col.contains(hit.document.id));
                }
            }
        }));
    }

    let mut rng = StdRng::seed_from_u64(99);
    for i in 0..1000 {
        col.add_document(format!("doc-{i}"), random_unit(&mut rng, dim), None)
            .unwrap();
    }
    done.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }

    col.validate().unwrap();
    assert_eq!(col.len(), 1000);
}

#[test]
fn distance_cache_hit_rate_bounded() {
    let mut rng = StdRng::seed_from_u64(3);
    let col = Collection::in_memory("cached", Parameters::default());
    for i in 0..60 {
        col.add_document(format!("doc-{i}"), random_unit(&mut rng, 8), None)
            .unwrap();
        let rate = col.distance_cache_hit_rate().unwrap();
        assert!((0.0..=1.0).contains(&rate));
    }
    // Construction re-examines pairs (best-peer updates, degree shrinking),
    // so a populated collection must have registered cache hits.
    assert!(col.distance_cache_hit_rate().unwrap() > 0.0);
    assert!(col.distance_calculations() > 0);
}

#[tokio::test]
async fn embedder_driven_add_update_and_search() {
    let embedder = HashEmbedder { dim: 8 };
    let col = Collection::in_memory("texts", Parameters::default());

    let ids = col
        .add_documents(
            &embedder,
            vec![
                "the quick brown fox".to_string(),
                "jumped over the lazy dog".to_string(),
                "completely unrelated text about databases".to_string(),
            ],
            Some(vec![meta(&[("lang", "en")])]),
        )
        .await
        .unwrap();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(
        col.get_document(0).unwrap().metadata.get("lang").map(String::as_str),
        Some("en")
    );

    // Searching with a stored text must surface that document first.
    let hits = col
        .search_text(&embedder, "the quick brown fox", 1, &SearchFilters::default())
        .await
        .unwrap();
    assert_eq!(hits[0].document.id, 0);
    assert!(hits[0].distance.abs() < 1e-5);

    // Update re-embeds; the old text no longer matches exactly.
    col.update_document(&embedder, 0, "replacement text", None)
        .await
        .unwrap();
    col.validate().unwrap();
    let doc = col.get_document(0).unwrap();
    assert_eq!(doc.text, "replacement text");
    assert!(doc.modified_at >= doc.created_at);

    let hits = col
        .search_text(&embedder, "replacement text", 1, &SearchFilters::default())
        .await
        .unwrap();
    assert_eq!(hits[0].document.id, 0);
}

#[test]
fn database_end_to_end_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(21);

    {
        let db = Database::persistent(dir.path());
        let notes = db.create_collection("notes", Parameters::default()).unwrap();
        let logs = db.create_collection("logs", Parameters::default()).unwrap();
        for i in 0..30 {
            notes
                .add_document(format!("note-{i}"), random_unit(&mut rng, 8), None)
                .unwrap();
            logs.add_document(format!("log-{i}"), random_unit(&mut rng, 4), None)
                .unwrap();
        }
        db.persist().unwrap();
    }

    let db = Database::open(dir.path(), Parameters::default()).unwrap();
    assert_eq!(db.list_collections(), vec!["logs", "notes"]);
    let notes = db.get_collection("notes").unwrap();
    notes.validate().unwrap();
    assert_eq!(notes.len(), 30);
    assert_eq!(notes.dimension(), Some(8));
}
