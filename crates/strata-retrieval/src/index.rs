//! In-memory collection index with brute-force cosine-distance search.
//!
//! One index backs one category. Indexes are written by the external
//! ingestion component as JSON files and loaded read-only at startup;
//! `insert`/`save` exist as that component's interface boundary.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use strata_core::error::StrataError;

use crate::collection::CollectionHit;

/// A single embedded chunk of source material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Originating document, e.g. `lectures/week3.pdf`.
    pub source: String,
    /// Page or offset within the source document.
    pub page: u32,
    /// Chunk text.
    pub content: String,
    /// Embedding vector for the chunk text.
    pub embedding: Vec<f32>,
}

/// In-memory index over one category's chunks.
///
/// Thread-safe via interior RwLock. Search is O(n) per query, which is
/// acceptable for lecture-scale collections.
#[derive(Debug, Clone, Default)]
pub struct CollectionIndex {
    chunks: Arc<RwLock<Vec<IndexedChunk>>>,
}

impl CollectionIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an index from a JSON file produced by the ingestion component.
    pub fn load(path: &Path) -> Result<Self, StrataError> {
        let content = std::fs::read_to_string(path)?;
        let chunks: Vec<IndexedChunk> = serde_json::from_str(&content)?;
        Ok(Self {
            chunks: Arc::new(RwLock::new(chunks)),
        })
    }

    /// Save the index to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), StrataError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let chunks = self
            .chunks
            .read()
            .map_err(|e| StrataError::Index(format!("Lock poisoned: {}", e)))?;
        let content = serde_json::to_string(&*chunks)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Insert a chunk into the index.
    pub fn insert(&self, chunk: IndexedChunk) -> Result<(), StrataError> {
        let mut chunks = self
            .chunks
            .write()
            .map_err(|e| StrataError::Index(format!("Lock poisoned: {}", e)))?;
        chunks.push(chunk);
        Ok(())
    }

    /// Find the k nearest chunks to the query vector by cosine distance.
    ///
    /// Returns hits sorted by ascending distance (lower = more similar);
    /// ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<CollectionHit>, StrataError> {
        let chunks = self
            .chunks
            .read()
            .map_err(|e| StrataError::Index(format!("Lock poisoned: {}", e)))?;

        let mut hits: Vec<CollectionHit> = chunks
            .iter()
            .map(|chunk| CollectionHit {
                source: chunk.source.clone(),
                page: chunk.page,
                content: chunk.content.clone(),
                distance: cosine_distance(query, &chunk.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// Return the number of chunks currently stored.
    pub fn len(&self) -> usize {
        self.chunks.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Return true if the index contains no chunks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute cosine distance between two vectors: `1 - cosine_similarity`.
///
/// Returns the maximum distance (1.0) if either vector has zero magnitude
/// or the lengths differ.
fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 1.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, page: u32, content: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            source: source.to_string(),
            page,
            content: content.to_string(),
            embedding,
        }
    }

    // ---- Search ----

    #[test]
    fn test_insert_and_search() {
        let index = CollectionIndex::new();
        index
            .insert(chunk("a.pdf", 1, "near", vec![1.0, 0.0]))
            .unwrap();
        index
            .insert(chunk("b.pdf", 2, "far", vec![-1.0, 0.0]))
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "near");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_search_empty_index() {
        let index = CollectionIndex::new();
        let hits = index.search(&[1.0, 0.0], 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_respects_k_limit() {
        let index = CollectionIndex::new();
        for i in 0..10 {
            index
                .insert(chunk("doc.pdf", i, "text", vec![1.0, 0.0]))
                .unwrap();
        }

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_ascending_distance() {
        let index = CollectionIndex::new();
        index
            .insert(chunk("a.pdf", 1, "orthogonal", vec![0.0, 1.0]))
            .unwrap();
        index
            .insert(chunk("a.pdf", 2, "identical", vec![1.0, 0.0]))
            .unwrap();
        index
            .insert(chunk("a.pdf", 3, "opposite", vec![-1.0, 0.0]))
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(hits[0].content, "identical");
        assert_eq!(hits[1].content, "orthogonal");
        assert_eq!(hits[2].content, "opposite");
        assert!(hits[0].distance < 1e-6);
    }

    // ---- Persistence ----

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lectures.json");

        let index = CollectionIndex::new();
        index
            .insert(chunk("week3.pdf", 12, "grain boundaries", vec![0.5, 0.5]))
            .unwrap();
        index.save(&path).unwrap();

        let loaded = CollectionIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let hits = loaded.search(&[0.5, 0.5], 1).unwrap();
        assert_eq!(hits[0].source, "week3.pdf");
        assert_eq!(hits[0].page, 12);
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(CollectionIndex::load(Path::new("/nonexistent/index.json")).is_err());
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(CollectionIndex::load(&path).is_err());
    }

    // ---- Distance ----

    #[test]
    fn test_cosine_distance_identical() {
        let a = vec![1.0f32; 100];
        let sim = cosine_distance(&a, &a);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_orthogonal() {
        let mut a = vec![0.0f32; 100];
        let mut b = vec![0.0f32; 100];
        a[0] = 1.0;
        b[1] = 1.0;
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_opposite() {
        let a = vec![1.0f32; 100];
        let b = vec![-1.0f32; 100];
        assert!((cosine_distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        let a = vec![0.0f32; 100];
        let b = vec![1.0f32; 100];
        assert_eq!(cosine_distance(&a, &b), 1.0);
    }

    #[test]
    fn test_cosine_distance_length_mismatch() {
        let a = vec![1.0f32; 10];
        let b = vec![1.0f32; 20];
        assert_eq!(cosine_distance(&a, &b), 1.0);
    }

    #[test]
    fn test_is_empty() {
        let index = CollectionIndex::new();
        assert!(index.is_empty());
        index.insert(chunk("a.pdf", 1, "x", vec![1.0])).unwrap();
        assert!(!index.is_empty());
    }
}
