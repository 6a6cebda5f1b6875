//! Per-category retrieval collaborator.
//!
//! `CollectionSearch` is the interface the gateway speaks to each category
//! through; `VectorCollection` is the production implementation combining a
//! loaded index with the embedding service.

use std::sync::Arc;

use async_trait::async_trait;

use strata_core::error::StrataError;

use crate::embedding::DynEmbeddingService;
use crate::index::CollectionIndex;

/// A single match returned from one category's index.
#[derive(Debug, Clone)]
pub struct CollectionHit {
    /// Originating document.
    pub source: String,
    /// Page or offset within the source document.
    pub page: u32,
    /// Chunk text.
    pub content: String,
    /// Cosine distance to the query; lower = more similar.
    pub distance: f64,
}

/// Retrieval collaborator for one category.
///
/// Implementations must return hits sorted by ascending distance.
#[async_trait]
pub trait CollectionSearch: Send + Sync {
    /// Find up to `k` matches for the keyword query.
    async fn query(&self, keywords: &str, k: usize) -> Result<Vec<CollectionHit>, StrataError>;

    /// Return true if the collection currently holds no entries.
    fn is_empty(&self) -> bool;
}

/// Production collection: embeds the keywords, then searches the index.
pub struct VectorCollection {
    index: CollectionIndex,
    embedder: Arc<dyn DynEmbeddingService>,
}

impl VectorCollection {
    /// Create a collection from a loaded index and a shared embedder.
    pub fn new(index: CollectionIndex, embedder: Arc<dyn DynEmbeddingService>) -> Self {
        Self { index, embedder }
    }
}

#[async_trait]
impl CollectionSearch for VectorCollection {
    async fn query(&self, keywords: &str, k: usize) -> Result<Vec<CollectionHit>, StrataError> {
        let query_vec = self.embedder.embed_boxed(keywords).await?;
        self.index.search(&query_vec, k)
    }

    fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
