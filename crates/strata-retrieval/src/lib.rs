//! Retrieval layer for Strata.
//!
//! Provides the embedding collaborator, per-category collection indexes,
//! the startup category registry, and the gateway that fans a query out
//! across every indexed category and merges the ranked results.

pub mod collection;
pub mod embedding;
pub mod gateway;
pub mod index;
pub mod registry;

pub use collection::{CollectionHit, CollectionSearch, VectorCollection};
pub use embedding::{DynEmbeddingService, EmbeddingService, HashEmbedding, OllamaEmbedding};
pub use gateway::{MatchGroup, RetrievalGateway, RetrievalQuery, RetrievalResult, ScoredMatch};
pub use index::{CollectionIndex, IndexedChunk};
pub use registry::{CategoryEntry, CategoryRegistry};
