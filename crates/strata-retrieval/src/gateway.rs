//! Retrieval gateway: fans one query out across every indexed category.
//!
//! Collects up to K matches per category, pools them to establish a global
//! ranking, and renders the matches grouped back by category for the model.
//! A category that is absent, empty, or failing contributes nothing; it is
//! never an error.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::collection::{CollectionSearch, VectorCollection};
use crate::embedding::DynEmbeddingService;
use crate::index::CollectionIndex;
use crate::registry::CategoryRegistry;

/// A keyword query issued during one retrieval round.
#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    /// Keywords extracted from the search directive.
    pub keywords: String,
    /// Round that issued the query, numbered from 0 within a turn.
    pub round: u32,
}

impl RetrievalQuery {
    pub fn new(keywords: impl Into<String>, round: u32) -> Self {
        Self {
            keywords: keywords.into(),
            round,
        }
    }
}

/// A category-labeled match produced by one collection.
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    /// Category the match came from.
    pub category: String,
    /// Originating document.
    pub source: String,
    /// Page or offset within the source document.
    pub page: u32,
    /// Chunk text.
    pub content: String,
    /// Cosine distance to the query; lower = more similar.
    pub distance: f64,
}

/// Matches from one category, in ascending distance order.
#[derive(Debug, Clone)]
pub struct MatchGroup {
    /// Category name.
    pub category: String,
    /// Matches, distances non-decreasing.
    pub matches: Vec<ScoredMatch>,
}

/// The merged outcome of one retrieval round.
///
/// Groups are ordered by where each category's best match lands in the
/// pooled ascending ranking (ties broken by registry order, then rank),
/// so the strongest category renders first.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub groups: Vec<MatchGroup>,
}

impl RetrievalResult {
    /// Total matches across all groups.
    pub fn total_matches(&self) -> usize {
        self.groups.iter().map(|g| g.matches.len()).sum()
    }

    /// Return true if no category produced a match.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Render the grouped matches as deterministic prompt text.
    ///
    /// Each group opens with `[category]`; each match carries its source
    /// attribution line above the chunk content.
    pub fn render(&self) -> String {
        let mut blocks = Vec::new();
        for group in &self.groups {
            let mut lines = vec![format!("[{}]", group.category)];
            for (i, m) in group.matches.iter().enumerate() {
                if i > 0 {
                    lines.push(String::new());
                }
                lines.push(format!("Source: {} (Page {})", m.source, m.page));
                lines.push(m.content.clone());
            }
            blocks.push(lines.join("\n"));
        }
        blocks.join("\n\n")
    }
}

/// Fans a query out across registered categories and merges the results.
pub struct RetrievalGateway {
    collections: Vec<(String, Box<dyn CollectionSearch>)>,
    top_k: usize,
}

impl RetrievalGateway {
    /// Create an empty gateway with the given per-category match limit.
    pub fn new(top_k: usize) -> Self {
        Self {
            collections: Vec::new(),
            top_k,
        }
    }

    /// Build a gateway from the startup registry, loading each backing index.
    ///
    /// A category whose index fails to load is skipped and logged; it must
    /// not prevent the remaining categories from serving queries.
    pub fn from_registry(
        registry: &CategoryRegistry,
        embedder: Arc<dyn DynEmbeddingService>,
        top_k: usize,
    ) -> Self {
        let mut gateway = Self::new(top_k);
        for entry in registry.iter() {
            match CollectionIndex::load(&entry.path) {
                Ok(index) => {
                    debug!(category = %entry.name, chunks = index.len(), "Collection loaded");
                    gateway.add_collection(
                        entry.name.clone(),
                        VectorCollection::new(index, Arc::clone(&embedder)),
                    );
                }
                Err(e) => {
                    warn!(category = %entry.name, error = %e, "Skipping unloadable collection");
                }
            }
        }
        gateway
    }

    /// Register a collection under a category name.
    ///
    /// Categories keep their registration order; it is the tie-break order
    /// for equal distances.
    pub fn add_collection(&mut self, category: impl Into<String>, collection: impl CollectionSearch + 'static) {
        self.collections.push((category.into(), Box::new(collection)));
    }

    /// Number of registered categories.
    pub fn category_count(&self) -> usize {
        self.collections.len()
    }

    /// Query every present, non-empty category and merge the results.
    ///
    /// Individual category failures degrade to zero matches for that
    /// category and are logged; they never abort the round.
    pub async fn query(&self, query: &RetrievalQuery) -> RetrievalResult {
        let mut per_category: Vec<(usize, String, Vec<ScoredMatch>)> = Vec::new();

        for (cat_idx, (category, collection)) in self.collections.iter().enumerate() {
            if collection.is_empty() {
                continue;
            }
            let hits = match collection.query(&query.keywords, self.top_k).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(category = %category, error = %e, "Category query failed; skipping");
                    continue;
                }
            };
            if hits.is_empty() {
                continue;
            }
            let matches: Vec<ScoredMatch> = hits
                .into_iter()
                .map(|h| ScoredMatch {
                    category: category.clone(),
                    source: h.source,
                    page: h.page,
                    content: h.content,
                    distance: h.distance,
                })
                .collect();
            per_category.push((cat_idx, category.clone(), matches));
        }

        debug!(
            round = query.round,
            categories = per_category.len(),
            "Retrieval round complete"
        );

        merge(per_category)
    }
}

/// Pool all matches to establish the global ranking, then group back by
/// category in the order each category first appears in that ranking.
fn merge(per_category: Vec<(usize, String, Vec<ScoredMatch>)>) -> RetrievalResult {
    // (distance, category index, per-category rank) identifies each match in
    // the pool; the tuple tail makes the ascending sort deterministic.
    let mut pooled: Vec<(f64, usize, usize)> = Vec::new();
    for (cat_idx, _, matches) in &per_category {
        for (rank, m) in matches.iter().enumerate() {
            pooled.push((m.distance, *cat_idx, rank));
        }
    }
    pooled.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut group_order: Vec<usize> = Vec::new();
    for (_, cat_idx, _) in &pooled {
        if !group_order.contains(cat_idx) {
            group_order.push(*cat_idx);
        }
    }

    let mut groups = Vec::new();
    for ordered_idx in group_order {
        if let Some((_, category, matches)) =
            per_category.iter().find(|(idx, _, _)| *idx == ordered_idx)
        {
            groups.push(MatchGroup {
                category: category.clone(),
                matches: matches.clone(),
            });
        }
    }

    RetrievalResult { groups }
}
