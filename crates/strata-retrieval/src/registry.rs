//! Category registry.
//!
//! Maps category names to index locations. Built once at startup by scanning
//! the index directory written by the external ingestion component; read-only
//! afterwards. A missing directory is a valid, empty registry.

use std::path::{Path, PathBuf};

use tracing::info;

use strata_core::error::StrataError;

/// One discovered category and the file backing its index.
#[derive(Debug, Clone)]
pub struct CategoryEntry {
    /// Category name (index file stem), e.g. `lectures`.
    pub name: String,
    /// Location of the backing index file.
    pub path: PathBuf,
}

/// Immutable mapping from category name to index location.
///
/// Entries are sorted by name so every consumer sees the same deterministic
/// category order.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    entries: Vec<CategoryEntry>,
}

impl CategoryRegistry {
    /// Scan `dir` for `*.json` index files, one per category.
    ///
    /// A nonexistent directory yields an empty registry rather than an error.
    pub fn discover(dir: &Path) -> Result<Self, StrataError> {
        if !dir.exists() {
            info!("Index directory {} not found; no categories", dir.display());
            return Ok(Self::default());
        }

        let mut entries = Vec::new();
        for dirent in std::fs::read_dir(dir)? {
            let path = dirent?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            entries.push(CategoryEntry {
                name: name.to_string(),
                path: path.clone(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        info!(categories = entries.len(), "Category registry built");
        Ok(Self { entries })
    }

    /// Iterate entries in deterministic name order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.entries.iter()
    }

    /// Number of registered categories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if no categories were discovered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_missing_directory_is_empty() {
        let registry = CategoryRegistry::discover(Path::new("/nonexistent/indexes")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discover_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["textbooks.json", "lectures.json", "papers.json"] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }

        let registry = CategoryRegistry::discover(dir.path()).unwrap();
        let names: Vec<&str> = registry.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["lectures", "papers", "textbooks"]);
    }

    #[test]
    fn test_discover_ignores_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lectures.json"), "[]").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "hello").unwrap();

        let registry = CategoryRegistry::discover(dir.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().next().unwrap().name, "lectures");
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let registry = CategoryRegistry::discover(dir.path()).unwrap();
        assert!(registry.is_empty());
    }
}
