//! Reserved-name filter.
//!
//! File managers and shells probe a fresh mount for hidden files, camera
//! roll folders and project markers. None of these exist in the catalog, so
//! they are answered locally as empty files instead of costing a round-trip.

/// Leaf-name prefixes that never reach the remote.
pub const FILTERED_PREFIXES: &[&str] = &[".", "DCIM", "Gemfile", "HEAD"];

/// Prefix matcher over leaf names.
#[derive(Debug, Clone)]
pub struct NameFilter {
    prefixes: Vec<String>,
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new(FILTERED_PREFIXES.iter().copied())
    }
}

impl NameFilter {
    /// Build a filter from a set of literal prefixes.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `leaf` starts with any filtered prefix.
    ///
    /// The root (empty leaf) is never filtered.
    pub fn is_filtered(&self, leaf: &str) -> bool {
        !leaf.is_empty() && self.prefixes.iter().any(|p| leaf.starts_with(p.as_str()))
    }
}
