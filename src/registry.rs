use std::collections::BTreeSet;

use crate::config::SourceDescriptor;

/// Region tag meaning "no region filtering".
pub const GLOBAL_REGION: &str = "global";

/// Read-only, ordered collection of feed sources.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceDescriptor>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Sources in scope for `region`, in registry order.
    ///
    /// An absent or blank region, or `global`, selects everything.
    pub fn select(&self, region: Option<&str>) -> Vec<&SourceDescriptor> {
        match region.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) if !r.eq_ignore_ascii_case(GLOBAL_REGION) => {
                self.sources.iter().filter(|s| s.covers_region(r)).collect()
            }
            _ => self.sources.iter().collect(),
        }
    }

    /// Distinct region tags declared by the registry, lower-cased and sorted.
    pub fn regions(&self) -> Vec<String> {
        self.sources
            .iter()
            .flat_map(|s| s.regions.iter())
            .map(|r| r.to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
