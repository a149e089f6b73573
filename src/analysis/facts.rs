use serde::Serialize;

/// Everything one test target needs, aggregated from its link step.
///
/// Every list is sorted and free of duplicates. The trace records parallel
/// build steps in arbitrary order, so this is what makes the emitted rules
/// reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetFacts {
    pub sources: Vec<String>,
    pub headers: Vec<String>,
    pub include_dirs: Vec<String>,
    pub defines: Vec<String>,

    /// Dependency labels, excluding the shared support library
    pub dependencies: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub copts: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TargetFacts {
    /// Sorts and deduplicates every list.
    pub fn normalize(&mut self) {
        for list in [
            &mut self.sources,
            &mut self.headers,
            &mut self.include_dirs,
            &mut self.defines,
            &mut self.dependencies,
            &mut self.copts,
            &mut self.tags,
        ] {
            sort_dedup(list);
        }
    }
}

pub(crate) fn sort_dedup(list: &mut Vec<String>) {
    list.sort();
    list.dedup();
}
