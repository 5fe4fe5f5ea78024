use crate::catalog::Catalog;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32Str};

/// Ranks catalog entries against a phrase the resolver could not place.
pub struct FuzzyMatcher {
    matcher: Matcher,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    /// Best-scoring display names, highest first. Equal scores keep key order.
    pub fn suggest<'c>(&mut self, query: &str, catalog: &'c Catalog, limit: usize) -> Vec<&'c str> {
        let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);
        let mut buf = Vec::new();

        let mut scored: Vec<(u32, &'c str)> = catalog
            .iter()
            .filter_map(|entry| {
                let by_name = pattern.score(Utf32Str::new(&entry.display_name, &mut buf), &mut self.matcher);
                let by_alias = entry
                    .aliases
                    .iter()
                    .filter_map(|alias| pattern.score(Utf32Str::new(alias, &mut buf), &mut self.matcher))
                    .max();
                by_name.max(by_alias).map(|score| (score, entry.display_name.as_str()))
            })
            .collect();

        // stable sort
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, name)| name).collect()
    }
}
