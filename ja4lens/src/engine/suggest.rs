// ja4lens/src/engine/suggest.rs
//
// Autocomplete: case-insensitive prefix scan over the first-seen hash list.
// Results come back in load order (not sorted, not ranked) and the scan stops
// as soon as `max_results` hits are collected.

use crate::model::Suggestion;
use crate::state::index::IndexStore;

pub const MIN_PREFIX_LEN: usize = 2;
pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct SuggestOptions {
    pub min_len:     usize,
    pub max_results: usize,
}

impl Default for SuggestOptions {
    fn default() -> Self {
        Self { min_len: MIN_PREFIX_LEN, max_results: MAX_SUGGESTIONS }
    }
}

pub fn suggest(index: &IndexStore, prefix: &str) -> Vec<Suggestion> {
    suggest_with(index, prefix, SuggestOptions::default())
}

pub fn suggest_with(index: &IndexStore, prefix: &str, opts: SuggestOptions) -> Vec<Suggestion> {
    if prefix.chars().count() < opts.min_len {
        return Vec::new();
    }
    let lower = prefix.to_lowercase();

    index
        .first_seen()
        .iter()
        .filter(|e| e.lower.starts_with(&lower))
        .take(opts.max_results)
        .map(|e| Suggestion { hash: e.hash.clone(), family: e.family })
        .collect()
}
