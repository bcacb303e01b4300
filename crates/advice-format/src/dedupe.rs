use std::collections::HashSet;

use crate::model::Item;
use crate::options::FormatOptions;

/// Stable dedup on canonical form with the default length floor
/// (`FormatOptions::min_canonical_chars`).
pub fn dedupe(items: impl IntoIterator<Item = Item>) -> Vec<Item> {
    dedupe_with(items, FormatOptions::default().min_canonical_chars)
}

/// Keep the first item for each canonical form, dropping forms shorter than
/// `min_chars`. Running it again over its own output changes nothing.
pub fn dedupe_with(items: impl IntoIterator<Item = Item>, min_chars: usize) -> Vec<Item> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            item.canonical().chars().count() >= min_chars && seen.insert(item.canonical().to_string())
        })
        .collect()
}
