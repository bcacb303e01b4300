/// Tunable thresholds for one formatting call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// A grouping whose only category holds more items than this is treated as
    /// degenerate and rebuilt from keyword scores.
    pub degenerate_item_threshold: usize,
    /// Items must be longer than this (plain text, trimmed) to be kept.
    pub min_item_chars: usize,
    /// Items whose canonical form is shorter than this are dropped as fragments.
    pub min_canonical_chars: usize,
    /// Unmarked prose must be longer than this to be considered at all.
    pub min_paragraph_chars: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            degenerate_item_threshold: 5,
            min_item_chars: 3,
            min_canonical_chars: 10,
            min_paragraph_chars: 15,
        }
    }
}
