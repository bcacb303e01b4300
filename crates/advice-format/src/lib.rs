//! Normalization of generated dengue-prevention advice.
//!
//! Turns one untrusted, loosely formatted string from a text-generation model
//! into an ordered list of categories with deduplicated, actionable items:
//!
//! 1. `noise` drops meta-commentary and restated input numbers
//! 2. `parser` classifies lines and groups items under headers
//! 3. `categorize` scores items against category keywords
//! 4. `registry` resolves header names to categories, per call
//! 5. `dedupe` removes repeated items
//! 6. `assemble` rebuilds degenerate groupings and renders the result
//!
//! Every call starts from the same base category table and holds no state
//! afterwards, so the output depends only on the input text and options.
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

pub mod assemble;
pub mod categorize;
pub mod dedupe;
pub mod markup;
pub mod model;
pub mod noise;
pub mod options;
pub mod parser;
pub mod registry;

pub use model::{Item, RecommendationDocument, RenderedCategory};
pub use options::FormatOptions;
pub use registry::CategoryRegistry;

/// Format raw generator output with default options.
///
/// `None`, empty and whitespace-only input yield the "no recommendations"
/// placeholder. The result is never an empty list of categories.
pub fn format_recommendations(raw: Option<&str>) -> RecommendationDocument {
    format_with_options(raw, &FormatOptions::default())
}

pub fn format_with_options(raw: Option<&str>, options: &FormatOptions) -> RecommendationDocument {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return RecommendationDocument::placeholder();
    };

    match panic::catch_unwind(AssertUnwindSafe(|| run_pipeline(raw, options))) {
        Ok(document) => document,
        Err(_) => {
            error!(input_len = raw.len(), "recommendation formatting panicked");
            RecommendationDocument::error_placeholder()
        }
    }
}

fn run_pipeline(raw: &str, options: &FormatOptions) -> RecommendationDocument {
    let filtered = noise::filter(raw);
    let mut registry = CategoryRegistry::from_base();
    assemble::assemble(&filtered, &mut registry, options)
}
