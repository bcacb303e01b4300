use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::markup::{canonical_form, plain_text};
use crate::registry::Category;

const PLACEHOLDER_KEY: &str = "no_recommendations";
const ERROR_KEY: &str = "formatting_error";

/// A single candidate recommendation, already rendered to safe inline markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    text: String,
    canonical: String,
}

impl Item {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let canonical = canonical_form(&text);
        Self { text, canonical }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Items bucketed by category key, in first-encountered key order.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    buckets: Vec<(String, Vec<Item>)>,
}

impl Grouping {
    /// Append items to the bucket for `key`. Nothing is recorded for an empty batch.
    pub fn extend(&mut self, key: &str, items: impl IntoIterator<Item = Item>) {
        let items: Vec<Item> = items.into_iter().collect();
        if items.is_empty() {
            return;
        }
        match self.buckets.iter_mut().find(|(k, _)| k == key) {
            Some((_, bucket)) => bucket.extend(items),
            None => self.buckets.push((key.to_string(), items)),
        }
    }

    pub fn push(&mut self, key: &str, item: Item) {
        self.extend(key, [item]);
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Item])> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn get(&self, key: &str) -> Option<&[Item]> {
        self.buckets
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn into_buckets(self) -> Vec<(String, Vec<Item>)> {
        self.buckets
    }
}

/// One category as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RenderedCategory {
    /// Category key, e.g. "vector_control"
    pub key: String,
    /// Display glyph, e.g. "🦟"
    pub icon: String,
    /// Display title, e.g. "Vector Control Measures"
    pub title: String,
    /// Accent color as a CSS hex string
    pub color: String,
    /// Items with at most `<strong>`/`<em>` markup; all other text is escaped
    pub items: Vec<String>,
}

impl RenderedCategory {
    pub fn new(category: &Category, items: Vec<Item>) -> Self {
        Self {
            key: category.key.clone(),
            icon: category.icon.clone(),
            title: category.title.clone(),
            color: category.color.clone(),
            items: items.into_iter().map(Item::into_text).collect(),
        }
    }
}

/// The formatted result of one pipeline run. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RecommendationDocument {
    pub categories: Vec<RenderedCategory>,
}

impl RecommendationDocument {
    /// Wrap rendered categories, substituting the placeholder when there are none.
    pub fn from_categories(categories: Vec<RenderedCategory>) -> Self {
        if categories.is_empty() {
            return Self::placeholder();
        }
        Self { categories }
    }

    pub fn placeholder() -> Self {
        Self {
            categories: vec![RenderedCategory {
                key: PLACEHOLDER_KEY.to_string(),
                icon: "ℹ️".to_string(),
                title: "Recommendations".to_string(),
                color: "#6c757d".to_string(),
                items: vec!["No recommendations available at this time.".to_string()],
            }],
        }
    }

    pub fn error_placeholder() -> Self {
        Self {
            categories: vec![RenderedCategory {
                key: ERROR_KEY.to_string(),
                icon: "⚠️".to_string(),
                title: "Recommendations Unavailable".to_string(),
                color: "#dc3545".to_string(),
                items: vec![
                    "An error occurred while preparing recommendations. Please try again."
                        .to_string(),
                ],
            }],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(
            self.categories.as_slice(),
            [only] if only.key == PLACEHOLDER_KEY || only.key == ERROR_KEY
        )
    }

    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    /// Flatten to one `• item` line per item, headers omitted, markup removed.
    pub fn to_plain_text(&self) -> String {
        self.categories
            .iter()
            .flat_map(|c| c.items.iter())
            .map(|item| format!("• {}", plain_text(item)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
