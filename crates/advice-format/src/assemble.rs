/// Final assembly: degeneracy check, optional re-categorization, rendering.
use std::collections::HashSet;

use tracing::{debug, info};

use crate::categorize::categorize;
use crate::dedupe::dedupe_with;
use crate::model::{Grouping, Item, RecommendationDocument, RenderedCategory};
use crate::options::FormatOptions;
use crate::parser::{classify_line, group_lines, prepare_item, LineKind};
use crate::registry::{CategoryRegistry, GENERAL_KEY};

/// True when the header-driven grouping is too coarse to present: nothing at
/// all, a single oversized bucket, or only the general bucket.
pub fn is_degenerate(grouping: &Grouping, options: &FormatOptions) -> bool {
    let mut buckets = grouping.iter();
    match (buckets.next(), buckets.next()) {
        (None, _) => true,
        (Some((key, items)), None) => {
            key == GENERAL_KEY || items.len() > options.degenerate_item_threshold
        }
        (Some(_), Some(_)) => false,
    }
}

/// Ignore headers and bucket every list item by its keyword score.
pub fn regroup_list_items(
    filtered: &str,
    registry: &CategoryRegistry,
    options: &FormatOptions,
) -> Grouping {
    let mut grouping = Grouping::default();
    for line in filtered.lines() {
        let LineKind::ListItem(content) = classify_line(line, options) else {
            continue;
        };
        let Some(item) = prepare_item(&content, options) else {
            continue;
        };
        let key = categorize(item.as_str(), registry).unwrap_or_else(|| GENERAL_KEY.to_string());
        grouping.push(&key, item);
    }
    grouping
}

/// Build the document from noise-filtered text.
pub fn assemble(
    filtered: &str,
    registry: &mut CategoryRegistry,
    options: &FormatOptions,
) -> RecommendationDocument {
    let initial = group_lines(filtered, registry, options);
    let grouping = if is_degenerate(&initial, options) {
        let rebuilt = regroup_list_items(filtered, registry, options);
        if rebuilt.is_empty() {
            debug!(
                categories = initial.len(),
                "degenerate grouping but no list items to regroup, keeping it"
            );
            initial
        } else {
            info!(
                initial_categories = initial.len(),
                regrouped_categories = rebuilt.len(),
                "degenerate grouping, recategorized list items"
            );
            rebuilt
        }
    } else {
        initial
    };
    render(grouping, registry, options)
}

fn render(
    grouping: Grouping,
    registry: &mut CategoryRegistry,
    options: &FormatOptions,
) -> RecommendationDocument {
    let mut placed: HashSet<String> = HashSet::new();
    let mut categories = Vec::new();

    for (key, items) in grouping.into_buckets() {
        let unique: Vec<Item> = dedupe_with(items, options.min_canonical_chars)
            .into_iter()
            .filter(|item| placed.insert(item.canonical().to_string()))
            .collect();
        // Render-time pass over the already-deduplicated list.
        let unique = dedupe_with(unique, options.min_canonical_chars);
        if unique.is_empty() {
            continue;
        }
        let category = registry.ensure_renderable(&key);
        categories.push(RenderedCategory::new(&category, unique));
    }

    RecommendationDocument::from_categories(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouping(buckets: &[(&str, usize)]) -> Grouping {
        let mut g = Grouping::default();
        for (key, count) in buckets {
            for i in 0..*count {
                g.push(key, Item::new(format!("Recommendation number {i} for {key}")));
            }
        }
        g
    }

    #[test]
    fn degeneracy_rules() {
        let options = FormatOptions::default();
        assert!(is_degenerate(&Grouping::default(), &options));
        assert!(is_degenerate(&grouping(&[(GENERAL_KEY, 1)]), &options));
        assert!(is_degenerate(&grouping(&[("vector_control", 6)]), &options));
        assert!(!is_degenerate(&grouping(&[("vector_control", 5)]), &options));
        assert!(!is_degenerate(
            &grouping(&[(GENERAL_KEY, 9), ("vector_control", 1)]),
            &options
        ));
    }

    #[test]
    fn threshold_is_configurable() {
        let options = FormatOptions {
            degenerate_item_threshold: 10,
            ..FormatOptions::default()
        };
        assert!(!is_degenerate(&grouping(&[("vector_control", 6)]), &options));
    }

    #[test]
    fn render_removes_cross_category_duplicates() {
        let mut registry = CategoryRegistry::from_base();
        let mut g = Grouping::default();
        g.push("vector_control", Item::new("Conduct fogging in every barangay"));
        g.push("environmental", Item::new("conduct fogging in every barangay"));
        g.push("environmental", Item::new("Clear clogged canals monthly"));

        let doc = render(g, &mut registry, &FormatOptions::default());
        assert_eq!(doc.categories.len(), 2);
        assert_eq!(doc.categories[0].items, vec!["Conduct fogging in every barangay"]);
        assert_eq!(doc.categories[1].items, vec!["Clear clogged canals monthly"]);
    }

    #[test]
    fn render_drops_empty_categories() {
        let mut registry = CategoryRegistry::from_base();
        let mut g = Grouping::default();
        g.push("vector_control", Item::new("Fog"));
        let doc = render(g, &mut registry, &FormatOptions::default());
        assert!(doc.is_placeholder());
    }

    #[test]
    fn regroup_ignores_headers() {
        let registry = CategoryRegistry::from_base();
        let text = "**Vector Control Measures**\n\
                    - Organize waste collection schedules\n\
                    - Conduct fogging activities";
        let g = regroup_list_items(text, &registry, &FormatOptions::default());
        let keys: Vec<&str> = g.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["waste_management", "vector_control"]);
    }
}
