/// Keyword scoring used to place items that no header governs.
use crate::markup::canonical_form;
use crate::registry::{Category, CategoryRegistry};

pub const PRIMARY_KEYWORD_WEIGHT: u32 = 3;
pub const KEYWORD_WEIGHT: u32 = 1;

/// Score already-normalized text against one category.
///
/// Primary keywords are substring matches and count once in total; general
/// keywords are whole-word matches and each one counts.
pub fn score(category: &Category, normalized: &str) -> u32 {
    let primary = if category
        .primary_keywords
        .iter()
        .any(|k| normalized.contains(k.as_str()))
    {
        PRIMARY_KEYWORD_WEIGHT
    } else {
        0
    };
    let general = category
        .keywords
        .iter()
        .filter(|k| k.is_match(normalized))
        .count() as u32
        * KEYWORD_WEIGHT;
    primary + general
}

/// Best-scoring category key for `content`, or `None` when nothing scores.
///
/// Ties go to the category registered first.
pub fn categorize(content: &str, registry: &CategoryRegistry) -> Option<String> {
    let normalized = canonical_form(content);
    if normalized.is_empty() {
        return None;
    }

    let mut best: Option<(&Category, u32)> = None;
    for category in registry.categories() {
        let s = score(category, &normalized);
        if s > best.map_or(0, |(_, top)| top) {
            best = Some((category, s));
        }
    }
    best.map(|(category, _)| category.key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Option<String> {
        categorize(text, &CategoryRegistry::from_base())
    }

    #[test]
    fn detects_each_domain() {
        assert_eq!(detect("Conduct fogging activities").as_deref(), Some("vector_control"));
        assert_eq!(
            detect("Organize waste collection schedules").as_deref(),
            Some("waste_management")
        );
        assert_eq!(
            detect("Conduct dengue awareness workshops").as_deref(),
            Some("public_awareness")
        );
        assert_eq!(
            detect("Improve drainage in low-lying areas to reduce stagnant water.").as_deref(),
            Some("environmental")
        );
        assert_eq!(
            detect("Advise residents to seek a clinic when fever persists").as_deref(),
            Some("community_health")
        );
        assert_eq!(
            detect("Wear protective clothing with long sleeves").as_deref(),
            Some("preventive")
        );
    }

    #[test]
    fn ignores_markup_when_scoring() {
        assert_eq!(
            detect("<strong>Apply larvicide</strong> to water drums").as_deref(),
            Some("vector_control")
        );
    }

    #[test]
    fn returns_none_without_signal() {
        assert_eq!(detect("Review the plan every month"), None);
        assert_eq!(detect(""), None);
    }

    #[test]
    fn primary_keyword_counts_once() {
        let registry = CategoryRegistry::from_base();
        let waste = registry.get("waste_management").expect("base category");
        // "waste" primary (+3) plus whole-word "waste" (+1); the second
        // primary hit ("garbage") does not add another 3.
        assert_eq!(score(waste, "waste and more"), 4);
        assert_eq!(score(waste, "waste garbage"), 5);
    }

    #[test]
    fn general_keywords_need_word_boundaries() {
        let registry = CategoryRegistry::from_base();
        let health = registry.get("community_health").expect("base category");
        assert_eq!(score(health, "careful planning"), 0);
        assert_eq!(score(health, "home care"), 1);
    }

    #[test]
    fn ties_go_to_earlier_category() {
        // "clean-up" (environmental) and "community" (public awareness) score 1 each.
        assert_eq!(
            detect("Organize community clean-up drives").as_deref(),
            Some("environmental")
        );
    }
}
