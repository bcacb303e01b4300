/// Category metadata and header resolution.
///
/// The known categories live in an immutable base table built once per
/// process. Each formatting call works on its own `CategoryRegistry`, which
/// borrows base entries and clones one only when it is retitled, so nothing a
/// call synthesizes or renames is visible to the next call.
use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::markup::{collapse_whitespace, title_case};

pub const GENERAL_KEY: &str = "general";
pub const DEFAULT_ICON: &str = "📋";
pub const DEFAULT_COLOR: &str = "#6c757d";

const GENERAL_TITLE: &str = "General Recommendations";
const MAX_KEY_CHARS: usize = 30;
const MIN_FALLBACK_WORD_CHARS: usize = 4;

/// A keyword matched on word boundaries.
#[derive(Debug, Clone)]
pub struct Keyword {
    text: String,
    pattern: Regex,
}

impl Keyword {
    pub fn new(text: &str) -> Self {
        let text = text.to_lowercase();
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&text)))
            .expect("escaped keyword is a valid regex");
        Self { text, pattern }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.pattern.is_match(haystack)
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub key: String,
    pub title: String,
    pub icon: String,
    pub color: String,
    pub keywords: Vec<Keyword>,
    /// Higher-confidence substrings, weighted above `keywords` when scoring.
    pub primary_keywords: Vec<String>,
}

impl Category {
    fn synthesized(key: String, title: String) -> Self {
        Self {
            key,
            title,
            icon: DEFAULT_ICON.to_string(),
            color: DEFAULT_COLOR.to_string(),
            keywords: Vec::new(),
            primary_keywords: Vec::new(),
        }
    }

    fn from_seed(seed: &CategorySeed) -> Self {
        Self {
            key: seed.key.to_string(),
            title: seed.title.to_string(),
            icon: seed.icon.to_string(),
            color: seed.color.to_string(),
            keywords: seed.keywords.iter().map(|k| Keyword::new(k)).collect(),
            primary_keywords: seed.primary.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// The key read as words, e.g. "vector_control" → "vector control".
    fn spaced_key(&self) -> String {
        self.key.replace('_', " ")
    }
}

struct CategorySeed {
    key: &'static str,
    title: &'static str,
    icon: &'static str,
    color: &'static str,
    primary: &'static [&'static str],
    keywords: &'static [&'static str],
}

const BASE_CATEGORIES: &[CategorySeed] = &[
    CategorySeed {
        key: "waste_management",
        title: "Waste Management Strategies",
        icon: "🗑️",
        color: "#6f4e37",
        primary: &["waste", "garbage", "trash", "litter", "rubbish", "recycl", "segregat"],
        keywords: &[
            "waste", "garbage", "trash", "disposal", "collection", "recycling", "bins", "bin",
            "litter", "dumping", "segregation", "composting", "landfill", "rubbish", "tires",
            "tyres",
        ],
    },
    CategorySeed {
        key: "vector_control",
        title: "Vector Control Measures",
        icon: "🦟",
        color: "#c0392b",
        primary: &["mosquito", "larva", "larvicid", "fogging", "insecticid", "breeding", "vector"],
        keywords: &[
            "fogging", "spraying", "larva", "larvae", "larvicide", "larvicides", "mosquito",
            "mosquitoes", "insecticide", "insecticides", "aedes", "breeding", "vector", "vectors",
            "traps", "larval", "misting",
        ],
    },
    CategorySeed {
        key: "community_health",
        title: "Community Health Tips",
        icon: "🏥",
        color: "#2980b9",
        primary: &["symptom", "health center", "health centre", "clinic", "medical", "hospital", "fever"],
        keywords: &[
            "health", "symptoms", "fever", "clinic", "clinics", "doctor", "treatment", "hydration",
            "fluids", "medical", "hospital", "patients", "consult", "care", "diagnosis",
            "checkups", "nurses",
        ],
    },
    CategorySeed {
        key: "environmental",
        title: "Environmental Interventions",
        icon: "🌿",
        color: "#27ae60",
        primary: &["drainage", "stagnant", "standing water", "canal", "gutter", "culvert"],
        keywords: &[
            "drainage", "drains", "water", "stagnant", "environment", "environmental",
            "vegetation", "canals", "gutters", "flooding", "low-lying", "clean-up", "cleanup",
            "rainwater", "puddles", "sanitation", "grass",
        ],
    },
    CategorySeed {
        key: "preventive",
        title: "Preventive Measures",
        icon: "🛡️",
        color: "#8e44ad",
        primary: &["protective", "repellent", "screen", "bed net", "long sleeve", "prevent"],
        keywords: &[
            "prevent", "prevention", "preventive", "protective", "protection", "screens", "nets",
            "clothing", "sleeves", "covers", "lids", "early", "warning", "surveillance",
            "monitoring", "repellent", "repellents",
        ],
    },
    CategorySeed {
        key: "public_awareness",
        title: "Public Awareness & Education",
        icon: "📢",
        color: "#f39c12",
        primary: &["awareness", "educat", "campaign", "workshop", "seminar", "information drive"],
        keywords: &[
            "awareness", "education", "educate", "campaign", "campaigns", "workshops", "seminars",
            "schools", "media", "posters", "information", "training", "community", "volunteers",
            "leaflets", "flyers", "radio",
        ],
    },
    CategorySeed {
        key: GENERAL_KEY,
        title: GENERAL_TITLE,
        icon: DEFAULT_ICON,
        color: DEFAULT_COLOR,
        primary: &[],
        keywords: &[],
    },
];

/// Alternative header words that resolve to an existing category.
const ALIASES: &[(&str, &str)] = &[
    ("prevention", "preventive"),
    ("protection", "preventive"),
    ("awareness", "public_awareness"),
    ("education", "public_awareness"),
    ("information", "public_awareness"),
    ("mosquito", "vector_control"),
    ("sanitation", "environmental"),
    ("recommendation", GENERAL_KEY),
];

static BASE_TABLE: Lazy<Vec<Category>> =
    Lazy::new(|| BASE_CATEGORIES.iter().map(Category::from_seed).collect());

/// Call-scoped view over the base table.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    entries: Vec<Cow<'static, Category>>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::from_base()
    }
}

impl CategoryRegistry {
    pub fn from_base() -> Self {
        Self {
            entries: BASE_TABLE.iter().map(Cow::Borrowed).collect(),
        }
    }

    /// Categories in registration order: base table first, then synthesized ones.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.entries.iter().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Category> {
        self.position(key).map(|i| self.entries[i].as_ref())
    }

    fn position(&self, key: &str) -> Option<usize> {
        let key = canonical_key(key);
        self.entries.iter().position(|c| c.key == key)
    }

    /// Map a lowercase header name to a category key.
    ///
    /// Tiers are tried in a fixed order:
    /// 1. containment: a known key (or alias) inside `name`, or `name`'s first
    ///    word inside a known key
    /// 2. any word of `name` longer than 3 characters inside a known key
    /// 3. synthesis of a new category from `name`
    pub fn resolve(&mut self, name: &str) -> String {
        let name = collapse_whitespace(&name.to_lowercase());
        if let Some(key) = self.match_containment(&name) {
            return key;
        }
        if let Some(key) = self.match_words(&name) {
            return key;
        }
        self.synthesize(&name)
    }

    fn match_containment(&self, name: &str) -> Option<String> {
        let first_word = name
            .split_whitespace()
            .next()
            .map(trim_word)
            .filter(|w| w.chars().count() >= MIN_FALLBACK_WORD_CHARS);

        for entry in self.categories() {
            let spaced = entry.spaced_key();
            if name.contains(&spaced) || first_word.is_some_and(|w| spaced.contains(w)) {
                return Some(entry.key.clone());
            }
        }

        ALIASES
            .iter()
            .find(|(alias, _)| name.contains(alias))
            .map(|(_, target)| target.to_string())
    }

    fn match_words(&self, name: &str) -> Option<String> {
        name.split_whitespace()
            .map(trim_word)
            .filter(|w| w.chars().count() >= MIN_FALLBACK_WORD_CHARS)
            .find_map(|word| {
                self.categories()
                    .find(|entry| entry.spaced_key().contains(word))
                    .map(|entry| entry.key.clone())
            })
    }

    fn synthesize(&mut self, name: &str) -> String {
        let key = derive_key(name);
        if self.position(&key).is_none() {
            let title = title_case(&key.replace('_', " "));
            self.entries
                .push(Cow::Owned(Category::synthesized(key.clone(), title)));
        }
        key
    }

    /// Set the display title, e.g. to a header's original casing.
    pub fn retitle(&mut self, key: &str, title: &str) {
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        if let Some(i) = self.position(key) {
            if self.entries[i].title != title {
                self.entries[i].to_mut().title = title.to_string();
            }
        }
    }

    /// Metadata for `key` with non-empty icon, title and color. Unknown keys are
    /// registered on the fly; existing custom values are kept.
    pub fn ensure_renderable(&mut self, key: &str) -> Category {
        let i = match self.position(key) {
            Some(i) => i,
            None => {
                let key = derive_key(&key.replace('_', " "));
                match self.position(&key) {
                    Some(i) => i,
                    None => {
                        let title = title_case(&key.replace('_', " "));
                        self.entries
                            .push(Cow::Owned(Category::synthesized(key, title)));
                        self.entries.len() - 1
                    }
                }
            }
        };

        let entry = &mut self.entries[i];
        if entry.icon.trim().is_empty()
            || entry.title.trim().is_empty()
            || entry.color.trim().is_empty()
        {
            let entry = entry.to_mut();
            if entry.icon.trim().is_empty() {
                entry.icon = DEFAULT_ICON.to_string();
            }
            if entry.color.trim().is_empty() {
                entry.color = DEFAULT_COLOR.to_string();
            }
            if entry.title.trim().is_empty() {
                entry.title = if entry.key == GENERAL_KEY {
                    GENERAL_TITLE.to_string()
                } else {
                    title_case(&entry.key.replace('_', " "))
                };
            }
        }
        self.entries[i].as_ref().clone()
    }

    #[cfg(test)]
    fn set_icon(&mut self, key: &str, icon: &str) {
        if let Some(i) = self.position(key) {
            self.entries[i].to_mut().icon = icon.to_string();
        }
    }
}

fn canonical_key(key: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, target)| *target)
        .unwrap_or(key)
}

fn trim_word(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Lowercase, drop non-alphanumerics, join words with `_`, cap at 30 chars.
pub fn derive_key(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let truncated: String = joined.chars().take(MAX_KEY_CHARS).collect();
    let truncated = truncated.trim_end_matches('_');
    if truncated.is_empty() {
        GENERAL_KEY.to_string()
    } else {
        truncated.to_string()
    }
}
