/// Line classifier and grouping state machine for generated advice.
///
/// The text has loose markdown structure:
/// - Headers: `**Title**`, `## Title`, `Title:` or an ALL-CAPS line
/// - List items: `-`, `•`, `*`, `1.` or `1)` markers
/// - Prose, kept only when it opens with an action verb
///
/// Parser approach: line-by-line state machine with regex for shape detection.
/// Items are accumulated for the current category and flushed into the
/// grouping whenever a header or a differently-categorized item shows up.
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::categorize::categorize;
use crate::markup::{plain_text, render_inline, strip_markup, trim_leading_emoji};
use crate::model::{Grouping, Item};
use crate::noise::clean_item;
use crate::options::FormatOptions;
use crate::registry::{CategoryRegistry, GENERAL_KEY};

const ALL_CAPS_HEADER_MIN_CHARS: usize = 10;

/// Prose is only kept when it opens with one of these.
pub const ACTION_VERBS: &[&str] = &[
    "implement",
    "organize",
    "conduct",
    "distribute",
    "provide",
    "educate",
    "encourage",
    "promote",
    "establish",
    "launch",
    "improve",
    "ensure",
    "install",
];

static BOLD_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*\*\s*([^*]+?)\s*\*\*\s*:?\s*$").expect("valid regex"));
static MARKDOWN_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}\s+(.+?)\s*#*\s*$").expect("valid regex"));
static COLON_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][^:]{3,}):\s*$").expect("valid regex"));
static LIST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*]\s+|•\s*|\d{1,3}[.)]\s+)(.*)$").expect("valid regex"));
static HEADER_NUMBERING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}[.)]\s*").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Header text with markup, numbering and trailing colon removed
    Header(String),
    /// Content after the list marker
    ListItem(String),
    Paragraph(String),
    Ignorable,
}

/// Classify one line by shape. Header shapes win over list markers.
pub fn classify_line(line: &str, options: &FormatOptions) -> LineKind {
    let line = trim_leading_emoji(line.trim());
    if line.is_empty() {
        return LineKind::Ignorable;
    }

    if let Some(raw_title) = header_text(line) {
        let title = clean_header(raw_title);
        return if title.is_empty() {
            LineKind::Ignorable
        } else {
            LineKind::Header(title)
        };
    }

    if let Some(caps) = LIST_ITEM_RE.captures(line) {
        let content = caps.get(1).map_or("", |m| m.as_str()).trim();
        if content.is_empty() {
            return LineKind::Ignorable;
        }
        if let Some(title) = bold_list_header(content) {
            return LineKind::Header(title);
        }
        return LineKind::ListItem(content.to_string());
    }

    if line.chars().count() > options.min_paragraph_chars {
        return LineKind::Paragraph(line.to_string());
    }
    LineKind::Ignorable
}

fn header_text(line: &str) -> Option<&str> {
    for re in [&*BOLD_HEADER_RE, &*MARKDOWN_HEADER_RE, &*COLON_HEADER_RE] {
        if let Some(m) = re.captures(line).and_then(|caps| caps.get(1)) {
            return Some(m.as_str());
        }
    }
    is_all_caps_header(line).then_some(line)
}

/// "1. **Waste Management**": a marker followed by nothing but a bold title.
/// Bold imperatives ("- **Cover water drums**") stay list items.
fn bold_list_header(content: &str) -> Option<String> {
    let raw = BOLD_HEADER_RE.captures(content)?.get(1)?.as_str();
    if starts_with_action_verb(raw) {
        return None;
    }
    Some(clean_header(raw)).filter(|title| !title.is_empty())
}

fn is_all_caps_header(line: &str) -> bool {
    let starts_with_letter = line.chars().next().is_some_and(char::is_alphabetic);
    starts_with_letter
        && line.chars().count() >= ALL_CAPS_HEADER_MIN_CHARS
        && !line.chars().any(char::is_lowercase)
}

fn clean_header(raw: &str) -> String {
    let text = strip_markup(raw).replace('#', "");
    let text = HEADER_NUMBERING_RE.replace(text.trim(), "");
    trim_leading_emoji(&text)
        .trim_end_matches(|c: char| c == ':' || c.is_whitespace())
        .trim()
        .to_string()
}

/// Remove a leading list marker, if any.
pub fn strip_list_marker(line: &str) -> &str {
    LIST_ITEM_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map_or(line, |m| m.as_str())
}

pub fn starts_with_action_verb(text: &str) -> bool {
    let plain = strip_markup(text);
    plain
        .split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase())
        .is_some_and(|w| ACTION_VERBS.contains(&w.as_str()))
}

/// Item-level noise check, inline emphasis conversion and length gate.
pub fn prepare_item(content: &str, options: &FormatOptions) -> Option<Item> {
    let cleaned = clean_item(content)?;
    let rendered = render_inline(&cleaned);
    if plain_text(&rendered).chars().count() <= options.min_item_chars {
        return None;
    }
    Some(Item::new(rendered))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseState {
    NoCategory,
    InCategory(String),
}

struct GroupingParser<'a> {
    registry: &'a mut CategoryRegistry,
    options: &'a FormatOptions,
    state: ParseState,
    pending: Vec<Item>,
    grouping: Grouping,
}

impl<'a> GroupingParser<'a> {
    fn new(registry: &'a mut CategoryRegistry, options: &'a FormatOptions) -> Self {
        Self {
            registry,
            options,
            state: ParseState::NoCategory,
            pending: Vec::new(),
            grouping: Grouping::default(),
        }
    }

    fn feed(&mut self, line: &str) {
        match classify_line(line, self.options) {
            LineKind::Header(title) => self.enter_header(&title),
            LineKind::ListItem(content) => {
                if let Some(item) = prepare_item(&content, self.options) {
                    self.push_item(item);
                }
            }
            LineKind::Paragraph(text) => {
                if !starts_with_action_verb(&text) {
                    debug!(line = %text, "skipped non-actionable prose");
                    return;
                }
                if let Some(item) = prepare_item(&text, self.options) {
                    self.push_item(item);
                }
            }
            LineKind::Ignorable => {}
        }
    }

    fn enter_header(&mut self, title: &str) {
        self.flush();
        let key = self.registry.resolve(&title.to_lowercase());
        self.registry.retitle(&key, title);
        debug!(header = title, key = %key, "entered category");
        self.state = ParseState::InCategory(key);
    }

    fn push_item(&mut self, item: Item) {
        let detected = categorize(item.as_str(), self.registry);
        let current = match &self.state {
            ParseState::InCategory(key) => key.clone(),
            ParseState::NoCategory => {
                let adopted = detected.clone().unwrap_or_else(|| GENERAL_KEY.to_string());
                self.state = ParseState::InCategory(adopted.clone());
                adopted
            }
        };

        if let Some(detected) = detected {
            if detected != current {
                self.flush();
                self.state = ParseState::InCategory(detected);
            }
        }

        if !self.pending.iter().any(|p| p.canonical() == item.canonical()) {
            self.pending.push(item);
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let key = match &self.state {
            ParseState::InCategory(key) => key.as_str(),
            ParseState::NoCategory => GENERAL_KEY,
        };
        self.grouping.extend(key, self.pending.drain(..));
    }

    fn finish(mut self) -> Grouping {
        self.flush();
        self.grouping
    }
}

/// Group filtered text into categories following its header structure.
pub fn group_lines(
    filtered: &str,
    registry: &mut CategoryRegistry,
    options: &FormatOptions,
) -> Grouping {
    let mut parser = GroupingParser::new(registry, options);
    for line in filtered.lines() {
        parser.feed(line);
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str) -> LineKind {
        classify_line(line, &FormatOptions::default())
    }

    fn group(text: &str) -> (Grouping, CategoryRegistry) {
        let mut registry = CategoryRegistry::from_base();
        let grouping = group_lines(text, &mut registry, &FormatOptions::default());
        (grouping, registry)
    }

    fn texts(items: Option<&[Item]>) -> Vec<&str> {
        items.unwrap_or_default().iter().map(Item::as_str).collect()
    }

    #[test]
    fn classifies_header_shapes() {
        assert_eq!(
            classify("**Vector Control Measures**"),
            LineKind::Header("Vector Control Measures".to_string())
        );
        assert_eq!(
            classify("### 2. Waste Management"),
            LineKind::Header("Waste Management".to_string())
        );
        assert_eq!(
            classify("Community Health Tips:"),
            LineKind::Header("Community Health Tips".to_string())
        );
        assert_eq!(
            classify("VECTOR CONTROL"),
            LineKind::Header("VECTOR CONTROL".to_string())
        );
        assert_eq!(
            classify("🦟 **Vector Control:**"),
            LineKind::Header("Vector Control".to_string())
        );
    }

    #[test]
    fn short_shapes_are_not_headers() {
        // ALL-CAPS needs 10 characters, colon form needs 4 before the colon.
        assert_eq!(classify("TIPS"), LineKind::Ignorable);
        assert_eq!(classify("Tip:"), LineKind::Ignorable);
        assert_eq!(classify("tips for homes:"), LineKind::Ignorable);
    }

    #[test]
    fn header_shapes_at_minimum_length() {
        assert_eq!(classify("WASTE TIPS"), LineKind::Header("WASTE TIPS".to_string()));
        assert_eq!(classify("Tips:"), LineKind::Header("Tips".to_string()));
    }

    #[test]
    fn numbered_bold_title_is_a_header() {
        assert_eq!(
            classify("1. **Waste Management Strategies**"),
            LineKind::Header("Waste Management Strategies".to_string())
        );
        assert_eq!(
            classify("- **Vector Control Measures:**"),
            LineKind::Header("Vector Control Measures".to_string())
        );
        assert_eq!(
            classify("2. **Conduct fogging weekly**"),
            LineKind::ListItem("**Conduct fogging weekly**".to_string())
        );
        assert_eq!(
            classify("- **Fogging** in every purok"),
            LineKind::ListItem("**Fogging** in every purok".to_string())
        );
    }

    #[test]
    fn numbered_bold_titles_group_their_sub_items() {
        let text = "1. **Waste Management Strategies**\n\
                    \x20  - Implement waste segregation at source\n\
                    2. **Vector Control Measures**\n\
                    \x20  - Conduct fogging in high-risk areas";
        let (grouping, _) = group(text);
        let keys: Vec<&str> = grouping.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["waste_management", "vector_control"]);
        assert_eq!(
            texts(grouping.get("waste_management")),
            vec!["Implement waste segregation at source"]
        );
    }

    #[test]
    fn classifies_list_items() {
        for line in [
            "- Cover water containers",
            "• Cover water containers",
            "•Cover water containers",
            "* Cover water containers",
            "1. Cover water containers",
            "12) Cover water containers",
        ] {
            assert_eq!(
                classify(line),
                LineKind::ListItem("Cover water containers".to_string()),
                "{line}"
            );
        }
        assert_eq!(classify("- "), LineKind::Ignorable);
    }

    #[test]
    fn classifies_paragraphs_and_ignorables() {
        assert_eq!(
            classify("Improve drainage in low-lying areas."),
            LineKind::Paragraph("Improve drainage in low-lying areas.".to_string())
        );
        assert_eq!(classify("Short line."), LineKind::Ignorable);
    }

    #[test]
    fn action_verb_gate() {
        assert!(starts_with_action_verb("Improve drainage near homes"));
        assert!(starts_with_action_verb("**Install** window screens"));
        assert!(!starts_with_action_verb("Temperature is rising quickly"));
        assert!(!starts_with_action_verb(""));
    }

    #[test]
    fn groups_items_under_headers() {
        let text = "**Waste Management Strategies**\n\
                    - Implement waste segregation at source\n\
                    - Organize regular garbage collection\n\
                    **Vector Control Measures**\n\
                    - Conduct fogging in high-risk areas\n\
                    - Apply larvicide to water drums";
        let (grouping, registry) = group(text);

        let keys: Vec<&str> = grouping.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["waste_management", "vector_control"]);
        assert_eq!(
            texts(grouping.get("vector_control")),
            vec!["Conduct fogging in high-risk areas", "Apply larvicide to water drums"]
        );
        assert_eq!(
            registry.get("vector_control").map(|c| c.title.as_str()),
            Some("Vector Control Measures")
        );
    }

    #[test]
    fn unsignalled_items_stay_under_their_header() {
        let text = "**Action Plan**\n- Schedule weekly inspections of rooftops";
        let (grouping, registry) = group(text);
        assert_eq!(
            texts(grouping.get("action_plan")),
            vec!["Schedule weekly inspections of rooftops"]
        );
        assert_eq!(
            registry.get("action_plan").map(|c| c.title.as_str()),
            Some("Action Plan")
        );
    }

    #[test]
    fn detected_category_switches_current_bucket() {
        let text = "- Conduct fogging activities\n\
                    - Organize waste collection schedules\n\
                    - Conduct dengue awareness workshops";
        let (grouping, _) = group(text);
        let keys: Vec<&str> = grouping.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["vector_control", "waste_management", "public_awareness"]);
    }

    #[test]
    fn items_without_header_or_signal_go_to_general() {
        let (grouping, _) = group("- Review the plan with the barangay office");
        assert_eq!(
            texts(grouping.get(GENERAL_KEY)),
            vec!["Review the plan with the barangay office"]
        );
    }

    #[test]
    fn local_duplicates_are_skipped() {
        let text = "**Vector Control**\n\
                    - Conduct fogging weekly\n\
                    - conduct   **fogging** weekly";
        let (grouping, _) = group(text);
        assert_eq!(texts(grouping.get("vector_control")), vec!["Conduct fogging weekly"]);
    }

    #[test]
    fn prose_needs_an_action_verb() {
        let text = "Mosquito populations usually grow after rain.\n\
                    Improve drainage in low-lying areas to reduce stagnant water.";
        let (grouping, _) = group(text);
        assert_eq!(
            texts(grouping.get("environmental")),
            vec!["Improve drainage in low-lying areas to reduce stagnant water."]
        );
        assert_eq!(grouping.len(), 1);
    }

    #[test]
    fn items_keep_inline_emphasis_only() {
        let (grouping, _) = group("- **Eliminate breeding sites** in <b>every</b> yard");
        assert_eq!(
            texts(grouping.get("vector_control")),
            vec!["<strong>Eliminate breeding sites</strong> in &lt;b&gt;every&lt;/b&gt; yard"]
        );
    }

    #[test]
    fn noisy_items_are_dropped_or_trimmed() {
        let text = "**Preventive Measures**\n\
                    - Use mosquito nets at night. And I need to keep this short.\n\
                    - Rainfall is 120 which is high";
        let (grouping, _) = group(text);
        assert_eq!(
            texts(grouping.get("vector_control")),
            vec!["Use mosquito nets at night."]
        );
        assert!(grouping.get("preventive").is_none());
    }
}
