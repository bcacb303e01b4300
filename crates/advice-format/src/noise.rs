/// Removal of model meta-commentary from generated advice.
///
/// Generated text regularly narrates its own plan ("Let me list..."), repeats
/// the formatting instructions it was given, or restates the input numbers
/// ("Rainfall is 120 which is high"). None of that may reach the user.
///
/// Detection is an ordered table of named rules. Each rule has a matcher, an
/// action and a scope:
/// - `KeepPrefix` rules cut a line at a meta-transition marker and keep the
///   useful text before it, when there is enough of it
/// - `Drop` rules remove the whole line or item
///
/// The same table serves the line pass over the raw text (`filter`) and the
/// per-item re-check done by the parser (`clean_item`); `Scope` says which
/// pass a rule takes part in.
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::markup::is_emoji_only;
use crate::parser::strip_list_marker;

/// A salvaged prefix must be longer than this to survive.
const MIN_SALVAGE_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseAction {
    Drop,
    KeepPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Line,
    Item,
    Both,
}

impl Scope {
    fn applies(self, pass: Scope) -> bool {
        self == Scope::Both || self == pass
    }
}

enum Matcher {
    Pattern(Regex),
    Predicate(fn(&str) -> bool),
}

pub struct NoiseRule {
    pub label: &'static str,
    pub action: NoiseAction,
    pub scope: Scope,
    matcher: Matcher,
}

impl NoiseRule {
    fn pattern(label: &'static str, scope: Scope, action: NoiseAction, pattern: &str) -> Self {
        Self {
            label,
            action,
            scope,
            matcher: Matcher::Pattern(Regex::new(pattern).expect("valid regex")),
        }
    }

    fn drop(label: &'static str, scope: Scope, pattern: &str) -> Self {
        Self::pattern(label, scope, NoiseAction::Drop, pattern)
    }

    fn predicate(label: &'static str, scope: Scope, f: fn(&str) -> bool) -> Self {
        Self {
            label,
            action: NoiseAction::Drop,
            scope,
            matcher: Matcher::Predicate(f),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Pattern(re) => re.is_match(text),
            Matcher::Predicate(f) => f(text),
        }
    }

    /// Byte offset where the rule first matches.
    fn match_start(&self, text: &str) -> Option<usize> {
        match &self.matcher {
            Matcher::Pattern(re) => re.find(text).map(|m| m.start()),
            Matcher::Predicate(f) => f(text).then_some(0),
        }
    }
}

impl std::fmt::Debug for NoiseRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseRule")
            .field("label", &self.label)
            .field("action", &self.action)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Anchor a pattern at the start of a line, tolerating list markers and emphasis.
fn leading(pattern: &str) -> String {
    format!(r"(?i)^[\s\-•*#>]*(?:\d{{1,3}}[.)]\s*)?\**\s*(?:{pattern})")
}

fn is_horizontal_rule(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.chars().count() >= 3 && trimmed.chars().all(|c| matches!(c, '-' | '=' | '*' | '_'))
}

pub static NOISE_RULES: Lazy<Vec<NoiseRule>> = Lazy::new(|| {
    use NoiseAction::KeepPrefix;
    use Scope::{Both, Item, Line};

    vec![
        // Meta-transition markers: "Improve drainage. And I need to..."
        NoiseRule::pattern(
            "meta-transition-self",
            Both,
            KeepPrefix,
            r"(?i)\.\s+(?:(?:and|so|now|also|but|then|finally),?\s+)?i(?:\s+need|\s+should|\s+must|\s+will|['’]ll|\s+want|\s+have\s+to|['’]m\s+going|\s+am\s+going)\b",
        ),
        NoiseRule::pattern(
            "meta-transition-plan",
            Both,
            KeepPrefix,
            r"(?i)\.\s+(?:(?:and|so|now|also|but|then|finally),?\s+)?(?:let\s+me|let['’]s|make\s+sure\s+(?:i|the\s+(?:list|format|output)))\b",
        ),
        NoiseRule::predicate("emoji-only", Both, is_emoji_only),
        NoiseRule::predicate("horizontal-rule", Line, is_horizontal_rule),
        NoiseRule::drop("think-tag", Line, r"(?i)</?think>"),
        // (a) the model narrating its own plan
        NoiseRule::drop("self-let-me", Both, r"(?i)\blet me\b"),
        NoiseRule::drop(
            "self-lets",
            Both,
            r"(?i)\blet['’]?s\s+(?:start|begin|list|think|see|review|break|organi[sz]e|structure|put|outline|summari[sz]e|format|focus|go|make\s+sure|consider|look)\b",
        ),
        NoiseRule::drop(
            "self-need-to",
            Both,
            r"(?i)\bi\s+(?:need|have|want|ought|got)\s+to\b",
        ),
        NoiseRule::drop(
            "self-modal",
            Both,
            r"(?i)\bi(?:['’]ll|['’]d|\s+will|\s+should|\s+must|\s+shall|\s+would|\s+could|\s+can|\s+might|\s+may)\b",
        ),
        NoiseRule::drop(
            "self-state",
            Both,
            r"(?i)\bi(?:['’]m|\s+am)\s+(?:going|trying|thinking|supposed|not\s+sure|now|done|listing|providing)\b",
        ),
        NoiseRule::drop(
            "self-cognition",
            Both,
            r"(?i)\bi\s+(?:think|believe|guess|see|notice|noticed|recall|remember|wonder|considered|understand|realize)\b",
        ),
        NoiseRule::drop(
            "discourse-opener",
            Both,
            &leading(r"(?:okay|ok|alright|all right|hmm+|wait|well|got it|sure|understood|first of all|so)\s*[,.!:]"),
        ),
        NoiseRule::drop(
            "user-reference",
            Both,
            r"(?i)\b(?:the\s+user(?:['’]s)?|as\s+requested|you\s+asked|you\s+requested|your\s+request)\b",
        ),
        NoiseRule::drop(
            "intro-here-are",
            Both,
            &leading(r"here\s+(?:are|is)|below\s+(?:are|is)|the\s+following\b"),
        ),
        NoiseRule::drop(
            "intro-following",
            Both,
            r"(?i)\b(?:the\s+following|as\s+follows)\b[^.]*:\s*\**\s*$",
        ),
        NoiseRule::drop(
            "closing-remark",
            Both,
            &leading(r"i\s+hope|hope\s+this|these\s+recommendations\s+(?:should|will|can|aim|are)|by\s+(?:implementing|following)\s+these|in\s+(?:summary|conclusion)|to\s+(?:summarize|sum\s+up)|overall,"),
        ),
        // (b) restated formatting instructions
        NoiseRule::drop("format-markdown", Both, r"(?i)\bmarkdown\b"),
        NoiseRule::drop(
            "format-verb-rule",
            Both,
            r"(?i)\b(?:start|starts|begin|begins|starting|beginning)\s+with\s+(?:an?\s+)?(?:action\s+)?verbs?\b",
        ),
        NoiseRule::drop(
            "format-each-point",
            Both,
            r"(?i)\beach\s+(?:point|item|recommendation|bullet|line|category|entry)\s+(?:should|must|needs|will|has|starts|begins)\b",
        ),
        NoiseRule::drop(
            "format-thought-process",
            Both,
            r"(?i)\b(?:thought|thinking|reasoning)\s+process\b|\bmeta[- ]?commentary\b|\bchain[- ]of[- ]thought\b|\binternal\s+reasoning\b",
        ),
        NoiseRule::drop(
            "format-structure",
            Both,
            r"(?i)\b(?:output\s+format|the\s+format|this\s+format|same\s+format|formatting\s+rules?|format(?:ted)?\s+(?:as|like)|(?:use|using|in|as|with)\s+bullet\s+points?)\b",
        ),
        NoiseRule::drop(
            "format-count",
            Both,
            r"(?i)\b(?:\d+|three|four|five)\s*(?:-|to)\s*(?:\d+|four|five|six)\s+(?:unique\s+|distinct\s+)?(?:recommendations|items|points|bullets)\b|\bper\s+category\b",
        ),
        NoiseRule::drop(
            "format-duplicates",
            Both,
            r"(?i)\b(?:no|avoid|without)\s+(?:duplicates?|repetitions?|repeating)\b|\b(?:distinct|different)\s+from\s+(?:the\s+)?others\b",
        ),
        NoiseRule::drop(
            "instruction-label",
            Both,
            &leading(r"(?:reasoning|analysis|thoughts?|explanation|requirements?|instructions?|context|input|output|answer|response|final\s+answer|summary)\s*\**\s*:"),
        ),
        // (c) analysis of the input numbers
        NoiseRule::drop(
            "analysis-percent-houses",
            Both,
            r"(?i)%\s*(?:of\s+)?(?:the\s+)?(?:houses|households|homes|residences|population)\b",
        ),
        NoiseRule::drop(
            "analysis-factor-value",
            Both,
            r"(?i)\b(?:rainfall|temperature|drainage(?:\s+score)?|clean-?up(?:\s+(?:score|drive\s+frequency|frequency))?|waste\s+disposal|stagnant\s+water|dengue\s+cases|rainy\s+days|score)\s+(?:is|are|was|were|of|=|:|stands\s+at|remains)\s*(?:only\s+|just\s+|about\s+|around\s+|approximately\s+)?\d",
        ),
        NoiseRule::drop(
            "analysis-out-of",
            Both,
            r"(?i)\b\d+(?:\.\d+)?\s*(?:out\s+of|/)\s*5\b",
        ),
        NoiseRule::drop(
            "analysis-judgement",
            Both,
            // Standalone adjective only: "which is high." but not "that are high-risk".
            r"(?i)\b(?:that['’]?s|that\s+is|which\s+is|this\s+is|it['’]?s|it\s+is)\s+(?:quite\s+|very\s+|relatively\s+|moderately\s+|fairly\s+|pretty\s+|extremely\s+|really\s+|somewhat\s+|a\s+bit\s+|slightly\s+|too\s+)?(?:low|high|good|bad|moderate|poor|decent|average|concerning|significant|favorable|ideal|okay|great|alarming|elevated)(?:\s*(?:[.,;:!?)]|$)|\s+(?:for|but|and|so|compared|considering|given|overall|enough)\b)",
        ),
        NoiseRule::drop(
            "analysis-comparison",
            Both,
            r"(?i)\b(?:is|are)\s+(?:above|below|higher\s+than|lower\s+than|within)\s+(?:the\s+)?(?:average|normal|threshold|optimal|ideal|recommended|expected)\b",
        ),
        NoiseRule::drop(
            "analysis-degrees",
            Both,
            r"\d+(?:\.\d+)?\s*°\s*[CcFf]?",
        ),
        NoiseRule::drop(
            "analysis-predicted-cases",
            Both,
            r"(?i)\d[\d.,]*\s+(?:predicted|projected|expected|estimated)\s+(?:number\s+of\s+)?(?:dengue\s+)?cases\b|\b(?:predicted|projected|expected|estimated)\s+(?:number\s+of\s+)?(?:dengue\s+)?cases\s*(?:is|are|of|=|:|at|stands\s+at)?\s*(?:about\s+|around\s+|approximately\s+|only\s+)?\d",
        ),
        NoiseRule::drop(
            "analysis-input-reference",
            Both,
            r"(?i)\b(?:these|the\s+given|the\s+input|the\s+provided|given|input|provided)\s+(?:factors|values|numbers|inputs|parameters|data\s+points|figures|metrics|statistics)\b|\bbased\s+on\s+(?:the|these|this|your|those)\s+(?:data|factors|values|numbers|inputs?|parameters|information|analysis|predictions?|given)\b|\b(?:looking\s+at|considering|analy[sz]ing)\s+(?:the|these|this)\s+(?:data|factors|values|numbers|inputs?|parameters)\b",
        ),
        NoiseRule::drop(
            "prompt-echo",
            Both,
            &leading(r"predicted\s+dengue\s+cases|%\s+of\s+houses|drainage\s+score\s*\(|temperature\s*\(|rainfall\s*\(|community\s+clean-?up\s+drive\s+frequency"),
        ),
        // Item-only: leftovers of a split sentence.
        NoiseRule::drop(
            "item-conjunction-self",
            Item,
            r"(?i)^(?:and|but|so|also)\s+(?:i|we|let)\b",
        ),
    ]
});

/// Outcome of screening one line or item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep(String),
    Drop { rule: &'static str },
}

/// Run the rule table over `text` for the given pass.
pub fn screen(text: &str, pass: Scope) -> Verdict {
    let mut current = text.trim().to_string();
    for rule in NOISE_RULES.iter().filter(|r| r.scope.applies(pass)) {
        match rule.action {
            NoiseAction::KeepPrefix => {
                if let Some(start) = rule.match_start(&current) {
                    match salvage_prefix(&current[..start]) {
                        Some(prefix) => current = prefix,
                        None => return Verdict::Drop { rule: rule.label },
                    }
                }
            }
            NoiseAction::Drop => {
                if rule.is_match(&current) {
                    return Verdict::Drop { rule: rule.label };
                }
            }
        }
    }
    Verdict::Keep(current)
}

/// Keep the text before a meta-transition when it still says something.
fn salvage_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':'))
        .trim_end();
    let body = strip_list_marker(trimmed).trim();
    if body.chars().count() <= MIN_SALVAGE_CHARS || starts_with_and(body) {
        return None;
    }
    Some(format!("{trimmed}."))
}

fn starts_with_and(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .is_some_and(|w| w.eq_ignore_ascii_case("and"))
}

/// Drop `<think>...</think>` blocks; an unclosed block runs to the end.
fn strip_think_blocks(raw: &str) -> String {
    static THINK_BLOCK_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<think>.*?(?:</think>|\z)").expect("valid regex"));
    THINK_BLOCK_RE.replace_all(raw, "").into_owned()
}

/// Line-level pass over the whole raw text. Empty input is returned unchanged.
pub fn filter(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let text = strip_think_blocks(raw);
    let mut kept = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match screen(trimmed, Scope::Line) {
            Verdict::Keep(line) => kept.push(line),
            Verdict::Drop { rule } => debug!(rule, line = trimmed, "dropped noise line"),
        }
    }
    kept.join("\n")
}

/// Item-level re-check of list content. `None` when the item is all noise.
pub fn clean_item(content: &str) -> Option<String> {
    match screen(content, Scope::Item) {
        Verdict::Keep(text) if !text.is_empty() => Some(text),
        Verdict::Keep(_) => None,
        Verdict::Drop { rule } => {
            debug!(rule, item = content, "dropped noise item");
            None
        }
    }
}
