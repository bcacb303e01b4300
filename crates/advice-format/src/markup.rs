/// Inline markup handling for recommendation items.
///
/// Items leave the pipeline HTML-escaped, with `<strong>` and `<em>` as the only
/// tags let through. Everything here is total over its input.
use once_cell::sync::Lazy;
use regex::Regex;

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+?)\*\*").expect("valid regex"));
static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").expect("valid regex"));
static EMPHASIS_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?(?:strong|em)>").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_html(text: &str) -> String {
    // `&amp;` last so that an escaped entity is not decoded twice.
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Escape the text, then turn `**bold**` into `<strong>` and `*italic*` into `<em>`.
pub fn render_inline(text: &str) -> String {
    let escaped = escape_html(text.trim());
    let bold = BOLD_RE.replace_all(&escaped, "<strong>$1</strong>");
    ITALIC_RE.replace_all(&bold, "<em>$1</em>").into_owned()
}

/// Remove emphasis tags and markdown emphasis characters, decoding entities.
pub fn strip_markup(text: &str) -> String {
    let without_tags = EMPHASIS_TAG_RE.replace_all(text, "");
    let without_markers: String = without_tags
        .chars()
        .filter(|c| !matches!(c, '*' | '`'))
        .collect();
    unescape_html(&without_markers)
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Equality key for items: markup stripped, whitespace collapsed, lowercased.
pub fn canonical_form(text: &str) -> String {
    collapse_whitespace(&strip_markup(text)).to_lowercase()
}

/// Display text with all markup removed, as used for clipboard/PDF export.
pub fn plain_text(text: &str) -> String {
    collapse_whitespace(&strip_markup(text))
}

pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF
            | 0x2300..=0x23FF
            | 0x2600..=0x27BF
            | 0x2B00..=0x2BFF
            | 0xFE00..=0xFE0F
            | 0x200D
            | 0x20E3
            | 0xE0020..=0xE007F
    )
}

/// True when the text has at least one emoji and nothing else but whitespace
/// and punctuation.
pub fn is_emoji_only(text: &str) -> bool {
    let mut saw_emoji = false;
    for c in text.chars() {
        if is_emoji(c) {
            saw_emoji = true;
        } else if c.is_alphanumeric() {
            return false;
        }
    }
    saw_emoji
}

pub fn trim_leading_emoji(text: &str) -> &str {
    text.trim_start_matches(|c: char| is_emoji(c) || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_inline_converts_emphasis() {
        assert_eq!(
            render_inline("**Eliminate breeding sites**: cover *all* containers"),
            "<strong>Eliminate breeding sites</strong>: cover <em>all</em> containers"
        );
    }

    #[test]
    fn render_inline_escapes_other_markup() {
        assert_eq!(
            render_inline("Use <script>alert(1)</script> & nets"),
            "Use &lt;script&gt;alert(1)&lt;/script&gt; &amp; nets"
        );
    }

    #[test]
    fn canonical_form_ignores_markup_case_and_spacing() {
        let rendered = render_inline("**Cover**   water  containers");
        assert_eq!(canonical_form(&rendered), "cover water containers");
        assert_eq!(canonical_form("COVER water containers"), "cover water containers");
    }

    #[test]
    fn plain_text_decodes_entities() {
        assert_eq!(plain_text("Don&#39;t <em>store</em> water"), "Don't store water");
    }

    #[test]
    fn title_case_capitalizes_each_word() {
        assert_eq!(title_case("personal  protection tips"), "Personal Protection Tips");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn emoji_only_detection() {
        assert!(is_emoji_only("🦟 🌿"));
        assert!(is_emoji_only("✅!"));
        assert!(!is_emoji_only("🦟 Use nets"));
        assert!(!is_emoji_only("•"));
        assert!(!is_emoji_only(""));
    }
}
