use regex::Regex;

fn stylesheet_reference_ignores() -> &'static [Regex] {
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"(?i)^[a-z][a-z0-9+.-]*://").expect("invalid scheme regex"),
                Regex::new(r"^//").expect("invalid protocol-relative regex"),
                Regex::new(r"(?i)^data:").expect("invalid data URI regex"),
                Regex::new(r"(?i)^mailto:").expect("invalid mailto regex"),
                Regex::new(r"^#").expect("invalid fragment regex"),
            ]
        })
        .as_slice()
}

/// Determine whether a stylesheet `url()` body should be left untouched.
///
/// Remote URLs, data URIs and same-document fragments do not name a file in the output tree.
pub fn should_ignore_stylesheet_reference(value: &str) -> bool {
    value.is_empty()
        || stylesheet_reference_ignores()
            .iter()
            .any(|pattern| pattern.is_match(value))
}
