use std::collections::HashSet;

/// Strips all HTML tags from user text, leaving HTML-safe plain text.
/// Used for post bodies and comments before they reach a view model.
pub fn strip_all_html(input: &str) -> String {
    ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

/// Turns HTML-safe text back into plain text for terminal output.
pub fn to_plain_text(safe_html: &str) -> String {
    html_escape::decode_html_entities(safe_html).into_owned()
}
