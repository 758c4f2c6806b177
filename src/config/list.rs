//! Delimiter-separated configuration values.

/// Split a configuration value into trimmed, non-empty tokens.
///
/// Leading, trailing and repeated delimiters produce no tokens, and neither do
/// segments that are blank after trimming. `None`, empty and whitespace-only
/// input all yield an empty vector, which callers treat as "not configured".
///
/// # Example
///
/// ```rust
/// use pipeline_defaults::split_list;
///
/// let origins = split_list(Some("https://a.example; ;https://b.example;"), ';');
/// assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
/// assert!(split_list(Some("   "), ',').is_empty());
/// ```
pub fn split_list(raw: Option<&str>, delimiter: char) -> Vec<String> {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Vec::new(),
    };

    // Count first so the result is allocated once.
    let segments = raw.chars().filter(|&c| c == delimiter).count() + 1;
    let mut tokens = Vec::with_capacity(segments);

    let mut start = 0;
    for (i, c) in raw.char_indices() {
        if c == delimiter {
            push_token(&mut tokens, &raw[start..i]);
            start = i + c.len_utf8();
        }
    }
    push_token(&mut tokens, &raw[start..]);

    tokens
}

fn push_token(tokens: &mut Vec<String>, segment: &str) {
    let token = segment.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
}
