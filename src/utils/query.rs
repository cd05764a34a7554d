/// Escapes a user-provided value for interpolation inside a double-quoted
/// openFDA phrase (`field:"value"`).
///
/// Only the characters that can terminate or corrupt the phrase are escaped;
/// everything else is matched literally by the upstream search syntax.
pub(crate) fn escape_phrase_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' | '"' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Formats `field:"value"` with the value escaped.
pub(crate) fn phrase(field: &str, value: &str) -> String {
    format!("{field}:\"{}\"", escape_phrase_value(value.trim()))
}
