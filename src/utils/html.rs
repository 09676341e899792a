//! Escaping for Telegram's HTML parse mode.

/// Escape text placed between tags.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a value placed inside a single-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    escape_text(value)
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}
