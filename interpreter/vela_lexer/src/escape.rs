//! String escape processing.
//!
//! Vela string literals recognize exactly two escape sequences: `\"` and
//! `\\`. Any other backslash is not an escape and is kept literally, along
//! with the character that follows it.

/// Cook the body of a string literal (without the surrounding quotes).
pub fn cook(raw: &str) -> String {
    let mut cooked = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            cooked.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => cooked.push('"'),
            Some('\\') => cooked.push('\\'),
            Some(other) => {
                cooked.push('\\');
                cooked.push(other);
            }
            // A trailing backslash cannot occur in a terminated literal,
            // since `\"` would have hidden the closing quote.
            None => cooked.push('\\'),
        }
    }
    cooked
}

/// Quote a string as a Vela literal, escaping `"` and `\`.
///
/// `cook(quote(s) body) == s` for every `s`; used when printing the
/// environment in re-parseable form.
pub fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
