//! Text canonicalization for header and body comparison.

/// Lowercase, trim, and collapse every whitespace run into one ASCII space.
///
/// `"  Hello\t\tWorld\n"` → `"hello world"`. Total and idempotent.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for word in lowered.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
