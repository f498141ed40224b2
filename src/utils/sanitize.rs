//! Filename sanitization utilities

/// Sanitize a path segment for safe filesystem usage
///
/// Replaces each character that is illegal on at least one major filesystem
/// (`< > : " / \ | ? *`) with a hyphen, so the same metadata always maps to
/// the same on-disk name.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '\0' => '-',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
