use crate::services::slugger::Slugger;

/// Substitutions applied before transliteration, in order.
pub fn default_replacements() -> Vec<(String, String)> {
    [
        ("#", "hash"),
        ("?", "question"),
        ("+", "and"),
        ("&", "and"),
        ("\"", ""),
        ("'", ""),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

/// Sequential literal substitution: each pair runs over the output of the
/// previous one.
pub fn apply_replacements(text: &str, replacements: &[(String, String)]) -> String {
    let mut out = text.to_string();
    for (from, to) in replacements {
        if !from.is_empty() && out.contains(from.as_str()) {
            out = out.replace(from.as_str(), to);
        }
    }
    out
}

pub fn normalize(
    text: &str,
    separator: &str,
    replacements: &[(String, String)],
    slugger: &dyn Slugger,
) -> String {
    slugger.slug(&apply_replacements(text, replacements), separator)
}

/// Cuts `slug` to at most `max_length` characters. Never splits a
/// multi-byte character and never appends an ellipsis.
pub fn truncate(slug: &str, max_length: Option<usize>) -> String {
    match max_length {
        Some(max) => match slug.char_indices().nth(max) {
            Some((byte_index, _)) => slug[..byte_index].to_string(),
            None => slug.to_string(),
        },
        None => slug.to_string(),
    }
}

/// Whether `slug` looks like normalizer output: non-empty, ASCII
/// alphanumerics joined by single separators, no separator at either end.
pub fn validate_slug(slug: &str, separator: &str) -> bool {
    if slug.is_empty() {
        return false;
    }
    if separator.is_empty() {
        return slug.chars().all(|c| c.is_ascii_alphanumeric());
    }
    slug.split(separator)
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()))
}
