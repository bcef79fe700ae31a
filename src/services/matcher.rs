//! Tolerant comparison of upstream destination text against configured aliases.
//!
//! Upstream front text is sometimes transliterated ("Sandvikvag") and often
//! carries suffixes ("Sandvikvåg ferjekai"), so matching is done on a folded
//! form and uses substring containment.

use unicode_normalization::UnicodeNormalization;

/// Combining Diacritical Marks block
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Lowercase, decompose (NFKD) and strip diacritics
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// True if the destination contains any of the aliases after normalization
pub fn matches<S: AsRef<str>>(destination: &str, aliases: &[S]) -> bool {
    let destination = normalize(destination);
    aliases
        .iter()
        .any(|alias| destination.contains(&normalize(alias.as_ref())))
}
