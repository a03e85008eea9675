use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Dashes and apostrophes join: "Al-Farsi" and "alfarsi" are one term.
    static ref JOINERS: Regex = Regex::new(r"[\p{Pd}'\x{2019}]").expect("valid regex");
    /// Any other punctuation or symbol separates: "flight/hotel" is two terms.
    static ref SEPARATORS: Regex = Regex::new(r"[\p{P}\p{S}]").expect("valid regex");
}

/// Normalize text into terms: NFKC, lowercase, drop dashes and apostrophes,
/// turn other punctuation and symbols into spaces, split on whitespace.
/// Used unchanged at build and query time.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let joined = JOINERS.replace_all(&normalized, "");
    SEPARATORS
        .replace_all(&joined, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Distinct terms of `text`, sorted.
pub fn unique_terms(text: &str) -> Vec<String> {
    let mut terms = tokenize(text);
    terms.sort_unstable();
    terms.dedup();
    terms
}
