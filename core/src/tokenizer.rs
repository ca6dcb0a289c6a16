use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;

lazy_static! {
    // Maximal runs of Unicode letters and digits; everything else separates.
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid regex");
}

/// A normalized term plus the byte span it occupied in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub span: Range<usize>,
}

/// Tokenize text into lower-cased terms. No stemming, no stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    RE.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

/// Like [`tokenize`] but keeps each term's byte offsets into `text`, so
/// callers can reproduce the original text between tokens.
pub fn tokenize_with_spans(text: &str) -> Vec<Token> {
    RE.find_iter(text)
        .map(|m| Token { term: m.as_str().to_lowercase(), span: m.range() })
        .collect()
}

/// Count occurrences of each term.
pub fn term_frequencies<I, S>(terms: I) -> HashMap<String, u32>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tf: HashMap<String, u32> = HashMap::new();
    for t in terms {
        *tf.entry(t.into()).or_insert(0) += 1;
    }
    tf
}
