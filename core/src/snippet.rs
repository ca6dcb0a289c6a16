//! Snippet extraction: pick the most term-dense token window and mark the
//! query terms inside it.

use crate::tokenizer::tokenize_with_spans;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub text: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub fragments: Vec<Fragment>,
    /// The window starts after the beginning of the document.
    pub leading_ellipsis: bool,
    /// The window ends before the end of the document.
    pub trailing_ellipsis: bool,
}

impl Snippet {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn highlights(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().filter(|f| f.highlighted).map(|f| f.text.as_str())
    }

    /// Render as escaped HTML with `<mark>` around highlighted fragments.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if self.leading_ellipsis {
            out.push('…');
        }
        for f in &self.fragments {
            let escaped = html_escape::encode_text(&f.text);
            if f.highlighted {
                out.push_str("<mark>");
                out.push_str(&escaped);
                out.push_str("</mark>");
            } else {
                out.push_str(&escaped);
            }
        }
        if self.trailing_ellipsis {
            out.push('…');
        }
        out
    }
}

/// Build a snippet of at most `window` tokens from `text`.
///
/// The window with the most query-term hits wins, earliest on ties. With no
/// hits at all the first `window` tokens are returned unhighlighted. Text
/// between tokens inside the window is reproduced verbatim.
pub fn build_snippet(text: &str, query_terms: &HashSet<String>, window: usize) -> Snippet {
    let tokens = tokenize_with_spans(text);
    let window = window.min(tokens.len());
    if window == 0 {
        return Snippet::default();
    }

    let hits: Vec<bool> = tokens.iter().map(|t| query_terms.contains(&t.term)).collect();
    let mut count = hits[..window].iter().filter(|&&h| h).count();
    let (mut best, mut best_start) = (count, 0usize);
    for start in 1..=tokens.len() - window {
        if hits[start - 1] {
            count -= 1;
        }
        if hits[start + window - 1] {
            count += 1;
        }
        if count > best {
            best = count;
            best_start = start;
        }
    }

    let chosen = &tokens[best_start..best_start + window];
    let mut fragments: Vec<Fragment> = Vec::new();
    let mut plain = String::new();
    let mut cursor = chosen[0].span.start;
    for (tok, &hit) in chosen.iter().zip(&hits[best_start..best_start + window]) {
        plain.push_str(&text[cursor..tok.span.start]);
        let word = &text[tok.span.clone()];
        if hit {
            if !plain.is_empty() {
                fragments.push(Fragment { text: std::mem::take(&mut plain), highlighted: false });
            }
            fragments.push(Fragment { text: word.to_string(), highlighted: true });
        } else {
            plain.push_str(word);
        }
        cursor = tok.span.end;
    }
    if !plain.is_empty() {
        fragments.push(Fragment { text: plain, highlighted: false });
    }

    Snippet {
        fragments,
        leading_ellipsis: best_start > 0,
        trailing_ellipsis: best_start + window < tokens.len(),
    }
}
