//! BM25 ranking over the in-memory corpus.

use crate::config::Bm25Params;
use crate::corpus::Corpus;
use crate::tokenizer::tokenize;
use crate::DocId;
use std::collections::{BTreeMap, HashSet};

/// A parsed query: original text plus its normalized terms (repeats kept).
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub raw: String,
    pub terms: Vec<String>,
}

impl Query {
    pub fn parse(raw: &str) -> Self {
        Self { raw: raw.to_string(), terms: tokenize(raw) }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Distinct terms with their in-query counts, in a stable order.
    pub fn term_counts(&self) -> BTreeMap<&str, u32> {
        let mut counts = BTreeMap::new();
        for t in &self.terms {
            *counts.entry(t.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn distinct_terms(&self) -> HashSet<String> {
        self.terms.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoc {
    pub id: DocId,
    pub score: f64,
}

/// `ln(1 + (N - df + 0.5) / (df + 0.5))`; always positive for `df <= N`.
pub fn idf(n_docs: usize, df: u32) -> f64 {
    let n = n_docs as f64;
    let df = f64::from(df);
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}

pub fn term_score(idf: f64, tf: u32, doc_len: u32, avg_doc_len: f64, params: Bm25Params) -> f64 {
    let tf = f64::from(tf);
    let norm = if avg_doc_len > 0.0 { f64::from(doc_len) / avg_doc_len } else { 0.0 };
    let denom = tf + params.k1 * (1.0 - params.b + params.b * norm);
    if denom == 0.0 {
        return 0.0;
    }
    idf * (tf * (params.k1 + 1.0)) / denom
}

/// Score every document that contains at least one query term. Results are
/// sorted by score descending, then document id ascending; nothing is
/// truncated here.
pub fn rank(corpus: &Corpus, query: &Query, params: Bm25Params) -> Vec<ScoredDoc> {
    let (n_docs, _) = corpus.store().stats();
    if query.is_empty() || n_docs == 0 {
        return Vec::new();
    }
    let avg_len = corpus.store().avg_length();

    let mut scores: BTreeMap<&DocId, f64> = BTreeMap::new();
    for (term, q_count) in query.term_counts() {
        let Some(postings) = corpus.index().postings_for(term) else {
            continue;
        };
        let term_idf = idf(n_docs, corpus.index().document_frequency(term));
        for (id, &tf) in postings {
            let Some(doc) = corpus.get(id) else {
                continue;
            };
            let contrib = term_score(term_idf, tf, doc.length, avg_len, params);
            *scores.entry(id).or_insert(0.0) += f64::from(q_count) * contrib;
        }
    }

    let mut ranked: Vec<ScoredDoc> = scores
        .into_iter()
        .map(|(id, score)| ScoredDoc { id: id.clone(), score })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    ranked
}

/// [`rank`] truncated to `limit`.
pub fn search(corpus: &Corpus, query: &str, limit: usize, params: Bm25Params) -> Vec<ScoredDoc> {
    if limit == 0 {
        return Vec::new();
    }
    let mut ranked = rank(corpus, &Query::parse(query), params);
    ranked.truncate(limit);
    ranked
}
