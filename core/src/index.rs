use crate::error::{CoreError, Result};
use crate::DocId;
use std::collections::HashMap;

/// doc id -> term frequency in that document.
pub type PostingList = HashMap<DocId, u32>;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TermEntry {
    pub postings: PostingList,
    /// Number of documents containing the term; always `postings.len()`.
    pub df: u32,
}

/// Term -> postings. Entries with an empty posting list are never kept.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    terms: HashMap<String, TermEntry>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, doc_id: &DocId, term_freqs: &HashMap<String, u32>) -> Result<()> {
        for (term, &tf) in term_freqs {
            let entry = self.terms.entry(term.clone()).or_default();
            if entry.postings.insert(doc_id.clone(), tf).is_none() {
                entry.df += 1;
            }
            check_entry(term, entry)?;
        }
        Ok(())
    }

    /// Remove `doc_id`'s postings for every term in its previous frequency
    /// table. Validates first so a failed call leaves the index untouched.
    pub fn remove_document(&mut self, doc_id: &DocId, term_freqs: &HashMap<String, u32>) -> Result<()> {
        for term in term_freqs.keys() {
            let present = self.terms.get(term).is_some_and(|e| e.postings.contains_key(doc_id));
            if !present {
                return Err(CoreError::invariant(format!(
                    "document {doc_id} has term {term:?} but no matching posting"
                )));
            }
        }
        for term in term_freqs.keys() {
            if let Some(entry) = self.terms.get_mut(term) {
                entry.postings.remove(doc_id);
                entry.df = entry.df.saturating_sub(1);
                if entry.postings.is_empty() {
                    self.terms.remove(term);
                } else {
                    check_entry(term, entry)?;
                }
            }
        }
        Ok(())
    }

    pub fn postings_for(&self, term: &str) -> Option<&PostingList> {
        self.terms.get(term).map(|e| &e.postings)
    }

    pub fn document_frequency(&self, term: &str) -> u32 {
        self.terms.get(term).map(|e| e.df).unwrap_or(0)
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TermEntry)> {
        self.terms.iter()
    }

    /// Drop one posting while keeping `df` in step, leaving the index
    /// internally valid but out of sync with the store.
    #[cfg(test)]
    pub(crate) fn drop_posting(&mut self, term: &str, doc_id: &DocId) {
        if let Some(entry) = self.terms.get_mut(term) {
            if entry.postings.remove(doc_id).is_some() {
                entry.df -= 1;
            }
            if entry.postings.is_empty() {
                self.terms.remove(term);
            }
        }
    }

    /// Full scan of the per-term invariants.
    pub fn check_invariants(&self) -> Result<()> {
        for (term, entry) in &self.terms {
            if entry.postings.is_empty() {
                return Err(CoreError::invariant(format!("term {term:?} has an empty posting list")));
            }
            check_entry(term, entry)?;
        }
        Ok(())
    }
}

fn check_entry(term: &str, entry: &TermEntry) -> Result<()> {
    if entry.df as usize != entry.postings.len() {
        return Err(CoreError::invariant(format!(
            "term {term:?} has df {} but {} postings",
            entry.df,
            entry.postings.len()
        )));
    }
    Ok(())
}
