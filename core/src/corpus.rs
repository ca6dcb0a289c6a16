//! The document store and inverted index, owned together.
//!
//! Every mutation goes through [`Corpus::upsert`] or [`Corpus::remove`], which
//! keep the two structures in lockstep. Callers share a corpus as
//! [`SharedCorpus`] and hold the write lock for exactly one document update,
//! so concurrent readers see either the old or the new state of a document.

use crate::error::{CoreError, Result};
use crate::index::InvertedIndex;
use crate::store::{AnalyzedText, Document, DocumentStore, FileStamp};
use crate::DocId;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

pub type SharedCorpus = Arc<RwLock<Corpus>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Added,
    Updated,
}

#[derive(Debug, Default)]
pub struct Corpus {
    store: DocumentStore,
    index: InvertedIndex,
    /// Bumped on every successful mutation.
    generation: u64,
    #[cfg(test)]
    pub(crate) update_delay: Option<std::time::Duration>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCorpus {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Index `analyzed` under `id`, replacing any previous version. The old
    /// postings are removed using the *previous* term table before the new
    /// ones are added.
    pub fn upsert(
        &mut self,
        id: DocId,
        path: &Path,
        rel_path: &str,
        analyzed: AnalyzedText,
        stamp: FileStamp,
    ) -> Result<UpsertKind> {
        let kind = match self.store.get(&id) {
            Some(old) => {
                self.index.remove_document(&id, &old.term_freqs)?;
                UpsertKind::Updated
            }
            None => UpsertKind::Added,
        };
        self.pause_mid_update();
        let doc = self.store.upsert(id, path, rel_path, analyzed, stamp);
        self.index.add_document(&doc.id, &doc.term_freqs)?;
        self.generation += 1;
        Ok(kind)
    }

    /// Drop `id` from both structures. Returns false if it was not indexed.
    pub fn remove(&mut self, id: &DocId) -> Result<bool> {
        let Some(old) = self.store.get(id) else {
            return Ok(false);
        };
        self.index.remove_document(id, &old.term_freqs)?;
        self.store.remove(id);
        self.generation += 1;
        Ok(true)
    }

    #[cfg(test)]
    fn pause_mid_update(&self) {
        if let Some(delay) = self.update_delay {
            std::thread::sleep(delay);
        }
    }

    #[cfg(not(test))]
    #[inline]
    fn pause_mid_update(&self) {}

    #[cfg(test)]
    pub(crate) fn corrupt_posting(&mut self, term: &str, id: &DocId) {
        self.index.drop_posting(term, id);
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn get(&self, id: &DocId) -> Option<&Document> {
        self.store.get(id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check that one document's term table matches its postings.
    pub fn check_document(&self, id: &DocId) -> Result<()> {
        let Some(doc) = self.store.get(id) else {
            return Ok(());
        };
        let sum: u64 = doc.term_freqs.values().map(|&tf| u64::from(tf)).sum();
        if sum != u64::from(doc.length) {
            return Err(CoreError::invariant(format!(
                "document {id} has length {} but term frequencies sum to {sum}",
                doc.length
            )));
        }
        for (term, &tf) in &doc.term_freqs {
            match self.index.postings_for(term).and_then(|p| p.get(id)) {
                Some(&posted) if posted == tf => {}
                other => {
                    return Err(CoreError::invariant(format!(
                        "document {id} has tf {tf} for {term:?} but index holds {other:?}"
                    )))
                }
            }
        }
        Ok(())
    }

    /// Full two-way consistency check between store and index.
    pub fn check_consistency(&self) -> Result<()> {
        self.index.check_invariants()?;
        let mut postings = 0usize;
        for (term, entry) in self.index.iter() {
            for (id, &tf) in &entry.postings {
                postings += 1;
                let held = self.store.get(id).and_then(|d| d.term_freqs.get(term)).copied();
                if held != Some(tf) {
                    return Err(CoreError::invariant(format!(
                        "posting ({term:?}, {id}) = {tf} but store holds {held:?}"
                    )));
                }
            }
        }
        let mut expected = 0usize;
        for doc in self.store.iter() {
            self.check_document(&doc.id)?;
            expected += doc.term_freqs.len();
        }
        if postings != expected {
            return Err(CoreError::invariant(format!(
                "index holds {postings} postings but store expects {expected}"
            )));
        }
        Ok(())
    }
}
