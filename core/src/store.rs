use crate::tokenizer::{term_frequencies, tokenize};
use crate::DocId;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// What change detection compares between scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileStamp {
    pub modified: SystemTime,
    pub size: u64,
}

impl FileStamp {
    pub fn new(modified: SystemTime, size: u64) -> Self {
        Self { modified, size }
    }

    pub fn unix_secs(&self) -> u64 {
        self.modified.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub path: PathBuf,
    /// Path relative to the indexed root, `/`-separated.
    pub rel_path: String,
    pub title: String,
    pub stamp: FileStamp,
    /// Total token count, repeats included.
    pub length: u32,
    pub term_freqs: HashMap<String, u32>,
    /// Extracted text, retained for snippets.
    pub text: Arc<str>,
}

/// Extracted text together with its term table. Built outside any lock so the
/// store only has to move it into place.
#[derive(Debug, Clone)]
pub struct AnalyzedText {
    text: String,
    length: u32,
    term_freqs: HashMap<String, u32>,
}

impl AnalyzedText {
    pub fn new(text: String) -> Self {
        let tokens = tokenize(&text);
        let length = tokens.len() as u32;
        let term_freqs = term_frequencies(tokens);
        Self { text, length, term_freqs }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn term_freqs(&self) -> &HashMap<String, u32> {
        &self.term_freqs
    }
}

impl From<String> for AnalyzedText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for AnalyzedText {
    fn from(text: &str) -> Self {
        Self::new(text.to_string())
    }
}

/// Per-document metadata and derived statistics.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<DocId, Document>,
    total_length: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the entry for `id`. Nothing of the previous
    /// entry survives.
    pub fn upsert(&mut self, id: DocId, path: &Path, rel_path: &str, analyzed: AnalyzedText, stamp: FileStamp) -> &Document {
        let AnalyzedText { text, length, term_freqs } = analyzed;
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel_path.to_string());
        let doc = Document {
            id: id.clone(),
            path: path.to_path_buf(),
            rel_path: rel_path.to_string(),
            title,
            stamp,
            length,
            term_freqs,
            text: Arc::from(text),
        };
        self.total_length += u64::from(length);
        if let Some(prev) = self.docs.insert(id.clone(), doc) {
            self.total_length -= u64::from(prev.length);
        }
        &self.docs[&id]
    }

    /// Remove the entry; absent ids are a no-op.
    pub fn remove(&mut self, id: &DocId) -> Option<Document> {
        let prev = self.docs.remove(id)?;
        self.total_length -= u64::from(prev.length);
        Some(prev)
    }

    pub fn get(&self, id: &DocId) -> Option<&Document> {
        self.docs.get(id)
    }

    pub fn find_by_rel_path(&self, rel_path: &str) -> Option<&Document> {
        self.docs.values().find(|d| d.rel_path == rel_path)
    }

    /// `(document_count, total_length)`.
    pub fn stats(&self) -> (usize, u64) {
        (self.docs.len(), self.total_length)
    }

    pub fn avg_length(&self) -> f64 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_length as f64 / self.docs.len() as f64
        }
    }

    pub fn stamps(&self) -> HashMap<DocId, FileStamp> {
        self.docs.iter().map(|(id, d)| (id.clone(), d.stamp)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(size: u64) -> FileStamp {
        FileStamp::new(UNIX_EPOCH, size)
    }

    #[test]
    fn upsert_tracks_length_and_totals() {
        let mut store = DocumentStore::new();
        let id = DocId::new("/r/a.txt");
        let doc = store.upsert(id.clone(), Path::new("/r/a.txt"), "a.txt", "the cat the".into(), stamp(11));
        assert_eq!(doc.length, 3);
        assert_eq!(doc.term_freqs["the"], 2);
        assert_eq!(doc.title, "a.txt");
        assert_eq!(store.stats(), (1, 3));

        store.upsert(id.clone(), Path::new("/r/a.txt"), "a.txt", "dog".into(), stamp(3));
        assert_eq!(store.stats(), (1, 1));
        assert_eq!(store.get(&id).unwrap().term_freqs.get("cat"), None);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut store = DocumentStore::new();
        assert!(store.remove(&DocId::new("/missing")).is_none());
        assert_eq!(store.stats(), (0, 0));
        assert_eq!(store.avg_length(), 0.0);
    }

    #[test]
    fn length_equals_sum_of_frequencies() {
        let mut store = DocumentStore::new();
        let doc = store.upsert(
            DocId::new("/r/b.md"),
            Path::new("/r/b.md"),
            "b.md",
            "One fish, two fish; red fish... blue FISH!".into(),
            stamp(40),
        );
        let sum: u32 = doc.term_freqs.values().sum();
        assert_eq!(sum, doc.length);
    }

    #[test]
    fn upsert_stores_the_precomputed_table() {
        let analyzed = AnalyzedText::new("Red red BLUE".to_string());
        assert_eq!(analyzed.length(), 3);
        assert_eq!(analyzed.term_freqs()["red"], 2);

        let mut store = DocumentStore::new();
        let expected = analyzed.term_freqs().clone();
        let doc = store.upsert(DocId::new("/r/c.txt"), Path::new("/r/c.txt"), "c.txt", analyzed, stamp(12));
        assert_eq!(doc.term_freqs, expected);
        assert_eq!(doc.length, 3);
        assert_eq!(&*doc.text, "Red red BLUE");
        assert_eq!(store.stats(), (1, 3));
    }
}
