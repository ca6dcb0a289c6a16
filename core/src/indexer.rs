//! Incremental reindexing.
//!
//! A cycle enumerates the source, skips files whose stamp is unchanged,
//! re-extracts the rest and applies each document as one write-locked
//! update. Only one cycle runs at a time; triggers that arrive while a cycle
//! is in flight are coalesced into it.

use crate::corpus::{SharedCorpus, UpsertKind};
use crate::error::Result;
use crate::source::DocumentSource;
use crate::store::AnalyzedText;
use crate::DocId;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use time::OffsetDateTime;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    /// Indexed documents left alone because their directory was unreadable.
    pub retained: usize,
    pub took_ms: u128,
}

impl ReindexReport {
    /// Number of store/index mutations the cycle performed.
    pub fn mutations(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReindexOutcome {
    Completed(ReindexReport),
    /// Another cycle was already running; this trigger was folded into it.
    Coalesced,
}

#[derive(Debug, Clone, Default)]
pub struct IndexerStatus {
    pub last_reindex: Option<OffsetDateTime>,
    pub last_report: Option<ReindexReport>,
    pub last_error: Option<String>,
    pub cycles: u64,
}

pub struct Indexer {
    corpus: SharedCorpus,
    source: Box<dyn DocumentSource>,
    in_flight: AtomicBool,
    status: Mutex<IndexerStatus>,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Indexer {
    pub fn new(corpus: SharedCorpus, source: Box<dyn DocumentSource>) -> Self {
        Self { corpus, source, in_flight: AtomicBool::new(false), status: Mutex::new(IndexerStatus::default()) }
    }

    pub fn corpus(&self) -> &SharedCorpus {
        &self.corpus
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn status(&self) -> IndexerStatus {
        self.status.lock().clone()
    }

    /// Run one cycle unless one is already running.
    pub fn reindex(&self) -> Result<ReindexOutcome> {
        if self.in_flight.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            tracing::debug!("reindex already in flight, coalescing trigger");
            return Ok(ReindexOutcome::Coalesced);
        }
        let _guard = InFlight(&self.in_flight);

        let started = Instant::now();
        let result = self.run_cycle();
        let mut status = self.status.lock();
        status.cycles += 1;
        match result {
            Ok(mut report) => {
                report.took_ms = started.elapsed().as_millis();
                tracing::info!(
                    added = report.added,
                    updated = report.updated,
                    removed = report.removed,
                    unchanged = report.unchanged,
                    skipped = report.skipped,
                    retained = report.retained,
                    took_ms = report.took_ms as u64,
                    "reindex complete"
                );
                status.last_reindex = Some(OffsetDateTime::now_utc());
                status.last_report = Some(report.clone());
                status.last_error = None;
                Ok(ReindexOutcome::Completed(report))
            }
            Err(err) => {
                tracing::error!(error = %err, "reindex cycle aborted, keeping previous state");
                status.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn run_cycle(&self) -> Result<ReindexReport> {
        let listing = self.source.enumerate()?;
        let known = self.corpus.read().store().stamps();
        let mut report = ReindexReport::default();
        let mut present: HashSet<DocId> = HashSet::with_capacity(listing.entries.len());

        for entry in &listing.entries {
            let id = entry.doc_id();
            if known.get(&id) == Some(&entry.stamp) {
                report.unchanged += 1;
                present.insert(id);
                continue;
            }
            let text = match self.source.extract(entry) {
                Ok(text) => text,
                Err(err) if err.is_extraction() => {
                    // Treated as absent; a previously indexed copy is dropped below.
                    tracing::warn!(path = %entry.path.display(), error = %err, "skipping file");
                    report.skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };
            // Tokenize before taking the write lock.
            let analyzed = AnalyzedText::new(text);
            let kind = self.corpus.write().upsert(id.clone(), &entry.path, &entry.rel_path, analyzed, entry.stamp)?;
            match kind {
                UpsertKind::Added => report.added += 1,
                UpsertKind::Updated => report.updated += 1,
            }
            tracing::debug!(path = %entry.path.display(), ?kind, "indexed");
            present.insert(id);
        }

        for id in known.keys().filter(|id| !present.contains(*id)) {
            if listing.is_unreadable(Path::new(id.as_str())) {
                report.retained += 1;
                continue;
            }
            if self.corpus.write().remove(id)? {
                report.removed += 1;
                tracing::debug!(doc = %id, "removed");
            }
        }

        if cfg!(debug_assertions) {
            self.corpus.read().check_consistency()?;
        }
        Ok(report)
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("root", &self.source.root())
            .field("in_flight", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::error::CoreError;
    use crate::query::search;
    use crate::source::{Listing, SourceEntry};
    use crate::store::FileStamp;
    use crate::Bm25Params;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    /// In-memory source: name -> (version, text). `None` text fails extraction.
    #[derive(Default)]
    struct MemSource {
        files: Mutex<BTreeMap<String, (u64, Option<String>)>>,
        extractions: AtomicUsize,
    }

    impl MemSource {
        fn put(&self, name: &str, version: u64, text: Option<&str>) {
            self.files.lock().insert(name.to_string(), (version, text.map(str::to_string)));
        }
        fn delete(&self, name: &str) {
            self.files.lock().remove(name);
        }
    }

    impl DocumentSource for Arc<MemSource> {
        fn root(&self) -> &Path {
            Path::new("/mem")
        }
        fn enumerate(&self) -> Result<Listing> {
            let entries = self
                .files
                .lock()
                .iter()
                .map(|(name, (version, _))| SourceEntry {
                    path: PathBuf::from("/mem").join(name),
                    rel_path: name.clone(),
                    extension: "txt".into(),
                    stamp: FileStamp::new(UNIX_EPOCH + Duration::from_secs(*version), *version),
                })
                .collect();
            Ok(Listing::complete(entries))
        }
        fn extract(&self, entry: &SourceEntry) -> Result<String> {
            self.extractions.fetch_add(1, Ordering::SeqCst);
            match self.files.lock().get(&entry.rel_path) {
                Some((_, Some(text))) => Ok(text.clone()),
                _ => Err(CoreError::Extraction {
                    path: entry.path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, "unparseable"),
                }),
            }
        }
    }

    fn setup() -> (Arc<MemSource>, Indexer) {
        let src = Arc::new(MemSource::default());
        let indexer = Indexer::new(Corpus::shared(), Box::new(src.clone()));
        (src, indexer)
    }

    fn completed(outcome: ReindexOutcome) -> ReindexReport {
        match outcome {
            ReindexOutcome::Completed(r) => r,
            ReindexOutcome::Coalesced => panic!("expected a completed cycle"),
        }
    }

    #[test]
    fn second_pass_over_unchanged_files_is_a_noop() {
        let (src, indexer) = setup();
        src.put("a.txt", 1, Some("alpha beta"));
        src.put("b.txt", 1, Some("beta gamma"));

        let first = completed(indexer.reindex().unwrap());
        assert_eq!(first.added, 2);
        let generation = indexer.corpus().read().generation();
        let extractions = src.extractions.load(Ordering::SeqCst);

        let second = completed(indexer.reindex().unwrap());
        assert_eq!(second.mutations(), 0);
        assert_eq!(second.unchanged, 2);
        assert_eq!(indexer.corpus().read().generation(), generation);
        assert_eq!(src.extractions.load(Ordering::SeqCst), extractions);
        assert!(indexer.status().last_reindex.is_some());
    }

    #[test]
    fn detects_updates_and_deletions() {
        let (src, indexer) = setup();
        src.put("a.txt", 1, Some("alpha beta"));
        src.put("b.txt", 1, Some("beta"));
        indexer.reindex().unwrap();

        src.put("a.txt", 2, Some("delta"));
        src.delete("b.txt");
        let report = completed(indexer.reindex().unwrap());
        assert_eq!((report.updated, report.removed), (1, 1));

        let corpus = indexer.corpus().read();
        assert_eq!(corpus.index().document_frequency("beta"), 0);
        assert!(!corpus.index().contains_term("alpha"));
        assert_eq!(corpus.index().document_frequency("delta"), 1);
        corpus.check_consistency().unwrap();
    }

    #[test]
    fn extraction_failure_skips_and_drops_stale_copy() {
        let (src, indexer) = setup();
        src.put("a.txt", 1, Some("alpha"));
        src.put("b.txt", 1, Some("beta"));
        indexer.reindex().unwrap();

        src.put("a.txt", 2, None);
        let report = completed(indexer.reindex().unwrap());
        assert_eq!(report.skipped, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(indexer.corpus().read().store().stats().0, 1);
    }

    #[test]
    fn invariant_violation_aborts_and_keeps_previous_document() {
        let (src, indexer) = setup();
        src.put("a.txt", 1, Some("alpha beta"));
        src.put("b.txt", 1, Some("beta"));
        indexer.reindex().unwrap();

        let id = DocId::from_path(Path::new("/mem/a.txt"));
        indexer.corpus().write().corrupt_posting("alpha", &id);
        let generation = indexer.corpus().read().generation();

        src.put("a.txt", 2, Some("gamma"));
        let err = indexer.reindex().unwrap_err();
        assert!(matches!(err, CoreError::InvariantViolation(_)), "{err:?}");
        assert!(indexer.status().last_error.is_some());
        assert!(!indexer.is_running());

        let corpus = indexer.corpus().read();
        assert_eq!(corpus.generation(), generation);
        let doc = corpus.get(&id).expect("previous version still stored");
        assert_eq!(&*doc.text, "alpha beta");
        let hits = search(&corpus, "beta", 10, Bm25Params::default());
        assert!(hits.iter().any(|h| h.id == id));
        assert!(!corpus.index().contains_term("gamma"));
    }

    #[test]
    fn trigger_while_running_is_coalesced() {
        let (_src, indexer) = setup();
        indexer.in_flight.store(true, Ordering::SeqCst);
        assert_eq!(indexer.reindex().unwrap(), ReindexOutcome::Coalesced);
        indexer.in_flight.store(false, Ordering::SeqCst);
        assert!(matches!(indexer.reindex().unwrap(), ReindexOutcome::Completed(_)));
        assert!(!indexer.is_running());
    }

    #[test]
    fn queries_never_see_half_applied_documents() {
        let (src, indexer) = setup();
        for i in 0..8 {
            src.put(&format!("doc{i}.txt"), 1, Some(&format!("shared token{i} even{}", i % 2)));
        }
        indexer.reindex().unwrap();
        indexer.corpus().write().update_delay = Some(Duration::from_millis(2));

        let indexer = Arc::new(indexer);
        let stop = Arc::new(AtomicBool::new(false));
        let mut readers = Vec::new();
        for _ in 0..4 {
            let indexer = indexer.clone();
            let stop = stop.clone();
            readers.push(std::thread::spawn(move || {
                let mut checks = 0usize;
                loop {
                    {
                        let corpus = indexer.corpus().read();
                        corpus.check_consistency().expect("reader observed inconsistent state");
                        let hits = search(&corpus, "shared", 100, Bm25Params::default());
                        assert_eq!(hits.len(), corpus.store().stats().0);
                    }
                    checks += 1;
                    if stop.load(Ordering::Acquire) {
                        break checks;
                    }
                }
            }));
        }

        for round in 2..6u64 {
            for i in 0..8 {
                let text = if round % 2 == 0 { format!("shared changed{i} r{round}") } else { format!("shared token{i}") };
                src.put(&format!("doc{i}.txt"), round, Some(&text));
            }
            let report = completed(indexer.reindex().unwrap());
            assert_eq!(report.updated, 8);
        }
        stop.store(true, Ordering::Release);
        for r in readers {
            assert!(r.join().unwrap() > 0);
        }
        indexer.corpus().read().check_consistency().unwrap();
    }
}
