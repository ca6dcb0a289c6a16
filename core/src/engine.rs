//! The handle the outer layers (CLI, HTTP) talk to.

use crate::config::EngineConfig;
use crate::corpus::{Corpus, SharedCorpus};
use crate::error::Result;
use crate::indexer::{Indexer, ReindexOutcome, ReindexReport};
use crate::query::{rank, Query};
use crate::snippet::{build_snippet, Snippet};
use crate::source::{DocumentSource, FsSource};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Path relative to the indexed root.
    pub path: String,
    pub title: String,
    pub score: f64,
    /// Modification time, unix seconds.
    pub mtime: u64,
    pub snippet: Snippet,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    /// Matching documents before truncation to the limit.
    pub total_hits: usize,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub document_count: usize,
    pub term_count: usize,
    pub total_length: u64,
    /// RFC 3339, `None` until the first cycle completes.
    pub last_reindex: Option<String>,
    pub reindex_in_progress: bool,
    pub last_report: Option<ReindexReport>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct SearchEngine {
    config: EngineConfig,
    indexer: Indexer,
}

impl SearchEngine {
    /// Engine over `config.root` on the local file system. Does not scan;
    /// call [`SearchEngine::trigger_reindex`] to populate it.
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let source = FsSource::new(&config.root, &config.extensions)?;
        Ok(Self::with_source(config, Box::new(source)))
    }

    pub fn with_source(config: EngineConfig, source: Box<dyn DocumentSource>) -> Self {
        let indexer = Indexer::new(Corpus::shared(), source);
        Self { config, indexer }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn corpus(&self) -> &SharedCorpus {
        self.indexer.corpus()
    }

    pub fn search(&self, query: &str, limit: usize) -> SearchResults {
        let parsed = Query::parse(query);
        let mut results = SearchResults { query: query.to_string(), total_hits: 0, hits: Vec::new() };
        if limit == 0 || parsed.is_empty() {
            return results;
        }

        // Copy out what the snippets need so the read lock is not held while building them.
        let picked: Vec<(SearchHit, Arc<str>)> = {
            let corpus = self.corpus().read();
            let ranked = rank(&corpus, &parsed, self.config.bm25);
            results.total_hits = ranked.len();
            ranked
                .into_iter()
                .take(limit)
                .filter_map(|scored| {
                    let doc = corpus.get(&scored.id)?;
                    let hit = SearchHit {
                        path: doc.rel_path.clone(),
                        title: doc.title.clone(),
                        score: scored.score,
                        mtime: doc.stamp.unix_secs(),
                        snippet: Snippet::default(),
                    };
                    Some((hit, doc.text.clone()))
                })
                .collect()
        };

        let terms = parsed.distinct_terms();
        results.hits = picked
            .into_iter()
            .map(|(mut hit, text)| {
                hit.snippet = build_snippet(&text, &terms, self.config.snippet_window);
                hit
            })
            .collect();
        tracing::debug!(query, total_hits = results.total_hits, returned = results.hits.len(), "search");
        results
    }

    pub fn stats(&self) -> Stats {
        let (document_count, total_length, term_count) = {
            let corpus = self.corpus().read();
            let (docs, len) = corpus.store().stats();
            (docs, len, corpus.index().term_count())
        };
        let status = self.indexer.status();
        Stats {
            document_count,
            term_count,
            total_length,
            last_reindex: status.last_reindex.and_then(|t| t.format(&Rfc3339).ok()),
            reindex_in_progress: self.indexer.is_running(),
            last_report: status.last_report,
            last_error: status.last_error,
        }
    }

    /// Run a reindex cycle now, or coalesce into the one already running.
    /// Blocking; async callers should run it on a blocking thread.
    pub fn trigger_reindex(&self) -> Result<ReindexOutcome> {
        self.indexer.reindex()
    }

    /// Absolute path of an indexed document, looked up by relative path.
    pub fn document_path(&self, rel_path: &str) -> Option<PathBuf> {
        self.corpus().read().store().find_by_rel_path(rel_path).map(|d| d.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn engine_over(files: &[(&str, &str)]) -> (tempfile::TempDir, SearchEngine) {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            fs::write(dir.path().join(name), text).unwrap();
        }
        let engine = SearchEngine::open(EngineConfig::with_root(dir.path())).unwrap();
        engine.trigger_reindex().unwrap();
        (dir, engine)
    }

    #[test]
    fn search_returns_paths_titles_and_snippets() {
        let (_dir, engine) = engine_over(&[("a.txt", "the cat sat on the mat"), ("b.md", "the dog sat")]);
        let res = engine.search("cat", 10);
        assert_eq!(res.total_hits, 1);
        let hit = &res.hits[0];
        assert_eq!(hit.path, "a.txt");
        assert_eq!(hit.title, "a.txt");
        assert!(hit.score > 0.0);
        assert_eq!(hit.snippet.highlights().collect::<Vec<_>>(), vec!["cat"]);
    }

    #[test]
    fn limit_truncates_but_total_counts_all() {
        let (_dir, engine) = engine_over(&[("a.txt", "sat"), ("b.txt", "sat"), ("c.txt", "sat")]);
        let res = engine.search("sat", 2);
        assert_eq!(res.total_hits, 3);
        assert_eq!(res.hits.len(), 2);
        assert!(engine.search("sat", 0).hits.is_empty());
    }

    #[test]
    fn stats_reflect_last_cycle() {
        let (_dir, engine) = engine_over(&[("a.txt", "one two"), ("b.html", "<p>two &amp; three</p>")]);
        let stats = engine.stats();
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.term_count, 3);
        assert_eq!(stats.total_length, 4);
        assert!(stats.last_reindex.is_some());
        assert_eq!(stats.last_report.unwrap().added, 2);
        assert!(!stats.reindex_in_progress);
    }

    #[test]
    fn document_path_only_resolves_indexed_files() {
        let (dir, engine) = engine_over(&[("a.txt", "x")]);
        assert!(engine.document_path("a.txt").unwrap().starts_with(dir.path().canonicalize().unwrap()));
        assert!(engine.document_path("../etc/passwd").is_none());
    }
}
