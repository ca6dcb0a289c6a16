//! Local document search: incremental indexing of a folder of `.md`, `.txt`
//! and `.html` files, BM25 ranking and highlighted snippets.

use serde::Serialize;
use std::fmt;
use std::path::Path;

pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod indexer;
pub mod query;
pub mod snippet;
pub mod source;
pub mod store;
pub mod tokenizer;

pub use config::{Bm25Params, EngineConfig};
pub use corpus::{Corpus, SharedCorpus};
pub use engine::{SearchEngine, SearchHit, SearchResults, Stats};
pub use error::{CoreError, Result};
pub use indexer::{ReindexOutcome, ReindexReport};
pub use snippet::{Fragment, Snippet};

/// Stable document identity: the canonical path of the source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
