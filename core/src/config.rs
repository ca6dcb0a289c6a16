use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// BM25 tuning knobs. Defaults are the textbook values so rankings are
/// reproducible across runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Folder to index.
    pub root: PathBuf,
    /// Lower-case file extensions (without the dot) eligible for indexing.
    pub extensions: Vec<String>,
    pub bm25: Bm25Params,
    /// Snippet window size in tokens.
    pub snippet_window: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    pub reindex_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extensions: ["md", "txt", "html", "htm"].iter().map(|s| s.to_string()).collect(),
            bm25: Bm25Params::default(),
            snippet_window: 30,
            default_limit: 20,
            max_limit: 100,
            reindex_interval_secs: 30,
        }
    }
}

impl EngineConfig {
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf(), ..Self::default() }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {e}", path.display())))?;
        let cfg: EngineConfig = serde_json::from_str(&raw)
            .map_err(|e| CoreError::Config(format!("cannot parse {}: {e}", path.display())))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bm25.k1.is_nan() || self.bm25.k1 < 0.0 {
            return Err(CoreError::Config(format!("k1 must be non-negative, got {}", self.bm25.k1)));
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(CoreError::Config(format!("b must be within [0, 1], got {}", self.bm25.b)));
        }
        if self.snippet_window == 0 {
            return Err(CoreError::Config("snippet_window must be at least 1".into()));
        }
        if self.extensions.is_empty() {
            return Err(CoreError::Config("at least one file extension is required".into()));
        }
        Ok(())
    }

    pub fn reindex_interval(&self) -> Duration {
        Duration::from_secs(self.reindex_interval_secs.max(1))
    }

    /// Clamp an API-supplied limit. Non-positive limits yield zero.
    pub fn clamp_limit(&self, requested: Option<i64>) -> usize {
        match requested {
            None => self.default_limit.min(self.max_limit),
            Some(n) if n <= 0 => 0,
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX).min(self.max_limit),
        }
    }
}
