//! Where documents come from: enumeration of candidate files and text
//! extraction. The reindex coordinator only talks to [`DocumentSource`].

use crate::error::{CoreError, Result};
use crate::extract::extract_text;
use crate::store::FileStamp;
use crate::DocId;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub rel_path: String,
    /// Lower-cased, without the dot.
    pub extension: String,
    pub stamp: FileStamp,
}

impl SourceEntry {
    pub fn doc_id(&self) -> DocId {
        DocId::from_path(&self.path)
    }
}

/// One enumeration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<SourceEntry>,
    /// Paths below the root that could not be read. Whatever was indexed
    /// under them is neither re-read nor removed.
    pub unreadable: Vec<PathBuf>,
}

impl Listing {
    pub fn complete(entries: Vec<SourceEntry>) -> Self {
        Self { entries, unreadable: Vec::new() }
    }

    pub fn is_unreadable(&self, path: &Path) -> bool {
        self.unreadable.iter().any(|p| path.starts_with(p))
    }
}

pub trait DocumentSource: Send + Sync {
    fn root(&self) -> &Path;

    /// List eligible files. Failing here means the whole root is unusable.
    fn enumerate(&self) -> Result<Listing>;

    fn extract(&self, entry: &SourceEntry) -> Result<String>;
}

/// Walks a directory tree on the local file system.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FsSource {
    pub fn new<P: AsRef<Path>>(root: P, extensions: &[String]) -> Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|source| CoreError::RootUnavailable { path: root.to_path_buf(), source })?;
        let extensions = extensions.iter().map(|e| e.trim_start_matches('.').to_ascii_lowercase()).collect();
        Ok(Self { root, extensions })
    }

    fn accepts(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }
}

impl DocumentSource for FsSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn enumerate(&self) -> Result<Listing> {
        let meta = std::fs::metadata(&self.root)
            .map_err(|source| CoreError::RootUnavailable { path: self.root.clone(), source })?;
        if !meta.is_dir() {
            return Err(CoreError::RootUnavailable {
                path: self.root.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            });
        }

        let mut listing = Listing::default();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    // Depth 0 is the root itself.
                    let below_root = err.path().filter(|_| err.depth() > 0).map(Path::to_path_buf);
                    let Some(path) = below_root else {
                        return Err(CoreError::RootUnavailable { path: self.root.clone(), source: err.into() });
                    };
                    tracing::warn!(path = %path.display(), error = %err, "unreadable, keeping indexed state below it");
                    listing.unreadable.push(path);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let p = entry.path();
            let Some(ext) = p.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase()) else {
                continue;
            };
            if !self.accepts(&ext) {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    tracing::warn!(path = %p.display(), error = %err, "cannot stat file");
                    listing.unreadable.push(p.to_path_buf());
                    continue;
                }
            };
            let modified = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
            let rel_path = p
                .strip_prefix(&self.root)
                .unwrap_or(p)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            listing.entries.push(SourceEntry {
                path: p.to_path_buf(),
                rel_path,
                extension: ext,
                stamp: FileStamp::new(modified, meta.len()),
            });
        }
        Ok(listing)
    }

    fn extract(&self, entry: &SourceEntry) -> Result<String> {
        extract_text(&entry.path, &entry.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn enumerates_supported_extensions_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.md"), "alpha").unwrap();
        fs::write(dir.path().join("nested/b.TXT"), "beta").unwrap();
        fs::write(dir.path().join("c.pdf"), "gamma").unwrap();

        let src = FsSource::new(dir.path(), &[".MD".into(), "txt".into()]).unwrap();
        let listing = src.enumerate().unwrap();
        assert!(listing.unreadable.is_empty());
        let entries = listing.entries;
        let rels: Vec<_> = entries.iter().map(|e| e.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["a.md", "nested/b.TXT"]);
        assert_eq!(entries[1].extension, "txt");
        assert_eq!(entries[0].stamp.size, 5);
        assert_eq!(src.extract(&entries[1]).unwrap(), "beta");
    }

    #[test]
    fn unreadable_paths_cover_their_descendants() {
        let listing = Listing { entries: Vec::new(), unreadable: vec![PathBuf::from("/r/locked")] };
        assert!(listing.is_unreadable(Path::new("/r/locked/a.txt")));
        assert!(listing.is_unreadable(Path::new("/r/locked/deep/b.md")));
        assert!(!listing.is_unreadable(Path::new("/r/locked-not/a.txt")));
        assert!(!listing.is_unreadable(Path::new("/r/a.txt")));
    }

    #[test]
    fn missing_root_is_reported() {
        let err = FsSource::new("/no/such/root/anywhere", &["md".into()]).unwrap_err();
        assert!(matches!(err, CoreError::RootUnavailable { .. }));
    }
}
