//! Where source text comes from.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Text of a source and the stamp it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    pub text: Arc<str>,
    pub modification_stamp: u64,
}

/// Supplies the current text of a source by URI.
pub trait ContentProvider: Send + Sync {
    fn content(&self, uri: &str) -> io::Result<Content>;
}

/// In-memory contents, used for editor overlays and tests.
#[derive(Debug, Default)]
pub struct MemoryContentProvider {
    contents: RwLock<FxHashMap<Arc<str>, Content>>,
    next_stamp: AtomicU64,
}

impl MemoryContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the text for `uri`. Returns whether anything changed.
    pub fn set(&self, uri: &str, text: Option<&str>) -> bool {
        let mut contents = self.contents.write();
        match text {
            Some(text) => {
                if contents.get(uri).is_some_and(|c| c.text.as_ref() == text) {
                    return false;
                }
                let stamp = self.next_stamp.fetch_add(1, Ordering::Relaxed) + 1;
                contents.insert(
                    Arc::from(uri),
                    Content {
                        text: Arc::from(text),
                        modification_stamp: stamp,
                    },
                );
                true
            }
            None => contents.remove(uri).is_some(),
        }
    }

    pub fn get(&self, uri: &str) -> Option<Content> {
        self.contents.read().get(uri).cloned()
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.contents.read().contains_key(uri)
    }
}

impl ContentProvider for MemoryContentProvider {
    fn content(&self, uri: &str) -> io::Result<Content> {
        self.get(uri).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no content for '{}'", uri))
        })
    }
}

/// Reads sources from disk; URIs are paths relative to `root`.
#[derive(Debug, Clone)]
pub struct FileContentProvider {
    root: PathBuf,
}

impl FileContentProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, uri: &str) -> PathBuf {
        self.root.join(uri.strip_prefix("file://").unwrap_or(uri))
    }
}

impl ContentProvider for FileContentProvider {
    fn content(&self, uri: &str) -> io::Result<Content> {
        let path = self.path(uri);
        let text = std::fs::read_to_string(&path)?;
        let modified = std::fs::metadata(&path)?.modified()?;
        let modification_stamp = modified
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        Ok(Content {
            text: Arc::from(text),
            modification_stamp,
        })
    }
}
