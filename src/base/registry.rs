//! URI interning for source identities.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::SourceId;

/// Maps source URIs to [`SourceId`]s and back.
///
/// Thread-safe via internal locking; interning the same URI twice yields the
/// same id.
#[derive(Default)]
pub struct SourceRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    ids: FxHashMap<Arc<str>, SourceId>,
    uris: Vec<Arc<str>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a URI, returning its stable id.
    pub fn intern(&self, uri: &str) -> SourceId {
        {
            let inner = self.inner.read();
            if let Some(&id) = inner.ids.get(uri) {
                return id;
            }
        }

        let mut inner = self.inner.write();
        // Another writer may have won the race.
        if let Some(&id) = inner.ids.get(uri) {
            return id;
        }

        let id = SourceId::new(inner.uris.len() as u32);
        let uri: Arc<str> = Arc::from(uri);
        inner.uris.push(uri.clone());
        inner.ids.insert(uri, id);
        id
    }

    /// Look up the id of an already interned URI.
    pub fn lookup(&self, uri: &str) -> Option<SourceId> {
        self.inner.read().ids.get(uri).copied()
    }

    /// The URI a source was interned from.
    pub fn uri(&self, id: SourceId) -> Option<Arc<str>> {
        self.inner.read().uris.get(id.index() as usize).cloned()
    }

    /// Display name for diagnostics: the URI, or the raw id when unknown.
    pub fn display_name(&self, id: SourceId) -> String {
        match self.uri(id) {
            Some(uri) => uri.to_string(),
            None => id.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("count", &self.len())
            .finish()
    }
}
