//! Source identifiers.

use std::fmt;

/// Opaque identity of one unit of content (a library or a part).
///
/// Ids are handed out by a [`SourceRegistry`](super::SourceRegistry) and stay
/// stable for the lifetime of a session, even after the source is removed from
/// analysis. The URI lives in the registry.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SourceId(u32);

impl SourceId {
    /// Create a `SourceId` from a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

impl From<u32> for SourceId {
    #[inline]
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<SourceId> for u32 {
    #[inline]
    fn from(id: SourceId) -> Self {
        id.0
    }
}
