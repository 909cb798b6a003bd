//! Change sets coming in and change notices going out.

use std::sync::Arc;

use crate::base::{LineInfo, SourceId};
use crate::hir::Diagnostic;

/// Sources added, changed and removed since the last analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<SourceId>,
    pub changed: Vec<SourceId>,
    pub removed: Vec<SourceId>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn added(mut self, source: SourceId) -> Self {
        self.added.push(source);
        self
    }

    pub fn changed(mut self, source: SourceId) -> Self {
        self.changed.push(source);
        self
    }

    pub fn removed(mut self, source: SourceId) -> Self {
        self.removed.push(source);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// New facts about one source produced by an analysis task.
#[derive(Clone, Debug)]
pub struct ChangeNotice {
    pub source: SourceId,
    pub line_info: Option<Arc<LineInfo>>,
    /// Set when the source was parsed.
    pub parse_errors: Option<Arc<[Diagnostic]>>,
    /// Set when the source was resolved, together with the library it was
    /// resolved in.
    pub resolution_errors: Option<(SourceId, Arc<[Diagnostic]>)>,
}

impl ChangeNotice {
    pub(crate) fn new(source: SourceId) -> Self {
        Self {
            source,
            line_info: None,
            parse_errors: None,
            resolution_errors: None,
        }
    }

    /// Every error carried by this notice.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.parse_errors
            .iter()
            .flat_map(|errors| errors.iter())
            .chain(
                self.resolution_errors
                    .iter()
                    .flat_map(|(_, errors)| errors.iter()),
            )
    }
}
