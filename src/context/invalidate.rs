//! Invalidation cascades.
//!
//! Run with the session's entry table write-locked, so a cascade is observed
//! either completely or not at all. Every touched entry is replaced by a
//! changed copy; computations that started from an older entry notice the
//! bumped generation and discard their results.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::SourceId;
use crate::cache::{CacheState, INCLUDED_PARTS, REFERENCED_LIBRARIES, SourceEntry};

pub(super) struct Invalidator<'a> {
    entries: &'a mut FxHashMap<SourceId, Arc<SourceEntry>>,
    /// Libraries whose resolution was dropped by this invalidator.
    invalidated: FxHashSet<SourceId>,
}

impl<'a> Invalidator<'a> {
    pub(super) fn new(entries: &'a mut FxHashMap<SourceId, Arc<SourceEntry>>) -> Self {
        Self {
            entries,
            invalidated: FxHashSet::default(),
        }
    }

    /// A new source may satisfy imports that did not resolve before.
    pub(super) fn source_added(&mut self, source: SourceId) {
        if self.entries.contains_key(&source) {
            self.source_changed(source);
            return;
        }
        self.entries.insert(source, Arc::new(SourceEntry::new()));
        let all: Vec<SourceId> = self.entries.keys().copied().collect();
        for id in all {
            self.modify(id, SourceEntry::invalidate_all_resolution_information);
        }
        tracing::debug!(source = %source, "source added, all resolution invalidated");
    }

    pub(super) fn source_changed(&mut self, source: SourceId) {
        if !self.entries.contains_key(&source) {
            return;
        }
        let containing = self.containing_libraries(source);
        self.invalidate_library(source);
        self.modify(source, SourceEntry::invalidate_content);
        for &library in &containing {
            self.invalidate_library(library);
        }
        let mut roots = containing;
        roots.push(source);
        self.invalidate_dependents(roots);
        tracing::debug!(
            source = %source,
            libraries = self.invalidated.len(),
            "source changed"
        );
    }

    pub(super) fn source_removed(&mut self, source: SourceId) {
        if !self.entries.contains_key(&source) {
            return;
        }
        let containing = self.containing_libraries(source);
        for &library in &containing {
            self.invalidate_library(library);
            self.modify(library, |entry| {
                if entry.state(&INCLUDED_PARTS) == CacheState::Valid {
                    let parts: Arc<[SourceId]> = entry
                        .value(&INCLUDED_PARTS)
                        .iter()
                        .copied()
                        .filter(|part| *part != source)
                        .collect();
                    entry.set_value(&INCLUDED_PARTS, parts);
                }
            });
        }
        // Parts that were resolved in the removed library.
        let keyed: Vec<SourceId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.resolution().get(source).is_some())
            .map(|(id, _)| *id)
            .collect();
        for id in keyed {
            self.modify(id, |entry| entry.remove_resolution(source));
        }

        let mut roots = containing;
        roots.push(source);
        self.invalidate_dependents(roots);
        self.entries.remove(&source);
        tracing::debug!(source = %source, "source removed");
    }

    /// Drop the resolution of `library` and its node on each of its parts.
    fn invalidate_library(&mut self, library: SourceId) {
        if !self.invalidated.insert(library) {
            return;
        }
        let parts = self
            .entries
            .get(&library)
            .map(|entry| entry.value(&INCLUDED_PARTS))
            .unwrap_or_default();
        self.modify(library, SourceEntry::invalidate_all_resolution_information);
        for &part in parts.iter() {
            self.modify(part, |entry| entry.remove_resolution(library));
        }
        tracing::trace!(library = %library, "library resolution invalidated");
    }

    /// Invalidate every library that imports or exports anything in `roots`,
    /// transitively.
    fn invalidate_dependents(&mut self, roots: Vec<SourceId>) {
        let mut visited: FxHashSet<SourceId> = roots.iter().copied().collect();
        let mut queue: VecDeque<SourceId> = roots.into();
        while let Some(changed) = queue.pop_front() {
            let dependents: Vec<SourceId> = self
                .entries
                .iter()
                .filter(|(id, entry)| {
                    **id != changed && entry.value(&REFERENCED_LIBRARIES).contains(&changed)
                })
                .map(|(id, _)| *id)
                .collect();
            for dependent in dependents {
                if visited.insert(dependent) {
                    self.invalidate_library(dependent);
                    queue.push_back(dependent);
                }
            }
        }
    }

    /// Libraries `source` was resolved in or is listed as a part of.
    fn containing_libraries(&self, source: SourceId) -> Vec<SourceId> {
        let mut libraries: Vec<SourceId> = self
            .entries
            .get(&source)
            .map(|entry| entry.containing_libraries())
            .unwrap_or_default();
        for (id, entry) in self.entries.iter() {
            if entry.value(&INCLUDED_PARTS).contains(&source) && !libraries.contains(id) {
                libraries.push(*id);
            }
        }
        libraries.retain(|library| *library != source);
        libraries.sort();
        libraries
    }

    fn modify(&mut self, source: SourceId, change: impl FnOnce(&mut SourceEntry)) {
        if let Some(slot) = self.entries.get_mut(&source) {
            let mut copy = slot.writable_copy();
            change(&mut copy);
            *slot = Arc::new(copy);
        }
    }
}
