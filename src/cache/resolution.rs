//! Per-library resolution state of a source.
//!
//! A part shared by two libraries is resolved once in each, so its entry
//! keeps one [`ResolutionState`] per containing library. The chain is a
//! small insertion-ordered map; the first node is the head.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use super::descriptor::ResolutionDescriptor;
use super::state::{CacheState, ComputeFailure, Slot};
use crate::base::SourceId;
use crate::hir::{Diagnostic, ResolvedUnit};

/// Resolution facts of one source in the context of one library.
#[derive(Clone, Debug, Default)]
pub struct ResolutionState {
    pub(super) resolved_unit: Slot<Option<Arc<ResolvedUnit>>>,
    pub(super) resolution_errors: Slot<Arc<[Diagnostic]>>,
    failure: Option<ComputeFailure>,
}

impl ResolutionState {
    pub fn state<T: Clone + Default>(&self, descriptor: &ResolutionDescriptor<T>) -> CacheState {
        descriptor.slot(self).state()
    }

    pub fn value<T: Clone + Default>(&self, descriptor: &ResolutionDescriptor<T>) -> T {
        descriptor.slot(self).value().clone()
    }

    pub fn failure(&self) -> Option<&ComputeFailure> {
        self.failure.as_ref()
    }

    pub(super) fn store<T: Clone + Default>(&mut self, descriptor: &ResolutionDescriptor<T>, value: T) {
        descriptor.slot_mut(self).store(value);
        self.failure = None;
    }

    pub(super) fn mark<T: Clone + Default>(
        &mut self,
        descriptor: &ResolutionDescriptor<T>,
        state: CacheState,
    ) {
        descriptor.slot_mut(self).mark(state);
    }

    pub(super) fn reset<T: Clone + Default>(
        &mut self,
        descriptor: &ResolutionDescriptor<T>,
        state: CacheState,
    ) {
        descriptor.slot_mut(self).reset(state);
        // Shared by both slots.
        if self.resolved_unit.state() != CacheState::Error
            && self.resolution_errors.state() != CacheState::Error
        {
            self.failure = None;
        }
    }

    pub(super) fn fail(&mut self, failure: ComputeFailure) {
        self.resolved_unit.reset(CacheState::Error);
        self.resolution_errors.reset(CacheState::Error);
        self.failure = Some(failure);
    }

    /// Both facts are INVALID.
    pub fn is_invalid(&self) -> bool {
        self.resolved_unit.state() == CacheState::Invalid
            && self.resolution_errors.state() == CacheState::Invalid
    }
}

/// Resolution states of one source keyed by library.
///
/// An empty chain behaves like a single node with every fact INVALID.
#[derive(Clone, Debug, Default)]
pub struct ResolutionChain {
    nodes: IndexMap<SourceId, ResolutionState, FxBuildHasher>,
}

impl ResolutionChain {
    pub fn get(&self, library: SourceId) -> Option<&ResolutionState> {
        self.nodes.get(&library)
    }

    /// The node for `library`, appended INVALID if absent.
    pub fn get_or_create(&mut self, library: SourceId) -> &mut ResolutionState {
        self.nodes.entry(library).or_default()
    }

    /// Detach the node for `library`. Removing the head promotes its
    /// successor; removing the last node leaves the chain reset.
    pub fn remove(&mut self, library: SourceId) -> Option<ResolutionState> {
        self.nodes.shift_remove(&library)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn head(&self) -> Option<(SourceId, &ResolutionState)> {
        self.nodes.first().map(|(library, state)| (*library, state))
    }

    pub fn libraries(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &ResolutionState)> {
        self.nodes.iter().map(|(library, state)| (*library, state))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
