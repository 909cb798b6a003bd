//! Everything cached about one source.

use std::sync::Arc;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use super::descriptor::{
    DescriptorKey, ELEMENT, INCLUDED_PARTS, IS_CLIENT, IS_LAUNCHABLE, LINE_INFO, PARSE_ERRORS,
    PARSED_UNIT, PUBLIC_NAMESPACE, REFERENCED_LIBRARIES, RESOLUTION_ERRORS, RESOLVED_UNIT,
    ResolutionDescriptor, SOURCE_KIND, SourceDescriptor,
};
use super::resolution::ResolutionChain;
use super::state::{CacheState, ComputeFailure, Slot};
use crate::base::{LineInfo, SourceId};
use crate::error::{AnalysisError, Result};
use crate::hir::{Diagnostic, LibraryElement, Namespace, ResolvedUnit};
use crate::syntax::{ParsedUnit, SourceKind};

bitflags! {
    /// Boolean facts of a library source.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SourceFlags: u8 {
        const CLIENT_CODE = 1 << 1;
        const LAUNCHABLE = 1 << 2;
    }
}

/// Cached facts of one source.
///
/// Entries are immutable once published; writers take a
/// [`writable_copy`](Self::writable_copy), change it, and publish it with a
/// compare-and-swap on the session.
#[derive(Clone, Debug, Default)]
pub struct SourceEntry {
    modification_stamp: Option<u64>,
    /// Bumped whenever content-derived facts are invalidated.
    content_generation: u64,
    /// Bumped whenever resolution information is invalidated.
    resolution_generation: u64,

    pub(super) line_info: Slot<Option<Arc<LineInfo>>>,
    pub(super) source_kind: Slot<SourceKind>,
    pub(super) parsed_unit: Slot<Option<Arc<ParsedUnit>>>,
    pub(super) parse_errors: Slot<Arc<[Diagnostic]>>,
    pub(super) included_parts: Slot<Arc<[SourceId]>>,
    pub(super) referenced_libraries: Slot<Arc<[SourceId]>>,
    pub(super) element: Slot<Option<Arc<LibraryElement>>>,
    pub(super) public_namespace: Slot<Option<Namespace>>,

    pub(super) flags: SourceFlags,
    client_state: CacheState,
    launchable_state: CacheState,

    failures: FxHashMap<DescriptorKey, ComputeFailure>,
    resolution: ResolutionChain,
}

/// Run `$body` with `$d` bound to the source descriptor for `$key`, or
/// evaluate `$scoped` for library-scoped keys.
macro_rules! with_source_descriptor {
    ($key:expr, $d:ident => $body:expr, scoped => $scoped:expr) => {
        match $key {
            DescriptorKey::LineInfo => {
                let $d = &LINE_INFO;
                $body
            }
            DescriptorKey::SourceKind => {
                let $d = &SOURCE_KIND;
                $body
            }
            DescriptorKey::ParsedUnit => {
                let $d = &PARSED_UNIT;
                $body
            }
            DescriptorKey::ParseErrors => {
                let $d = &PARSE_ERRORS;
                $body
            }
            DescriptorKey::IncludedParts => {
                let $d = &INCLUDED_PARTS;
                $body
            }
            DescriptorKey::ReferencedLibraries => {
                let $d = &REFERENCED_LIBRARIES;
                $body
            }
            DescriptorKey::Element => {
                let $d = &ELEMENT;
                $body
            }
            DescriptorKey::PublicNamespace => {
                let $d = &PUBLIC_NAMESPACE;
                $body
            }
            DescriptorKey::IsClient => {
                let $d = &IS_CLIENT;
                $body
            }
            DescriptorKey::IsLaunchable => {
                let $d = &IS_LAUNCHABLE;
                $body
            }
            DescriptorKey::ResolvedUnit | DescriptorKey::ResolutionErrors => $scoped,
        }
    };
}

impl SourceEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy that can be changed and published in place of `self`.
    pub fn writable_copy(&self) -> SourceEntry {
        self.clone()
    }

    pub fn modification_stamp(&self) -> Option<u64> {
        self.modification_stamp
    }

    pub fn set_modification_stamp(&mut self, stamp: Option<u64>) {
        self.modification_stamp = stamp;
    }

    pub fn content_generation(&self) -> u64 {
        self.content_generation
    }

    pub fn resolution_generation(&self) -> u64 {
        self.resolution_generation
    }

    // ========================================================================
    // SOURCE FACTS
    // ========================================================================

    pub fn state<D: SourceDescriptor>(&self, descriptor: &D) -> CacheState {
        descriptor.state(self)
    }

    /// The cached value; the descriptor default unless VALID or IN_PROCESS.
    pub fn value<D: SourceDescriptor>(&self, descriptor: &D) -> D::Value {
        descriptor.value(self)
    }

    pub fn set_value<D: SourceDescriptor>(&mut self, descriptor: &D, value: D::Value) {
        descriptor.store(self, value);
        self.failures.remove(&descriptor.key());
    }

    /// Change the state of a fact.
    ///
    /// IN_PROCESS keeps the current value; INVALID and ERROR clear it to the
    /// default. VALID can only be reached through [`set_value`](Self::set_value).
    pub fn set_state<D: SourceDescriptor>(&mut self, descriptor: &D, state: CacheState) -> Result<()> {
        match state {
            CacheState::Valid => {
                return Err(AnalysisError::contract(format!(
                    "{} cannot become VALID without a value",
                    descriptor.key()
                )));
            }
            CacheState::InProcess => descriptor.mark(self, state),
            CacheState::Invalid => {
                descriptor.reset(self, state);
                self.failures.remove(&descriptor.key());
            }
            CacheState::Error => {
                descriptor.reset(self, state);
                self.failures
                    .entry(descriptor.key())
                    .or_insert_with(|| ComputeFailure::new("marked as failed"));
            }
        }
        Ok(())
    }

    pub fn set_error<D: SourceDescriptor>(&mut self, descriptor: &D, failure: ComputeFailure) {
        descriptor.reset(self, CacheState::Error);
        self.failures.insert(descriptor.key(), failure);
    }

    pub fn failure(&self, key: DescriptorKey) -> Option<&ComputeFailure> {
        self.failures.get(&key)
    }

    pub(super) fn flag_state(&self, flag: SourceFlags) -> CacheState {
        if flag == SourceFlags::CLIENT_CODE {
            self.client_state
        } else {
            self.launchable_state
        }
    }

    pub(super) fn set_flag_state(&mut self, flag: SourceFlags, state: CacheState) {
        if flag == SourceFlags::CLIENT_CODE {
            self.client_state = state;
        } else {
            self.launchable_state = state;
        }
    }

    pub fn flags(&self) -> SourceFlags {
        self.flags
    }

    // ========================================================================
    // LIBRARY-SCOPED FACTS
    // ========================================================================

    pub fn resolution(&self) -> &ResolutionChain {
        &self.resolution
    }

    /// Libraries this source has resolution state for.
    pub fn containing_libraries(&self) -> Vec<SourceId> {
        self.resolution.libraries().collect()
    }

    pub fn state_in<T: Clone + Default>(
        &self,
        descriptor: &ResolutionDescriptor<T>,
        library: SourceId,
    ) -> CacheState {
        self.resolution
            .get(library)
            .map_or(CacheState::Invalid, |node| node.state(descriptor))
    }

    pub fn value_in<T: Clone + Default>(&self, descriptor: &ResolutionDescriptor<T>, library: SourceId) -> T {
        self.resolution
            .get(library)
            .map_or_else(T::default, |node| node.value(descriptor))
    }

    pub fn set_value_in<T: Clone + Default>(
        &mut self,
        descriptor: &ResolutionDescriptor<T>,
        library: SourceId,
        value: T,
    ) {
        self.resolution.get_or_create(library).store(descriptor, value);
    }

    pub fn set_state_in<T: Clone + Default>(
        &mut self,
        descriptor: &ResolutionDescriptor<T>,
        library: SourceId,
        state: CacheState,
    ) -> Result<()> {
        let node = self.resolution.get_or_create(library);
        match state {
            CacheState::Valid => {
                return Err(AnalysisError::contract(format!(
                    "{} cannot become VALID without a value",
                    descriptor.key()
                )));
            }
            CacheState::InProcess => node.mark(descriptor, state),
            CacheState::Invalid | CacheState::Error => node.reset(descriptor, state),
        }
        Ok(())
    }

    /// Mark both resolution facts of `library` as failed.
    pub fn set_resolution_error(&mut self, library: SourceId, failure: ComputeFailure) {
        self.resolution.get_or_create(library).fail(failure);
    }

    pub fn remove_resolution(&mut self, library: SourceId) {
        self.resolution.remove(library);
    }

    // ========================================================================
    // UNTYPED ACCESS
    // ========================================================================

    /// State of the fact named by `key`, for `library` when it is
    /// library-scoped.
    pub fn state_of(&self, key: DescriptorKey, library: Option<SourceId>) -> Result<CacheState> {
        check_scope(key, library)?;
        Ok(with_source_descriptor!(key, d => self.state(d), scoped => {
            let library = library.ok_or_else(|| missing_library(key))?;
            if key == DescriptorKey::ResolvedUnit {
                self.state_in(&RESOLVED_UNIT, library)
            } else {
                self.state_in(&RESOLUTION_ERRORS, library)
            }
        }))
    }

    pub fn set_state_of(
        &mut self,
        key: DescriptorKey,
        library: Option<SourceId>,
        state: CacheState,
    ) -> Result<()> {
        check_scope(key, library)?;
        with_source_descriptor!(key, d => self.set_state(d, state), scoped => {
            let library = library.ok_or_else(|| missing_library(key))?;
            if key == DescriptorKey::ResolvedUnit {
                self.set_state_in(&RESOLVED_UNIT, library, state)
            } else {
                self.set_state_in(&RESOLUTION_ERRORS, library, state)
            }
        })
    }

    // ========================================================================
    // AGGREGATES
    // ========================================================================

    /// Parse errors followed by the resolution errors of every library.
    pub fn get_all_errors(&self) -> Vec<Diagnostic> {
        let mut errors: Vec<Diagnostic> = self.parse_errors.value().iter().cloned().collect();
        for (_, node) in self.resolution.iter() {
            errors.extend(node.value(&RESOLUTION_ERRORS).iter().cloned());
        }
        errors
    }

    /// The valid parse tree, falling back to the tree inside any valid
    /// resolved unit.
    pub fn any_parsed_unit(&self) -> Option<Arc<ParsedUnit>> {
        if self.parsed_unit.state() == CacheState::Valid
            && let Some(unit) = self.parsed_unit.value()
        {
            return Some(unit.clone());
        }
        self.any_resolved_unit().map(|resolved| resolved.unit.clone())
    }

    /// A valid resolved unit from any library.
    pub fn any_resolved_unit(&self) -> Option<Arc<ResolvedUnit>> {
        self.resolution.iter().find_map(|(_, node)| {
            if node.state(&RESOLVED_UNIT) == CacheState::Valid {
                node.value(&RESOLVED_UNIT)
            } else {
                None
            }
        })
    }

    // ========================================================================
    // INVALIDATION
    // ========================================================================

    /// Drop every resolution state and the facts that depend on resolution.
    pub fn invalidate_all_resolution_information(&mut self) {
        self.resolution.clear();
        self.element.reset(CacheState::Invalid);
        self.public_namespace.reset(CacheState::Invalid);
        IS_CLIENT.reset(self, CacheState::Invalid);
        IS_LAUNCHABLE.reset(self, CacheState::Invalid);
        for key in [
            DescriptorKey::Element,
            DescriptorKey::PublicNamespace,
            DescriptorKey::IsClient,
            DescriptorKey::IsLaunchable,
        ] {
            self.failures.remove(&key);
        }
        self.resolution_generation += 1;
    }

    /// Forget everything derived from the source text, including facts
    /// still being computed.
    pub fn invalidate_content(&mut self) {
        self.line_info.reset(CacheState::Invalid);
        self.source_kind.reset(CacheState::Invalid);
        self.parsed_unit.reset(CacheState::Invalid);
        self.parse_errors.reset(CacheState::Invalid);
        self.included_parts.reset(CacheState::Invalid);
        self.referenced_libraries.reset(CacheState::Invalid);
        self.failures.retain(|key, _| !key.is_content_derived());
        self.content_generation += 1;
    }
}

fn missing_library(key: DescriptorKey) -> AnalysisError {
    AnalysisError::contract(format!("{} requires a library", key))
}

fn check_scope(key: DescriptorKey, library: Option<SourceId>) -> Result<()> {
    match (key.is_library_scoped(), library) {
        (true, None) => Err(missing_library(key)),
        (false, Some(library)) => Err(AnalysisError::contract(format!(
            "{} is not library-scoped but was requested for {}",
            key, library
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn parsed(text: &str) -> Arc<ParsedUnit> {
        Arc::new(parse(text).unit)
    }

    #[test]
    fn test_set_value_makes_valid() {
        let mut entry = SourceEntry::new();
        let unit = parsed("library a;");
        entry.set_value(&PARSED_UNIT, Some(unit.clone()));
        assert_eq!(entry.state(&PARSED_UNIT), CacheState::Valid);
        assert_eq!(entry.value(&PARSED_UNIT), Some(unit));

        entry.set_value(&IS_LAUNCHABLE, true);
        assert_eq!(entry.state(&IS_LAUNCHABLE), CacheState::Valid);
        assert!(entry.value(&IS_LAUNCHABLE));
        assert!(!entry.value(&IS_CLIENT));
    }

    #[test]
    fn test_in_process_keeps_value_invalid_clears_it() {
        let mut entry = SourceEntry::new();
        entry.set_value(&SOURCE_KIND, SourceKind::Part);
        entry.set_state(&SOURCE_KIND, CacheState::InProcess).unwrap();
        assert_eq!(entry.value(&SOURCE_KIND), SourceKind::Part);

        entry.set_state(&SOURCE_KIND, CacheState::Invalid).unwrap();
        assert_eq!(entry.value(&SOURCE_KIND), SourceKind::Unknown);

        entry.set_value(&IS_CLIENT, true);
        entry.set_state(&IS_CLIENT, CacheState::Invalid).unwrap();
        assert!(!entry.value(&IS_CLIENT));
    }

    #[test]
    fn test_valid_requires_a_value() {
        let mut entry = SourceEntry::new();
        assert!(matches!(
            entry.set_state(&LINE_INFO, CacheState::Valid),
            Err(AnalysisError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_error_records_failure_until_invalidated() {
        let mut entry = SourceEntry::new();
        entry.set_error(&PARSED_UNIT, ComputeFailure::new("unreadable"));
        assert_eq!(entry.state(&PARSED_UNIT), CacheState::Error);
        assert_eq!(
            entry.failure(DescriptorKey::ParsedUnit).map(|f| f.message.as_ref()),
            Some("unreadable")
        );
        entry.invalidate_content();
        assert_eq!(entry.state(&PARSED_UNIT), CacheState::Invalid);
        assert!(entry.failure(DescriptorKey::ParsedUnit).is_none());
        assert_eq!(entry.content_generation(), 1);
    }

    #[test]
    fn test_any_parsed_unit_skips_tree_being_recomputed() {
        let mut entry = SourceEntry::new();
        let unit = parsed("library a;");
        entry.set_value(&PARSED_UNIT, Some(unit.clone()));
        assert_eq!(entry.any_parsed_unit(), Some(unit));

        entry.set_state(&PARSED_UNIT, CacheState::InProcess).unwrap();
        assert!(entry.value(&PARSED_UNIT).is_some());
        assert_eq!(entry.any_parsed_unit(), None);
    }

    #[test]
    fn test_untyped_access_checks_scoping() {
        let mut entry = SourceEntry::new();
        let library = SourceId::new(7);
        assert!(entry.state_of(DescriptorKey::ResolvedUnit, None).is_err());
        assert!(entry.state_of(DescriptorKey::ParsedUnit, Some(library)).is_err());

        entry
            .set_state_of(DescriptorKey::ResolvedUnit, Some(library), CacheState::InProcess)
            .unwrap();
        assert_eq!(
            entry.state_of(DescriptorKey::ResolvedUnit, Some(library)).unwrap(),
            CacheState::InProcess
        );
        assert_eq!(
            entry.state_of(DescriptorKey::ResolutionErrors, Some(library)).unwrap(),
            CacheState::Invalid
        );
        assert_eq!(
            entry.state_of(DescriptorKey::ParsedUnit, None).unwrap(),
            CacheState::Invalid
        );
    }

    #[test]
    fn test_invalidate_all_resolution_information() {
        let mut entry = SourceEntry::new();
        let library = SourceId::new(1);
        entry.set_value_in(&RESOLUTION_ERRORS, library, Arc::from(Vec::new()));
        entry.set_value(&IS_CLIENT, true);
        entry.set_value(&PUBLIC_NAMESPACE, Some(Namespace::empty()));
        entry.set_value(&SOURCE_KIND, SourceKind::Library);

        entry.invalidate_all_resolution_information();
        assert!(entry.resolution().is_empty());
        assert_eq!(entry.state_in(&RESOLUTION_ERRORS, library), CacheState::Invalid);
        assert_eq!(entry.state(&IS_CLIENT), CacheState::Invalid);
        assert_eq!(entry.state(&PUBLIC_NAMESPACE), CacheState::Invalid);
        assert_eq!(entry.state(&SOURCE_KIND), CacheState::Valid);
        assert_eq!(entry.resolution_generation(), 1);
    }

    #[test]
    fn test_any_parsed_unit_falls_back_to_resolved_unit() {
        let mut entry = SourceEntry::new();
        let library = SourceId::new(1);
        let unit = parsed("part of a;");
        entry.set_value_in(
            &RESOLVED_UNIT,
            library,
            Some(Arc::new(ResolvedUnit {
                source: SourceId::new(2),
                library,
                unit: unit.clone(),
                declarations: Vec::new(),
                references: Vec::new(),
            })),
        );
        assert_eq!(entry.any_parsed_unit(), Some(unit));
    }

    #[test]
    fn test_writable_copy_is_independent() {
        let mut entry = SourceEntry::new();
        entry.set_value(&IS_LAUNCHABLE, true);
        let mut copy = entry.writable_copy();
        copy.set_state(&IS_LAUNCHABLE, CacheState::Invalid).unwrap();
        assert!(entry.value(&IS_LAUNCHABLE));
        assert!(!copy.value(&IS_LAUNCHABLE));
    }
}
