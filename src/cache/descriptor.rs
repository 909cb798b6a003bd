//! Typed keys for the facts cached about a source.
//!
//! A descriptor names one fact and knows where it lives. Facts that depend
//! only on a source are stored on its [`SourceEntry`]; facts that depend on
//! the library a unit is analysed in are stored on a
//! [`ResolutionState`](super::ResolutionState) and use a
//! [`ResolutionDescriptor`].

use std::fmt;
use std::sync::Arc;

use super::entry::{SourceEntry, SourceFlags};
use super::resolution::ResolutionState;
use super::state::{CacheState, Slot};
use crate::base::{LineInfo, SourceId};
use crate::hir::{Diagnostic, LibraryElement, Namespace, ResolvedUnit};
use crate::syntax::{ParsedUnit, SourceKind};

/// Untyped name of a descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptorKey {
    LineInfo,
    SourceKind,
    ParsedUnit,
    ParseErrors,
    IncludedParts,
    ReferencedLibraries,
    Element,
    PublicNamespace,
    IsClient,
    IsLaunchable,
    ResolvedUnit,
    ResolutionErrors,
}

impl DescriptorKey {
    pub const ALL: [DescriptorKey; 12] = [
        DescriptorKey::LineInfo,
        DescriptorKey::SourceKind,
        DescriptorKey::ParsedUnit,
        DescriptorKey::ParseErrors,
        DescriptorKey::IncludedParts,
        DescriptorKey::ReferencedLibraries,
        DescriptorKey::Element,
        DescriptorKey::PublicNamespace,
        DescriptorKey::IsClient,
        DescriptorKey::IsLaunchable,
        DescriptorKey::ResolvedUnit,
        DescriptorKey::ResolutionErrors,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DescriptorKey::LineInfo => "LINE_INFO",
            DescriptorKey::SourceKind => "SOURCE_KIND",
            DescriptorKey::ParsedUnit => "PARSED_UNIT",
            DescriptorKey::ParseErrors => "PARSE_ERRORS",
            DescriptorKey::IncludedParts => "INCLUDED_PARTS",
            DescriptorKey::ReferencedLibraries => "REFERENCED_LIBRARIES",
            DescriptorKey::Element => "ELEMENT",
            DescriptorKey::PublicNamespace => "PUBLIC_NAMESPACE",
            DescriptorKey::IsClient => "IS_CLIENT",
            DescriptorKey::IsLaunchable => "IS_LAUNCHABLE",
            DescriptorKey::ResolvedUnit => "RESOLVED_UNIT",
            DescriptorKey::ResolutionErrors => "RESOLUTION_ERRORS",
        }
    }

    /// Stored per (source, library) pair rather than per source.
    pub fn is_library_scoped(self) -> bool {
        matches!(
            self,
            DescriptorKey::ResolvedUnit | DescriptorKey::ResolutionErrors
        )
    }

    /// Derived from the source text alone.
    pub fn is_content_derived(self) -> bool {
        matches!(
            self,
            DescriptorKey::LineInfo
                | DescriptorKey::SourceKind
                | DescriptorKey::ParsedUnit
                | DescriptorKey::ParseErrors
                | DescriptorKey::IncludedParts
                | DescriptorKey::ReferencedLibraries
        )
    }
}

impl fmt::Display for DescriptorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SOURCE DESCRIPTORS
// ============================================================================

/// A fact stored on a [`SourceEntry`].
pub trait SourceDescriptor {
    type Value: Clone;

    fn key(&self) -> DescriptorKey;
    fn state(&self, entry: &SourceEntry) -> CacheState;
    fn value(&self, entry: &SourceEntry) -> Self::Value;
    /// Store `value` and mark it VALID.
    fn store(&self, entry: &mut SourceEntry, value: Self::Value);
    /// Change the state, keeping the value.
    fn mark(&self, entry: &mut SourceEntry, state: CacheState);
    /// Clear the value to its default and set `state`.
    fn reset(&self, entry: &mut SourceEntry, state: CacheState);
}

/// A fact with its own [`Slot`] on the entry.
pub struct SlotDescriptor<T> {
    key: DescriptorKey,
    slot: fn(&SourceEntry) -> &Slot<T>,
    slot_mut: fn(&mut SourceEntry) -> &mut Slot<T>,
}

impl<T> fmt::Debug for SlotDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotDescriptor({})", self.key)
    }
}

impl<T: Clone + Default> SourceDescriptor for SlotDescriptor<T> {
    type Value = T;

    fn key(&self) -> DescriptorKey {
        self.key
    }

    fn state(&self, entry: &SourceEntry) -> CacheState {
        (self.slot)(entry).state()
    }

    fn value(&self, entry: &SourceEntry) -> T {
        (self.slot)(entry).value().clone()
    }

    fn store(&self, entry: &mut SourceEntry, value: T) {
        (self.slot_mut)(entry).store(value);
    }

    fn mark(&self, entry: &mut SourceEntry, state: CacheState) {
        (self.slot_mut)(entry).mark(state);
    }

    fn reset(&self, entry: &mut SourceEntry, state: CacheState) {
        (self.slot_mut)(entry).reset(state);
    }
}

/// A boolean fact stored as one bit of the entry's flag mask.
#[derive(Debug)]
pub struct FlagDescriptor {
    key: DescriptorKey,
    flag: SourceFlags,
}

impl SourceDescriptor for FlagDescriptor {
    type Value = bool;

    fn key(&self) -> DescriptorKey {
        self.key
    }

    fn state(&self, entry: &SourceEntry) -> CacheState {
        entry.flag_state(self.flag)
    }

    fn value(&self, entry: &SourceEntry) -> bool {
        entry.flags.contains(self.flag)
    }

    fn store(&self, entry: &mut SourceEntry, value: bool) {
        entry.flags.set(self.flag, value);
        entry.set_flag_state(self.flag, CacheState::Valid);
    }

    fn mark(&self, entry: &mut SourceEntry, state: CacheState) {
        entry.set_flag_state(self.flag, state);
    }

    fn reset(&self, entry: &mut SourceEntry, state: CacheState) {
        entry.flags.remove(self.flag);
        entry.set_flag_state(self.flag, state);
    }
}

macro_rules! slot_descriptor {
    ($(#[$meta:meta])* $name:ident, $key:ident, $field:ident: $ty:ty) => {
        $(#[$meta])*
        pub const $name: SlotDescriptor<$ty> = {
            fn slot(entry: &SourceEntry) -> &Slot<$ty> {
                &entry.$field
            }
            fn slot_mut(entry: &mut SourceEntry) -> &mut Slot<$ty> {
                &mut entry.$field
            }
            SlotDescriptor {
                key: DescriptorKey::$key,
                slot,
                slot_mut,
            }
        };
    };
}

slot_descriptor!(
    /// Line starts of the source text.
    LINE_INFO, LineInfo, line_info: Option<Arc<LineInfo>>
);
slot_descriptor!(
    /// Library or part; `Unknown` until parsed.
    SOURCE_KIND, SourceKind, source_kind: SourceKind
);
slot_descriptor!(PARSED_UNIT, ParsedUnit, parsed_unit: Option<Arc<ParsedUnit>>);
slot_descriptor!(PARSE_ERRORS, ParseErrors, parse_errors: Arc<[Diagnostic]>);
slot_descriptor!(
    /// Sources named by `part` directives.
    INCLUDED_PARTS, IncludedParts, included_parts: Arc<[SourceId]>
);
slot_descriptor!(
    /// Sources named by `import` and `export` directives.
    REFERENCED_LIBRARIES, ReferencedLibraries, referenced_libraries: Arc<[SourceId]>
);
slot_descriptor!(
    /// The library element of a defining unit.
    ELEMENT, Element, element: Option<Arc<LibraryElement>>
);
slot_descriptor!(PUBLIC_NAMESPACE, PublicNamespace, public_namespace: Option<Namespace>);

/// The library (transitively) uses a client-only library.
pub const IS_CLIENT: FlagDescriptor = FlagDescriptor {
    key: DescriptorKey::IsClient,
    flag: SourceFlags::CLIENT_CODE,
};

/// The library declares an entry point.
pub const IS_LAUNCHABLE: FlagDescriptor = FlagDescriptor {
    key: DescriptorKey::IsLaunchable,
    flag: SourceFlags::LAUNCHABLE,
};

// ============================================================================
// RESOLUTION DESCRIPTORS
// ============================================================================

/// A fact stored per (source, library) pair.
pub struct ResolutionDescriptor<T> {
    key: DescriptorKey,
    slot: fn(&ResolutionState) -> &Slot<T>,
    slot_mut: fn(&mut ResolutionState) -> &mut Slot<T>,
}

impl<T> fmt::Debug for ResolutionDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolutionDescriptor({})", self.key)
    }
}

impl<T: Clone + Default> ResolutionDescriptor<T> {
    pub fn key(&self) -> DescriptorKey {
        self.key
    }

    pub(crate) fn slot<'a>(&self, state: &'a ResolutionState) -> &'a Slot<T> {
        (self.slot)(state)
    }

    pub(crate) fn slot_mut<'a>(&self, state: &'a mut ResolutionState) -> &'a mut Slot<T> {
        (self.slot_mut)(state)
    }
}

/// The unit with every name reference resolved in one library's scope.
pub const RESOLVED_UNIT: ResolutionDescriptor<Option<Arc<ResolvedUnit>>> = {
    fn slot(state: &ResolutionState) -> &Slot<Option<Arc<ResolvedUnit>>> {
        &state.resolved_unit
    }
    fn slot_mut(state: &mut ResolutionState) -> &mut Slot<Option<Arc<ResolvedUnit>>> {
        &mut state.resolved_unit
    }
    ResolutionDescriptor {
        key: DescriptorKey::ResolvedUnit,
        slot,
        slot_mut,
    }
};

pub const RESOLUTION_ERRORS: ResolutionDescriptor<Arc<[Diagnostic]>> = {
    fn slot(state: &ResolutionState) -> &Slot<Arc<[Diagnostic]>> {
        &state.resolution_errors
    }
    fn slot_mut(state: &mut ResolutionState) -> &mut Slot<Arc<[Diagnostic]>> {
        &mut state.resolution_errors
    }
    ResolutionDescriptor {
        key: DescriptorKey::ResolutionErrors,
        slot,
        slot_mut,
    }
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoping() {
        let scoped: Vec<_> = DescriptorKey::ALL
            .iter()
            .filter(|key| key.is_library_scoped())
            .collect();
        assert_eq!(
            scoped,
            vec![&DescriptorKey::ResolvedUnit, &DescriptorKey::ResolutionErrors]
        );
        assert_eq!(RESOLVED_UNIT.key(), DescriptorKey::ResolvedUnit);
        assert_eq!(PARSED_UNIT.key(), DescriptorKey::ParsedUnit);
    }

    #[test]
    fn test_content_derived_keys() {
        let content = DescriptorKey::ALL
            .iter()
            .filter(|key| key.is_content_derived())
            .count();
        assert_eq!(content, 6);
        assert!(!DescriptorKey::Element.is_content_derived());
    }
}
