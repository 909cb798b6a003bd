//! State machine tests for source entries.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rstest::rstest;
use tessera::cache::{
    CacheState, ComputeFailure, DescriptorKey, INCLUDED_PARTS, IS_CLIENT, LINE_INFO, PARSE_ERRORS,
    PARSED_UNIT, PUBLIC_NAMESPACE, REFERENCED_LIBRARIES, SOURCE_KIND, SourceEntry,
};
use tessera::hir::{Diagnostic, Namespace};
use tessera::syntax::{SourceKind, parse};
use tessera::{AnalysisError, SourceId, TextRange};

fn library_for(key: DescriptorKey) -> Option<SourceId> {
    key.is_library_scoped().then(|| SourceId::new(9))
}

#[rstest]
#[case(DescriptorKey::LineInfo)]
#[case(DescriptorKey::SourceKind)]
#[case(DescriptorKey::ParsedUnit)]
#[case(DescriptorKey::ParseErrors)]
#[case(DescriptorKey::IncludedParts)]
#[case(DescriptorKey::ReferencedLibraries)]
#[case(DescriptorKey::Element)]
#[case(DescriptorKey::PublicNamespace)]
#[case(DescriptorKey::IsClient)]
#[case(DescriptorKey::IsLaunchable)]
#[case(DescriptorKey::ResolvedUnit)]
#[case(DescriptorKey::ResolutionErrors)]
fn test_state_transitions(#[case] key: DescriptorKey) {
    let mut entry = SourceEntry::new();
    let library = library_for(key);
    assert_eq!(entry.state_of(key, library).unwrap(), CacheState::Invalid);

    entry.set_state_of(key, library, CacheState::InProcess).unwrap();
    assert_eq!(entry.state_of(key, library).unwrap(), CacheState::InProcess);

    entry.set_state_of(key, library, CacheState::Error).unwrap();
    assert_eq!(entry.state_of(key, library).unwrap(), CacheState::Error);

    entry.set_state_of(key, library, CacheState::Invalid).unwrap();
    assert_eq!(entry.state_of(key, library).unwrap(), CacheState::Invalid);

    assert!(matches!(
        entry.set_state_of(key, library, CacheState::Valid),
        Err(AnalysisError::ContractViolation { .. })
    ));
}

#[rstest]
#[case(DescriptorKey::ParsedUnit, Some(SourceId::new(1)))]
#[case(DescriptorKey::IsClient, Some(SourceId::new(1)))]
#[case(DescriptorKey::ResolvedUnit, None)]
#[case(DescriptorKey::ResolutionErrors, None)]
fn test_wrong_scope_is_a_contract_violation(
    #[case] key: DescriptorKey,
    #[case] library: Option<SourceId>,
) {
    let entry = SourceEntry::new();
    assert!(matches!(
        entry.state_of(key, library),
        Err(AnalysisError::ContractViolation { .. })
    ));
}

#[test]
fn test_set_value_is_observed_as_valid() {
    let mut entry = SourceEntry::new();
    let parse = parse("library a; import 'b.tsr'; fn f;");
    let unit = Arc::new(parse.unit);
    let line_info = Arc::new(parse.line_info);
    let errors: Arc<[Diagnostic]> = Arc::from(vec![Diagnostic::error(
        SourceId::new(0),
        TextRange::default(),
        "oops",
    )]);
    let referenced: Arc<[SourceId]> = Arc::from(vec![SourceId::new(1)]);

    entry.set_value(&PARSED_UNIT, Some(unit.clone()));
    entry.set_value(&LINE_INFO, Some(line_info.clone()));
    entry.set_value(&PARSE_ERRORS, errors.clone());
    entry.set_value(&REFERENCED_LIBRARIES, referenced.clone());
    entry.set_value(&SOURCE_KIND, SourceKind::Library);
    entry.set_value(&PUBLIC_NAMESPACE, Some(Namespace::empty()));

    assert_eq!(entry.state(&PARSED_UNIT), CacheState::Valid);
    assert_eq!(entry.value(&PARSED_UNIT), Some(unit));
    assert_eq!(entry.value(&LINE_INFO), Some(line_info));
    assert_eq!(entry.value(&PARSE_ERRORS), errors);
    assert_eq!(entry.value(&REFERENCED_LIBRARIES), referenced);
    assert_eq!(entry.value(&SOURCE_KIND), SourceKind::Library);
    assert_eq!(entry.value(&PUBLIC_NAMESPACE), Some(Namespace::empty()));
}

#[test]
fn test_invalid_restores_documented_defaults() {
    let mut entry = SourceEntry::new();
    entry.set_value(&PARSED_UNIT, Some(Arc::new(parse("library a;").unit)));
    entry.set_value(&INCLUDED_PARTS, Arc::from(vec![SourceId::new(3)]));
    entry.set_value(&SOURCE_KIND, SourceKind::Part);
    entry.set_value(&IS_CLIENT, true);

    entry.set_state(&PARSED_UNIT, CacheState::Invalid).unwrap();
    entry.set_state(&INCLUDED_PARTS, CacheState::Invalid).unwrap();
    entry.set_state(&SOURCE_KIND, CacheState::Invalid).unwrap();
    entry.set_state(&IS_CLIENT, CacheState::Invalid).unwrap();

    assert_eq!(entry.value(&PARSED_UNIT), None);
    assert!(entry.value(&INCLUDED_PARTS).is_empty());
    assert_eq!(entry.value(&SOURCE_KIND), SourceKind::Unknown);
    assert!(!entry.value(&IS_CLIENT));
}

#[test]
fn test_in_process_preserves_previous_value() {
    let mut entry = SourceEntry::new();
    let unit = Arc::new(parse("library kept;").unit);
    entry.set_value(&PARSED_UNIT, Some(unit.clone()));
    entry.set_value(&IS_CLIENT, true);

    entry.set_state(&PARSED_UNIT, CacheState::InProcess).unwrap();
    entry.set_state(&IS_CLIENT, CacheState::InProcess).unwrap();

    assert_eq!(entry.state(&PARSED_UNIT), CacheState::InProcess);
    assert_eq!(entry.value(&PARSED_UNIT), Some(unit));
    assert!(entry.value(&IS_CLIENT));
}

#[test]
fn test_writable_copy_is_independent() {
    let mut original = SourceEntry::new();
    original.set_value(&IS_CLIENT, true);
    let mut copy = original.writable_copy();
    copy.set_error(&IS_CLIENT, ComputeFailure::new("failed"));

    assert_eq!(original.state(&IS_CLIENT), CacheState::Valid);
    assert_eq!(copy.state(&IS_CLIENT), CacheState::Error);
    assert!(original.failure(DescriptorKey::IsClient).is_none());
}
