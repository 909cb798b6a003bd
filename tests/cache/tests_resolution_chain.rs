//! Library-scoped resolution state tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use tessera::cache::{
    CacheState, ComputeFailure, ELEMENT, PARSE_ERRORS, RESOLUTION_ERRORS, RESOLVED_UNIT,
    SourceEntry,
};
use tessera::hir::Diagnostic;
use tessera::{SourceId, TextRange};

fn error(source: u32, message: &str) -> Diagnostic {
    Diagnostic::error(SourceId::new(source), TextRange::default(), message)
}

#[test]
fn test_one_state_per_library() {
    let mut entry = SourceEntry::new();
    let first = SourceId::new(1);
    let second = SourceId::new(2);
    entry.set_value_in(&RESOLUTION_ERRORS, first, Arc::from(vec![error(0, "in first")]));
    entry.set_value_in(&RESOLUTION_ERRORS, second, Arc::from(Vec::<Diagnostic>::new()));

    assert_eq!(entry.containing_libraries(), vec![first, second]);
    assert_eq!(entry.value_in(&RESOLUTION_ERRORS, first).len(), 1);
    assert!(entry.value_in(&RESOLUTION_ERRORS, second).is_empty());
    assert_eq!(entry.state_in(&RESOLVED_UNIT, first), CacheState::Invalid);
    assert_eq!(entry.state_in(&RESOLVED_UNIT, SourceId::new(3)), CacheState::Invalid);
}

#[test]
fn test_all_errors_spans_parse_and_every_library() {
    let mut entry = SourceEntry::new();
    entry.set_value(&PARSE_ERRORS, Arc::from(vec![error(0, "parse")]));
    entry.set_value_in(&RESOLUTION_ERRORS, SourceId::new(1), Arc::from(vec![error(0, "one")]));
    entry.set_value_in(&RESOLUTION_ERRORS, SourceId::new(2), Arc::from(vec![error(0, "two")]));

    let messages: Vec<String> = entry
        .get_all_errors()
        .iter()
        .map(|d| d.message.to_string())
        .collect();
    assert_eq!(messages, vec!["parse", "one", "two"]);
}

#[test]
fn test_resolution_error_marks_both_facts() {
    let mut entry = SourceEntry::new();
    let library = SourceId::new(4);
    entry.set_resolution_error(library, ComputeFailure::new("resolver crashed"));
    assert_eq!(entry.state_in(&RESOLVED_UNIT, library), CacheState::Error);
    assert_eq!(entry.state_in(&RESOLUTION_ERRORS, library), CacheState::Error);

    entry.set_state_in(&RESOLVED_UNIT, library, CacheState::Invalid).unwrap();
    let node = entry.resolution().get(library).unwrap();
    assert_eq!(node.failure().map(|f| f.message.as_ref()), Some("resolver crashed"));
}

#[test]
fn test_invalidating_resolution_clears_every_library() {
    let mut entry = SourceEntry::new();
    entry.set_value_in(&RESOLUTION_ERRORS, SourceId::new(1), Arc::from(Vec::<Diagnostic>::new()));
    entry.set_value(&PARSE_ERRORS, Arc::from(Vec::<Diagnostic>::new()));
    let generation = entry.resolution_generation();

    entry.invalidate_all_resolution_information();

    assert!(entry.containing_libraries().is_empty());
    assert_eq!(entry.state(&ELEMENT), CacheState::Invalid);
    assert_eq!(entry.state(&PARSE_ERRORS), CacheState::Valid);
    assert!(entry.resolution_generation() > generation);
}
