//! Invalidation tests.

#![allow(clippy::unwrap_used)]

use tessera::cache::{CacheState, ELEMENT, PARSED_UNIT, RESOLUTION_ERRORS, RESOLVED_UNIT};
use tessera::hir::codes;
use tessera::ChangeSet;

use crate::helpers::diagnostic_helpers::*;
use crate::helpers::session_helpers::*;
use crate::helpers::source_fixtures::*;

#[test]
fn test_changing_a_shared_part_invalidates_every_library() {
    let (session, ids) = session_from_sources(&[
        ("shared.tsr", SHARED_PART),
        ("first.tsr", FIRST_LIBRARY),
        ("second.tsr", SECOND_LIBRARY),
    ]);
    let (part, first, second) = (ids[0], ids[1], ids[2]);
    analyze(&session);

    assert_eq!(session.libraries_containing(part), vec![first, second]);
    assert_eq!(session.state_in(part, &RESOLVED_UNIT, first).unwrap(), CacheState::Valid);
    assert_eq!(session.state_in(part, &RESOLVED_UNIT, second).unwrap(), CacheState::Valid);

    session.set_contents(part, Some("part of shared; fn renamed;")).unwrap();

    assert_eq!(session.state(part, &PARSED_UNIT).unwrap(), CacheState::Invalid);
    assert_eq!(session.state_in(part, &RESOLVED_UNIT, first).unwrap(), CacheState::Invalid);
    assert_eq!(session.state_in(part, &RESOLVED_UNIT, second).unwrap(), CacheState::Invalid);
    assert_eq!(session.state(first, &ELEMENT).unwrap(), CacheState::Invalid);
    assert_eq!(session.state(second, &ELEMENT).unwrap(), CacheState::Invalid);
    assert_eq!(session.state_in(first, &RESOLVED_UNIT, first).unwrap(), CacheState::Invalid);

    analyze(&session);
    for library in [first, second] {
        let errors = session.value_in(library, &RESOLUTION_ERRORS, library).unwrap();
        assert_single_code(&errors, codes::UNDEFINED_NAME);
        assert_eq!(session.state_in(part, &RESOLVED_UNIT, library).unwrap(), CacheState::Valid);
    }
}

#[test]
fn test_unrelated_sources_stay_valid() {
    let (session, ids) = session_from_sources(&[
        ("a.tsr", LIB_A),
        ("b.tsr", LIB_B),
        ("user.tsr", "library user; import 'a.tsr'; var x = foo;"),
    ]);
    analyze(&session);

    session.set_contents(ids[0], Some("library a; fn foo;")).unwrap();
    assert_eq!(session.state(ids[2], &ELEMENT).unwrap(), CacheState::Invalid);
    assert_eq!(session.state(ids[1], &ELEMENT).unwrap(), CacheState::Valid);
    assert_eq!(session.state(ids[1], &PARSED_UNIT).unwrap(), CacheState::Valid);
    assert_eq!(session.state(ids[2], &PARSED_UNIT).unwrap(), CacheState::Valid);
}

#[test]
fn test_added_source_resolves_dangling_import() {
    let (session, ids) = session_from_sources(&[(
        "main.tsr",
        "library main; import 'late.tsr'; var x = lateValue;",
    )]);
    analyze(&session);
    let errors = session.value_in(ids[0], &RESOLUTION_ERRORS, ids[0]).unwrap();
    assert_eq!(
        codes(&errors),
        vec![codes::URI_DOES_NOT_EXIST, codes::UNDEFINED_NAME]
    );

    add_file(&session, "late.tsr", "library late; var lateValue;");
    assert_eq!(session.state(ids[0], &ELEMENT).unwrap(), CacheState::Invalid);

    analyze(&session);
    let errors = session.value_in(ids[0], &RESOLUTION_ERRORS, ids[0]).unwrap();
    assert!(errors.is_empty(), "{:?}", errors);
}

#[test]
fn test_removed_library_is_reported_by_importers() {
    let (session, ids) = session_from_sources(&[
        ("a.tsr", LIB_A),
        ("user.tsr", "library user; import 'a.tsr'; var x = foo;"),
    ]);
    analyze(&session);

    session.apply_changes(ChangeSet::new().removed(ids[0]));
    assert!(!session.contains(ids[0]));
    assert_eq!(session.source_id("a.tsr"), None);
    assert_eq!(session.state(ids[1], &ELEMENT).unwrap(), CacheState::Invalid);

    analyze(&session);
    let errors = session.value_in(ids[1], &RESOLUTION_ERRORS, ids[1]).unwrap();
    assert_eq!(
        codes(&errors),
        vec![codes::URI_DOES_NOT_EXIST, codes::UNDEFINED_NAME]
    );
}

#[test]
fn test_removed_part_leaves_library_without_it() {
    let (session, ids) = session_from_sources(&[
        ("lib.tsr", "library lib; part 'p.tsr';"),
        ("p.tsr", "part of lib; fn f;"),
    ]);
    analyze(&session);
    assert_eq!(session.libraries_containing(ids[1]), vec![ids[0]]);

    session.apply_changes(ChangeSet::new().removed(ids[1]));
    analyze(&session);

    let element = session.value(ids[0], &ELEMENT).unwrap().unwrap();
    assert!(element.parts.is_empty());
    let errors = session.value_in(ids[0], &RESOLUTION_ERRORS, ids[0]).unwrap();
    assert_eq!(codes(&errors), vec![codes::URI_DOES_NOT_EXIST]);
}
