//! Import scope tests through a live session.

#![allow(clippy::unwrap_used)]

use tessera::cache::{ELEMENT, PUBLIC_NAMESPACE, RESOLUTION_ERRORS, RESOLVED_UNIT};
use tessera::hir::{Element, codes};

use crate::helpers::diagnostic_helpers::*;
use crate::helpers::session_helpers::*;
use crate::helpers::source_fixtures::*;

fn library_of(element: Option<&Element>) -> Option<tessera::SourceId> {
    element.and_then(Element::library)
}

#[test]
fn test_show_and_hide_select_the_visible_library() {
    let (session, ids) = session_from_sources(&[
        ("a.tsr", LIB_A),
        ("b.tsr", LIB_B),
        ("main.tsr", SHOW_HIDE_MAIN),
    ]);
    let (a, b, main) = (ids[0], ids[1], ids[2]);
    analyze(&session);

    let resolved = session.value_in(main, &RESOLVED_UNIT, main).unwrap().unwrap();
    let reference = |name: &str| {
        resolved
            .references
            .iter()
            .find(|r| r.name == name)
            .unwrap()
    };
    assert_eq!(library_of(reference("foo").element.as_ref()), Some(a));
    assert_eq!(library_of(reference("bar").element.as_ref()), Some(b));

    let errors = session.value_in(main, &RESOLUTION_ERRORS, main).unwrap();
    assert!(errors.is_empty(), "{:?}", errors);
}

#[test]
fn test_ambiguous_import_names_both_libraries() {
    let (session, ids) = session_from_sources(&[
        ("a.tsr", LIB_A),
        ("b.tsr", LIB_B),
        ("main.tsr", AMBIGUOUS_MAIN),
    ]);
    analyze(&session);

    let errors = session.value_in(ids[2], &RESOLUTION_ERRORS, ids[2]).unwrap();
    let ambiguity = assert_single_code(&errors, codes::AMBIGUOUS_IMPORT);
    assert!(ambiguity.message.contains("'a.tsr'"), "{}", ambiguity.message);
    assert!(ambiguity.message.contains("'b.tsr'"), "{}", ambiguity.message);
    assert_eq!(ambiguity.related.len(), 2);

    let resolved = session.value_in(ids[2], &RESOLVED_UNIT, ids[2]).unwrap().unwrap();
    let bar = resolved.references.iter().find(|r| r.name == "bar").unwrap();
    assert!(bar.element.as_ref().unwrap().is_multiply_defined());
}

#[test]
fn test_ambiguity_in_type_annotation_is_a_warning() {
    let (session, ids) = session_from_sources(&[
        ("a.tsr", "library a; class Shape;"),
        ("b.tsr", "library b; class Shape;"),
        (
            "main.tsr",
            "library main; import 'a.tsr'; import 'b.tsr'; class Object; var s: Shape;",
        ),
    ]);
    analyze(&session);

    let errors = session.value_in(ids[2], &RESOLUTION_ERRORS, ids[2]).unwrap();
    assert_eq!(codes(&errors), vec![codes::AMBIGUOUS_IMPORT_IN_TYPE]);
    assert_no_errors(&errors);
}

#[test]
fn test_local_declarations_shadow_imports() {
    let (session, ids) = session_from_sources(&[
        ("a.tsr", LIB_A),
        ("main.tsr", "library main; import 'a.tsr'; fn foo; var x = foo; var y = bar;"),
    ]);
    analyze(&session);

    let resolved = session.value_in(ids[1], &RESOLVED_UNIT, ids[1]).unwrap().unwrap();
    let foo = resolved.references.iter().find(|r| r.name == "foo").unwrap();
    let bar = resolved.references.iter().find(|r| r.name == "bar").unwrap();
    assert_eq!(library_of(foo.element.as_ref()), Some(ids[1]));
    assert_eq!(library_of(bar.element.as_ref()), Some(ids[0]));
}

#[test]
fn test_public_namespace_follows_exports() {
    let (session, ids) = session_from_sources(&[
        ("a.tsr", "library a; fn fromA; fn _private;"),
        ("b.tsr", "library b; export 'a.tsr' hide fromA; export 'c.tsr'; fn fromB;"),
        ("c.tsr", "library c; export 'b.tsr'; fn fromC;"),
    ]);
    let namespace = session.public_namespace(ids[1]).unwrap();
    let names: Vec<String> = namespace.names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, vec!["fromB", "fromC"]);

    analyze(&session);
    assert!(session.value(ids[1], &PUBLIC_NAMESPACE).unwrap().is_some());
    assert!(session.value(ids[0], &ELEMENT).unwrap().unwrap().declaration("_private").is_some());
}
