//! Type lattice tests.

#![allow(clippy::unwrap_used)]

use rstest::rstest;
use tessera::cache::ELEMENT;
use tessera::hir::{ClassElement, ClassHierarchy, ClassId, ElementId, InterfaceType, Type, TypeSystem};
use tessera::SourceId;

use crate::helpers::session_helpers::*;
use crate::helpers::source_fixtures::*;

const OBJECT: u32 = 0;
const A: u32 = 1;
const B: u32 = 2;
const I: u32 = 3;
const C: u32 = 4;
const LIST: u32 = 5;

fn id(index: u32) -> ClassId {
    ElementId::new(SourceId::new(0), index)
}

fn raw(index: u32) -> InterfaceType {
    InterfaceType::new(id(index))
}

fn ty(index: u32) -> Type {
    Type::interface(id(index))
}

/// Object; A, B, I extend Object; C extends A implements I; List<E>.
fn hierarchy() -> ClassHierarchy {
    let mut graph = ClassHierarchy::new();
    graph.insert(ClassElement::new(id(OBJECT), "Object"));
    graph.insert(ClassElement::new(id(A), "A").with_supertype(raw(OBJECT)));
    graph.insert(ClassElement::new(id(B), "B").with_supertype(raw(OBJECT)));
    graph.insert(ClassElement::new(id(I), "I").with_supertype(raw(OBJECT)));
    graph.insert(
        ClassElement::new(id(C), "C")
            .with_supertype(raw(A))
            .with_interfaces([raw(I)]),
    );
    graph.insert(
        ClassElement::new(id(LIST), "List")
            .with_type_parameters(["E"])
            .with_supertype(raw(OBJECT)),
    );
    graph
}

fn list_of(index: u32) -> Type {
    Type::Interface(raw(LIST).with_arguments([ty(index)]))
}

#[rstest]
#[case(Type::Dynamic)]
#[case(Type::Bottom)]
#[case(ty(OBJECT))]
#[case(ty(C))]
#[case(list_of(A))]
fn test_subtyping_is_reflexive_and_dynamic_is_top_and_bottom(#[case] t: Type) {
    let graph = hierarchy();
    let types = TypeSystem::new(&graph);
    assert!(types.is_subtype_of(&t, &t));
    assert!(types.is_subtype_of(&t, &Type::Dynamic));
    assert!(types.is_subtype_of(&Type::Dynamic, &t));
}

#[rstest]
#[case(ty(C), ty(B))]
#[case(ty(A), ty(I))]
#[case(ty(C), ty(A))]
#[case(list_of(C), list_of(B))]
#[case(ty(C), Type::Bottom)]
#[case(ty(B), Type::Dynamic)]
fn test_least_upper_bound_is_symmetric(#[case] t: Type, #[case] s: Type) {
    let graph = hierarchy();
    let types = TypeSystem::new(&graph);
    assert_eq!(types.least_upper_bound(&t, &s), types.least_upper_bound(&s, &t));
}

#[rstest]
#[case(ty(OBJECT))]
#[case(ty(C))]
#[case(list_of(I))]
#[case(Type::Dynamic)]
fn test_least_upper_bound_of_a_type_with_itself(#[case] t: Type) {
    let graph = hierarchy();
    let types = TypeSystem::new(&graph);
    assert_eq!(types.least_upper_bound(&t, &t), Some(t));
}

#[test]
fn test_least_upper_bound_scenario() {
    let graph = hierarchy();
    let types = TypeSystem::new(&graph);
    assert_eq!(types.inheritance_depth(id(OBJECT)), 0);
    assert_eq!(types.inheritance_depth(id(A)), 1);
    assert_eq!(types.inheritance_depth(id(B)), 1);
    assert_eq!(types.inheritance_depth(id(C)), 2);
    assert_eq!(types.least_upper_bound(&ty(C), &ty(B)), Some(ty(OBJECT)));
    assert_eq!(types.least_upper_bound(&ty(C), &ty(A)), Some(ty(A)));
}

#[test]
fn test_generic_arguments() {
    let graph = hierarchy();
    let types = TypeSystem::new(&graph);
    assert!(types.is_subtype_of(&list_of(C), &list_of(A)));
    assert!(!types.is_subtype_of(&list_of(A), &list_of(C)));
    assert!(types.is_more_specific_than(&list_of(C), &list_of(A)));
    assert_eq!(
        types.least_upper_bound(&list_of(C), &list_of(B)),
        Some(Type::Interface(raw(LIST).with_arguments([Type::Dynamic])))
    );
    assert_eq!(types.display(&list_of(C)), "List<C>");
}

#[test]
fn test_cyclic_hierarchy_terminates() {
    let mut graph = ClassHierarchy::new();
    graph.insert(ClassElement::new(id(0), "P").with_supertype(raw(1)));
    graph.insert(ClassElement::new(id(1), "Q").with_supertype(raw(0)));
    graph.insert(ClassElement::new(id(2), "R"));
    let types = TypeSystem::new(&graph);
    assert!(!types.is_subtype_of(&ty(0), &ty(2)));
    assert!(types.is_subtype_of(&ty(0), &ty(1)));
    assert_eq!(types.least_upper_bound(&ty(0), &ty(2)), None);
}

#[test]
fn test_scenario_from_source() {
    let (session, ids) = session_from_sources(&[("shapes.tsr", LUB_HIERARCHY)]);
    analyze(&session);
    let library = session.value(ids[0], &ELEMENT).unwrap().unwrap();
    let graph = session.class_graph();
    let types = TypeSystem::new(&graph);
    let class = |name: &str| Type::interface(library.class_named(name).unwrap().id);

    assert_eq!(
        types.least_upper_bound(&class("C"), &class("B")),
        Some(class("Object"))
    );
    assert_eq!(types.inheritance_depth(library.class_named("C").unwrap().id), 2);
}
