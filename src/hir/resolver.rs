//! Declaration resolution.
//!
//! Turns the parse trees of a library (its defining unit plus parts) into a
//! [`LibraryElement`], a [`ResolvedUnit`] per member unit, and the diagnostics
//! anchored in each unit. Parse trees of other libraries are only needed for
//! their public namespaces, which are computed from parse trees alone.
//!
//! ```text
//! parsed units ──► declared_elements ──► own scope ─┐
//!      │                                            ├──► LibraryScope ──► ResolvedUnit
//!      └──► exports ──► public_namespace ──► import scope ─┘
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use text_size::TextRange;

use super::diagnostics::{Diagnostic, DiagnosticCollector, codes};
use super::element::{
    ClassElement, ClassId, DeclaredElement, Element, ElementId, ElementKind, LibraryElement,
};
use super::namespace::{ImportDescription, Namespace, NamespaceBuilder};
use super::scope::{LibraryImportScope, LibraryScope, ReferenceSite};
use super::types::{InterfaceType, Type, TypeParameterType};
use crate::base::SourceId;
use crate::error::{AnalysisError, Result};
use crate::syntax::{
    DeclarationKind, NameRef, NamespaceDirective, ParsedUnit, SourceKind, TypeRef,
};

// ============================================================================
// INPUTS
// ============================================================================

/// Parse trees and URI resolution for the sources in analysis scope.
pub trait UnitSource {
    /// The parse tree of `source`, or `None` if it is not in scope.
    fn parsed_unit(&self, source: SourceId) -> Option<Arc<ParsedUnit>>;

    /// The source a URI names, if it is in scope.
    fn resolve_uri(&self, uri: &str) -> Option<SourceId>;

    /// Name used for `source` in diagnostics.
    fn display_name(&self, source: SourceId) -> String;

    fn source_kind(&self, source: SourceId) -> SourceKind {
        self.parsed_unit(source)
            .map_or(SourceKind::Unknown, |unit| unit.source_kind())
    }

    /// The names `library` makes available to importers.
    fn public_namespace(&self, library: SourceId) -> Namespace {
        compute_public_namespace(self, library)
    }
}

/// Knobs of declaration resolution.
#[derive(Clone, Debug)]
pub struct ResolveOptions {
    pub entry_point_name: SmolStr,
    /// Implicit supertype of classes without `extends`.
    pub implicit_root: Option<SmolStr>,
    /// URIs whose transitive import or export makes a library client code.
    pub client_libraries: FxHashSet<SmolStr>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            entry_point_name: SmolStr::new_static("main"),
            implicit_root: Some(SmolStr::new_static("Object")),
            client_libraries: FxHashSet::default(),
        }
    }
}

// ============================================================================
// OUTPUTS
// ============================================================================

/// A name reference and what it resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedReference {
    pub range: TextRange,
    /// Lookup key (`p.name` for prefixed references).
    pub name: SmolStr,
    pub element: Option<Element>,
    pub in_type_annotation: bool,
}

/// The RESOLVED_UNIT fact of one unit in the context of one library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedUnit {
    pub source: SourceId,
    pub library: SourceId,
    pub unit: Arc<ParsedUnit>,
    /// Declarations appearing in this unit.
    pub declarations: Vec<Element>,
    pub references: Vec<ResolvedReference>,
}

impl ResolvedUnit {
    /// The reference spanning exactly `range`.
    pub fn reference_at(&self, range: TextRange) -> Option<&ResolvedReference> {
        self.references.iter().find(|r| r.range == range)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &ResolvedReference> {
        self.references.iter().filter(|r| r.element.is_none())
    }
}

/// Resolution products for one member unit.
#[derive(Clone, Debug)]
pub struct UnitResolution {
    pub source: SourceId,
    pub resolved: Arc<ResolvedUnit>,
    pub errors: Arc<[Diagnostic]>,
}

/// Everything resolving one library produces.
#[derive(Clone, Debug)]
pub struct LibraryResolution {
    pub element: Arc<LibraryElement>,
    /// Defining unit first, then parts.
    pub units: Vec<UnitResolution>,
    pub is_client: bool,
}

impl LibraryResolution {
    pub fn unit(&self, source: SourceId) -> Option<&UnitResolution> {
        self.units.iter().find(|unit| unit.source == source)
    }
}

// ============================================================================
// LIBRARY MEMBERSHIP
// ============================================================================

/// The units of a library and the problems found collecting them.
#[derive(Clone, Debug, Default)]
pub struct LibraryUnits {
    /// Defining unit first, then parts in directive order.
    pub units: Vec<(SourceId, Arc<ParsedUnit>)>,
    pub problems: Vec<Diagnostic>,
}

/// Collect the defining unit and the parts its `part` directives name.
///
/// Missing parts and parts that are themselves libraries are reported and
/// left out.
pub fn library_units<S: UnitSource + ?Sized>(
    units: &S,
    library: SourceId,
    defining: &Arc<ParsedUnit>,
) -> LibraryUnits {
    let mut result = LibraryUnits {
        units: vec![(library, defining.clone())],
        problems: Vec::new(),
    };
    for part in defining.parts() {
        let Some((target, unit)) = units
            .resolve_uri(&part.uri)
            .and_then(|target| units.parsed_unit(target).map(|unit| (target, unit)))
        else {
            result.problems.push(uri_does_not_exist(library, part.range, &part.uri));
            continue;
        };
        if unit.source_kind() != SourceKind::Part {
            result.problems.push(
                Diagnostic::error(
                    library,
                    part.range,
                    format!("'{}' is a library, not a part", part.uri),
                )
                .with_code(codes::PART_OF_NON_PART),
            );
            continue;
        }
        if result.units.iter().all(|(id, _)| *id != target) {
            result.units.push((target, unit));
        }
    }
    result
}

/// Elements for every top-level declaration, indexed in unit order.
pub fn declared_elements(library: SourceId, units: &[(SourceId, Arc<ParsedUnit>)]) -> Vec<Element> {
    let mut elements = Vec::new();
    for (unit_id, unit) in units {
        for declaration in &unit.declarations {
            let kind = match &declaration.kind {
                DeclarationKind::Class {
                    type_parameters, ..
                } => ElementKind::Class {
                    arity: type_parameters.len() as u32,
                },
                DeclarationKind::Function { .. } => ElementKind::Function,
                DeclarationKind::Variable { .. } => ElementKind::Variable,
            };
            elements.push(Element::declared(DeclaredElement {
                id: ElementId::new(library, elements.len() as u32),
                name: declaration.name.clone(),
                kind,
                unit: *unit_id,
                range: declaration.name_range,
            }));
        }
    }
    elements
}

/// The public namespace of `library` computed from parse trees.
///
/// Export cycles contribute nothing the second time round.
pub fn compute_public_namespace<S: UnitSource + ?Sized>(units: &S, library: SourceId) -> Namespace {
    let mut active = FxHashSet::default();
    public_namespace_of(units, library, &mut active)
}

fn public_namespace_of<S: UnitSource + ?Sized>(
    units: &S,
    library: SourceId,
    active: &mut FxHashSet<SourceId>,
) -> Namespace {
    let Some(defining) = units.parsed_unit(library) else {
        return Namespace::empty();
    };
    if defining.source_kind() == SourceKind::Part || !active.insert(library) {
        return Namespace::empty();
    }

    let members = library_units(units, library, &defining);
    let declarations = declared_elements(library, &members.units);
    let mut exports = Vec::new();
    for directive in defining.exports() {
        if let Some(target) = units.resolve_uri(&directive.target.uri) {
            let namespace = public_namespace_of(units, target, active);
            exports.push((ImportDescription::from_directive(target, directive), namespace));
        }
    }
    active.remove(&library);

    NamespaceBuilder::public_namespace(
        &declarations,
        exports.iter().map(|(description, namespace)| (description, namespace)),
    )
}

/// Whether `library`, or anything it transitively imports or exports, is one
/// of `client_uris`.
pub fn is_client_library<S: UnitSource + ?Sized>(
    units: &S,
    library: SourceId,
    client_uris: &FxHashSet<SmolStr>,
) -> bool {
    if client_uris
        .iter()
        .any(|uri| units.resolve_uri(uri) == Some(library))
    {
        return true;
    }
    let mut visited = FxHashSet::default();
    visited.insert(library);
    let mut queue = VecDeque::from([library]);
    while let Some(current) = queue.pop_front() {
        let Some(unit) = units.parsed_unit(current) else {
            continue;
        };
        for directive in unit.imports().chain(unit.exports()) {
            if client_uris.contains(&directive.target.uri) {
                return true;
            }
            if let Some(target) = units.resolve_uri(&directive.target.uri)
                && visited.insert(target)
            {
                queue.push_back(target);
            }
        }
    }
    false
}

fn uri_does_not_exist(source: SourceId, range: TextRange, uri: &str) -> Diagnostic {
    Diagnostic::error(source, range, format!("target of URI does not exist: '{}'", uri))
        .with_code(codes::URI_DOES_NOT_EXIST)
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolve one library.
///
/// Fails only when `library` is not in scope or is a part; semantic problems
/// become diagnostics.
pub fn resolve_library<S: UnitSource + ?Sized>(
    units: &S,
    library: SourceId,
    options: &ResolveOptions,
) -> Result<LibraryResolution> {
    let defining = units
        .parsed_unit(library)
        .ok_or(AnalysisError::UnknownSource(library))?;
    if defining.source_kind() == SourceKind::Part {
        return Err(AnalysisError::contract(format!(
            "{} is a part and cannot be resolved as a library",
            library
        )));
    }

    let mut diagnostics = DiagnosticCollector::new();
    let LibraryUnits {
        units: members,
        problems,
    } = library_units(units, library, &defining);
    for problem in problems {
        diagnostics.add(problem);
    }

    let declarations = declared_elements(library, &members);
    let own = own_scope(&declarations, &mut diagnostics);

    let mut imports = Vec::new();
    let mut imported = Vec::new();
    let mut library_names = FxHashMap::default();
    for directive in defining.imports() {
        if let Some(target) = namespace_target(units, library, directive, &mut diagnostics) {
            let description = ImportDescription::from_directive(target, directive);
            let exported = units.public_namespace(target);
            imported.push(NamespaceBuilder::import_namespace(&description, &exported));
            library_names.insert(target, SmolStr::from(units.display_name(target)));
            imports.push(description);
        }
    }
    let mut exports = Vec::new();
    for directive in defining.exports() {
        if let Some(target) = namespace_target(units, library, directive, &mut diagnostics) {
            exports.push(ImportDescription::from_directive(target, directive));
        }
    }

    let entry_point = own
        .get(options.entry_point_name.as_str())
        .filter(|element| element.kind() == Some(ElementKind::Function))
        .and_then(Element::id);

    let scope = LibraryScope::new(
        own,
        LibraryImportScope::new(library, imported).with_library_names(library_names),
    );
    let mut resolver = DeclarationResolver {
        scope,
        diagnostics,
        implicit_root: options.implicit_root.clone(),
        references: FxHashMap::default(),
    };

    let mut classes = FxHashMap::default();
    let mut index = 0usize;
    for (unit_id, unit) in &members {
        for declaration in &unit.declarations {
            let id = ElementId::new(library, index as u32);
            index += 1;
            match &declaration.kind {
                DeclarationKind::Class {
                    type_parameters,
                    extends,
                    mixins,
                    implements,
                } => {
                    let class = resolver.class(
                        *unit_id,
                        ClassElement::new(id, declaration.name.clone())
                            .with_type_parameters(type_parameters.iter().cloned()),
                        extends.as_ref(),
                        mixins,
                        implements,
                    );
                    classes.insert(id, Arc::new(class));
                }
                DeclarationKind::Function { return_type } => {
                    if let Some(return_type) = return_type {
                        resolver.resolve_type(*unit_id, return_type, None, true);
                    }
                }
                DeclarationKind::Variable {
                    declared_type,
                    initializer,
                } => {
                    if let Some(declared_type) = declared_type {
                        resolver.resolve_type(*unit_id, declared_type, None, true);
                    }
                    if let Some(initializer) = initializer {
                        resolver.resolve_value(*unit_id, initializer);
                    }
                }
            }
        }
    }

    let DeclarationResolver {
        diagnostics,
        mut references,
        ..
    } = resolver;

    let element = Arc::new(LibraryElement {
        source: library,
        name: defining.library_name().cloned(),
        parts: members.iter().skip(1).map(|(id, _)| *id).collect(),
        declarations: declarations.clone(),
        classes,
        imports,
        exports,
        entry_point,
    });

    let unit_results = members
        .iter()
        .map(|(unit_id, unit)| {
            let resolved = ResolvedUnit {
                source: *unit_id,
                library,
                unit: unit.clone(),
                declarations: declarations
                    .iter()
                    .filter(|element| element.as_declared().is_some_and(|d| d.unit == *unit_id))
                    .cloned()
                    .collect(),
                references: references.remove(unit_id).unwrap_or_default(),
            };
            let errors: Arc<[Diagnostic]> = diagnostics
                .diagnostics_for_source(*unit_id)
                .into_iter()
                .cloned()
                .collect();
            UnitResolution {
                source: *unit_id,
                resolved: Arc::new(resolved),
                errors,
            }
        })
        .collect();

    let is_client = is_client_library(units, library, &options.client_libraries);
    tracing::debug!(
        library = %library,
        units = members.len(),
        declarations = declarations.len(),
        errors = diagnostics.error_count(),
        warnings = diagnostics.warning_count(),
        is_client,
        "resolved library"
    );

    Ok(LibraryResolution {
        element,
        units: unit_results,
        is_client,
    })
}

/// First declaration of each name; later ones are duplicates.
fn own_scope(
    declarations: &[Element],
    diagnostics: &mut DiagnosticCollector,
) -> FxHashMap<SmolStr, Element> {
    let mut own: FxHashMap<SmolStr, Element> = FxHashMap::default();
    for element in declarations {
        let Some(declared) = element.as_declared() else {
            continue;
        };
        match own.get(element.name()).and_then(Element::as_declared) {
            Some(previous) => diagnostics.duplicate_definition(
                declared.unit,
                declared.range,
                &declared.name,
                (previous.unit, previous.range),
            ),
            None => {
                own.insert(element.name().clone(), element.clone());
            }
        }
    }
    own
}

/// The library an import or export names, if it exists and is a library.
fn namespace_target<S: UnitSource + ?Sized>(
    units: &S,
    library: SourceId,
    directive: &NamespaceDirective,
    diagnostics: &mut DiagnosticCollector,
) -> Option<SourceId> {
    let uri = &directive.target;
    let Some(target) = units.resolve_uri(&uri.uri) else {
        diagnostics.add(uri_does_not_exist(library, uri.range, &uri.uri));
        return None;
    };
    if units.source_kind(target) == SourceKind::Part {
        diagnostics.add(
            Diagnostic::error(
                library,
                uri.range,
                format!("'{}' is a part and cannot be imported or exported", uri.uri),
            )
            .with_code(codes::IMPORT_OF_NON_LIBRARY),
        );
        return None;
    }
    Some(target)
}

/// Type parameters in scope while resolving a class header.
type TypeParameters<'a> = Option<(ClassId, &'a [SmolStr])>;

struct DeclarationResolver {
    scope: LibraryScope,
    diagnostics: DiagnosticCollector,
    implicit_root: Option<SmolStr>,
    references: FxHashMap<SourceId, Vec<ResolvedReference>>,
}

impl DeclarationResolver {
    fn class(
        &mut self,
        unit: SourceId,
        mut class: ClassElement,
        extends: Option<&TypeRef>,
        mixins: &[TypeRef],
        implements: &[TypeRef],
    ) -> ClassElement {
        let parameters = class.type_parameters.clone();
        let owner = Some((class.id, parameters.as_slice()));

        class.supertype = match extends {
            Some(extends) => self.supertype(unit, extends, owner),
            None => self.implicit_root(class.id),
        };
        class.mixins = mixins
            .iter()
            .filter_map(|mixin| self.supertype(unit, mixin, owner))
            .collect();
        class.interfaces = implements
            .iter()
            .filter_map(|interface| self.supertype(unit, interface, owner))
            .collect();
        class
    }

    fn supertype(
        &mut self,
        unit: SourceId,
        type_ref: &TypeRef,
        owner: TypeParameters<'_>,
    ) -> Option<InterfaceType> {
        match self.resolve_type(unit, type_ref, owner, false) {
            Type::Interface(interface) => Some(interface),
            _ => None,
        }
    }

    /// The root class, unless `class` is the root or no root is in scope.
    fn implicit_root(&mut self, class: ClassId) -> Option<InterfaceType> {
        let root = self.implicit_root.clone()?;
        let site = ReferenceSite::value(class.library, TextRange::default());
        let element = self
            .scope
            .lookup(&root, site, &mut DiagnosticCollector::new())?;
        let declared = element.as_declared()?;
        (declared.kind.is_class() && declared.id != class).then(|| InterfaceType::new(declared.id))
    }

    fn resolve_type(
        &mut self,
        unit: SourceId,
        type_ref: &TypeRef,
        owner: TypeParameters<'_>,
        in_type_annotation: bool,
    ) -> Type {
        let name = &type_ref.name;
        if name.prefix.is_none()
            && let Some((class, parameters)) = owner
            && let Some(index) = parameters.iter().position(|p| *p == name.name)
        {
            return Type::Parameter(TypeParameterType {
                owner: class,
                index: index as u32,
                name: name.name.clone(),
            });
        }

        let Some(element) = self.lookup(unit, name, in_type_annotation) else {
            return Type::Dynamic;
        };
        let Some(declared) = element.as_declared() else {
            return Type::Dynamic;
        };
        let ElementKind::Class { arity } = declared.kind else {
            self.diagnostics.add(
                Diagnostic::error(
                    unit,
                    name.range,
                    format!("'{}' is a {}, not a type", name.name, declared.kind.display()),
                )
                .with_code(codes::NOT_A_TYPE),
            );
            return Type::Dynamic;
        };
        let class = declared.id;

        let arguments: Vec<Type> = type_ref
            .arguments
            .iter()
            .map(|argument| self.resolve_type(unit, argument, owner, in_type_annotation))
            .collect();
        let raw = InterfaceType::new(class);
        if arguments.is_empty() {
            return raw.into();
        }
        if arguments.len() != arity as usize {
            self.diagnostics.add(
                Diagnostic::error(
                    unit,
                    type_ref.range,
                    format!(
                        "'{}' takes {} type argument(s), but {} were given",
                        name.name,
                        arity,
                        arguments.len()
                    ),
                )
                .with_code(codes::WRONG_NUMBER_OF_TYPE_ARGUMENTS),
            );
            return raw.into();
        }
        raw.with_arguments(arguments).into()
    }

    fn resolve_value(&mut self, unit: SourceId, name: &NameRef) -> Option<Element> {
        self.lookup(unit, name, false)
    }

    fn lookup(&mut self, unit: SourceId, name: &NameRef, in_type_annotation: bool) -> Option<Element> {
        let key = name.lookup_key();
        let site = ReferenceSite {
            source: unit,
            range: name.range,
            in_type_annotation,
        };
        let element = self.scope.lookup(&key, site, &mut self.diagnostics);
        if element.is_none() {
            self.diagnostics.undefined_name(unit, name.range, &key);
        }
        self.references
            .entry(unit)
            .or_default()
            .push(ResolvedReference {
                range: name.range,
                name: key,
                element: element.clone(),
                in_type_annotation,
            });
        element
    }
}
