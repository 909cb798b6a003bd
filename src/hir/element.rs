//! Elements: the named things declarations introduce.
//!
//! Elements are immutable once built for a snapshot. Identity is the
//! [`ElementId`] (owning library + declaration index), so the same
//! declaration reached through two imports compares equal.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use text_size::TextRange;

use super::namespace::ImportDescription;
use super::types::{InterfaceType, Type, TypeParameterType};
use crate::base::SourceId;

/// Identity of a top-level declaration: owning library and position in the
/// library's declaration list (defining unit first, then parts in order).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ElementId {
    pub library: SourceId,
    pub index: u32,
}

/// Classes are identified like any other element.
pub type ClassId = ElementId;

impl ElementId {
    #[inline]
    pub const fn new(library: SourceId, index: u32) -> Self {
        Self { library, index }
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({}, {})", self.library.index(), self.index)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.library, self.index)
    }
}

/// Names starting with `_` are library-private and never importable.
pub fn is_private_name(name: &str) -> bool {
    name.starts_with('_')
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A class with `arity` type parameters.
    Class { arity: u32 },
    Function,
    Variable,
}

impl ElementKind {
    pub fn is_class(self) -> bool {
        matches!(self, ElementKind::Class { .. })
    }

    pub fn display(self) -> &'static str {
        match self {
            ElementKind::Class { .. } => "class",
            ElementKind::Function => "function",
            ElementKind::Variable => "variable",
        }
    }
}

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredElement {
    pub id: ElementId,
    pub name: SmolStr,
    pub kind: ElementKind,
    /// Unit the declaration appears in (the library or one of its parts).
    pub unit: SourceId,
    pub range: TextRange,
}

/// Placeholder returned for a name imported from several libraries, so
/// resolution of the surrounding code can continue.
#[derive(Clone, Debug)]
pub struct MultiplyDefinedElement {
    pub name: SmolStr,
    /// Distinct declared elements, in import order.
    pub conflicting: Vec<Element>,
}

#[derive(Clone, Debug)]
pub enum Element {
    Declared(Arc<DeclaredElement>),
    MultiplyDefined(Arc<MultiplyDefinedElement>),
}

impl Element {
    pub fn declared(element: DeclaredElement) -> Self {
        Element::Declared(Arc::new(element))
    }

    /// Merge conflicting elements into one placeholder, flattening nested
    /// placeholders and dropping duplicates.
    pub fn multiply_defined(name: SmolStr, elements: impl IntoIterator<Item = Element>) -> Self {
        let mut conflicting: Vec<Element> = Vec::new();
        for element in elements {
            let parts = match element {
                Element::MultiplyDefined(multi) => multi.conflicting.clone(),
                declared => vec![declared],
            };
            for part in parts {
                if !conflicting.contains(&part) {
                    conflicting.push(part);
                }
            }
        }
        Element::MultiplyDefined(Arc::new(MultiplyDefinedElement { name, conflicting }))
    }

    pub fn name(&self) -> &SmolStr {
        match self {
            Element::Declared(element) => &element.name,
            Element::MultiplyDefined(element) => &element.name,
        }
    }

    pub fn id(&self) -> Option<ElementId> {
        match self {
            Element::Declared(element) => Some(element.id),
            Element::MultiplyDefined(_) => None,
        }
    }

    /// Library that declares this element.
    pub fn library(&self) -> Option<SourceId> {
        self.id().map(|id| id.library)
    }

    pub fn kind(&self) -> Option<ElementKind> {
        match self {
            Element::Declared(element) => Some(element.kind),
            Element::MultiplyDefined(_) => None,
        }
    }

    pub fn as_declared(&self) -> Option<&DeclaredElement> {
        match self {
            Element::Declared(element) => Some(element),
            Element::MultiplyDefined(_) => None,
        }
    }

    pub fn is_multiply_defined(&self) -> bool {
        matches!(self, Element::MultiplyDefined(_))
    }

    pub fn is_private(&self) -> bool {
        is_private_name(self.name())
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Element::Declared(a), Element::Declared(b)) => a.id == b.id,
            (Element::MultiplyDefined(a), Element::MultiplyDefined(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Element {}

// ============================================================================
// CLASSES
// ============================================================================

/// A node of the class graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassElement {
    pub id: ClassId,
    pub name: SmolStr,
    pub type_parameters: Vec<SmolStr>,
    /// `None` only for a root of the hierarchy.
    pub supertype: Option<InterfaceType>,
    pub interfaces: Vec<InterfaceType>,
    pub mixins: Vec<InterfaceType>,
}

impl ClassElement {
    pub fn new(id: ClassId, name: impl Into<SmolStr>) -> Self {
        Self {
            id,
            name: name.into(),
            type_parameters: Vec::new(),
            supertype: None,
            interfaces: Vec::new(),
            mixins: Vec::new(),
        }
    }

    pub fn with_type_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.type_parameters = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_supertype(mut self, supertype: InterfaceType) -> Self {
        self.supertype = Some(supertype);
        self
    }

    pub fn with_interfaces(mut self, interfaces: impl IntoIterator<Item = InterfaceType>) -> Self {
        self.interfaces = interfaces.into_iter().collect();
        self
    }

    pub fn with_mixins(mut self, mixins: impl IntoIterator<Item = InterfaceType>) -> Self {
        self.mixins = mixins.into_iter().collect();
        self
    }

    pub fn arity(&self) -> usize {
        self.type_parameters.len()
    }

    pub fn is_root(&self) -> bool {
        self.supertype.is_none()
    }

    /// The type parameter `index` of this class, as a type.
    pub fn parameter(&self, index: usize) -> Option<Type> {
        self.type_parameters.get(index).map(|name| {
            Type::Parameter(TypeParameterType {
                owner: self.id,
                index: index as u32,
                name: name.clone(),
            })
        })
    }

    /// The class instantiated with its own type parameters (`C<T, U>`).
    pub fn this_type(&self) -> InterfaceType {
        InterfaceType::new(self.id)
            .with_arguments((0..self.arity()).filter_map(|index| self.parameter(index)))
    }

    /// Declared supertype, interfaces and mixins, in that order.
    pub fn direct_supertypes(&self) -> impl Iterator<Item = &InterfaceType> {
        self.supertype
            .iter()
            .chain(self.interfaces.iter())
            .chain(self.mixins.iter())
    }
}

// ============================================================================
// LIBRARIES
// ============================================================================

/// The ELEMENT fact of a library source.
#[derive(Clone, Debug)]
pub struct LibraryElement {
    pub source: SourceId,
    pub name: Option<SmolStr>,
    /// Part units, in `part` directive order.
    pub parts: Vec<SourceId>,
    /// Every top-level declaration; `declarations[i].id().index == i`.
    pub declarations: Vec<Element>,
    pub classes: FxHashMap<ClassId, Arc<ClassElement>>,
    pub imports: Vec<ImportDescription>,
    pub exports: Vec<ImportDescription>,
    /// Top-level function that makes the library launchable.
    pub entry_point: Option<ElementId>,
}

impl LibraryElement {
    pub fn class(&self, id: ClassId) -> Option<&ClassElement> {
        self.classes.get(&id).map(|class| class.as_ref())
    }

    /// First declaration with this name (later duplicates are errors).
    pub fn declaration(&self, name: &str) -> Option<&Element> {
        self.declarations.iter().find(|element| element.name() == name)
    }

    pub fn class_named(&self, name: &str) -> Option<&ClassElement> {
        self.declaration(name)
            .and_then(Element::id)
            .and_then(|id| self.class(id))
    }

    /// Defining unit followed by parts.
    pub fn units(&self) -> impl Iterator<Item = SourceId> + '_ {
        std::iter::once(self.source).chain(self.parts.iter().copied())
    }

    pub fn is_launchable(&self) -> bool {
        self.entry_point.is_some()
    }
}
