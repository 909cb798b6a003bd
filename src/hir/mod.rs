//! High-level IR: the semantic model built from parse trees.
//!
//! ## Key Types
//!
//! - [`Element`] - a named declaration, or a multiply-defined placeholder
//! - [`ClassElement`] / [`LibraryElement`] - class graph nodes and libraries
//! - [`Type`] / [`InterfaceType`] - types over the class graph
//! - [`TypeSystem`] - subtype, more-specific-than and least upper bound
//! - [`Namespace`] / [`LibraryImportScope`] - name lookup with show/hide filtering
//! - [`Diagnostic`] - semantic errors and warnings
//!
//! ## Layers
//!
//! ```text
//! ParsedUnit (per source)
//!     │
//!     ▼
//! declared_elements / public_namespace   ← parse trees only
//!     │
//!     ▼
//! resolve_library                         ← LibraryElement + ResolvedUnit + diagnostics
//!     │
//!     ▼
//! TypeSystem over LibraryGraph            ← lattice queries
//! ```

mod diagnostics;
mod element;
mod lattice;
mod namespace;
mod resolver;
mod scope;
mod types;

pub use diagnostics::{Diagnostic, DiagnosticCollector, RelatedInfo, Severity, codes};
pub use element::{
    ClassElement, ClassId, DeclaredElement, Element, ElementId, ElementKind, LibraryElement,
    MultiplyDefinedElement, is_private_name,
};
pub use lattice::{ClassGraph, ClassHierarchy, LibraryGraph, TypeSystem};
pub use namespace::{ImportDescription, Namespace, NamespaceBuilder};
pub use resolver::{
    LibraryResolution, LibraryUnits, ResolveOptions, ResolvedReference, ResolvedUnit,
    UnitResolution, UnitSource, compute_public_namespace, declared_elements, is_client_library,
    library_units, resolve_library,
};
pub use scope::{LibraryImportScope, LibraryScope, ReferenceSite};
pub use types::{InterfaceType, Type, TypeParameterType};
