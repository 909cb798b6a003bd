//! Name lookup through a library's own declarations and its imports.

use std::fmt;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use text_size::TextRange;

use super::diagnostics::{Diagnostic, DiagnosticCollector, RelatedInfo, codes};
use super::element::{Element, MultiplyDefinedElement, is_private_name};
use super::namespace::Namespace;
use crate::base::SourceId;

/// Where a name is referenced from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceSite {
    pub source: SourceId,
    pub range: TextRange,
    /// Declared variable types, return types and their type arguments.
    /// Ambiguity there is reported as a warning instead of an error.
    pub in_type_annotation: bool,
}

impl ReferenceSite {
    pub fn value(source: SourceId, range: TextRange) -> Self {
        Self {
            source,
            range,
            in_type_annotation: false,
        }
    }

    pub fn type_annotation(source: SourceId, range: TextRange) -> Self {
        Self {
            source,
            range,
            in_type_annotation: true,
        }
    }
}

/// The scope formed by a library's imports.
///
/// Single matches are memoized on first lookup. Ambiguous names are
/// reported at every reference site and resolve to a
/// [`MultiplyDefinedElement`](super::MultiplyDefinedElement) placeholder.
pub struct LibraryImportScope {
    library: SourceId,
    imported: Vec<Namespace>,
    defined: FxHashMap<SmolStr, Element>,
    library_names: FxHashMap<SourceId, SmolStr>,
}

impl LibraryImportScope {
    pub fn new(library: SourceId, imported: Vec<Namespace>) -> Self {
        Self {
            library,
            imported,
            defined: FxHashMap::default(),
            library_names: FxHashMap::default(),
        }
    }

    /// Names used for libraries in ambiguity messages.
    pub fn with_library_names(mut self, names: FxHashMap<SourceId, SmolStr>) -> Self {
        self.library_names = names;
        self
    }

    pub fn library(&self) -> SourceId {
        self.library
    }

    /// Memoize a definition. Private names are never defined here.
    pub fn define(&mut self, name: SmolStr, element: Element) {
        if !is_private_name(&name) {
            self.defined.insert(name, element);
        }
    }

    pub fn lookup(
        &mut self,
        name: &str,
        site: ReferenceSite,
        diagnostics: &mut DiagnosticCollector,
    ) -> Option<Element> {
        if let Some(element) = self.defined.get(name) {
            return Some(element.clone());
        }

        let mut matches: Vec<Element> = Vec::new();
        for namespace in &self.imported {
            if let Some(element) = namespace.get(name)
                && !matches.contains(element)
            {
                matches.push(element.clone());
            }
        }

        match matches.len() {
            0 => None,
            1 => {
                let element = matches.pop()?;
                self.define(SmolStr::from(name), element.clone());
                Some(element)
            }
            _ => {
                let placeholder = Element::multiply_defined(SmolStr::from(name), matches);
                if let Element::MultiplyDefined(multi) = &placeholder {
                    diagnostics.add(self.ambiguity(name, multi, site));
                }
                Some(placeholder)
            }
        }
    }

    fn ambiguity(
        &self,
        name: &str,
        multi: &MultiplyDefinedElement,
        site: ReferenceSite,
    ) -> Diagnostic {
        let libraries: Vec<String> = multi
            .conflicting
            .iter()
            .map(|element| self.library_name(element.library()))
            .collect();
        tracing::debug!(
            library = %self.library,
            name,
            libraries = ?libraries,
            "ambiguous import"
        );

        let message = format!(
            "the name '{}' is defined in the libraries {}",
            name,
            LibraryList(&libraries)
        );
        let (code, mut diagnostic) = if site.in_type_annotation {
            (
                codes::AMBIGUOUS_IMPORT_IN_TYPE,
                Diagnostic::warning(site.source, site.range, message),
            )
        } else {
            (
                codes::AMBIGUOUS_IMPORT,
                Diagnostic::error(site.source, site.range, message),
            )
        };
        diagnostic = diagnostic.with_code(code);
        for element in &multi.conflicting {
            if let Some(declared) = element.as_declared() {
                diagnostic = diagnostic.with_related(RelatedInfo::new(
                    declared.unit,
                    declared.range,
                    format!("'{}' declared here", declared.name),
                ));
            }
        }
        diagnostic
    }

    fn library_name(&self, library: Option<SourceId>) -> String {
        match library {
            Some(id) => match self.library_names.get(&id) {
                Some(name) => name.to_string(),
                None => id.to_string(),
            },
            None => "<unknown>".to_string(),
        }
    }
}

/// `'a' and 'b'`, `'a', 'b' and 'c'`.
struct LibraryList<'a>(&'a [String]);

impl fmt::Display for LibraryList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                let separator = if i + 1 == self.0.len() { " and " } else { ", " };
                f.write_str(separator)?;
            }
            write!(f, "'{}'", name)?;
        }
        Ok(())
    }
}

/// A library's top-level scope: own declarations (including private ones)
/// shadow everything imported.
pub struct LibraryScope {
    own: FxHashMap<SmolStr, Element>,
    imports: LibraryImportScope,
}

impl LibraryScope {
    pub fn new(own: FxHashMap<SmolStr, Element>, imports: LibraryImportScope) -> Self {
        Self { own, imports }
    }

    pub fn lookup(
        &mut self,
        name: &str,
        site: ReferenceSite,
        diagnostics: &mut DiagnosticCollector,
    ) -> Option<Element> {
        if let Some(element) = self.own.get(name) {
            return Some(element.clone());
        }
        self.imports.lookup(name, site, diagnostics)
    }
}
