//! Parse tree of one compilation unit.
//!
//! The tree is deliberately flat: directives and top-level declarations with
//! enough structure (names, type references, combinators) for namespace
//! building and declaration resolution. Nodes are plain data; consumers match
//! on the variant enums exhaustively.

use smol_str::SmolStr;
use text_size::TextRange;

/// Whether a unit defines a library or is a part of one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceKind {
    /// Not yet determined.
    #[default]
    Unknown,
    Library,
    Part,
}

/// The PARSED_UNIT fact of a source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedUnit {
    pub directives: Vec<Directive>,
    pub declarations: Vec<Declaration>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// `library a.b;`
    Library { name: SmolStr, range: TextRange },
    /// `part of a.b;`
    PartOf { library: SmolStr, range: TextRange },
    /// `part 'uri';`
    Part(UriReference),
    Import(NamespaceDirective),
    Export(NamespaceDirective),
}

/// A quoted URI with its range (quotes excluded from `uri`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UriReference {
    pub uri: SmolStr,
    pub range: TextRange,
}

/// An `import` or `export` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceDirective {
    pub target: UriReference,
    /// `as p`; always `None` for exports.
    pub prefix: Option<SmolStr>,
    pub combinators: Vec<Combinator>,
    pub range: TextRange,
}

/// A show/hide filter on an import or export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Combinator {
    Show(Vec<SmolStr>),
    Hide(Vec<SmolStr>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub kind: DeclarationKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    Class {
        type_parameters: Vec<SmolStr>,
        extends: Option<TypeRef>,
        mixins: Vec<TypeRef>,
        implements: Vec<TypeRef>,
    },
    Function {
        return_type: Option<TypeRef>,
    },
    Variable {
        declared_type: Option<TypeRef>,
        initializer: Option<NameRef>,
    },
}

/// `p.Name<Args>` in a type-annotation position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub name: NameRef,
    pub arguments: Vec<TypeRef>,
    pub range: TextRange,
}

/// A possibly prefixed simple name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameRef {
    pub prefix: Option<SmolStr>,
    pub name: SmolStr,
    pub range: TextRange,
}

impl NameRef {
    /// Key under which this name is looked up in an import scope.
    pub fn lookup_key(&self) -> SmolStr {
        match &self.prefix {
            Some(prefix) => SmolStr::from(format!("{prefix}.{}", self.name)),
            None => self.name.clone(),
        }
    }
}

impl ParsedUnit {
    /// `Part` iff the unit has a `part of` directive and no `library` directive.
    pub fn source_kind(&self) -> SourceKind {
        let mut has_library = false;
        let mut has_part_of = false;
        for directive in &self.directives {
            match directive {
                Directive::Library { .. } => has_library = true,
                Directive::PartOf { .. } => has_part_of = true,
                _ => {}
            }
        }
        if has_part_of && !has_library {
            SourceKind::Part
        } else {
            SourceKind::Library
        }
    }

    pub fn library_name(&self) -> Option<&SmolStr> {
        self.directives.iter().find_map(|d| match d {
            Directive::Library { name, .. } => Some(name),
            _ => None,
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &NamespaceDirective> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Import(import) => Some(import),
            _ => None,
        })
    }

    pub fn exports(&self) -> impl Iterator<Item = &NamespaceDirective> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Export(export) => Some(export),
            _ => None,
        })
    }

    pub fn parts(&self) -> impl Iterator<Item = &UriReference> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Part(part) => Some(part),
            _ => None,
        })
    }
}
