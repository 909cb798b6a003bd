//! Namespaces and the import/export descriptions that filter them.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use text_size::TextRange;

use super::element::{Element, is_private_name};
use crate::base::SourceId;
use crate::syntax::{Combinator, NamespaceDirective};

/// An immutable name → element map.
///
/// Cloning shares the underlying table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Namespace {
    definitions: Arc<FxHashMap<SmolStr, Element>>,
}

impl Namespace {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Element)> {
        self.definitions.iter()
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<SmolStr> {
        let mut names: Vec<_> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl From<FxHashMap<SmolStr, Element>> for Namespace {
    fn from(definitions: FxHashMap<SmolStr, Element>) -> Self {
        Self {
            definitions: Arc::new(definitions),
        }
    }
}

/// One `import` (or `export`, which never has a prefix) of a library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDescription {
    pub target: SourceId,
    pub uri: SmolStr,
    pub prefix: Option<SmolStr>,
    pub show: FxHashSet<SmolStr>,
    pub hide: FxHashSet<SmolStr>,
    pub range: TextRange,
}

impl ImportDescription {
    pub fn new(target: SourceId, uri: impl Into<SmolStr>) -> Self {
        Self {
            target,
            uri: uri.into(),
            prefix: None,
            show: FxHashSet::default(),
            hide: FxHashSet::default(),
            range: TextRange::default(),
        }
    }

    pub fn from_directive(target: SourceId, directive: &NamespaceDirective) -> Self {
        let mut description = Self::new(target, directive.target.uri.clone());
        description.prefix = directive.prefix.clone();
        description.range = directive.range;
        for combinator in &directive.combinators {
            match combinator {
                Combinator::Show(names) => description.show.extend(names.iter().cloned()),
                Combinator::Hide(names) => description.hide.extend(names.iter().cloned()),
            }
        }
        description
    }

    pub fn with_prefix(mut self, prefix: impl Into<SmolStr>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_show<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.show.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_hide<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.hide.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether `name` passes this directive's combinators.
    pub fn is_visible(&self, name: &str) -> bool {
        if is_private_name(name) || self.hide.contains(name) {
            return false;
        }
        self.show.is_empty() || self.show.contains(name)
    }
}

/// Builds namespaces from declarations and other namespaces.
pub struct NamespaceBuilder;

impl NamespaceBuilder {
    /// The names a library makes available to importers: its own public
    /// declarations, then re-exported names that pass each export's filter.
    ///
    /// Own declarations win over re-exports; among re-exports the first wins.
    pub fn public_namespace<'a>(
        declarations: impl IntoIterator<Item = &'a Element>,
        exports: impl IntoIterator<Item = (&'a ImportDescription, &'a Namespace)>,
    ) -> Namespace {
        let mut definitions = FxHashMap::default();
        for element in declarations {
            if !element.is_private() {
                definitions
                    .entry(element.name().clone())
                    .or_insert_with(|| element.clone());
            }
        }
        for (export, namespace) in exports {
            for (name, element) in namespace.iter() {
                if export.is_visible(name) {
                    definitions
                        .entry(name.clone())
                        .or_insert_with(|| element.clone());
                }
            }
        }
        Namespace::from(definitions)
    }

    /// The names one import contributes to the importing library's scope.
    ///
    /// Prefixed imports contribute `prefix.name` keys only.
    pub fn import_namespace(import: &ImportDescription, exported: &Namespace) -> Namespace {
        let definitions = exported
            .iter()
            .filter(|(name, _)| import.is_visible(name))
            .map(|(name, element)| {
                let key = match &import.prefix {
                    Some(prefix) => SmolStr::from(format!("{prefix}.{name}")),
                    None => name.clone(),
                };
                (key, element.clone())
            })
            .collect::<FxHashMap<_, _>>();
        Namespace::from(definitions)
    }
}
