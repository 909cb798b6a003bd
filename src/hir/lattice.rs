//! The nominal type lattice.
//!
//! [`TypeSystem`] answers subtype, "more specific than" and least-upper-bound
//! questions over any [`ClassGraph`]. Every walk carries a visited set or a
//! cycle guard, so malformed (cyclic) hierarchies terminate with a negative
//! answer instead of looping.

use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use rustc_hash::{FxHashMap, FxHashSet};

use super::element::{ClassElement, ClassId, LibraryElement};
use super::types::{InterfaceType, Type};
use crate::base::SourceId;

// ============================================================================
// CLASS GRAPHS
// ============================================================================

/// Read access to class declarations by id.
pub trait ClassGraph {
    fn class(&self, id: ClassId) -> Option<&ClassElement>;
}

/// A free-standing class graph, built class by class.
#[derive(Clone, Debug, Default)]
pub struct ClassHierarchy {
    classes: FxHashMap<ClassId, ClassElement>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a class, returning its id.
    pub fn insert(&mut self, class: ClassElement) -> ClassId {
        let id = class.id;
        self.classes.insert(id, class);
        id
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassGraph for ClassHierarchy {
    fn class(&self, id: ClassId) -> Option<&ClassElement> {
        self.classes.get(&id)
    }
}

/// The class graph spanned by a set of resolved libraries.
#[derive(Clone, Debug, Default)]
pub struct LibraryGraph {
    libraries: FxHashMap<SourceId, Arc<LibraryElement>>,
}

impl LibraryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, library: Arc<LibraryElement>) {
        self.libraries.insert(library.source, library);
    }

    pub fn library(&self, source: SourceId) -> Option<&Arc<LibraryElement>> {
        self.libraries.get(&source)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

impl FromIterator<Arc<LibraryElement>> for LibraryGraph {
    fn from_iter<I: IntoIterator<Item = Arc<LibraryElement>>>(iter: I) -> Self {
        let mut graph = Self::new();
        for library in iter {
            graph.insert(library);
        }
        graph
    }
}

impl ClassGraph for LibraryGraph {
    fn class(&self, id: ClassId) -> Option<&ClassElement> {
        self.libraries.get(&id.library)?.class(id)
    }
}

// ============================================================================
// TYPE SYSTEM
// ============================================================================

/// Lattice operations over one class graph.
pub struct TypeSystem<'g, G: ClassGraph + ?Sized> {
    graph: &'g G,
}

impl<'g, G: ClassGraph + ?Sized> TypeSystem<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    /// True iff `i` is `j`'s declared supertype, one of its interfaces, or one
    /// of its mixins. Compares classes only, not type arguments.
    pub fn is_direct_supertype(&self, i: &InterfaceType, j: &InterfaceType) -> bool {
        self.graph.class(j.class).is_some_and(|class| {
            class
                .direct_supertypes()
                .any(|supertype| supertype.class == i.class)
        })
    }

    /// `t <: s`.
    pub fn is_subtype_of(&self, t: &Type, s: &Type) -> bool {
        match (t, s) {
            (_, Type::Dynamic) | (Type::Dynamic | Type::Bottom, _) => true,
            (Type::Parameter(_), _) | (_, Type::Parameter(_)) => true,
            (Type::Interface(_), Type::Bottom) => false,
            (Type::Interface(t), Type::Interface(s)) => {
                let t = self.normalize(t);
                let s = self.normalize(s);
                t == s || self.interface_subtype(&t, &s, &mut FxHashSet::default())
            }
        }
    }

    fn interface_subtype(
        &self,
        t: &InterfaceType,
        s: &InterfaceType,
        visited: &mut FxHashSet<ClassId>,
    ) -> bool {
        if !visited.insert(t.class) {
            return false;
        }
        if t == s {
            return true;
        }
        if t.class == s.class {
            return t.arguments.len() == s.arguments.len()
                && t
                    .arguments
                    .iter()
                    .zip(&s.arguments)
                    .all(|(a, b)| self.is_subtype_of(a, b));
        }
        let Some(class) = self.graph.class(t.class) else {
            return false;
        };
        class.direct_supertypes().any(|declared| {
            let supertype = self.instantiate(class, t, declared);
            self.interface_subtype(&supertype, s, visited)
        })
    }

    /// `t << s`: reflexive, direct-supertype, covariant in arguments and
    /// transitive. Unlike subtyping, `dynamic` is more specific only than
    /// itself and the direct-supertype step ignores type arguments.
    pub fn is_more_specific_than(&self, t: &Type, s: &Type) -> bool {
        match (t, s) {
            (_, Type::Dynamic) | (Type::Bottom, _) => true,
            (Type::Parameter(a), Type::Parameter(b)) => a == b,
            (Type::Interface(t), Type::Interface(s)) => {
                let t = self.normalize(t);
                let s = self.normalize(s);
                self.interface_more_specific(&t, &s, &mut FxHashSet::default())
            }
            _ => false,
        }
    }

    fn interface_more_specific(
        &self,
        t: &InterfaceType,
        s: &InterfaceType,
        visited: &mut FxHashSet<ClassId>,
    ) -> bool {
        if t == s || self.is_direct_supertype(s, t) {
            return true;
        }
        if t.class == s.class {
            return t.arguments.len() == s.arguments.len()
                && t
                    .arguments
                    .iter()
                    .zip(&s.arguments)
                    .all(|(a, b)| self.is_more_specific_than(a, b));
        }
        if !visited.insert(t.class) {
            return false;
        }
        let Some(class) = self.graph.class(t.class) else {
            return false;
        };
        class.direct_supertypes().any(|declared| {
            let supertype = self.instantiate(class, t, declared);
            self.interface_more_specific(&supertype, s, visited)
        })
    }

    /// Least upper bound (join) of two types.
    ///
    /// `None` means the graph has no unique answer, e.g. two unrelated
    /// roots or a cyclic hierarchy.
    pub fn least_upper_bound(&self, t: &Type, s: &Type) -> Option<Type> {
        match (t, s) {
            (Type::Dynamic, _) | (_, Type::Dynamic) => Some(Type::Dynamic),
            (Type::Bottom, other) | (other, Type::Bottom) => Some(other.clone()),
            (Type::Parameter(a), Type::Parameter(b)) if a == b => Some(t.clone()),
            (Type::Interface(i), Type::Interface(j)) => {
                self.interface_least_upper_bound(i, j).map(Type::Interface)
            }
            _ => Some(Type::Dynamic),
        }
    }

    fn interface_least_upper_bound(
        &self,
        i: &InterfaceType,
        j: &InterfaceType,
    ) -> Option<InterfaceType> {
        let i = self.normalize(i);
        let j = self.normalize(j);
        if i == j {
            return Some(i);
        }

        let si = self.superinterface_set(&i);
        let sj = self.superinterface_set(&j);
        let candidates: Vec<InterfaceType> = si
            .iter()
            .filter_map(|(class, a)| sj.get(class).map(|b| merge_instantiations(a, b)))
            .collect();

        let mut memo = FxHashMap::default();
        let depths: Vec<u32> = candidates
            .iter()
            .map(|candidate| self.depth(candidate.class, &mut memo, &mut FxHashSet::default()))
            .collect();

        let max_depth = depths.iter().copied().max()?;
        for depth in (0..=max_depth).rev() {
            let mut at_depth = candidates
                .iter()
                .zip(&depths)
                .filter(|(_, d)| **d == depth)
                .map(|(candidate, _)| candidate);
            if let (Some(unique), None) = (at_depth.next(), at_depth.next()) {
                return Some(unique.clone());
            }
        }

        tracing::warn!(
            left = %i.class,
            right = %j.class,
            "no unique least upper bound; class graph is not properly rooted"
        );
        None
    }

    /// `t` together with all its superinterfaces (interfaces and supertypes,
    /// not mixins), one instantiation per class.
    ///
    /// A class reached with different type arguments keeps the arguments the
    /// instantiations agree on and `dynamic` elsewhere.
    pub fn superinterface_set(&self, t: &InterfaceType) -> IndexMap<ClassId, InterfaceType> {
        let mut set = IndexMap::new();
        let t = self.normalize(t);
        if let Some(merged) = merge_into(&mut set, t) {
            self.collect_superinterfaces(&merged, &mut set);
        }
        set
    }

    fn collect_superinterfaces(
        &self,
        t: &InterfaceType,
        set: &mut IndexMap<ClassId, InterfaceType>,
    ) {
        let Some(class) = self.graph.class(t.class) else {
            return;
        };
        for declared in class.interfaces.iter().chain(class.supertype.iter()) {
            let supertype = self.instantiate(class, t, declared);
            // Arguments only ever widen to `dynamic`, so this terminates on cycles.
            if let Some(merged) = merge_into(set, supertype) {
                self.collect_superinterfaces(&merged, set);
            }
        }
    }

    /// Length of the longest inheritance path from `class` to a root, over
    /// interfaces and supertype. Roots have depth 0.
    pub fn inheritance_depth(&self, class: ClassId) -> u32 {
        self.depth(class, &mut FxHashMap::default(), &mut FxHashSet::default())
    }

    fn depth(
        &self,
        id: ClassId,
        memo: &mut FxHashMap<ClassId, u32>,
        on_stack: &mut FxHashSet<ClassId>,
    ) -> u32 {
        if let Some(&depth) = memo.get(&id) {
            return depth;
        }
        let Some(class) = self.graph.class(id) else {
            return 0;
        };
        let Some(supertype) = &class.supertype else {
            memo.insert(id, 0);
            return 0;
        };
        if !on_stack.insert(id) {
            return 0;
        }
        let mut longest = 1 + self.depth(supertype.class, memo, on_stack);
        for interface in &class.interfaces {
            longest = longest.max(1 + self.depth(interface.class, memo, on_stack));
        }
        on_stack.remove(&id);
        memo.insert(id, longest);
        longest
    }

    /// Human-readable form of a type, using class names from the graph.
    pub fn display(&self, t: &Type) -> String {
        match t {
            Type::Dynamic => "dynamic".to_string(),
            Type::Bottom => "bottom".to_string(),
            Type::Parameter(parameter) => parameter.name.to_string(),
            Type::Interface(interface) => {
                let mut out = match self.graph.class(interface.class) {
                    Some(class) => class.name.to_string(),
                    None => interface.class.to_string(),
                };
                if !interface.arguments.is_empty() {
                    let arguments: Vec<String> =
                        interface.arguments.iter().map(|a| self.display(a)).collect();
                    out.push('<');
                    out.push_str(&arguments.join(", "));
                    out.push('>');
                }
                out
            }
        }
    }

    /// Raw references to generic classes mean "all arguments dynamic".
    fn normalize(&self, t: &InterfaceType) -> InterfaceType {
        match self.graph.class(t.class) {
            Some(class) if t.is_raw() && class.arity() > 0 => InterfaceType {
                class: t.class,
                arguments: vec![Type::Dynamic; class.arity()],
            },
            _ => t.clone(),
        }
    }

    /// A declared supertype of `class` as seen from the instantiation `t`.
    fn instantiate(
        &self,
        class: &ClassElement,
        t: &InterfaceType,
        declared: &InterfaceType,
    ) -> InterfaceType {
        self.normalize(&declared.substitute(class.id, &t.arguments))
    }
}

/// Per-argument join without recursion: equal arguments are kept, differing
/// ones become `dynamic`.
fn merge_instantiations(a: &InterfaceType, b: &InterfaceType) -> InterfaceType {
    if a == b {
        return a.clone();
    }
    let arguments = if a.arguments.len() == b.arguments.len() {
        a.arguments
            .iter()
            .zip(&b.arguments)
            .map(|(x, y)| if x == y { x.clone() } else { Type::Dynamic })
            .collect()
    } else {
        vec![Type::Dynamic; a.arguments.len().max(b.arguments.len())]
    };
    InterfaceType {
        class: a.class,
        arguments,
    }
}

/// Insert or merge `t`; returns the stored instantiation if it changed.
fn merge_into(
    set: &mut IndexMap<ClassId, InterfaceType>,
    t: InterfaceType,
) -> Option<InterfaceType> {
    match set.entry(t.class) {
        Entry::Vacant(entry) => Some(entry.insert(t).clone()),
        Entry::Occupied(mut entry) => {
            let merged = merge_instantiations(entry.get(), &t);
            if merged == *entry.get() {
                None
            } else {
                entry.insert(merged.clone());
                Some(merged)
            }
        }
    }
}
