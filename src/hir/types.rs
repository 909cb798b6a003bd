//! Types over the class graph.

use smol_str::SmolStr;

use super::element::ClassId;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// Top of the lattice.
    Dynamic,
    /// Bottom of the lattice.
    Bottom,
    Interface(InterfaceType),
    /// An unbounded type parameter; behaves as `dynamic` in the lattice.
    Parameter(TypeParameterType),
}

/// A class applied to type arguments.
///
/// `arguments` is empty (raw type) or as long as the class's parameter list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceType {
    pub class: ClassId,
    pub arguments: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParameterType {
    pub owner: ClassId,
    pub index: u32,
    pub name: SmolStr,
}

impl Type {
    pub fn interface(class: ClassId) -> Self {
        Type::Interface(InterfaceType::new(class))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic)
    }

    pub fn as_interface(&self) -> Option<&InterfaceType> {
        match self {
            Type::Interface(interface) => Some(interface),
            _ => None,
        }
    }

    /// Replace the type parameters of `owner` by `arguments`.
    ///
    /// Parameters without a matching argument (raw types) become `dynamic`.
    pub fn substitute(&self, owner: ClassId, arguments: &[Type]) -> Type {
        match self {
            Type::Parameter(parameter) if parameter.owner == owner => arguments
                .get(parameter.index as usize)
                .cloned()
                .unwrap_or(Type::Dynamic),
            Type::Interface(interface) => Type::Interface(interface.substitute(owner, arguments)),
            other => other.clone(),
        }
    }
}

impl From<InterfaceType> for Type {
    fn from(interface: InterfaceType) -> Self {
        Type::Interface(interface)
    }
}

impl InterfaceType {
    /// A raw reference to `class`.
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = Type>) -> Self {
        self.arguments = arguments.into_iter().collect();
        self
    }

    pub fn is_raw(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn substitute(&self, owner: ClassId, arguments: &[Type]) -> InterfaceType {
        InterfaceType {
            class: self.class,
            arguments: self
                .arguments
                .iter()
                .map(|argument| argument.substitute(owner, arguments))
                .collect(),
        }
    }
}
