//! Reference front-end: lexer, parser and parse tree.
//!
//! The cache treats parsing as an external collaborator (see
//! [`crate::context::SourceParser`]); this module is the default
//! implementation, small enough to drive every cached fact in tests.

pub mod ast;
mod error;
mod lexer;
mod parser;
mod recovery;

pub use ast::{
    Combinator, Declaration, DeclarationKind, Directive, NameRef, NamespaceDirective, ParsedUnit,
    SourceKind, TypeRef, UriReference,
};
pub use error::{ErrorCode, SyntaxError};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{Parse, parse};
pub use recovery::ParseContext;
