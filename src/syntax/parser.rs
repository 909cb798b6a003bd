//! Recursive-descent parser for the declaration language.
//!
//! ## Error handling
//!
//! Only the first error at a position past the last reported one is kept, so a
//! single bad token does not cascade into a wall of diagnostics. Recovery is
//! table driven: see [`super::recovery`].

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::ast::{
    Combinator, Declaration, DeclarationKind, Directive, NameRef, NamespaceDirective, ParsedUnit,
    TypeRef, UriReference,
};
use super::error::{ErrorCode, SyntaxError};
use super::lexer::{Token, TokenKind, tokenize};
use super::recovery::{ParseContext, is_recovery_point};
use crate::base::LineInfo;

/// Everything the front-end derives from one text: LINE_INFO, PARSED_UNIT and
/// PARSE_ERRORS.
#[derive(Clone, Debug)]
pub struct Parse {
    pub line_info: LineInfo,
    pub unit: ParsedUnit,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse a complete compilation unit.
pub fn parse(text: &str) -> Parse {
    let mut parser = Parser::new(tokenize(text));
    let unit = parser.parse_unit();
    tracing::trace!(
        directives = unit.directives.len(),
        declarations = unit.declarations.len(),
        errors = parser.errors.len(),
        "parsed unit"
    );
    Parse {
        line_info: LineInfo::new(text),
        unit,
        errors: parser.errors,
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    contexts: Vec<ParseContext>,
    errors: Vec<SyntaxError>,
    last_error_at: Option<TextSize>,
    /// End of the last consumed token.
    last_end: TextSize,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            pos: 0,
            contexts: Vec::new(),
            errors: Vec::new(),
            last_error_at: None,
            last_end: TextSize::new(0),
        }
    }

    // =========================================================================
    // Token access
    // =========================================================================

    fn current(&self) -> Token<'a> {
        // `tokenize` always ends with Eof, and `bump` never moves past it.
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn bump(&mut self) -> Token<'a> {
        let token = self.current();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
            self.last_end = token.range.end();
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'a>> {
        if self.at(kind) { Some(self.bump()) } else { None }
    }

    fn expect(&mut self, kind: TokenKind, code: ErrorCode) -> Option<Token<'a>> {
        let token = self.eat(kind);
        if token.is_none() {
            self.error_expected(kind.display(), code);
        }
        token
    }

    fn expect_ident(&mut self) -> Option<Token<'a>> {
        self.expect(TokenKind::Ident, ErrorCode::P0301)
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error_expected(&mut self, what: &str, code: ErrorCode) {
        let found = self.current();
        let message = match self.contexts.last() {
            Some(context) => format!(
                "expected {what} {}, found {}",
                context.description(),
                found.kind.display()
            ),
            None => format!("expected {what}, found {}", found.kind.display()),
        };
        self.report(SyntaxError::new(message, found.range, code));
    }

    fn report(&mut self, error: SyntaxError) {
        let offset = error.range.start();
        if let Some(last) = self.last_error_at
            && offset <= last
        {
            tracing::trace!(offset = u32::from(offset), message = %error.message, "suppressed cascading syntax error");
            return;
        }
        self.last_error_at = Some(offset);
        self.errors.push(error);
    }

    /// Skip tokens up to the next recovery point of the context stack.
    fn recover(&mut self) {
        while !is_recovery_point(&self.contexts, self.current().kind) {
            self.bump();
        }
    }

    /// Run a production inside `context`, recovering if it fails.
    fn in_context<T>(
        &mut self,
        context: ParseContext,
        production: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        self.contexts.push(context);
        let result = production(self);
        if result.is_none() {
            self.recover();
            if context.is_statement() {
                self.eat(TokenKind::Semicolon);
            }
        }
        self.contexts.pop();
        result
    }

    /// Consume the `;` ending a statement, returning the statement's end.
    fn terminate(&mut self) -> TextSize {
        if self.eat(TokenKind::Semicolon).is_none() {
            self.error_expected("';'", ErrorCode::P0201);
            self.recover();
            self.eat(TokenKind::Semicolon);
        }
        self.last_end
    }

    // =========================================================================
    // Grammar rules
    // =========================================================================

    /// Unit = (Directive | Declaration)*
    fn parse_unit(&mut self) -> ParsedUnit {
        let mut unit = ParsedUnit::default();
        self.contexts.push(ParseContext::CompilationUnit);

        while !self.at(TokenKind::Eof) {
            let before = self.pos;
            match self.current().kind {
                TokenKind::LibraryKw => unit.directives.extend(self.library_directive()),
                TokenKind::PartKw => unit.directives.extend(self.part_directive()),
                TokenKind::ImportKw | TokenKind::ExportKw => {
                    unit.directives.extend(self.namespace_directive())
                }
                TokenKind::ClassKw => unit.declarations.extend(self.class_declaration()),
                TokenKind::FnKw => unit.declarations.extend(self.function_declaration()),
                TokenKind::VarKw => unit.declarations.extend(self.variable_declaration()),
                TokenKind::Error => {
                    let token = self.bump();
                    self.report(SyntaxError::new(
                        format!("unrecognized input '{}'", token.text),
                        token.range,
                        ErrorCode::P0101,
                    ));
                }
                _ => {
                    self.error_expected("a directive or declaration", ErrorCode::P0303);
                    self.bump();
                    self.recover();
                }
            }
            if self.pos == before {
                self.bump();
            }
        }

        self.contexts.pop();
        unit
    }

    /// `library a.b;`
    fn library_directive(&mut self) -> Option<Directive> {
        let start = self.bump().range.start();
        self.in_context(ParseContext::Directive, |p| {
            let name = p.dotted_name()?;
            let end = p.terminate();
            Some(Directive::Library {
                name,
                range: TextRange::new(start, end),
            })
        })
    }

    /// `part 'uri';` or `part of a.b;`
    fn part_directive(&mut self) -> Option<Directive> {
        let start = self.bump().range.start();
        self.in_context(ParseContext::Directive, |p| {
            if p.eat(TokenKind::OfKw).is_some() {
                let library = p.dotted_name()?;
                let end = p.terminate();
                return Some(Directive::PartOf {
                    library,
                    range: TextRange::new(start, end),
                });
            }
            let target = p.uri()?;
            p.terminate();
            Some(Directive::Part(target))
        })
    }

    /// `import 'uri' (as p)? Combinator* ;` and `export 'uri' Combinator* ;`
    fn namespace_directive(&mut self) -> Option<Directive> {
        let keyword = self.bump();
        let is_import = keyword.kind == TokenKind::ImportKw;
        self.in_context(ParseContext::Directive, |p| {
            let target = p.uri()?;
            let mut prefix = None;
            if let Some(as_token) = p.eat(TokenKind::AsKw) {
                let name = p.expect_ident()?;
                if is_import {
                    prefix = Some(SmolStr::from(name.text));
                } else {
                    p.report(SyntaxError::new(
                        "an export cannot have a prefix",
                        TextRange::new(as_token.range.start(), name.range.end()),
                        ErrorCode::P0304,
                    ));
                }
            }
            let combinators = p.combinators();
            let end = p.terminate();
            let directive = NamespaceDirective {
                target,
                prefix,
                combinators,
                range: TextRange::new(keyword.range.start(), end),
            };
            Some(if is_import {
                Directive::Import(directive)
            } else {
                Directive::Export(directive)
            })
        })
    }

    fn combinators(&mut self) -> Vec<Combinator> {
        let mut combinators = Vec::new();
        while self.at(TokenKind::ShowKw) || self.at(TokenKind::HideKw) {
            let show = self.bump().kind == TokenKind::ShowKw;
            let names = self.identifier_list();
            combinators.push(if show {
                Combinator::Show(names)
            } else {
                Combinator::Hide(names)
            });
        }
        combinators
    }

    /// `a, b, c`; keeps whatever names parsed before an error.
    fn identifier_list(&mut self) -> Vec<SmolStr> {
        self.contexts.push(ParseContext::Combinator);
        let mut names = Vec::new();
        loop {
            match self.expect_ident() {
                Some(token) => names.push(SmolStr::from(token.text)),
                None => self.recover(),
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.contexts.pop();
        names
    }

    fn uri(&mut self) -> Option<UriReference> {
        let token = self.expect(TokenKind::StringLit, ErrorCode::P0302)?;
        // The lexer guarantees surrounding quotes.
        let uri = &token.text[1..token.text.len() - 1];
        Some(UriReference {
            uri: SmolStr::from(uri),
            range: token.range,
        })
    }

    fn dotted_name(&mut self) -> Option<SmolStr> {
        let mut name = String::from(self.expect_ident()?.text);
        while self.eat(TokenKind::Dot).is_some() {
            name.push('.');
            name.push_str(self.expect_ident()?.text);
        }
        Some(SmolStr::from(name))
    }

    /// `class N<T>? (extends R)? (with R, ..)? (implements R, ..)? ;`
    fn class_declaration(&mut self) -> Option<Declaration> {
        self.bump();
        self.in_context(ParseContext::ClassDeclaration, |p| {
            let name = p.expect_ident()?;
            let type_parameters = if p.at(TokenKind::Lt) {
                p.type_parameters()
            } else {
                Vec::new()
            };
            let extends = match p.eat(TokenKind::ExtendsKw) {
                Some(_) => p.type_ref(),
                None => None,
            };
            let mixins = match p.eat(TokenKind::WithKw) {
                Some(_) => p.type_ref_list(),
                None => Vec::new(),
            };
            let implements = match p.eat(TokenKind::ImplementsKw) {
                Some(_) => p.type_ref_list(),
                None => Vec::new(),
            };
            p.terminate();
            Some(Declaration {
                name: SmolStr::from(name.text),
                name_range: name.range,
                kind: DeclarationKind::Class {
                    type_parameters,
                    extends,
                    mixins,
                    implements,
                },
            })
        })
    }

    fn type_parameters(&mut self) -> Vec<SmolStr> {
        self.bump();
        self.contexts.push(ParseContext::TypeArguments);
        let mut names = Vec::new();
        loop {
            match self.expect_ident() {
                Some(token) => names.push(SmolStr::from(token.text)),
                None => self.recover(),
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.close_angle();
        self.contexts.pop();
        names
    }

    fn close_angle(&mut self) {
        if self.eat(TokenKind::Gt).is_none() {
            self.error_expected("'>'", ErrorCode::P0202);
            self.recover();
            self.eat(TokenKind::Gt);
        }
    }

    /// `fn name (: R)? ;`
    fn function_declaration(&mut self) -> Option<Declaration> {
        self.bump();
        self.in_context(ParseContext::MemberDeclaration, |p| {
            let name = p.expect_ident()?;
            let return_type = match p.eat(TokenKind::Colon) {
                Some(_) => p.type_ref(),
                None => None,
            };
            p.terminate();
            Some(Declaration {
                name: SmolStr::from(name.text),
                name_range: name.range,
                kind: DeclarationKind::Function { return_type },
            })
        })
    }

    /// `var name (: R)? (= p.name)? ;`
    fn variable_declaration(&mut self) -> Option<Declaration> {
        self.bump();
        self.in_context(ParseContext::MemberDeclaration, |p| {
            let name = p.expect_ident()?;
            let declared_type = match p.eat(TokenKind::Colon) {
                Some(_) => p.type_ref(),
                None => None,
            };
            let initializer = match p.eat(TokenKind::Eq) {
                Some(_) => p.name_ref(),
                None => None,
            };
            p.terminate();
            Some(Declaration {
                name: SmolStr::from(name.text),
                name_range: name.range,
                kind: DeclarationKind::Variable {
                    declared_type,
                    initializer,
                },
            })
        })
    }

    // =========================================================================
    // Type references
    // =========================================================================

    fn type_ref(&mut self) -> Option<TypeRef> {
        self.in_context(ParseContext::TypeReference, |p| {
            let name = p.name_ref()?;
            let start = name.range.start();
            let arguments = if p.at(TokenKind::Lt) {
                p.type_arguments()
            } else {
                Vec::new()
            };
            Some(TypeRef {
                name,
                arguments,
                range: TextRange::new(start, p.last_end),
            })
        })
    }

    fn type_arguments(&mut self) -> Vec<TypeRef> {
        self.bump();
        self.contexts.push(ParseContext::TypeArguments);
        let mut arguments = Vec::new();
        loop {
            arguments.extend(self.type_ref());
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.close_angle();
        self.contexts.pop();
        arguments
    }

    fn type_ref_list(&mut self) -> Vec<TypeRef> {
        let mut refs = Vec::new();
        loop {
            refs.extend(self.type_ref());
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        refs
    }

    fn name_ref(&mut self) -> Option<NameRef> {
        let first = self.expect_ident()?;
        if self.eat(TokenKind::Dot).is_some() {
            let second = self.expect_ident()?;
            return Some(NameRef {
                prefix: Some(SmolStr::from(first.text)),
                name: SmolStr::from(second.text),
                range: TextRange::new(first.range.start(), second.range.end()),
            });
        }
        Some(NameRef {
            prefix: None,
            name: SmolStr::from(first.text),
            range: first.range,
        })
    }
}
