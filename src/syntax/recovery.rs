//! Parse contexts and their recovery sets.
//!
//! Each grammar production that can fail pushes a [`ParseContext`] while it
//! runs. On error the parser skips tokens until it reaches one that some
//! production on the context stack declared it must not consume.

use super::lexer::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseContext {
    CompilationUnit,
    /// `library`, `part`, `part of`, `import`, `export`
    Directive,
    /// show/hide name lists
    Combinator,
    ClassDeclaration,
    /// `fn` and `var` declarations
    MemberDeclaration,
    TypeReference,
    TypeArguments,
}

const UNIT_STARTERS: &[TokenKind] = &[
    TokenKind::LibraryKw,
    TokenKind::PartKw,
    TokenKind::ImportKw,
    TokenKind::ExportKw,
    TokenKind::ClassKw,
    TokenKind::FnKw,
    TokenKind::VarKw,
];

/// Tokens each production leaves in place when recovering.
const RECOVERY_TABLE: &[(ParseContext, &[TokenKind])] = &[
    (ParseContext::CompilationUnit, UNIT_STARTERS),
    (ParseContext::Directive, &[TokenKind::Semicolon]),
    (
        ParseContext::Combinator,
        &[TokenKind::ShowKw, TokenKind::HideKw, TokenKind::Semicolon],
    ),
    (
        ParseContext::ClassDeclaration,
        &[
            TokenKind::ExtendsKw,
            TokenKind::WithKw,
            TokenKind::ImplementsKw,
            TokenKind::Semicolon,
        ],
    ),
    (
        ParseContext::MemberDeclaration,
        &[TokenKind::Colon, TokenKind::Eq, TokenKind::Semicolon],
    ),
    (ParseContext::TypeReference, &[TokenKind::Comma]),
    (ParseContext::TypeArguments, &[TokenKind::Comma, TokenKind::Gt]),
];

impl ParseContext {
    /// The "do not consume" set of this production.
    pub fn recovery_tokens(self) -> &'static [TokenKind] {
        RECOVERY_TABLE
            .iter()
            .find(|(context, _)| *context == self)
            .map(|(_, tokens)| *tokens)
            .unwrap_or(&[])
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::CompilationUnit => "at top level",
            Self::Directive => "in directive",
            Self::Combinator => "in combinator",
            Self::ClassDeclaration => "in class declaration",
            Self::MemberDeclaration => "in declaration",
            Self::TypeReference => "in type reference",
            Self::TypeArguments => "in type arguments",
        }
    }

    /// Whether the production ends at a `;` it owns.
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Self::Directive | Self::ClassDeclaration | Self::MemberDeclaration
        )
    }
}

/// Whether `kind` stops recovery for any production on `stack`.
pub fn is_recovery_point(stack: &[ParseContext], kind: TokenKind) -> bool {
    kind == TokenKind::Eof
        || stack
            .iter()
            .any(|context| context.recovery_tokens().contains(&kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_context_has_a_table_row() {
        let all = [
            ParseContext::CompilationUnit,
            ParseContext::Directive,
            ParseContext::Combinator,
            ParseContext::ClassDeclaration,
            ParseContext::MemberDeclaration,
            ParseContext::TypeReference,
            ParseContext::TypeArguments,
        ];
        for context in all {
            assert!(
                !context.recovery_tokens().is_empty(),
                "{:?} has no recovery tokens",
                context
            );
        }
    }

    #[test]
    fn test_recovery_point_uses_whole_stack() {
        let stack = [ParseContext::CompilationUnit, ParseContext::TypeArguments];
        assert!(is_recovery_point(&stack, TokenKind::Gt));
        assert!(is_recovery_point(&stack, TokenKind::ClassKw));
        assert!(!is_recovery_point(&stack, TokenKind::Semicolon));
        assert!(is_recovery_point(&stack, TokenKind::Eof));
    }
}
