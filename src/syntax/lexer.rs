//! Logos-based lexer for the declaration language.
//!
//! Whitespace and `//` line comments are skipped; every other byte sequence
//! becomes a [`Token`]. Unrecognized input is reported as [`TokenKind::Error`]
//! and left for the parser to diagnose.

use logos::Logos;
use text_size::{TextRange, TextSize};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    // Keywords
    #[token("library")]
    LibraryKw,
    #[token("part")]
    PartKw,
    #[token("of")]
    OfKw,
    #[token("import")]
    ImportKw,
    #[token("export")]
    ExportKw,
    #[token("as")]
    AsKw,
    #[token("show")]
    ShowKw,
    #[token("hide")]
    HideKw,
    #[token("class")]
    ClassKw,
    #[token("extends")]
    ExtendsKw,
    #[token("with")]
    WithKw,
    #[token("implements")]
    ImplementsKw,
    #[token("fn")]
    FnKw,
    #[token("var")]
    VarKw,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,
    #[regex(r"'[^'\n]*'")]
    StringLit,

    // Punctuation
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    /// Input the lexer could not classify.
    Error,
    /// Synthetic end-of-input marker appended by [`tokenize`].
    Eof,
}

impl TokenKind {
    /// Human-readable spelling used in "expected ..." messages.
    pub fn display(self) -> &'static str {
        match self {
            Self::LibraryKw => "'library'",
            Self::PartKw => "'part'",
            Self::OfKw => "'of'",
            Self::ImportKw => "'import'",
            Self::ExportKw => "'export'",
            Self::AsKw => "'as'",
            Self::ShowKw => "'show'",
            Self::HideKw => "'hide'",
            Self::ClassKw => "'class'",
            Self::ExtendsKw => "'extends'",
            Self::WithKw => "'with'",
            Self::ImplementsKw => "'implements'",
            Self::FnKw => "'fn'",
            Self::VarKw => "'var'",
            Self::Ident => "an identifier",
            Self::StringLit => "a string literal",
            Self::Semicolon => "';'",
            Self::Comma => "','",
            Self::Dot => "'.'",
            Self::Colon => "':'",
            Self::Eq => "'='",
            Self::Lt => "'<'",
            Self::Gt => "'>'",
            Self::Error => "an invalid token",
            Self::Eof => "end of file",
        }
    }
}

/// A lexed token borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub range: TextRange,
}

/// Lex `text` into tokens, always terminated by a single [`TokenKind::Eof`].
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut lexer = TokenKind::lexer(text);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        tokens.push(Token {
            kind: result.unwrap_or(TokenKind::Error),
            text: lexer.slice(),
            range: TextRange::new(TextSize::new(span.start as u32), TextSize::new(span.end as u32)),
        });
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        text: "",
        range: TextRange::empty(TextSize::of(text)),
    });
    tokens
}
