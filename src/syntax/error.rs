//! Syntax errors reported by the parser.

use std::fmt;
use std::sync::Arc;

use text_size::TextRange;

/// Categorized parse error codes.
///
/// - P01xx: lexical errors
/// - P02xx: structural errors (missing terminators, delimiters)
/// - P03xx: declaration and directive errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Character sequence the lexer does not recognize
    P0101,
    /// Missing `;`
    P0201,
    /// Unclosed type argument list
    P0202,
    /// Missing identifier
    P0301,
    /// Missing URI string
    P0302,
    /// Token that cannot start a directive or declaration
    P0303,
    /// `as` prefix on an export
    P0304,
    /// Any other expected token
    P0900,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P0101 => "P0101",
            Self::P0201 => "P0201",
            Self::P0202 => "P0202",
            Self::P0301 => "P0301",
            Self::P0302 => "P0302",
            Self::P0303 => "P0303",
            Self::P0304 => "P0304",
            Self::P0900 => "P0900",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A syntax error with its location in the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: Arc<str>,
    pub range: TextRange,
    pub code: ErrorCode,
}

impl SyntaxError {
    pub fn new(message: impl Into<Arc<str>>, range: TextRange, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            range,
            code,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}..{}",
            self.code,
            self.message,
            u32::from(self.range.start()),
            u32::from(self.range.end())
        )
    }
}
