//! Parse and resolution error reporting.
//!
//! Semantic problems (ambiguous imports, undefined names, ...) are never
//! returned as `Err`: they are recorded as [`Diagnostic`]s on the unit and
//! analysis continues.

use std::sync::Arc;

use text_size::TextRange;

use crate::base::SourceId;
use crate::syntax::SyntaxError;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// A diagnostic message anchored to a range of one source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// The unit containing the offending text.
    pub source: SourceId,
    pub range: TextRange,
    pub severity: Severity,
    /// Error/warning code (e.g., "E0002").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
    pub related: Vec<RelatedInfo>,
}

/// Secondary location attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedInfo {
    pub source: SourceId,
    pub range: TextRange,
    pub message: Arc<str>,
}

impl RelatedInfo {
    pub fn new(source: SourceId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            source,
            range,
            message: message.into(),
        }
    }
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(source: SourceId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::new(source, range, Severity::Error, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(source: SourceId, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::new(source, range, Severity::Warning, message)
    }

    fn new(
        source: SourceId,
        range: TextRange,
        severity: Severity,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            source,
            range,
            severity,
            code: None,
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Lift a parser error into a diagnostic of `source`.
    pub fn from_syntax(source: SourceId, error: &SyntaxError) -> Self {
        Self::error(source, error.range, error.message.clone()).with_code(error.code.as_str())
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add related information.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Standard diagnostic codes for resolution errors.
///
/// ## Error Code Ranges
///
/// - **P0101-P0999**: Syntax errors (see [`crate::syntax::ErrorCode`])
/// - **E0001-E0099**: Resolution errors
/// - **W0001-W0099**: Warnings
pub mod codes {
    // ========================================================================
    // RESOLUTION ERRORS (E0001-E0099)
    // ========================================================================

    /// Name not found in any scope.
    pub const UNDEFINED_NAME: &str = "E0001";
    /// Name imported from two libraries, used in a value or declaration position.
    pub const AMBIGUOUS_IMPORT: &str = "E0002";
    /// Type argument count differs from the class's parameter count.
    pub const WRONG_NUMBER_OF_TYPE_ARGUMENTS: &str = "E0003";
    /// Two top-level declarations share a name.
    pub const DUPLICATE_DEFINITION: &str = "E0004";
    /// Directive URI names no known source.
    pub const URI_DOES_NOT_EXIST: &str = "E0005";
    /// Import or export of a part instead of a library.
    pub const IMPORT_OF_NON_LIBRARY: &str = "E0006";
    /// `part` directive naming a library.
    pub const PART_OF_NON_PART: &str = "E0007";
    /// A class was expected but the name denotes something else.
    pub const NOT_A_TYPE: &str = "E0008";

    // ========================================================================
    // WARNINGS (W0001-W0099)
    // ========================================================================

    /// Name imported from two libraries, used in a type annotation.
    pub const AMBIGUOUS_IMPORT_IN_TYPE: &str = "W0001";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during resolution.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add an undefined name error.
    pub fn undefined_name(&mut self, source: SourceId, range: TextRange, name: &str) {
        self.add(
            Diagnostic::error(source, range, format!("undefined name '{}'", name))
                .with_code(codes::UNDEFINED_NAME),
        );
    }

    /// Add a duplicate definition error.
    pub fn duplicate_definition(
        &mut self,
        source: SourceId,
        range: TextRange,
        name: &str,
        previous: (SourceId, TextRange),
    ) {
        self.add(
            Diagnostic::error(
                source,
                range,
                format!("duplicate definition: '{}' is already defined", name),
            )
            .with_code(codes::DUPLICATE_DEFINITION)
            .with_related(RelatedInfo::new(
                previous.0,
                previous.1,
                format!("previous definition of '{}'", name),
            )),
        );
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostics anchored in one source.
    pub fn diagnostics_for_source(&self, source: SourceId) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.source == source)
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_size::TextSize;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(end))
    }

    #[test]
    fn test_diagnostic_with_code() {
        let diag = Diagnostic::warning(SourceId::new(0), range(0, 3), "careful")
            .with_code(codes::AMBIGUOUS_IMPORT_IN_TYPE);
        assert_eq!(diag.severity, Severity::Warning);
        assert!(diag.has_code("W0001"));
        assert!(!diag.is_error());
    }

    #[test]
    fn test_collector_counts() {
        let mut collector = DiagnosticCollector::new();
        collector.undefined_name(SourceId::new(0), range(0, 1), "x");
        collector.add(Diagnostic::warning(SourceId::new(1), range(2, 3), "w"));
        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.warning_count(), 1);
        assert!(collector.has_errors());
        assert_eq!(collector.diagnostics_for_source(SourceId::new(1)).len(), 1);
    }

    #[test]
    fn test_duplicate_definition_points_at_previous() {
        let mut collector = DiagnosticCollector::new();
        collector.duplicate_definition(SourceId::new(0), range(10, 11), "A", (SourceId::new(2), range(0, 1)));
        let diag = &collector.diagnostics()[0];
        assert_eq!(diag.related.len(), 1);
        assert_eq!(diag.related[0].source, SourceId::new(2));
    }

    #[test]
    fn test_from_syntax_keeps_code() {
        let error = SyntaxError::new("expected ';'", range(4, 5), crate::syntax::ErrorCode::P0201);
        let diag = Diagnostic::from_syntax(SourceId::new(3), &error);
        assert!(diag.has_code("P0201"));
        assert_eq!(diag.source, SourceId::new(3));
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
