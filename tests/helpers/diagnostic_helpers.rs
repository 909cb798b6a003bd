//! Diagnostic assertion helpers.

use tessera::hir::{Diagnostic, Severity};

/// The codes of `diagnostics`, in order.
pub fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .filter_map(|d| d.code.as_deref())
        .collect()
}

/// Asserts exactly one diagnostic carries `code` and returns it.
pub fn assert_single_code<'d>(diagnostics: &'d [Diagnostic], code: &str) -> &'d Diagnostic {
    let matching: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.has_code(code)).collect();
    assert_eq!(
        matching.len(),
        1,
        "expected one {} diagnostic, got {:?}",
        code,
        diagnostics
    );
    matching[0]
}

pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<&Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}
