//! Queries answered from cached facts.
//!
//! A query never computes anything itself: it reads VALID facts and reports
//! [`AnalysisError::TemporarilyUnavailable`] for anything else, which makes
//! [`AnalysisDriver::execute`](super::AnalysisDriver::execute) wait for the
//! background driver.

use std::sync::Arc;

use crate::base::SourceId;
use crate::cache::{ELEMENT, PARSE_ERRORS, PARSED_UNIT, RESOLUTION_ERRORS, RESOLVED_UNIT};
use crate::context::AnalysisSession;
use crate::error::{AnalysisError, Result};
use crate::hir::{Diagnostic, LibraryElement, ResolvedUnit};
use crate::syntax::ParsedUnit;

pub trait Query {
    type Output;

    fn run(&self, session: &AnalysisSession) -> Result<Self::Output>;
}

impl<T, F> Query for F
where
    F: Fn(&AnalysisSession) -> Result<T>,
{
    type Output = T;

    fn run(&self, session: &AnalysisSession) -> Result<T> {
        self(session)
    }
}

/// The parse tree of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedUnitQuery(pub SourceId);

impl Query for ParsedUnitQuery {
    type Output = Arc<ParsedUnit>;

    fn run(&self, session: &AnalysisSession) -> Result<Arc<ParsedUnit>> {
        session
            .value(self.0, &PARSED_UNIT)?
            .ok_or_else(|| AnalysisError::contract(format!("{} has no parse tree", self.0)))
    }
}

/// The element model of a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryElementQuery(pub SourceId);

impl Query for LibraryElementQuery {
    type Output = Arc<LibraryElement>;

    fn run(&self, session: &AnalysisSession) -> Result<Arc<LibraryElement>> {
        session
            .value(self.0, &ELEMENT)?
            .ok_or_else(|| AnalysisError::contract(format!("{} has no library element", self.0)))
    }
}

/// A unit resolved in the context of one of its libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedUnitQuery {
    pub source: SourceId,
    pub library: SourceId,
}

impl Query for ResolvedUnitQuery {
    type Output = Arc<ResolvedUnit>;

    fn run(&self, session: &AnalysisSession) -> Result<Arc<ResolvedUnit>> {
        session
            .value_in(self.source, &RESOLVED_UNIT, self.library)?
            .ok_or_else(|| {
                AnalysisError::contract(format!(
                    "{} has no resolved tree in {}",
                    self.source, self.library
                ))
            })
    }
}

/// Every error of a library and its parts, once the library is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryErrorsQuery(pub SourceId);

impl Query for LibraryErrorsQuery {
    type Output = Vec<Diagnostic>;

    fn run(&self, session: &AnalysisSession) -> Result<Vec<Diagnostic>> {
        let element = LibraryElementQuery(self.0).run(session)?;
        let mut errors = Vec::new();
        for unit in element.units() {
            errors.extend(session.value(unit, &PARSE_ERRORS)?.iter().cloned());
            errors.extend(
                session
                    .value_in(unit, &RESOLUTION_ERRORS, self.0)?
                    .iter()
                    .cloned(),
            );
        }
        Ok(errors)
    }
}
