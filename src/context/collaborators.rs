//! Pluggable front-end and resolver.

use crate::base::SourceId;
use crate::error::Result;
use crate::hir::{LibraryResolution, ResolveOptions, UnitSource, resolve_library};
use crate::syntax::{Parse, parse};

/// Turns source text into LINE_INFO, PARSED_UNIT and PARSE_ERRORS.
pub trait SourceParser: Send + Sync {
    fn parse(&self, source: SourceId, text: &str) -> Parse;
}

/// Builds the element model of a library from its units.
pub trait LibraryResolver: Send + Sync {
    fn resolve(
        &self,
        units: &dyn UnitSource,
        library: SourceId,
        options: &ResolveOptions,
    ) -> Result<LibraryResolution>;
}

/// The reference front-end.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParser;

impl SourceParser for DefaultParser {
    fn parse(&self, _source: SourceId, text: &str) -> Parse {
        parse(text)
    }
}

/// Declaration resolution from [`crate::hir`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResolver;

impl LibraryResolver for DefaultResolver {
    fn resolve(
        &self,
        units: &dyn UnitSource,
        library: SourceId,
        options: &ResolveOptions,
    ) -> Result<LibraryResolution> {
        resolve_library(units, library, options)
    }
}
