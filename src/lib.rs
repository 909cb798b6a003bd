//! # tessera-base
//!
//! Incremental analysis engine for library-structured languages: a per-source
//! fact cache with explicit validity states, import scopes with show/hide
//! filtering and ambiguity detection, and a nominal type lattice.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! driver    → background AnalysisDriver, blocking execute(query)
//!   ↓
//! context   → AnalysisSession, content providers, invalidation
//!   ↓
//! cache     → CacheState, descriptors, SourceEntry, ResolutionChain
//!   ↓
//! hir       → elements, types, lattice, namespaces, scopes, resolver
//!   ↓
//! syntax    → logos lexer, recursive-descent parser, ParsedUnit
//!   ↓
//! base      → SourceId, SourceRegistry, LineInfo, TextRange
//! ```
//!
//! `config` and `error` are used by every layer above `base`.

// ============================================================================
// MODULES (dependency order: base → syntax → hir → cache → context → driver)
// ============================================================================

/// Foundation types: SourceId, URI interning, line index
pub mod base;

/// Reference front-end: lexer, parser, parse trees
pub mod syntax;

/// Semantic model: elements, types, namespaces, declaration resolution
pub mod hir;

/// Cache entries and their validity states
pub mod cache;

/// The analysis session and everything that feeds it
pub mod context;

/// Background analysis and blocking queries
pub mod driver;

/// Analysis options
pub mod config;

/// Error taxonomy
pub mod error;

// Re-export foundation types
pub use base::{LineCol, LineInfo, SourceId, SourceRegistry, TextRange, TextSize};

pub use cache::{CacheState, SourceEntry};
pub use config::{AnalysisOptions, RetryPolicy};
pub use context::{AnalysisSession, ChangeNotice, ChangeSet};
pub use driver::{AnalysisDriver, DriverStatus, Query};
pub use error::{AnalysisError, Result};
