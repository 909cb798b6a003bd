//! HIR layer tests
//!
//! - Type lattice properties and the least-upper-bound scenario
//! - Import scopes with show/hide filtering and ambiguous imports
//! - Declaration diagnostics through a live session

mod tests_lattice;
mod tests_scope_resolution;
