//! Session tests
//!
//! - Invalidation cascades across libraries sharing a part
//! - Adding and removing sources
//! - File-system content with editor overlays

mod tests_file_provider;
mod tests_invalidation;
