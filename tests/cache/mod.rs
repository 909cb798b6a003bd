//! Cache layer tests
//!
//! - State machine of every descriptor through the untyped access path
//! - Value and default semantics of typed descriptors
//! - Library-scoped resolution state

mod tests_entry_states;
mod tests_resolution_chain;
