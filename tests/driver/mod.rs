//! Driver tests
//!
//! - Blocking queries against a building driver
//! - Rescheduling an idle driver after edits

mod tests_blocking_query;
