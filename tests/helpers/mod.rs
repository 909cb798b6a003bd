//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub mod diagnostic_helpers;
pub mod session_helpers;
pub mod source_fixtures;
