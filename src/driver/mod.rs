//! Background analysis and blocking queries.
//!
//! ```text
//! execute(query) ──► query.run(session) ──► VALID ──► Ok
//!        │                   │
//!        │                   └─► TemporarilyUnavailable ──► schedule() ──► wait on session
//!        ▼                                                     │
//!   AnalysisDriver worker ◄────────────────────────────────────┘
//!        └─► perform_analysis_task() until idle ──► session.notify()
//! ```

mod query;
mod retry;
mod worker;

pub use query::{LibraryElementQuery, LibraryErrorsQuery, ParsedUnitQuery, Query, ResolvedUnitQuery};
pub use retry::RetryTimer;
pub use worker::{AnalysisDriver, DriverStatus};
