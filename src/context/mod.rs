//! The analysis context: sources, their cache entries, and the work that
//! fills them.
//!
//! ```text
//! ContentProvider ──► AnalysisSession ◄── ChangeSet
//!                         │   ▲
//!        SourceParser ◄───┤   └── Invalidator (on change)
//!     LibraryResolver ◄───┘
//!                         │
//!                         └──► ChangeNotice (per analysis task)
//! ```

mod change;
mod collaborators;
mod invalidate;
mod provider;
mod session;

pub use change::{ChangeNotice, ChangeSet};
pub use collaborators::{DefaultParser, DefaultResolver, LibraryResolver, SourceParser};
pub use provider::{Content, ContentProvider, FileContentProvider, MemoryContentProvider};
pub use session::AnalysisSession;
