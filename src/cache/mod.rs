//! The incremental analysis cache.
//!
//! Each source has a [`SourceEntry`] holding its cached facts. A fact is
//! addressed by a typed descriptor and moves through the [`CacheState`]
//! machine; facts that depend on the containing library live in the entry's
//! [`ResolutionChain`].
//!
//! ```text
//! SourceEntry
//! ├── LINE_INFO, SOURCE_KIND, PARSED_UNIT, PARSE_ERRORS,
//! │   INCLUDED_PARTS, REFERENCED_LIBRARIES          ← content derived
//! ├── ELEMENT, PUBLIC_NAMESPACE, IS_CLIENT, IS_LAUNCHABLE
//! └── ResolutionChain
//!     ├── library A → RESOLVED_UNIT, RESOLUTION_ERRORS
//!     └── library B → RESOLVED_UNIT, RESOLUTION_ERRORS
//! ```

mod descriptor;
mod entry;
mod resolution;
mod state;

pub use descriptor::{
    DescriptorKey, ELEMENT, FlagDescriptor, INCLUDED_PARTS, IS_CLIENT, IS_LAUNCHABLE, LINE_INFO,
    PARSE_ERRORS, PARSED_UNIT, PUBLIC_NAMESPACE, REFERENCED_LIBRARIES, RESOLUTION_ERRORS,
    RESOLVED_UNIT, ResolutionDescriptor, SOURCE_KIND, SlotDescriptor, SourceDescriptor,
};
pub use entry::{SourceEntry, SourceFlags};
pub use resolution::{ResolutionChain, ResolutionState};
pub use state::{CacheState, ComputeFailure, Slot};
