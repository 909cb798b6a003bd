//! Foundation types shared by every layer of the engine.
//!
//! - [`SourceId`] - opaque, stable identity of one unit of content
//! - [`SourceRegistry`] - interning of source URIs into [`SourceId`]s
//! - [`LineInfo`], [`LineCol`] - byte offset to line/column conversion
//! - [`TextRange`], [`TextSize`] - byte offsets (re-exported from `text-size`)
//!
//! This module has NO dependencies on other tessera modules.

mod line_info;
mod registry;
mod source_id;

pub use line_info::{LineCol, LineInfo};
pub use registry::SourceRegistry;
pub use source_id::SourceId;

pub use text_size::{TextRange, TextSize};
