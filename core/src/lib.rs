//! Structured rich-text document model, transforms and undo history.
//!
//! A [`schema`] describes the node and mark types a document may contain. A
//! [`node::Node`] tree built against that schema is immutable and persistent:
//! edits never mutate a document in place, they produce a new one that shares
//! structure with the old one. [`step`] and [`transform`] turn high-level
//! edits (type a character, wrap a range in a blockquote, toggle bold) into
//! small invertible, mappable units so that positions recorded against one
//! document version can be translated to another. [`state`] wires documents,
//! selections and transactions into an `EditorState` that plugins can observe
//! and extend, and [`history`] layers undo/redo event-grouping on top of that.
//!
//! The pieces compose roughly like this:
//!
//! ```text
//! schema ─┬─> node (documents) ─┬─> slice / resolved_pos (addressing)
//!         └─> mark               └─> step ─> transform ─> state ─> history
//! ```

pub mod error;
pub mod fragment;
pub mod history;
pub mod mark;
pub mod node;
pub mod resolved_pos;
pub mod schema;
pub mod selection;
pub mod slice;
pub mod state;
pub mod step;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::{AttributeError, ContentError, RangeError, ReplaceError, SchemaError, TransformError};
pub use fragment::Fragment;
pub use mark::{Mark, MarkSet};
pub use node::Node;
pub use resolved_pos::{NodeRange, ResolveCache, ResolvedPos};
pub use schema::{MarkType, NodeType, Schema};
pub use selection::{AllSelection, NodeSelection, Selection, SelectionBookmark, TextSelection};
pub use slice::Slice;
pub use state::{
    AppliedTransaction, EditorState, MetaKey, Plugin, PluginKey, StateConfig, StateField,
    Transaction,
};
pub use step::{DelInfo, MapResult, Mapping, Step, StepMap, StepResult};
pub use transform::Transform;
