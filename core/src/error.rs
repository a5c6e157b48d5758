//! Error domains for the document model, transform and schema layers.
//!
//! Each enum corresponds to one failure domain from the design: schema
//! compilation, node/mark construction, out-of-range positions, content
//! validation, slice fitting, and step application. None of these panic;
//! callers decide whether a failure is recoverable (most are) or a logic
//! error worth propagating further up.

use std::fmt;

/// A schema spec is internally inconsistent (missing `text`/top node,
/// duplicate type names, a bad linebreak replacement, an unknown mark
/// reference). Raised once, at [`crate::schema::Schema::compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    MissingTextNode,
    MissingTopNode(String),
    DuplicateNodeType(String),
    DuplicateMarkType(String),
    UnknownNodeType(String),
    UnknownMarkType(String),
    MultipleLinebreakReplacements,
    InvalidContentExpression { node: String, expr: String },
    TextNodeHasAttrs,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTextNode => write!(f, "schema has no \"text\" node type"),
            Self::MissingTopNode(name) => write!(f, "top node type {name:?} is not defined"),
            Self::DuplicateNodeType(name) => write!(f, "duplicate node type {name:?}"),
            Self::DuplicateMarkType(name) => write!(f, "duplicate mark type {name:?}"),
            Self::UnknownNodeType(name) => write!(f, "reference to unknown node type {name:?}"),
            Self::UnknownMarkType(name) => write!(f, "reference to unknown mark type {name:?}"),
            Self::MultipleLinebreakReplacements => {
                write!(f, "schema declares more than one linebreak replacement node")
            }
            Self::InvalidContentExpression { node, expr } => {
                write!(f, "invalid content expression {expr:?} on node type {node:?}")
            }
            Self::TextNodeHasAttrs => write!(f, "\"text\" node type may not declare attributes"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// A required attribute was missing, or a validator rejected a supplied
/// value. Raised by [`crate::node::Node`]/[`crate::mark::Mark`] construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    Missing { type_name: String, attr: String },
    Invalid { type_name: String, attr: String, reason: String },
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { type_name, attr } => {
                write!(f, "{type_name} is missing required attribute {attr:?}")
            }
            Self::Invalid { type_name, attr, reason } => {
                write!(f, "{type_name}.{attr} is invalid: {reason}")
            }
        }
    }
}

impl std::error::Error for AttributeError {}

/// A position, index, or JSON id was out of bounds or malformed. Raised at
/// the call that supplied the bad value; always caller-recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    PositionOutOfRange { pos: usize, max: usize },
    IndexOutOfRange { index: usize, len: usize },
    InvalidJson(String),
    UnknownSelectionType(String),
    UnknownStepType(String),
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PositionOutOfRange { pos, max } => {
                write!(f, "position {pos} out of range (document size {max})")
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range (len {len})")
            }
            Self::InvalidJson(msg) => write!(f, "invalid JSON: {msg}"),
            Self::UnknownSelectionType(ty) => write!(f, "unknown selection type {ty:?}"),
            Self::UnknownStepType(ty) => write!(f, "unknown step type {ty:?}"),
        }
    }
}

impl std::error::Error for RangeError {}

/// Proposed content violates the schema's content-match rules or the
/// allowed mark set of the type hosting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    InvalidContent { type_name: String },
    DisallowedMark { type_name: String, mark: String },
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidContent { type_name } => {
                write!(f, "invalid content for node type {type_name:?}")
            }
            Self::DisallowedMark { type_name, mark } => {
                write!(f, "mark {mark:?} is not allowed in node type {type_name:?}")
            }
        }
    }
}

impl std::error::Error for ContentError {}

/// A [`crate::slice::Slice`] could not be fit at the given positions: its
/// open depth exceeds the depth available there, or the open boundaries
/// can't be joined without violating content rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceError(pub String);

impl fmt::Display for ReplaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot replace: {}", self.0)
    }
}

impl std::error::Error for ReplaceError {}

impl From<ContentError> for ReplaceError {
    fn from(e: ContentError) -> Self {
        ReplaceError(e.to_string())
    }
}

/// [`crate::transform::Transform::step`] wraps a failed
/// [`crate::step::StepResult`]. `Transform::maybe_step` returns this as a
/// value instead of propagating it as a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError(pub String);

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transform failed: {}", self.0)
    }
}

impl std::error::Error for TransformError {}

impl From<ReplaceError> for TransformError {
    fn from(e: ReplaceError) -> Self {
        TransformError(e.0)
    }
}
