//! Marks and mark sets.
//!
//! A mark set is a `Vec` sorted by [`MarkType::rank`] (insertion order in
//! the schema). Keeping it sorted means `add_to_set`/`is_in_set` are linear
//! scans with early exit rather than needing a hash set, which matters
//! because most nodes carry zero or one mark.

use std::sync::Arc;

use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::error::AttributeError;
use crate::schema::{AttributeSpec, MarkType};

pub type MarkSet = SmallVec<[Mark; 2]>;

/// An annotation attached to inline content: a type plus attribute values.
#[derive(Debug, Clone)]
pub struct Mark {
    pub type_: MarkType,
    pub attrs: Arc<Map<String, Value>>,
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.type_ == other.type_ && *self.attrs == *other.attrs
    }
}
impl Eq for Mark {}

impl Mark {
    pub fn new(type_: MarkType, attrs: Map<String, Value>) -> Result<Self, AttributeError> {
        let attrs = fill_defaults(type_.name(), type_.attrs(), attrs)?;
        Ok(Self {
            type_,
            attrs: Arc::new(attrs),
        })
    }

    /// Whether `self` is excluded by (i.e. mutually exclusive with) `other`.
    pub fn excludes(&self, other: &Mark) -> bool {
        self.type_.excludes(&other.type_)
    }

    /// Insert `self` into `set`, respecting rank order and exclusion rules.
    /// Returns `set` unchanged (by value, but semantically a no-op) if an
    /// existing mark of the same type with equal attrs is already present,
    /// or if some mark in `set` excludes `self`.
    pub fn add_to_set(&self, set: &MarkSet) -> MarkSet {
        let mut placed = false;
        let mut removed: Option<usize> = None;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.clone();
            }
            if self.type_.excludes(&other.type_) {
                // `self` can't coexist with `other`; if it's a strictly later
                // version of the same type, replace it, otherwise this
                // insertion is a no-op (matches ProseMirror's addToSet).
                if other.type_.excludes(&self.type_) {
                    return set.clone();
                }
                removed = Some(i);
            }
        }
        let mut out: MarkSet = SmallVec::new();
        for (i, other) in set.iter().enumerate() {
            if Some(i) == removed {
                continue;
            }
            if !placed {
                if other.type_.rank() > self.type_.rank() {
                    out.push(self.clone());
                    placed = true;
                } else if *other == *self {
                    placed = true;
                }
            }
            out.push(other.clone());
        }
        if !placed {
            out.push(self.clone());
        }
        out
    }

    pub fn remove_from_set(&self, set: &MarkSet) -> MarkSet {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &MarkSet) -> bool {
        set.iter().any(|m| m == self)
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String(self.type_.name().to_string()));
        if !self.attrs.is_empty() {
            obj.insert("attrs".into(), Value::Object((*self.attrs).clone()));
        }
        Value::Object(obj)
    }
}

pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

pub(crate) fn fill_defaults(
    type_name: &str,
    specs: &[(String, AttributeSpec)],
    mut supplied: Map<String, Value>,
) -> Result<Map<String, Value>, AttributeError> {
    let mut out = Map::new();
    for (name, spec) in specs {
        let value = match supplied.remove(name) {
            Some(v) => v,
            None => match &spec.default {
                Some(v) => v.clone(),
                None => {
                    return Err(AttributeError::Missing {
                        type_name: type_name.to_string(),
                        attr: name.clone(),
                    })
                }
            },
        };
        if let Some(validate) = &spec.validate {
            validate(&value).map_err(|reason| AttributeError::Invalid {
                type_name: type_name.to_string(),
                attr: name.clone(),
                reason,
            })?;
        }
        out.insert(name.clone(), value);
    }
    Ok(out)
}
