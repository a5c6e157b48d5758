//! Node: an immutable tree vertex with a type, attributes, content and
//! marks. Text nodes are represented as the same struct with `text: Some`
//! and empty content, rather than a separate type, to keep the document
//! tree monomorphic (matching `Fragment`'s `Arc<[Node]>` storage).

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{AttributeError, ContentError};
use crate::fragment::Fragment;
use crate::mark::{self, fill_defaults, Mark, MarkSet};
use crate::schema::{NodeType, Schema};
use crate::slice::Slice;

#[derive(Debug, Clone)]
pub struct Node {
    type_: NodeType,
    attrs: Arc<Map<String, Value>>,
    content: Fragment,
    marks: MarkSet,
    text: Option<Arc<str>>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.type_ == other.type_
            && *self.attrs == *other.attrs
            && mark::same_set(&self.marks, &other.marks)
            && self.text == other.text
            && self.content == other.content
    }
}
impl Eq for Node {}

impl Node {
    pub fn new(
        type_: NodeType,
        attrs: Map<String, Value>,
        content: Fragment,
        marks: MarkSet,
    ) -> Result<Self, AttributeError> {
        let attrs = fill_defaults(type_.name(), type_.attrs(), attrs)?;
        Ok(Node {
            type_,
            attrs: Arc::new(attrs),
            content,
            marks,
            text: None,
        })
    }

    pub fn text(schema: &Schema, text: String, marks: MarkSet) -> Result<Self, AttributeError> {
        assert!(!text.is_empty(), "text nodes may not be empty");
        let type_ = schema.text_node_type().clone();
        Ok(Node {
            type_,
            attrs: Arc::new(Map::new()),
            content: Fragment::empty(),
            marks,
            text: Some(Arc::from(text)),
        })
    }

    /// Same type/attrs/marks as `self`, but replacing the text content --
    /// used when coalescing adjacent text nodes. Panics if `self` is not a
    /// text node or `text` is empty.
    pub fn with_text(&self, text: String) -> Node {
        assert!(self.is_text(), "with_text called on a non-text node");
        assert!(!text.is_empty(), "text nodes may not be empty");
        Node {
            type_: self.type_.clone(),
            attrs: self.attrs.clone(),
            content: Fragment::empty(),
            marks: self.marks.clone(),
            text: Some(Arc::from(text)),
        }
    }

    pub fn type_(&self) -> &NodeType {
        &self.type_
    }
    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }
    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }
    pub fn content(&self) -> &Fragment {
        &self.content
    }
    pub fn content_size(&self) -> usize {
        self.content.size()
    }
    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
    pub fn is_leaf(&self) -> bool {
        self.is_text() || self.type_.is_leaf()
    }
    /// Leaves and atoms both stop `nodes_between`/position resolution from
    /// descending further.
    pub fn is_leaf_like(&self) -> bool {
        self.is_leaf() || self.type_.is_atom()
    }
    pub fn has_inline_content(&self) -> bool {
        self.type_.has_inline_content()
    }

    pub fn node_size(&self) -> usize {
        if let Some(text) = &self.text {
            text.chars().count()
        } else if self.type_.is_leaf() {
            1
        } else {
            2 + self.content.size()
        }
    }

    pub fn text_content(&self) -> String {
        if let Some(text) = &self.text {
            text.to_string()
        } else {
            self.content.text_content()
        }
    }

    /// Whether `self` and `other` have the same type, attrs and marks --
    /// the precondition for coalescing adjacent text nodes.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.type_ == other.type_ && *self.attrs == *other.attrs && mark::same_set(&self.marks, &other.marks)
    }

    pub fn with_marks(&self, marks: MarkSet) -> Node {
        Node {
            type_: self.type_.clone(),
            attrs: self.attrs.clone(),
            content: self.content.clone(),
            marks,
            text: self.text.clone(),
        }
    }

    pub fn with_attrs(&self, attrs: Map<String, Value>) -> Node {
        Node {
            type_: self.type_.clone(),
            attrs: Arc::new(attrs),
            content: self.content.clone(),
            marks: self.marks.clone(),
            text: self.text.clone(),
        }
    }

    pub fn with_content(&self, content: Fragment) -> Node {
        Node {
            type_: self.type_.clone(),
            attrs: self.attrs.clone(),
            content,
            marks: self.marks.clone(),
            text: self.text.clone(),
        }
    }

    /// Cuts content between `from` and `to` (content-relative positions,
    /// i.e. not counting this node's own opening token).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if from == 0 && to == self.content_size() {
            return self.clone();
        }
        if self.is_text() {
            let text = self.text.as_ref().unwrap();
            let sliced: String = text.chars().skip(from).take(to - from).collect();
            return self.with_text(sliced);
        }
        self.with_content(self.content.cut(from, to))
    }

    pub fn slice(&self, from: usize, to: usize) -> Slice {
        if from == to {
            return Slice::empty();
        }
        crate::slice::node_slice(self, from, to)
    }

    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, crate::error::ReplaceError> {
        crate::slice::replace_range(self, from, to, slice)
    }

    /// Whether replacing the children in `[from_idx, to_idx)` with
    /// `replacement`'s children would still satisfy this type's content
    /// match. Simplified: checks only that the spliced sequence of tokens
    /// is accepted start-to-end by the content match.
    pub fn can_replace(&self, from_idx: usize, to_idx: usize, replacement: &Fragment) -> bool {
        let mut m = self.type_.content_match().clone();
        for child in self.content.children()[..from_idx].iter() {
            match m.match_token(|tok| child.type_.matches_token(tok)) {
                Some(next) => m = next,
                None => return false,
            }
        }
        for child in replacement.children() {
            match m.match_token(|tok| child.type_.matches_token(tok)) {
                Some(next) => m = next,
                None => return false,
            }
        }
        for child in self.content.children()[to_idx..].iter() {
            match m.match_token(|tok| child.type_.matches_token(tok)) {
                Some(next) => m = next,
                None => return false,
            }
        }
        m.valid_end()
    }

    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        if pos >= self.content_size() {
            return None;
        }
        let (idx, offset) = self.content.find_index(pos);
        let child = self.content.child(idx);
        if offset == pos || child.is_text() {
            Some(child)
        } else {
            child.node_at(pos - offset - 1)
        }
    }

    pub fn child_after(&self, pos: usize) -> (Option<&Node>, usize) {
        if pos >= self.content_size() {
            return (None, 0);
        }
        let (idx, offset) = self.content.find_index(pos);
        if idx >= self.content.child_count() {
            (None, offset)
        } else {
            (Some(self.content.child(idx)), offset)
        }
    }

    pub fn child_before(&self, pos: usize) -> (Option<&Node>, usize) {
        if pos == 0 {
            return (None, 0);
        }
        let (idx, offset) = self.content.find_index(pos);
        if offset == pos && idx > 0 {
            let prev = idx - 1;
            let prev_node = self.content.child(prev);
            (Some(prev_node), offset - prev_node.node_size())
        } else if idx < self.content.child_count() {
            (Some(self.content.child(idx)), offset)
        } else {
            (None, offset)
        }
    }

    /// Whether every inline node between `from` and `to` carries `mark`
    /// (simplified: only checked over this node's direct text children,
    /// the common case used by input-rule style checks).
    pub fn range_has_mark(&self, from: usize, to: usize, mark: &Mark) -> bool {
        let mut found = false;
        self.content.nodes_between(from, to, 0, &mut |node, _start, _parent, _idx| {
            if !found && mark.is_in_set(node.marks()) {
                found = true;
            }
            true
        });
        found
    }

    pub fn check(&self) -> Result<(), ContentError> {
        if !self.is_leaf() {
            let mut m = self.type_.content_match().clone();
            for child in self.content.children() {
                child.check()?;
                if !self.type_.allows_marks(child.marks()) {
                    return Err(ContentError::DisallowedMark {
                        type_name: self.type_.name().to_string(),
                        mark: child
                            .marks()
                            .first()
                            .map(|m| m.type_.name().to_string())
                            .unwrap_or_default(),
                    });
                }
                match m.match_token(|tok| child.type_.matches_token(tok)) {
                    Some(next) => m = next,
                    None => {
                        return Err(ContentError::InvalidContent {
                            type_name: self.type_.name().to_string(),
                        })
                    }
                }
            }
            if !m.valid_end() {
                return Err(ContentError::InvalidContent {
                    type_name: self.type_.name().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        if let Some(text) = &self.text {
            let mut obj = Map::new();
            obj.insert("type".into(), Value::String("text".into()));
            obj.insert("text".into(), Value::String(text.to_string()));
            if !self.marks.is_empty() {
                obj.insert(
                    "marks".into(),
                    Value::Array(self.marks.iter().map(Mark::to_json).collect()),
                );
            }
            return Value::Object(obj);
        }
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String(self.type_.name().to_string()));
        if !self.attrs.is_empty() {
            obj.insert("attrs".into(), Value::Object((*self.attrs).clone()));
        }
        if !self.content.is_empty() {
            obj.insert(
                "content".into(),
                Value::Array(self.content.children().iter().map(Node::to_json).collect()),
            );
        }
        if !self.marks.is_empty() {
            obj.insert(
                "marks".into(),
                Value::Array(self.marks.iter().map(Mark::to_json).collect()),
            );
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Node, crate::error::RangeError> {
        use crate::error::RangeError;
        let obj = json
            .as_object()
            .ok_or_else(|| RangeError::InvalidJson("node is not an object".into()))?;
        let type_name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| RangeError::InvalidJson("node missing \"type\"".into()))?;

        let marks = match obj.get("marks") {
            Some(Value::Array(items)) => {
                let mut set = MarkSet::new();
                for item in items {
                    set.push(mark_from_json(schema, item)?);
                }
                set
            }
            _ => MarkSet::new(),
        };

        if type_name == "text" {
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| RangeError::InvalidJson("text node missing \"text\"".into()))?;
            if text.is_empty() {
                return Err(RangeError::InvalidJson("text node has empty text".into()));
            }
            return Node::text(schema, text.to_string(), marks)
                .map_err(|e| RangeError::InvalidJson(e.to_string()));
        }

        let type_ = schema
            .node_type(type_name)
            .ok_or_else(|| RangeError::InvalidJson(format!("unknown node type {type_name:?}")))?
            .clone();
        let attrs = match obj.get("attrs") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let content = match obj.get("content") {
            Some(Value::Array(items)) => {
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    children.push(Node::from_json(schema, item)?);
                }
                Fragment::from_array(children)
            }
            _ => Fragment::empty(),
        };
        Node::new(type_, attrs, content, marks).map_err(|e| RangeError::InvalidJson(e.to_string()))
    }
}

fn mark_from_json(schema: &Schema, json: &Value) -> Result<Mark, crate::error::RangeError> {
    use crate::error::RangeError;
    let obj = json
        .as_object()
        .ok_or_else(|| RangeError::InvalidJson("mark is not an object".into()))?;
    let type_name = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RangeError::InvalidJson("mark missing \"type\"".into()))?;
    let type_ = schema
        .mark_type(type_name)
        .ok_or_else(|| RangeError::InvalidJson(format!("unknown mark type {type_name:?}")))?
        .clone();
    let attrs = match obj.get("attrs") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    Mark::new(type_, attrs).map_err(|e| RangeError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::test_schema;

    #[test]
    fn node_size_counts_open_close_tokens() {
        let schema = test_schema();
        let text = Node::text(&schema, "hi".into(), Default::default()).unwrap();
        assert_eq!(text.node_size(), 2);
        let para = schema.node_type("paragraph").unwrap().clone();
        let p = Node::new(para, Default::default(), Fragment::from_single(text), Default::default()).unwrap();
        assert_eq!(p.node_size(), 4);
    }

    #[test]
    fn json_round_trip() {
        let schema = test_schema();
        let text = Node::text(&schema, "hi".into(), Default::default()).unwrap();
        let para = schema.node_type("paragraph").unwrap().clone();
        let p = Node::new(para, Default::default(), Fragment::from_single(text), Default::default()).unwrap();
        let json = p.to_json();
        let back = Node::from_json(&schema, &json).unwrap();
        assert_eq!(p, back);
    }
}
