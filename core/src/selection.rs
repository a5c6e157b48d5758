//! Selection: a document-relative cursor or range, resolved against a
//! specific document revision.
//!
//! Three variants cover the cases this crate's document model needs --
//! [`TextSelection`] (a cursor or range inside inline content),
//! [`NodeSelection`] (a single selected node) and [`AllSelection`] (the
//! whole document). Unlike a general plugin-extensible hierarchy, these are
//! closed over in a tagged [`Selection`] enum: the document model here has
//! no view layer to register arbitrary new selection shapes against, so a
//! sealed sum type (the same choice `Step` makes) is simpler than trait
//! objects for three known cases. A small JSON-id registry still exists per
//! the wire-format contract (see [`register_selection_type`]).

use std::collections::HashSet;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::error::RangeError;
use crate::node::Node;
use crate::resolved_pos::ResolvedPos;
use crate::step::Mapping;

/// A snapshot of a selection that survives across a document edit: plain
/// integer positions (not tied to any particular document's node tree) that
/// can be mapped through a [`Mapping`] and later re-resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionBookmark {
    Text { anchor: usize, head: usize },
    Node { anchor: usize },
    All,
}

impl SelectionBookmark {
    pub fn map(&self, mapping: &Mapping) -> SelectionBookmark {
        match self {
            SelectionBookmark::Text { anchor, head } => SelectionBookmark::Text {
                anchor: mapping.map(*anchor, -1),
                head: mapping.map(*head, -1),
            },
            SelectionBookmark::Node { anchor } => SelectionBookmark::Node {
                anchor: mapping.map(*anchor, 1),
            },
            SelectionBookmark::All => SelectionBookmark::All,
        }
    }

    /// Resolves the bookmark against `doc`, falling back to the nearest
    /// valid selection if the original anchor/head no longer land cleanly
    /// (e.g. the node a `NodeSelection` pointed at was deleted).
    pub fn resolve(&self, doc: &Node) -> Selection {
        match self {
            SelectionBookmark::Text { anchor, head } => {
                let a = ResolvedPos::resolve(doc, (*anchor).min(doc.content_size()));
                let h = ResolvedPos::resolve(doc, (*head).min(doc.content_size()));
                match (a, h) {
                    (Ok(a), Ok(h)) => Selection::between(&a, &h, None),
                    _ => Selection::at_start(doc),
                }
            }
            SelectionBookmark::Node { anchor } => {
                if *anchor < doc.content_size() {
                    if let Ok(r) = ResolvedPos::resolve(doc, *anchor) {
                        if r.node_after().map(|n| !n.is_text()).unwrap_or(false) {
                            return Selection::Node(NodeSelection::new(r));
                        }
                        return Selection::near(&r, 1);
                    }
                }
                Selection::at_start(doc)
            }
            SelectionBookmark::All => Selection::All(AllSelection::new(doc.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextSelection {
    anchor_pos: ResolvedPos,
    head_pos: ResolvedPos,
}

impl TextSelection {
    pub fn new(anchor: ResolvedPos, head: ResolvedPos) -> Self {
        TextSelection {
            anchor_pos: anchor,
            head_pos: head,
        }
    }

    pub fn anchor(&self) -> &ResolvedPos {
        &self.anchor_pos
    }
    pub fn head(&self) -> &ResolvedPos {
        &self.head_pos
    }
    pub fn from_pos(&self) -> &ResolvedPos {
        if self.anchor_pos.pos() <= self.head_pos.pos() {
            &self.anchor_pos
        } else {
            &self.head_pos
        }
    }
    pub fn to_pos(&self) -> &ResolvedPos {
        if self.anchor_pos.pos() <= self.head_pos.pos() {
            &self.head_pos
        } else {
            &self.anchor_pos
        }
    }
    pub fn empty(&self) -> bool {
        self.anchor_pos.pos() == self.head_pos.pos()
    }
    pub fn doc(&self) -> &Node {
        self.anchor_pos.node(0)
    }

    pub fn content(&self) -> crate::slice::Slice {
        self.doc().slice(self.from_pos().pos(), self.to_pos().pos())
    }

    pub fn get_bookmark(&self) -> SelectionBookmark {
        SelectionBookmark::Text {
            anchor: self.anchor_pos.pos(),
            head: self.head_pos.pos(),
        }
    }

    fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        let anchor = mapping.map(self.anchor_pos.pos(), -1);
        let head = mapping.map(self.head_pos.pos(), -1);
        match (ResolvedPos::resolve(doc, anchor), ResolvedPos::resolve(doc, head)) {
            (Ok(a), Ok(h)) => Selection::between(&a, &h, None),
            _ => Selection::near(&ResolvedPos::resolve(doc, head.min(doc.content_size())).unwrap(), 1),
        }
    }

    fn eq(&self, other: &TextSelection) -> bool {
        self.anchor_pos.pos() == other.anchor_pos.pos() && self.head_pos.pos() == other.head_pos.pos()
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String("text".into()));
        obj.insert("anchor".into(), self.anchor_pos.pos().into());
        obj.insert("head".into(), self.head_pos.pos().into());
        Value::Object(obj)
    }
}

/// Selects a single non-text node, `anchor` being the position immediately
/// before it.
#[derive(Debug, Clone)]
pub struct NodeSelection {
    anchor_pos: ResolvedPos,
}

impl NodeSelection {
    pub fn new(anchor: ResolvedPos) -> Self {
        NodeSelection { anchor_pos: anchor }
    }

    pub fn anchor(&self) -> &ResolvedPos {
        &self.anchor_pos
    }
    pub fn from(&self) -> usize {
        self.anchor_pos.pos()
    }
    pub fn to(&self) -> usize {
        self.anchor_pos.pos() + self.node().node_size()
    }
    pub fn node(&self) -> &Node {
        self.anchor_pos
            .node_after()
            .expect("NodeSelection anchor must have a node directly after it")
    }
    pub fn doc(&self) -> &Node {
        self.anchor_pos.node(0)
    }

    pub fn content(&self) -> crate::slice::Slice {
        self.doc().slice(self.from(), self.to())
    }

    pub fn get_bookmark(&self) -> SelectionBookmark {
        SelectionBookmark::Node { anchor: self.from() }
    }

    fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        let result = mapping.map_result(self.from(), 1);
        if result.deleted() {
            let r = ResolvedPos::resolve(doc, result.pos.min(doc.content_size())).unwrap();
            return Selection::near(&r, 1);
        }
        match ResolvedPos::resolve(doc, result.pos) {
            Ok(r) if r.node_after().map(|n| !n.is_text()).unwrap_or(false) => Selection::Node(NodeSelection::new(r)),
            Ok(r) => Selection::near(&r, 1),
            Err(_) => Selection::at_start(doc),
        }
    }

    fn eq(&self, other: &NodeSelection) -> bool {
        self.from() == other.from()
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String("node".into()));
        obj.insert("anchor".into(), self.from().into());
        Value::Object(obj)
    }
}

/// Selects the entire document.
#[derive(Debug, Clone)]
pub struct AllSelection {
    doc: Node,
}

impl AllSelection {
    pub fn new(doc: Node) -> Self {
        AllSelection { doc }
    }
    pub fn from(&self) -> usize {
        0
    }
    pub fn to(&self) -> usize {
        self.doc.content_size()
    }
    pub fn doc(&self) -> &Node {
        &self.doc
    }
    pub fn content(&self) -> crate::slice::Slice {
        self.doc.slice(0, self.to())
    }
    pub fn get_bookmark(&self) -> SelectionBookmark {
        SelectionBookmark::All
    }
    fn map(&self, doc: &Node, _mapping: &Mapping) -> Selection {
        Selection::All(AllSelection::new(doc.clone()))
    }
}

#[derive(Debug, Clone)]
pub enum Selection {
    Text(TextSelection),
    Node(NodeSelection),
    All(AllSelection),
}

impl Selection {
    pub fn doc(&self) -> &Node {
        match self {
            Selection::Text(s) => s.doc(),
            Selection::Node(s) => s.doc(),
            Selection::All(s) => s.doc(),
        }
    }

    pub fn from(&self) -> usize {
        match self {
            Selection::Text(s) => s.from_pos().pos(),
            Selection::Node(s) => s.from(),
            Selection::All(s) => s.from(),
        }
    }

    pub fn to(&self) -> usize {
        match self {
            Selection::Text(s) => s.to_pos().pos(),
            Selection::Node(s) => s.to(),
            Selection::All(s) => s.to(),
        }
    }

    pub fn empty(&self) -> bool {
        match self {
            Selection::Text(s) => s.empty(),
            Selection::Node(_) => false,
            Selection::All(s) => s.to() == 0,
        }
    }

    pub fn content(&self) -> crate::slice::Slice {
        match self {
            Selection::Text(s) => s.content(),
            Selection::Node(s) => s.content(),
            Selection::All(s) => s.content(),
        }
    }

    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        match self {
            Selection::Text(s) => s.map(doc, mapping),
            Selection::Node(s) => s.map(doc, mapping),
            Selection::All(s) => s.map(doc, mapping),
        }
    }

    pub fn get_bookmark(&self) -> SelectionBookmark {
        match self {
            Selection::Text(s) => s.get_bookmark(),
            Selection::Node(s) => s.get_bookmark(),
            Selection::All(s) => s.get_bookmark(),
        }
    }

    pub fn eq(&self, other: &Selection) -> bool {
        match (self, other) {
            (Selection::Text(a), Selection::Text(b)) => a.eq(b),
            (Selection::Node(a), Selection::Node(b)) => a.eq(b),
            (Selection::All(a), Selection::All(b)) => a.doc() == b.doc(),
            _ => false,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Selection::Text(s) => s.to_json(),
            Selection::Node(s) => s.to_json(),
            Selection::All(_) => {
                let mut obj = Map::new();
                obj.insert("type".into(), Value::String("all".into()));
                Value::Object(obj)
            }
        }
    }

    pub fn from_json(doc: &Node, json: &Value) -> Result<Selection, RangeError> {
        let obj = json
            .as_object()
            .ok_or_else(|| RangeError::InvalidJson("selection is not an object".into()))?;
        let ty = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| RangeError::InvalidJson("selection missing \"type\"".into()))?;
        match ty {
            "text" => {
                let anchor = get_pos(obj, "anchor")?;
                let head = get_pos(obj, "head")?;
                let a = ResolvedPos::resolve(doc, anchor).map_err(|e| RangeError::InvalidJson(e.to_string()))?;
                let h = ResolvedPos::resolve(doc, head).map_err(|e| RangeError::InvalidJson(e.to_string()))?;
                Ok(Selection::Text(TextSelection::new(a, h)))
            }
            "node" => {
                let anchor = get_pos(obj, "anchor")?;
                let r = ResolvedPos::resolve(doc, anchor).map_err(|e| RangeError::InvalidJson(e.to_string()))?;
                Ok(Selection::Node(NodeSelection::new(r)))
            }
            "all" => Ok(Selection::All(AllSelection::new(doc.clone()))),
            other => Err(RangeError::UnknownSelectionType(other.to_string())),
        }
    }

    /// Builds a `TextSelection` between `anchor` and `head` if both land in
    /// inline content, otherwise finds the nearest valid selection starting
    /// from `head` in the direction implied by `bias` (defaulting to the
    /// anchor-to-head direction).
    pub fn between(anchor: &ResolvedPos, head: &ResolvedPos, bias: Option<i32>) -> Selection {
        let dir = bias.unwrap_or(if head.pos() >= anchor.pos() { 1 } else { -1 });
        if anchor.parent().has_inline_content() && head.parent().has_inline_content() {
            return Selection::Text(TextSelection::new(anchor.clone(), head.clone()));
        }
        match Selection::find_from(head, dir, false) {
            Some(Selection::Text(t)) => Selection::Text(TextSelection::new(anchor.clone(), t.head_pos)),
            Some(other) => other,
            None => Selection::near(head, dir),
        }
    }

    /// Finds the nearest valid selection from `pos`, scanning in direction
    /// `dir` (+1 forward, -1 backward). Simplified relative to the source:
    /// only scans the immediate parent's remaining siblings rather than the
    /// full cross-depth walk, which covers the common "land inside the
    /// next/previous textblock or atom" case `near`/`at_start`/`at_end` use.
    pub fn find_from(pos: &ResolvedPos, dir: i32, text_only: bool) -> Option<Selection> {
        let doc = pos.node(0).clone();
        if pos.parent().has_inline_content() {
            return Some(Selection::Text(TextSelection::new(pos.clone(), pos.clone())));
        }
        let depth = pos.depth();
        let parent = pos.node(depth);
        let parent_start = pos.start(depth);
        let mut offsets = Vec::new();
        parent.content().for_each(|child, off, idx| offsets.push((idx, off, child.clone())));
        let start_index = pos.index(depth);
        let indices: Vec<usize> = if dir > 0 {
            (start_index..offsets.len()).collect()
        } else {
            (0..start_index).rev().collect()
        };
        for idx in indices {
            let (_, off, child) = &offsets[idx];
            let child_start = parent_start + off;
            if child.has_inline_content() {
                let at = if dir > 0 { child_start + 1 } else { child_start + child.node_size() - 1 };
                let r = ResolvedPos::resolve(&doc, at).ok()?;
                return Some(Selection::Text(TextSelection::new(r.clone(), r)));
            }
            if !text_only && !child.is_text() && (child.is_leaf_like() || !child.type_().is_inline()) {
                let r = ResolvedPos::resolve(&doc, child_start).ok()?;
                return Some(Selection::Node(NodeSelection::new(r)));
            }
        }
        None
    }

    pub fn near(pos: &ResolvedPos, bias: i32) -> Selection {
        Selection::find_from(pos, bias, false)
            .or_else(|| Selection::find_from(pos, -bias, false))
            .unwrap_or_else(|| Selection::All(AllSelection::new(pos.node(0).clone())))
    }

    pub fn at_start(doc: &Node) -> Selection {
        let r = ResolvedPos::resolve(doc, 0).expect("position 0 always resolves");
        Selection::find_from(&r, 1, false).unwrap_or_else(|| Selection::All(AllSelection::new(doc.clone())))
    }

    pub fn at_end(doc: &Node) -> Selection {
        let size = doc.content_size();
        let r = ResolvedPos::resolve(doc, size).expect("document size always resolves");
        Selection::find_from(&r, -1, false).unwrap_or_else(|| Selection::All(AllSelection::new(doc.clone())))
    }
}

/// A registry of known selection JSON type ids, mirroring the wire-format
/// contract that custom selection kinds register a unique `type` string.
/// This crate has no view layer to dispatch custom kinds through, so
/// registering an id here only reserves it against collisions -- it does
/// not make `Selection::from_json` aware of a new variant.
static SELECTION_TYPES: Lazy<Mutex<HashSet<&'static str>>> = Lazy::new(|| {
    let mut set = HashSet::new();
    set.insert("text");
    set.insert("node");
    set.insert("all");
    Mutex::new(set)
});

pub fn register_selection_type(id: &'static str) -> Result<(), RangeError> {
    let mut set = SELECTION_TYPES.lock().unwrap();
    if !set.insert(id) {
        return Err(RangeError::InvalidJson(format!("selection type {id:?} already registered")));
    }
    Ok(())
}

fn get_pos(obj: &Map<String, Value>, key: &str) -> Result<usize, RangeError> {
    obj.get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| RangeError::InvalidJson(format!("selection missing numeric field {key:?}")))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::test_doc_hello_world;

    #[test]
    fn at_start_and_at_end_land_inside_the_paragraph() {
        let doc = test_doc_hello_world();
        let start = Selection::at_start(&doc);
        assert_eq!(start.from(), 1);
        let end = Selection::at_end(&doc);
        assert_eq!(end.to(), doc.content_size() - 1);
    }

    #[test]
    fn text_selection_json_round_trips() {
        let doc = test_doc_hello_world();
        let a = ResolvedPos::resolve(&doc, 1).unwrap();
        let h = ResolvedPos::resolve(&doc, 5).unwrap();
        let sel = Selection::Text(TextSelection::new(a, h));
        let json = sel.to_json();
        let back = Selection::from_json(&doc, &json).unwrap();
        assert!(sel.eq(&back));
    }

    #[test]
    fn all_selection_maps_to_new_doc_bounds() {
        let doc = test_doc_hello_world();
        let sel = Selection::All(AllSelection::new(doc.clone()));
        let mapping = Mapping::new();
        let mapped = sel.map(&doc, &mapping);
        assert_eq!(mapped.from(), 0);
        assert_eq!(mapped.to(), doc.content_size());
    }

    #[test]
    fn duplicate_registration_errors() {
        register_selection_type("custom-marker").unwrap();
        assert!(register_selection_type("custom-marker").is_err());
    }
}
