//! The primitive, invertible, mappable edit operations every higher-level
//! [`crate::transform::Transform`] op compiles down to.

pub mod step_map;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::error::RangeError;
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;
use crate::schema::Schema;
use crate::slice::{self, Slice};
pub use step_map::{DelInfo, MapResult, Mapping, StepMap};

#[derive(Debug, Clone)]
pub struct StepResult {
    pub doc: Option<Node>,
    pub failed: Option<String>,
}

impl StepResult {
    pub fn ok(doc: Node) -> Self {
        StepResult {
            doc: Some(doc),
            failed: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        StepResult {
            doc: None,
            failed: Some(message.into()),
        }
    }

    pub fn from_replace(doc: &Node, from: usize, to: usize, slice: Slice) -> Self {
        match doc.replace(from, to, &slice) {
            Ok(d) => StepResult::ok(d),
            Err(e) => StepResult::fail(e.to_string()),
        }
    }
}

fn content_between(doc: &Node, from: usize, to: usize) -> bool {
    from < to && doc.slice(from, to).size() > 0
}

#[derive(Debug, Clone)]
pub struct ReplaceStep {
    pub from: usize,
    pub to: usize,
    pub slice: Slice,
    pub structure: bool,
}

#[derive(Debug, Clone)]
pub struct ReplaceAroundStep {
    pub from: usize,
    pub to: usize,
    pub gap_from: usize,
    pub gap_to: usize,
    pub slice: Slice,
    pub insert: usize,
    pub structure: bool,
}

#[derive(Debug, Clone)]
pub struct AddMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

#[derive(Debug, Clone)]
pub struct RemoveMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

#[derive(Debug, Clone)]
pub struct AddNodeMarkStep {
    pub pos: usize,
    pub mark: Mark,
}

#[derive(Debug, Clone)]
pub struct RemoveNodeMarkStep {
    pub pos: usize,
    pub mark: Mark,
}

#[derive(Debug, Clone)]
pub struct AttrStep {
    pub pos: usize,
    pub attr: String,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct DocAttrStep {
    pub attr: String,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub enum Step {
    Replace(ReplaceStep),
    ReplaceAround(ReplaceAroundStep),
    AddMark(AddMarkStep),
    RemoveMark(RemoveMarkStep),
    AddNodeMark(AddNodeMarkStep),
    RemoveNodeMark(RemoveNodeMarkStep),
    Attr(AttrStep),
    DocAttr(DocAttrStep),
}

/// Rebuilds a node's inline content, rewriting every leaf (text segment or
/// atom) that overlaps `[from, to)` with `f`. Text nodes straddling a
/// boundary are split at the character so marks land exactly on the
/// requested range.
fn map_inline_range(node: &Node, from: usize, to: usize, start: usize, f: &dyn Fn(&Node) -> Node) -> Node {
    let mut new_children = Vec::new();
    let mut pos = start;
    for child in node.content().children() {
        let child_start = pos;
        let child_end = pos + child.node_size();
        if child_end <= from || child_start >= to {
            new_children.push(child.clone());
        } else if child.is_text() {
            let text = child.text().unwrap();
            let chars: Vec<char> = text.chars().collect();
            let seg_from = from.saturating_sub(child_start).min(chars.len());
            let seg_to = to.saturating_sub(child_start).min(chars.len());
            if seg_from > 0 {
                new_children.push(child.with_text(chars[..seg_from].iter().collect()));
            }
            let mid: String = chars[seg_from..seg_to].iter().collect();
            if !mid.is_empty() {
                new_children.push(f(&child.with_text(mid)));
            }
            if seg_to < chars.len() {
                new_children.push(child.with_text(chars[seg_to..].iter().collect()));
            }
        } else if child.is_leaf_like() {
            new_children.push(f(child));
        } else {
            new_children.push(map_inline_range(child, from, to, child_start + 1, f));
        }
        pos = child_end;
    }
    node.with_content(Fragment::from_array(new_children))
}

impl Step {
    pub fn apply(&self, doc: &Node) -> StepResult {
        match self {
            Step::Replace(s) => {
                // `structure` is meaningful for ReplaceAround (content between
                // the outer range and the gap); a bare Replace has no gap to
                // protect, so the flag only round-trips through JSON here.
                StepResult::from_replace(doc, s.from, s.to, s.slice.clone())
            }
            Step::ReplaceAround(s) => {
                if s.structure && (content_between(doc, s.from, s.gap_from) || content_between(doc, s.gap_to, s.to)) {
                    return StepResult::fail("structure gap replace would overwrite content");
                }
                let gap_slice = doc.slice(s.gap_from, s.gap_to);
                match slice::insert_at(&s.slice, s.insert, gap_slice.content().clone()) {
                    Some(spliced) => StepResult::from_replace(doc, s.from, s.to, spliced),
                    None => StepResult::fail("gap is not present in the inserted slice"),
                }
            }
            Step::AddMark(s) => {
                let parent_allows = {
                    let r = match crate::resolved_pos::ResolvedPos::resolve(doc, s.from) {
                        Ok(r) => r,
                        Err(e) => return StepResult::fail(e.to_string()),
                    };
                    let depth = r.shared_depth(s.to);
                    r.node(depth).type_().allows_mark_type(&s.mark.type_)
                };
                if !parent_allows {
                    return StepResult::ok(doc.clone());
                }
                let mark = s.mark.clone();
                let new_doc = map_inline_range(doc, s.from, s.to, 0, &move |node| {
                    node.with_marks(mark.add_to_set(node.marks()))
                });
                StepResult::ok(new_doc)
            }
            Step::RemoveMark(s) => {
                let mark = s.mark.clone();
                let new_doc = map_inline_range(doc, s.from, s.to, 0, &move |node| {
                    node.with_marks(mark.remove_from_set(node.marks()))
                });
                StepResult::ok(new_doc)
            }
            Step::AddNodeMark(s) => match doc.node_at(s.pos) {
                None => StepResult::fail("no node at given position"),
                Some(node) => {
                    let new_marks = s.mark.add_to_set(node.marks());
                    let new_node = node.with_marks(new_marks);
                    let size = node.node_size();
                    StepResult::from_replace(doc, s.pos, s.pos + size, Slice::new(Fragment::from_single(new_node), 0, 0))
                }
            },
            Step::RemoveNodeMark(s) => match doc.node_at(s.pos) {
                None => StepResult::fail("no node at given position"),
                Some(node) => {
                    let new_marks = s.mark.remove_from_set(node.marks());
                    let new_node = node.with_marks(new_marks);
                    let size = node.node_size();
                    StepResult::from_replace(doc, s.pos, s.pos + size, Slice::new(Fragment::from_single(new_node), 0, 0))
                }
            },
            Step::Attr(s) => match doc.node_at(s.pos) {
                None => StepResult::fail("no node at given position"),
                Some(node) => {
                    let mut attrs = node.attrs().clone();
                    attrs.insert(s.attr.clone(), s.value.clone());
                    let new_node = node.with_attrs(attrs);
                    let size = node.node_size();
                    StepResult::from_replace(doc, s.pos, s.pos + size, Slice::new(Fragment::from_single(new_node), 0, 0))
                }
            },
            Step::DocAttr(s) => {
                let mut attrs = doc.attrs().clone();
                attrs.insert(s.attr.clone(), s.value.clone());
                StepResult::ok(doc.with_attrs(attrs))
            }
        }
    }

    pub fn invert(&self, doc_before: &Node) -> Step {
        match self {
            Step::Replace(s) => Step::Replace(ReplaceStep {
                from: s.from,
                to: s.from + s.slice.size(),
                slice: doc_before.slice(s.from, s.to),
                structure: s.structure,
            }),
            Step::ReplaceAround(s) => {
                let gap_from = s.from + s.slice.open_start();
                let gap_to = s.to - s.slice.open_end();
                let outer = doc_before.slice(s.from, s.to);
                let removed = slice::remove_between(&outer, gap_from - s.from, gap_to - s.from);
                Step::ReplaceAround(ReplaceAroundStep {
                    from: s.from,
                    to: s.to,
                    gap_from,
                    gap_to,
                    slice: removed,
                    insert: s.gap_from - s.from,
                    structure: s.structure,
                })
            }
            Step::AddMark(s) => Step::RemoveMark(RemoveMarkStep {
                from: s.from,
                to: s.to,
                mark: s.mark.clone(),
            }),
            Step::RemoveMark(s) => Step::AddMark(AddMarkStep {
                from: s.from,
                to: s.to,
                mark: s.mark.clone(),
            }),
            Step::AddNodeMark(s) => {
                let node = doc_before.node_at(s.pos).expect("node exists before invert");
                match node.marks().iter().find(|m| m.type_ == s.mark.type_) {
                    Some(existing) => Step::AddNodeMark(AddNodeMarkStep {
                        pos: s.pos,
                        mark: existing.clone(),
                    }),
                    None => Step::RemoveNodeMark(RemoveNodeMarkStep {
                        pos: s.pos,
                        mark: s.mark.clone(),
                    }),
                }
            }
            Step::RemoveNodeMark(s) => {
                let node = doc_before.node_at(s.pos).expect("node exists before invert");
                if s.mark.is_in_set(node.marks()) {
                    Step::AddNodeMark(AddNodeMarkStep {
                        pos: s.pos,
                        mark: s.mark.clone(),
                    })
                } else {
                    Step::RemoveNodeMark(s.clone())
                }
            }
            Step::Attr(s) => {
                let node = doc_before.node_at(s.pos).expect("node exists before invert");
                let original = node.attrs().get(&s.attr).cloned().unwrap_or(Value::Null);
                Step::Attr(AttrStep {
                    pos: s.pos,
                    attr: s.attr.clone(),
                    value: original,
                })
            }
            Step::DocAttr(s) => {
                let original = doc_before.attrs().get(&s.attr).cloned().unwrap_or(Value::Null);
                Step::DocAttr(DocAttrStep {
                    attr: s.attr.clone(),
                    value: original,
                })
            }
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(s) => StepMap::new(vec![s.from, s.to - s.from, s.slice.size()]),
            Step::ReplaceAround(s) => StepMap::new(vec![
                s.from,
                s.gap_from - s.from,
                s.insert,
                s.gap_to,
                s.to - s.gap_to,
                s.slice.size() - s.insert,
            ]),
            _ => StepMap::empty(),
        }
    }

    pub fn map(&self, mapping: &Mapping) -> Option<Step> {
        match self {
            Step::Replace(s) => {
                let from = mapping.map_result(s.from, 1);
                let to = mapping.map_result(s.to, -1);
                if from.deleted_across() && to.deleted_across() {
                    return None;
                }
                Some(Step::Replace(ReplaceStep {
                    from: from.pos,
                    to: from.pos.max(to.pos),
                    slice: s.slice.clone(),
                    structure: s.structure,
                }))
            }
            Step::ReplaceAround(s) => {
                let from = mapping.map_result(s.from, 1);
                let to = mapping.map_result(s.to, -1);
                let gap_from = mapping.map(s.gap_from, -1);
                let gap_to = mapping.map(s.gap_to, 1);
                if (from.deleted_across() && to.deleted_across()) || gap_from < from.pos || gap_to > to.pos {
                    return None;
                }
                Some(Step::ReplaceAround(ReplaceAroundStep {
                    from: from.pos,
                    to: to.pos,
                    gap_from,
                    gap_to,
                    slice: s.slice.clone(),
                    insert: s.insert,
                    structure: s.structure,
                }))
            }
            Step::AddMark(s) => {
                let from = mapping.map(s.from, 1);
                let to = mapping.map(s.to, -1);
                if from >= to {
                    None
                } else {
                    Some(Step::AddMark(AddMarkStep {
                        from,
                        to,
                        mark: s.mark.clone(),
                    }))
                }
            }
            Step::RemoveMark(s) => {
                let from = mapping.map(s.from, 1);
                let to = mapping.map(s.to, -1);
                if from >= to {
                    None
                } else {
                    Some(Step::RemoveMark(RemoveMarkStep {
                        from,
                        to,
                        mark: s.mark.clone(),
                    }))
                }
            }
            Step::AddNodeMark(s) => {
                let result = mapping.map_result(s.pos, 1);
                if result.deleted() {
                    None
                } else {
                    Some(Step::AddNodeMark(AddNodeMarkStep {
                        pos: result.pos,
                        mark: s.mark.clone(),
                    }))
                }
            }
            Step::RemoveNodeMark(s) => {
                let result = mapping.map_result(s.pos, 1);
                if result.deleted() {
                    None
                } else {
                    Some(Step::RemoveNodeMark(RemoveNodeMarkStep {
                        pos: result.pos,
                        mark: s.mark.clone(),
                    }))
                }
            }
            Step::Attr(s) => {
                let result = mapping.map_result(s.pos, 1);
                if result.deleted() {
                    None
                } else {
                    Some(Step::Attr(AttrStep {
                        pos: result.pos,
                        attr: s.attr.clone(),
                        value: s.value.clone(),
                    }))
                }
            }
            Step::DocAttr(s) => Some(Step::DocAttr(s.clone())),
        }
    }

    /// Attempts to merge `other` onto the end of `self`, e.g. two adjacent
    /// character insertions during a typing burst. Used exclusively by the
    /// history engine to collapse such bursts into one undoable step.
    pub fn merge(&self, other: &Step) -> Option<Step> {
        match (self, other) {
            (Step::Replace(a), Step::Replace(b)) => {
                if a.structure || b.structure {
                    return None;
                }
                if a.to == b.from && b.slice.open_start() == 0 && a.slice.open_end() == 0 {
                    let content = a.slice.content().append(b.slice.content());
                    Some(Step::Replace(ReplaceStep {
                        from: a.from,
                        to: a.to + (b.to - b.from),
                        slice: Slice::new(content, a.slice.open_start(), b.slice.open_end()),
                        structure: false,
                    }))
                } else {
                    None
                }
            }
            (Step::AddMark(a), Step::AddMark(b)) if a.mark == b.mark && a.to >= b.from => Some(Step::AddMark(AddMarkStep {
                from: a.from.min(b.from),
                to: a.to.max(b.to),
                mark: a.mark.clone(),
            })),
            (Step::RemoveMark(a), Step::RemoveMark(b)) if a.mark == b.mark && a.to >= b.from => {
                Some(Step::RemoveMark(RemoveMarkStep {
                    from: a.from.min(b.from),
                    to: a.to.max(b.to),
                    mark: a.mark.clone(),
                }))
            }
            _ => None,
        }
    }

    pub fn step_type(&self) -> &'static str {
        match self {
            Step::Replace(_) => "replace",
            Step::ReplaceAround(_) => "replaceAround",
            Step::AddMark(_) => "addMark",
            Step::RemoveMark(_) => "removeMark",
            Step::AddNodeMark(_) => "addNodeMark",
            Step::RemoveNodeMark(_) => "removeNodeMark",
            Step::Attr(_) => "attr",
            Step::DocAttr(_) => "docAttr",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String(self.step_type().into()));
        match self {
            Step::Replace(s) => {
                obj.insert("from".into(), s.from.into());
                obj.insert("to".into(), s.to.into());
                if !s.slice.is_empty() {
                    obj.insert("slice".into(), slice_to_json(&s.slice));
                }
                if s.structure {
                    obj.insert("structure".into(), Value::Bool(true));
                }
            }
            Step::ReplaceAround(s) => {
                obj.insert("from".into(), s.from.into());
                obj.insert("to".into(), s.to.into());
                obj.insert("gapFrom".into(), s.gap_from.into());
                obj.insert("gapTo".into(), s.gap_to.into());
                obj.insert("insert".into(), s.insert.into());
                if !s.slice.is_empty() {
                    obj.insert("slice".into(), slice_to_json(&s.slice));
                }
                if s.structure {
                    obj.insert("structure".into(), Value::Bool(true));
                }
            }
            Step::AddMark(s) => {
                obj.insert("from".into(), s.from.into());
                obj.insert("to".into(), s.to.into());
                obj.insert("mark".into(), s.mark.to_json());
            }
            Step::RemoveMark(s) => {
                obj.insert("from".into(), s.from.into());
                obj.insert("to".into(), s.to.into());
                obj.insert("mark".into(), s.mark.to_json());
            }
            Step::AddNodeMark(s) => {
                obj.insert("pos".into(), s.pos.into());
                obj.insert("mark".into(), s.mark.to_json());
            }
            Step::RemoveNodeMark(s) => {
                obj.insert("pos".into(), s.pos.into());
                obj.insert("mark".into(), s.mark.to_json());
            }
            Step::Attr(s) => {
                obj.insert("pos".into(), s.pos.into());
                obj.insert("attr".into(), Value::String(s.attr.clone()));
                obj.insert("value".into(), s.value.clone());
            }
            Step::DocAttr(s) => {
                obj.insert("attr".into(), Value::String(s.attr.clone()));
                obj.insert("value".into(), s.value.clone());
            }
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Step, RangeError> {
        let obj = json
            .as_object()
            .ok_or_else(|| RangeError::InvalidJson("step is not an object".into()))?;
        let step_type = obj
            .get("stepType")
            .and_then(Value::as_str)
            .ok_or_else(|| RangeError::InvalidJson("step missing \"stepType\"".into()))?;
        let ctor = STEP_REGISTRY
            .get(step_type)
            .ok_or_else(|| RangeError::UnknownStepType(step_type.to_string()))?;
        ctor(schema, obj)
    }
}

fn slice_to_json(slice: &Slice) -> Value {
    let mut obj = Map::new();
    if !slice.content().is_empty() {
        obj.insert(
            "content".into(),
            Value::Array(slice.content().children().iter().map(Node::to_json).collect()),
        );
    }
    if slice.open_start() > 0 {
        obj.insert("openStart".into(), slice.open_start().into());
    }
    if slice.open_end() > 0 {
        obj.insert("openEnd".into(), slice.open_end().into());
    }
    Value::Object(obj)
}

fn slice_from_json(schema: &Schema, json: Option<&Value>) -> Result<Slice, RangeError> {
    let Some(Value::Object(obj)) = json else {
        return Ok(Slice::empty());
    };
    let open_start = obj.get("openStart").and_then(Value::as_u64).unwrap_or(0) as usize;
    let open_end = obj.get("openEnd").and_then(Value::as_u64).unwrap_or(0) as usize;
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
    Ok(Slice::new(content, open_start, open_end))
}

fn get_usize(obj: &Map<String, Value>, key: &str) -> Result<usize, RangeError> {
    obj.get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| RangeError::InvalidJson(format!("step missing numeric field {key:?}")))
}

fn get_mark(schema: &Schema, obj: &Map<String, Value>) -> Result<Mark, RangeError> {
    let mark_json = obj
        .get("mark")
        .ok_or_else(|| RangeError::InvalidJson("step missing \"mark\"".into()))?;
    let type_name = mark_json
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RangeError::InvalidJson("mark missing \"type\"".into()))?;
    let type_ = schema
        .mark_type(type_name)
        .ok_or_else(|| RangeError::InvalidJson(format!("unknown mark type {type_name:?}")))?
        .clone();
    let attrs = match mark_json.get("attrs") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    Mark::new(type_, attrs).map_err(|e| RangeError::InvalidJson(e.to_string()))
}

type StepCtor = fn(&Schema, &Map<String, Value>) -> Result<Step, RangeError>;

static STEP_REGISTRY: Lazy<HashMap<&'static str, StepCtor>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, StepCtor> = HashMap::new();
    m.insert("replace", |schema, obj| {
        Ok(Step::Replace(ReplaceStep {
            from: get_usize(obj, "from")?,
            to: get_usize(obj, "to")?,
            slice: slice_from_json(schema, obj.get("slice"))?,
            structure: obj.get("structure").and_then(Value::as_bool).unwrap_or(false),
        }))
    });
    m.insert("replaceAround", |schema, obj| {
        Ok(Step::ReplaceAround(ReplaceAroundStep {
            from: get_usize(obj, "from")?,
            to: get_usize(obj, "to")?,
            gap_from: get_usize(obj, "gapFrom")?,
            gap_to: get_usize(obj, "gapTo")?,
            insert: get_usize(obj, "insert")?,
            slice: slice_from_json(schema, obj.get("slice"))?,
            structure: obj.get("structure").and_then(Value::as_bool).unwrap_or(false),
        }))
    });
    m.insert("addMark", |schema, obj| {
        Ok(Step::AddMark(AddMarkStep {
            from: get_usize(obj, "from")?,
            to: get_usize(obj, "to")?,
            mark: get_mark(schema, obj)?,
        }))
    });
    m.insert("removeMark", |schema, obj| {
        Ok(Step::RemoveMark(RemoveMarkStep {
            from: get_usize(obj, "from")?,
            to: get_usize(obj, "to")?,
            mark: get_mark(schema, obj)?,
        }))
    });
    m.insert("addNodeMark", |schema, obj| {
        Ok(Step::AddNodeMark(AddNodeMarkStep {
            pos: get_usize(obj, "pos")?,
            mark: get_mark(schema, obj)?,
        }))
    });
    m.insert("removeNodeMark", |schema, obj| {
        Ok(Step::RemoveNodeMark(RemoveNodeMarkStep {
            pos: get_usize(obj, "pos")?,
            mark: get_mark(schema, obj)?,
        }))
    });
    m.insert("attr", |_schema, obj| {
        Ok(Step::Attr(AttrStep {
            pos: get_usize(obj, "pos")?,
            attr: obj
                .get("attr")
                .and_then(Value::as_str)
                .ok_or_else(|| RangeError::InvalidJson("attr step missing \"attr\"".into()))?
                .to_string(),
            value: obj.get("value").cloned().unwrap_or(Value::Null),
        }))
    });
    m.insert("docAttr", |_schema, obj| {
        Ok(Step::DocAttr(DocAttrStep {
            attr: obj
                .get("attr")
                .and_then(Value::as_str)
                .ok_or_else(|| RangeError::InvalidJson("docAttr step missing \"attr\"".into()))?
                .to_string(),
            value: obj.get("value").cloned().unwrap_or(Value::Null),
        }))
    });
    m
});

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::{test_doc_hello_world, test_schema};

    #[test]
    fn replace_step_invert_round_trips() {
        let doc = test_doc_hello_world();
        let schema = test_schema();
        let text = Node::text(&schema, "!".into(), Default::default()).unwrap();
        let step = Step::Replace(ReplaceStep {
            from: 1,
            to: 1,
            slice: Slice::new(Fragment::from_single(text), 0, 0),
            structure: false,
        });
        let applied = step.apply(&doc);
        let new_doc = applied.doc.unwrap();
        let inverse = step.invert(&doc);
        let restored = inverse.apply(&new_doc).doc.unwrap();
        assert_eq!(doc, restored);
    }

    #[test]
    fn add_mark_then_invert_restores_doc() {
        let doc = test_doc_hello_world();
        let schema = test_schema();
        let em = schema.mark_type("em").unwrap().clone();
        let mark = Mark::new(em, Default::default()).unwrap();
        let step = Step::AddMark(AddMarkStep { from: 1, to: 6, mark });
        let new_doc = step.apply(&doc).doc.unwrap();
        let inverse = step.invert(&doc);
        let restored = inverse.apply(&new_doc).doc.unwrap();
        assert_eq!(doc, restored);
    }

    #[test]
    fn step_json_round_trips() {
        let schema = test_schema();
        let text = Node::text(&schema, "!".into(), Default::default()).unwrap();
        let step = Step::Replace(ReplaceStep {
            from: 1,
            to: 1,
            slice: Slice::new(Fragment::from_single(text), 0, 0),
            structure: false,
        });
        let json = step.to_json();
        let back = Step::from_json(&schema, &json).unwrap();
        assert_eq!(step.step_type(), back.step_type());
    }
}
