//! Transform: a builder that accumulates [`Step`]s on a starting document
//! and exposes the high-level editing operations every command is built
//! from.

use serde_json::{Map, Value};

use crate::error::TransformError;
use crate::fragment::Fragment;
use crate::mark::{Mark, MarkSet};
use crate::node::Node;
use crate::resolved_pos::{NodeRange, ResolvedPos};
use crate::schema::{NodeType, Schema};
use crate::slice::Slice;
use crate::step::{
    AddMarkStep, AddNodeMarkStep, AttrStep, DocAttrStep, Mapping, RemoveMarkStep, RemoveNodeMarkStep, ReplaceAroundStep,
    ReplaceStep, Step, StepResult,
};

pub struct Transform {
    schema: Schema,
    pub doc: Node,
    pub steps: Vec<Step>,
    pub docs: Vec<Node>,
    pub mapping: Mapping,
}

impl Transform {
    pub fn new(schema: Schema, doc: Node) -> Self {
        Transform {
            schema,
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Applies `s` to the current document, appending it on success.
    /// Returns `TransformError` (rather than panicking) on failure so
    /// callers needing a non-throwing variant use [`Transform::maybe_step`]
    /// instead.
    pub fn step(&mut self, s: Step) -> Result<&mut Self, TransformError> {
        let result = s.apply(&self.doc);
        match result.doc {
            Some(new_doc) => {
                self.add_step(s, new_doc);
                Ok(self)
            }
            None => Err(TransformError(result.failed.unwrap_or_default())),
        }
    }

    pub fn maybe_step(&mut self, s: Step) -> StepResult {
        let result = s.apply(&self.doc);
        if let Some(new_doc) = result.doc.clone() {
            self.add_step(s, new_doc);
        }
        result
    }

    fn add_step(&mut self, s: Step, new_doc: Node) {
        self.docs.push(self.doc.clone());
        self.mapping.append_map(s.get_map());
        self.steps.push(s);
        self.doc = new_doc;
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self, TransformError> {
        self.step(Step::Replace(ReplaceStep {
            from,
            to,
            slice,
            structure: false,
        }))
    }

    pub fn replace_with(&mut self, from: usize, to: usize, content: Fragment) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::new(content, 0, 0))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::empty())
    }

    pub fn insert(&mut self, pos: usize, content: Fragment) -> Result<&mut Self, TransformError> {
        self.replace_with(pos, pos, content)
    }

    fn marks_at(&self, pos: usize) -> MarkSet {
        match ResolvedPos::resolve(&self.doc, pos) {
            Ok(r) => r.node_before().map(|n| n.marks().clone()).unwrap_or_default(),
            Err(_) => MarkSet::new(),
        }
    }

    pub fn insert_text(&mut self, text: &str, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        if text.is_empty() {
            return self.delete(from, to);
        }
        let marks = if from == to { self.marks_at(from) } else { MarkSet::new() };
        let node = Node::text(&self.schema, text.to_string(), marks).map_err(|e| TransformError(e.to_string()))?;
        self.replace_with(from, to, Fragment::from_single(node))
    }

    /// Adds `mark` across `[from, to)`. Inline nodes already carrying a
    /// mark of the same type with different attributes are stripped of it
    /// first (applied back-to-front, since mark steps carry an empty
    /// position map and so don't perturb later positions in the same
    /// batch).
    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        let mut conflicting = Vec::new();
        self.doc
            .content()
            .nodes_between(from, to, 0, &mut |node, start, _parent, _idx| {
                if node.is_leaf_like() {
                    if let Some(existing) = node.marks().iter().find(|m| m.type_ == mark.type_) {
                        if existing != &mark {
                            let lo = start.max(from);
                            let hi = (start + node.node_size()).min(to);
                            if lo < hi {
                                conflicting.push((lo, hi));
                            }
                        }
                    }
                }
                true
            });
        for (lo, hi) in conflicting.into_iter().rev() {
            self.step(Step::RemoveMark(RemoveMarkStep {
                from: lo,
                to: hi,
                mark: mark.clone(),
            }))?;
        }
        self.step(Step::AddMark(AddMarkStep { from, to, mark }))
    }

    pub fn remove_mark(&mut self, from: usize, to: usize, mark: Option<Mark>) -> Result<&mut Self, TransformError> {
        match mark {
            Some(m) => {
                self.step(Step::RemoveMark(RemoveMarkStep { from, to, mark: m }))?;
            }
            None => {
                let mut seen: Vec<Mark> = Vec::new();
                self.doc.content().nodes_between(from, to, 0, &mut |node, _s, _p, _i| {
                    for m in node.marks().iter() {
                        if !seen.contains(m) {
                            seen.push(m.clone());
                        }
                    }
                    true
                });
                for m in seen {
                    self.step(Step::RemoveMark(RemoveMarkStep { from, to, mark: m }))?;
                }
            }
        }
        Ok(self)
    }

    /// Unwraps the content of `range` from its immediate parent(s) up to
    /// `target` depth, emitting a single `ReplaceAround` whose slice wraps
    /// the untouched siblings before/after the range at `target` depth and
    /// whose gap is the range's own content.
    pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<&mut Self, TransformError> {
        let from = range.from();
        let to = range.to();
        let depth = range.depth();
        let gap_start = from.before(depth + 1);
        let gap_end = to.after(depth + 1);

        let mut start = gap_start;
        let mut before = Fragment::empty();
        let mut open_start = 0usize;
        let mut splitting = false;
        for d in (target + 1..=depth).rev() {
            if splitting || from.index(d) > 0 {
                splitting = true;
                before = Fragment::from_single(from.node(d).with_content(before));
                open_start += 1;
            } else {
                start -= 1;
            }
        }

        let mut end = gap_end;
        let mut after = Fragment::empty();
        let mut open_end = 0usize;
        splitting = false;
        for d in (target + 1..=depth).rev() {
            if splitting || to.after(d + 1) < to.end(d) {
                splitting = true;
                after = Fragment::from_single(to.node(d).with_content(after));
                open_end += 1;
            } else {
                end += 1;
            }
        }

        let slice_content = before.append(&after);
        let insert = before.size() - open_start;
        self.step(Step::ReplaceAround(ReplaceAroundStep {
            from: start,
            to: end,
            gap_from: gap_start,
            gap_to: gap_end,
            slice: Slice::new(slice_content, open_start, open_end),
            insert,
            structure: true,
        }))
    }

    /// Wraps `range` in `wrappers` (innermost last), as a single
    /// `ReplaceAround` whose gap holds the range's own content.
    pub fn wrap(&mut self, range: &NodeRange, wrappers: Vec<(NodeType, Map<String, Value>)>) -> Result<&mut Self, TransformError> {
        let mut content = Fragment::empty();
        for (type_, attrs) in wrappers.iter().rev() {
            if content.size() > 0 {
                let mut m = type_.content_match().clone();
                let mut ok = true;
                for child in content.children() {
                    match m.match_token(|tok| child.type_().matches_token(tok)) {
                        Some(next) => m = next,
                        None => {
                            ok = false;
                            break;
                        }
                    }
                }
                if !ok || !m.valid_end() {
                    return Err(TransformError(format!(
                        "wrapper type {:?} cannot hold its inner content",
                        type_.name()
                    )));
                }
            }
            let node = Node::new(type_.clone(), attrs.clone(), content, MarkSet::new())
                .map_err(|e| TransformError(e.to_string()))?;
            content = Fragment::from_single(node);
        }
        let start = range.start();
        let end = range.end();
        let insert = wrappers.len();
        self.step(Step::ReplaceAround(ReplaceAroundStep {
            from: start,
            to: end,
            gap_from: start,
            gap_to: end,
            slice: Slice::new(content, 0, 0),
            insert,
            structure: true,
        }))
    }

    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        node_type: &NodeType,
        attrs: Map<String, Value>,
    ) -> Result<&mut Self, TransformError> {
        if !node_type.is_textblock() {
            return Err(TransformError("type given to set_block_type should be a textblock".into()));
        }
        let map_from = self.mapping.total_len();
        let mut targets = Vec::new();
        self.doc.content().nodes_between(from, to, 0, &mut |node, pos, _parent, _idx| {
            if node.type_().is_textblock() && !(node.type_() == node_type && *node.attrs() == attrs) {
                targets.push((pos, node.node_size()));
            }
            true
        });
        for (pos, size) in targets {
            let sub = self.mapping.slice_from(map_from);
            let mapped_pos = sub.map(pos, 1);
            let mapped_end = sub.map(pos + size, 1);
            let node = self
                .doc
                .node_at(mapped_pos)
                .ok_or_else(|| TransformError("node vanished during set_block_type".into()))?
                .clone();
            let filtered_marks: MarkSet = node
                .marks()
                .iter()
                .filter(|m| node_type.allows_mark_type(&m.type_))
                .cloned()
                .collect();
            let new_node = Node::new(node_type.clone(), attrs.clone(), Fragment::empty(), filtered_marks)
                .map_err(|e| TransformError(e.to_string()))?;
            self.step(Step::ReplaceAround(ReplaceAroundStep {
                from: mapped_pos,
                to: mapped_end,
                gap_from: mapped_pos + 1,
                gap_to: mapped_end - 1,
                slice: Slice::new(Fragment::from_single(new_node), 0, 0),
                insert: 1,
                structure: true,
            }))?;
        }
        Ok(self)
    }

    pub fn set_node_markup(
        &mut self,
        pos: usize,
        node_type: Option<NodeType>,
        attrs: Option<Map<String, Value>>,
        marks: Option<MarkSet>,
    ) -> Result<&mut Self, TransformError> {
        let node = self
            .doc
            .node_at(pos)
            .ok_or_else(|| TransformError("no node at given position".into()))?
            .clone();
        let new_type = node_type.unwrap_or_else(|| node.type_().clone());
        let new_attrs = attrs.unwrap_or_else(|| node.attrs().clone());
        let new_marks = marks.unwrap_or_else(|| node.marks().clone());
        let size = node.node_size();
        if node.is_leaf() {
            let new_node = Node::new(new_type, new_attrs, Fragment::empty(), new_marks)
                .map_err(|e| TransformError(e.to_string()))?;
            self.step(Step::Replace(ReplaceStep {
                from: pos,
                to: pos + size,
                slice: Slice::new(Fragment::from_single(new_node), 0, 0),
                structure: true,
            }))
        } else {
            let new_node = Node::new(new_type, new_attrs, Fragment::empty(), new_marks)
                .map_err(|e| TransformError(e.to_string()))?;
            self.step(Step::ReplaceAround(ReplaceAroundStep {
                from: pos,
                to: pos + size,
                gap_from: pos + 1,
                gap_to: pos + size - 1,
                slice: Slice::new(Fragment::from_single(new_node), 0, 0),
                insert: 1,
                structure: true,
            }))
        }
    }

    pub fn split(&mut self, pos: usize, depth: usize, types_after: Option<Vec<(NodeType, Map<String, Value>)>>) -> Result<&mut Self, TransformError> {
        let r = ResolvedPos::resolve(&self.doc, pos).map_err(|e| TransformError(e.to_string()))?;
        let mut before = Fragment::empty();
        let mut after = Fragment::empty();
        let top = r.depth();
        let bottom = top.saturating_sub(depth);
        // `step` counts how many levels we've unwound so far, innermost
        // first -- it indexes `types_after` back-to-front to match.
        for (step, d) in (bottom + 1..=top).rev().enumerate() {
            before = Fragment::from_single(r.node(d).with_content(before));
            let type_after = types_after.as_ref().and_then(|v| v.len().checked_sub(1 + step).and_then(|i| v.get(i)));
            after = match type_after {
                Some((ty, at)) => {
                    let node = Node::new(ty.clone(), at.clone(), after, MarkSet::new())
                        .map_err(|e| TransformError(e.to_string()))?;
                    Fragment::from_single(node)
                }
                None => Fragment::from_single(r.node(d).with_content(after)),
            };
        }
        let content = before.append(&after);
        self.step(Step::Replace(ReplaceStep {
            from: pos,
            to: pos,
            slice: Slice::new(content, depth, depth),
            structure: true,
        }))
    }

    pub fn join(&mut self, pos: usize, depth: usize) -> Result<&mut Self, TransformError> {
        self.step(Step::Replace(ReplaceStep {
            from: pos - depth,
            to: pos + depth,
            slice: Slice::empty(),
            structure: true,
        }))
    }

    pub fn add_node_mark(&mut self, pos: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        self.step(Step::AddNodeMark(AddNodeMarkStep { pos, mark }))
    }

    pub fn remove_node_mark(&mut self, pos: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        self.step(Step::RemoveNodeMark(RemoveNodeMarkStep { pos, mark }))
    }

    pub fn set_attr(&mut self, pos: usize, attr: impl Into<String>, value: Value) -> Result<&mut Self, TransformError> {
        self.step(Step::Attr(AttrStep {
            pos,
            attr: attr.into(),
            value,
        }))
    }

    pub fn set_doc_attr(&mut self, attr: impl Into<String>, value: Value) -> Result<&mut Self, TransformError> {
        self.step(Step::DocAttr(DocAttrStep {
            attr: attr.into(),
            value,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::{test_doc_hello_world, test_schema};

    #[test]
    fn insert_text_then_delete_round_trips() {
        let schema = test_schema();
        let doc = test_doc_hello_world();
        let mut tr = Transform::new(schema, doc.clone());
        tr.insert_text("!", 12, 12).unwrap();
        assert_eq!(tr.doc.text_content(), "hello world!");
        tr.delete(12, 13).unwrap();
        assert_eq!(tr.doc, doc);
    }

    #[test]
    fn add_mark_marks_inline_range() {
        let schema = test_schema();
        let doc = test_doc_hello_world();
        let em = schema.mark_type("em").unwrap().clone();
        let mark = Mark::new(em, Default::default()).unwrap();
        let mut tr = Transform::new(schema, doc);
        tr.add_mark(1, 12, mark.clone()).unwrap();
        let text_node = tr.doc.content().child(0).content().child(0);
        assert!(mark.is_in_set(text_node.marks()));
    }

    #[test]
    fn split_then_join_round_trips() {
        let schema = test_schema();
        let doc = test_doc_hello_world();
        let mut tr = Transform::new(schema, doc.clone());
        tr.split(6, 1, None).unwrap();
        assert_eq!(tr.doc.content().child_count(), 2);
        tr.join(7, 1).unwrap();
        assert_eq!(tr.doc, doc);
    }
}
