//! Slice: a fragment plus open-depth numbers on each side, and the
//! document `replace` algorithm that grafts a slice's open boundaries onto
//! surrounding content.
//!
//! The join algorithm (`replace_two_way`/`replace_three_way`/`add_range`)
//! is a direct port of the structural-replace recursion used throughout
//! the ecosystem's document-model implementations: descend while both
//! endpoints pick the same child, then splice the differing region
//! three-way (left context, slice content, right context), closing each
//! open boundary by joining it onto the matching ancestor. No Fitter is
//! implemented for shaping non-trivial paste slices -- the design notes
//! call that out as an open question with no prescribed algorithm, so
//! `Transform::replace` callers are expected to pre-shape slices that must
//! join cleanly.

use crate::error::ReplaceError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::resolved_pos::ResolvedPos;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Slice {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Slice {
            content: Fragment::empty(),
            open_start: 0,
            open_end: 0,
        }
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }
    pub fn open_start(&self) -> usize {
        self.open_start
    }
    pub fn open_end(&self) -> usize {
        self.open_end
    }
    pub fn size(&self) -> usize {
        self.content.size() - self.open_start - self.open_end
    }
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

pub fn node_slice(doc: &Node, from: usize, to: usize) -> Slice {
    let r_from = ResolvedPos::resolve(doc, from).expect("from in range");
    let r_to = ResolvedPos::resolve(doc, to).expect("to in range");
    let depth = r_from.shared_depth(to);
    let start = r_from.start(depth);
    let node = r_from.node(depth);
    let content = node.content().cut(r_from.pos() - start, r_to.pos() - start);
    Slice::new(content, r_from.depth() - depth, r_to.depth() - depth)
}

pub fn replace_range(doc: &Node, from: usize, to: usize, slice: &Slice) -> Result<Node, ReplaceError> {
    let r_from = ResolvedPos::resolve(doc, from).map_err(|e| ReplaceError(e.to_string()))?;
    let r_to = ResolvedPos::resolve(doc, to).map_err(|e| ReplaceError(e.to_string()))?;
    if slice.open_start > r_from.depth() {
        return Err(ReplaceError("inserted content deeper than insertion position".into()));
    }
    if r_from.depth() as isize - slice.open_start as isize != r_to.depth() as isize - slice.open_end as isize {
        return Err(ReplaceError("inconsistent open depths".into()));
    }
    replace_outer(&r_from, &r_to, slice, 0)
}

fn replace_outer(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice, depth: usize) -> Result<Node, ReplaceError> {
    let index = from.index(depth);
    let node = from.node(depth).clone();
    if index == to.index(depth) && depth < from.depth().saturating_sub(slice.open_start) {
        let inner = replace_outer(from, to, slice, depth + 1)?;
        return Ok(node.with_content(node.content().replace_child(index, inner)));
    }
    if slice.content.size() > 0 {
        let (start, end) = prepare_slice_for_replace(slice, from)?;
        let content = replace_three_way(from, &start, &end, to, depth)?;
        close(&node, content)
    } else {
        let content = replace_two_way(from, to, depth)?;
        close(&node, content)
    }
}

fn close(node: &Node, content: Fragment) -> Result<Node, ReplaceError> {
    let candidate = node.with_content(content);
    candidate
        .check()
        .map_err(|e| ReplaceError(e.to_string()))?;
    Ok(candidate)
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ReplaceError> {
    if !sub.type_().compatible_content(main.type_()) {
        return Err(ReplaceError(format!(
            "cannot join {} onto {}",
            sub.type_().name(),
            main.type_().name()
        )));
    }
    Ok(())
}

fn joinable<'a>(before: &'a ResolvedPos, after: &ResolvedPos, depth: usize) -> Result<&'a Node, ReplaceError> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node)
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    if let Some(last) = target.last_mut() {
        if child.is_text() && last.is_text() && child.same_markup(last) {
            *last = last.with_text(format!("{}{}", last.text().unwrap(), child.text().unwrap()));
            return;
        }
    }
    target.push(child);
}

fn add_range(start: Option<&ResolvedPos>, end: Option<&ResolvedPos>, depth: usize, target: &mut Vec<Node>) {
    let node = end.or(start).expect("addRange needs at least one endpoint").node(depth);
    let mut start_index = 0usize;
    let end_index = end.map(|e| e.index(depth)).unwrap_or_else(|| node.content().child_count());
    if let Some(s) = start {
        start_index = s.index(depth);
        if s.depth() > depth {
            start_index += 1;
        } else if s.text_offset() > 0 {
            if let Some(after) = s.node_after() {
                add_node(after.clone(), target);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.content().child(i).clone(), target);
    }
    if let Some(e) = end {
        if e.depth() == depth && e.text_offset() > 0 {
            if let Some(before) = e.node_before() {
                add_node(before.clone(), target);
            }
        }
    }
}

fn replace_three_way(
    from: &ResolvedPos,
    start: &ResolvedPos,
    end: &ResolvedPos,
    to: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let open_start = if from.depth() > depth {
        Some(joinable(from, start, depth + 1)?)
    } else {
        None
    };
    let open_end = if to.depth() > depth {
        Some(joinable(end, to, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);

    if let (Some(os), Some(oe)) = (open_start, open_end) {
        if start.index(depth) == end.index(depth) {
            check_join(os, oe)?;
            let inner = replace_three_way(from, start, end, to, depth + 1)?;
            add_node(close(os, inner)?, &mut content);
            add_range(Some(to), None, depth, &mut content);
            return Ok(Fragment::from_array(content));
        }
    }
    if let Some(os) = open_start {
        let inner = replace_two_way(from, start, depth + 1)?;
        add_node(close(os, inner)?, &mut content);
    }
    add_range(Some(start), Some(end), depth, &mut content);
    if let Some(oe) = open_end {
        let inner = replace_two_way(end, to, depth + 1)?;
        add_node(close(oe, inner)?, &mut content);
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_array(content))
}

fn replace_two_way(from: &ResolvedPos, to: &ResolvedPos, depth: usize) -> Result<Fragment, ReplaceError> {
    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    if from.depth() > depth {
        let node = joinable(from, to, depth + 1)?;
        let inner = replace_two_way(from, to, depth + 1)?;
        add_node(close(node, inner)?, &mut content);
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_array(content))
}

/// Wraps the slice's content in the ancestor chain of `along` down to its
/// own open depth, then resolves the positions just inside that synthetic
/// subtree marking where the slice's un-open content begins/ends -- the
/// "start"/"end" resolved positions `replace_three_way` splices around.
fn prepare_slice_for_replace(slice: &Slice, along: &ResolvedPos) -> Result<(ResolvedPos, ResolvedPos), ReplaceError> {
    let extra = along.depth() - slice.open_start;
    let parent = along.node(extra);
    let mut node = parent.with_content(slice.content.clone());
    for i in (0..extra).rev() {
        node = along.node(i).with_content(Fragment::from_single(node));
    }
    let start_pos = slice.open_start + extra;
    let end_pos = node.content_size() - slice.open_end - extra;
    let start = ResolvedPos::resolve(&node, start_pos).map_err(|e| ReplaceError(e.to_string()))?;
    let end = ResolvedPos::resolve(&node, end_pos).map_err(|e| ReplaceError(e.to_string()))?;
    Ok((start, end))
}

/// Inserts a flat fragment into a slice's content at a content position,
/// honoring its open boundaries by descending to the open-start/open-end
/// edge the same way `replace` grafts document content.
pub fn insert_at(slice: &Slice, pos: usize, fragment: Fragment) -> Option<Slice> {
    let content = insert_into(&slice.content, pos + slice.open_start, fragment, None)?;
    Some(Slice::new(content, slice.open_start, slice.open_end))
}

fn insert_into(content: &Fragment, dist: usize, fragment: Fragment, parent: Option<&Node>) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist);
    let child_opt = if index < content.child_count() {
        Some(content.child(index).clone())
    } else {
        None
    };
    if offset == dist {
        let mut out = content.children()[..index].to_vec();
        out.extend(fragment.children().iter().cloned());
        out.extend(content.children()[index..].iter().cloned());
        return Some(Fragment::from_array(out));
    }
    let child = child_opt?;
    if !child.is_text() && !child.is_leaf_like() {
        let inner = insert_into(child.content(), dist - offset - 1, fragment, Some(&child))?;
        return Some(content.replace_child(index, child.with_content(inner)));
    }
    let _ = parent;
    None
}

/// Removes a flat range `[from, to)` (content-relative) from a slice.
pub fn remove_between(slice: &Slice, from: usize, to: usize) -> Slice {
    let content = slice.content.cut(0, from).append(&slice.content.cut(to, slice.content.size()));
    Slice::new(content, slice.open_start, slice.open_end)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::test_doc;

    #[test]
    fn flat_slice_round_trip_via_replace() {
        let doc = test_doc();
        let slice = doc.slice(2, 4);
        let restored = doc.replace(2, 4, &slice).unwrap();
        assert_eq!(doc, restored);
    }

    #[test]
    fn empty_slice_deletes_range() {
        let doc = test_doc();
        let before_size = doc.content_size();
        let replaced = doc.replace(1, 2, &Slice::empty()).unwrap();
        assert_eq!(replaced.content_size(), before_size - 1);
    }
}
