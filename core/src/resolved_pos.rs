//! Position resolution: turning an integer document offset into a full
//! ancestor chain ([`ResolvedPos`]), plus [`NodeRange`] (a pair of resolved
//! positions known to share an ancestor) and a small resolution cache.

use std::collections::VecDeque;

use crate::error::RangeError;
use crate::node::Node;

#[derive(Debug, Clone)]
struct PathLevel {
    node: Node,
    /// Absolute position of the first content position inside `node`.
    start: usize,
    /// Child index at/after the resolved position, within `node`.
    index: usize,
    /// Offset (local to `node`'s content) of the start of that child.
    local_offset: usize,
}

/// An integer position together with its full ancestor chain. Immutable;
/// cheap to clone since every `Node` it holds is itself `Arc`-backed.
#[derive(Debug, Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathLevel>,
    parent_offset: usize,
    text_offset: usize,
}

impl ResolvedPos {
    pub fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos, RangeError> {
        if pos > doc.content_size() {
            return Err(RangeError::PositionOutOfRange {
                pos,
                max: doc.content_size(),
            });
        }
        let mut path = Vec::new();
        let mut node = doc.clone();
        let mut parent_offset = pos;
        let mut start = 0usize;

        loop {
            let (index, offset) = node.content().find_index(parent_offset);
            path.push(PathLevel {
                node: node.clone(),
                start,
                index,
                local_offset: offset,
            });
            if parent_offset == offset {
                break;
            }
            if index >= node.content().child_count() {
                break;
            }
            let child = node.content().child(index).clone();
            if child.is_leaf_like() {
                break;
            }
            start += offset + 1;
            parent_offset -= offset + 1;
            node = child;
        }

        let last = path.last().unwrap();
        let text_offset = if last.index < last.node.content().child_count() {
            let child = last.node.content().child(last.index);
            if child.is_text() {
                parent_offset - last.local_offset
            } else {
                0
            }
        } else {
            0
        };

        Ok(ResolvedPos {
            pos,
            path,
            parent_offset,
            text_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn text_offset(&self) -> usize {
        self.text_offset
    }

    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    pub fn start(&self, depth: usize) -> usize {
        self.path[depth].start
    }

    pub fn end(&self, depth: usize) -> usize {
        self.path[depth].start + self.path[depth].node.content_size()
    }

    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Absolute position right before the opening token of the child that
    /// would be at depth `depth + 1` (i.e. the node containing `pos` one
    /// level deeper than `depth`).
    pub fn before(&self, depth: usize) -> usize {
        if depth == 0 {
            return 0;
        }
        let parent = &self.path[depth - 1];
        parent.start + parent.local_offset
    }

    pub fn after(&self, depth: usize) -> usize {
        if depth == 0 {
            return self.path[0].node.content_size();
        }
        let parent = &self.path[depth - 1];
        let child = parent.node.content().child(parent.index);
        parent.start + parent.local_offset + child.node_size()
    }

    pub fn node_before(&self) -> Option<&Node> {
        let last = self.path.last().unwrap();
        if self.text_offset > 0 {
            return Some(last.node.content().child(last.index));
        }
        if last.index == 0 {
            None
        } else {
            Some(last.node.content().child(last.index - 1))
        }
    }

    pub fn node_after(&self) -> Option<&Node> {
        let last = self.path.last().unwrap();
        let at_boundary = self.parent_offset == last.local_offset || self.text_offset > 0;
        if at_boundary && last.index < last.node.content().child_count() {
            Some(last.node.content().child(last.index))
        } else {
            None
        }
    }

    /// Deepest depth containing position `other` as well as `self`.
    pub fn shared_depth(&self, other: usize) -> usize {
        for d in (0..=self.depth()).rev() {
            if self.start(d) <= other && other <= self.end(d) {
                return d;
            }
        }
        0
    }

    /// Finds the shallowest depth at which both `self` and `other` lie
    /// inside the same node and (if given) `pred` accepts that node.
    /// Returns `None` if no such depth exists.
    pub fn block_range(&self, other: &ResolvedPos, pred: Option<&dyn Fn(&Node) -> bool>) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let max_depth = self.depth().min(other.shared_depth(self.pos));
        for d in (0..=max_depth).rev() {
            let node = self.node(d);
            if self.index(d) < other.index(d) || (d == self.depth() && d == other.depth()) {
                if pred.map(|p| p(node)).unwrap_or(true) {
                    return Some(NodeRange {
                        from: self.clone(),
                        to: other.clone(),
                        depth: d,
                    });
                }
            }
        }
        None
    }
}

/// A pair of resolved positions known to lie within a common ancestor at
/// `depth`, with convenience accessors for the start/end of that shared
/// range and the indices bounding it.
#[derive(Debug, Clone)]
pub struct NodeRange {
    from: ResolvedPos,
    to: ResolvedPos,
    depth: usize,
}

impl NodeRange {
    pub fn depth(&self) -> usize {
        self.depth
    }
    pub fn from(&self) -> &ResolvedPos {
        &self.from
    }
    pub fn to(&self) -> &ResolvedPos {
        &self.to
    }
    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1)
    }
    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1)
    }
    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }
    pub fn end_index(&self) -> usize {
        self.to.index(self.depth)
    }
    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }
}

/// A small fixed-capacity ring buffer caching recent `resolve` calls for a
/// single document revision. Not shared across revisions -- callers must
/// start a fresh cache (or `clear`) whenever `doc` changes, since entries
/// are keyed only by position, not document identity.
pub struct ResolveCache {
    entries: VecDeque<(usize, ResolvedPos)>,
    capacity: usize,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::with_capacity(12)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ResolveCache {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn resolve(&mut self, doc: &Node, pos: usize) -> Result<ResolvedPos, RangeError> {
        if let Some((_, cached)) = self.entries.iter().find(|(p, _)| *p == pos) {
            return Ok(cached.clone());
        }
        let resolved = ResolvedPos::resolve(doc, pos)?;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((pos, resolved.clone()));
        Ok(resolved)
    }
}

impl Default for ResolveCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fragment::Fragment;
    use crate::test_util::test_doc;

    #[test]
    fn resolve_round_trips_pos() {
        let doc = test_doc();
        for pos in 0..=doc.content_size() {
            let r = ResolvedPos::resolve(&doc, pos).unwrap();
            assert_eq!(r.pos(), pos);
        }
    }

    #[test]
    fn resolve_structural_bounds_hold() {
        let doc = test_doc();
        let r = ResolvedPos::resolve(&doc, 3).unwrap();
        for d in 0..=r.depth() {
            assert!(r.start(d) <= 3 && 3 <= r.end(d));
        }
    }

    #[test]
    fn out_of_range_position_errors() {
        let doc = test_doc();
        let err = ResolvedPos::resolve(&doc, doc.content_size() + 1).unwrap_err();
        assert!(matches!(err, RangeError::PositionOutOfRange { .. }));
    }

    #[test]
    fn cache_returns_consistent_results() {
        let doc = test_doc();
        let mut cache = ResolveCache::new();
        let a = cache.resolve(&doc, 3).unwrap();
        let b = cache.resolve(&doc, 3).unwrap();
        assert_eq!(a.pos(), b.pos());
        let _ = Fragment::empty();
    }
}
