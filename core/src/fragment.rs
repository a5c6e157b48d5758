//! Fragment: an ordered, persistent sequence of sibling nodes with a cached
//! total size.
//!
//! Mirrors `helix-core`'s `Rope`/`ChangeSet` preference for an owned,
//! reference-counted backing slice over a linked structure -- a `Fragment`
//! is `Arc<[Node]>` plus a cached size, so cloning a `Fragment` is an
//! `Arc` bump, never a deep copy.

use std::sync::Arc;

use crate::node::Node;

#[derive(Debug, Clone)]
pub struct Fragment {
    content: Arc<[Node]>,
    size: usize,
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.content.len() == other.content.len()
            && self
                .content
                .iter()
                .zip(other.content.iter())
                .all(|(a, b)| a.eq(b))
    }
}
impl Eq for Fragment {}

impl Default for Fragment {
    fn default() -> Self {
        Self::empty()
    }
}

impl Fragment {
    pub fn empty() -> Self {
        Fragment {
            content: Arc::from(Vec::new()),
            size: 0,
        }
    }

    /// Builds a fragment from children, coalescing adjacent text nodes that
    /// share a mark set (the invariant `fromArray`/`append` must uphold).
    pub fn from_array(nodes: Vec<Node>) -> Self {
        let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut size = 0usize;
        for node in nodes {
            size += node.node_size();
            if let (Some(last), true) = (out.last_mut(), node.is_text()) {
                if last.is_text() && last.same_markup(&node) {
                    *last = last.with_text(format!("{}{}", last.text().unwrap(), node.text().unwrap()));
                    continue;
                }
            }
            out.push(node);
        }
        Fragment {
            content: Arc::from(out),
            size,
        }
    }

    pub fn from_single(node: Node) -> Self {
        let size = node.node_size();
        Fragment {
            content: Arc::from(vec![node]),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child(&self, i: usize) -> &Node {
        &self.content[i]
    }

    pub fn children(&self) -> &[Node] {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn for_each(&self, mut f: impl FnMut(&Node, usize, usize)) {
        let mut pos = 0;
        for (i, child) in self.content.iter().enumerate() {
            f(child, pos, i);
            pos += child.node_size();
        }
    }

    /// Finds the child containing content-position `pos`. Returns the
    /// index and the start offset of that child, such that
    /// `offset <= pos <= offset + child.node_size()`.
    pub fn find_index(&self, pos: usize) -> (usize, usize) {
        if pos == 0 {
            return (0, 0);
        }
        let mut offset = 0usize;
        for (i, child) in self.content.iter().enumerate() {
            let end = offset + child.node_size();
            if end >= pos {
                return (i, offset);
            }
            offset = end;
        }
        (self.content.len(), offset)
    }

    pub fn append(&self, other: &Fragment) -> Fragment {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let last = self.content.last().unwrap();
        let first = &other.content[0];
        if last.is_text() && last.same_markup(first) {
            let joined = last.with_text(format!("{}{}", last.text().unwrap(), first.text().unwrap()));
            let mut out: Vec<Node> = Vec::with_capacity(self.content.len() + other.content.len() - 1);
            out.extend_from_slice(&self.content[..self.content.len() - 1]);
            out.push(joined);
            out.extend_from_slice(&other.content[1..]);
            Fragment {
                size: self.size + other.size,
                content: Arc::from(out),
            }
        } else {
            let mut out: Vec<Node> = Vec::with_capacity(self.content.len() + other.content.len());
            out.extend_from_slice(&self.content);
            out.extend_from_slice(&other.content);
            Fragment {
                size: self.size + other.size,
                content: Arc::from(out),
            }
        }
    }

    /// Cuts out the content between `from` and `to`, descending into
    /// partially covered children (text children by character index,
    /// non-text children by content position minus one, to skip the
    /// opening token).
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to == self.size {
            return self.clone();
        }
        let mut out = Vec::new();
        let mut pos = 0usize;
        for child in self.content.iter() {
            let child_end = pos + child.node_size();
            if child_end > from && pos < to {
                let child_from = from.saturating_sub(pos);
                let child_to = (to.min(child_end)) - pos;
                if child_from > 0 || child_to < child.node_size() {
                    if child.is_text() {
                        let text = child.text().unwrap();
                        let sliced: String = text.chars().skip(child_from).take(child_to - child_from).collect();
                        if !sliced.is_empty() {
                            out.push(child.with_text(sliced));
                        }
                    } else {
                        let inner_from = child_from.saturating_sub(1);
                        let inner_to = (child_to.saturating_sub(1)).min(child.content_size());
                        out.push(child.cut(inner_from, inner_to));
                    }
                } else {
                    out.push(child.clone());
                }
            }
            pos = child_end;
            if pos >= to {
                break;
            }
        }
        Fragment::from_array(out)
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut out: Vec<Node> = self.content.to_vec();
        out[index] = node;
        Fragment::from_array(out)
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        Fragment::from_single(node).append(self)
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        self.append(&Fragment::from_single(node))
    }

    /// Pre-order traversal of `self` and descendants between `from`/`to`
    /// (positions relative to this fragment's start, offset by `node_start`
    /// in the callback). `f` returning `false` skips descending into that
    /// node's children.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        node_start: usize,
        f: &mut impl FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    ) {
        let mut pos = 0usize;
        for (i, child) in self.content.iter().enumerate() {
            let child_end = pos + child.node_size();
            if child_end > from && pos < to {
                let abs_start = node_start + pos;
                let descend = f(child, abs_start, None, i);
                if descend && !child.is_leaf_like() {
                    let inner_from = if from > pos + 1 { from - pos - 1 } else { 0 };
                    let inner_to = (to.saturating_sub(pos + 1)).min(child.content_size());
                    child
                        .content()
                        .nodes_between(inner_from, inner_to, abs_start + 1, f);
                }
            }
            pos = child_end;
            if pos >= to {
                break;
            }
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in self.content.iter() {
            out.push_str(&child.text_content());
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::Node;
    use crate::test_util::test_schema;

    #[test]
    fn coalesces_adjacent_text_with_same_marks() {
        let schema = test_schema();
        let a = Node::text(&schema, "foo".into(), Default::default()).unwrap();
        let b = Node::text(&schema, "bar".into(), Default::default()).unwrap();
        let frag = Fragment::from_array(vec![a, b]);
        assert_eq!(frag.child_count(), 1);
        assert_eq!(frag.child(0).text(), Some("foobar"));
    }

    #[test]
    fn find_index_locates_child_bounds() {
        let schema = test_schema();
        let a = Node::text(&schema, "foo".into(), Default::default()).unwrap();
        let para = schema
            .node_type("paragraph")
            .unwrap()
            .clone();
        let p = Node::new(para, Default::default(), Fragment::from_single(a), Default::default()).unwrap();
        let frag = Fragment::from_single(p);
        let (idx, off) = frag.find_index(2);
        assert_eq!((idx, off), (0, 0));
    }
}
