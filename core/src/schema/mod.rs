//! Schema compilation: node types, mark types, and the content model that
//! validates nodes against them.
//!
//! Construction is two-phase to break the node-type/schema cycle (a
//! [`NodeType`] needs to resolve content-expression tokens against sibling
//! types, but those types live in the same [`Schema`] being built): phase
//! one builds every [`NodeType`]/[`MarkType`] descriptor with its content
//! expression left unparsed-but-stored, phase two (still inside
//! `Schema::compile`, before the `Schema` is handed back) parses every
//! expression and fills in `content_match`/`mark_set` now that the full
//! type table exists. See design note "Cyclic/interlinked objects".

pub mod content;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;
pub use content::ContentMatch;

pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
pub struct AttributeSpec {
    pub default: Option<Value>,
    pub validate: Option<Validator>,
}

impl AttributeSpec {
    pub fn required() -> Self {
        Self { default: None, validate: None }
    }

    pub fn with_default(value: Value) -> Self {
        Self { default: Some(value), validate: None }
    }
}

impl std::fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("default", &self.default)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// Input description of a node type, as supplied to [`Schema::compile`].
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    pub groups: Vec<String>,
    pub attrs: Vec<(String, AttributeSpec)>,
    /// Content expression, e.g. `"paragraph+ heading*"`. Empty means no content (a leaf).
    pub content: String,
    /// `None` = "all marks if inline content else none" (resolved during compile).
    /// `Some(vec![])` with the sentinel group `"_"` present means "all marks".
    pub marks: Option<Vec<String>>,
    pub is_leaf: bool,
    pub is_atom: bool,
    pub inline: bool,
    pub is_textblock: bool,
    pub is_linebreak_replacement: bool,
}

/// Input description of a mark type.
#[derive(Debug, Clone, Default)]
pub struct MarkSpec {
    pub attrs: Vec<(String, AttributeSpec)>,
    /// `None` = exclude only self (the default). `Some(vec![])` = exclude nothing.
    pub excludes: Option<Vec<String>>,
}

pub struct SchemaSpec {
    pub nodes: Vec<(String, NodeSpec)>,
    pub marks: Vec<(String, MarkSpec)>,
    pub top_node: String,
}

struct NodeTypeData {
    name: String,
    groups: Vec<String>,
    attrs: Vec<(String, AttributeSpec)>,
    content_expr: String,
    content_match: OnceCell<ContentMatch>,
    mark_set: OnceCell<Option<Vec<MarkType>>>,
    is_text: bool,
    is_leaf: bool,
    is_atom: bool,
    inline: bool,
    is_textblock: bool,
}

/// A node type, identity-compared within a schema (two `NodeType`s are
/// equal iff they're the same `Arc` allocation).
#[derive(Clone)]
pub struct NodeType(Arc<NodeTypeData>);

impl std::fmt::Debug for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NodeType").field(&self.0.name).finish()
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for NodeType {}

impl NodeType {
    pub fn name(&self) -> &str {
        &self.0.name
    }
    pub fn groups(&self) -> &[String] {
        &self.0.groups
    }
    pub fn attrs(&self) -> &[(String, AttributeSpec)] {
        &self.0.attrs
    }
    pub fn is_text(&self) -> bool {
        self.0.is_text
    }
    pub fn is_leaf(&self) -> bool {
        self.0.is_leaf
    }
    pub fn is_atom(&self) -> bool {
        self.0.is_atom || self.0.is_leaf
    }
    pub fn is_inline(&self) -> bool {
        self.0.inline
    }
    pub fn is_block(&self) -> bool {
        !self.0.inline
    }
    pub fn is_textblock(&self) -> bool {
        self.0.is_textblock
    }
    /// Whether this type can directly contain inline content. Aliases
    /// `is_textblock` -- this schema has no mixed block/inline container
    /// shape, so "allows inline content" and "is a textblock" coincide.
    pub fn has_inline_content(&self) -> bool {
        self.0.is_textblock
    }
    pub fn has_required_attrs(&self) -> bool {
        self.0.attrs.iter().any(|(_, spec)| spec.default.is_none())
    }
    /// Whether a node of `token` (a type name or group name) satisfies
    /// references to this type in content expressions.
    pub fn matches_token(&self, token: &str) -> bool {
        self.0.name == token || self.0.groups.iter().any(|g| g == token)
    }
    pub fn content_match(&self) -> &ContentMatch {
        self.0
            .content_match
            .get()
            .expect("NodeType content_match not compiled")
    }
    /// `None` means every mark is allowed.
    pub fn mark_set(&self) -> Option<&[MarkType]> {
        self.0
            .mark_set
            .get()
            .expect("NodeType mark_set not compiled")
            .as_deref()
    }
    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        match self.mark_set() {
            None => true,
            Some(allowed) => marks.iter().all(|m| allowed.contains(&m.type_)),
        }
    }
    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        match self.mark_set() {
            None => true,
            Some(allowed) => allowed.contains(mark_type),
        }
    }

    /// Whether content valid in `other` could plausibly also sit inside
    /// `self` -- the check `replace` uses when deciding whether two nodes
    /// at matching depths can be merged across a boundary.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other || self.content_match().compatible(other.content_match())
    }

    /// Whether a node of this type could directly hold a child of `target`.
    pub fn allows_type(&self, target: &NodeType) -> bool {
        self.content_match().allows_type(|tok| target.matches_token(tok))
    }

    /// Whether `fragment`, taken as a whole, is valid content for this
    /// type (every child accepted in order, mark sets honored, and the
    /// match left in a valid end state).
    pub fn valid_content(&self, fragment: &Fragment) -> bool {
        let mut m = self.content_match().clone();
        for child in fragment.children() {
            match m.match_token(|tok| child.type_().matches_token(tok)) {
                Some(next) => m = next,
                None => return false,
            }
            if !self.allows_marks(child.marks()) {
                return false;
            }
        }
        m.valid_end()
    }

    /// Finds a chain of node types (outermost first) that `target` could be
    /// wrapped in such that the result is valid content for `self`. An
    /// empty vec means `target` is already directly allowed; `None` means
    /// no chain up to a small bounded depth was found.
    ///
    /// Simplified relative to the source: explores wrapper candidates
    /// breadth-first up to depth 3 rather than the full fixed-point search,
    /// which is enough for the common "wrap paragraph in blockquote/list
    /// item" cases this crate's `Transform::wrap` drives.
    pub fn find_wrapping(&self, target: &NodeType, schema: &Schema) -> Option<Vec<NodeType>> {
        const MAX_DEPTH: usize = 3;
        if self.allows_type(target) {
            return Some(Vec::new());
        }
        let mut frontier: Vec<Vec<NodeType>> = vec![Vec::new()];
        for _ in 0..MAX_DEPTH {
            let mut next = Vec::new();
            for chain in &frontier {
                let innermost = chain.last().unwrap_or(self);
                for candidate in schema.node_types() {
                    if !innermost.allows_type(candidate) {
                        continue;
                    }
                    if candidate.allows_type(target) {
                        let mut found = chain.clone();
                        found.push(candidate.clone());
                        return Some(found);
                    }
                    let mut extended = chain.clone();
                    extended.push(candidate.clone());
                    next.push(extended);
                }
            }
            frontier = next;
        }
        None
    }

    /// The node type this content match would autofill with to satisfy a
    /// still-required term, if that type can be created with only default
    /// attributes. Drives `create_and_fill`.
    pub fn default_type(&self, schema: &Schema) -> Option<NodeType> {
        let token = self.content_match().next_required_token()?;
        schema
            .node_types()
            .find(|nt| nt.matches_token(token) && !nt.has_required_attrs())
            .cloned()
    }

}

struct MarkTypeData {
    name: String,
    rank: u32,
    attrs: Vec<(String, AttributeSpec)>,
    excluded: OnceCell<Vec<MarkType>>,
}

#[derive(Clone)]
pub struct MarkType(Arc<MarkTypeData>);

impl std::fmt::Debug for MarkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MarkType").field(&self.0.name).finish()
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for MarkType {}

impl MarkType {
    pub fn name(&self) -> &str {
        &self.0.name
    }
    pub fn rank(&self) -> u32 {
        self.0.rank
    }
    pub fn attrs(&self) -> &[(String, AttributeSpec)] {
        &self.0.attrs
    }
    pub fn excludes(&self, other: &MarkType) -> bool {
        self.0
            .excluded
            .get()
            .expect("MarkType excluded not compiled")
            .contains(other)
    }
}

impl std::hash::Hash for MarkType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

struct SchemaInner {
    nodes: HashMap<String, NodeType>,
    marks: HashMap<String, MarkType>,
    node_order: Vec<NodeType>,
    top_node: NodeType,
    linebreak_replacement: Option<NodeType>,
}

/// A compiled, immutable catalog of node and mark types. Cheap to clone
/// (reference-counted); every [`crate::node::Node`] built from it keeps it
/// alive so `NodeType`/`MarkType` identity comparisons stay valid.
#[derive(Clone)]
pub struct Schema(Arc<SchemaInner>);

impl Schema {
    pub fn compile(spec: SchemaSpec) -> Result<Schema, SchemaError> {
        let text_spec = spec
            .nodes
            .iter()
            .find(|(name, _)| name == "text")
            .ok_or(SchemaError::MissingTextNode)?;
        if !text_spec.1.attrs.is_empty() {
            return Err(SchemaError::TextNodeHasAttrs);
        }

        let mut nodes = HashMap::new();
        let mut node_order = Vec::new();
        let mut linebreak_replacement = None;
        for (name, node_spec) in &spec.nodes {
            if nodes.contains_key(name) {
                return Err(SchemaError::DuplicateNodeType(name.clone()));
            }
            let data = NodeTypeData {
                name: name.clone(),
                groups: node_spec.groups.clone(),
                attrs: node_spec.attrs.clone(),
                content_expr: node_spec.content.clone(),
                content_match: OnceCell::new(),
                mark_set: OnceCell::new(),
                is_text: name == "text",
                is_leaf: node_spec.is_leaf || node_spec.content.trim().is_empty(),
                is_atom: node_spec.is_atom,
                inline: node_spec.inline || name == "text",
                is_textblock: node_spec.is_textblock,
            };
            let node_type = NodeType(Arc::new(data));
            if node_spec.is_linebreak_replacement {
                if linebreak_replacement.is_some() {
                    return Err(SchemaError::MultipleLinebreakReplacements);
                }
                linebreak_replacement = Some(node_type.clone());
            }
            node_order.push(node_type.clone());
            nodes.insert(name.clone(), node_type);
        }

        let mut marks = HashMap::new();
        for (rank, (name, mark_spec)) in spec.marks.iter().enumerate() {
            if marks.contains_key(name) {
                return Err(SchemaError::DuplicateMarkType(name.clone()));
            }
            let data = MarkTypeData {
                name: name.clone(),
                rank: rank as u32,
                attrs: mark_spec.attrs.clone(),
                excluded: OnceCell::new(),
            };
            marks.insert(name.clone(), MarkType(Arc::new(data)));
        }

        let top_node = nodes
            .get(&spec.top_node)
            .cloned()
            .ok_or_else(|| SchemaError::MissingTopNode(spec.top_node.clone()))?;

        // Phase 2: resolve content expressions and mark sets now that every
        // type is known.
        for (name, node_spec) in &spec.nodes {
            let node_type = &nodes[name];
            let content_match = ContentMatch::from_schema_error(name, &node_spec.content)?;
            node_type
                .0
                .content_match
                .set(content_match)
                .unwrap_or_else(|_| unreachable!());

            let mark_set = resolve_mark_set(node_spec, &marks, name)?;
            node_type
                .0
                .mark_set
                .set(mark_set)
                .unwrap_or_else(|_| unreachable!());
        }

        for (name, mark_spec) in &spec.marks {
            let mark_type = &marks[name];
            let excluded = resolve_excludes(mark_spec, mark_type, &marks, name)?;
            mark_type
                .0
                .excluded
                .set(excluded)
                .unwrap_or_else(|_| unreachable!());
        }

        Ok(Schema(Arc::new(SchemaInner {
            nodes,
            marks,
            node_order,
            top_node,
            linebreak_replacement,
        })))
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.0.nodes.get(name)
    }
    pub fn mark_type(&self, name: &str) -> Option<&MarkType> {
        self.0.marks.get(name)
    }
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.0.node_order.iter()
    }
    pub fn mark_types(&self) -> impl Iterator<Item = &MarkType> {
        let mut v: Vec<_> = self.0.marks.values().collect();
        v.sort_by_key(|m| m.rank());
        v.into_iter()
    }
    pub fn top_node_type(&self) -> &NodeType {
        &self.0.top_node
    }
    pub fn text_node_type(&self) -> &NodeType {
        &self.0.nodes["text"]
    }
    pub fn linebreak_replacement(&self) -> Option<&NodeType> {
        self.0.linebreak_replacement.as_ref()
    }

    /// Builds an empty node of `node_type` and fills in required content
    /// (one child of its `default_type`, if any) until the content match
    /// is satisfied. Simplified relative to the source: only ever autofills
    /// a single additional child rather than iterating to a fixed point,
    /// and gives up (returning `None`) rather than trying progressively
    /// deeper fills.
    pub fn create_and_fill(&self, node_type: &NodeType, attrs: Map<String, Value>) -> Option<Node> {
        let empty = Node::new(node_type.clone(), attrs, Fragment::empty(), Default::default()).ok()?;
        if node_type.valid_content(empty.content()) {
            return Some(empty);
        }
        let filler = node_type.default_type(self)?;
        let child = self.create_and_fill(&filler, Map::new())?;
        let filled = empty.with_content(Fragment::from_single(child));
        if node_type.valid_content(filled.content()) {
            Some(filled)
        } else {
            None
        }
    }
}

fn resolve_mark_set(
    node_spec: &NodeSpec,
    marks: &HashMap<String, MarkType>,
    owner: &str,
) -> Result<Option<Vec<MarkType>>, SchemaError> {
    match &node_spec.marks {
        None => {
            if node_spec.is_textblock || node_spec.content.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Vec::new()))
            }
        }
        Some(names) if names.iter().any(|n| n == "_") => Ok(None),
        Some(names) if names.is_empty() => Ok(Some(Vec::new())),
        Some(names) => {
            let mut out = Vec::new();
            for name in names {
                match marks.get(name) {
                    Some(mt) => out.push(mt.clone()),
                    None => {
                        // allow group references by scanning all mark types
                        // sharing a group is not modeled for marks (marks
                        // have no group field in this schema), so an
                        // unresolved name is always an error.
                        let _ = owner;
                        return Err(SchemaError::UnknownMarkType(name.clone()));
                    }
                }
            }
            Ok(Some(out))
        }
    }
}

fn resolve_excludes(
    mark_spec: &MarkSpec,
    self_type: &MarkType,
    marks: &HashMap<String, MarkType>,
    owner: &str,
) -> Result<Vec<MarkType>, SchemaError> {
    match &mark_spec.excludes {
        None => Ok(vec![self_type.clone()]),
        Some(names) if names.is_empty() => Ok(Vec::new()),
        Some(names) => {
            let mut out = Vec::new();
            for name in names {
                match marks.get(name) {
                    Some(mt) => out.push(mt.clone()),
                    None => {
                        let _ = owner;
                        return Err(SchemaError::UnknownMarkType(name.clone()));
                    }
                }
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn doc_schema() -> Schema {
        Schema::compile(SchemaSpec {
            top_node: "doc".into(),
            nodes: vec![
                (
                    "doc".into(),
                    NodeSpec {
                        content: "block+".into(),
                        ..Default::default()
                    },
                ),
                (
                    "paragraph".into(),
                    NodeSpec {
                        groups: vec!["block".into()],
                        content: "text*".into(),
                        is_textblock: true,
                        ..Default::default()
                    },
                ),
                (
                    "text".into(),
                    NodeSpec {
                        inline: true,
                        ..Default::default()
                    },
                ),
            ],
            marks: vec![("em".into(), MarkSpec::default())],
        })
        .unwrap()
    }

    #[test]
    fn compiles_basic_schema() {
        let schema = doc_schema();
        assert_eq!(schema.top_node_type().name(), "doc");
        assert!(schema.node_type("paragraph").unwrap().is_textblock());
        assert!(schema.text_node_type().is_inline());
    }

    #[test]
    fn missing_text_node_is_rejected() {
        let err = Schema::compile(SchemaSpec {
            top_node: "doc".into(),
            nodes: vec![(
                "doc".into(),
                NodeSpec { content: String::new(), ..Default::default() },
            )],
            marks: vec![],
        })
        .unwrap_err();
        assert_eq!(err, SchemaError::MissingTextNode);
    }

    #[test]
    fn mark_default_excludes_self_only() {
        let schema = doc_schema();
        let em = schema.mark_type("em").unwrap();
        assert!(em.excludes(em));
    }

    #[test]
    fn create_and_fill_autofills_required_paragraph() {
        let schema = doc_schema();
        let doc_type = schema.top_node_type().clone();
        let doc = schema.create_and_fill(&doc_type, Default::default()).unwrap();
        assert_eq!(doc.content().child_count(), 1);
        assert_eq!(doc.content().child(0).type_().name(), "paragraph");
    }

    #[test]
    fn find_wrapping_locates_direct_and_indirect_targets() {
        let schema = doc_schema();
        let doc_type = schema.top_node_type().clone();
        let paragraph = schema.node_type("paragraph").unwrap();
        assert_eq!(doc_type.find_wrapping(paragraph, &schema), Some(Vec::new()));
    }
}
