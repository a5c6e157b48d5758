//! Shared schema/document fixtures for unit tests across modules.

use crate::fragment::Fragment;
use crate::node::Node;
use crate::schema::{MarkSpec, NodeSpec, Schema, SchemaSpec};

pub fn test_schema() -> Schema {
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
                "heading".into(),
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
        marks: vec![
            ("em".into(), MarkSpec::default()),
            ("strong".into(), MarkSpec::default()),
        ],
    })
    .expect("test schema compiles")
}

/// `doc(paragraph("hello"))`.
pub fn test_doc() -> Node {
    let schema = test_schema();
    let text = Node::text(&schema, "hello".into(), Default::default()).unwrap();
    let paragraph = schema.node_type("paragraph").unwrap().clone();
    let para = Node::new(paragraph, Default::default(), Fragment::from_single(text), Default::default()).unwrap();
    let doc = schema.node_type("doc").unwrap().clone();
    Node::new(doc, Default::default(), Fragment::from_single(para), Default::default()).unwrap()
}

/// `doc(paragraph("hello world"))`.
pub fn test_doc_hello_world() -> Node {
    let schema = test_schema();
    let text = Node::text(&schema, "hello world".into(), Default::default()).unwrap();
    let paragraph = schema.node_type("paragraph").unwrap().clone();
    let para = Node::new(paragraph, Default::default(), Fragment::from_single(text), Default::default()).unwrap();
    let doc = schema.node_type("doc").unwrap().clone();
    Node::new(doc, Default::default(), Fragment::from_single(para), Default::default()).unwrap()
}
