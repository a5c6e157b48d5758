//! Whole-pipeline scenarios exercising schema, transform, state and history
//! together rather than one module in isolation.

use richtext_core::history::{self, Config as HistoryConfig};
use richtext_core::schema::{MarkSpec, NodeSpec, Schema, SchemaSpec};
use richtext_core::step::{Mapping, StepMap};
use richtext_core::{EditorState, Mark, ResolvedPos, Selection, StateConfig, TextSelection};

fn schema() -> Schema {
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
    .expect("schema compiles")
}

/// `doc(paragraph(text))`, with a starting `TextSelection` at `pos..pos`.
fn state_with(text: &str, pos: usize) -> EditorState {
    let schema = schema();
    let text_node = richtext_core::Node::text(&schema, text.to_string(), Default::default()).unwrap();
    let paragraph = schema.node_type("paragraph").unwrap().clone();
    let para = richtext_core::Node::new(
        paragraph,
        Default::default(),
        richtext_core::Fragment::from_single(text_node),
        Default::default(),
    )
    .unwrap();
    let doc_type = schema.node_type("doc").unwrap().clone();
    let doc = richtext_core::Node::new(
        doc_type,
        Default::default(),
        richtext_core::Fragment::from_single(para),
        Default::default(),
    )
    .unwrap();

    let r = ResolvedPos::resolve(&doc, pos).unwrap();
    let selection = Selection::Text(TextSelection::new(r.clone(), r));

    let mut config = StateConfig::new(schema);
    config.doc = Some(doc);
    config.selection = Some(selection);
    config.plugins.push(history::history_plugin(HistoryConfig::default()));
    EditorState::create(config)
}

#[test]
fn s1_single_character_insert_then_undo() {
    let mut state = state_with("hello", 6);
    let initial_doc = state.doc().clone();

    let mut tr = state.tr();
    tr.insert_text("!", 6, 6).unwrap();
    state = state.apply(tr);
    assert_eq!(state.doc().text_content(), "hello!");

    let undo_tr = history::undo(&state).expect("one event to undo");
    state = state.apply(undo_tr);
    assert_eq!(state.doc(), &initial_doc);
    assert_eq!(history::undo_depth(&state), 0);
    assert_eq!(history::redo_depth(&state), 1);
    assert_eq!(state.selection().from(), 6);
    assert_eq!(state.selection().to(), 6);
}

#[test]
fn s2_typing_burst_coalesces_into_one_event() {
    let mut state = state_with("hello", 6);

    for (ch, at) in [("a", 6), ("b", 7), ("c", 8)] {
        let mut tr = state.tr();
        tr.insert_text(ch, at, at).unwrap();
        state = state.apply(tr);
    }
    assert_eq!(state.doc().text_content(), "helloabc");
    assert_eq!(history::undo_depth(&state), 1);

    let undo_tr = history::undo(&state).unwrap();
    state = state.apply(undo_tr);
    assert_eq!(state.doc().text_content(), "hello");
    assert_eq!(state.selection().from(), 6);
    assert_eq!(state.selection().to(), 6);
}

#[test]
fn s3_split_paragraph_undo_redo() {
    let mut state = state_with("hello world", 6);
    let initial_doc = state.doc().clone();

    let mut tr = state.tr();
    tr.split(6, 1, None).unwrap();
    // A command driving `split` places the cursor at the start of the new
    // second paragraph, the way a real split-block command would.
    let second_start = tr.doc.content().child(0).node_size() + 1;
    let r = ResolvedPos::resolve(&tr.doc, second_start).unwrap();
    tr.set_selection(Selection::Text(TextSelection::new(r.clone(), r)));
    state = state.apply(tr);

    let post_split_doc = state.doc().clone();
    assert_eq!(post_split_doc.content().child_count(), 2);
    assert_eq!(post_split_doc.content().child(0).text_content(), "hello");
    assert_eq!(post_split_doc.content().child(1).text_content(), " world");

    let undo_tr = history::undo(&state).unwrap();
    state = state.apply(undo_tr);
    assert_eq!(state.doc(), &initial_doc);

    let redo_tr = history::redo(&state).unwrap();
    state = state.apply(redo_tr);
    assert_eq!(state.doc(), &post_split_doc);
    assert_eq!(state.selection().from(), second_start);
    assert!(state.selection().empty());
}

#[test]
fn s4_add_mark_round_trip() {
    let schema = schema();
    let state = state_with("hello world", 0);
    let em = schema.mark_type("em").unwrap().clone();
    let mark = Mark::new(em, Default::default()).unwrap();

    let initial_doc = state.doc().clone();
    let mut tr = state.tr();
    tr.add_mark(2, 7, mark.clone()).unwrap();
    let marked_doc = tr.doc.clone();
    assert!(marked_doc.range_has_mark(2, 7, &mark));
    assert!(!initial_doc.range_has_mark(2, 7, &mark));

    // Invert every recorded step, in reverse, against the doc it produced.
    let mut doc = tr.doc.clone();
    for i in (0..tr.steps.len()).rev() {
        let inverted = tr.steps[i].invert(&tr.docs[i]);
        doc = inverted.apply(&doc).doc.expect("inverse step applies cleanly");
    }
    assert_eq!(doc, initial_doc);
}

#[test]
fn s5_mapping_through_reinsert_preserves_position() {
    // A = Replace(3, 7, empty): deletes "lowo" from "helloworld".
    let delete = StepMap::new(vec![3, 4, 0]);
    // B = Replace(3, 3, slice("lowo")): reinserts the same text.
    let reinsert = StepMap::new(vec![3, 0, 4]);

    let mut with_mirror = Mapping::new();
    let delete_idx = with_mirror.append_map_mirrored(delete.clone(), None);
    with_mirror.append_map_mirrored(reinsert.clone(), Some(delete_idx));
    assert_eq!(with_mirror.map(5, 1), 5);

    // Without registering the mirror pair the same sequence of maps loses
    // the original position: 5 maps to 3 across the delete, then to 7 once
    // the reinsertion shifts everything after it back out.
    let mut without_mirror = Mapping::new();
    without_mirror.append_map(delete);
    without_mirror.append_map(reinsert);
    assert_eq!(without_mirror.map(5, 1), 7);
}

#[test]
fn s6_rebase_through_remote_insert() {
    let mut state = state_with("hello", 0);

    let mut local = state.tr();
    local.insert_text("X", 4, 4).unwrap();
    state = state.apply(local);
    assert_eq!(state.doc().text_content(), "helXlo");
    assert_eq!(history::undo_depth(&state), 1);

    // A remote edit lands underneath this branch's one unconfirmed event.
    let mut remote = state.tr();
    remote.insert_text("Y", 2, 2).unwrap();
    history::set_rebased(&mut remote);
    state = state.apply(remote);
    assert_eq!(state.doc().text_content(), "hYelXlo");
    assert_eq!(history::undo_depth(&state), 1);
    assert_eq!(history::redo_depth(&state), 0);

    // Undo still removes exactly the locally-inserted "X", not some
    // now-stale position computed before the remote insert shifted things.
    let undo_tr = history::undo(&state).unwrap();
    state = state.apply(undo_tr);
    assert_eq!(state.doc().text_content(), "hYello");
    assert_eq!(history::undo_depth(&state), 0);
    assert_eq!(history::redo_depth(&state), 1);
}
