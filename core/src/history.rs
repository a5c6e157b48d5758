//! Undo history as a [`crate::state::Plugin`]: two branches of inverted
//! steps (`done`/`undone`), grouped into coalesced "events" the way a
//! typing burst collapses into one undo rather than one per keystroke.
//!
//! The branches live entirely inside the plugin's own state field --
//! nothing here is special-cased by [`crate::state::EditorState`] itself,
//! the same extension-point contract any other plugin uses.

use std::time::{Duration, SystemTime};

use once_cell::sync::Lazy;

use crate::node::Node;
use crate::schema::Schema;
use crate::selection::SelectionBookmark;
use crate::state::{EditorState, Plugin, PluginKey, StateField, Transaction};
use crate::step::{Mapping, Step, StepMap};
use crate::transform::Transform;

/// Depth is a soft target: the branch is only trimmed once it overshoots by
/// this many extra events, so a steady stream of edits isn't re-trimming on
/// every single one.
const DEPTH_OVERFLOW: usize = 20;

/// Upper bound on consecutive map-only placeholders (positions shifted by
/// steps this branch never recorded, e.g. from [`Branch::add_maps`]) kept in
/// a branch before the oldest ones are dropped.
const MAX_EMPTY_ITEMS: usize = 500;

const META_ADD_TO_HISTORY: &str = "addToHistory";
const META_HISTORY_CLOSE: &str = "historyClose";
const META_HISTORY_BRANCHES: &str = "historyBranches";
const META_REBASED: &str = "rebased";
const META_COMPOSITION: &str = "composition";

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Number of events kept before the oldest are dropped.
    pub depth: usize,
    /// Edits closer together than this merge into the same undo event.
    pub new_group_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            depth: 100,
            new_group_delay: Duration::from_millis(500),
        }
    }
}

/// One recorded step, in the form the branch needs to undo it: its inverse,
/// the map it produced, and (only for the first item of an event) the
/// selection to restore once the whole event has been undone.
#[derive(Debug, Clone)]
struct Item {
    map: StepMap,
    step: Option<Step>,
    selection: Option<SelectionBookmark>,
}

/// A persistent, `Arc`-shared list of [`Item`]s plus the number of distinct
/// undo events among them. Cloning a `Branch` is an `Arc` bump, matching
/// every other document-model type's cheap-clone contract.
#[derive(Debug, Clone)]
struct Branch {
    items: std::sync::Arc<Vec<Item>>,
    event_count: usize,
}

impl Branch {
    fn empty() -> Branch {
        Branch {
            items: std::sync::Arc::new(Vec::new()),
            event_count: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    /// Records every step of `tr` onto this branch as a new undo event (or
    /// folded into the most recent one, if `new_group` is false).
    fn add_transform(&self, tr: &Transaction, mut selection: Option<SelectionBookmark>, config: &Config, new_group: bool) -> Branch {
        let mut items: Vec<Item> = (*self.items).clone();
        let maps = tr.mapping.maps();
        for (i, step) in tr.steps.iter().enumerate() {
            let inverted = step.invert(&tr.docs[i]);
            items.push(Item {
                map: maps[i].clone(),
                step: Some(inverted),
                selection: selection.take(),
            });
        }
        let event_count = self.event_count + if new_group { 1 } else { 0 };
        Branch::trim(items, event_count, config.depth)
    }

    /// Appends steps this branch didn't record itself (steps applied by
    /// another actor, or filtered out of this branch's own history) purely
    /// so later items still map through their effect correctly.
    fn add_maps(&self, maps: &[StepMap]) -> Branch {
        let mut items: Vec<Item> = (*self.items).clone();
        for map in maps {
            items.push(Item {
                map: map.clone(),
                step: None,
                selection: None,
            });
        }
        let empty_run = items.iter().rev().take_while(|it| it.step.is_none()).count();
        if empty_run > MAX_EMPTY_ITEMS {
            let drop = empty_run - MAX_EMPTY_ITEMS;
            let start = items.len() - empty_run;
            items.drain(start..start + drop);
        }
        Branch {
            items: std::sync::Arc::new(items),
            event_count: self.event_count,
        }
    }

    fn trim(items: Vec<Item>, event_count: usize, depth: usize) -> Branch {
        if event_count <= depth + DEPTH_OVERFLOW {
            return Branch {
                items: std::sync::Arc::new(items),
                event_count,
            };
        }
        let excess = event_count - depth;
        let mut seen = 0;
        let mut cut = 0;
        for (i, item) in items.iter().enumerate() {
            if item.selection.is_some() {
                seen += 1;
                if seen == excess + 1 {
                    cut = i;
                    break;
                }
            }
        }
        Branch {
            items: std::sync::Arc::new(items[cut..].to_vec()),
            event_count: depth,
        }
    }

    /// Undoes the most recent event: applies every item's inverted step, in
    /// reverse order, remapping each through the ones already replayed, and
    /// returns the resulting transform plus the selection to restore and the
    /// branch with that event removed.
    fn pop_event(&self, schema: &Schema, doc: &Node) -> Option<(Transform, Option<SelectionBookmark>, Branch)> {
        if self.items.is_empty() {
            return None;
        }
        let mut idx = self.items.len();
        loop {
            idx -= 1;
            if self.items[idx].selection.is_some() || idx == 0 {
                break;
            }
        }
        let group = &self.items[idx..];
        let mut transform = Transform::new(schema.clone(), doc.clone());
        let mut remap = Mapping::new();
        for item in group.iter().rev() {
            if let Some(step) = &item.step {
                if let Some(mapped) = step.map(&remap) {
                    let applied_map = mapped.get_map();
                    if transform.maybe_step(mapped).doc.is_some() {
                        remap.append_map(applied_map);
                        continue;
                    }
                }
            }
            remap.append_map(item.map.clone());
        }
        let selection = group[0].selection.clone().map(|s| s.map(&remap));
        let new_items = self.items[..idx].to_vec();
        Some((
            transform,
            selection,
            Branch {
                items: std::sync::Arc::new(new_items),
                event_count: self.event_count.saturating_sub(1),
            },
        ))
    }
}

/// Tracks the two branches, plus the bookkeeping needed to decide whether
/// the next transaction joins the in-progress event or starts a new one.
#[derive(Debug, Clone)]
pub struct HistoryState {
    config: Config,
    done: Branch,
    undone: Branch,
    prev_ranges: Option<Vec<usize>>,
    prev_time: Option<SystemTime>,
    prev_composition: Option<u64>,
}

impl HistoryState {
    pub fn undo_depth(&self) -> usize {
        self.done.event_count
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.event_count
    }
}

/// Carries a fully-computed branch pair on a transaction built by
/// [`undo`]/[`redo`], so [`HistoryField::apply`] only needs to install it
/// rather than re-derive it from the replayed steps.
#[derive(Debug, Clone)]
struct BranchUpdate {
    done: Branch,
    undone: Branch,
}

pub static HISTORY_KEY: Lazy<PluginKey<HistoryState>> = Lazy::new(|| PluginKey::new("history"));

struct HistoryField {
    config: Config,
}

impl StateField for HistoryField {
    type Value = HistoryState;

    fn init(&self, _schema: &Schema, _doc: &Node) -> HistoryState {
        HistoryState {
            config: self.config,
            done: Branch::empty(),
            undone: Branch::empty(),
            prev_ranges: None,
            prev_time: None,
            prev_composition: None,
        }
    }

    fn apply(&self, tr: &Transaction, value: &HistoryState, old_state: &EditorState, new_state: &EditorState) -> HistoryState {
        if let Some(update) = tr.get_meta::<BranchUpdate>(META_HISTORY_BRANCHES) {
            return HistoryState {
                config: value.config,
                done: update.done.clone(),
                undone: update.undone.clone(),
                prev_ranges: None,
                prev_time: None,
                prev_composition: None,
            };
        }
        if tr.get_meta::<bool>(META_HISTORY_CLOSE).copied().unwrap_or(false) {
            return HistoryState {
                prev_ranges: None,
                ..value.clone()
            };
        }
        if tr.steps.is_empty() {
            return value.clone();
        }
        if tr.get_meta::<bool>(META_REBASED).copied().unwrap_or(false) {
            // Remote steps landed underneath our own unconfirmed history.
            // Folding them in as map-only items keeps positions correct but
            // gives up replaying across the rebase boundary exactly -- see
            // the history rebase note in DESIGN.md.
            let maps: Vec<StepMap> = tr.steps.iter().map(Step::get_map).collect();
            return HistoryState {
                config: value.config,
                done: value.done.add_maps(&maps),
                undone: value.undone.add_maps(&maps),
                prev_ranges: value.prev_ranges.clone(),
                prev_time: value.prev_time,
                prev_composition: value.prev_composition,
            };
        }
        if !tr.get_meta::<bool>(META_ADD_TO_HISTORY).copied().unwrap_or(true) {
            // Not undoable, but still shifts positions recorded in either
            // branch -- fold its maps through both so a later undo/redo
            // still lands on the right range (spec §4.10 recording step 7).
            let maps: Vec<StepMap> = tr.steps.iter().map(Step::get_map).collect();
            return HistoryState {
                config: value.config,
                done: value.done.add_maps(&maps),
                undone: value.undone.add_maps(&maps),
                prev_ranges: value.prev_ranges.clone(),
                prev_time: value.prev_time,
                prev_composition: value.prev_composition,
            };
        }

        let preserve = new_state.plugins().iter().any(|p| p.preserve_history_items);
        let new_group = is_new_group(value, tr);
        let selection_bookmark = if new_group {
            Some(old_state.selection().get_bookmark())
        } else {
            None
        };
        let done = value.done.add_transform(tr, selection_bookmark, &value.config, new_group);
        let undone = if preserve { value.undone.clone() } else { Branch::empty() };
        HistoryState {
            config: value.config,
            done,
            undone,
            prev_ranges: Some(current_ranges(tr)),
            prev_time: Some(tr.time),
            prev_composition: tr.get_meta::<u64>(META_COMPOSITION).copied(),
        }
    }
}

fn is_new_group(value: &HistoryState, tr: &Transaction) -> bool {
    if value.done.is_empty() {
        return true;
    }
    if let (Some(composition), Some(prev)) = (tr.get_meta::<u64>(META_COMPOSITION), value.prev_composition) {
        if *composition == prev {
            return false;
        }
    }
    let time_gap = match value.prev_time {
        Some(prev) => tr.time.duration_since(prev).map(|d| d > value.config.new_group_delay).unwrap_or(true),
        None => true,
    };
    if time_gap {
        return true;
    }
    match &value.prev_ranges {
        Some(prev) => !ranges_adjacent(prev, &current_ranges(tr)),
        None => true,
    }
}

/// The `[from, to]` pairs this transaction touched, expressed in the
/// resulting document's coordinates, used to decide whether the next
/// transaction's edits are close enough to join the same undo event.
fn current_ranges(tr: &Transaction) -> Vec<usize> {
    let mut ranges = Vec::new();
    for (i, step) in tr.steps.iter().enumerate() {
        let map = step.get_map();
        let tail = tr.mapping.slice_from(i + 1);
        let mut j = 0;
        let raw = map.ranges();
        while j < raw.len() {
            let start = raw[j];
            let new_size = raw[j + 2];
            ranges.push(tail.map(start, 1));
            ranges.push(tail.map(start + new_size, -1));
            j += 3;
        }
    }
    ranges
}

fn ranges_adjacent(a: &[usize], b: &[usize]) -> bool {
    let mut i = 0;
    while i < a.len() {
        let (a_from, a_to) = (a[i], a[i + 1]);
        let mut j = 0;
        while j < b.len() {
            let (b_from, b_to) = (b[j], b[j + 1]);
            if a_from <= b_to + 1 && b_from <= a_to + 1 {
                return true;
            }
            j += 2;
        }
        i += 2;
    }
    false
}

/// Installs the history plugin with the given configuration. Add the
/// returned `Plugin` to [`crate::state::StateConfig::plugins`].
pub fn history_plugin(config: Config) -> Plugin {
    Plugin::with_field(&HISTORY_KEY, HistoryField { config })
}

/// Marks `tr` as a pure document edit that should not itself become
/// undoable -- e.g. a collaborative-editing rebase replay.
pub fn set_add_to_history(tr: &mut Transaction, add: bool) -> &mut Transaction {
    tr.set_meta(META_ADD_TO_HISTORY, add)
}

/// Forces the *next* transaction to start a fresh undo event, regardless of
/// timing or selection adjacency to this one.
pub fn close_history(tr: &mut Transaction) -> &mut Transaction {
    tr.set_meta(META_HISTORY_CLOSE, true)
}

/// Marks `tr` as carrying remote steps that must be folded into history as
/// position-correcting placeholders rather than recorded as a local edit.
pub fn set_rebased(tr: &mut Transaction) -> &mut Transaction {
    tr.set_meta(META_REBASED, true)
}

/// Tags `tr` with an IME composition id; transactions sharing the same id
/// are always grouped into one undo event even across the normal timing
/// cutoff, the way a single composed character shouldn't split into several
/// undo steps.
pub fn set_composition(tr: &mut Transaction, id: u64) -> &mut Transaction {
    tr.set_meta(META_COMPOSITION, id)
}

pub fn is_history_transaction(tr: &Transaction) -> bool {
    tr.get_meta::<BranchUpdate>(META_HISTORY_BRANCHES).is_some()
}

pub fn undo_depth(state: &EditorState) -> usize {
    HISTORY_KEY.get(state).map(HistoryState::undo_depth).unwrap_or(0)
}

pub fn redo_depth(state: &EditorState) -> usize {
    HISTORY_KEY.get(state).map(HistoryState::redo_depth).unwrap_or(0)
}

/// Builds the transaction that undoes the most recent event, or `None` if
/// there's nothing to undo (mirroring the command-returns-`None`-when-
/// inapplicable convention every other editing command here follows).
pub fn undo(state: &EditorState) -> Option<Transaction> {
    let history = HISTORY_KEY.get(state)?;
    if history.done.is_empty() {
        return None;
    }
    let (replay, selection, new_done) = history.done.pop_event(state.schema(), state.doc())?;
    let mut tr = state.tr();
    for step in replay.steps {
        tr.step(step).ok()?;
    }
    if let Some(selection) = selection {
        let resolved = selection.resolve(&tr.doc);
        tr.set_selection(resolved);
    }
    let undone = history.undone.add_transform(&tr, Some(state.selection().get_bookmark()), &history.config, true);
    tr.set_meta(META_HISTORY_BRANCHES, BranchUpdate { done: new_done, undone });
    Some(tr)
}

/// Builds the transaction that replays the most recently undone event, or
/// `None` if there's nothing to redo.
pub fn redo(state: &EditorState) -> Option<Transaction> {
    let history = HISTORY_KEY.get(state)?;
    if history.undone.is_empty() {
        return None;
    }
    let (replay, selection, new_undone) = history.undone.pop_event(state.schema(), state.doc())?;
    let mut tr = state.tr();
    for step in replay.steps {
        tr.step(step).ok()?;
    }
    if let Some(selection) = selection {
        let resolved = selection.resolve(&tr.doc);
        tr.set_selection(resolved);
    }
    let done = history.done.add_transform(&tr, Some(state.selection().get_bookmark()), &history.config, true);
    tr.set_meta(META_HISTORY_BRANCHES, BranchUpdate { done, undone: new_undone });
    Some(tr)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::StateConfig;
    use crate::test_util::test_schema;

    fn fresh_state() -> EditorState {
        let schema = test_schema();
        let mut config = StateConfig::new(schema);
        config.plugins.push(history_plugin(Config::default()));
        EditorState::create(config)
    }

    #[test]
    fn single_insert_is_undoable_and_redoable() {
        let mut state = fresh_state();
        let mut tr = state.tr();
        tr.insert_text("x", 1, 1).unwrap();
        state = state.apply(tr);
        assert_eq!(undo_depth(&state), 1);

        let undo_tr = undo(&state).unwrap();
        state = state.apply(undo_tr);
        assert_eq!(undo_depth(&state), 0);
        assert_eq!(redo_depth(&state), 1);
        assert_eq!(state.doc().content_size(), 2);

        let redo_tr = redo(&state).unwrap();
        state = state.apply(redo_tr);
        assert_eq!(state.doc().content_size(), 3);
        assert_eq!(redo_depth(&state), 0);
    }

    #[test]
    fn rapid_inserts_coalesce_into_one_event() {
        let mut state = fresh_state();
        for ch in ["a", "b", "c"] {
            let mut tr = state.tr();
            let at = tr.doc.content_size().saturating_sub(1).max(1);
            tr.insert_text(ch, at, at).unwrap();
            state = state.apply(tr);
        }
        assert_eq!(undo_depth(&state), 1);
        let before_undo_size = state.doc().content_size();
        let undo_tr = undo(&state).unwrap();
        state = state.apply(undo_tr);
        assert_eq!(undo_depth(&state), 0);
        assert!(state.doc().content_size() < before_undo_size);
    }

    #[test]
    fn close_history_forces_a_new_event_even_when_adjacent() {
        let mut state = fresh_state();
        let mut first = state.tr();
        first.insert_text("a", 1, 1).unwrap();
        close_history(&mut first);
        state = state.apply(first);

        let mut second = state.tr();
        let at = second.doc.content_size() - 1;
        second.insert_text("b", at, at).unwrap();
        state = state.apply(second);

        assert_eq!(undo_depth(&state), 2);
    }

    #[test]
    fn undo_with_nothing_to_undo_returns_none() {
        let state = fresh_state();
        assert!(undo(&state).is_none());
        assert!(redo(&state).is_none());
    }
}
