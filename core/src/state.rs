//! `EditorState`/`Transaction`: the immutable-snapshot-plus-delta container
//! that higher-level commands are built against, plus the plugin mechanism
//! (`Plugin`/`PluginKey`/`StateField`) extra per-state fields (such as
//! [`crate::history`]) hook into.
//!
//! A `Transaction` *is* a [`Transform`] (accessed via `Deref`/`DerefMut`)
//! plus the extra bookkeeping -- selection, stored marks, arbitrary metadata
//! -- that only makes sense once a document change is attached to a
//! specific editor state. Applying one never mutates anything: `apply`
//! returns a fresh `EditorState` that shares its `Schema`/unaffected plugin
//! fields with the old one via `Arc`, the same cheap-clone-by-sharing
//! approach `Fragment`/`Schema` use for their own data.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::TransformError;
use crate::mark::MarkSet;
use crate::node::Node;
use crate::schema::Schema;
use crate::selection::Selection;
use crate::step::Step;
use crate::transform::Transform;

/// Key under which a [`Transaction`] stashes arbitrary metadata -- either a
/// well-known named slot or a plugin's own identity, mirroring how plugins
/// use their own `PluginKey` object as a transaction-meta key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaKey {
    Named(&'static str),
    Plugin(usize),
}

impl From<&'static str> for MetaKey {
    fn from(name: &'static str) -> Self {
        MetaKey::Named(name)
    }
}

impl<T> From<&PluginKey<T>> for MetaKey {
    fn from(key: &PluginKey<T>) -> Self {
        MetaKey::Plugin(key.id())
    }
}

/// A plugin's apply/init hook for one slot of per-state data. Implementors
/// carry no extra trait bounds beyond what storing the value requires --
/// plugins that don't need per-state data (only `append_transaction`/
/// `filter_transaction`) skip this entirely.
pub trait StateField: Send + Sync {
    type Value: Send + Sync;

    fn init(&self, schema: &Schema, doc: &Node) -> Self::Value;

    fn apply(&self, tr: &Transaction, value: &Self::Value, old_state: &EditorState, new_state: &EditorState) -> Self::Value;
}

trait ErasedField: Send + Sync {
    fn init(&self, schema: &Schema, doc: &Node) -> Arc<dyn Any + Send + Sync>;
    fn apply(
        &self,
        tr: &Transaction,
        value: &Arc<dyn Any + Send + Sync>,
        old_state: &EditorState,
        new_state: &EditorState,
    ) -> Arc<dyn Any + Send + Sync>;
}

struct FieldImpl<F> {
    inner: F,
}

impl<F> ErasedField for FieldImpl<F>
where
    F: StateField,
    F::Value: 'static,
{
    fn init(&self, schema: &Schema, doc: &Node) -> Arc<dyn Any + Send + Sync> {
        Arc::new(self.inner.init(schema, doc))
    }

    fn apply(
        &self,
        tr: &Transaction,
        value: &Arc<dyn Any + Send + Sync>,
        old_state: &EditorState,
        new_state: &EditorState,
    ) -> Arc<dyn Any + Send + Sync> {
        let typed = value
            .downcast_ref::<F::Value>()
            .expect("plugin field value downcast to its own declared type");
        Arc::new(self.inner.apply(tr, typed, old_state, new_state))
    }
}

/// Identity-compared handle a plugin uses to find its own state later,
/// parameterized over the stored value's type so `get` returns it without a
/// caller-supplied downcast. Two keys are equal (for `Plugin`/lookup
/// purposes) only if they're literally the same key, the same pattern
/// `NodeType`/`MarkType` use -- cloning a `PluginKey` shares identity,
/// constructing a new one with `new` never collides with an existing one.
pub struct PluginKey<T> {
    token: Arc<()>,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for PluginKey<T> {
    fn clone(&self) -> Self {
        PluginKey {
            token: self.token.clone(),
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T> PluginKey<T> {
    pub fn new(name: &'static str) -> Self {
        PluginKey {
            token: Arc::new(()),
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.token) as usize
    }
}

impl<T: Send + Sync + 'static> PluginKey<T> {
    /// Retrieves this plugin's state from `state`, if it was installed with
    /// a field.
    pub fn get<'a>(&self, state: &'a EditorState) -> Option<&'a T> {
        state.fields.get(&self.id()).and_then(|v| v.downcast_ref::<T>())
    }
}

type AppendTransactionFn = Arc<dyn Fn(&[Transaction], &EditorState, &EditorState) -> Option<Transaction> + Send + Sync>;
type FilterTransactionFn = Arc<dyn Fn(&Transaction, &EditorState) -> bool + Send + Sync>;

/// A named extension to `EditorState`: optionally owns one slot of
/// per-state data (`field`), and/or hooks into transaction application via
/// `append_transaction`/`filter_transaction`.
pub struct Plugin {
    // Kept alive for the plugin's lifetime so `key_id` (its address) can
    // never be reused by an unrelated key or plugin while this one exists.
    _identity: Arc<()>,
    key_id: usize,
    pub name: &'static str,
    field: Option<Arc<dyn ErasedField>>,
    pub append_transaction: Option<AppendTransactionFn>,
    pub filter_transaction: Option<FilterTransactionFn>,
    /// Mirrors the source's `historyPreserveItems` spec flag: any plugin in
    /// the active set setting this makes the history engine retain undone
    /// items as map-only placeholders instead of discarding them.
    pub preserve_history_items: bool,
}

impl Plugin {
    /// A plugin with no per-state field, only transaction hooks -- attach
    /// those with `append_transaction`/`filter_transaction`.
    pub fn new(name: &'static str) -> Plugin {
        let identity = Arc::new(());
        Plugin {
            key_id: Arc::as_ptr(&identity) as usize,
            _identity: identity,
            name,
            field: None,
            append_transaction: None,
            filter_transaction: None,
            preserve_history_items: false,
        }
    }

    /// A plugin that owns per-state data, looked up later through `key`.
    pub fn with_field<T, F>(key: &PluginKey<T>, field: F) -> Plugin
    where
        F: StateField<Value = T> + 'static,
        T: Send + Sync + 'static,
    {
        Plugin {
            _identity: key.token.clone(),
            key_id: key.id(),
            name: key.name(),
            field: Some(Arc::new(FieldImpl { inner: field })),
            append_transaction: None,
            filter_transaction: None,
            preserve_history_items: false,
        }
    }

    pub fn append_transaction(mut self, f: AppendTransactionFn) -> Self {
        self.append_transaction = Some(f);
        self
    }

    pub fn filter_transaction(mut self, f: FilterTransactionFn) -> Self {
        self.filter_transaction = Some(f);
        self
    }

    /// Mirrors the source's `historyPreserveItems` spec flag: any plugin in
    /// the active set setting this makes the history engine retain undone
    /// items as map-only placeholders instead of discarding them.
    pub fn with_preserve_history_items(mut self, preserve: bool) -> Self {
        self.preserve_history_items = preserve;
        self
    }
}

pub struct StateConfig {
    pub schema: Schema,
    pub doc: Option<Node>,
    pub selection: Option<Selection>,
    pub stored_marks: Option<MarkSet>,
    pub plugins: Vec<Plugin>,
}

impl StateConfig {
    pub fn new(schema: Schema) -> Self {
        StateConfig {
            schema,
            doc: None,
            selection: None,
            stored_marks: None,
            plugins: Vec::new(),
        }
    }
}

fn default_doc(schema: &Schema) -> Node {
    schema
        .create_and_fill(schema.top_node_type(), Default::default())
        .expect("schema's top node type must be constructible with only required defaults")
}

/// An immutable document + selection + plugin-data snapshot. Cloning is an
/// `Arc` bump on every field, matching `Schema`/`Fragment`'s cheap-clone
/// contract -- callers can hold on to an old `EditorState` alongside a new
/// one (e.g. while diffing) without worrying about the cost.
#[derive(Clone)]
pub struct EditorState {
    schema: Schema,
    doc: Node,
    selection: Selection,
    stored_marks: Option<MarkSet>,
    plugins: Arc<Vec<Plugin>>,
    fields: Arc<HashMap<usize, Arc<dyn Any + Send + Sync>>>,
}

/// The result of [`EditorState::apply_transaction`]: the resulting state
/// plus every transaction that was actually applied to reach it (the
/// caller's own transaction, followed by any plugin `append_transaction`
/// follow-ups).
pub struct AppliedTransaction {
    pub state: EditorState,
    pub transactions: Vec<Transaction>,
}

impl EditorState {
    pub fn create(config: StateConfig) -> EditorState {
        let doc = config.doc.unwrap_or_else(|| default_doc(&config.schema));
        let selection = config.selection.unwrap_or_else(|| Selection::at_start(&doc));
        let plugins = Arc::new(config.plugins);
        let mut fields = HashMap::new();
        for plugin in plugins.iter() {
            if let Some(field) = &plugin.field {
                fields.insert(plugin.key_id, field.init(&config.schema, &doc));
            }
        }
        EditorState {
            schema: config.schema,
            doc,
            selection,
            stored_marks: config.stored_marks,
            plugins,
            fields: Arc::new(fields),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
    pub fn doc(&self) -> &Node {
        &self.doc
    }
    pub fn selection(&self) -> &Selection {
        &self.selection
    }
    pub fn stored_marks(&self) -> Option<&MarkSet> {
        self.stored_marks.as_ref()
    }
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// A fresh transaction starting from this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(self)
    }

    /// Applies `tr` and runs every plugin's `append_transaction` hook to a
    /// fixed point, same as [`EditorState::apply_transaction`], but
    /// discards the intermediate transaction list.
    pub fn apply(&self, tr: Transaction) -> EditorState {
        self.apply_transaction(tr).state
    }

    pub fn apply_transaction(&self, tr: Transaction) -> AppliedTransaction {
        if !self.filter_transaction(&tr, None) {
            log::debug!("transaction rejected by a plugin's filter_transaction hook");
            return AppliedTransaction {
                state: self.clone(),
                transactions: Vec::new(),
            };
        }
        let mut state = self.apply_inner(&tr);
        let mut transactions = vec![tr];
        loop {
            let mut appended = None;
            for plugin in self.plugins.iter() {
                if let Some(append) = &plugin.append_transaction {
                    if let Some(extra) = append(&transactions, self, &state) {
                        if state.filter_transaction(&extra, Some(plugin)) {
                            appended = Some(extra);
                            break;
                        }
                        log::debug!("plugin {:?} append_transaction rejected by filter_transaction", plugin.name);
                    }
                }
            }
            match appended {
                Some(extra) => {
                    let next = state.apply_inner(&extra);
                    transactions.push(extra);
                    state = next;
                }
                None => break,
            }
        }
        AppliedTransaction { state, transactions }
    }

    fn filter_transaction(&self, tr: &Transaction, skip: Option<&Plugin>) -> bool {
        self.plugins.iter().all(|p| {
            if let Some(skip) = skip {
                if skip.key_id == p.key_id {
                    return true;
                }
            }
            p.filter_transaction.as_ref().map(|f| f(tr, self)).unwrap_or(true)
        })
    }

    fn apply_inner(&self, tr: &Transaction) -> EditorState {
        let doc = tr.doc.clone();
        let selection = tr.selection();
        let stored_marks = tr.stored_marks().cloned();
        let new_state_shell = EditorState {
            schema: self.schema.clone(),
            doc,
            selection,
            stored_marks,
            plugins: self.plugins.clone(),
            fields: Arc::new(HashMap::new()),
        };
        let mut fields = HashMap::with_capacity(self.fields.len());
        for plugin in self.plugins.iter() {
            if let Some(field) = &plugin.field {
                let old_value = self
                    .fields
                    .get(&plugin.key_id)
                    .expect("every plugin with a field has a value in every state derived from create()");
                fields.insert(plugin.key_id, field.apply(tr, old_value, self, &new_state_shell));
            }
        }
        EditorState {
            fields: Arc::new(fields),
            ..new_state_shell
        }
    }
}

/// A pending document change plus the selection/stored-mark/metadata state
/// that travels with it. Derefs to the underlying [`Transform`] so every
/// `Transform` operation (`insert_text`, `replace`, `wrap`, ...) is
/// available directly on a `Transaction`.
pub struct Transaction {
    transform: Transform,
    before_selection: Selection,
    explicit_selection: Option<Selection>,
    stored_marks: Option<MarkSet>,
    meta: HashMap<MetaKey, Box<dyn Any + Send + Sync>>,
    pub time: SystemTime,
}

impl Transaction {
    pub fn new(state: &EditorState) -> Transaction {
        Transaction {
            transform: Transform::new(state.schema.clone(), state.doc.clone()),
            before_selection: state.selection.clone(),
            explicit_selection: None,
            stored_marks: state.stored_marks.clone(),
            meta: HashMap::new(),
            time: SystemTime::now(),
        }
    }

    /// The selection this transaction currently carries: the explicitly set
    /// one if `set_selection` was called, otherwise the state's original
    /// selection mapped through every step applied so far.
    pub fn selection(&self) -> Selection {
        match &self.explicit_selection {
            Some(sel) => sel.clone(),
            None => self.before_selection.map(&self.transform.doc, &self.transform.mapping),
        }
    }

    pub fn selection_set(&self) -> bool {
        self.explicit_selection.is_some()
    }

    /// Panics if `selection` was not resolved against this transaction's
    /// current document -- a selection built against a stale or unrelated
    /// doc is a caller bug, not a recoverable condition.
    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        assert!(
            selection.doc() == &self.transform.doc,
            "selection was not resolved against this transaction's current document"
        );
        self.explicit_selection = Some(selection);
        self.stored_marks = None;
        self
    }

    pub fn stored_marks(&self) -> Option<&MarkSet> {
        self.stored_marks.as_ref()
    }

    pub fn set_stored_marks(&mut self, marks: Option<MarkSet>) -> &mut Self {
        self.stored_marks = marks;
        self
    }

    pub fn delete_selection(&mut self) -> Result<&mut Self, TransformError> {
        let sel = self.selection();
        self.transform.delete(sel.from(), sel.to())?;
        Ok(self)
    }

    /// Replaces the current selection with `text`, carrying forward any
    /// stored marks (falling back to the marks active right before the
    /// selection when none are stored).
    pub fn insert_text_at_selection(&mut self, text: &str) -> Result<&mut Self, TransformError> {
        let sel = self.selection();
        self.transform.insert_text(text, sel.from(), sel.to())
    }

    pub fn set_meta(&mut self, key: impl Into<MetaKey>, value: impl Any + Send + Sync) -> &mut Self {
        self.meta.insert(key.into(), Box::new(value));
        self
    }

    pub fn get_meta<T: Any>(&self, key: impl Into<MetaKey>) -> Option<&T> {
        self.meta.get(&key.into()).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.transform.steps.last()
    }
}

impl Deref for Transaction {
    type Target = Transform;
    fn deref(&self) -> &Transform {
        &self.transform
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::test_schema;

    #[test]
    fn create_uses_default_doc_and_start_selection() {
        let schema = test_schema();
        let state = EditorState::create(StateConfig::new(schema));
        assert_eq!(state.doc().content_size() > 0, true);
    }

    #[test]
    fn apply_advances_doc_and_maps_selection() {
        let schema = test_schema();
        let state = EditorState::create(StateConfig::new(schema));
        let mut tr = state.tr();
        tr.insert_text("hi", 1, 1).unwrap();
        let next = state.apply(tr);
        assert_ne!(next.doc(), state.doc());
        assert_eq!(next.selection().from(), 3);
    }

    #[test]
    fn explicit_selection_survives_apply() {
        let schema = test_schema();
        let state = EditorState::create(StateConfig::new(schema));
        let mut tr = state.tr();
        tr.insert_text("hi", 1, 1).unwrap();
        let sel = crate::selection::Selection::at_start(&tr.doc);
        tr.set_selection(sel.clone());
        let next = state.apply(tr);
        assert!(next.selection().eq(&sel));
    }

    struct Counter;
    impl StateField for Counter {
        type Value = u32;
        fn init(&self, _schema: &Schema, _doc: &Node) -> u32 {
            0
        }
        fn apply(&self, _tr: &Transaction, value: &u32, _old: &EditorState, _new: &EditorState) -> u32 {
            value + 1
        }
    }

    #[test]
    fn plugin_field_accumulates_across_applies() {
        let schema = test_schema();
        let key: PluginKey<u32> = PluginKey::new("counter");
        let plugin = Plugin::with_field(&key, Counter);
        let mut config = StateConfig::new(schema);
        config.plugins.push(plugin);
        let mut state = EditorState::create(config);
        assert_eq!(*key.get(&state).unwrap(), 0);
        for _ in 0..3 {
            let tr = state.tr();
            state = state.apply(tr);
        }
        assert_eq!(*key.get(&state).unwrap(), 3);
    }
}
