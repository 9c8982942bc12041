use std::cell::RefCell;
use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::ids::{ActorId, Counter, ObjId};
use crate::object::Object;
use crate::ops::{cmp_ops, Operation};
use crate::path;
use crate::session::Session;
use crate::state::DocState;
use crate::version_vector::VersionVector;

/// One atomic, named batch of operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub actor: ActorId,
    /// Per-actor change number, starting at 1.
    pub seq: u64,
    /// Counter of the first operation.
    pub start_op: Counter,
    /// Milliseconds since the Unix epoch.
    pub time: i64,
    pub message: String,
    /// Changes the author had seen when making this one.
    pub deps: VersionVector,
    pub ops: Vec<Operation>,
}

/// One history entry: a change and the document content right after it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub change: Change,
    pub snapshot: Value,
}

/// History order: by first operation, which respects causality.
pub fn cmp_changes(a: &Change, b: &Change) -> Ordering {
    (a.start_op, &a.actor, a.seq).cmp(&(b.start_op, &b.actor, b.seq))
}

/// One version of a mergeable document.
///
/// Documents are values: engine operations return new documents and never touch their
/// inputs. Cloning keeps the actor, so fork with [`Document::with_actor`] before editing a
/// copy concurrently with the original.
#[derive(Clone, Debug)]
pub struct Document {
    actor: ActorId,
    /// Shared between versions; commits copy pointers, never change bodies.
    changes: Vec<Arc<Change>>,
    clock: VersionVector,
    max_op: Counter,
    state: DocState,
}

impl Document {
    pub(crate) fn empty(actor: ActorId) -> Self {
        Self {
            actor,
            changes: Vec::new(),
            clock: VersionVector::new(),
            max_op: 0,
            state: DocState::default(),
        }
    }

    /// Rebuild a document by replaying every operation of `changes` in id order.
    pub(crate) fn from_changes(actor: ActorId, mut changes: Vec<Arc<Change>>) -> Result<Self> {
        changes.sort_by(|a, b| cmp_changes(a, b));
        let state = replay(&changes)?;

        let mut clock = VersionVector::new();
        for change in &changes {
            clock.observe(&change.actor, change.seq);
        }
        let max_op = changes
            .iter()
            .flat_map(|c| c.ops.iter())
            .map(|op| op.id.counter)
            .max()
            .unwrap_or(0);
        Ok(Self {
            actor,
            changes,
            clock,
            max_op,
            state,
        })
    }

    pub(crate) fn session(&self, writable: bool) -> Session {
        Session::new(self.actor.clone(), self.max_op, self.state.clone(), writable)
    }

    /// Successor document holding `state` and the change that produced it.
    pub(crate) fn advance(&self, state: DocState, change: Change) -> Self {
        let mut clock = self.clock.clone();
        clock.observe(&change.actor, change.seq);
        let max_op = change
            .ops
            .iter()
            .map(|op| op.id.counter)
            .fold(self.max_op, Counter::max);
        let mut changes = self.changes.clone();
        changes.push(Arc::new(change));
        Self {
            actor: self.actor.clone(),
            changes,
            clock,
            max_op,
            state,
        }
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Same content and history, new local actor.
    pub fn with_actor(&self, actor: ActorId) -> Self {
        Self {
            actor,
            ..self.clone()
        }
    }

    pub fn clock(&self) -> &VersionVector {
        &self.clock
    }

    /// Changes in history order.
    pub fn changes(&self) -> &[Arc<Change>] {
        &self.changes
    }

    /// Every change paired with the content of the document right after it.
    ///
    /// Each snapshot replays the history prefix ending at its change, so concurrent changes
    /// interleave exactly as they do in the full document.
    pub fn history_entries(&self) -> Result<Vec<HistoryEntry>> {
        (1..=self.changes.len())
            .map(|end| -> Result<HistoryEntry> {
                let state = replay(&self.changes[..end])?;
                Ok(HistoryEntry {
                    change: Change::clone(&self.changes[end - 1]),
                    snapshot: state.export_obj(&ObjId::Root),
                })
            })
            .collect()
    }

    /// Highest operation counter in the document.
    pub fn max_op(&self) -> Counter {
        self.max_op
    }

    pub fn export(&self) -> Value {
        self.state.export_obj(&ObjId::Root)
    }

    /// Navigate the document through a read-only root handle.
    pub fn read<R>(&self, f: impl FnOnce(&Object<'_>) -> R) -> R {
        let session = RefCell::new(self.session(false));
        let root = Object::root(&session);
        f(&root)
    }

    /// Value at `path`, see [`path::get`].
    pub fn get(&self, path: &str) -> Option<Value> {
        self.read(|root| path::get(root, path))
    }
}

/// Materialize `changes` by applying all their operations in id order.
fn replay(changes: &[Arc<Change>]) -> Result<DocState> {
    let mut ops: Vec<&Operation> = changes.iter().flat_map(|c| c.ops.iter()).collect();
    ops.sort_by(|a, b| cmp_ops(a, b));

    let mut state = DocState::default();
    for op in ops {
        if !state.apply(op) {
            return Err(Error::InconsistentState(format!(
                "operation {:?} references an unknown target in {:?}",
                op.id,
                op.obj()
            )));
        }
    }
    Ok(state)
}
