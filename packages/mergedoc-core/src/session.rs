use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};
use crate::ids::{ActorId, Counter, ObjId, OpId};
use crate::ops::{Key, NewValue, Operation};
use crate::state::DocState;

/// Working copy behind the handles of one `change` (or one read-only view).
///
/// Every local operation is applied to `state` immediately, so handles always observe
/// their own writes; `ops` collects them for the change record.
#[derive(Debug)]
pub(crate) struct Session {
    actor: ActorId,
    counter: Counter,
    state: DocState,
    ops: Vec<Operation>,
    writable: bool,
}

impl Session {
    pub(crate) fn new(actor: ActorId, counter: Counter, state: DocState, writable: bool) -> Self {
        Self {
            actor,
            counter,
            state,
            ops: Vec::new(),
            writable,
        }
    }

    pub(crate) fn state(&self) -> &DocState {
        &self.state
    }

    pub(crate) fn into_parts(self) -> (DocState, Vec<Operation>) {
        (self.state, self.ops)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(Error::ReadOnly(
                "document is open for reading; mutate it inside a change".into(),
            ))
        }
    }

    fn next_id(&mut self) -> OpId {
        self.counter += 1;
        OpId::new(self.counter, &self.actor)
    }

    fn commit(&mut self, op: Operation) -> Result<()> {
        if !self.state.apply(&op) {
            return Err(Error::InconsistentState(format!(
                "local operation {:?} does not apply to {:?}",
                op.id,
                op.obj()
            )));
        }
        trace!(counter = op.id.counter, "applied local operation");
        self.ops.push(op);
        Ok(())
    }

    /// Write `value` into a register, creating nested maps and lists as fresh objects.
    pub(crate) fn put(&mut self, obj: &ObjId, key: Key, value: &Value) -> Result<()> {
        self.ensure_writable()?;
        let pred = self.state.pred(obj, &key);
        let id = self.next_id();
        self.commit(Operation::put(
            id.clone(),
            obj.clone(),
            key,
            NewValue::from_json(value),
            pred,
        ))?;
        self.populate(id, value)
    }

    /// Insert `value` so that it ends up at visible position `index`.
    pub(crate) fn insert(&mut self, list: &ObjId, index: usize, value: &Value) -> Result<()> {
        self.ensure_writable()?;
        let len = self.state.list_len(list);
        if index > len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        let after = match index {
            0 => None,
            _ => self.state.list_elem(list, index - 1),
        };
        self.insert_after(list, after, value).map(|_| ())
    }

    fn insert_after(&mut self, list: &ObjId, after: Option<OpId>, value: &Value) -> Result<OpId> {
        let id = self.next_id();
        self.commit(Operation::insert(
            id.clone(),
            list.clone(),
            after,
            NewValue::from_json(value),
        ))?;
        self.populate(id.clone(), value)?;
        Ok(id)
    }

    fn populate(&mut self, id: OpId, value: &Value) -> Result<()> {
        let obj = ObjId::Op(id);
        match value {
            Value::Object(fields) => {
                for (key, field) in fields {
                    self.put(&obj, Key::Map(key.clone()), field)?;
                }
            }
            Value::Array(items) => {
                let mut after = None;
                for item in items {
                    after = Some(self.insert_after(&obj, after, item)?);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Clear a register. Missing map keys are a no-op.
    pub(crate) fn delete(&mut self, obj: &ObjId, key: Key) -> Result<()> {
        self.ensure_writable()?;
        let pred = self.state.pred(obj, &key);
        if pred.is_empty() {
            return Ok(());
        }
        let id = self.next_id();
        self.commit(Operation::delete(id, obj.clone(), key, pred))
    }

    /// Remove the element at a visible index and return its exported value.
    pub(crate) fn remove_at(&mut self, list: &ObjId, index: usize) -> Result<Value> {
        let len = self.state.list_len(list);
        let elem = self
            .state
            .list_elem(list, index)
            .ok_or(Error::IndexOutOfBounds { index, len })?;
        let removed = self
            .state
            .list_get(list, index)
            .map(|stored| self.state.export_stored(stored))
            .unwrap_or(Value::Null);
        self.delete(list, Key::Elem(elem))?;
        Ok(removed)
    }
}
