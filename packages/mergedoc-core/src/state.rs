use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::ids::{ObjId, OpId};
use crate::ops::{Key, NewValue, Operation, OperationKind};
use crate::value::ScalarValue;

/// Shape of a document object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjKind {
    Map,
    List,
}

/// Value held by a register slot.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Stored {
    Scalar(ScalarValue),
    Obj(ObjId),
}

/// Live values of one map entry or list element, keyed by the op that wrote them.
#[derive(Clone, Debug, Default)]
struct Register {
    values: Vec<(OpId, Stored)>,
}

impl Register {
    fn winner(&self) -> Option<&Stored> {
        self.values
            .iter()
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, stored)| stored)
    }

    fn op_ids(&self) -> Vec<OpId> {
        self.values.iter().map(|(id, _)| id.clone()).collect()
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn clear(&mut self, pred: &[OpId]) {
        self.values.retain(|(id, _)| !pred.contains(id));
    }

    fn write(&mut self, id: OpId, pred: &[OpId], stored: Stored) {
        self.clear(pred);
        self.values.push((id, stored));
    }
}

#[derive(Clone, Debug)]
struct Element {
    id: OpId,
    register: Register,
}

#[derive(Clone, Debug)]
enum ObjState {
    Map(BTreeMap<String, Register>),
    /// Elements in document order, tombstones included.
    List(Vec<Element>),
}

impl ObjState {
    fn new(kind: ObjKind) -> Self {
        match kind {
            ObjKind::Map => ObjState::Map(BTreeMap::new()),
            ObjKind::List => ObjState::List(Vec::new()),
        }
    }
}

/// Materialized view of a document: every object ever created, keyed by id.
///
/// Objects that were overwritten stay in the table so that concurrent operations targeting
/// them still apply deterministically.
#[derive(Clone, Debug)]
pub(crate) struct DocState {
    objects: HashMap<ObjId, ObjState>,
}

impl Default for DocState {
    fn default() -> Self {
        let mut objects = HashMap::new();
        objects.insert(ObjId::Root, ObjState::Map(BTreeMap::new()));
        Self { objects }
    }
}

impl DocState {
    /// Apply one operation. Returns `false` when the operation references an object or
    /// element this state does not know, in which case nothing changed.
    pub(crate) fn apply(&mut self, op: &Operation) -> bool {
        match &op.kind {
            OperationKind::Put {
                obj,
                key,
                value,
                pred,
            } => {
                let stored = Self::stored_for(&op.id, value);
                let Some(register) = self.register_mut(obj, key, true) else {
                    return false;
                };
                register.write(op.id.clone(), pred, stored);
                self.create_object(&op.id, value);
                true
            }
            OperationKind::Insert { obj, after, value } => {
                let stored = Self::stored_for(&op.id, value);
                let Some(ObjState::List(elems)) = self.objects.get_mut(obj) else {
                    return false;
                };
                let idx = match after {
                    None => 0,
                    Some(after) => match elems.iter().position(|e| &e.id == after) {
                        Some(pos) => pos + 1,
                        None => return false,
                    },
                };
                let mut register = Register::default();
                register.write(op.id.clone(), &[], stored);
                elems.insert(
                    idx,
                    Element {
                        id: op.id.clone(),
                        register,
                    },
                );
                self.create_object(&op.id, value);
                true
            }
            OperationKind::Delete { obj, key, pred } => {
                let Some(register) = self.register_mut(obj, key, false) else {
                    // Deleting an entry that no longer exists changes nothing.
                    return self.objects.contains_key(obj);
                };
                register.clear(pred);
                if let (Key::Map(name), true) = (key, register.is_empty()) {
                    if let Some(ObjState::Map(entries)) = self.objects.get_mut(obj) {
                        entries.remove(name);
                    }
                }
                true
            }
        }
    }

    fn stored_for(id: &OpId, value: &NewValue) -> Stored {
        match value {
            NewValue::Scalar(s) => Stored::Scalar(s.clone()),
            NewValue::Map | NewValue::List => Stored::Obj(ObjId::Op(id.clone())),
        }
    }

    fn create_object(&mut self, id: &OpId, value: &NewValue) {
        let kind = match value {
            NewValue::Map => ObjKind::Map,
            NewValue::List => ObjKind::List,
            NewValue::Scalar(_) => return,
        };
        self.objects
            .entry(ObjId::Op(id.clone()))
            .or_insert_with(|| ObjState::new(kind));
    }

    fn register_mut(&mut self, obj: &ObjId, key: &Key, create: bool) -> Option<&mut Register> {
        match (self.objects.get_mut(obj)?, key) {
            (ObjState::Map(entries), Key::Map(name)) => {
                if create {
                    Some(entries.entry(name.clone()).or_default())
                } else {
                    entries.get_mut(name)
                }
            }
            (ObjState::List(elems), Key::Elem(id)) => {
                elems.iter_mut().find(|e| &e.id == id).map(|e| &mut e.register)
            }
            _ => None,
        }
    }

    pub(crate) fn kind(&self, obj: &ObjId) -> Option<ObjKind> {
        self.objects.get(obj).map(|state| match state {
            ObjState::Map(_) => ObjKind::Map,
            ObjState::List(_) => ObjKind::List,
        })
    }

    pub(crate) fn map_get(&self, obj: &ObjId, key: &str) -> Option<&Stored> {
        match self.objects.get(obj)? {
            ObjState::Map(entries) => entries.get(key)?.winner(),
            ObjState::List(_) => None,
        }
    }

    pub(crate) fn map_keys(&self, obj: &ObjId) -> Vec<String> {
        match self.objects.get(obj) {
            Some(ObjState::Map(entries)) => entries
                .iter()
                .filter(|(_, r)| !r.is_empty())
                .map(|(k, _)| k.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Op ids currently live at a register; the `pred` of the next write to it.
    pub(crate) fn pred(&self, obj: &ObjId, key: &Key) -> Vec<OpId> {
        match (self.objects.get(obj), key) {
            (Some(ObjState::Map(entries)), Key::Map(name)) => {
                entries.get(name).map(Register::op_ids).unwrap_or_default()
            }
            (Some(ObjState::List(elems)), Key::Elem(id)) => elems
                .iter()
                .find(|e| &e.id == id)
                .map(|e| e.register.op_ids())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn visible(&self, obj: &ObjId) -> impl Iterator<Item = &Element> {
        let elems: &[Element] = match self.objects.get(obj) {
            Some(ObjState::List(elems)) => elems,
            _ => &[],
        };
        elems.iter().filter(|e| !e.register.is_empty())
    }

    pub(crate) fn list_len(&self, obj: &ObjId) -> usize {
        self.visible(obj).count()
    }

    /// Element id at a visible index.
    pub(crate) fn list_elem(&self, obj: &ObjId, index: usize) -> Option<OpId> {
        self.visible(obj).nth(index).map(|e| e.id.clone())
    }

    pub(crate) fn list_get(&self, obj: &ObjId, index: usize) -> Option<&Stored> {
        self.visible(obj).nth(index)?.register.winner()
    }

    pub(crate) fn export_obj(&self, obj: &ObjId) -> Value {
        match self.objects.get(obj) {
            Some(ObjState::Map(entries)) => {
                let mut out = Map::new();
                for (key, register) in entries {
                    if let Some(stored) = register.winner() {
                        out.insert(key.clone(), self.export_stored(stored));
                    }
                }
                Value::Object(out)
            }
            Some(ObjState::List(_)) => Value::Array(
                self.visible(obj)
                    .filter_map(|e| e.register.winner())
                    .map(|stored| self.export_stored(stored))
                    .collect(),
            ),
            None => Value::Null,
        }
    }

    pub(crate) fn export_stored(&self, stored: &Stored) -> Value {
        match stored {
            Stored::Scalar(s) => s.to_json(),
            Stored::Obj(id) => self.export_obj(id),
        }
    }
}
