use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ObjId, OpId};
use crate::value::ScalarValue;

/// Address of a register inside an object.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Map entry.
    Map(String),
    /// List element, named by the operation that inserted it.
    Elem(OpId),
}

/// Value written by a `Put` or `Insert`.
///
/// `Map` and `List` create an empty object whose id is the id of the writing operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NewValue {
    Scalar(ScalarValue),
    Map,
    List,
}

impl NewValue {
    /// Shallow conversion: containers become empty objects, to be populated by follow-up ops.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(_) => NewValue::Map,
            Value::Array(_) => NewValue::List,
            other => NewValue::Scalar(ScalarValue::from_json(other).unwrap_or(ScalarValue::Null)),
        }
    }
}

/// The document mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Overwrite a register. Only the values named in `pred` are replaced; values written
    /// concurrently survive as conflicts until a later write observes them.
    Put {
        obj: ObjId,
        key: Key,
        value: NewValue,
        pred: Vec<OpId>,
    },
    /// Insert a list element after `after` (`None` inserts at the head).
    Insert {
        obj: ObjId,
        after: Option<OpId>,
        value: NewValue,
    },
    /// Clear the register values named in `pred`.
    Delete { obj: ObjId, key: Key, pred: Vec<OpId> },
}

/// Full operation envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OpId,
    pub kind: OperationKind,
}

impl Operation {
    pub fn put(id: OpId, obj: ObjId, key: Key, value: NewValue, pred: Vec<OpId>) -> Self {
        Self {
            id,
            kind: OperationKind::Put {
                obj,
                key,
                value,
                pred,
            },
        }
    }

    pub fn insert(id: OpId, obj: ObjId, after: Option<OpId>, value: NewValue) -> Self {
        Self {
            id,
            kind: OperationKind::Insert { obj, after, value },
        }
    }

    pub fn delete(id: OpId, obj: ObjId, key: Key, pred: Vec<OpId>) -> Self {
        Self {
            id,
            kind: OperationKind::Delete { obj, key, pred },
        }
    }

    /// Object the operation targets.
    pub fn obj(&self) -> &ObjId {
        match &self.kind {
            OperationKind::Put { obj, .. }
            | OperationKind::Insert { obj, .. }
            | OperationKind::Delete { obj, .. } => obj,
        }
    }
}

/// Canonical ordering for full operations.
pub fn cmp_ops(a: &Operation, b: &Operation) -> Ordering {
    a.id.cmp(&b.id)
}
