//! Handles over single document nodes.
//!
//! An [`Object`] is a transient view: it is bound to whatever value sat at its address when it
//! was obtained, and it borrows the editing session for its whole life. Map and list handles
//! are live, so structural changes made through a child are visible through its parent.

use std::cell::RefCell;
use std::fmt;

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{Error, Result};
use crate::ids::ObjId;
use crate::ops::Key;
use crate::path::parse_index;
use crate::session::Session;
use crate::state::{DocState, ObjKind, Stored};

/// Virtual list member reporting the number of visible elements.
const LENGTH: &str = "length";

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Absent,
    /// Scalar, or a map/array detached from the document.
    Value(Value),
    Map(ObjId),
    List(ObjId),
}

impl Node {
    fn from_stored(state: &DocState, stored: &Stored) -> Node {
        match stored {
            Stored::Scalar(s) => Node::Value(s.to_json()),
            Stored::Obj(id) => match state.kind(id) {
                Some(ObjKind::Map) => Node::Map(id.clone()),
                Some(ObjKind::List) => Node::List(id.clone()),
                None => Node::Absent,
            },
        }
    }
}

/// Handle over one node of a document.
#[derive(Clone)]
pub struct Object<'a> {
    session: &'a RefCell<Session>,
    node: Node,
}

/// Right-hand side of [`Object::set`].
pub enum Assign<'a> {
    /// Plain value; maps and arrays are created as fresh document objects.
    Value(Value),
    /// Existing handle. Re-assigning the node already stored at the key is a no-op, any other
    /// map or list is copied.
    Node(Object<'a>),
}

impl From<Value> for Assign<'_> {
    fn from(value: Value) -> Self {
        Assign::Value(value)
    }
}

impl From<&str> for Assign<'_> {
    fn from(value: &str) -> Self {
        Assign::Value(Value::from(value))
    }
}

impl From<String> for Assign<'_> {
    fn from(value: String) -> Self {
        Assign::Value(Value::from(value))
    }
}

impl From<bool> for Assign<'_> {
    fn from(value: bool) -> Self {
        Assign::Value(Value::from(value))
    }
}

impl<'a> From<Object<'a>> for Assign<'a> {
    fn from(obj: Object<'a>) -> Self {
        Assign::Node(obj)
    }
}

impl<'a> From<&Object<'a>> for Assign<'a> {
    fn from(obj: &Object<'a>) -> Self {
        Assign::Node(obj.clone())
    }
}

impl fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object").field("node", &self.node).finish()
    }
}

impl<'a> Object<'a> {
    pub(crate) fn root(session: &'a RefCell<Session>) -> Self {
        Self {
            session,
            node: Node::Map(ObjId::Root),
        }
    }

    fn bind(&self, node: Node) -> Self {
        Self {
            session: self.session,
            node,
        }
    }

    /// Fresh, unattached map for use with [`Object::set`] or `push`.
    pub fn new_object() -> Value {
        Value::Object(Map::new())
    }

    /// Fresh, unattached array.
    pub fn new_array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(items.into_iter().collect())
    }

    pub fn is_absent(&self) -> bool {
        self.node == Node::Absent
    }

    pub fn is_map(&self) -> bool {
        matches!(self.node, Node::Map(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.node, Node::List(_))
    }

    /// Number of visible elements of a list node.
    pub fn length(&self) -> Option<usize> {
        match &self.node {
            Node::List(obj) => Some(self.session.borrow().state().list_len(obj)),
            Node::Value(Value::Array(items)) => Some(items.len()),
            _ => None,
        }
    }

    /// Keys of a map node, sorted.
    pub fn keys(&self) -> Vec<String> {
        match &self.node {
            Node::Map(obj) => self.session.borrow().state().map_keys(obj),
            Node::Value(Value::Object(fields)) => fields.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Child named or indexed by `key`. Yields an absent handle when there is none.
    pub fn get(&self, key: &str) -> Object<'a> {
        let session = self.session.borrow();
        let state = session.state();
        let node = match &self.node {
            Node::Map(obj) => state
                .map_get(obj, key)
                .map(|stored| Node::from_stored(state, stored)),
            Node::List(obj) if key == LENGTH => Some(Node::Value(state.list_len(obj).into())),
            Node::List(obj) => parse_index(key)
                .and_then(|index| state.list_get(obj, index))
                .map(|stored| Node::from_stored(state, stored)),
            Node::Value(Value::Object(fields)) => fields.get(key).cloned().map(Node::Value),
            Node::Value(Value::Array(items)) if key == LENGTH => {
                Some(Node::Value(items.len().into()))
            }
            Node::Value(Value::Array(items)) => parse_index(key)
                .and_then(|index| items.get(index))
                .cloned()
                .map(Node::Value),
            Node::Value(_) | Node::Absent => None,
        };
        self.bind(node.unwrap_or(Node::Absent))
    }

    /// Write `value` at `key`: upsert on maps, overwrite of an existing index on lists.
    pub fn set(&self, key: &str, value: impl Into<Assign<'a>>) -> Result<()> {
        let value = match value.into() {
            Assign::Value(value) => value,
            Assign::Node(other) => match &other.node {
                Node::Absent => {
                    return Err(Error::NotFound(format!(
                        "cannot assign an absent value to {key:?}"
                    )))
                }
                Node::Value(value) => value.clone(),
                Node::Map(_) | Node::List(_) => {
                    if std::ptr::eq(self.session, other.session) && self.get(key).node == other.node
                    {
                        trace!(key, "node already stored at key; write-back is a no-op");
                        return Ok(());
                    }
                    other.export()
                }
            },
        };

        let mut session = self.session.borrow_mut();
        match &self.node {
            Node::Map(obj) => session.put(obj, Key::Map(key.to_owned()), &value),
            Node::List(obj) => {
                let index = list_index(key)?;
                let len = session.state().list_len(obj);
                let elem = session
                    .state()
                    .list_elem(obj, index)
                    .ok_or(Error::IndexOutOfBounds { index, len })?;
                session.put(obj, Key::Elem(elem), &value)
            }
            Node::Value(_) => Err(self.not_a_container("set")),
            Node::Absent => Err(Error::NotFound(format!("cannot set {key:?} on an absent node"))),
        }
    }

    /// Remove a map entry, or a list element (later elements shift left).
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut session = self.session.borrow_mut();
        match &self.node {
            Node::Map(obj) => session.delete(obj, Key::Map(key.to_owned())),
            Node::List(obj) => session.remove_at(obj, list_index(key)?).map(|_| ()),
            Node::Value(_) => Err(self.not_a_container("delete")),
            Node::Absent => Err(Error::NotFound(format!(
                "cannot delete {key:?} on an absent node"
            ))),
        }
    }

    /// Invoke a list method on this node.
    ///
    /// Supported: `push`, `pop`, `shift`, `unshift`, `splice`, `insertAt`, `deleteAt` and
    /// `indexOf`, with the argument conventions of JavaScript arrays.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Object<'a>> {
        match &self.node {
            Node::List(obj) => self.call_list(obj, method, args),
            Node::Absent => Err(Error::NotFound(format!(
                "cannot call {method} on an absent node"
            ))),
            Node::Map(_) | Node::Value(_) => Err(Error::NotCallable(method.to_owned())),
        }
    }

    fn call_list(&self, list: &ObjId, method: &str, args: &[Value]) -> Result<Object<'a>> {
        if method == "indexOf" {
            let needle = args.first().cloned().unwrap_or(Value::Null);
            let position = match self.export() {
                Value::Array(items) => items.iter().position(|item| item == &needle),
                _ => None,
            };
            let found = position.map(|p| p as i64).unwrap_or(-1);
            return Ok(self.bind(Node::Value(found.into())));
        }

        let mut session = self.session.borrow_mut();
        let len = session.state().list_len(list);
        let result = match method {
            "push" => {
                for item in args {
                    let end = session.state().list_len(list);
                    session.insert(list, end, item)?;
                }
                Value::from(session.state().list_len(list))
            }
            "unshift" => {
                for (offset, item) in args.iter().enumerate() {
                    session.insert(list, offset, item)?;
                }
                Value::from(session.state().list_len(list))
            }
            "pop" | "shift" => {
                if len == 0 {
                    return Ok(self.bind(Node::Absent));
                }
                let index = if method == "pop" { len - 1 } else { 0 };
                session.remove_at(list, index)?
            }
            "splice" => {
                let start = relative_index(int_arg(method, args, 0)?, len);
                let count = match args.get(1) {
                    None => len - start,
                    Some(_) => (int_arg(method, args, 1)?.max(0) as usize).min(len - start),
                };
                let mut removed = Vec::with_capacity(count);
                for _ in 0..count {
                    removed.push(session.remove_at(list, start)?);
                }
                for (offset, item) in args.iter().skip(2).enumerate() {
                    session.insert(list, start + offset, item)?;
                }
                Value::Array(removed)
            }
            "insertAt" => {
                let index = index_arg(method, args, 0)?;
                if index > len {
                    return Err(Error::IndexOutOfBounds { index, len });
                }
                for (offset, item) in args.iter().skip(1).enumerate() {
                    session.insert(list, index + offset, item)?;
                }
                return Ok(self.clone());
            }
            "deleteAt" => {
                let index = index_arg(method, args, 0)?;
                let count = match args.get(1) {
                    None => 1,
                    Some(_) => index_arg(method, args, 1)?,
                };
                if index.checked_add(count).map_or(true, |end| end > len) {
                    return Err(Error::IndexOutOfBounds { index, len });
                }
                for _ in 0..count {
                    session.remove_at(list, index)?;
                }
                return Ok(self.clone());
            }
            _ => return Err(Error::NotCallable(method.to_owned())),
        };
        Ok(self.bind(Node::Value(result)))
    }

    /// Detached deep copy of this node; absent handles export as `null`.
    pub fn export(&self) -> Value {
        match &self.node {
            Node::Absent => Value::Null,
            Node::Value(value) => value.clone(),
            Node::Map(obj) | Node::List(obj) => self.session.borrow().state().export_obj(obj),
        }
    }

    fn not_a_container(&self, action: &str) -> Error {
        match &self.node {
            Node::Value(Value::Object(_) | Value::Array(_)) => {
                Error::ReadOnly(format!("cannot {action} on a detached value"))
            }
            _ => Error::TypeMismatch(format!("cannot {action} a member of a scalar")),
        }
    }
}

fn list_index(key: &str) -> Result<usize> {
    parse_index(key).ok_or_else(|| Error::TypeMismatch(format!("list index expected, got {key:?}")))
}

fn int_arg(method: &str, args: &[Value], position: usize) -> Result<i64> {
    args.get(position).and_then(Value::as_i64).ok_or_else(|| {
        Error::TypeMismatch(format!(
            "{method} expects an integer argument at position {position}"
        ))
    })
}

fn index_arg(method: &str, args: &[Value], position: usize) -> Result<usize> {
    args.get(position)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| {
            Error::TypeMismatch(format!(
                "{method} expects a non-negative index at position {position}"
            ))
        })
}

/// Clamp a possibly negative start position into `0..=len`; negative values count from the end.
fn relative_index(start: i64, len: usize) -> usize {
    if start < 0 {
        len.saturating_sub(start.unsigned_abs() as usize)
    } else {
        (start as usize).min(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ActorId;
    use serde_json::json;

    fn session() -> RefCell<Session> {
        RefCell::new(Session::new(
            ActorId::new(b"t".to_vec()),
            0,
            DocState::default(),
            true,
        ))
    }

    #[test]
    fn set_then_get_on_maps() {
        let cell = session();
        let root = Object::root(&cell);
        root.set("title", "hello").unwrap();
        root.set("meta", json!({"n": 1, "tags": ["a"]})).unwrap();
        assert_eq!(root.get("title").export(), json!("hello"));
        assert_eq!(root.get("meta").get("tags").get("0").export(), json!("a"));
        assert!(root.get("meta").is_map());
        assert!(root.get("meta").get("tags").is_list());
        assert_eq!(root.keys(), vec!["meta".to_string(), "title".to_string()]);
    }

    #[test]
    fn missing_members_chain_to_absent() {
        let cell = session();
        let root = Object::root(&cell);
        let missing = root.get("nope").get("deeper");
        assert!(missing.is_absent());
        assert_eq!(missing.export(), Value::Null);
        assert!(matches!(missing.set("x", true), Err(Error::NotFound(_))));
        assert!(matches!(missing.call("push", &[]), Err(Error::NotFound(_))));
    }

    #[test]
    fn list_set_requires_existing_index() {
        let cell = session();
        let root = Object::root(&cell);
        root.set("l", Object::new_array([json!(1), json!(2)])).unwrap();
        let list = root.get("l");
        list.set("1", json!(20)).unwrap();
        assert_eq!(list.export(), json!([1, 20]));
        assert!(matches!(
            list.set("2", json!(3)),
            Err(Error::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert!(matches!(list.set("x", json!(3)), Err(Error::TypeMismatch(_))));
        assert_eq!(list.get("length").export(), json!(2));
    }

    #[test]
    fn list_methods_follow_array_conventions() {
        let cell = session();
        let root = Object::root(&cell);
        root.set("l", Object::new_array([])).unwrap();
        let list = root.get("l");
        assert_eq!(list.call("push", &[json!("a"), json!("b")]).unwrap().export(), json!(2));
        assert_eq!(list.call("unshift", &[json!("z")]).unwrap().export(), json!(3));
        assert_eq!(
            list.call("splice", &[json!(-2), json!(1), json!("x"), json!("y")])
                .unwrap()
                .export(),
            json!(["a"])
        );
        assert_eq!(list.export(), json!(["z", "x", "y", "b"]));
        assert_eq!(list.call("indexOf", &[json!("y")]).unwrap().export(), json!(2));
        assert_eq!(list.call("indexOf", &[json!("q")]).unwrap().export(), json!(-1));
        assert_eq!(list.call("pop", &[]).unwrap().export(), json!("b"));
        assert_eq!(list.call("shift", &[]).unwrap().export(), json!("z"));
        list.call("insertAt", &[json!(1), json!("m")]).unwrap();
        assert_eq!(list.export(), json!(["x", "m", "y"]));
        list.call("deleteAt", &[json!(0), json!(2)]).unwrap();
        assert_eq!(list.export(), json!(["y"]));
        assert!(list.call("deleteAt", &[json!(1)]).is_err());
    }

    #[test]
    fn delete_at_and_insert_at_reject_out_of_range_arguments() {
        let cell = session();
        let root = Object::root(&cell);
        root.set("l", json!(["a", "b", "c"])).unwrap();
        let list = root.get("l");

        let huge = json!(u64::MAX);
        assert!(matches!(
            list.call("deleteAt", &[huge.clone(), json!(1)]),
            Err(Error::IndexOutOfBounds { len: 3, .. })
        ));
        assert!(matches!(
            list.call("deleteAt", &[json!(1), huge.clone()]),
            Err(Error::IndexOutOfBounds { index: 1, len: 3 })
        ));
        assert!(matches!(
            list.call("deleteAt", &[json!(2), json!(2)]),
            Err(Error::IndexOutOfBounds { index: 2, len: 3 })
        ));
        assert!(matches!(
            list.call("deleteAt", &[json!(-1)]),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            list.call("insertAt", &[huge, json!("x")]),
            Err(Error::IndexOutOfBounds { len: 3, .. })
        ));
        assert!(matches!(
            list.call("insertAt", &[json!(4), json!("x")]),
            Err(Error::IndexOutOfBounds { index: 4, len: 3 })
        ));
        assert!(matches!(list.call("insertAt", &[]), Err(Error::TypeMismatch(_))));
        assert_eq!(list.export(), json!(["a", "b", "c"]));

        // boundary positions are accepted
        list.call("insertAt", &[json!(3), json!("d")]).unwrap();
        list.call("deleteAt", &[json!(0), json!(0)]).unwrap();
        list.call("deleteAt", &[json!(2), json!(2)]).unwrap();
        assert_eq!(list.export(), json!(["a", "b"]));
    }

    #[test]
    fn pop_on_empty_list_is_absent() {
        let cell = session();
        let root = Object::root(&cell);
        root.set("l", Object::new_array([])).unwrap();
        assert!(root.get("l").call("pop", &[]).unwrap().is_absent());
    }

    #[test]
    fn maps_and_scalars_are_not_callable() {
        let cell = session();
        let root = Object::root(&cell);
        root.set("n", json!(1)).unwrap();
        assert!(matches!(root.call("splice", &[]), Err(Error::NotCallable(m)) if m == "splice"));
        assert!(matches!(root.get("n").call("push", &[]), Err(Error::NotCallable(_))));
        root.set("l", Object::new_array([])).unwrap();
        assert!(matches!(root.get("l").call("frobnicate", &[]), Err(Error::NotCallable(_))));
    }

    #[test]
    fn reassigning_a_live_node_is_a_no_op() {
        let cell = session();
        let root = Object::root(&cell);
        root.set("l", Object::new_array([json!(1)])).unwrap();
        let list = root.get("l");
        list.call("push", &[json!(2)]).unwrap();
        let before = cell.borrow().state().pred(&ObjId::Root, &Key::Map("l".into()));
        root.set("l", &list).unwrap();
        let after = cell.borrow().state().pred(&ObjId::Root, &Key::Map("l".into()));
        assert_eq!(before, after);
        assert_eq!(root.get("l").export(), json!([1, 2]));
    }

    #[test]
    fn assigning_another_node_copies_it() {
        let cell = session();
        let root = Object::root(&cell);
        root.set("a", json!({"x": [1]})).unwrap();
        root.set("b", root.get("a")).unwrap();
        root.get("b").get("x").call("push", &[json!(2)]).unwrap();
        assert_eq!(root.get("a").export(), json!({"x": [1]}));
        assert_eq!(root.get("b").export(), json!({"x": [1, 2]}));
    }

    #[test]
    fn detached_values_are_read_only() {
        let cell = session();
        let root = Object::root(&cell);
        root.set("l", Object::new_array([json!({"k": 1})])).unwrap();
        let removed = root.get("l").call("splice", &[json!(0), json!(1)]).unwrap();
        assert_eq!(removed.get("0").get("k").export(), json!(1));
        assert!(matches!(removed.set("0", json!(1)), Err(Error::ReadOnly(_))));
    }

    #[test]
    fn read_only_sessions_reject_writes() {
        let cell = RefCell::new(Session::new(
            ActorId::new(b"t".to_vec()),
            0,
            DocState::default(),
            false,
        ));
        let root = Object::root(&cell);
        assert!(matches!(root.set("x", true), Err(Error::ReadOnly(_))));
    }

    #[test]
    fn relative_index_clamps() {
        assert_eq!(relative_index(-1, 3), 2);
        assert_eq!(relative_index(-10, 3), 0);
        assert_eq!(relative_index(7, 3), 3);
    }
}
