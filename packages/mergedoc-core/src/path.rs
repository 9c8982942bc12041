//! Slash-delimited addressing over [`Object`] handles.
//!
//! A path such as `/obj/nums/0` is split into a navigation prefix (`obj`, `nums`) walked with
//! [`Object::get`], and a target segment (`0`) that the operation applies to. A trailing slash
//! leaves the target empty, which [`insert`] reads as "append".

use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};
use crate::object::{Assign, Object};

/// Strip one leading `/` and split on `/`. Always yields at least one segment.
pub fn split_path(path: &str) -> Vec<&str> {
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}

/// A segment addresses a list position iff it parses as a non-negative integer.
pub fn parse_index(segment: &str) -> Option<usize> {
    segment.parse().ok()
}

/// Container reached by walking the navigation prefix.
struct Target<'a, 'p> {
    /// Node one level up and the key `obj` is stored under; `None` at the root.
    parent: Option<(Object<'a>, &'p str)>,
    obj: Object<'a>,
    key: &'p str,
}

impl<'a, 'p> Target<'a, 'p> {
    fn locate(root: &Object<'a>, path: &'p str) -> Result<Self> {
        let segments = split_path(path);
        let (key, prefix) = segments
            .split_last()
            .ok_or_else(|| Error::NotFound(path.to_owned()))?;
        let mut parent = None;
        let mut obj = root.clone();
        for segment in prefix {
            let next = obj.get(segment);
            if next.is_absent() {
                return Err(Error::NotFound(format!("{segment:?} in {path:?}")));
            }
            parent = Some((obj, *segment));
            obj = next;
        }
        Ok(Target {
            parent,
            obj,
            key: *key,
        })
    }

    fn require_list(&self) -> Result<usize> {
        self.obj.length().filter(|_| self.obj.is_list()).ok_or_else(|| {
            Error::TypeMismatch(format!("list index {:?} used on a non-list node", self.key))
        })
    }

    /// Re-assign the mutated container into its parent.
    fn write_back(&self) -> Result<()> {
        match &self.parent {
            Some((parent, key)) => parent.set(key, &self.obj),
            None => {
                trace!("container is the root; nothing to write back");
                Ok(())
            }
        }
    }
}

/// Read the value at `path`. `None` when any segment is missing; a stored `null` is
/// `Some(Value::Null)`.
pub fn get(root: &Object<'_>, path: &str) -> Option<Value> {
    let mut obj = root.clone();
    for segment in split_path(path) {
        obj = obj.get(segment);
        if obj.is_absent() {
            return None;
        }
    }
    Some(obj.export())
}

/// Write `value` at `path`.
pub fn put<'a>(root: &Object<'a>, path: &str, value: impl Into<Assign<'a>>) -> Result<()> {
    let target = Target::locate(root, path)?;
    target.obj.set(target.key, value)
}

/// Remove the map entry or list element at `path`.
pub fn delete(root: &Object<'_>, path: &str) -> Result<()> {
    let target = Target::locate(root, path)?;
    let Some(index) = parse_index(target.key) else {
        return target.obj.delete(target.key);
    };
    let len = target.require_list()?;
    if index >= len {
        return Err(Error::IndexOutOfBounds { index, len });
    }
    target
        .obj
        .call("splice", &[Value::from(index), Value::from(1)])?;
    target.write_back()
}

/// Insert `value` into a list. A trailing slash appends; a numeric target inserts before
/// that index.
pub fn insert(root: &Object<'_>, path: &str, value: Value) -> Result<()> {
    let target = Target::locate(root, path)?;
    if target.key.is_empty() {
        target.require_list()?;
        target.obj.call("push", &[value])?;
        return target.write_back();
    }
    let index = parse_index(target.key).ok_or_else(|| {
        Error::TypeMismatch(format!(
            "insert target must be a list index or empty, got {:?}",
            target.key
        ))
    })?;
    let len = target.require_list()?;
    if index > len {
        return Err(Error::IndexOutOfBounds { index, len });
    }
    target
        .obj
        .call("splice", &[Value::from(index), Value::from(0), value])?;
    target.write_back()
}

/// Invoke the method named by the last segment on the node addressed by the rest.
pub fn call(root: &Object<'_>, path: &str, args: &[Value]) -> Result<Value> {
    let target = Target::locate(root, path)?;
    Ok(target.obj.call(target.key, args)?.export())
}
