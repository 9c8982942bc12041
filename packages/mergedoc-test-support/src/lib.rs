//! Shared fixtures and a conformance suite for [`DocumentEngine`] implementations.
//!
//! Each `check_*` function panics with a descriptive message when the engine under test
//! diverges from the expected document semantics. [`run_conformance`] runs all of them.

use mergedoc_core::{path, DocumentEngine, Error, Object};
use serde_json::{json, Value};

/// Fixture document content used by the navigation checks.
pub fn sample() -> Value {
    json!({
        "bool": true,
        "str": "foo",
        "strs": ["a", "b", "c"],
        "obj": {
            "num": 2,
            "nums": [10, 20, 30],
            "sub": {"foo": "bar"}
        }
    })
}

/// A document holding [`sample`], created in one change.
pub fn sample_doc<E: DocumentEngine>(engine: &E) -> E::Document {
    engine
        .change(&engine.init(), "seed", |root| {
            if let Value::Object(fields) = sample() {
                for (key, value) in fields {
                    root.set(&key, value)?;
                }
            }
            Ok(())
        })
        .unwrap_or_else(|e| panic!("seeding the sample document failed: {e}"))
}

fn edit<E, F>(engine: &E, doc: &E::Document, message: &str, f: F) -> E::Document
where
    E: DocumentEngine,
    F: FnOnce(&Object<'_>) -> mergedoc_core::Result<()>,
{
    engine
        .change(doc, message, f)
        .unwrap_or_else(|e| panic!("change {message:?} failed: {e}"))
}

pub fn check_empty_document<E: DocumentEngine>(engine: &E) {
    let doc = engine.init();
    assert_eq!(engine.export(&doc), json!({}));
    assert!(engine.history(&doc).is_empty());
}

pub fn check_navigation<E: DocumentEngine>(engine: &E) {
    let doc = sample_doc(engine);
    assert_eq!(engine.export(&doc), sample());

    let doc = edit(engine, &doc, "navigate", |root| {
        assert_eq!(path::get(root, "obj/nums/1"), Some(json!(20)));
        assert_eq!(path::get(root, "/strs/length"), Some(json!(3)));
        assert_eq!(path::get(root, "obj/missing/x"), None);

        path::put(root, "obj/sub/foo", "baz")?;
        path::delete(root, "strs/0")?;
        path::insert(root, "obj/nums/1", json!(15))?;
        path::insert(root, "obj/nums/", json!(40))?;
        assert_eq!(path::call(root, "strs/indexOf", &[json!("c")])?, json!(1));
        Ok(())
    });
    assert_eq!(
        engine.export(&doc),
        json!({
            "bool": true,
            "str": "foo",
            "strs": ["b", "c"],
            "obj": {"num": 2, "nums": [10, 15, 20, 30, 40], "sub": {"foo": "baz"}}
        })
    );
}

pub fn check_failed_change_is_discarded<E: DocumentEngine>(engine: &E) {
    let doc = sample_doc(engine);
    let result = engine.change(&doc, "bad", |root| {
        path::put(root, "str", "changed")?;
        path::put(root, "obj/missing/x", json!(1))
    });
    assert!(
        matches!(result, Err(Error::NotFound(_))),
        "expected NotFound, got {:?}",
        result.err()
    );
    assert_eq!(engine.export(&doc), sample());
}

pub fn check_persistence<E: DocumentEngine>(engine: &E) {
    let doc = sample_doc(engine);
    let doc = edit(engine, &doc, "second", |root| path::delete(root, "obj/nums/0"));
    let bytes = engine
        .save(&doc)
        .unwrap_or_else(|e| panic!("save failed: {e}"));
    let loaded = engine
        .load(&bytes)
        .unwrap_or_else(|e| panic!("load failed: {e}"));
    assert_eq!(engine.export(&loaded), engine.export(&doc));
    assert_eq!(engine.history(&loaded).len(), 2);
    assert!(engine.load(b"definitely not a document").is_err());
}

pub fn check_merge<E: DocumentEngine>(engine: &E) {
    let base = edit(engine, &engine.init(), "add cards", |root| {
        path::put(root, "cards", Object::new_array([]))?;
        path::call(root, "cards/push", &[json!({"title": "A", "done": false})])?;
        path::call(root, "cards/push", &[json!({"title": "B", "done": false})])?;
        Ok(())
    });
    let bytes = engine
        .save(&base)
        .unwrap_or_else(|e| panic!("save failed: {e}"));
    let copy = engine
        .load(&bytes)
        .unwrap_or_else(|e| panic!("load failed: {e}"));

    let done = edit(engine, &base, "done", |root| path::put(root, "cards/0/done", true));
    let deleted = edit(engine, &copy, "delete", |root| path::delete(root, "cards/1"));

    let merged = engine
        .merge(&done, &deleted)
        .unwrap_or_else(|e| panic!("merge failed: {e}"));
    let reversed = engine
        .merge(&deleted, &done)
        .unwrap_or_else(|e| panic!("merge failed: {e}"));
    let expected = json!({"cards": [{"title": "A", "done": true}]});
    assert_eq!(engine.export(&merged), expected);
    assert_eq!(engine.export(&reversed), expected);

    let again = engine
        .merge(&merged, &deleted)
        .unwrap_or_else(|e| panic!("merge failed: {e}"));
    assert_eq!(engine.export(&again), expected);
    assert_eq!(engine.history(&again).len(), 3);
}

pub fn check_history<E: DocumentEngine>(engine: &E) {
    let doc = edit(engine, &engine.init(), "first", |root| path::put(root, "x", json!(1)));
    let doc = edit(engine, &doc, "second", |root| path::put(root, "x", json!(2)));
    let unchanged = edit(engine, &doc, "nothing", |_| Ok(()));

    let messages: Vec<_> = engine
        .history(&unchanged)
        .into_iter()
        .map(|c| c.message)
        .collect();
    assert_eq!(messages, vec!["first".to_string(), "second".to_string()]);
}

pub fn check_history_snapshots<E: DocumentEngine>(engine: &E) {
    let doc = edit(engine, &engine.init(), "first", |root| path::put(root, "x", json!(1)));
    let doc = edit(engine, &doc, "second", |root| path::put(root, "y", json!(2)));
    let entries = engine
        .history_entries(&doc)
        .unwrap_or_else(|e| panic!("history_entries failed: {e}"));
    let snapshots: Vec<_> = entries.into_iter().map(|e| e.snapshot).collect();
    assert_eq!(snapshots, vec![json!({"x": 1}), json!({"x": 1, "y": 2})]);
}

pub fn check_same_actor_divergence_is_rejected<E: DocumentEngine>(engine: &E) {
    let base = edit(engine, &engine.init(), "base", |root| path::put(root, "n", json!(0)));
    let left = edit(engine, &base, "left", |root| path::put(root, "n", json!(1)));
    let right = edit(engine, &base.clone(), "right", |root| path::put(root, "n", json!(2)));
    assert!(
        matches!(engine.merge(&left, &right), Err(Error::InconsistentState(_))),
        "two copies edited under one actor must not merge silently"
    );
}

/// Runs every check against `engine`.
pub fn run_conformance<E: DocumentEngine>(engine: &E) {
    check_empty_document(engine);
    check_navigation(engine);
    check_failed_change_is_discarded(engine);
    check_persistence(engine);
    check_merge(engine);
    check_history(engine);
    check_history_snapshots(engine);
    check_same_actor_divergence_is_rejected(engine);
}
