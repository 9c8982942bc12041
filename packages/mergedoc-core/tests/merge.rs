mod common;

use common::{engine, sample_doc};
use mergedoc_core::{path, ActorId, DocumentEngine, Error, Object};
use serde_json::json;

#[test]
fn cards_quickstart_converges() {
    let engine = engine(b"a");
    let doc1 = engine
        .change(&engine.init(), "add cards", |root| {
            path::put(root, "cards", Object::new_array([]))?;
            path::call(
                root,
                "cards/push",
                &[json!({"title": "Rewrite everything in Go", "done": false})],
            )?;
            path::call(
                root,
                "cards/push",
                &[json!({"title": "Rewrite everything in Zig", "done": false})],
            )?;
            Ok(())
        })
        .unwrap();

    let saved = engine.save(&doc1).unwrap();
    let doc2 = engine.load(&saved).unwrap();
    assert_ne!(doc1.actor(), doc2.actor());

    let doc1 = engine
        .change(&doc1, "mark card as done", |root| {
            path::put(root, "cards/0/done", true)
        })
        .unwrap();
    let doc2 = engine
        .change(&doc2, "delete card", |root| path::delete(root, "cards/1"))
        .unwrap();

    let merged = engine.merge(&doc1, &doc2).unwrap();
    assert_eq!(
        merged.export(),
        json!({"cards": [{"title": "Rewrite everything in Go", "done": true}]})
    );
    assert_eq!(
        engine.merge(&doc2, &doc1).unwrap().export(),
        merged.export()
    );
    assert_eq!(engine.history(&merged).len(), 3);
}

#[test]
fn merge_is_commutative_for_conflicting_writes() {
    let engine = engine(b"a");
    let base = sample_doc(&engine);
    let left = base.with_actor(ActorId::new(b"left".to_vec()));
    let right = base.with_actor(ActorId::new(b"right".to_vec()));

    let left = engine
        .change(&left, "left", |root| {
            path::put(root, "str", "from left")?;
            path::insert(root, "strs/0", json!("L"))
        })
        .unwrap();
    let right = engine
        .change(&right, "right", |root| {
            path::put(root, "str", "from right")?;
            path::insert(root, "strs/0", json!("R"))
        })
        .unwrap();

    let lr = engine.merge(&left, &right).unwrap();
    let rl = engine.merge(&right, &left).unwrap();
    assert_eq!(lr.export(), rl.export());
    // equal counters: the greater actor wins, and its insert lands first
    assert_eq!(lr.get("str"), Some(json!("from right")));
    assert_eq!(lr.get("strs"), Some(json!(["R", "L", "a", "b", "c"])));
}

#[test]
fn merge_is_idempotent() {
    let engine = engine(b"a");
    let a = sample_doc(&engine);
    let b = engine
        .change(&a.with_actor(ActorId::new(b"b".to_vec())), "b", |root| {
            path::delete(root, "obj")
        })
        .unwrap();

    let once = engine.merge(&a, &b).unwrap();
    let twice = engine.merge(&once, &b).unwrap();
    assert_eq!(once.export(), twice.export());
    assert_eq!(once.changes().len(), twice.changes().len());
    assert_eq!(engine.merge(&a, &a).unwrap().export(), a.export());
}

#[test]
fn merge_keeps_the_local_actor() {
    let engine = engine(b"a");
    let a = sample_doc(&engine);
    let b = engine
        .change(&a.with_actor(ActorId::new(b"b".to_vec())), "b", |root| {
            path::put(root, "bool", false)
        })
        .unwrap();
    let merged = engine.merge(&a, &b).unwrap();
    assert_eq!(merged.actor(), a.actor());

    // later local edits outrank everything merged in
    let next = engine
        .change(&merged, "after merge", |root| path::put(root, "bool", true))
        .unwrap();
    assert!(next.max_op() > b.max_op());
    assert_eq!(next.get("bool"), Some(json!(true)));
}

#[test]
fn concurrent_edit_survives_concurrent_delete_of_the_same_element() {
    let engine = engine(b"a");
    let base = sample_doc(&engine);
    let editor = engine
        .change(&base.with_actor(ActorId::new(b"e".to_vec())), "edit", |root| {
            path::put(root, "strs/1", "B")
        })
        .unwrap();
    let deleter = engine
        .change(&base.with_actor(ActorId::new(b"d".to_vec())), "delete", |root| {
            path::delete(root, "strs/1")
        })
        .unwrap();
    let merged = engine.merge(&editor, &deleter).unwrap();
    assert_eq!(merged.get("strs"), Some(json!(["a", "B", "c"])));
}

#[test]
fn documents_edited_on_other_threads_merge() {
    let engine = engine(b"a");
    let base = sample_doc(&engine);
    let handles: Vec<_> = (0..3u8)
        .map(|i| {
            let engine = engine.clone();
            let doc = base.with_actor(ActorId::new(vec![b't', i]));
            std::thread::spawn(move || {
                engine
                    .change(&doc, "push", |root| path::insert(root, "strs/", json!(i)))
                    .unwrap()
            })
        })
        .collect();
    let mut merged = base;
    for handle in handles {
        merged = engine.merge(&merged, &handle.join().unwrap()).unwrap();
    }
    assert_eq!(merged.get("strs/length"), Some(json!(6)));
}

#[test]
fn documents_diverged_under_one_actor_refuse_to_merge() {
    let engine = engine(b"a");
    let x = engine
        .change(&engine.init(), "x", |root| path::put(root, "x", json!(1)))
        .unwrap();
    let y = engine
        .change(&engine.init(), "y", |root| path::put(root, "y", json!(2)))
        .unwrap();
    assert_eq!(x.actor(), y.actor());
    assert!(matches!(engine.merge(&x, &y), Err(Error::InconsistentState(_))));
    assert!(matches!(engine.merge(&y, &x), Err(Error::InconsistentState(_))));
}

#[test]
fn cloned_copies_edited_on_both_sides_refuse_to_merge() {
    let engine = engine(b"a");
    let base = engine
        .change(&engine.init(), "base", |root| path::put(root, "l", json!([])))
        .unwrap();
    let one = engine
        .change(&base, "one", |root| path::insert(root, "l/", json!("one")))
        .unwrap();
    let two = engine
        .change(&base.clone(), "two", |root| path::insert(root, "l/", json!("two")))
        .unwrap();
    assert!(matches!(engine.merge(&one, &two), Err(Error::InconsistentState(_))));

    // the same edits merge once the copy is forked under its own actor
    let two = engine
        .change(
            &base.with_actor(ActorId::new(b"b".to_vec())),
            "two",
            |root| path::insert(root, "l/", json!("two")),
        )
        .unwrap();
    let merged = engine.merge(&one, &two).unwrap();
    assert_eq!(merged.get("l/length"), Some(json!(2)));
    assert_eq!(engine.merge(&two, &one).unwrap().export(), merged.export());
}

#[test]
fn shared_history_reloaded_from_bytes_still_merges() {
    let engine = engine(b"a");
    let base = sample_doc(&engine);
    let reloaded = engine.load(&engine.save(&base).unwrap()).unwrap();
    let reloaded = engine
        .change(&reloaded, "edit", |root| path::put(root, "str", "bar"))
        .unwrap();
    let merged = engine.merge(&base, &reloaded).unwrap();
    assert_eq!(merged.get("str"), Some(json!("bar")));
}
