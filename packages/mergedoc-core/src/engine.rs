use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::codec;
use crate::config::EngineConfig;
use crate::document::{Change, Document, HistoryEntry};
use crate::error::{Error, Result};
use crate::ids::ActorId;
use crate::object::Object;
use crate::traits::DocumentEngine;

/// Native op-log engine.
///
/// Operations are ordered by `(counter, actor)`; replaying the union of two histories in that
/// order is what makes merges deterministic.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl DocumentEngine for Engine {
    type Document = Document;

    fn init(&self) -> Document {
        Document::empty(self.config.init_actor())
    }

    fn change<F>(&self, doc: &Document, message: &str, mutator: F) -> Result<Document>
    where
        F: FnOnce(&Object<'_>) -> Result<()>,
    {
        let session = RefCell::new(doc.session(true));
        mutator(&Object::root(&session))?;
        let (state, ops) = session.into_inner().into_parts();

        let Some(start_op) = ops.first().map(|op| op.id.counter) else {
            debug!(summary = message, "change produced no operations");
            return Ok(doc.clone());
        };
        let change = Change {
            actor: doc.actor().clone(),
            seq: doc.clock().get(doc.actor()) + 1,
            start_op,
            time: self.config.time.now_millis(),
            message: message.to_owned(),
            deps: doc.clock().clone(),
            ops,
        };
        debug!(
            actor = %change.actor,
            seq = change.seq,
            ops = change.ops.len(),
            summary = message,
            "committed change"
        );
        Ok(doc.advance(state, change))
    }

    fn save(&self, doc: &Document) -> Result<Vec<u8>> {
        codec::encode(doc.changes())
    }

    /// The loaded document is a new replica and gets a fresh actor.
    fn load(&self, bytes: &[u8]) -> Result<Document> {
        let changes: Vec<Arc<Change>> = codec::decode(bytes)?.into_iter().map(Arc::new).collect();
        let count = changes.len();
        let doc = Document::from_changes(ActorId::random(), changes)
            .map_err(|e| Error::Decode(format!("saved history does not replay: {e}")))?;
        debug!(changes = count, actor = %doc.actor(), "loaded document");
        Ok(doc)
    }

    /// Fails with [`Error::InconsistentState`] when both documents hold different changes
    /// under the same `(actor, seq)`, which happens when one actor edits two copies.
    fn merge(&self, a: &Document, b: &Document) -> Result<Document> {
        let known: BTreeMap<(&ActorId, u64), &Arc<Change>> = a
            .changes()
            .iter()
            .map(|c| ((&c.actor, c.seq), c))
            .collect();
        for change in b.changes() {
            if let Some(&local) = known.get(&(&change.actor, change.seq)) {
                if !Arc::ptr_eq(local, change) && local != change {
                    return Err(Error::InconsistentState(format!(
                        "actor {} made two different changes with seq {}; \
                         fork copies with Document::with_actor before editing them",
                        change.actor, change.seq
                    )));
                }
            }
        }

        if a.clock().is_aware_of(b.clock()) {
            debug!("merge source already included");
            return Ok(a.clone());
        }
        let mut changes = a.changes().to_vec();
        let before = changes.len();
        changes.extend(
            b.changes()
                .iter()
                .filter(|c| !a.clock().contains(&c.actor, c.seq))
                .cloned(),
        );
        debug!(
            local = before,
            incoming = changes.len() - before,
            "merging documents"
        );
        Document::from_changes(a.actor().clone(), changes)
    }

    fn history(&self, doc: &Document) -> Vec<Change> {
        doc.changes().iter().map(|c| Change::clone(c)).collect()
    }

    fn history_entries(&self, doc: &Document) -> Result<Vec<HistoryEntry>> {
        doc.history_entries()
    }

    fn export(&self, doc: &Document) -> Value {
        doc.export()
    }
}
