use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::Value;

use crate::document::{Change, HistoryEntry};
use crate::error::Result;
use crate::object::Object;

/// Pluggable wall clock used to stamp changes.
pub trait TimeSource: Send + Sync + Debug {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Real system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Deterministic clock for tests: starts at a fixed instant and advances by one
/// millisecond per reading.
#[derive(Debug, Default)]
pub struct FixedTime {
    millis: AtomicI64,
}

impl FixedTime {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }
}

impl TimeSource for FixedTime {
    fn now_millis(&self) -> i64 {
        self.millis.fetch_add(1, Ordering::SeqCst)
    }
}

/// Capability contract of a mergeable document engine.
///
/// Documents are values: every operation returns a new document and leaves its inputs
/// untouched.
pub trait DocumentEngine {
    type Document: Clone;

    /// New, empty document.
    fn init(&self) -> Self::Document;

    /// Run `mutator` against a writable root and commit everything it did as one change.
    fn change<F>(&self, doc: &Self::Document, message: &str, mutator: F) -> Result<Self::Document>
    where
        F: FnOnce(&Object<'_>) -> Result<()>;

    fn save(&self, doc: &Self::Document) -> Result<Vec<u8>>;

    fn load(&self, bytes: &[u8]) -> Result<Self::Document>;

    fn merge(&self, a: &Self::Document, b: &Self::Document) -> Result<Self::Document>;

    fn history(&self, doc: &Self::Document) -> Vec<Change>;

    /// History with a snapshot of the document content after each change.
    fn history_entries(&self, doc: &Self::Document) -> Result<Vec<HistoryEntry>>;

    /// Detached JSON copy of the whole document.
    fn export(&self, doc: &Self::Document) -> Value;
}
