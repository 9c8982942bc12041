#![forbid(unsafe_code)]
//! Path-addressed editing of a mergeable document made of nested maps and lists.
//! Replicas edit their own copies through [`Object`] handles and the [`path`] navigator,
//! then combine diverged copies with [`DocumentEngine::merge`].

pub mod codec;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod ids;
pub mod object;
pub mod ops;
pub mod path;
mod session;
mod state;
pub mod traits;
pub mod value;
pub mod version_vector;

pub use config::EngineConfig;
pub use document::{cmp_changes, Change, Document, HistoryEntry};
pub use engine::Engine;
pub use error::{Error, Result};
pub use ids::{ActorId, Counter, ObjId, OpId};
pub use object::{Assign, Object};
pub use ops::{cmp_ops, Key, NewValue, Operation, OperationKind};
pub use traits::{DocumentEngine, FixedTime, SystemTime, TimeSource};
pub use value::ScalarValue;
pub use version_vector::VersionVector;
