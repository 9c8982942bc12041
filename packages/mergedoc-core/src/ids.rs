use std::fmt;

use serde::{Deserialize, Serialize};

/// Lamport counter used to order operations.
pub type Counter = u64;

/// Unique identifier for a replica. Backed by raw bytes to support arbitrary identity formats.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ActorId(pub Vec<u8>);

impl ActorId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Fresh actor backed by the bytes of a random UUID.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({self})")
    }
}

impl From<ActorId> for String {
    fn from(actor: ActorId) -> Self {
        actor.to_string()
    }
}

impl TryFrom<String> for ActorId {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        hex::decode(value).map(ActorId)
    }
}

/// Globally unique identifier for an operation.
///
/// Ordering compares the counter first and the actor second, which yields a total order
/// consistent with causality: an operation always carries a higher counter than anything
/// its author had observed.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OpId {
    pub counter: Counter,
    pub actor: ActorId,
}

impl OpId {
    pub fn new(counter: Counter, actor: &ActorId) -> Self {
        Self {
            counter,
            actor: actor.clone(),
        }
    }
}

/// Identifier of a map or list inside a document.
///
/// Objects other than the root are named by the operation that created them.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ObjId {
    Root,
    Op(OpId),
}

impl From<OpId> for ObjId {
    fn from(id: OpId) -> Self {
        ObjId::Op(id)
    }
}
