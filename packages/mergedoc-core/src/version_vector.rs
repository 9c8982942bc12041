use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::ActorId;

/// Per-actor change sequence numbers observed by a document.
///
/// A document always holds the full causal history of every change it knows about, so each
/// actor's changes are contiguous and the highest sequence number is enough to describe them.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(ActorId, u64)>", into = "Vec<(ActorId, u64)>")]
pub struct VersionVector {
    entries: BTreeMap<ActorId, u64>,
}

impl VersionVector {
    /// Create a new empty version vector.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn observe(&mut self, actor: &ActorId, seq: u64) {
        if seq == 0 {
            return;
        }
        let entry = self.entries.entry(actor.clone()).or_default();
        *entry = (*entry).max(seq);
    }

    pub fn merge(&mut self, other: &VersionVector) {
        for (actor, seq) in &other.entries {
            self.observe(actor, *seq);
        }
    }

    /// Whether the change `seq` of `actor` is covered.
    pub fn contains(&self, actor: &ActorId, seq: u64) -> bool {
        seq != 0 && self.get(actor) >= seq
    }

    pub fn is_aware_of(&self, other: &VersionVector) -> bool {
        other
            .entries
            .iter()
            .all(|(actor, seq)| self.contains(actor, *seq))
    }

    /// Highest observed sequence number for an actor, or 0 if not present.
    pub fn get(&self, actor: &ActorId) -> u64 {
        self.entries.get(actor).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ActorId, u64)> {
        self.entries.iter().map(|(actor, seq)| (actor, *seq))
    }
}

impl From<Vec<(ActorId, u64)>> for VersionVector {
    fn from(pairs: Vec<(ActorId, u64)>) -> Self {
        let mut vv = VersionVector::new();
        for (actor, seq) in pairs {
            vv.observe(&actor, seq);
        }
        vv
    }
}

impl From<VersionVector> for Vec<(ActorId, u64)> {
    fn from(vv: VersionVector) -> Self {
        vv.entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_takes_the_maximum_per_actor() {
        let a = ActorId::new(b"a".to_vec());
        let b = ActorId::new(b"b".to_vec());
        let mut left = VersionVector::new();
        left.observe(&a, 3);
        left.observe(&b, 1);
        let mut right = VersionVector::new();
        right.observe(&b, 4);

        left.merge(&right);
        assert_eq!(left.get(&a), 3);
        assert_eq!(left.get(&b), 4);
        assert!(left.is_aware_of(&right));
        assert!(!right.is_aware_of(&left));
    }

    #[test]
    fn zero_is_never_observed() {
        let mut vv = VersionVector::new();
        vv.observe(&ActorId::new(b"a".to_vec()), 0);
        assert!(vv.is_empty());
        assert!(!vv.contains(&ActorId::new(b"a".to_vec()), 0));
    }

    #[test]
    fn serializes_as_pair_list() {
        let mut vv = VersionVector::new();
        vv.observe(&ActorId::new(vec![0x0a]), 2);
        let json = serde_json::to_string(&vv).unwrap();
        assert_eq!(json, r#"[["0a",2]]"#);
        let back: VersionVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vv);
    }
}
