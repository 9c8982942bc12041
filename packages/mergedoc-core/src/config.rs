use std::sync::Arc;

use crate::ids::ActorId;
use crate::traits::{SystemTime, TimeSource};

/// Engine context. Owned by the application and passed explicitly; there is no process-wide
/// engine instance.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Actor used by documents created with `init`. A random actor is generated when unset.
    pub actor: Option<ActorId>,
    /// Clock stamped onto every committed change.
    pub time: Arc<dyn TimeSource>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            actor: None,
            time: Arc::new(SystemTime),
        }
    }
}

impl EngineConfig {
    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_time(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Arc::new(time);
        self
    }

    pub(crate) fn init_actor(&self) -> ActorId {
        self.actor.clone().unwrap_or_else(ActorId::random)
    }
}
