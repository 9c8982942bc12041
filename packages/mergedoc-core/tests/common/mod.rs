use mergedoc_core::{ActorId, Document, DocumentEngine, Engine, EngineConfig, FixedTime};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("mergedoc_core=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

#[allow(dead_code)]
pub fn engine(actor: &[u8]) -> Engine {
    Engine::new(
        EngineConfig::default()
            .with_actor(ActorId::new(actor.to_vec()))
            .with_time(FixedTime::new(1_700_000_000_000)),
    )
}

#[allow(dead_code)]
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

/// Document whose root holds the members of [`sample`].
#[allow(dead_code)]
pub fn sample_doc(engine: &Engine) -> Document {
    engine
        .change(&engine.init(), "seed", |root| {
            if let Value::Object(fields) = sample() {
                for (key, value) in fields {
                    root.set(&key, value)?;
                }
            }
            Ok(())
        })
        .unwrap()
}
