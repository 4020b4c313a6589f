use hitset::ObjectId;
use rand::Rng;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test subscriber once per binary; `RUST_LOG` picks the level.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// `count` distinct objects in pool 1, named so they sort by index.
#[allow(dead_code)]
pub fn generate_objects(prefix: &str, count: usize) -> Vec<ObjectId> {
    (0..count)
        .map(|i| ObjectId::new(1, "", format!("{prefix}_{i:06}")))
        .collect()
}

/// `count` objects with random names and hashes.
#[allow(dead_code)]
pub fn generate_random_objects(count: usize) -> Vec<ObjectId> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| {
            let name = format!("obj_{:016x}", rng.random::<u64>());
            ObjectId::new(rng.random_range(0..4), "", name)
        })
        .collect()
}
