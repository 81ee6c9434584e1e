//! Mini Cache - demo workload
//!
//! Runs a short concurrent read-mostly workload against one cache instance,
//! the way a service layer would use it in front of a slower store, and
//! reports the resulting statistics.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_cache::{BoundedExpiringCache, CacheConfig};

const WORKERS: usize = 8;
const OPS_PER_WORKER: usize = 10_000;
const KEY_SPACE: u64 = 250;

/// Kinds of record the demo caches. Callers resolve the kind at this
/// boundary so one cache instance holds a single concrete value type.
#[derive(Debug, Clone)]
enum Record {
    Student { id: u64, name: String },
    Group { id: u64, name: String },
}

impl Record {
    fn describe(&self) -> String {
        match self {
            Record::Student { id, name } => format!("student #{} {}", id, name),
            Record::Group { id, name } => format!("group #{} {}", id, name),
        }
    }
}

/// Stands in for a round-trip to the backing store.
fn load_record(key: &str) -> Option<Record> {
    let (kind, id) = key.split_once('_')?;
    let id = id.parse().ok()?;
    match kind {
        "student" => Some(Record::Student {
            id,
            name: format!("Student {}", id),
        }),
        "group" => Some(Record::Group {
            id,
            name: format!("Group {}", id),
        }),
        _ => None,
    }
}

fn run_workload(cache: &BoundedExpiringCache<String, Record>, worker: usize) -> usize {
    let mut loads = 0;

    for op in 0..OPS_PER_WORKER {
        let id = (worker as u64 * 31 + op as u64 * 7) % KEY_SPACE;
        let key = if op % 3 == 0 {
            format!("group_{}", id)
        } else {
            format!("student_{}", id)
        };

        // Writes invalidate the cached copy
        if op % 17 == 0 {
            cache.remove(&key);
            continue;
        }

        if cache.get(&key).is_none() {
            if let Some(record) = load_record(&key) {
                cache.put(key, record);
                loads += 1;
            }
        }
    }

    loads
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env().context("Failed to load cache configuration")?;
    info!(
        "Configuration loaded: max_size={}, ttl={}ms, expiry_timers={}",
        config.max_size,
        config.ttl.as_millis(),
        config.expiry_timers
    );

    let cache = Arc::new(
        BoundedExpiringCache::<String, Record>::new(config).context("Failed to create cache")?,
    );

    let started = Instant::now();
    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            tokio::task::spawn_blocking(move || run_workload(&cache, worker))
        })
        .collect();

    let mut loads = 0;
    for worker in workers {
        loads += worker.await.context("Workload worker panicked")?;
    }
    info!(
        "Workload finished in {} ms with {} store loads",
        started.elapsed().as_millis(),
        loads
    );

    if let Some(record) = cache.keys_by_recency().last().and_then(|key| cache.get(key)) {
        debug!(record = %record.describe(), "Most recently used entry");
    }

    let stats = cache.stats();
    info!(
        "Cache stats: {} (hit rate {:.2})",
        serde_json::to_string(&stats)?,
        stats.hit_rate()
    );

    cache.shutdown();
    Ok(())
}
