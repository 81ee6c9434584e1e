//! TTL Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::CacheCore;

/// Spawns a background task that sweeps expired entries every `interval`.
///
/// The first pass runs one interval after spawning. The task holds only a
/// weak reference to the cache and exits when `shutdown` is cancelled or
/// the cache is dropped. A pass that panics is logged and the schedule
/// carries on.
pub(crate) fn spawn_sweep_task<K, V>(
    runtime: &Handle,
    core: Weak<CacheCore<K, V>>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    runtime.spawn(async move {
        info!(
            "Starting TTL sweep task with interval of {} ms",
            interval.as_millis()
        );

        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("TTL sweep task: shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let Some(core) = core.upgrade() else {
                        debug!("TTL sweep task: cache dropped");
                        break;
                    };

                    match panic::catch_unwind(AssertUnwindSafe(|| core.sweep_expired())) {
                        Ok(0) => debug!("TTL sweep: no expired entries found"),
                        Ok(removed) => info!(removed, "TTL sweep: removed expired entries"),
                        Err(_) => error!("TTL sweep pass panicked, retrying next interval"),
                    }
                }
            }
        }
    })
}
