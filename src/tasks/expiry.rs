//! Per-entry expiry timers.

use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::trace;

use crate::cache::CacheCore;

/// Schedules a one-shot removal of `key` after `ttl`.
///
/// The removal only applies to the entry with the given `generation`, so a
/// timer outliving an overwrite cannot delete the newer entry. The returned
/// handle is stored on the entry and aborted when the entry is discarded.
pub(crate) fn spawn_expiry_timer<K, V>(
    runtime: &Handle,
    core: Weak<CacheCore<K, V>>,
    key: K,
    generation: u64,
    ttl: Duration,
) -> AbortHandle
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    runtime
        .spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(core) = core.upgrade() {
                if core.expire(&key, generation) {
                    trace!(generation, "Expiry timer removed entry");
                }
            }
        })
        .abort_handle()
}
