//! Expiry Sweeper Task
//!
//! Background task that periodically removes expired cache items.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::Store;

/// Spawns a background task that periodically sweeps expired items.
///
/// The task sleeps between ticks without holding the store lock, takes the
/// lock only for the scan itself, and exits as soon as `shutdown` flips to
/// true or its sender is dropped.
///
/// # Arguments
/// * `store` - Shared store to sweep
/// * `interval` - Time between sweep ticks
/// * `shutdown` - Receiver signalled when the owning cache shuts down
///
/// # Returns
/// A JoinHandle for the spawned task, which completes after shutdown.
pub fn spawn_sweeper<V>(
    store: Arc<Store<V>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting expiry sweeper");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; sweeping starts one interval in
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.sweep_expired(Instant::now());
                    if removed > 0 {
                        info!(removed, "sweep removed expired items");
                    } else {
                        debug!("sweep found no expired items");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("expiry sweeper stopped");
    })
}
