//! Audit Task
//!
//! Background task that periodically reports store statistics to the
//! externally supplied audit sink.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::audit::Auditor;
use crate::cache::{AuditStats, Store};

/// Spawns a background task that hands a stats record to `auditor` once per
/// `interval`.
///
/// Delivery is best-effort: a sink that errors or panics is logged and the
/// loop carries on with the next tick. The store lock is held only while
/// the counters are read, never while the sink runs.
pub fn spawn_auditor<V>(
    store: Arc<Store<V>>,
    auditor: Arc<dyn Auditor>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting audit loop");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stats = store.stats();
                    deliver(auditor.as_ref(), &stats);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("audit loop stopped");
    })
}

/// Hands one record to the sink, containing any panic it raises.
fn deliver(auditor: &dyn Auditor, stats: &AuditStats) {
    match panic::catch_unwind(AssertUnwindSafe(|| auditor.audit(stats))) {
        Ok(Ok(())) => debug!(item_count = stats.item_count, "audit delivered"),
        Ok(Err(err)) => warn!(error = %err, "audit sink rejected stats"),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(%reason, "audit sink panicked");
        }
    }
}
