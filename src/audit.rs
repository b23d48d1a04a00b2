//! Audit Sink Module
//!
//! The boundary through which the auditor loop hands statistics to the
//! surrounding system.

use tracing::info;

use crate::cache::AuditStats;

/// Receives one stats record per audit tick.
///
/// Errors are logged by the auditor loop and otherwise ignored; the cache
/// never retries a delivery.
pub trait Auditor: Send + Sync + 'static {
    fn audit(&self, stats: &AuditStats) -> anyhow::Result<()>;
}

impl<F> Auditor for F
where
    F: Fn(&AuditStats) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn audit(&self, stats: &AuditStats) -> anyhow::Result<()> {
        self(stats)
    }
}

/// Emits every record as a JSON `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditor;

impl Auditor for TracingAuditor {
    fn audit(&self, stats: &AuditStats) -> anyhow::Result<()> {
        let payload = serde_json::to_string(stats)?;
        info!(target: "memcache::audit", %payload, "cache audit");
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditor;

impl Auditor for NoopAuditor {
    fn audit(&self, _stats: &AuditStats) -> anyhow::Result<()> {
        Ok(())
    }
}
