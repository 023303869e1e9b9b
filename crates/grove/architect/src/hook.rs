//! The quality-signal hook linking audits/simulations to remediation

use async_trait::async_trait;
use grove_monitor::SignalKind;
use grove_types::{AgentId, CoreResult};

/// Receives sub-threshold quality signals as they are measured.
///
/// The proposal manager implements this; auditor and simulator call it
/// so a fresh low score immediately feeds the remediation loop without
/// the architect crate depending on proposals.
#[async_trait]
pub trait QualitySignalHook: Send + Sync {
    async fn signal(&self, agent_id: &AgentId, kind: SignalKind, value: f64) -> CoreResult<()>;
}

/// Hook that ignores every signal; the default when no remediation loop
/// is wired.
pub struct NoopSignalHook;

#[async_trait]
impl QualitySignalHook for NoopSignalHook {
    async fn signal(&self, agent_id: &AgentId, kind: SignalKind, value: f64) -> CoreResult<()> {
        tracing::debug!(agent_id = %agent_id, ?kind, value, "quality signal dropped (no hook)");
        Ok(())
    }
}
