//! Architect services for Grove
//!
//! The architect is the agent that looks after the rest of the
//! population. Its services wrap the generative capability and the
//! entity stores:
//!
//! - [`Auditor`]: scores an agent's configuration against a fixed rubric
//! - [`Simulator`]: runs scripted interaction scenarios and evaluates
//!   the replies
//! - [`Learner`]: extracts learnings from performance history and turns
//!   them into per-agent improvement suggestions
//! - [`KnowledgePool`]: the shared, validated knowledge pool agents
//!   draw on
//!
//! Audits and simulations feed their scores to a [`QualitySignalHook`]
//! when they land below threshold; the proposal manager sits behind that
//! hook, which keeps this crate free of a dependency cycle.

#![deny(unsafe_code)]

mod auditor;
mod hook;
mod knowledge;
mod learner;
mod simulator;

pub use auditor::Auditor;
pub use hook::{NoopSignalHook, QualitySignalHook};
pub use knowledge::{KnowledgePool, KnowledgeQuery, SyncOutcome};
pub use learner::{AnalyzeOutcome, Learner, SuggestionSet};
pub use simulator::{Scenario, ScenarioOutcome, SimulationSummary, Simulator};

use grove_model::{GenerativeModel, ModelReply, ModelRequest};
use grove_types::{CoreError, CoreResult};
use serde_json::Value;

/// The architect's own agent name, used on messages and contributions.
pub const ARCHITECT: &str = "architect";

/// Invoke the model with a response schema and deserialize the reply.
pub(crate) async fn invoke_structured<T: serde::de::DeserializeOwned>(
    model: &dyn GenerativeModel,
    prompt: String,
    schema: Value,
) -> CoreResult<T> {
    let reply = model
        .invoke(ModelRequest::structured(prompt, schema))
        .await
        .map_err(|e| CoreError::upstream(e.to_string()))?;
    let value = reply
        .into_structured()
        .ok_or_else(|| CoreError::upstream("model returned text where structure was required"))?;
    serde_json::from_value(value)
        .map_err(|e| CoreError::upstream(format!("model reply shape mismatch: {e}")))
}

/// Invoke the model for free text.
pub(crate) async fn invoke_text(
    model: &dyn GenerativeModel,
    prompt: String,
) -> CoreResult<String> {
    let reply = model
        .invoke(ModelRequest::text(prompt))
        .await
        .map_err(|e| CoreError::upstream(e.to_string()))?;
    match reply {
        ModelReply::Text(text) => Ok(text),
        ModelReply::Structured(value) => Ok(value.to_string()),
    }
}
