//! Default step handlers: thin adapters from workflow actions to the
//! architect, proposal, and knowledge services
//!
//! Handlers that need a target agent resolve it from the step input
//! first, then the shared context; with neither present the step is a
//! permissive no-op, matching the engine's treatment of unknown actions.

use async_trait::async_trait;
use grove_architect::{Auditor, KnowledgePool, Learner, Simulator, ARCHITECT};
use grove_engine::{HandlerRegistry, StepHandler};
use grove_model::{GenerativeModel, ModelRequest};
use grove_proposals::ProposalManager;
use grove_store::{GroveStore, KnowledgeStore, LearningStore};
use grove_types::{
    AgentId, CoreError, CoreResult, GroveConfig, KnowledgeItem, KnowledgeKind, ProposalId,
    SharedContext, Step,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn target_agent(context: &SharedContext, step: &Step) -> Option<AgentId> {
    step.input
        .get("agentId")
        .and_then(Value::as_str)
        .or_else(|| context.target_agent_id())
        .map(AgentId::new)
}

fn noop(action: &str) -> Value {
    tracing::debug!(action, "step has no target agent; skipping");
    Value::Object(Map::new())
}

// ── Audit / simulate / learn ─────────────────────────────────────────

struct AuditConfigHandler {
    auditor: Arc<Auditor>,
}

#[async_trait]
impl StepHandler for AuditConfigHandler {
    async fn execute(&self, context: &mut SharedContext, step: &Step) -> CoreResult<Value> {
        let Some(agent_id) = target_agent(context, step) else {
            return Ok(noop(&step.action));
        };
        let report = self.auditor.audit(&agent_id).await?;
        let output =
            serde_json::to_value(&report).map_err(|e| CoreError::upstream(e.to_string()))?;
        context.insert(SharedContext::AUDIT_RESULT, output.clone());
        Ok(output)
    }
}

struct SimulateHandler {
    simulator: Arc<Simulator>,
}

#[async_trait]
impl StepHandler for SimulateHandler {
    async fn execute(&self, context: &mut SharedContext, step: &Step) -> CoreResult<Value> {
        let Some(agent_id) = target_agent(context, step) else {
            return Ok(noop(&step.action));
        };
        let summary = self.simulator.simulate(&agent_id, None).await?;
        let output =
            serde_json::to_value(&summary).map_err(|e| CoreError::upstream(e.to_string()))?;
        context.insert(SharedContext::SIMULATION_RESULT, output.clone());
        Ok(output)
    }
}

struct AnalyzeHandler {
    learner: Arc<Learner>,
}

#[async_trait]
impl StepHandler for AnalyzeHandler {
    async fn execute(&self, context: &mut SharedContext, _step: &Step) -> CoreResult<Value> {
        let outcome = self.learner.analyze().await?;
        let output =
            serde_json::to_value(&outcome).map_err(|e| CoreError::upstream(e.to_string()))?;
        context.insert(SharedContext::LEARNINGS, output.clone());
        Ok(output)
    }
}

struct SuggestHandler {
    learner: Arc<Learner>,
}

#[async_trait]
impl StepHandler for SuggestHandler {
    async fn execute(&self, context: &mut SharedContext, step: &Step) -> CoreResult<Value> {
        let Some(agent_id) = target_agent(context, step) else {
            return Ok(noop(&step.action));
        };
        let set = self.learner.suggest(&agent_id).await?;
        let output = serde_json::to_value(&set).map_err(|e| CoreError::upstream(e.to_string()))?;
        context.insert(SharedContext::SUGGESTIONS, output.clone());
        Ok(output)
    }
}

// ── Improvement cycle ────────────────────────────────────────────────

struct ApplyImprovementsHandler {
    manager: Arc<ProposalManager>,
}

#[async_trait]
impl StepHandler for ApplyImprovementsHandler {
    async fn execute(&self, context: &mut SharedContext, step: &Step) -> CoreResult<Value> {
        let proposal_id = step
            .input
            .get("proposalId")
            .and_then(Value::as_str)
            .or_else(|| context.get_str(SharedContext::PROPOSAL_ID))
            .or_else(|| {
                context
                    .get(SharedContext::OPTIONS)
                    .and_then(|o| o.get("proposalId"))
                    .and_then(Value::as_str)
            })
            .map(ProposalId::new);
        let Some(proposal_id) = proposal_id else {
            return Ok(noop(&step.action));
        };

        match self.manager.apply(&proposal_id).await {
            Ok(outcome) => {
                serde_json::to_value(&outcome).map_err(|e| CoreError::upstream(e.to_string()))
            }
            // Not yet approved: record the skip instead of failing the
            // whole cycle.
            Err(CoreError::InvalidState(reason)) => Ok(json!({
                "applied": false,
                "reason": reason,
            })),
            Err(other) => Err(other),
        }
    }
}

struct ValidateHandler {
    config: GroveConfig,
}

#[async_trait]
impl StepHandler for ValidateHandler {
    async fn execute(&self, context: &mut SharedContext, _step: &Step) -> CoreResult<Value> {
        let audit_score = context
            .get(SharedContext::AUDIT_RESULT)
            .and_then(|v| v.get("score"))
            .and_then(Value::as_f64);
        let pass_rate = context
            .get(SharedContext::SIMULATION_RESULT)
            .and_then(|v| v.get("pass_rate"))
            .and_then(Value::as_f64);

        let validated = audit_score.is_some_and(|s| s >= self.config.audit_threshold)
            && pass_rate.is_some_and(|r| r >= self.config.simulation_threshold);

        Ok(json!({
            "validated": validated,
            "audit_score": audit_score,
            "pass_rate": pass_rate,
        }))
    }
}

// ── Knowledge sync ───────────────────────────────────────────────────

struct GatherLearningsHandler {
    store: Arc<dyn GroveStore>,
}

#[async_trait]
impl StepHandler for GatherLearningsHandler {
    async fn execute(&self, context: &mut SharedContext, _step: &Step) -> CoreResult<Value> {
        let learnings = self.store.top_learnings(100).await?;
        let knowledge = self.store.list_knowledge(100).await?;

        let output = json!({
            "learnings": learnings.len(),
            "knowledge": knowledge.len(),
        });
        context.insert(
            SharedContext::ALL_LEARNINGS,
            serde_json::to_value(&learnings).map_err(|e| CoreError::upstream(e.to_string()))?,
        );
        context.insert(
            SharedContext::ALL_KNOWLEDGE,
            serde_json::to_value(&knowledge).map_err(|e| CoreError::upstream(e.to_string()))?,
        );
        Ok(output)
    }
}

#[derive(Debug, Deserialize)]
struct Consolidation {
    #[serde(default)]
    consolidated_insights: Vec<String>,
    #[serde(default)]
    key_patterns: Vec<String>,
}

fn consolidation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "consolidated_insights": { "type": "array", "items": { "type": "string" } },
            "key_patterns": { "type": "array", "items": { "type": "string" } }
        }
    })
}

struct ConsolidateHandler {
    model: Arc<dyn GenerativeModel>,
    config: GroveConfig,
}

#[async_trait]
impl StepHandler for ConsolidateHandler {
    async fn execute(&self, context: &mut SharedContext, _step: &Step) -> CoreResult<Value> {
        let learnings = context
            .get(SharedContext::ALL_LEARNINGS)
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .take(self.config.consolidation_window)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let reply = self
            .model
            .invoke(ModelRequest::structured(
                format!(
                    "Consolidate these learnings into key insights:\n{}",
                    serde_json::to_string(&learnings)
                        .map_err(|e| CoreError::upstream(e.to_string()))?
                ),
                consolidation_schema(),
            ))
            .await
            .map_err(|e| CoreError::upstream(e.to_string()))?;
        let value = reply
            .into_structured()
            .ok_or_else(|| CoreError::upstream("consolidation reply was not structured"))?;

        // Validate the shape before threading it on.
        let _: Consolidation = serde_json::from_value(value.clone())
            .map_err(|e| CoreError::upstream(format!("model reply shape mismatch: {e}")))?;

        context.insert(SharedContext::CONSOLIDATED_INSIGHTS, value.clone());
        Ok(value)
    }
}

struct DistributeHandler {
    pool: Arc<KnowledgePool>,
    config: GroveConfig,
}

#[async_trait]
impl StepHandler for DistributeHandler {
    async fn execute(&self, context: &mut SharedContext, _step: &Step) -> CoreResult<Value> {
        let insights: Vec<String> = context
            .get(SharedContext::CONSOLIDATED_INSIGHTS)
            .and_then(|v| v.get("consolidated_insights"))
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut distributed = 0;
        for insight in insights.iter().take(self.config.distribution_cap) {
            let title: String = insight.chars().take(50).collect();
            self.pool
                .contribute(
                    KnowledgeItem::new(KnowledgeKind::Insight, title, insight.clone(), ARCHITECT)
                        .with_confidence(75)
                        .with_validated(true),
                )
                .await?;
            distributed += 1;
        }

        Ok(json!({ "distributed": distributed }))
    }
}

// ── Registration ─────────────────────────────────────────────────────

/// Register the default step handlers on a registry.
///
/// `apply_suggestions` (the action name proposal drafts carry) and
/// `apply_improvements` (the built-in improvement-cycle template) share
/// one handler.
#[allow(clippy::too_many_arguments)]
pub fn register_default_handlers(
    registry: &HandlerRegistry,
    store: Arc<dyn GroveStore>,
    model: Arc<dyn GenerativeModel>,
    auditor: Arc<Auditor>,
    simulator: Arc<Simulator>,
    learner: Arc<Learner>,
    pool: Arc<KnowledgePool>,
    manager: Arc<ProposalManager>,
    config: &GroveConfig,
) -> CoreResult<()> {
    registry.register("audit_config", Arc::new(AuditConfigHandler { auditor }))?;
    registry.register("simulate", Arc::new(SimulateHandler { simulator }))?;
    registry.register(
        "analyze",
        Arc::new(AnalyzeHandler {
            learner: learner.clone(),
        }),
    )?;
    registry.register("suggest", Arc::new(SuggestHandler { learner }))?;
    let apply = Arc::new(ApplyImprovementsHandler { manager });
    registry.register("apply_improvements", apply.clone())?;
    registry.register("apply_suggestions", apply)?;
    registry.register(
        "validate",
        Arc::new(ValidateHandler {
            config: config.clone(),
        }),
    )?;
    registry.register(
        "gather_learnings",
        Arc::new(GatherLearningsHandler { store }),
    )?;
    registry.register(
        "consolidate",
        Arc::new(ConsolidateHandler {
            model,
            config: config.clone(),
        }),
    )?;
    registry.register(
        "distribute",
        Arc::new(DistributeHandler {
            pool,
            config: config.clone(),
        }),
    )?;
    Ok(())
}
