//! Collaboration records: running executions of named workflows
//!
//! A Collaboration tracks one workflow run: its ordered steps, the shared
//! context threaded between them, and overall status. A Collaboration owns
//! its steps exclusively; steps never outlive their run.

use crate::CollaborationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Status ───────────────────────────────────────────────────────────

/// Lifecycle status shared by collaborations and their steps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

// ── Shared context ───────────────────────────────────────────────────

/// Mutable key-value state passed between workflow steps within one run.
///
/// Later steps read fields written by earlier steps (a data dependency,
/// not just an ordering preference), so the engine persists the context
/// after every step. Keys use the wire spelling consumed by handlers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedContext(pub Map<String, Value>);

impl SharedContext {
    pub const TARGET_AGENT_ID: &'static str = "targetAgentId";
    pub const OPTIONS: &'static str = "options";
    pub const AUDIT_RESULT: &'static str = "auditResult";
    pub const SIMULATION_RESULT: &'static str = "simulationResult";
    pub const LEARNINGS: &'static str = "learnings";
    pub const SUGGESTIONS: &'static str = "suggestions";
    pub const ALL_LEARNINGS: &'static str = "allLearnings";
    pub const ALL_KNOWLEDGE: &'static str = "allKnowledge";
    pub const CONSOLIDATED_INSIGHTS: &'static str = "consolidatedInsights";
    pub const PROPOSAL_ID: &'static str = "proposalId";
    pub const AGENT_ID: &'static str = "agentId";
    pub const TRIGGER_REASON: &'static str = "triggerReason";

    /// Seed a context for a workflow run
    pub fn seeded(target_agent_id: Option<&str>, options: Value) -> Self {
        let mut ctx = Self::default();
        if let Some(id) = target_agent_id {
            ctx.insert(Self::TARGET_AGENT_ID, Value::String(id.to_string()));
        }
        ctx.insert(Self::OPTIONS, options);
        ctx
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Target agent for the run, if one was supplied
    pub fn target_agent_id(&self) -> Option<&str> {
        self.get_str(Self::TARGET_AGENT_ID)
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

// ── Steps ────────────────────────────────────────────────────────────

/// One ordered step of a collaboration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position; steps execute strictly in increasing order
    pub step_number: u32,
    /// The agent responsible for the step
    pub agent: String,
    /// Logical action name resolved against the handler registry
    pub action: String,
    pub description: String,
    pub status: RunStatus,
    pub input: Value,
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    pub fn pending(
        step_number: u32,
        agent: impl Into<String>,
        action: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            step_number,
            agent: agent.into(),
            action: action.into(),
            description: description.into(),
            status: RunStatus::Pending,
            input: Value::Object(Map::new()),
            output: Value::Object(Map::new()),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn start(&mut self) {
        self.status = RunStatus::InProgress;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self, output: Value) {
        self.status = RunStatus::Completed;
        self.output = output;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
    }
}

// ── Collaboration ────────────────────────────────────────────────────

/// One execution instance of a named workflow
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Collaboration {
    pub id: CollaborationId,
    /// Workflow type key (e.g. "audit_pipeline")
    pub workflow_type: String,
    /// Human-readable workflow name
    pub workflow_name: String,
    /// The agent coordinating the run
    pub orchestrator: String,
    pub participants: Vec<String>,
    pub steps: Vec<Step>,
    pub shared_context: SharedContext,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collaboration {
    pub fn new(
        workflow_type: impl Into<String>,
        workflow_name: impl Into<String>,
        orchestrator: impl Into<String>,
        steps: Vec<Step>,
        shared_context: SharedContext,
    ) -> Self {
        let now = Utc::now();
        let orchestrator = orchestrator.into();
        Self {
            id: CollaborationId::generate(),
            workflow_type: workflow_type.into(),
            workflow_name: workflow_name.into(),
            participants: vec![orchestrator.clone()],
            orchestrator,
            steps,
            shared_context,
            status: RunStatus::Pending,
            final_output: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Start the run (Pending → InProgress)
    pub fn start(&mut self) {
        self.status = RunStatus::InProgress;
        self.started_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Complete the run with its final output
    pub fn complete(&mut self, final_output: Value) {
        self.status = RunStatus::Completed;
        self.final_output = Some(final_output);
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Fail the run, preserving completed step outputs
    pub fn fail(&mut self) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn step(&self, step_number: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == RunStatus::Completed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_step_run() -> Collaboration {
        Collaboration::new(
            "audit_pipeline",
            "Full Agent Audit Pipeline",
            "architect",
            vec![
                Step::pending(1, "architect", "audit_config", "Audit agent configuration"),
                Step::pending(2, "architect", "simulate", "Run interaction simulations"),
            ],
            SharedContext::seeded(Some("agent-1"), json!({})),
        )
    }

    #[test]
    fn seeded_context_carries_target_and_options() {
        let ctx = SharedContext::seeded(Some("agent-1"), json!({"deep": true}));
        assert_eq!(ctx.target_agent_id(), Some("agent-1"));
        assert_eq!(ctx.get(SharedContext::OPTIONS), Some(&json!({"deep": true})));
    }

    #[test]
    fn step_lifecycle_stamps_timestamps() {
        let mut step = Step::pending(1, "architect", "audit_config", "Audit");
        assert!(step.started_at.is_none());
        step.start();
        assert_eq!(step.status, RunStatus::InProgress);
        assert!(step.started_at.is_some());
        step.complete(json!({"score": 82}));
        assert_eq!(step.status, RunStatus::Completed);
        assert!(step.completed_at.is_some());
        assert_eq!(step.output, json!({"score": 82}));
    }

    #[test]
    fn failed_run_preserves_completed_outputs() {
        let mut run = two_step_run();
        run.start();
        run.steps[0].start();
        run.steps[0].complete(json!({"score": 90}));
        run.steps[1].start();
        run.steps[1].fail();
        run.fail();

        assert!(run.is_terminal());
        assert_eq!(run.steps[0].output, json!({"score": 90}));
        assert_eq!(run.steps[1].status, RunStatus::Failed);
        assert_eq!(run.completed_steps(), 1);
    }

    #[test]
    fn collaboration_serializes_with_snake_case_statuses() {
        let run = two_step_run();
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["steps"][0]["status"], json!("pending"));
    }
}
