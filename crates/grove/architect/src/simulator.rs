//! Interaction simulations: scripted scenarios run against an agent

use crate::{invoke_structured, invoke_text, QualitySignalHook};
use grove_model::GenerativeModel;
use grove_monitor::SignalKind;
use grove_store::{AgentStore, GroveStore, SimulationStore};
use grove_types::{
    pass_rate, Agent, AgentId, CoreError, CoreResult, GroveConfig, SimulationId, SimulationResult,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// One test scenario: a user message and the behavior we expect back
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub user_message: String,
    pub expected_behavior: String,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        user_message: impl Into<String>,
        expected_behavior: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            user_message: user_message.into(),
            expected_behavior: expected_behavior.into(),
        }
    }
}

/// The default battery used when a caller supplies no scenarios
pub fn default_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "greeting",
            "Hello, can you help me?",
            "Responds warmly and asks how to help",
        ),
        Scenario::new(
            "capabilities",
            "What can you do?",
            "Clearly explains its capabilities",
        ),
        Scenario::new(
            "edge_case",
            "asdfghjkl random gibberish",
            "Handles unclear input gracefully",
        ),
    ]
}

/// Model output for one scenario evaluation
#[derive(Debug, Deserialize)]
struct Evaluation {
    passed: bool,
    quality_score: f64,
    #[serde(default)]
    feedback: String,
}

fn evaluation_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "passed": { "type": "boolean" },
            "quality_score": { "type": "number" },
            "feedback": { "type": "string" }
        }
    })
}

/// Per-scenario outcome returned to the caller
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub passed: bool,
    pub quality_score: f64,
    pub feedback: String,
    pub response_time_ms: u64,
}

/// Aggregate over one simulation run
#[derive(Clone, Debug, Serialize)]
pub struct SimulationSummary {
    pub agent_name: String,
    pub total_scenarios: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub average_quality: f64,
    pub results: Vec<ScenarioOutcome>,
}

/// Runs interaction scenarios against an agent and evaluates the replies.
pub struct Simulator {
    store: Arc<dyn GroveStore>,
    model: Arc<dyn GenerativeModel>,
    hook: Arc<dyn QualitySignalHook>,
    config: GroveConfig,
}

impl Simulator {
    pub fn new(
        store: Arc<dyn GroveStore>,
        model: Arc<dyn GenerativeModel>,
        hook: Arc<dyn QualitySignalHook>,
        config: GroveConfig,
    ) -> Self {
        Self {
            store,
            model,
            hook,
            config,
        }
    }

    fn system_prompt(agent: &Agent) -> String {
        let mut prompt = format!(
            "You are {}, an AI assistant. {}\n",
            agent.name, agent.description
        );
        if let Some(personality) = &agent.personality {
            prompt.push_str(&format!("Your personality: {personality}\n"));
        }
        if let Some(instructions) = &agent.custom_instructions {
            prompt.push_str(&format!("Instructions: {instructions}\n"));
        }
        prompt
    }

    /// Run a scenario battery against one agent.
    ///
    /// Each scenario takes two model calls: one to produce the agent's
    /// reply, one to evaluate it. Every result is persisted; a pass rate
    /// below the simulation threshold goes through the signal hook.
    pub async fn simulate(
        &self,
        agent_id: &AgentId,
        scenarios: Option<Vec<Scenario>>,
    ) -> CoreResult<SimulationSummary> {
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| CoreError::not_found("agent", agent_id.to_string()))?;

        let scenarios = scenarios.unwrap_or_else(default_scenarios);
        let system_prompt = Self::system_prompt(&agent);

        let mut stored = Vec::with_capacity(scenarios.len());
        let mut outcomes = Vec::with_capacity(scenarios.len());

        for scenario in &scenarios {
            let started = Instant::now();
            let response = invoke_text(
                self.model.as_ref(),
                format!(
                    "{system_prompt}\nUser: {}\n\nAssistant:",
                    scenario.user_message
                ),
            )
            .await?;
            let response_time_ms = started.elapsed().as_millis() as u64;

            let evaluation: Evaluation = invoke_structured(
                self.model.as_ref(),
                format!(
                    "Evaluate this AI agent's response.\n\n\
                     SCENARIO: {}\n\
                     USER MESSAGE: {}\n\
                     EXPECTED BEHAVIOR: {}\n\
                     AGENT RESPONSE: {}\n\n\
                     Evaluate:\n\
                     1. Did the response meet the expected behavior?\n\
                     2. Was it appropriate and helpful?\n\
                     3. Quality score 0-100\n\n\
                     Be strict but fair.",
                    scenario.name, scenario.user_message, scenario.expected_behavior, response
                ),
                evaluation_schema(),
            )
            .await?;

            let result = SimulationResult {
                id: SimulationId::generate(),
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                scenario_name: scenario.name.clone(),
                user_message: scenario.user_message.clone(),
                agent_response: response,
                expected_behavior: scenario.expected_behavior.clone(),
                passed: evaluation.passed,
                quality_score: evaluation.quality_score,
                feedback: evaluation.feedback.clone(),
                response_time_ms,
                created_at: chrono::Utc::now(),
            };
            self.store.create_simulation(result.clone()).await?;

            outcomes.push(ScenarioOutcome {
                scenario: scenario.name.clone(),
                passed: evaluation.passed,
                quality_score: evaluation.quality_score,
                feedback: evaluation.feedback,
                response_time_ms,
            });
            stored.push(result);
        }

        let rate = pass_rate(&stored).unwrap_or(0.0);
        let average_quality = if outcomes.is_empty() {
            0.0
        } else {
            outcomes.iter().map(|o| o.quality_score).sum::<f64>() / outcomes.len() as f64
        };

        tracing::info!(
            agent = %agent.name,
            scenarios = outcomes.len(),
            pass_rate = rate,
            "simulation run recorded"
        );

        if rate < self.config.simulation_threshold {
            self.hook
                .signal(&agent.id, SignalKind::PassRate, rate)
                .await?;
        }

        let passed = outcomes.iter().filter(|o| o.passed).count();
        Ok(SimulationSummary {
            agent_name: agent.name,
            total_scenarios: outcomes.len(),
            passed,
            failed: outcomes.len() - passed,
            pass_rate: rate,
            average_quality,
            results: outcomes,
        })
    }
}
