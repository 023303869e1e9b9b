//! Learning extraction and per-agent improvement suggestions

use crate::invoke_structured;
use grove_model::GenerativeModel;
use grove_store::{
    AgentStore, AuditReportStore, GroveStore, LearningStore, SimulationStore,
};
use grove_types::{
    AgentId, CoreError, CoreResult, Learning, LearningKind, Suggestion,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Model output for one analyze pass
#[derive(Debug, Deserialize)]
struct Analysis {
    #[serde(default)]
    learnings: Vec<ExtractedLearning>,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct ExtractedLearning {
    learning_type: LearningKind,
    context: String,
    insight: String,
    confidence: f64,
}

fn analysis_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "learnings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "learning_type": { "type": "string", "enum": ["pattern", "mistake", "improvement", "best_practice"] },
                        "context": { "type": "string" },
                        "insight": { "type": "string" },
                        "confidence": { "type": "number" }
                    }
                }
            },
            "summary": { "type": "string" }
        }
    })
}

/// Model output for one suggest pass
#[derive(Debug, Deserialize)]
struct SuggestionAnalysis {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
    #[serde(default)]
    overall_assessment: String,
}

fn suggestion_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "suggestions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "field": { "type": "string" },
                        "current_value": { "type": "string" },
                        "suggested_value": { "type": "string" },
                        "reason": { "type": "string" },
                        "priority": { "type": "string", "enum": ["high", "medium", "low"] }
                    }
                }
            },
            "overall_assessment": { "type": "string" }
        }
    })
}

/// Result of an analyze pass
#[derive(Clone, Debug, serde::Serialize)]
pub struct AnalyzeOutcome {
    pub new_learnings: usize,
    pub learnings: Vec<Learning>,
    pub summary: String,
}

/// Improvement suggestions for one agent
#[derive(Clone, Debug, serde::Serialize)]
pub struct SuggestionSet {
    pub agent_name: String,
    pub suggestions: Vec<Suggestion>,
    pub assessment: String,
}

/// Extracts learnings from performance history and turns them into
/// per-agent improvement suggestions.
pub struct Learner {
    store: Arc<dyn GroveStore>,
    model: Arc<dyn GenerativeModel>,
}

impl Learner {
    pub fn new(store: Arc<dyn GroveStore>, model: Arc<dyn GenerativeModel>) -> Self {
        Self { store, model }
    }

    /// Analyze recent audits and simulations and persist any new
    /// learnings the model extracts.
    pub async fn analyze(&self) -> CoreResult<AnalyzeOutcome> {
        let audits = self.store.recent_audits(20).await?;
        let simulations = self.store.recent_simulations(50).await?;
        let existing = self.store.recent_learnings(50).await?;

        let audit_lines: Vec<String> = audits
            .iter()
            .take(10)
            .map(|a| {
                format!(
                    "- {}: Score {}, Status: {:?}, Findings: {}",
                    a.agent_name,
                    a.score,
                    a.status,
                    a.findings.len()
                )
            })
            .collect();
        let sim_lines: Vec<String> = simulations
            .iter()
            .take(15)
            .map(|s| {
                format!(
                    "- {} [{}]: {} (Quality: {})",
                    s.agent_name,
                    s.scenario_name,
                    if s.passed { "PASSED" } else { "FAILED" },
                    s.quality_score
                )
            })
            .collect();
        let learning_lines: Vec<String> = existing
            .iter()
            .take(10)
            .map(|l| {
                format!(
                    "- [{:?}] {} (Confidence: {})",
                    l.learning_type, l.insight, l.confidence
                )
            })
            .collect();

        let prompt = format!(
            "You are the Architect AI. Analyze recent agent performance data to extract learnings.\n\n\
             RECENT AUDIT REPORTS ({} total):\n{}\n\n\
             RECENT SIMULATION RESULTS ({} total):\n{}\n\n\
             EXISTING LEARNINGS TO BUILD ON:\n{}\n\n\
             Extract NEW insights that aren't already captured. Focus on:\n\
             1. Patterns in what makes agents succeed or fail\n\
             2. Common mistakes to avoid\n\
             3. Best practices that lead to high scores\n\
             4. Improvements that could be applied broadly\n\n\
             Return 1-3 new learnings, or empty array if no new insights.",
            audits.len(),
            audit_lines.join("\n"),
            simulations.len(),
            sim_lines.join("\n"),
            learning_lines.join("\n"),
        );

        let analysis: Analysis =
            invoke_structured(self.model.as_ref(), prompt, analysis_schema()).await?;

        let mut saved = Vec::with_capacity(analysis.learnings.len());
        for extracted in analysis.learnings {
            let learning = Learning::new(
                extracted.learning_type,
                extracted.context,
                extracted.insight,
                extracted.confidence.clamp(0.0, 100.0) as u8,
            );
            self.store.create_learning(learning.clone()).await?;
            saved.push(learning);
        }

        tracing::info!(new_learnings = saved.len(), "analyze pass complete");

        Ok(AnalyzeOutcome {
            new_learnings: saved.len(),
            learnings: saved,
            summary: analysis.summary,
        })
    }

    /// Generate field-level improvement suggestions for one agent.
    pub async fn suggest(&self, agent_id: &AgentId) -> CoreResult<SuggestionSet> {
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| CoreError::not_found("agent", agent_id.to_string()))?;

        let learnings = self.store.top_learnings(20).await?;
        let audits = self.store.audits_for_agent(agent_id).await?;

        let audit_history = if audits.is_empty() {
            "No previous audits".to_string()
        } else {
            audits
                .iter()
                .map(|a| format!("- Score: {}, Status: {:?}", a.score, a.status))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let learning_lines: Vec<String> = learnings
            .iter()
            .map(|l| format!("- [{:?}] {}", l.learning_type, l.insight))
            .collect();

        let prompt = format!(
            "You are the Architect AI. Generate specific improvement suggestions for this agent.\n\n\
             AGENT:\n\
             - Name: {}\n\
             - Description: {}\n\
             - Personality: {}\n\
             - Abilities: {}\n\n\
             AUDIT HISTORY:\n{}\n\n\
             LEARNINGS TO APPLY:\n{}\n\n\
             Generate specific, actionable improvements for this agent.",
            agent.name,
            agent.description,
            agent.personality.as_deref().unwrap_or("Not set"),
            serde_json::to_string(&agent.abilities).unwrap_or_default(),
            audit_history,
            learning_lines.join("\n"),
        );

        let analysis: SuggestionAnalysis =
            invoke_structured(self.model.as_ref(), prompt, suggestion_schema()).await?;

        Ok(SuggestionSet {
            agent_name: agent.name,
            suggestions: analysis.suggestions,
            assessment: analysis.overall_assessment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_model::ScriptedModel;
    use grove_store::MemoryStore;
    use grove_types::Agent;

    #[tokio::test]
    async fn analyze_persists_extracted_learnings() {
        let store = Arc::new(MemoryStore::new());
        let model = Arc::new(ScriptedModel::new());
        model.push_structured(serde_json::json!({
            "learnings": [
                {
                    "learning_type": "best_practice",
                    "context": "high scorers",
                    "insight": "specific descriptions beat vague ones",
                    "confidence": 85
                }
            ],
            "summary": "one new insight"
        }));

        let learner = Learner::new(store.clone(), model);
        let outcome = learner.analyze().await.unwrap();

        assert_eq!(outcome.new_learnings, 1);
        assert_eq!(outcome.summary, "one new insight");

        let stored = store.recent_learnings(10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].learning_type, LearningKind::BestPractice);
        assert_eq!(stored[0].confidence, 85);
    }

    #[tokio::test]
    async fn suggest_returns_field_level_changes() {
        let store = Arc::new(MemoryStore::new());
        let agent = Agent::new("scout", "finds things");
        let agent_id = agent.id.clone();
        store.create_agent(agent).await.unwrap();

        let model = Arc::new(ScriptedModel::new());
        model.push_structured(serde_json::json!({
            "suggestions": [
                {
                    "field": "description",
                    "current_value": "finds things",
                    "suggested_value": "locates and ranks internal documents",
                    "reason": "too vague",
                    "priority": "high"
                }
            ],
            "overall_assessment": "description needs specificity"
        }));

        let learner = Learner::new(store, model);
        let set = learner.suggest(&agent_id).await.unwrap();

        assert_eq!(set.agent_name, "scout");
        assert_eq!(set.suggestions.len(), 1);
        assert_eq!(set.suggestions[0].field, "description");
    }

    #[tokio::test]
    async fn suggest_for_unknown_agent_is_not_found() {
        let learner = Learner::new(Arc::new(MemoryStore::new()), Arc::new(ScriptedModel::new()));
        let err = learner.suggest(&AgentId::new("missing")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
