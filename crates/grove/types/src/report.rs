//! Quality-signal records: audit reports and simulation results

use crate::{AgentId, AuditReportId, SimulationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Audit reports ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditVerdict {
    Passed,
    Failed,
    NeedsReview,
}

impl AuditVerdict {
    /// Verdict is derived from the score alone: ≥ 75 passed, < 50 failed,
    /// anything between needs review.
    pub fn from_score(score: f64) -> Self {
        if score < 50.0 {
            AuditVerdict::Failed
        } else if score < 75.0 {
            AuditVerdict::NeedsReview
        } else {
            AuditVerdict::Passed
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    /// Blocks effectiveness
    Critical,
    /// Should be improved
    Warning,
    /// Nice to have
    Suggestion,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Finding {
    pub category: String,
    pub severity: FindingSeverity,
    pub message: String,
}

/// One configuration audit of an agent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditReport {
    pub id: AuditReportId,
    pub agent_id: AgentId,
    pub agent_name: String,
    pub audit_type: String,
    pub status: AuditVerdict,
    /// 0–100, higher is better
    pub score: f64,
    pub findings: Vec<Finding>,
    pub suggestions: Vec<String>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl AuditReport {
    pub fn configuration(agent_id: AgentId, agent_name: impl Into<String>, score: f64) -> Self {
        Self {
            id: AuditReportId::generate(),
            agent_id,
            agent_name: agent_name.into(),
            audit_type: "configuration".to_string(),
            status: AuditVerdict::from_score(score),
            score,
            findings: Vec::new(),
            suggestions: Vec::new(),
            summary: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}

// ── Simulation results ───────────────────────────────────────────────

/// One simulated interaction scenario run against an agent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: SimulationId,
    pub agent_id: AgentId,
    pub agent_name: String,
    pub scenario_name: String,
    pub user_message: String,
    pub agent_response: String,
    pub expected_behavior: String,
    pub passed: bool,
    /// 0–100, higher is better
    pub quality_score: f64,
    pub feedback: String,
    pub response_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Pass rate over a window of results, as a 0–100 percentage.
///
/// Returns `None` for an empty window so callers can distinguish "no
/// signal" from a zero rate.
pub fn pass_rate(results: &[SimulationResult]) -> Option<f64> {
    if results.is_empty() {
        return None;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    Some(passed as f64 / results.len() as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_bands() {
        assert_eq!(AuditVerdict::from_score(90.0), AuditVerdict::Passed);
        assert_eq!(AuditVerdict::from_score(75.0), AuditVerdict::Passed);
        assert_eq!(AuditVerdict::from_score(74.9), AuditVerdict::NeedsReview);
        assert_eq!(AuditVerdict::from_score(50.0), AuditVerdict::NeedsReview);
        assert_eq!(AuditVerdict::from_score(49.9), AuditVerdict::Failed);
    }

    fn sim(passed: bool) -> SimulationResult {
        SimulationResult {
            id: SimulationId::generate(),
            agent_id: AgentId::new("a1"),
            agent_name: "scout".to_string(),
            scenario_name: "greeting".to_string(),
            user_message: "Hello".to_string(),
            agent_response: "Hi".to_string(),
            expected_behavior: "Responds warmly".to_string(),
            passed,
            quality_score: 80.0,
            feedback: String::new(),
            response_time_ms: 5,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pass_rate_over_window() {
        assert_eq!(pass_rate(&[]), None);
        assert_eq!(pass_rate(&[sim(true), sim(true), sim(false), sim(false)]), Some(50.0));
        assert_eq!(pass_rate(&[sim(true)]), Some(100.0));
    }
}
