//! Improvement proposals: review-gated agent configuration changes

use crate::{AgentId, CollaborationId, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a proposal was triggered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    LowAuditScore,
    LowPassRate,
}

impl TriggerReason {
    /// Human phrasing used in notification messages
    pub fn describe(self) -> &'static str {
        match self {
            TriggerReason::LowAuditScore => "an audit score",
            TriggerReason::LowPassRate => "a simulation pass rate",
        }
    }
}

/// Derived urgency of a proposal, from the gap below threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl ProposalPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalPriority::Low => "low",
            ProposalPriority::Medium => "medium",
            ProposalPriority::High => "high",
            ProposalPriority::Critical => "critical",
        }
    }
}

/// Review state machine: PendingReview → Approved/Rejected → Applied
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    PendingReview,
    Approved,
    Rejected,
    Applied,
}

/// One field-level configuration change recommendation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Suggestion {
    pub field: String,
    pub current_value: String,
    pub suggested_value: String,
    pub reason: String,
    #[serde(default)]
    pub priority: SuggestionPriority,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// A recommended set of agent configuration changes, gated by review.
///
/// At most one proposal per agent may sit in `PendingReview` at any time;
/// the store's conditional create enforces that. Proposals are never
/// deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImprovementProposal {
    pub id: ProposalId,
    pub agent_id: AgentId,
    pub agent_name: String,
    pub trigger_reason: TriggerReason,
    pub trigger_value: f64,
    pub threshold: f64,
    pub priority: ProposalPriority,
    pub status: ProposalStatus,
    pub suggestions: Vec<Suggestion>,
    pub overall_assessment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaboration_id: Option<CollaborationId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImprovementProposal {
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        agent_id: AgentId,
        agent_name: impl Into<String>,
        trigger_reason: TriggerReason,
        trigger_value: f64,
        threshold: f64,
        priority: ProposalPriority,
        suggestions: Vec<Suggestion>,
        overall_assessment: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProposalId::generate(),
            agent_id,
            agent_name: agent_name.into(),
            trigger_reason,
            trigger_value,
            threshold,
            priority,
            status: ProposalStatus::PendingReview,
            suggestions,
            overall_assessment: overall_assessment.into(),
            collaboration_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn link_collaboration(&mut self, id: CollaborationId) {
        self.collaboration_id = Some(id);
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: ProposalStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_proposal_starts_in_review() {
        let p = ImprovementProposal::pending(
            AgentId::new("a1"),
            "scout",
            TriggerReason::LowAuditScore,
            60.0,
            70.0,
            ProposalPriority::Medium,
            Vec::new(),
            "needs work",
        );
        assert_eq!(p.status, ProposalStatus::PendingReview);
        assert!(p.collaboration_id.is_none());
    }

    #[test]
    fn priority_ordering_matches_urgency() {
        assert!(ProposalPriority::Critical > ProposalPriority::High);
        assert!(ProposalPriority::High > ProposalPriority::Medium);
        assert!(ProposalPriority::Medium > ProposalPriority::Low);
    }

    #[test]
    fn statuses_use_snake_case_wire_names() {
        let s = serde_json::to_value(ProposalStatus::PendingReview).unwrap();
        assert_eq!(s, serde_json::json!("pending_review"));
        let r = serde_json::to_value(TriggerReason::LowPassRate).unwrap();
        assert_eq!(r, serde_json::json!("low_pass_rate"));
    }
}
