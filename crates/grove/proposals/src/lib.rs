//! Improvement-proposal management for Grove
//!
//! The proposal manager closes the feedback loop: quality signals that
//! cross their thresholds become review-gated proposals, approved
//! proposals get applied back onto agent configurations, and every
//! proposal spawns a draft improvement-cycle collaboration to verify the
//! change.
//!
//! Duplicate suppression is the invariant that keeps repeated scans
//! idempotent: at most one proposal per agent sits in pending review,
//! enforced by the store's conditional create and treated as a skip
//! wherever a scan or check races another.

#![deny(unsafe_code)]

use async_trait::async_trait;
use grove_architect::{Learner, QualitySignalHook, ARCHITECT};
use grove_messaging::MessageLog;
use grove_monitor::SignalKind;
use grove_store::{
    AgentStore, AuditReportStore, CollaborationStore, GroveStore, ProposalStore, SimulationStore,
    StoreError,
};
use grove_types::{
    pass_rate, Agent, AgentId, Collaboration, CoreError, CoreResult, GroveConfig,
    ImprovementProposal, MessageKind, MessagePriority, ProposalId, ProposalPriority,
    ProposalStatus, SharedContext, Step, TriggerReason,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Result of a check over freshly measured signals
#[derive(Clone, Debug, Serialize)]
pub struct CheckOutcome {
    pub triggered: bool,
    pub proposals: Vec<ImprovementProposal>,
}

/// Result of a population-wide scan
#[derive(Clone, Debug, Serialize)]
pub struct ScanOutcome {
    pub scanned: usize,
    pub proposals_created: usize,
    pub agents_flagged: Vec<String>,
}

/// Result of applying an approved proposal
#[derive(Clone, Debug, Serialize)]
pub struct ApplyOutcome {
    pub applied_changes: usize,
    pub updates: Value,
}

fn signal_kind(reason: TriggerReason) -> SignalKind {
    match reason {
        TriggerReason::LowAuditScore => SignalKind::AuditScore,
        TriggerReason::LowPassRate => SignalKind::PassRate,
    }
}

fn notification_priority(priority: ProposalPriority) -> MessagePriority {
    match priority {
        ProposalPriority::Critical => MessagePriority::Urgent,
        ProposalPriority::High => MessagePriority::High,
        _ => MessagePriority::Normal,
    }
}

/// Creates, reviews, and applies improvement proposals.
pub struct ProposalManager {
    store: Arc<dyn GroveStore>,
    learner: Arc<Learner>,
    log: MessageLog,
    config: GroveConfig,
}

impl ProposalManager {
    pub fn new(
        store: Arc<dyn GroveStore>,
        learner: Arc<Learner>,
        log: MessageLog,
        config: GroveConfig,
    ) -> Self {
        Self {
            store,
            learner,
            log,
            config,
        }
    }

    /// Create a proposal for an agent whose signal fell below threshold.
    ///
    /// Fetches suggestions from the learner, derives priority from the
    /// gap, persists the proposal in pending review, and spawns the
    /// linked improvement-cycle collaboration. Fails with `InvalidState`
    /// when the agent already has a pending proposal.
    pub async fn create(
        &self,
        agent_id: &AgentId,
        reason: TriggerReason,
        value: f64,
        threshold: f64,
    ) -> CoreResult<ImprovementProposal> {
        let agent = self.agent(agent_id).await?;

        // Early duplicate check saves the suggestion call; the store's
        // conditional create below still closes the race window.
        if self.store.pending_proposal_for(agent_id).await?.is_some() {
            return Err(CoreError::InvalidState(format!(
                "agent {agent_id} already has a proposal in pending review"
            )));
        }

        let suggestion_set = self.learner.suggest(agent_id).await?;
        let decision = grove_monitor::evaluate(signal_kind(reason), value, threshold);

        let assessment = if suggestion_set.assessment.is_empty() {
            format!(
                "Agent {} needs improvement. {} is {value}%, below threshold of {threshold}%.",
                agent.name,
                reason.describe(),
            )
        } else {
            suggestion_set.assessment
        };

        let mut proposal = ImprovementProposal::pending(
            agent.id.clone(),
            &agent.name,
            reason,
            value,
            threshold,
            decision.priority,
            suggestion_set.suggestions,
            assessment,
        );

        match self.store.create_pending_proposal(proposal.clone()).await {
            Ok(()) => {}
            Err(StoreError::Conflict(msg)) => {
                return Err(CoreError::InvalidState(msg));
            }
            Err(other) => return Err(other.into()),
        }

        let collaboration = self.draft_improvement_cycle(&agent, &proposal);
        self.store.create_collaboration(collaboration.clone()).await?;
        proposal.link_collaboration(collaboration.id.clone());
        self.store.update_proposal(proposal.clone()).await?;

        self.log
            .send(
                ARCHITECT,
                "admin",
                MessageKind::TaskRequest,
                &format!(
                    "[{}] Improvement needed: {}",
                    proposal.priority.as_str().to_uppercase(),
                    agent.name
                ),
                &format!(
                    "Agent \"{}\" has {} of {value}% (threshold: {threshold}%). \
                     Review proposal #{} for suggested improvements.",
                    agent.name,
                    reason.describe(),
                    proposal.id
                ),
                json!({
                    "proposalId": proposal.id,
                    "collaborationId": collaboration.id,
                }),
                notification_priority(proposal.priority),
                Some(collaboration.id.clone()),
            )
            .await?;

        tracing::info!(
            agent = %agent.name,
            proposal_id = %proposal.id,
            priority = proposal.priority.as_str(),
            reason = ?reason,
            "improvement proposal created"
        );

        Ok(proposal)
    }

    /// The fixed 4-step improvement-cycle draft spawned with every
    /// proposal. It stays pending until an operator runs it.
    fn draft_improvement_cycle(
        &self,
        agent: &Agent,
        proposal: &ImprovementProposal,
    ) -> Collaboration {
        let mut context = SharedContext::default();
        context.insert(SharedContext::PROPOSAL_ID, json!(proposal.id));
        context.insert(SharedContext::AGENT_ID, json!(agent.id));
        context.insert(SharedContext::TRIGGER_REASON, json!(proposal.trigger_reason));
        context.insert(
            SharedContext::TARGET_AGENT_ID,
            Value::String(agent.id.to_string()),
        );

        let steps = vec![
            Step::pending(1, ARCHITECT, "apply_suggestions", "Apply suggested changes")
                .with_input(json!({"proposalId": proposal.id})),
            Step::pending(2, ARCHITECT, "audit_config", "Re-audit configuration")
                .with_input(json!({"agentId": agent.id})),
            Step::pending(3, ARCHITECT, "simulate", "Test improvements")
                .with_input(json!({"agentId": agent.id})),
            Step::pending(4, ARCHITECT, "validate", "Validate improvements"),
        ];

        Collaboration::new(
            "improvement_cycle",
            format!("Improvement: {}", agent.name),
            ARCHITECT,
            steps,
            context,
        )
    }

    /// Evaluate freshly measured signals for one agent and create a
    /// proposal per triggered signal. A duplicate-suppression conflict
    /// is an idempotent skip, not an error.
    pub async fn check(
        &self,
        agent_id: &AgentId,
        audit_score: Option<f64>,
        pass_rate: Option<f64>,
    ) -> CoreResult<CheckOutcome> {
        let mut proposals = Vec::new();

        if let Some(score) = audit_score {
            let decision = grove_monitor::evaluate(
                SignalKind::AuditScore,
                score,
                self.config.audit_threshold,
            );
            if decision.triggered {
                if let Some(proposal) = self
                    .try_create(
                        agent_id,
                        TriggerReason::LowAuditScore,
                        score,
                        self.config.audit_threshold,
                    )
                    .await?
                {
                    proposals.push(proposal);
                }
            }
        }

        if let Some(rate) = pass_rate {
            let decision = grove_monitor::evaluate(
                SignalKind::PassRate,
                rate,
                self.config.simulation_threshold,
            );
            if decision.triggered {
                if let Some(proposal) = self
                    .try_create(
                        agent_id,
                        TriggerReason::LowPassRate,
                        rate,
                        self.config.simulation_threshold,
                    )
                    .await?
                {
                    proposals.push(proposal);
                }
            }
        }

        Ok(CheckOutcome {
            triggered: !proposals.is_empty(),
            proposals,
        })
    }

    /// Scan the whole population and propose for the first failing
    /// signal per agent (audit before pass rate). Idempotent under
    /// repeated scans.
    pub async fn scan(&self) -> CoreResult<ScanOutcome> {
        let agents = self.store.list_agents().await?;
        let mut outcome = ScanOutcome {
            scanned: 0,
            proposals_created: 0,
            agents_flagged: Vec::new(),
        };

        for agent in agents {
            outcome.scanned += 1;

            if self.store.pending_proposal_for(&agent.id).await?.is_some() {
                continue;
            }

            let latest_audit = self
                .store
                .audits_for_agent(&agent.id)
                .await?
                .into_iter()
                .next();
            let recent = self
                .store
                .recent_simulations_for_agent(&agent.id, self.config.simulation_window)
                .await?;
            let rate = pass_rate(&recent);

            let trigger = match (latest_audit, rate) {
                (Some(audit), _) if audit.score < self.config.audit_threshold => Some((
                    TriggerReason::LowAuditScore,
                    audit.score,
                    self.config.audit_threshold,
                )),
                (_, Some(rate)) if rate < self.config.simulation_threshold => Some((
                    TriggerReason::LowPassRate,
                    rate,
                    self.config.simulation_threshold,
                )),
                _ => None,
            };

            if let Some((reason, value, threshold)) = trigger {
                if self
                    .try_create(&agent.id, reason, value, threshold)
                    .await?
                    .is_some()
                {
                    outcome.proposals_created += 1;
                    outcome.agents_flagged.push(agent.name.clone());
                }
            }
        }

        tracing::info!(
            scanned = outcome.scanned,
            created = outcome.proposals_created,
            "population scan complete"
        );

        Ok(outcome)
    }

    /// Create, treating a duplicate-suppression conflict as `None`.
    async fn try_create(
        &self,
        agent_id: &AgentId,
        reason: TriggerReason,
        value: f64,
        threshold: f64,
    ) -> CoreResult<Option<ImprovementProposal>> {
        match self.create(agent_id, reason, value, threshold).await {
            Ok(proposal) => Ok(Some(proposal)),
            Err(CoreError::InvalidState(_)) => {
                tracing::debug!(agent_id = %agent_id, "pending proposal exists; skipping");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    /// Approve a pending proposal.
    pub async fn approve(&self, id: &ProposalId) -> CoreResult<ImprovementProposal> {
        self.review(id, ProposalStatus::Approved).await
    }

    /// Reject a pending proposal.
    pub async fn reject(&self, id: &ProposalId) -> CoreResult<ImprovementProposal> {
        self.review(id, ProposalStatus::Rejected).await
    }

    async fn review(
        &self,
        id: &ProposalId,
        verdict: ProposalStatus,
    ) -> CoreResult<ImprovementProposal> {
        let mut proposal = self.proposal(id).await?;
        if proposal.status != ProposalStatus::PendingReview {
            return Err(CoreError::InvalidState(format!(
                "proposal {id} is {:?}, not pending review",
                proposal.status
            )));
        }
        proposal.set_status(verdict);
        self.store.update_proposal(proposal.clone()).await?;
        Ok(proposal)
    }

    /// Apply an approved proposal's suggestions onto the agent.
    ///
    /// Each suggestion writes its field; a repeated field takes the last
    /// write. Fields the agent schema does not know are skipped. The
    /// proposal transitions to applied and the change is logged as a
    /// status-update message.
    pub async fn apply(&self, id: &ProposalId) -> CoreResult<ApplyOutcome> {
        let mut proposal = self.proposal(id).await?;
        if proposal.status != ProposalStatus::Approved {
            return Err(CoreError::InvalidState(format!(
                "proposal {id} must be approved before applying (currently {:?})",
                proposal.status
            )));
        }

        let mut agent = self.agent(&proposal.agent_id).await?;
        let mut updates = Map::new();
        for suggestion in &proposal.suggestions {
            if suggestion.field.is_empty() || suggestion.suggested_value.is_empty() {
                continue;
            }
            match agent.apply_field(&suggestion.field, &suggestion.suggested_value) {
                Ok(()) => {
                    updates.insert(
                        suggestion.field.clone(),
                        Value::String(suggestion.suggested_value.clone()),
                    );
                }
                Err(CoreError::InvalidArgument(msg)) => {
                    tracing::warn!(field = %suggestion.field, %msg, "skipping unknown field");
                }
                Err(other) => return Err(other),
            }
        }

        if !updates.is_empty() {
            self.store.update_agent(agent.clone()).await?;
        }

        proposal.set_status(ProposalStatus::Applied);
        self.store.update_proposal(proposal.clone()).await?;

        self.log
            .send(
                ARCHITECT,
                "system",
                MessageKind::StatusUpdate,
                &format!("Applied improvements to {}", agent.name),
                &format!(
                    "Applied {} changes based on proposal {id}",
                    updates.len()
                ),
                json!({ "updates": updates, "proposalId": id }),
                MessagePriority::Normal,
                proposal.collaboration_id.clone(),
            )
            .await?;

        tracing::info!(
            agent = %agent.name,
            proposal_id = %id,
            changes = updates.len(),
            "proposal applied"
        );

        Ok(ApplyOutcome {
            applied_changes: updates.len(),
            updates: Value::Object(updates),
        })
    }

    async fn agent(&self, id: &AgentId) -> CoreResult<Agent> {
        self.store
            .get_agent(id)
            .await?
            .ok_or_else(|| CoreError::not_found("agent", id.to_string()))
    }

    async fn proposal(&self, id: &ProposalId) -> CoreResult<ImprovementProposal> {
        self.store
            .get_proposal(id)
            .await?
            .ok_or_else(|| CoreError::not_found("proposal", id.to_string()))
    }
}

/// Fresh sub-threshold signals from audits and simulations flow straight
/// into `check`.
#[async_trait]
impl QualitySignalHook for ProposalManager {
    async fn signal(&self, agent_id: &AgentId, kind: SignalKind, value: f64) -> CoreResult<()> {
        match kind {
            SignalKind::AuditScore => self.check(agent_id, Some(value), None).await?,
            SignalKind::PassRate => self.check(agent_id, None, Some(value)).await?,
        };
        Ok(())
    }
}
