//! In-memory reference implementation of the Grove storage traits.
//!
//! Deterministic and test-friendly. Production deployments put a
//! transactional backend behind the same traits; nothing in the core
//! depends on more than these contracts.

use crate::traits::*;
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use grove_types::{
    ActionDefinition, ActionExecution, ActionId, Agent, AgentId, AuditReport, Collaboration,
    CollaborationId, ExecutionId, ImprovementProposal, KnowledgeItem, KnowledgeId, Learning,
    LearningKind, LearningOutcome, Message, MessageId, MessageStatus, ProposalId, ProposalStatus,
    SimulationResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// A stored record plus its insertion sequence.
///
/// Wall clocks can tie within a test run; the monotonic sequence keeps
/// newest-first ordering stable.
#[derive(Clone)]
struct Entry<T> {
    seq: u64,
    record: T,
}

/// In-memory Grove storage adapter.
#[derive(Default)]
pub struct MemoryStore {
    seq: AtomicU64,
    agents: RwLock<HashMap<AgentId, Entry<Agent>>>,
    collaborations: RwLock<HashMap<CollaborationId, Entry<Collaboration>>>,
    proposals: RwLock<HashMap<ProposalId, Entry<ImprovementProposal>>>,
    messages: RwLock<HashMap<MessageId, Entry<Message>>>,
    knowledge: RwLock<HashMap<KnowledgeId, Entry<KnowledgeItem>>>,
    learnings: RwLock<HashMap<grove_types::LearningId, Entry<Learning>>>,
    audits: RwLock<Vec<Entry<AuditReport>>>,
    simulations: RwLock<Vec<Entry<SimulationResult>>>,
    actions: RwLock<HashMap<ActionId, Entry<ActionDefinition>>>,
    executions: RwLock<HashMap<ExecutionId, Entry<ActionExecution>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn entry<T>(&self, record: T) -> Entry<T> {
        Entry {
            seq: self.next_seq(),
            record,
        }
    }
}

fn poisoned(table: &str) -> StoreError {
    StoreError::Backend(format!("{table} lock poisoned"))
}

fn newest_first<T: Clone>(entries: impl Iterator<Item = Entry<T>>) -> Vec<T> {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| b.seq.cmp(&a.seq));
    entries.into_iter().map(|e| e.record).collect()
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn create_agent(&self, agent: Agent) -> StoreResult<()> {
        let mut guard = self.agents.write().map_err(|_| poisoned("agents"))?;
        if guard.contains_key(&agent.id) {
            return Err(StoreError::Conflict(format!(
                "agent {} already exists",
                agent.id
            )));
        }
        guard.insert(agent.id.clone(), self.entry(agent));
        Ok(())
    }

    async fn get_agent(&self, id: &AgentId) -> StoreResult<Option<Agent>> {
        let guard = self.agents.read().map_err(|_| poisoned("agents"))?;
        Ok(guard.get(id).map(|e| e.record.clone()))
    }

    async fn update_agent(&self, agent: Agent) -> StoreResult<()> {
        let mut guard = self.agents.write().map_err(|_| poisoned("agents"))?;
        let entry = guard
            .get_mut(&agent.id)
            .ok_or_else(|| StoreError::NotFound(format!("agent {}", agent.id)))?;
        entry.record = agent;
        Ok(())
    }

    async fn list_agents(&self) -> StoreResult<Vec<Agent>> {
        let guard = self.agents.read().map_err(|_| poisoned("agents"))?;
        let mut entries: Vec<_> = guard.values().cloned().collect();
        entries.sort_by(|a, b| a.seq.cmp(&b.seq));
        Ok(entries.into_iter().map(|e| e.record).collect())
    }
}

#[async_trait]
impl CollaborationStore for MemoryStore {
    async fn create_collaboration(&self, collaboration: Collaboration) -> StoreResult<()> {
        let mut guard = self
            .collaborations
            .write()
            .map_err(|_| poisoned("collaborations"))?;
        if guard.contains_key(&collaboration.id) {
            return Err(StoreError::Conflict(format!(
                "collaboration {} already exists",
                collaboration.id
            )));
        }
        guard.insert(collaboration.id.clone(), self.entry(collaboration));
        Ok(())
    }

    async fn get_collaboration(&self, id: &CollaborationId) -> StoreResult<Option<Collaboration>> {
        let guard = self
            .collaborations
            .read()
            .map_err(|_| poisoned("collaborations"))?;
        Ok(guard.get(id).map(|e| e.record.clone()))
    }

    async fn update_collaboration(&self, collaboration: Collaboration) -> StoreResult<()> {
        let mut guard = self
            .collaborations
            .write()
            .map_err(|_| poisoned("collaborations"))?;
        let entry = guard
            .get_mut(&collaboration.id)
            .ok_or_else(|| StoreError::NotFound(format!("collaboration {}", collaboration.id)))?;
        entry.record = collaboration;
        Ok(())
    }

    async fn list_collaborations(&self) -> StoreResult<Vec<Collaboration>> {
        let guard = self
            .collaborations
            .read()
            .map_err(|_| poisoned("collaborations"))?;
        Ok(newest_first(guard.values().cloned()))
    }
}

#[async_trait]
impl ProposalStore for MemoryStore {
    async fn create_pending_proposal(&self, proposal: ImprovementProposal) -> StoreResult<()> {
        // The write lock spans the uniqueness check and the insert, so
        // concurrent creates for one agent serialize here.
        let mut guard = self.proposals.write().map_err(|_| poisoned("proposals"))?;
        let pending_exists = guard.values().any(|e| {
            e.record.agent_id == proposal.agent_id
                && e.record.status == ProposalStatus::PendingReview
        });
        if pending_exists {
            return Err(StoreError::Conflict(format!(
                "agent {} already has a proposal in pending review",
                proposal.agent_id
            )));
        }
        guard.insert(proposal.id.clone(), self.entry(proposal));
        Ok(())
    }

    async fn get_proposal(&self, id: &ProposalId) -> StoreResult<Option<ImprovementProposal>> {
        let guard = self.proposals.read().map_err(|_| poisoned("proposals"))?;
        Ok(guard.get(id).map(|e| e.record.clone()))
    }

    async fn update_proposal(&self, proposal: ImprovementProposal) -> StoreResult<()> {
        let mut guard = self.proposals.write().map_err(|_| poisoned("proposals"))?;
        let entry = guard
            .get_mut(&proposal.id)
            .ok_or_else(|| StoreError::NotFound(format!("proposal {}", proposal.id)))?;
        entry.record = proposal;
        Ok(())
    }

    async fn pending_proposal_for(
        &self,
        agent_id: &AgentId,
    ) -> StoreResult<Option<ImprovementProposal>> {
        let guard = self.proposals.read().map_err(|_| poisoned("proposals"))?;
        Ok(guard
            .values()
            .find(|e| {
                e.record.agent_id == *agent_id && e.record.status == ProposalStatus::PendingReview
            })
            .map(|e| e.record.clone()))
    }

    async fn list_proposals(&self) -> StoreResult<Vec<ImprovementProposal>> {
        let guard = self.proposals.read().map_err(|_| poisoned("proposals"))?;
        Ok(newest_first(guard.values().cloned()))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create_message(&self, message: Message) -> StoreResult<()> {
        let mut guard = self.messages.write().map_err(|_| poisoned("messages"))?;
        guard.insert(message.id.clone(), self.entry(message));
        Ok(())
    }

    async fn get_message(&self, id: &MessageId) -> StoreResult<Option<Message>> {
        let guard = self.messages.read().map_err(|_| poisoned("messages"))?;
        Ok(guard.get(id).map(|e| e.record.clone()))
    }

    async fn mark_message_processed(&self, id: &MessageId) -> StoreResult<()> {
        let mut guard = self.messages.write().map_err(|_| poisoned("messages"))?;
        let entry = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("message {id}")))?;
        entry.record.status = MessageStatus::Processed;
        Ok(())
    }

    async fn list_messages(&self) -> StoreResult<Vec<Message>> {
        let guard = self.messages.read().map_err(|_| poisoned("messages"))?;
        Ok(newest_first(guard.values().cloned()))
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn create_knowledge(&self, item: KnowledgeItem) -> StoreResult<()> {
        let mut guard = self.knowledge.write().map_err(|_| poisoned("knowledge"))?;
        guard.insert(item.id.clone(), self.entry(item));
        Ok(())
    }

    async fn get_knowledge(&self, id: &KnowledgeId) -> StoreResult<Option<KnowledgeItem>> {
        let guard = self.knowledge.read().map_err(|_| poisoned("knowledge"))?;
        Ok(guard.get(id).map(|e| e.record.clone()))
    }

    async fn update_knowledge(&self, item: KnowledgeItem) -> StoreResult<()> {
        let mut guard = self.knowledge.write().map_err(|_| poisoned("knowledge"))?;
        let entry = guard
            .get_mut(&item.id)
            .ok_or_else(|| StoreError::NotFound(format!("knowledge {}", item.id)))?;
        entry.record = item;
        Ok(())
    }

    async fn validated_knowledge(&self) -> StoreResult<Vec<KnowledgeItem>> {
        let guard = self.knowledge.read().map_err(|_| poisoned("knowledge"))?;
        Ok(newest_first(
            guard.values().filter(|e| e.record.validated).cloned(),
        ))
    }

    async fn list_knowledge(&self, limit: usize) -> StoreResult<Vec<KnowledgeItem>> {
        let guard = self.knowledge.read().map_err(|_| poisoned("knowledge"))?;
        let mut items: Vec<_> = guard.values().map(|e| e.record.clone()).collect();
        items.sort_by(|a, b| b.confidence_score.cmp(&a.confidence_score));
        items.truncate(limit);
        Ok(items)
    }
}

#[async_trait]
impl LearningStore for MemoryStore {
    async fn create_learning(&self, learning: Learning) -> StoreResult<()> {
        let mut guard = self.learnings.write().map_err(|_| poisoned("learnings"))?;
        guard.insert(learning.id.clone(), self.entry(learning));
        Ok(())
    }

    async fn learnings_with_outcome(
        &self,
        outcome: LearningOutcome,
    ) -> StoreResult<Vec<Learning>> {
        let guard = self.learnings.read().map_err(|_| poisoned("learnings"))?;
        Ok(newest_first(
            guard
                .values()
                .filter(|e| e.record.outcome == outcome)
                .cloned(),
        ))
    }

    async fn learnings_of_kind(&self, kind: LearningKind) -> StoreResult<Vec<Learning>> {
        let guard = self.learnings.read().map_err(|_| poisoned("learnings"))?;
        Ok(newest_first(
            guard
                .values()
                .filter(|e| e.record.learning_type == kind)
                .cloned(),
        ))
    }

    async fn top_learnings(&self, limit: usize) -> StoreResult<Vec<Learning>> {
        let guard = self.learnings.read().map_err(|_| poisoned("learnings"))?;
        let mut items: Vec<_> = guard.values().map(|e| e.record.clone()).collect();
        items.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        items.truncate(limit);
        Ok(items)
    }

    async fn recent_learnings(&self, limit: usize) -> StoreResult<Vec<Learning>> {
        let guard = self.learnings.read().map_err(|_| poisoned("learnings"))?;
        let mut items = newest_first(guard.values().cloned());
        items.truncate(limit);
        Ok(items)
    }
}

#[async_trait]
impl AuditReportStore for MemoryStore {
    async fn create_audit(&self, report: AuditReport) -> StoreResult<()> {
        let mut guard = self.audits.write().map_err(|_| poisoned("audits"))?;
        let entry = self.entry(report);
        guard.push(entry);
        Ok(())
    }

    async fn audits_for_agent(&self, agent_id: &AgentId) -> StoreResult<Vec<AuditReport>> {
        let guard = self.audits.read().map_err(|_| poisoned("audits"))?;
        Ok(newest_first(
            guard
                .iter()
                .filter(|e| e.record.agent_id == *agent_id)
                .cloned(),
        ))
    }

    async fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditReport>> {
        let guard = self.audits.read().map_err(|_| poisoned("audits"))?;
        let mut items = newest_first(guard.iter().cloned());
        items.truncate(limit);
        Ok(items)
    }
}

#[async_trait]
impl SimulationStore for MemoryStore {
    async fn create_simulation(&self, result: SimulationResult) -> StoreResult<()> {
        let mut guard = self
            .simulations
            .write()
            .map_err(|_| poisoned("simulations"))?;
        let entry = self.entry(result);
        guard.push(entry);
        Ok(())
    }

    async fn recent_simulations_for_agent(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> StoreResult<Vec<SimulationResult>> {
        let guard = self
            .simulations
            .read()
            .map_err(|_| poisoned("simulations"))?;
        let mut items = newest_first(
            guard
                .iter()
                .filter(|e| e.record.agent_id == *agent_id)
                .cloned(),
        );
        items.truncate(limit);
        Ok(items)
    }

    async fn recent_simulations(&self, limit: usize) -> StoreResult<Vec<SimulationResult>> {
        let guard = self
            .simulations
            .read()
            .map_err(|_| poisoned("simulations"))?;
        let mut items = newest_first(guard.iter().cloned());
        items.truncate(limit);
        Ok(items)
    }
}

#[async_trait]
impl ActionStore for MemoryStore {
    async fn create_action(&self, action: ActionDefinition) -> StoreResult<()> {
        let mut guard = self.actions.write().map_err(|_| poisoned("actions"))?;
        guard.insert(action.id.clone(), self.entry(action));
        Ok(())
    }

    async fn get_action(&self, id: &ActionId) -> StoreResult<Option<ActionDefinition>> {
        let guard = self.actions.read().map_err(|_| poisoned("actions"))?;
        Ok(guard.get(id).map(|e| e.record.clone()))
    }

    async fn list_actions(&self) -> StoreResult<Vec<ActionDefinition>> {
        let guard = self.actions.read().map_err(|_| poisoned("actions"))?;
        Ok(newest_first(guard.values().cloned()))
    }

    async fn create_execution(&self, execution: ActionExecution) -> StoreResult<()> {
        let mut guard = self
            .executions
            .write()
            .map_err(|_| poisoned("executions"))?;
        guard.insert(execution.id.clone(), self.entry(execution));
        Ok(())
    }

    async fn update_execution(&self, execution: ActionExecution) -> StoreResult<()> {
        let mut guard = self
            .executions
            .write()
            .map_err(|_| poisoned("executions"))?;
        let entry = guard
            .get_mut(&execution.id)
            .ok_or_else(|| StoreError::NotFound(format!("execution {}", execution.id)))?;
        entry.record = execution;
        Ok(())
    }

    async fn get_execution(&self, id: &ExecutionId) -> StoreResult<Option<ActionExecution>> {
        let guard = self.executions.read().map_err(|_| poisoned("executions"))?;
        Ok(guard.get(id).map(|e| e.record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_types::{ProposalPriority, TriggerReason};
    use std::sync::Arc;

    fn pending_proposal(agent_id: &AgentId) -> ImprovementProposal {
        ImprovementProposal::pending(
            agent_id.clone(),
            "scout",
            TriggerReason::LowAuditScore,
            60.0,
            70.0,
            ProposalPriority::Medium,
            Vec::new(),
            "needs work",
        )
    }

    #[tokio::test]
    async fn agent_create_conflicts_on_duplicate_id() {
        let store = MemoryStore::new();
        let agent = Agent::new("scout", "finds things");
        store.create_agent(agent.clone()).await.unwrap();
        let err = store.create_agent(agent).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn pending_proposal_uniqueness_is_enforced() {
        let store = MemoryStore::new();
        let agent_id = AgentId::new("a1");

        store
            .create_pending_proposal(pending_proposal(&agent_id))
            .await
            .unwrap();
        let err = store
            .create_pending_proposal(pending_proposal(&agent_id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // A non-pending proposal does not block a new pending one.
        let mut applied = store.pending_proposal_for(&agent_id).await.unwrap().unwrap();
        applied.set_status(ProposalStatus::Applied);
        store.update_proposal(applied).await.unwrap();
        store
            .create_pending_proposal(pending_proposal(&agent_id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_pending_creates_admit_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let agent_id = AgentId::new("a1");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let proposal = pending_proposal(&agent_id);
            handles.push(tokio::spawn(async move {
                store.create_pending_proposal(proposal).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn recent_simulations_are_newest_first_and_capped() {
        let store = MemoryStore::new();
        let agent_id = AgentId::new("a1");
        for i in 0..5 {
            let mut result = SimulationResult {
                id: grove_types::SimulationId::generate(),
                agent_id: agent_id.clone(),
                agent_name: "scout".to_string(),
                scenario_name: format!("scenario-{i}"),
                user_message: String::new(),
                agent_response: String::new(),
                expected_behavior: String::new(),
                passed: true,
                quality_score: 80.0,
                feedback: String::new(),
                response_time_ms: 1,
                created_at: chrono::Utc::now(),
            };
            result.passed = i % 2 == 0;
            store.create_simulation(result).await.unwrap();
        }

        let recent = store
            .recent_simulations_for_agent(&agent_id, 3)
            .await
            .unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].scenario_name, "scenario-4");
        assert_eq!(recent[2].scenario_name, "scenario-2");
    }

    #[tokio::test]
    async fn message_processed_transition() {
        let store = MemoryStore::new();
        let msg = Message::sent(
            "a",
            "b",
            grove_types::MessageKind::TaskRequest,
            "s",
            "c",
            serde_json::json!({}),
        );
        let id = msg.id.clone();
        store.create_message(msg).await.unwrap();
        store.mark_message_processed(&id).await.unwrap();
        let stored = store.get_message(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Processed);
    }

    #[tokio::test]
    async fn knowledge_list_orders_by_confidence() {
        let store = MemoryStore::new();
        for (title, confidence) in [("low", 30u8), ("high", 90), ("mid", 60)] {
            store
                .create_knowledge(
                    KnowledgeItem::new(
                        grove_types::KnowledgeKind::Insight,
                        title,
                        "c",
                        "architect",
                    )
                    .with_confidence(confidence),
                )
                .await
                .unwrap();
        }
        let items = store.list_knowledge(2).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "high");
        assert_eq!(items[1].title, "mid");
    }
}
