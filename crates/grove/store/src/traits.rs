use crate::StoreResult;
use async_trait::async_trait;
use grove_types::{
    ActionDefinition, ActionExecution, ActionId, Agent, AgentId, AuditReport, Collaboration,
    CollaborationId, ExecutionId, ImprovementProposal, KnowledgeItem, KnowledgeId, Learning,
    LearningKind, LearningOutcome, Message, MessageId, ProposalId, SimulationResult,
};

/// Storage interface for agent records.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Insert a new agent; `Conflict` if the id is already taken.
    async fn create_agent(&self, agent: Agent) -> StoreResult<()>;
    async fn get_agent(&self, id: &AgentId) -> StoreResult<Option<Agent>>;
    /// Replace an existing agent record.
    async fn update_agent(&self, agent: Agent) -> StoreResult<()>;
    async fn list_agents(&self) -> StoreResult<Vec<Agent>>;
}

/// Storage interface for workflow runs.
#[async_trait]
pub trait CollaborationStore: Send + Sync {
    async fn create_collaboration(&self, collaboration: Collaboration) -> StoreResult<()>;
    async fn get_collaboration(&self, id: &CollaborationId) -> StoreResult<Option<Collaboration>>;
    async fn update_collaboration(&self, collaboration: Collaboration) -> StoreResult<()>;
    async fn list_collaborations(&self) -> StoreResult<Vec<Collaboration>>;
}

/// Storage interface for improvement proposals.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Conditional create: fails with `Conflict` when the agent already
    /// has a proposal in pending review. The read-then-write is
    /// serialized per store so two concurrent creates for one agent
    /// cannot both succeed.
    async fn create_pending_proposal(&self, proposal: ImprovementProposal) -> StoreResult<()>;
    async fn get_proposal(&self, id: &ProposalId) -> StoreResult<Option<ImprovementProposal>>;
    async fn update_proposal(&self, proposal: ImprovementProposal) -> StoreResult<()>;
    /// The agent's pending-review proposal, if any.
    async fn pending_proposal_for(
        &self,
        agent_id: &AgentId,
    ) -> StoreResult<Option<ImprovementProposal>>;
    async fn list_proposals(&self) -> StoreResult<Vec<ImprovementProposal>>;
}

/// Storage interface for the append-only message log.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_message(&self, message: Message) -> StoreResult<()>;
    async fn get_message(&self, id: &MessageId) -> StoreResult<Option<Message>>;
    /// The only permitted mutation: Sent → Processed.
    async fn mark_message_processed(&self, id: &MessageId) -> StoreResult<()>;
    /// Newest first.
    async fn list_messages(&self) -> StoreResult<Vec<Message>>;
}

/// Storage interface for the shared knowledge pool.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn create_knowledge(&self, item: KnowledgeItem) -> StoreResult<()>;
    async fn get_knowledge(&self, id: &KnowledgeId) -> StoreResult<Option<KnowledgeItem>>;
    async fn update_knowledge(&self, item: KnowledgeItem) -> StoreResult<()>;
    async fn validated_knowledge(&self) -> StoreResult<Vec<KnowledgeItem>>;
    /// Highest confidence first.
    async fn list_knowledge(&self, limit: usize) -> StoreResult<Vec<KnowledgeItem>>;
}

/// Storage interface for architect learnings.
#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn create_learning(&self, learning: Learning) -> StoreResult<()>;
    async fn learnings_with_outcome(&self, outcome: LearningOutcome)
        -> StoreResult<Vec<Learning>>;
    async fn learnings_of_kind(&self, kind: LearningKind) -> StoreResult<Vec<Learning>>;
    /// Highest confidence first.
    async fn top_learnings(&self, limit: usize) -> StoreResult<Vec<Learning>>;
    /// Newest first.
    async fn recent_learnings(&self, limit: usize) -> StoreResult<Vec<Learning>>;
}

/// Storage interface for audit reports.
#[async_trait]
pub trait AuditReportStore: Send + Sync {
    async fn create_audit(&self, report: AuditReport) -> StoreResult<()>;
    /// Newest first.
    async fn audits_for_agent(&self, agent_id: &AgentId) -> StoreResult<Vec<AuditReport>>;
    /// Newest first.
    async fn recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditReport>>;
}

/// Storage interface for simulation results.
#[async_trait]
pub trait SimulationStore: Send + Sync {
    async fn create_simulation(&self, result: SimulationResult) -> StoreResult<()>;
    /// Newest first, capped at `limit`.
    async fn recent_simulations_for_agent(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> StoreResult<Vec<SimulationResult>>;
    /// Newest first.
    async fn recent_simulations(&self, limit: usize) -> StoreResult<Vec<SimulationResult>>;
}

/// Storage interface for action definitions and execution logs.
#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn create_action(&self, action: ActionDefinition) -> StoreResult<()>;
    async fn get_action(&self, id: &ActionId) -> StoreResult<Option<ActionDefinition>>;
    async fn list_actions(&self) -> StoreResult<Vec<ActionDefinition>>;

    async fn create_execution(&self, execution: ActionExecution) -> StoreResult<()>;
    async fn update_execution(&self, execution: ActionExecution) -> StoreResult<()>;
    async fn get_execution(&self, id: &ExecutionId) -> StoreResult<Option<ActionExecution>>;
}

/// Unified storage bundle consumed by the Grove runtime.
pub trait GroveStore:
    AgentStore
    + CollaborationStore
    + ProposalStore
    + MessageStore
    + KnowledgeStore
    + LearningStore
    + AuditReportStore
    + SimulationStore
    + ActionStore
    + Send
    + Sync
{
}

impl<T> GroveStore for T where
    T: AgentStore
        + CollaborationStore
        + ProposalStore
        + MessageStore
        + KnowledgeStore
        + LearningStore
        + AuditReportStore
        + SimulationStore
        + ActionStore
        + Send
        + Sync
{
}
