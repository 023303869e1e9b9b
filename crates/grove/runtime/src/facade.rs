//! The Grove facade: construction, wiring, and public operations

use crate::handlers::register_default_handlers;
use grove_actions::ActionEngine;
use grove_architect::{
    AnalyzeOutcome, Auditor, KnowledgePool, KnowledgeQuery, Learner, Scenario, SimulationSummary,
    Simulator, SuggestionSet, SyncOutcome,
};
use grove_engine::{HandlerRegistry, TemplateSet, WorkflowEngine, WorkflowOutcome};
use grove_messaging::{ActionMatcher, KeywordMatcher, MessageLog, TaskDispatcher, TaskOutcome};
use grove_model::GenerativeModel;
use grove_proposals::{ApplyOutcome, CheckOutcome, ProposalManager, ScanOutcome};
use grove_store::GroveStore;
use grove_types::{
    AgentId, AuditReport, CollaborationId, CoreError, CoreResult, GroveConfig,
    ImprovementProposal, KnowledgeId, KnowledgeItem, MessagePriority, ProposalId,
};
use serde_json::Value;
use std::sync::Arc;

/// An authenticated caller identity. Authentication itself is an
/// external concern; Grove only requires that an identity is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller(pub String);

impl Caller {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

fn require_caller(caller: Option<&Caller>) -> CoreResult<&Caller> {
    caller.ok_or(CoreError::Unauthorized)
}

/// Builder for [`Grove`], defaulting to the built-in templates, the
/// keyword action matcher, and no action engine.
pub struct GroveBuilder {
    store: Arc<dyn GroveStore>,
    model: Arc<dyn GenerativeModel>,
    config: GroveConfig,
    templates: TemplateSet,
    matcher: Arc<dyn ActionMatcher>,
    action_engine: Option<Arc<ActionEngine>>,
}

impl GroveBuilder {
    pub fn config(mut self, config: GroveConfig) -> Self {
        self.config = config;
        self
    }

    pub fn templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn matcher(mut self, matcher: Arc<dyn ActionMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn action_engine(mut self, engine: Arc<ActionEngine>) -> Self {
        self.action_engine = Some(engine);
        self
    }

    pub fn build(self) -> CoreResult<Grove> {
        let log = MessageLog::new(self.store.clone());
        let learner = Arc::new(Learner::new(self.store.clone(), self.model.clone()));
        let manager = Arc::new(ProposalManager::new(
            self.store.clone(),
            learner.clone(),
            log.clone(),
            self.config.clone(),
        ));

        // The proposal manager doubles as the quality-signal hook, so a
        // fresh sub-threshold audit or simulation immediately feeds the
        // remediation loop.
        let auditor = Arc::new(Auditor::new(
            self.store.clone(),
            self.model.clone(),
            manager.clone(),
            self.config.clone(),
        ));
        let simulator = Arc::new(Simulator::new(
            self.store.clone(),
            self.model.clone(),
            manager.clone(),
            self.config.clone(),
        ));
        let pool = Arc::new(KnowledgePool::new(self.store.clone(), self.model.clone()));

        let registry = Arc::new(HandlerRegistry::new());
        register_default_handlers(
            &registry,
            self.store.clone(),
            self.model.clone(),
            auditor.clone(),
            simulator.clone(),
            learner.clone(),
            pool.clone(),
            manager.clone(),
            &self.config,
        )?;

        let engine = WorkflowEngine::new(
            self.store.clone(),
            log.clone(),
            registry,
            self.templates,
        );

        let dispatcher = TaskDispatcher::new(
            self.store.clone(),
            self.model.clone(),
            auditor.clone(),
            simulator.clone(),
            learner.clone(),
            log.clone(),
            self.matcher,
            self.action_engine,
        );

        Ok(Grove {
            store: self.store,
            auditor,
            simulator,
            learner,
            pool,
            manager,
            engine,
            dispatcher,
        })
    }
}

/// The assembled Grove coordination surface.
pub struct Grove {
    store: Arc<dyn GroveStore>,
    auditor: Arc<Auditor>,
    simulator: Arc<Simulator>,
    learner: Arc<Learner>,
    pool: Arc<KnowledgePool>,
    manager: Arc<ProposalManager>,
    engine: WorkflowEngine,
    dispatcher: TaskDispatcher,
}

impl Grove {
    pub fn builder(store: Arc<dyn GroveStore>, model: Arc<dyn GenerativeModel>) -> GroveBuilder {
        GroveBuilder {
            store,
            model,
            config: GroveConfig::default(),
            templates: TemplateSet::builtin(),
            matcher: Arc::new(KeywordMatcher),
            action_engine: None,
        }
    }

    /// The entity store backing this runtime, for operators that manage
    /// agents and actions directly.
    pub fn store(&self) -> &Arc<dyn GroveStore> {
        &self.store
    }

    // ── Core operations ──────────────────────────────────────────────

    /// Run a named workflow against an optional target agent.
    pub async fn run_workflow(
        &self,
        caller: Option<&Caller>,
        workflow_type: &str,
        target_agent: Option<&AgentId>,
        options: Value,
    ) -> CoreResult<WorkflowOutcome> {
        let caller = require_caller(caller)?;
        tracing::debug!(caller = %caller.0, workflow_type, "run_workflow");
        self.engine.run(workflow_type, target_agent, options).await
    }

    /// Scan every agent for sub-threshold signals.
    pub async fn scan_agents(&self, caller: Option<&Caller>) -> CoreResult<ScanOutcome> {
        let caller = require_caller(caller)?;
        tracing::debug!(caller = %caller.0, "scan_agents");
        self.manager.scan().await
    }

    /// Evaluate freshly measured signals for one agent.
    pub async fn check_agent(
        &self,
        caller: Option<&Caller>,
        agent_id: &AgentId,
        audit_score: Option<f64>,
        pass_rate: Option<f64>,
    ) -> CoreResult<CheckOutcome> {
        require_caller(caller)?;
        self.manager.check(agent_id, audit_score, pass_rate).await
    }

    /// Apply an approved improvement proposal.
    pub async fn apply_proposal(
        &self,
        caller: Option<&Caller>,
        proposal_id: &ProposalId,
    ) -> CoreResult<ApplyOutcome> {
        require_caller(caller)?;
        self.manager.apply(proposal_id).await
    }

    /// Approve or reject a pending proposal (the external review action).
    pub async fn review_proposal(
        &self,
        caller: Option<&Caller>,
        proposal_id: &ProposalId,
        approve: bool,
    ) -> CoreResult<ImprovementProposal> {
        require_caller(caller)?;
        if approve {
            self.manager.approve(proposal_id).await
        } else {
            self.manager.reject(proposal_id).await
        }
    }

    // ── Operator pass-throughs ───────────────────────────────────────

    pub async fn audit_agent(
        &self,
        caller: Option<&Caller>,
        agent_id: &AgentId,
    ) -> CoreResult<AuditReport> {
        require_caller(caller)?;
        self.auditor.audit(agent_id).await
    }

    pub async fn simulate_agent(
        &self,
        caller: Option<&Caller>,
        agent_id: &AgentId,
        scenarios: Option<Vec<Scenario>>,
    ) -> CoreResult<SimulationSummary> {
        require_caller(caller)?;
        self.simulator.simulate(agent_id, scenarios).await
    }

    pub async fn analyze(&self, caller: Option<&Caller>) -> CoreResult<AnalyzeOutcome> {
        require_caller(caller)?;
        self.learner.analyze().await
    }

    pub async fn suggest_for_agent(
        &self,
        caller: Option<&Caller>,
        agent_id: &AgentId,
    ) -> CoreResult<SuggestionSet> {
        require_caller(caller)?;
        self.learner.suggest(agent_id).await
    }

    pub async fn contribute_knowledge(
        &self,
        caller: Option<&Caller>,
        item: KnowledgeItem,
    ) -> CoreResult<KnowledgeId> {
        require_caller(caller)?;
        self.pool.contribute(item).await
    }

    pub async fn query_knowledge(
        &self,
        caller: Option<&Caller>,
        query: KnowledgeQuery,
    ) -> CoreResult<Vec<KnowledgeItem>> {
        require_caller(caller)?;
        self.pool.query(query).await
    }

    pub async fn validate_knowledge(
        &self,
        caller: Option<&Caller>,
        id: &KnowledgeId,
        validated: bool,
    ) -> CoreResult<()> {
        require_caller(caller)?;
        self.pool.validate(id, validated).await
    }

    pub async fn record_knowledge_application(
        &self,
        caller: Option<&Caller>,
        id: &KnowledgeId,
        success: bool,
    ) -> CoreResult<u8> {
        require_caller(caller)?;
        self.pool.record_application(id, success).await
    }

    pub async fn sync_knowledge(&self, caller: Option<&Caller>) -> CoreResult<SyncOutcome> {
        require_caller(caller)?;
        self.pool.sync().await
    }

    /// Dispatch a task request between two agents.
    #[allow(clippy::too_many_arguments)]
    pub async fn communicate(
        &self,
        caller: Option<&Caller>,
        from: &AgentId,
        to: &AgentId,
        task: &str,
        payload: Value,
        priority: MessagePriority,
        execute_action: bool,
        collaboration_id: Option<CollaborationId>,
    ) -> CoreResult<TaskOutcome> {
        require_caller(caller)?;
        self.dispatcher
            .dispatch(from, to, task, payload, priority, execute_action, collaboration_id)
            .await
    }
}
