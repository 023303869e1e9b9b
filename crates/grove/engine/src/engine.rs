//! The workflow engine: sequential step execution with persisted state

use crate::{HandlerRegistry, TemplateSet};
use grove_messaging::MessageLog;
use grove_store::{CollaborationStore, GroveStore};
use grove_types::{
    AgentId, Collaboration, CollaborationId, CoreError, CoreResult, MessageKind, MessagePriority,
    SharedContext, Step,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// The agent name stamped on workflow request messages
const ORCHESTRATOR: &str = "orchestrator";

/// One completed step's contribution to the outcome
#[derive(Clone, Debug, Serialize)]
pub struct StepRunResult {
    pub step: u32,
    pub action: String,
    pub result: Value,
}

/// What a finished workflow run returns to its caller
#[derive(Clone, Debug, Serialize)]
pub struct WorkflowOutcome {
    pub collaboration_id: CollaborationId,
    pub workflow_name: String,
    pub steps_completed: usize,
    pub results: Vec<StepRunResult>,
}

/// Executes named workflows as ordered step sequences.
pub struct WorkflowEngine {
    store: Arc<dyn GroveStore>,
    log: MessageLog,
    registry: Arc<HandlerRegistry>,
    templates: TemplateSet,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn GroveStore>,
        log: MessageLog,
        registry: Arc<HandlerRegistry>,
        templates: TemplateSet,
    ) -> Self {
        Self {
            store,
            log,
            registry,
            templates,
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Run a workflow against an optional target agent.
    ///
    /// Steps execute strictly in order; step N+1 never starts before
    /// step N's completion is persisted. A step failure aborts the rest
    /// (they stay pending), fails the run, and surfaces an error
    /// carrying the collaboration id, step number, and action.
    pub async fn run(
        &self,
        workflow_type: &str,
        target_agent: Option<&AgentId>,
        options: Value,
    ) -> CoreResult<WorkflowOutcome> {
        let template = self.templates.get(workflow_type).ok_or_else(|| {
            CoreError::InvalidArgument(format!("unknown workflow type: {workflow_type}"))
        })?;

        let steps: Vec<Step> = template
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| Step::pending(i as u32 + 1, &s.agent, &s.action, &s.description))
            .collect();
        let mut context =
            SharedContext::seeded(target_agent.map(|id| id.as_str()), options);

        let mut collaboration = Collaboration::new(
            workflow_type,
            &template.name,
            "architect",
            steps,
            context.clone(),
        );
        collaboration.start();
        self.store.create_collaboration(collaboration.clone()).await?;

        tracing::info!(
            collaboration_id = %collaboration.id,
            workflow = %template.name,
            steps = collaboration.steps.len(),
            "workflow run started"
        );

        let mut results = Vec::with_capacity(collaboration.steps.len());

        for index in 0..collaboration.steps.len() {
            collaboration.steps[index].start();
            collaboration.touch();
            self.store.update_collaboration(collaboration.clone()).await?;

            let step = collaboration.steps[index].clone();
            let (step_number, agent, action, description) = (
                step.step_number,
                step.agent.clone(),
                step.action.clone(),
                step.description.clone(),
            );

            let output = match self
                .execute_step(&collaboration.id, &step, &mut context)
                .await
            {
                Ok(output) => output,
                Err(err) => {
                    return self
                        .fail_step(collaboration, index, &action, context, err)
                        .await;
                }
            };

            collaboration.steps[index].complete(output.clone());
            collaboration.shared_context = context.clone();
            collaboration.touch();
            self.store.update_collaboration(collaboration.clone()).await?;

            let response = self
                .log
                .send(
                    &agent,
                    ORCHESTRATOR,
                    MessageKind::TaskResponse,
                    &format!("Completed: {description}"),
                    &format!("Step {step_number} completed successfully"),
                    output.clone(),
                    MessagePriority::Normal,
                    Some(collaboration.id.clone()),
                )
                .await?;
            self.log.mark_processed(&response.id).await?;

            results.push(StepRunResult {
                step: step_number,
                action,
                result: output,
            });
        }

        collaboration.complete(json!({
            "results": results,
            "sharedContext": context.as_value(),
        }));
        self.store.update_collaboration(collaboration.clone()).await?;

        tracing::info!(
            collaboration_id = %collaboration.id,
            steps_completed = results.len(),
            "workflow run completed"
        );

        Ok(WorkflowOutcome {
            collaboration_id: collaboration.id,
            workflow_name: collaboration.workflow_name,
            steps_completed: results.len(),
            results,
        })
    }

    /// Emit the request message and dispatch the step to its handler.
    /// Unrecognized actions are a no-op with empty output.
    async fn execute_step(
        &self,
        collaboration_id: &CollaborationId,
        step: &Step,
        context: &mut SharedContext,
    ) -> CoreResult<Value> {
        self.log
            .send(
                ORCHESTRATOR,
                &step.agent,
                MessageKind::TaskRequest,
                &step.description,
                &format!(
                    "Execute {} for agent {}",
                    step.action,
                    context.target_agent_id().unwrap_or("-")
                ),
                json!({ "action": step.action, "context": context.as_value() }),
                MessagePriority::High,
                Some(collaboration_id.clone()),
            )
            .await?;

        match self.registry.get(&step.action)? {
            Some(handler) => handler.execute(context, step).await,
            None => {
                tracing::debug!(action = %step.action, "no handler registered; step is a no-op");
                Ok(Value::Object(Map::new()))
            }
        }
    }

    /// Persist the failed step and the failed run, then surface the
    /// error with diagnosis context. Completed outputs stay intact.
    async fn fail_step(
        &self,
        mut collaboration: Collaboration,
        index: usize,
        action: &str,
        context: SharedContext,
        err: CoreError,
    ) -> CoreResult<WorkflowOutcome> {
        let step_number = collaboration.steps[index].step_number;
        collaboration.steps[index].fail();
        collaboration.shared_context = context;
        collaboration.fail();

        if let Err(persist_err) = self
            .store
            .update_collaboration(collaboration.clone())
            .await
        {
            tracing::warn!(
                collaboration_id = %collaboration.id,
                error = %persist_err,
                "failed to persist failed workflow state"
            );
        }

        tracing::warn!(
            collaboration_id = %collaboration.id,
            step = step_number,
            action,
            error = %err,
            "workflow step failed; aborting run"
        );

        Err(CoreError::StepFailed {
            collaboration_id: collaboration.id.to_string(),
            step_number,
            action: action.to_string(),
            source: Box::new(err),
        })
    }
}
