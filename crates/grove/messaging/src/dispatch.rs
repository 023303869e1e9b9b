//! Task-request dispatch: executing the tasks messages ask for

use crate::{ActionMatcher, MessageLog};
use grove_actions::ActionEngine;
use grove_architect::{Auditor, Learner, Simulator};
use grove_model::GenerativeModel;
use grove_store::{ActionStore, AgentStore, GroveStore, KnowledgeStore};
use grove_types::{
    Agent, AgentId, CollaborationId, CoreError, CoreResult, ExecutionStatus, MessageId,
    MessageKind, MessagePriority,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// What a dispatched task produced
#[derive(Clone, Debug)]
pub struct TaskOutcome {
    pub request_message_id: MessageId,
    pub response_message_id: MessageId,
    pub result: Value,
    /// Present when the matcher selected and ran an assigned action
    pub action_executed: Option<Value>,
}

fn generic_task_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "result": { "type": "object" },
            "message": { "type": "string" }
        }
    })
}

/// Executes `task_request` messages between agents.
///
/// Architect-bound tasks route to the matching architect service by a
/// keyword table; everything else is a generic model invocation with
/// validated shared knowledge as context. Both paths log the request and
/// response and mark the request processed.
pub struct TaskDispatcher {
    store: Arc<dyn GroveStore>,
    model: Arc<dyn GenerativeModel>,
    auditor: Arc<Auditor>,
    simulator: Arc<Simulator>,
    learner: Arc<Learner>,
    log: MessageLog,
    matcher: Arc<dyn ActionMatcher>,
    engine: Option<Arc<ActionEngine>>,
}

impl TaskDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn GroveStore>,
        model: Arc<dyn GenerativeModel>,
        auditor: Arc<Auditor>,
        simulator: Arc<Simulator>,
        learner: Arc<Learner>,
        log: MessageLog,
        matcher: Arc<dyn ActionMatcher>,
        engine: Option<Arc<ActionEngine>>,
    ) -> Self {
        Self {
            store,
            model,
            auditor,
            simulator,
            learner,
            log,
            matcher,
            engine,
        }
    }

    /// Dispatch a task from one agent to another.
    pub async fn dispatch(
        &self,
        from_id: &AgentId,
        to_id: &AgentId,
        task: &str,
        payload: Value,
        priority: MessagePriority,
        execute_action: bool,
        collaboration_id: Option<CollaborationId>,
    ) -> CoreResult<TaskOutcome> {
        if task.trim().is_empty() {
            return Err(CoreError::InvalidArgument("task must not be empty".into()));
        }
        let from = self.agent(from_id).await?;
        let to = self.agent(to_id).await?;

        let request = self
            .log
            .send(
                &from.name,
                &to.name,
                MessageKind::TaskRequest,
                task,
                &format!("Task request from {} to {}: {task}", from.name, to.name),
                payload.clone(),
                priority,
                collaboration_id.clone(),
            )
            .await?;

        let result = if to.name == grove_architect::ARCHITECT || to.name == "auditor" {
            self.route_architect_task(task, &payload).await?
        } else {
            self.generic_task(&from, &to, task, &payload).await?
        };

        let action_executed = if execute_action {
            self.run_matched_action(&to, task, &payload, collaboration_id.clone())
                .await?
        } else {
            None
        };

        self.log.mark_processed(&request.id).await?;

        let response_payload = json!({
            "original_request": task,
            "result": result,
            "action_executed": action_executed,
        });
        let response = self
            .log
            .send(
                &to.name,
                &from.name,
                MessageKind::TaskResponse,
                &format!("Re: {task}"),
                &format!("Task completed by {}", to.name),
                response_payload,
                priority,
                collaboration_id,
            )
            .await?;

        Ok(TaskOutcome {
            request_message_id: request.id,
            response_message_id: response.id,
            result,
            action_executed,
        })
    }

    async fn agent(&self, id: &AgentId) -> CoreResult<Agent> {
        self.store
            .get_agent(id)
            .await?
            .ok_or_else(|| CoreError::not_found("agent", id.to_string()))
    }

    fn payload_agent_id(payload: &Value) -> Option<AgentId> {
        payload
            .get("agentId")
            .and_then(Value::as_str)
            .map(AgentId::new)
    }

    /// Keyword route table for tasks aimed at the architect. Tasks that
    /// name no known route (or lack a target agent) are a no-op.
    async fn route_architect_task(&self, task: &str, payload: &Value) -> CoreResult<Value> {
        let task_lower = task.to_lowercase();
        let agent_id = Self::payload_agent_id(payload);

        if task_lower.contains("audit") {
            if let Some(agent_id) = agent_id {
                let report = self.auditor.audit(&agent_id).await?;
                return serde_json::to_value(report).map_err(|e| CoreError::upstream(e.to_string()));
            }
        } else if task_lower.contains("simulate") {
            if let Some(agent_id) = agent_id {
                let summary = self.simulator.simulate(&agent_id, None).await?;
                return serde_json::to_value(summary)
                    .map_err(|e| CoreError::upstream(e.to_string()));
            }
        } else if task_lower.contains("learn") || task_lower.contains("analyze") {
            let outcome = self.learner.analyze().await?;
            return serde_json::to_value(outcome).map_err(|e| CoreError::upstream(e.to_string()));
        } else if task_lower.contains("suggest") || task_lower.contains("improve") {
            if let Some(agent_id) = agent_id {
                let set = self.learner.suggest(&agent_id).await?;
                return serde_json::to_value(set).map_err(|e| CoreError::upstream(e.to_string()));
            }
        }

        tracing::debug!(task, "architect task had no route; returning empty result");
        Ok(json!({}))
    }

    /// Generic execution: the target agent "performs" the task through
    /// the model, with validated shared knowledge as context.
    async fn generic_task(
        &self,
        from: &Agent,
        to: &Agent,
        task: &str,
        payload: &Value,
    ) -> CoreResult<Value> {
        let knowledge = self.store.validated_knowledge().await?;
        let knowledge_context: Vec<String> = knowledge
            .iter()
            .take(10)
            .map(|k| format!("[{:?}] {}: {}", k.knowledge_type, k.title, k.content))
            .collect();

        let prompt = format!(
            "You are agent \"{}\". Execute this task from \"{}\":\n\n\
             TASK: {task}\n\n\
             PAYLOAD: {payload}\n\n\
             SHARED KNOWLEDGE:\n{}\n\n\
             Execute the task and return a structured response.",
            to.name,
            from.name,
            knowledge_context.join("\n"),
        );

        let reply = self
            .model
            .invoke(grove_model::ModelRequest::structured(
                prompt,
                generic_task_schema(),
            ))
            .await
            .map_err(|e| CoreError::upstream(e.to_string()))?;
        reply
            .into_structured()
            .ok_or_else(|| CoreError::upstream("generic task reply was not structured"))
    }

    /// Run the assigned action the matcher deems relevant, if any.
    async fn run_matched_action(
        &self,
        to: &Agent,
        task: &str,
        payload: &Value,
        collaboration_id: Option<CollaborationId>,
    ) -> CoreResult<Option<Value>> {
        let engine = match (&self.engine, to.assigned_actions.is_empty()) {
            (Some(engine), false) => engine,
            _ => return Ok(None),
        };

        let all_actions = self.store.list_actions().await?;
        let assigned: Vec<_> = all_actions
            .into_iter()
            .filter(|a| to.assigned_actions.contains(&a.id))
            .collect();

        let Some(index) = self.matcher.select(task, &assigned) else {
            return Ok(None);
        };
        let action = &assigned[index];

        let input = payload
            .get("actionInput")
            .cloned()
            .unwrap_or_else(|| json!({ "request": task }));
        let execution = engine
            .execute(&action.id, input, Some(to.id.clone()), collaboration_id)
            .await?;

        Ok(Some(json!({
            "action_name": execution.action_name,
            "status": if execution.status == ExecutionStatus::Success { "success" } else { "failed" },
            "result": execution.output,
            "error": execution.error,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeywordMatcher;
    use grove_architect::NoopSignalHook;
    use grove_model::ScriptedModel;
    use grove_store::{MemoryStore, MessageStore};
    use grove_types::{GroveConfig, MessageStatus};

    struct Fixture {
        store: Arc<MemoryStore>,
        model: Arc<ScriptedModel>,
        dispatcher: TaskDispatcher,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let model = Arc::new(ScriptedModel::new());
        let hook = Arc::new(NoopSignalHook);
        let config = GroveConfig::default();

        let auditor = Arc::new(Auditor::new(
            store.clone(),
            model.clone(),
            hook.clone(),
            config.clone(),
        ));
        let simulator = Arc::new(Simulator::new(
            store.clone(),
            model.clone(),
            hook,
            config,
        ));
        let learner = Arc::new(Learner::new(store.clone(), model.clone()));
        let log = MessageLog::new(store.clone());
        let engine = Some(Arc::new(ActionEngine::new(store.clone())));

        let dispatcher = TaskDispatcher::new(
            store.clone(),
            model.clone(),
            auditor,
            simulator,
            learner,
            log,
            Arc::new(KeywordMatcher),
            engine,
        );
        Fixture {
            store,
            model,
            dispatcher,
        }
    }

    async fn seed_agent(store: &MemoryStore, name: &str) -> AgentId {
        let agent = Agent::new(name, format!("{name} does things"));
        let id = agent.id.clone();
        store.create_agent(agent).await.unwrap();
        id
    }

    #[tokio::test]
    async fn architect_audit_task_routes_to_auditor() {
        let f = fixture();
        let from = seed_agent(&f.store, "ops").await;
        let architect = seed_agent(&f.store, "architect").await;
        let target = seed_agent(&f.store, "scout").await;

        f.model.push_structured(json!({"score": 88.0, "summary": "fine"}));

        let outcome = f
            .dispatcher
            .dispatch(
                &from,
                &architect,
                "audit the scout agent",
                json!({"agentId": target.as_str()}),
                MessagePriority::Normal,
                false,
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.result["score"], json!(88.0));
        assert!(outcome.action_executed.is_none());

        // Request was marked processed; response message recorded.
        let request = f
            .store
            .get_message(&outcome.request_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, MessageStatus::Processed);
        let response = f
            .store
            .get_message(&outcome.response_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.message_type, MessageKind::TaskResponse);
    }

    #[tokio::test]
    async fn unrouted_architect_task_is_a_noop() {
        let f = fixture();
        let from = seed_agent(&f.store, "ops").await;
        let architect = seed_agent(&f.store, "architect").await;

        let outcome = f
            .dispatcher
            .dispatch(
                &from,
                &architect,
                "make coffee",
                json!({}),
                MessagePriority::Normal,
                false,
                None,
            )
            .await
            .unwrap();
        assert_eq!(outcome.result, json!({}));
    }

    #[tokio::test]
    async fn generic_task_invokes_model_with_knowledge_context() {
        let f = fixture();
        let from = seed_agent(&f.store, "ops").await;
        let worker = seed_agent(&f.store, "worker").await;

        f.model
            .push_structured(json!({"success": true, "result": {}, "message": "done"}));

        let outcome = f
            .dispatcher
            .dispatch(
                &from,
                &worker,
                "summarize the incident",
                json!({}),
                MessagePriority::Normal,
                false,
                None,
            )
            .await
            .unwrap();
        assert_eq!(outcome.result["success"], json!(true));

        let requests = f.model.requests();
        assert!(requests[0].prompt.contains("You are agent \"worker\""));
    }

    #[tokio::test]
    async fn unknown_recipient_is_not_found() {
        let f = fixture();
        let from = seed_agent(&f.store, "ops").await;
        let err = f
            .dispatcher
            .dispatch(
                &from,
                &AgentId::new("missing"),
                "do something",
                json!({}),
                MessagePriority::Normal,
                false,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
