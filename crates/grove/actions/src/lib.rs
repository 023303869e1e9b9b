//! Action execution engine for Grove
//!
//! Actions are the side effects agents may trigger through messaging
//! (send an email, call a webhook, invoke a named function). The engine
//! has no decision-making authority: it runs whatever action it is
//! handed and records the outcome. Each action kind maps to a registered
//! handler; handlers adapt external connectors and never touch Grove
//! state themselves.
//!
//! Every execution is persisted twice: once as `Running` before the
//! handler fires, and once with the terminal status, so a crash mid-
//! execution still leaves a diagnosable record.

#![deny(unsafe_code)]

use async_trait::async_trait;
use grove_store::ActionStore;
use grove_types::{
    ActionDefinition, ActionExecution, ActionId, ActionKind, AgentId, CollaborationId, CoreError,
    CoreResult,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Errors produced by action handlers
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("connector error: {0}")]
    Connector(String),

    #[error("bad action input: {0}")]
    BadInput(String),
}

/// One registered side-effect executor.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(
        &self,
        action: &ActionDefinition,
        input: &Value,
    ) -> Result<Value, ActionError>;
}

// ── Connector capabilities ───────────────────────────────────────────

/// Outbound mail capability; transport lives with the deployment.
#[async_trait]
pub trait MailConnector: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ActionError>;
}

/// Outbound HTTP capability; the engine renders url/body templates, the
/// connector performs the request.
#[async_trait]
pub trait HttpConnector: Send + Sync {
    async fn request(
        &self,
        method: &str,
        url: &str,
        body: Option<&str>,
    ) -> Result<HttpReply, ActionError>;
}

#[derive(Clone, Debug)]
pub struct HttpReply {
    pub status: u16,
    pub body: Value,
}

/// Named-function invocation capability (the "custom_function" kind).
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, function_name: &str, input: &Value) -> Result<Value, ActionError>;
}

// ── Template rendering ───────────────────────────────────────────────

/// Replace `{{key}}` placeholders with values from the input object.
/// Non-string values render as compact JSON.
pub fn render_template(template: &str, input: &Value) -> String {
    let mut rendered = template.to_string();
    if let Some(object) = input.as_object() {
        for (key, value) in object {
            let placeholder = format!("{{{{{key}}}}}");
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rendered = rendered.replace(&placeholder, &replacement);
        }
    }
    rendered
}

// ── Built-in handlers ────────────────────────────────────────────────

/// send_email: `{to, subject, body}` input through the mail connector
pub struct SendEmailHandler {
    connector: Arc<dyn MailConnector>,
}

impl SendEmailHandler {
    pub fn new(connector: Arc<dyn MailConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl ActionHandler for SendEmailHandler {
    async fn execute(
        &self,
        _action: &ActionDefinition,
        input: &Value,
    ) -> Result<Value, ActionError> {
        let to = input
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::BadInput("send_email requires 'to'".to_string()))?;
        let subject = input.get("subject").and_then(Value::as_str).unwrap_or("");
        let body = input.get("body").and_then(Value::as_str).unwrap_or("");
        self.connector.send(to, subject, body).await?;
        Ok(serde_json::json!({ "sent": true, "to": to }))
    }
}

/// http_request: url/body templates from the action config, placeholders
/// filled from input data
pub struct HttpRequestHandler {
    connector: Arc<dyn HttpConnector>,
}

impl HttpRequestHandler {
    pub fn new(connector: Arc<dyn HttpConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl ActionHandler for HttpRequestHandler {
    async fn execute(
        &self,
        action: &ActionDefinition,
        input: &Value,
    ) -> Result<Value, ActionError> {
        let config = &action.config;
        let url_template = config.get("url").and_then(Value::as_str).unwrap_or("");
        let method = config
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();
        let body_template = config
            .get("body_template")
            .and_then(Value::as_str)
            .unwrap_or("");

        let url = render_template(url_template, input);
        let body = render_template(body_template, input);
        let body = match method.as_str() {
            "POST" | "PUT" | "PATCH" if !body.is_empty() => Some(body),
            _ => None,
        };

        let reply = self
            .connector
            .request(&method, &url, body.as_deref())
            .await?;
        if reply.status >= 400 {
            return Err(ActionError::Connector(format!("HTTP {}", reply.status)));
        }
        Ok(serde_json::json!({ "status": reply.status, "data": reply.body }))
    }
}

/// custom_function: delegates to the invoker by configured function name
pub struct CustomFunctionHandler {
    invoker: Arc<dyn FunctionInvoker>,
}

impl CustomFunctionHandler {
    pub fn new(invoker: Arc<dyn FunctionInvoker>) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl ActionHandler for CustomFunctionHandler {
    async fn execute(
        &self,
        action: &ActionDefinition,
        input: &Value,
    ) -> Result<Value, ActionError> {
        let function_name = action
            .config
            .get("function_name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ActionError::BadInput("custom_function requires config.function_name".to_string())
            })?;
        self.invoker.invoke(function_name, input).await
    }
}

// ── Engine ───────────────────────────────────────────────────────────

/// The action execution engine: a registry of handlers keyed by kind.
pub struct ActionEngine {
    store: Arc<dyn ActionStore>,
    handlers: RwLock<HashMap<ActionKind, Arc<dyn ActionHandler>>>,
}

impl ActionEngine {
    pub fn new(store: Arc<dyn ActionStore>) -> Self {
        Self {
            store,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the handler for an action kind.
    pub fn register(&self, kind: ActionKind, handler: Arc<dyn ActionHandler>) -> CoreResult<()> {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| CoreError::upstream("action handler registry lock poisoned"))?;
        handlers.insert(kind, handler);
        Ok(())
    }

    fn handler_for(&self, kind: ActionKind) -> CoreResult<Option<Arc<dyn ActionHandler>>> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| CoreError::upstream("action handler registry lock poisoned"))?;
        Ok(handlers.get(&kind).cloned())
    }

    /// Execute a registered action and persist the outcome.
    ///
    /// The terminal execution record is returned even when the handler
    /// fails; callers inspect `status`/`error` rather than a Result so
    /// the failure is never lost with the record.
    pub async fn execute(
        &self,
        action_id: &ActionId,
        input: Value,
        agent_id: Option<AgentId>,
        collaboration_id: Option<CollaborationId>,
    ) -> CoreResult<ActionExecution> {
        let action = self
            .store
            .get_action(action_id)
            .await?
            .ok_or_else(|| CoreError::not_found("action", action_id.to_string()))?;

        let mut execution = ActionExecution::running(&action, input.clone());
        if let Some(agent_id) = agent_id {
            execution = execution.with_agent(agent_id);
        }
        if let Some(collaboration_id) = collaboration_id {
            execution = execution.with_collaboration(collaboration_id);
        }
        self.store.create_execution(execution.clone()).await?;

        let started = Instant::now();
        match self.handler_for(action.action_type)? {
            Some(handler) => match handler.execute(&action, &input).await {
                Ok(output) => {
                    execution.succeed(output, started.elapsed().as_millis() as u64);
                    tracing::info!(
                        action = %action.name,
                        execution_id = %execution.id,
                        "action executed"
                    );
                }
                Err(err) => {
                    execution.fail(err.to_string(), started.elapsed().as_millis() as u64);
                    tracing::warn!(
                        action = %action.name,
                        execution_id = %execution.id,
                        error = %err,
                        "action failed"
                    );
                }
            },
            None => {
                execution.fail(
                    format!("no handler registered for {:?}", action.action_type),
                    started.elapsed().as_millis() as u64,
                );
                tracing::warn!(action = %action.name, "no handler for action kind");
            }
        }

        self.store.update_execution(execution.clone()).await?;
        Ok(execution)
    }
}
