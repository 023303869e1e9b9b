//! Action definitions and their execution records
//!
//! Actions are side-effecting operations agents may trigger through
//! messaging (send an email, call a webhook). The workflow core never
//! executes them directly.

use crate::{ActionId, AgentId, CollaborationId, ExecutionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendEmail,
    HttpRequest,
    CustomFunction,
    SlackMessage,
    CalendarEvent,
    DatabaseQuery,
}

/// A registered action an agent may trigger
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: ActionId,
    pub name: String,
    pub description: String,
    pub action_type: ActionKind,
    /// Kind-specific configuration (e.g. url/method/body template for
    /// HTTP requests)
    pub config: Value,
    pub estimated_cost_cents: u32,
    pub created_at: DateTime<Utc>,
}

impl ActionDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        action_type: ActionKind,
    ) -> Self {
        Self {
            id: ActionId::generate(),
            name: name.into(),
            description: description.into(),
            action_type,
            config: Value::Object(Map::new()),
            estimated_cost_cents: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_estimated_cost(mut self, cents: u32) -> Self {
        self.estimated_cost_cents = cents;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

/// One execution of an action, persisted before and after the handler runs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionExecution {
    pub id: ExecutionId,
    pub action_id: ActionId,
    pub action_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaboration_id: Option<CollaborationId>,
    pub status: ExecutionStatus,
    pub input: Value,
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub cost_cents: u32,
    pub created_at: DateTime<Utc>,
}

impl ActionExecution {
    pub fn running(action: &ActionDefinition, input: Value) -> Self {
        Self {
            id: ExecutionId::generate(),
            action_id: action.id.clone(),
            action_name: action.name.clone(),
            agent_id: None,
            collaboration_id: None,
            status: ExecutionStatus::Running,
            input,
            output: Value::Object(Map::new()),
            error: None,
            execution_time_ms: 0,
            cost_cents: action.estimated_cost_cents,
            created_at: Utc::now(),
        }
    }

    pub fn with_agent(mut self, agent_id: AgentId) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_collaboration(mut self, id: CollaborationId) -> Self {
        self.collaboration_id = Some(id);
        self
    }

    pub fn succeed(&mut self, output: Value, elapsed_ms: u64) {
        self.status = ExecutionStatus::Success;
        self.output = output;
        self.execution_time_ms = elapsed_ms;
    }

    pub fn fail(&mut self, error: impl Into<String>, elapsed_ms: u64) {
        self.status = ExecutionStatus::Failed;
        self.error = Some(error.into());
        self.execution_time_ms = elapsed_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn execution_lifecycle() {
        let action = ActionDefinition::new("notify", "send a note", ActionKind::SendEmail)
            .with_estimated_cost(2);
        let mut exec = ActionExecution::running(&action, json!({"to": "ops"}));
        assert_eq!(exec.status, ExecutionStatus::Running);
        assert_eq!(exec.cost_cents, 2);

        exec.succeed(json!({"sent": true}), 12);
        assert_eq!(exec.status, ExecutionStatus::Success);
        assert_eq!(exec.execution_time_ms, 12);
        assert!(exec.error.is_none());
    }

    #[test]
    fn failed_execution_records_error() {
        let action = ActionDefinition::new("hook", "call webhook", ActionKind::HttpRequest);
        let mut exec = ActionExecution::running(&action, json!({}));
        exec.fail("HTTP 503", 40);
        assert_eq!(exec.status, ExecutionStatus::Failed);
        assert_eq!(exec.error.as_deref(), Some("HTTP 503"));
    }
}
