//! Inter-agent messages: an append-only traceability log, not a transport

use crate::{CollaborationId, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    TaskRequest,
    TaskResponse,
    KnowledgeShare,
    StatusUpdate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Sent → Processed is the only permitted mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sent,
    Processed,
}

/// One recorded request/response/notification between agents
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from_agent: String,
    pub to_agent: String,
    pub message_type: MessageKind,
    pub subject: String,
    pub content: String,
    pub payload: Value,
    pub priority: MessagePriority,
    pub status: MessageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaboration_id: Option<CollaborationId>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn sent(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        message_type: MessageKind,
        subject: impl Into<String>,
        content: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            from_agent: from_agent.into(),
            to_agent: to_agent.into(),
            message_type,
            subject: subject.into(),
            content: content.into(),
            payload,
            priority: MessagePriority::Normal,
            status: MessageStatus::Sent,
            collaboration_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_collaboration(mut self, id: CollaborationId) -> Self {
        self.collaboration_id = Some(id);
        self
    }

    pub fn mark_processed(&mut self) {
        self.status = MessageStatus::Processed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_messages_start_sent() {
        let msg = Message::sent(
            "orchestrator",
            "architect",
            MessageKind::TaskRequest,
            "Audit agent configuration",
            "Execute audit_config for agent a1",
            json!({"action": "audit_config"}),
        );
        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.priority, MessagePriority::Normal);
    }

    #[test]
    fn mark_processed_is_the_only_transition() {
        let mut msg = Message::sent(
            "a",
            "b",
            MessageKind::TaskResponse,
            "Re: audit",
            "done",
            json!({}),
        );
        msg.mark_processed();
        assert_eq!(msg.status, MessageStatus::Processed);
    }
}
