//! The append-only inter-agent message log

use grove_store::MessageStore;
use grove_types::{
    CollaborationId, CoreResult, Message, MessageId, MessageKind, MessagePriority,
};
use serde_json::Value;
use std::sync::Arc;

/// Persists inter-agent messages. Pure create plus the single
/// Sent → Processed transition; no retries, no delivery guarantee.
#[derive(Clone)]
pub struct MessageLog {
    store: Arc<dyn MessageStore>,
}

impl MessageLog {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn send(
        &self,
        from: &str,
        to: &str,
        kind: MessageKind,
        subject: &str,
        content: &str,
        payload: Value,
        priority: MessagePriority,
        collaboration_id: Option<CollaborationId>,
    ) -> CoreResult<Message> {
        let mut message =
            Message::sent(from, to, kind, subject, content, payload).with_priority(priority);
        if let Some(id) = collaboration_id {
            message = message.with_collaboration(id);
        }
        self.store.create_message(message.clone()).await?;
        tracing::debug!(
            message_id = %message.id,
            from,
            to,
            kind = ?message.message_type,
            "message recorded"
        );
        Ok(message)
    }

    pub async fn mark_processed(&self, id: &MessageId) -> CoreResult<()> {
        self.store.mark_message_processed(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_store::MemoryStore;
    use grove_types::MessageStatus;
    use serde_json::json;

    #[tokio::test]
    async fn send_then_mark_processed() {
        let store = Arc::new(MemoryStore::new());
        let log = MessageLog::new(store.clone());

        let message = log
            .send(
                "orchestrator",
                "architect",
                MessageKind::TaskRequest,
                "Audit agent configuration",
                "Execute audit_config for agent a1",
                json!({"action": "audit_config"}),
                MessagePriority::High,
                Some(CollaborationId::new("c1")),
            )
            .await
            .unwrap();

        assert_eq!(message.status, MessageStatus::Sent);
        log.mark_processed(&message.id).await.unwrap();

        let stored = store.get_message(&message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Processed);
        assert_eq!(stored.collaboration_id, Some(CollaborationId::new("c1")));
    }
}
