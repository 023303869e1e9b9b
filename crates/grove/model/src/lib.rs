//! Generative-model capability interface for Grove
//!
//! Grove delegates every natural-language judgement (auditing a
//! configuration, evaluating a simulated reply, consolidating learnings,
//! ranking knowledge) to an implementation of [`GenerativeModel`]. The
//! core never inspects prompts or implements scoring itself.
//!
//! When a request carries a response schema, the adapter must return a
//! structured reply whose shape matches the schema's declared properties;
//! the core trusts that contract and does not re-validate.

#![deny(unsafe_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One invocation of the generative capability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// JSON schema for a structured reply; `None` requests free text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

impl ModelRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            response_schema: None,
        }
    }

    pub fn structured(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            response_schema: Some(schema),
        }
    }

    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }
}

/// The model's reply: free text, or an object matching the request schema.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ModelReply {
    Text(String),
    Structured(Value),
}

impl ModelReply {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ModelReply::Text(text) => Some(text),
            ModelReply::Structured(_) => None,
        }
    }

    pub fn into_structured(self) -> Option<Value> {
        match self {
            ModelReply::Structured(value) => Some(value),
            ModelReply::Text(_) => None,
        }
    }
}

/// Errors surfaced by model adapters
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model transport error: {0}")]
    Transport(String),

    /// The provider returned something the adapter could not shape
    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("model provider error: {0}")]
    Provider(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// The generative capability Grove consumes.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn invoke(&self, request: ModelRequest) -> ModelResult<ModelReply>;
}

// ── Scripted adapter ─────────────────────────────────────────────────

/// Deterministic adapter for tests: replays a queue of canned replies
/// and records every prompt it receives.
///
/// When the queue runs dry it echoes the prompt as a text reply, so
/// free-text invocations never need scripting.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ModelReply>>,
    prompts: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: impl Into<String>) -> &Self {
        self.replies
            .lock()
            .expect("scripted replies lock")
            .push_back(ModelReply::Text(text.into()));
        self
    }

    pub fn push_structured(&self, value: Value) -> &Self {
        self.replies
            .lock()
            .expect("scripted replies lock")
            .push_back(ModelReply::Structured(value));
        self
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.prompts.lock().expect("scripted prompts lock").clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn invoke(&self, request: ModelRequest) -> ModelResult<ModelReply> {
        self.prompts
            .lock()
            .map_err(|_| ModelError::Transport("scripted prompts lock poisoned".to_string()))?
            .push(request.clone());

        let scripted = self
            .replies
            .lock()
            .map_err(|_| ModelError::Transport("scripted replies lock poisoned".to_string()))?
            .pop_front();

        match scripted {
            Some(reply) => {
                if request.response_schema.is_some()
                    && matches!(reply, ModelReply::Text(_))
                {
                    return Err(ModelError::InvalidResponse(
                        "structured reply required but a text reply was scripted".to_string(),
                    ));
                }
                Ok(reply)
            }
            None => {
                tracing::debug!(prompt_len = request.prompt.len(), "scripted model echo");
                Ok(ModelReply::Text(format!("echo: {}", request.prompt)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_replies_replay_in_order() {
        let model = ScriptedModel::new();
        model.push_structured(json!({"score": 60}));
        model.push_text("fine");

        let first = model
            .invoke(ModelRequest::structured("audit", json!({})))
            .await
            .unwrap();
        assert_eq!(first.into_structured(), Some(json!({"score": 60})));

        let second = model.invoke(ModelRequest::text("chat")).await.unwrap();
        assert_eq!(second.as_text(), Some("fine"));
    }

    #[tokio::test]
    async fn dry_queue_echoes_text() {
        let model = ScriptedModel::new();
        let reply = model.invoke(ModelRequest::text("hello")).await.unwrap();
        assert_eq!(reply.as_text(), Some("echo: hello"));
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn text_reply_against_schema_is_invalid() {
        let model = ScriptedModel::new();
        model.push_text("not structured");
        let err = model
            .invoke(ModelRequest::structured("audit", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
