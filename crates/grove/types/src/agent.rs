//! Agent records: named, independently configured AI personas

use crate::{ActionId, AgentId, CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured AI persona managed by Grove
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    /// Capability flags (e.g. "web_search") consulted at dispatch time
    #[serde(default)]
    pub abilities: Vec<String>,
    /// Actions this agent is allowed to trigger
    #[serde(default)]
    pub assigned_actions: Vec<ActionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::generate(),
            name: name.into(),
            description: description.into(),
            personality: None,
            custom_instructions: None,
            abilities: Vec::new(),
            assigned_actions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = Some(personality.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.custom_instructions = Some(instructions.into());
        self
    }

    pub fn with_ability(mut self, ability: impl Into<String>) -> Self {
        self.abilities.push(ability.into());
        self
    }

    pub fn with_assigned_action(mut self, action: ActionId) -> Self {
        self.assigned_actions.push(action);
        self
    }

    pub fn has_ability(&self, ability: &str) -> bool {
        self.abilities.iter().any(|a| a == ability)
    }

    /// Apply a configuration field by its wire name.
    ///
    /// Improvement proposals carry field-level suggestions keyed by these
    /// names; anything else is rejected rather than silently dropped.
    pub fn apply_field(&mut self, field: &str, value: &str) -> CoreResult<()> {
        match field {
            "name" => self.name = value.to_string(),
            "description" => self.description = value.to_string(),
            "personality" => self.personality = Some(value.to_string()),
            "custom_instructions" => self.custom_instructions = Some(value.to_string()),
            other => {
                return Err(CoreError::InvalidArgument(format!(
                    "unknown agent configuration field: {other}"
                )))
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}
