//! Workflow templates: named, ordered step lists
//!
//! Templates are a configuration input. The built-in set covers the
//! three deployment workflows; a deployment may replace or extend it at
//! engine construction, keyed by workflow type name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The agent every built-in step is assigned to
const ARCHITECT: &str = "architect";

pub const AUDIT_PIPELINE: &str = "audit_pipeline";
pub const IMPROVEMENT_CYCLE: &str = "improvement_cycle";
pub const KNOWLEDGE_SYNC: &str = "knowledge_sync";

/// One step blueprint inside a template
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepTemplate {
    pub agent: String,
    pub action: String,
    pub description: String,
}

impl StepTemplate {
    pub fn new(
        agent: impl Into<String>,
        action: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            agent: agent.into(),
            action: action.into(),
            description: description.into(),
        }
    }
}

/// A named workflow blueprint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    /// Workflow type key callers pass to `run`
    pub workflow_type: String,
    /// Human-readable name stamped on collaborations
    pub name: String,
    pub steps: Vec<StepTemplate>,
}

impl WorkflowTemplate {
    pub fn new(workflow_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            workflow_type: workflow_type.into(),
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: StepTemplate) -> Self {
        self.steps.push(step);
        self
    }
}

/// The deployment's workflow templates, keyed by workflow type.
#[derive(Clone, Debug, Default)]
pub struct TemplateSet {
    templates: HashMap<String, WorkflowTemplate>,
}

impl TemplateSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in deployment set.
    pub fn builtin() -> Self {
        let mut set = Self::default();
        set.insert(
            WorkflowTemplate::new(AUDIT_PIPELINE, "Full Agent Audit Pipeline")
                .with_step(StepTemplate::new(
                    ARCHITECT,
                    "audit_config",
                    "Audit agent configuration",
                ))
                .with_step(StepTemplate::new(
                    ARCHITECT,
                    "simulate",
                    "Run interaction simulations",
                ))
                .with_step(StepTemplate::new(
                    ARCHITECT,
                    "analyze",
                    "Analyze results and learn",
                ))
                .with_step(StepTemplate::new(
                    ARCHITECT,
                    "suggest",
                    "Generate improvements",
                )),
        );
        set.insert(
            WorkflowTemplate::new(IMPROVEMENT_CYCLE, "Agent Improvement Cycle")
                .with_step(StepTemplate::new(ARCHITECT, "audit_config", "Initial audit"))
                .with_step(StepTemplate::new(
                    ARCHITECT,
                    "apply_improvements",
                    "Apply suggested changes",
                ))
                .with_step(StepTemplate::new(ARCHITECT, "simulate", "Test improvements"))
                .with_step(StepTemplate::new(
                    ARCHITECT,
                    "validate",
                    "Validate improvements",
                )),
        );
        set.insert(
            WorkflowTemplate::new(KNOWLEDGE_SYNC, "Knowledge Synchronization")
                .with_step(StepTemplate::new(
                    ARCHITECT,
                    "gather_learnings",
                    "Collect all learnings",
                ))
                .with_step(StepTemplate::new(
                    ARCHITECT,
                    "consolidate",
                    "Merge and deduplicate",
                ))
                .with_step(StepTemplate::new(
                    ARCHITECT,
                    "distribute",
                    "Share with all agents",
                )),
        );
        set
    }

    /// Add or replace a template under its workflow type key.
    pub fn insert(&mut self, template: WorkflowTemplate) {
        self.templates
            .insert(template.workflow_type.clone(), template);
    }

    pub fn get(&self, workflow_type: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(workflow_type)
    }

    pub fn workflow_types(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_has_the_three_workflows() {
        let set = TemplateSet::builtin();
        assert_eq!(set.get(AUDIT_PIPELINE).unwrap().steps.len(), 4);
        assert_eq!(set.get(IMPROVEMENT_CYCLE).unwrap().steps.len(), 4);
        assert_eq!(set.get(KNOWLEDGE_SYNC).unwrap().steps.len(), 3);
        assert!(set.get("nope").is_none());
    }

    #[test]
    fn insert_replaces_by_key() {
        let mut set = TemplateSet::builtin();
        set.insert(
            WorkflowTemplate::new(AUDIT_PIPELINE, "Short Audit").with_step(StepTemplate::new(
                "architect",
                "audit_config",
                "Audit only",
            )),
        );
        assert_eq!(set.get(AUDIT_PIPELINE).unwrap().steps.len(), 1);
    }
}
