//! Workflow engine for Grove
//!
//! A workflow is a named, ordered list of step templates. Running one
//! creates a [`grove_types::Collaboration`], then executes the steps
//! strictly in order against a single mutable shared context — later
//! steps read fields earlier steps wrote, so nothing here parallelizes
//! within a run. Distinct runs are fully independent.
//!
//! The engine never knows what a step *does*: it resolves the step's
//! action name against the [`HandlerRegistry`] and lets the handler read
//! and write the context. Unknown actions are a permissive no-op, so new
//! workflow shapes can ship templates before every handler exists.
//!
//! Failure semantics: a failing handler marks its step failed, aborts
//! the remaining steps (they stay pending), and fails the run — with
//! every completed step's output preserved and persisted.

#![deny(unsafe_code)]

mod engine;
mod registry;
mod templates;

pub use engine::{StepRunResult, WorkflowEngine, WorkflowOutcome};
pub use registry::{HandlerRegistry, StepHandler};
pub use templates::{
    StepTemplate, TemplateSet, WorkflowTemplate, AUDIT_PIPELINE, IMPROVEMENT_CYCLE, KNOWLEDGE_SYNC,
};
