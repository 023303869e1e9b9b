//! Grove runtime: the assembled coordination surface
//!
//! This crate wires the capability implementations (entity store,
//! generative model) together with the architect services, the proposal
//! manager, the message log, and the workflow engine, and exposes the
//! operations callers actually invoke:
//!
//! - [`Grove::run_workflow`] — execute a named workflow
//! - [`Grove::scan_agents`] — population-wide threshold scan
//! - [`Grove::check_agent`] — evaluate freshly measured signals
//! - [`Grove::apply_proposal`] — apply an approved proposal
//!
//! plus the operator pass-throughs (audit, simulate, knowledge,
//! communicate, review). Every operation requires a present caller
//! identity; identity itself is an external concern.

#![deny(unsafe_code)]

mod facade;
mod handlers;

pub use facade::{Caller, Grove, GroveBuilder};
pub use handlers::register_default_handlers;

pub use grove_architect::{
    AnalyzeOutcome, KnowledgeQuery, Scenario, SimulationSummary, SuggestionSet, SyncOutcome,
};
pub use grove_engine::{WorkflowOutcome, AUDIT_PIPELINE, IMPROVEMENT_CYCLE, KNOWLEDGE_SYNC};
pub use grove_proposals::{ApplyOutcome, CheckOutcome, ScanOutcome};
