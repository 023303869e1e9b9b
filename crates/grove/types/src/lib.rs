//! Domain types for Grove
//!
//! Grove coordinates a population of AI agents through configuration
//! audits, simulated interactions, shared knowledge, and self-driven
//! improvement cycles. This crate holds the records every other Grove
//! crate operates on.
//!
//! # Key Concepts
//!
//! - **Agent**: a named, independently configured AI persona with
//!   abilities and instructions.
//! - **Collaboration**: one execution instance of a named workflow, with
//!   ordered steps and a shared context threaded between them.
//! - **ImprovementProposal**: a recommended set of field-level agent
//!   configuration changes, gated by a review/approval state machine.
//! - **KnowledgeItem** / **Learning**: the shared knowledge pool and the
//!   architect's extracted learnings that feed it.
//! - **Message**: the append-only inter-agent traceability log.
//!
//! # Design Principles
//!
//! 1. Records are plain serde data; lifecycle mutators stamp timestamps
//!    but enforce no policy. State-machine guards live in the services.
//! 2. Free-form payloads (step input/output, message payloads, model
//!    output) are `serde_json::Value`; everything else is typed.
//! 3. One error taxonomy (`CoreError`) crosses every service boundary.

#![deny(unsafe_code)]

mod action;
mod agent;
mod collaboration;
mod config;
mod error;
mod ids;
mod knowledge;
mod message;
mod proposal;
mod report;

pub use action::*;
pub use agent::*;
pub use collaboration::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use knowledge::*;
pub use message::*;
pub use proposal::*;
pub use report::*;
