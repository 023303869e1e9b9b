//! Inter-agent messaging for Grove
//!
//! Messages are a traceability log, not a transport: the [`MessageLog`]
//! persists request/response pairs and nothing retries or guarantees
//! delivery beyond that persistence. The [`TaskDispatcher`] sits on top
//! and executes `task_request` messages — architect-bound tasks route to
//! the matching architect service, anything else falls back to a generic
//! model invocation carrying validated shared knowledge as context.

#![deny(unsafe_code)]

mod dispatch;
mod log;
mod matcher;

pub use dispatch::{TaskDispatcher, TaskOutcome};
pub use log::MessageLog;
pub use matcher::{ActionMatcher, KeywordMatcher};
