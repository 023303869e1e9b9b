//! Threshold monitor: decides when a quality signal warrants remediation
//!
//! Pure decision logic with no I/O and no side effects, exposed
//! standalone so the boundary cases can be tested exhaustively. The
//! proposal manager calls [`evaluate`] for every signal it sees; only a
//! triggered decision spawns an improvement proposal.

#![deny(unsafe_code)]

use grove_types::ProposalPriority;
use serde::{Deserialize, Serialize};

/// A quality signal kind. Both are higher-is-better on a 0–100 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    AuditScore,
    PassRate,
}

/// The outcome of evaluating one signal against its threshold
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub triggered: bool,
    pub priority: ProposalPriority,
    pub gap: f64,
}

/// Evaluate a signal: triggered iff `value < threshold`.
///
/// Priority scales with the gap below threshold; equality at a bucket
/// edge falls to the lower-priority bucket (a gap of exactly 30 is High,
/// not Critical).
pub fn evaluate(kind: SignalKind, value: f64, threshold: f64) -> Decision {
    let gap = threshold - value;
    let _ = kind; // both signal kinds share the higher-is-better ordering
    Decision {
        triggered: value < threshold,
        priority: priority_for_gap(gap),
        gap,
    }
}

/// Map a gap below threshold to a remediation priority.
pub fn priority_for_gap(gap: f64) -> ProposalPriority {
    if gap > 30.0 {
        ProposalPriority::Critical
    } else if gap > 20.0 {
        ProposalPriority::High
    } else if gap < 10.0 {
        ProposalPriority::Low
    } else {
        ProposalPriority::Medium
    }
}
