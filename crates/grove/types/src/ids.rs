//! String-newtype identifiers for Grove records
//!
//! Ids are opaque strings (uuid v4 when generated) so external stores can
//! supply their own identifiers without conversion.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Unique identifier for an agent
    AgentId
);
string_id!(
    /// Unique identifier for a workflow run
    CollaborationId
);
string_id!(
    /// Unique identifier for an improvement proposal
    ProposalId
);
string_id!(
    /// Unique identifier for an inter-agent message
    MessageId
);
string_id!(
    /// Unique identifier for a shared knowledge item
    KnowledgeId
);
string_id!(
    /// Unique identifier for an architect learning
    LearningId
);
string_id!(
    /// Unique identifier for an audit report
    AuditReportId
);
string_id!(
    /// Unique identifier for a simulation result
    SimulationId
);
string_id!(
    /// Unique identifier for an action definition
    ActionId
);
string_id!(
    /// Unique identifier for an action execution record
    ExecutionId
);
