//! The shared error taxonomy crossing every Grove service boundary

/// Errors surfaced by Grove operations.
///
/// Upstream covers generative-capability and entity-store failures; the
/// workflow engine treats those as fatal to the current step. Every
/// failure path persists best-effort state (failed step, failed run)
/// before one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Missing caller identity; surfaced immediately, never retried
    #[error("caller identity required")]
    Unauthorized,

    /// Missing or malformed required input, unknown workflow type
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced entity absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation not permitted in the entity's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Generative capability or entity store failure
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// A workflow step failed; carries enough context to diagnose
    /// without re-running
    #[error("workflow {collaboration_id} failed at step {step_number} ({action}): {source}")]
    StepFailed {
        collaboration_id: String,
        step_number: u32,
        action: String,
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        CoreError::Upstream(msg.into())
    }
}

/// Result type alias for Grove operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failed_carries_diagnosis_context() {
        let err = CoreError::StepFailed {
            collaboration_id: "c1".to_string(),
            step_number: 2,
            action: "simulate".to_string(),
            source: Box::new(CoreError::upstream("model unavailable")),
        };
        let text = err.to_string();
        assert!(text.contains("c1"));
        assert!(text.contains("step 2"));
        assert!(text.contains("simulate"));
    }
}
