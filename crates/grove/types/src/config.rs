//! Deployment configuration for Grove services

use serde::{Deserialize, Serialize};

/// Tunable thresholds and limits.
///
/// Workflow templates are configured separately on the engine; everything
/// here is a plain scalar so deployments can load it from any serde
/// source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroveConfig {
    /// Audit scores below this trigger remediation (0–100)
    pub audit_threshold: f64,
    /// Simulation pass rates below this trigger remediation (0–100)
    pub simulation_threshold: f64,
    /// How many recent simulation results feed the pass-rate signal
    pub simulation_window: usize,
    /// Cap on knowledge items created per distribute step
    pub distribution_cap: usize,
    /// How many learnings feed a consolidation prompt
    pub consolidation_window: usize,
}

impl Default for GroveConfig {
    fn default() -> Self {
        Self {
            audit_threshold: 70.0,
            simulation_threshold: 80.0,
            simulation_window: 10,
            distribution_cap: 5,
            consolidation_window: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployed_thresholds() {
        let config = GroveConfig::default();
        assert_eq!(config.audit_threshold, 70.0);
        assert_eq!(config.simulation_threshold, 80.0);
        assert_eq!(config.simulation_window, 10);
    }
}
