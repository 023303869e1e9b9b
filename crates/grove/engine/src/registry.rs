//! The step-handler registry: action name → handler
//!
//! Handlers are stateless adapters over external capabilities; they read
//! and write the run's shared context and return the step's output.
//! Registering an action name that already exists replaces the handler,
//! so handlers are individually swappable without touching the engine.

use async_trait::async_trait;
use grove_types::{CoreError, CoreResult, SharedContext, Step};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Executes one workflow step against the shared context.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn execute(&self, context: &mut SharedContext, step: &Step) -> CoreResult<Value>;
}

/// Open registry mapping action names to handlers, resolved at startup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn StepHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for an action name.
    pub fn register(
        &self,
        action: impl Into<String>,
        handler: Arc<dyn StepHandler>,
    ) -> CoreResult<()> {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| CoreError::upstream("step handler registry lock poisoned"))?;
        handlers.insert(action.into(), handler);
        Ok(())
    }

    pub fn get(&self, action: &str) -> CoreResult<Option<Arc<dyn StepHandler>>> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| CoreError::upstream("step handler registry lock poisoned"))?;
        Ok(handlers.get(action).cloned())
    }

    pub fn registered_actions(&self) -> CoreResult<Vec<String>> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| CoreError::upstream("step handler registry lock poisoned"))?;
        let mut actions: Vec<String> = handlers.keys().cloned().collect();
        actions.sort();
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Value);

    #[async_trait]
    impl StepHandler for Fixed {
        async fn execute(&self, _context: &mut SharedContext, _step: &Step) -> CoreResult<Value> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn register_replaces_existing_handler() {
        let registry = HandlerRegistry::new();
        registry
            .register("audit_config", Arc::new(Fixed(json!(1))))
            .unwrap();
        registry
            .register("audit_config", Arc::new(Fixed(json!(2))))
            .unwrap();

        let handler = registry.get("audit_config").unwrap().unwrap();
        let mut context = SharedContext::default();
        let step = Step::pending(1, "architect", "audit_config", "Audit");
        assert_eq!(handler.execute(&mut context, &step).await.unwrap(), json!(2));
    }

    #[test]
    fn unknown_action_resolves_to_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.get("nope").unwrap().is_none());
    }
}
