//! Action-relevance matching for task requests
//!
//! Deciding which of an agent's assigned actions a task request should
//! trigger is a ranking problem; the default keyword matcher is a
//! placeholder deployments are expected to replace.

use grove_types::ActionDefinition;

/// Selects the action (if any) a task request should trigger.
pub trait ActionMatcher: Send + Sync {
    /// Index into `actions` of the best match, or `None` to run nothing.
    fn select(&self, content: &str, actions: &[ActionDefinition]) -> Option<usize>;
}

/// Keyword matcher: an action matches when its name appears in the
/// request, or its description mentions the request's first word.
#[derive(Default)]
pub struct KeywordMatcher;

impl ActionMatcher for KeywordMatcher {
    fn select(&self, content: &str, actions: &[ActionDefinition]) -> Option<usize> {
        let content_lower = content.to_lowercase();
        let first_word = content_lower.split_whitespace().next().unwrap_or("");
        actions.iter().position(|action| {
            content_lower.contains(&action.name.to_lowercase())
                || (!first_word.is_empty()
                    && action.description.to_lowercase().contains(first_word))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_types::ActionKind;

    fn action(name: &str, description: &str) -> ActionDefinition {
        ActionDefinition::new(name, description, ActionKind::CustomFunction)
    }

    #[test]
    fn matches_action_name_in_request() {
        let actions = vec![
            action("export_report", "writes the weekly report"),
            action("notify_ops", "pages the on-call"),
        ];
        let matcher = KeywordMatcher;
        assert_eq!(
            matcher.select("please notify_ops about the outage", &actions),
            Some(1)
        );
    }

    #[test]
    fn matches_first_word_against_description() {
        let actions = vec![action("wr1", "pages the on-call engineer")];
        let matcher = KeywordMatcher;
        assert_eq!(matcher.select("pages for the incident", &actions), Some(0));
    }

    #[test]
    fn no_match_returns_none() {
        let actions = vec![action("export_report", "writes the weekly report")];
        assert_eq!(KeywordMatcher.select("restart the cluster", &actions), None);
    }
}
