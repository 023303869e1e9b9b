//! The shared knowledge pool and the architect's learnings
//!
//! Learnings are raw insights the architect extracts from audit and
//! simulation history; knowledge items are the curated, distributable
//! form synced into the shared pool.

use crate::{AgentId, KnowledgeId, LearningId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel agent-name meaning "applies to every agent"
pub const APPLICABLE_TO_ALL: &str = "all";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeKind {
    Insight,
    Rule,
    Pattern,
    Warning,
}

/// One item in the shared knowledge pool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: KnowledgeId,
    pub knowledge_type: KnowledgeKind,
    pub title: String,
    pub content: String,
    pub contributed_by: String,
    /// Agent names this applies to, or the "all" sentinel
    pub applicable_to: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 0–100
    pub confidence_score: u8,
    pub times_used: u32,
    /// 0–100, cumulative running average over applications
    pub success_rate: u8,
    pub validated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeItem {
    pub fn new(
        knowledge_type: KnowledgeKind,
        title: impl Into<String>,
        content: impl Into<String>,
        contributed_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: KnowledgeId::generate(),
            knowledge_type,
            title: title.into(),
            content: content.into(),
            contributed_by: contributed_by.into(),
            applicable_to: vec![APPLICABLE_TO_ALL.to_string()],
            tags: Vec::new(),
            confidence_score: 50,
            times_used: 0,
            success_rate: 0,
            validated: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_applicable_to(mut self, agents: Vec<String>) -> Self {
        if !agents.is_empty() {
            self.applicable_to = agents;
        }
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence_score = confidence.min(100);
        self
    }

    pub fn with_validated(mut self, validated: bool) -> Self {
        self.validated = validated;
        self
    }

    pub fn applies_to(&self, agent_name: &str) -> bool {
        self.applicable_to
            .iter()
            .any(|a| a == agent_name || a == APPLICABLE_TO_ALL)
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }

    /// Record one application of this knowledge and fold its outcome into
    /// the running success average.
    ///
    /// `new = (old * (n - 1) + outcome) / n` with n the post-increment use
    /// count and outcome 100 or 0. The rate is never recomputed from full
    /// history.
    pub fn record_application(&mut self, success: bool) {
        self.times_used += 1;
        let n = f64::from(self.times_used);
        let old = f64::from(self.success_rate);
        let outcome = if success { 100.0 } else { 0.0 };
        self.success_rate = (((old * (n - 1.0)) + outcome) / n).round() as u8;
        self.updated_at = Utc::now();
    }

    /// Validation verdict resets confidence to a fixed band (80 pass / 30 fail)
    pub fn set_validated(&mut self, validated: bool) {
        self.validated = validated;
        self.confidence_score = if validated { 80 } else { 30 };
        self.updated_at = Utc::now();
    }
}

// ── Learnings ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningKind {
    Pattern,
    Mistake,
    Improvement,
    BestPractice,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningOutcome {
    Positive,
    Negative,
    Neutral,
}

/// A raw insight extracted by the architect from performance history
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Learning {
    pub id: LearningId,
    pub learning_type: LearningKind,
    pub context: String,
    pub insight: String,
    /// 0–100
    pub confidence: u8,
    pub outcome: LearningOutcome,
    pub times_applied: u32,
    #[serde(default)]
    pub related_agents: Vec<AgentId>,
    pub created_at: DateTime<Utc>,
}

impl Learning {
    pub fn new(
        learning_type: LearningKind,
        context: impl Into<String>,
        insight: impl Into<String>,
        confidence: u8,
    ) -> Self {
        Self {
            id: LearningId::generate(),
            learning_type,
            context: context.into(),
            insight: insight.into(),
            confidence: confidence.min(100),
            outcome: LearningOutcome::Neutral,
            times_applied: 0,
            related_agents: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Knowledge-pool title: the leading slice of the insight
    pub fn title(&self) -> String {
        self.insight.chars().take(50).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_running_average() {
        let mut item = KnowledgeItem::new(KnowledgeKind::Insight, "t", "c", "architect");
        assert_eq!((item.times_used, item.success_rate), (0, 0));

        item.record_application(true);
        assert_eq!((item.times_used, item.success_rate), (1, 100));

        item.record_application(false);
        assert_eq!((item.times_used, item.success_rate), (2, 50));
    }

    #[test]
    fn validation_resets_confidence_band() {
        let mut item =
            KnowledgeItem::new(KnowledgeKind::Rule, "t", "c", "architect").with_confidence(55);
        item.set_validated(true);
        assert_eq!((item.validated, item.confidence_score), (true, 80));
        item.set_validated(false);
        assert_eq!((item.validated, item.confidence_score), (false, 30));
    }

    #[test]
    fn applies_to_honors_all_sentinel() {
        let item = KnowledgeItem::new(KnowledgeKind::Insight, "t", "c", "architect");
        assert!(item.applies_to("anyone"));

        let scoped = KnowledgeItem::new(KnowledgeKind::Insight, "t", "c", "architect")
            .with_applicable_to(vec!["scout".to_string()]);
        assert!(scoped.applies_to("scout"));
        assert!(!scoped.applies_to("anyone"));
    }

    #[test]
    fn learning_title_truncates_long_insight() {
        let learning = Learning::new(LearningKind::Pattern, "ctx", "x".repeat(80), 70);
        assert_eq!(learning.title().len(), 50);
    }
}
