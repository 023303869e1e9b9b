//! The shared knowledge pool: contribute, query, validate, apply, sync

use crate::{invoke_structured, ARCHITECT};
use grove_model::GenerativeModel;
use grove_store::{GroveStore, KnowledgeStore, LearningStore};
use grove_types::{
    CoreError, CoreResult, KnowledgeId, KnowledgeItem, KnowledgeKind, LearningKind,
    LearningOutcome,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

/// Parameters for a knowledge query
#[derive(Clone, Debug, Default)]
pub struct KnowledgeQuery {
    /// Free-text query; when set the model ranks relevance
    pub query: Option<String>,
    /// Keep only items carrying at least one of these tags
    pub tags: Vec<String>,
    pub limit: Option<usize>,
}

/// Result of syncing learnings into the pool
#[derive(Clone, Debug, serde::Serialize)]
pub struct SyncOutcome {
    pub learnings_processed: usize,
    pub new_knowledge_created: usize,
}

#[derive(Debug, Deserialize)]
struct RelevanceRanking {
    #[serde(default)]
    relevant_indices: Vec<usize>,
}

fn ranking_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "relevant_indices": { "type": "array", "items": { "type": "number" } }
        }
    })
}

/// The shared, validated knowledge pool agents draw on.
pub struct KnowledgePool {
    store: Arc<dyn GroveStore>,
    model: Arc<dyn GenerativeModel>,
}

impl KnowledgePool {
    pub fn new(store: Arc<dyn GroveStore>, model: Arc<dyn GenerativeModel>) -> Self {
        Self { store, model }
    }

    /// Add an item to the pool. New contributions start unvalidated.
    pub async fn contribute(&self, item: KnowledgeItem) -> CoreResult<KnowledgeId> {
        let id = item.id.clone();
        self.store.create_knowledge(item).await?;
        tracing::debug!(knowledge_id = %id, "knowledge contributed");
        Ok(id)
    }

    /// Fetch validated knowledge relevant to a context.
    ///
    /// With a free-text query the model ranks the candidates and the top
    /// five indices win; otherwise items come back by confidence.
    pub async fn query(&self, params: KnowledgeQuery) -> CoreResult<Vec<KnowledgeItem>> {
        let mut items = self.store.validated_knowledge().await?;

        if !params.tags.is_empty() {
            items.retain(|k| k.has_any_tag(&params.tags));
        }

        if let Some(query) = &params.query {
            let candidates: Vec<&KnowledgeItem> = items.iter().take(20).collect();
            let listing: Vec<String> = candidates
                .iter()
                .enumerate()
                .map(|(i, k)| {
                    format!("{}. [{:?}] {}: {}", i + 1, k.knowledge_type, k.title, k.content)
                })
                .collect();
            let prompt = format!(
                "Rank these knowledge items by relevance to the query.\n\n\
                 QUERY: {query}\n\n\
                 KNOWLEDGE ITEMS:\n{}\n\n\
                 Return the indices of the top 5 most relevant items.",
                listing.join("\n"),
            );
            let ranking: RelevanceRanking =
                invoke_structured(self.model.as_ref(), prompt, ranking_schema()).await?;

            // Indices are 1-based in the prompt listing.
            let ranked: Vec<KnowledgeItem> = ranking
                .relevant_indices
                .iter()
                .filter_map(|i| i.checked_sub(1).and_then(|i| candidates.get(i)))
                .map(|k| (*k).clone())
                .collect();
            let limit = params.limit.unwrap_or(5);
            return Ok(ranked.into_iter().take(limit).collect());
        }

        items.sort_by(|a, b| b.confidence_score.cmp(&a.confidence_score));
        items.truncate(params.limit.unwrap_or(10));
        Ok(items)
    }

    /// Record a validation verdict; confidence snaps to the 80/30 band.
    pub async fn validate(&self, id: &KnowledgeId, validated: bool) -> CoreResult<()> {
        let mut item = self
            .store
            .get_knowledge(id)
            .await?
            .ok_or_else(|| CoreError::not_found("knowledge", id.to_string()))?;
        item.set_validated(validated);
        self.store.update_knowledge(item).await?;
        Ok(())
    }

    /// Record that knowledge was applied and fold the outcome into its
    /// running success rate. Returns the new rate.
    pub async fn record_application(&self, id: &KnowledgeId, success: bool) -> CoreResult<u8> {
        let mut item = self
            .store
            .get_knowledge(id)
            .await?
            .ok_or_else(|| CoreError::not_found("knowledge", id.to_string()))?;
        item.record_application(success);
        let rate = item.success_rate;
        self.store.update_knowledge(item).await?;
        Ok(rate)
    }

    /// Promote positive learnings into the pool, deduplicated by title.
    pub async fn sync(&self) -> CoreResult<SyncOutcome> {
        let learnings = self
            .store
            .learnings_with_outcome(LearningOutcome::Positive)
            .await?;
        let mut seen: HashSet<String> = self
            .store
            .list_knowledge(usize::MAX)
            .await?
            .into_iter()
            .map(|k| k.title)
            .collect();

        let mut synced = 0;
        let total = learnings.len();
        for learning in learnings {
            let title = learning.title();
            if seen.contains(&title) {
                continue;
            }
            let kind = if learning.learning_type == LearningKind::BestPractice {
                KnowledgeKind::Rule
            } else {
                KnowledgeKind::Insight
            };
            let applicable_to: Vec<String> = learning
                .related_agents
                .iter()
                .map(|a| a.to_string())
                .collect();
            let tag = serde_json::to_value(learning.learning_type)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();
            let item = KnowledgeItem::new(kind, title.clone(), learning.insight.clone(), ARCHITECT)
                .with_applicable_to(applicable_to)
                .with_tags(vec![tag])
                .with_confidence(learning.confidence)
                .with_validated(learning.times_applied > 2);
            self.store.create_knowledge(item).await?;
            seen.insert(title);
            synced += 1;
        }

        tracing::info!(processed = total, created = synced, "knowledge sync complete");

        Ok(SyncOutcome {
            learnings_processed: total,
            new_knowledge_created: synced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_model::ScriptedModel;
    use grove_store::MemoryStore;
    use grove_types::Learning;

    fn pool_with(store: Arc<MemoryStore>, model: Arc<ScriptedModel>) -> KnowledgePool {
        KnowledgePool::new(store, model)
    }

    #[tokio::test]
    async fn record_application_updates_running_average() {
        let store = Arc::new(MemoryStore::new());
        let pool = pool_with(store.clone(), Arc::new(ScriptedModel::new()));

        let id = pool
            .contribute(KnowledgeItem::new(
                KnowledgeKind::Insight,
                "t",
                "c",
                ARCHITECT,
            ))
            .await
            .unwrap();

        assert_eq!(pool.record_application(&id, true).await.unwrap(), 100);
        assert_eq!(pool.record_application(&id, false).await.unwrap(), 50);

        let stored = store.get_knowledge(&id).await.unwrap().unwrap();
        assert_eq!(stored.times_used, 2);
    }

    #[tokio::test]
    async fn query_without_text_ranks_by_confidence() {
        let store = Arc::new(MemoryStore::new());
        for (title, confidence) in [("a", 40u8), ("b", 90), ("c", 70)] {
            store
                .create_knowledge(
                    KnowledgeItem::new(KnowledgeKind::Insight, title, "c", ARCHITECT)
                        .with_confidence(confidence)
                        .with_validated(true),
                )
                .await
                .unwrap();
        }
        let pool = pool_with(store, Arc::new(ScriptedModel::new()));

        let results = pool
            .query(KnowledgeQuery {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "b");
        assert_eq!(results[1].title, "c");
    }

    #[tokio::test]
    async fn query_with_text_uses_model_ranking() {
        let store = Arc::new(MemoryStore::new());
        for title in ["first", "second", "third"] {
            store
                .create_knowledge(
                    KnowledgeItem::new(KnowledgeKind::Insight, title, "c", ARCHITECT)
                        .with_validated(true),
                )
                .await
                .unwrap();
        }
        let model = Arc::new(ScriptedModel::new());
        model.push_structured(json!({"relevant_indices": [3, 1]}));

        let pool = pool_with(store, model);
        let results = pool
            .query(KnowledgeQuery {
                query: Some("anything".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn sync_promotes_positive_learnings_once() {
        let store = Arc::new(MemoryStore::new());
        let mut learning = Learning::new(
            LearningKind::BestPractice,
            "ctx",
            "always set a personality",
            80,
        );
        learning.outcome = LearningOutcome::Positive;
        learning.times_applied = 3;
        store.create_learning(learning).await.unwrap();

        let pool = pool_with(store.clone(), Arc::new(ScriptedModel::new()));

        let first = pool.sync().await.unwrap();
        assert_eq!(first.new_knowledge_created, 1);

        // Re-sync is a no-op thanks to title dedup.
        let second = pool.sync().await.unwrap();
        assert_eq!(second.new_knowledge_created, 0);

        let items = store.list_knowledge(10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].knowledge_type, KnowledgeKind::Rule);
        assert!(items[0].validated);
    }
}
