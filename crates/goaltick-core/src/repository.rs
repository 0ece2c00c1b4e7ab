//! Goal CRUD over a [`KeyValueStore`].
//!
//! The whole collection lives under one key as a JSON array, and every write
//! rewrites it. There is no locking: callers issue one write at a time.
//!
//! Storage is best-effort. The plain methods log failures and return
//! `false`/empty so the caller can show a retry prompt; the `try_*` methods
//! return the underlying error.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::goal::{self, Goal, GoalPatch};
use crate::storage::KeyValueStore;

/// Key holding the JSON array of goals.
pub const GOALS_KEY: &str = "@goals";
/// Key holding the JSON array of goal ids that already got their late notice.
pub const NOTIFIED_KEY: &str = "@notified_goals";

#[derive(Clone)]
pub struct GoalRepository {
    store: Arc<dyn KeyValueStore>,
}

impl GoalRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// See [`goal::generate_id`].
    pub fn generate_id() -> String {
        goal::generate_id()
    }

    // ── Goals ────────────────────────────────────────────────────────

    /// All stored goals. Missing or unreadable data reads as an empty list.
    pub async fn get_all(&self) -> Vec<Goal> {
        self.try_get_all().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load goals");
            Vec::new()
        })
    }

    /// Like [`get_all`](Self::get_all) but reports store failures. A corrupt
    /// payload is still treated as "no data yet".
    pub async fn try_get_all(&self) -> Result<Vec<Goal>> {
        let Some(json) = self.store.get(GOALS_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&json) {
            Ok(goals) => Ok(goals),
            Err(e) => {
                tracing::warn!(error = %e, "stored goal collection is unreadable; ignoring it");
                Ok(Vec::new())
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<Goal> {
        self.get_all().await.into_iter().find(|g| g.id == id)
    }

    pub async fn create(&self, goal: Goal) -> bool {
        let id = goal.id.clone();
        report("create", &id, self.try_create(goal).await)
    }

    pub async fn try_create(&self, goal: Goal) -> Result<()> {
        let mut goals = self.try_get_all().await?;
        goals.push(goal);
        self.write_goals(&goals).await
    }

    /// Merge `patch` into the goal with `id`. `false` if there is no such goal.
    pub async fn update(&self, id: &str, patch: GoalPatch) -> bool {
        match self.try_update(id, patch).await {
            Ok(found) => found,
            Err(e) => report("update", id, Err(e)),
        }
    }

    pub async fn try_update(&self, id: &str, patch: GoalPatch) -> Result<bool> {
        let mut goals = self.try_get_all().await?;
        let Some(goal) = goals.iter_mut().find(|g| g.id == id) else {
            return Ok(false);
        };
        goal.apply(patch);
        self.write_goals(&goals).await?;
        Ok(true)
    }

    /// Remove the goal with `id`. Succeeds whether or not it existed.
    pub async fn delete(&self, id: &str) -> bool {
        report("delete", id, self.try_delete(id).await)
    }

    pub async fn try_delete(&self, id: &str) -> Result<()> {
        let mut goals = self.try_get_all().await?;
        goals.retain(|g| g.id != id);
        self.write_goals(&goals).await
    }

    /// Drop the goal collection and the notified set.
    pub async fn clear_all(&self) -> bool {
        report("clear", "*", self.try_clear_all().await)
    }

    pub async fn try_clear_all(&self) -> Result<()> {
        self.store.remove(GOALS_KEY).await?;
        self.store.remove(NOTIFIED_KEY).await?;
        Ok(())
    }

    async fn write_goals(&self, goals: &[Goal]) -> Result<()> {
        let json = serde_json::to_string(goals)?;
        self.store.set(GOALS_KEY, &json).await?;
        Ok(())
    }

    // ── Notified set ─────────────────────────────────────────────────

    /// Ids of goals whose one-time late notice has already gone out.
    pub async fn notified_ids(&self) -> HashSet<String> {
        self.try_notified_ids().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load notified set");
            HashSet::new()
        })
    }

    pub async fn try_notified_ids(&self) -> Result<HashSet<String>> {
        let Some(json) = self.store.get(NOTIFIED_KEY).await? else {
            return Ok(HashSet::new());
        };
        match serde_json::from_str::<Vec<String>>(&json) {
            Ok(ids) => Ok(ids.into_iter().collect()),
            Err(e) => {
                tracing::warn!(error = %e, "stored notified set is unreadable; ignoring it");
                Ok(HashSet::new())
            }
        }
    }

    pub async fn mark_notified(&self, id: &str) -> bool {
        let result = async {
            let mut ids = self.try_notified_ids().await?;
            if ids.insert(id.to_string()) {
                self.write_notified(&ids).await?;
            }
            Ok::<(), CoreError>(())
        }
        .await;
        report("mark notified", id, result)
    }

    /// Forget that `id` was notified, e.g. after its deadline moved.
    pub async fn clear_notified(&self, id: &str) -> bool {
        let result = async {
            let mut ids = self.try_notified_ids().await?;
            if ids.remove(id) {
                self.write_notified(&ids).await?;
            }
            Ok::<(), CoreError>(())
        }
        .await;
        report("clear notified", id, result)
    }

    async fn write_notified(&self, ids: &HashSet<String>) -> Result<()> {
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();
        let json = serde_json::to_string(&sorted)?;
        self.store.set(NOTIFIED_KEY, &json).await?;
        Ok(())
    }
}

fn report(op: &str, id: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(op, goal_id = id, error = %e, "goal storage operation failed");
            false
        }
    }
}
