use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown::CountdownState;
use crate::time::TimeRemaining;

/// Every observable change produces an Event. The CLI prints them as JSON;
/// countdown observers receive the tick and expiry variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CountdownTick {
        goal_id: String,
        state: CountdownState,
        remaining: TimeRemaining,
        /// 0.0 ..= 100.0 of the way from creation to deadline.
        progress_pct: f64,
        at: DateTime<Utc>,
    },
    /// Fired once per countdown when it reaches zero.
    GoalExpired {
        goal_id: String,
        at: DateTime<Utc>,
    },
    GoalCreated {
        goal_id: String,
        at: DateTime<Utc>,
    },
    GoalUpdated {
        goal_id: String,
        deadline_changed: bool,
        at: DateTime<Utc>,
    },
    GoalDeleted {
        goal_id: String,
        at: DateTime<Utc>,
    },
    RemindersScheduled {
        goal_id: String,
        handle_ids: Vec<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn goal_id(&self) -> &str {
        match self {
            Event::CountdownTick { goal_id, .. }
            | Event::GoalExpired { goal_id, .. }
            | Event::GoalCreated { goal_id, .. }
            | Event::GoalUpdated { goal_id, .. }
            | Event::GoalDeleted { goal_id, .. }
            | Event::RemindersScheduled { goal_id, .. } => goal_id,
        }
    }
}
