//! Reminder scheduling.
//!
//! The core only talks to a [`NotificationScheduler`]; how alerts reach the
//! user is the sink's business. A scheduler instance is built once at startup
//! and handed to whoever needs it.

mod book;
mod late;
mod scheduler;

pub use book::ReminderBook;
pub use late::notify_expired;
pub use scheduler::TokioScheduler;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

use crate::goal::Goal;

/// Schedules fire-and-forget alerts for a goal.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Returns a handle id, or `None` when notifications are not permitted or
    /// `fire_at` is not in the future.
    async fn schedule(&self, goal: &Goal, fire_at: DateTime<Local>, message: &str)
        -> Option<String>;

    async fn cancel(&self, handle_id: &str);

    async fn cancel_all_for_goal(&self, goal_id: &str);
}

/// An alert that is due now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// `None` for one-shot late notices that were never scheduled.
    pub handle_id: Option<String>,
    pub goal_id: String,
    pub title: String,
    pub message: String,
}

/// Where due alerts end up.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification);
}

/// One reminder relative to the deadline. Negative offsets fire before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOffset {
    pub offset_minutes: i64,
    /// May contain `{title}`.
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderPolicy {
    offsets: Vec<ReminderOffset>,
}

impl ReminderPolicy {
    pub fn new(offsets: Vec<ReminderOffset>) -> Self {
        Self { offsets }
    }

    pub fn offsets(&self) -> &[ReminderOffset] {
        &self.offsets
    }

    /// `(fire_at, message)` for every offset. Empty for an unparseable deadline.
    pub fn plan(&self, goal: &Goal) -> Vec<(DateTime<Local>, String)> {
        let Some(deadline) = goal.deadline() else {
            return Vec::new();
        };
        self.offsets
            .iter()
            .map(|o| {
                (
                    deadline + Duration::minutes(o.offset_minutes),
                    render_message(&o.message, goal),
                )
            })
            .collect()
    }
}

/// Substitute `{title}`.
pub fn render_message(template: &str, goal: &Goal) -> String {
    template.replace("{title}", &goal.title)
}

/// Schedule every reminder in `policy` that is still ahead. Returns the
/// handles to store on the goal.
pub async fn schedule_reminders(
    scheduler: &dyn NotificationScheduler,
    goal: &Goal,
    policy: &ReminderPolicy,
) -> Vec<String> {
    let mut handles = Vec::new();
    for (fire_at, message) in policy.plan(goal) {
        if let Some(handle) = scheduler.schedule(goal, fire_at, &message).await {
            handles.push(handle);
        }
    }
    handles
}

/// Cancel the goal's stored handles and anything else pending for it.
pub async fn cancel_reminders(scheduler: &dyn NotificationScheduler, goal: &Goal) {
    for handle in &goal.notification_ids {
        scheduler.cancel(handle).await;
    }
    scheduler.cancel_all_for_goal(&goal.id).await;
}
