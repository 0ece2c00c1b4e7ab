use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};

use super::{cancel_reminders, schedule_reminders, NotificationScheduler, ReminderPolicy};
use crate::countdown::same_countdown;
use crate::events::Event;
use crate::goal::{Goal, GoalPatch};
use crate::repository::GoalRepository;

/// Reminders currently scheduled, one entry per goal.
///
/// Handle ids are written onto the goal record so they can be cancelled
/// later, and cleared again on [`release`](Self::release) since in-process
/// handles do not outlive the scheduler.
pub struct ReminderBook {
    scheduler: Arc<dyn NotificationScheduler>,
    policy: ReminderPolicy,
    scheduled: HashMap<String, Goal>,
}

impl ReminderBook {
    pub fn new(scheduler: Arc<dyn NotificationScheduler>, policy: ReminderPolicy) -> Self {
        Self {
            scheduler,
            policy,
            scheduled: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    pub fn is_scheduled(&self, goal_id: &str) -> bool {
        self.scheduled.contains_key(goal_id)
    }

    /// Bring the book in line with `goals`.
    ///
    /// Goals that vanished or whose deadline moved lose their reminders.
    /// Active goals without an entry get a fresh set, persisted on the record.
    /// Returns one [`Event::RemindersScheduled`] per goal that got handles.
    pub async fn reconcile(
        &mut self,
        repo: &GoalRepository,
        goals: &[Goal],
        now: DateTime<Local>,
    ) -> Vec<Event> {
        let stale: Vec<Goal> = self
            .scheduled
            .values()
            .filter(|old| !goals.iter().any(|g| same_countdown(g, old)))
            .cloned()
            .collect();
        for old in stale {
            cancel_reminders(self.scheduler.as_ref(), &old).await;
            self.scheduled.remove(&old.id);
        }

        let mut events = Vec::new();
        for goal in goals.iter().filter(|g| !g.is_expired(now)) {
            if self.scheduled.contains_key(&goal.id) {
                continue;
            }
            let handles = schedule_reminders(self.scheduler.as_ref(), goal, &self.policy).await;
            // Also overwrites handles left behind by an earlier process.
            if handles != goal.notification_ids {
                let patch = GoalPatch::default().with_notification_ids(handles.clone());
                if !repo.update(&goal.id, patch).await {
                    tracing::warn!(goal_id = %goal.id, "reminder handles not recorded");
                }
            }
            if !handles.is_empty() {
                events.push(Event::RemindersScheduled {
                    goal_id: goal.id.clone(),
                    handle_ids: handles.clone(),
                    at: now.with_timezone(&Utc),
                });
            }
            let mut tracked = goal.clone();
            tracked.notification_ids = handles;
            self.scheduled.insert(goal.id.clone(), tracked);
        }
        events
    }

    /// Cancel every reminder and clear the stored handles.
    pub async fn release(&mut self, repo: &GoalRepository) {
        for (id, goal) in self.scheduled.drain() {
            cancel_reminders(self.scheduler.as_ref(), &goal).await;
            if !goal.notification_ids.is_empty() {
                repo.update(&id, GoalPatch::default().with_notification_ids(Vec::new()))
                    .await;
            }
        }
    }
}
