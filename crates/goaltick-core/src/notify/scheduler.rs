//! In-process scheduler: one tokio sleep task per pending alert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{Notification, NotificationScheduler, NotificationSink};
use crate::goal::Goal;
use crate::time::Clock;

struct Pending {
    goal_id: String,
    task: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

/// Alerts live only as long as the process (and this scheduler). Dropping the
/// scheduler cancels everything still pending.
pub struct TokioScheduler {
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    permitted: AtomicBool,
    pending: PendingMap,
}

impl TokioScheduler {
    pub fn new(sink: Arc<dyn NotificationSink>, clock: Arc<dyn Clock>, permitted: bool) -> Self {
        Self {
            sink,
            clock,
            permitted: AtomicBool::new(permitted),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn set_permitted(&self, permitted: bool) {
        self.permitted.store(permitted, Ordering::SeqCst);
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn cancel_all(&self) {
        for (_, pending) in lock(&self.pending).drain() {
            pending.task.abort();
        }
    }
}

fn lock(pending: &PendingMap) -> std::sync::MutexGuard<'_, HashMap<String, Pending>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl NotificationScheduler for TokioScheduler {
    async fn schedule(
        &self,
        goal: &Goal,
        fire_at: DateTime<Local>,
        message: &str,
    ) -> Option<String> {
        if !self.permitted.load(Ordering::SeqCst) {
            tracing::debug!(goal_id = %goal.id, "notifications not permitted");
            return None;
        }
        let delay = (fire_at - self.clock.now()).to_std().ok()?;
        if delay.is_zero() {
            return None;
        }

        let handle_id = Uuid::new_v4().to_string();
        let notification = Notification {
            handle_id: Some(handle_id.clone()),
            goal_id: goal.id.clone(),
            title: goal.title.clone(),
            message: message.to_string(),
        };
        let sink = Arc::clone(&self.sink);
        let pending = Arc::clone(&self.pending);
        let key = handle_id.clone();

        // Hold the lock across spawn so the task cannot remove its entry
        // before it is inserted.
        let mut map = lock(&self.pending);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.deliver(&notification);
            lock(&pending).remove(&key);
        });
        map.insert(
            handle_id.clone(),
            Pending {
                goal_id: goal.id.clone(),
                task,
            },
        );
        tracing::debug!(goal_id = %goal.id, handle = %handle_id, %fire_at, "reminder scheduled");
        Some(handle_id)
    }

    async fn cancel(&self, handle_id: &str) {
        if let Some(pending) = lock(&self.pending).remove(handle_id) {
            pending.task.abort();
        }
    }

    async fn cancel_all_for_goal(&self, goal_id: &str) {
        lock(&self.pending).retain(|_, pending| {
            if pending.goal_id == goal_id {
                pending.task.abort();
                false
            } else {
                true
            }
        });
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingSink;
    use crate::notify::{cancel_reminders, schedule_reminders, ReminderOffset, ReminderPolicy};
    use crate::time::ManualClock;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2030, 6, 15, 17, 0, 0).unwrap()
    }

    fn goal(id: &str) -> Goal {
        Goal {
            id: id.to_string(),
            title: "Submit report".to_string(),
            description: None,
            deadline_date: "2030-06-15".to_string(),
            deadline_time: "18:00".to_string(),
            created_at: "2030-06-01T00:00:00.000Z".to_string(),
            notification_ids: vec![],
        }
    }

    fn setup(permitted: bool) -> (Arc<RecordingSink>, ManualClock, TokioScheduler) {
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::new(start());
        let scheduler = TokioScheduler::new(sink.clone(), Arc::new(clock.clone()), permitted);
        (sink, clock, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_when_due() {
        let (sink, _clock, scheduler) = setup(true);
        let handle = scheduler
            .schedule(&goal("g"), start() + Duration::minutes(5), "five")
            .await;
        assert!(handle.is_some());
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(std::time::Duration::from_secs(299)).await;
        assert!(sink.messages().is_empty());
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(sink.messages(), vec!["five".to_string()]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_past_times_and_denied_permission() {
        let (_sink, _clock, scheduler) = setup(true);
        assert!(scheduler
            .schedule(&goal("g"), start() - Duration::seconds(1), "late")
            .await
            .is_none());
        assert!(scheduler.schedule(&goal("g"), start(), "now").await.is_none());

        scheduler.set_permitted(false);
        assert!(scheduler
            .schedule(&goal("g"), start() + Duration::minutes(1), "denied")
            .await
            .is_none());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_alerts_never_fire() {
        let (sink, _clock, scheduler) = setup(true);
        let a = scheduler
            .schedule(&goal("a"), start() + Duration::minutes(1), "a")
            .await
            .unwrap();
        scheduler
            .schedule(&goal("b"), start() + Duration::minutes(1), "b1")
            .await
            .unwrap();
        scheduler
            .schedule(&goal("b"), start() + Duration::minutes(2), "b2")
            .await
            .unwrap();

        scheduler.cancel(&a).await;
        scheduler.cancel_all_for_goal("b").await;
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(std::time::Duration::from_secs(600)).await;
        assert!(sink.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn schedules_only_future_reminders_from_policy() {
        let (sink, _clock, scheduler) = setup(true);
        let policy = ReminderPolicy::new(vec![
            ReminderOffset {
                offset_minutes: -120,
                message: "two hours: {title}".to_string(),
            },
            ReminderOffset {
                offset_minutes: -30,
                message: "half hour: {title}".to_string(),
            },
            ReminderOffset {
                offset_minutes: 15,
                message: "late: {title}".to_string(),
            },
        ]);
        let mut g = goal("g");
        g.notification_ids = schedule_reminders(&scheduler, &g, &policy).await;
        // The two-hour reminder is already in the past at 17:00.
        assert_eq!(g.notification_ids.len(), 2);

        tokio::time::sleep(std::time::Duration::from_secs(31 * 60)).await;
        assert_eq!(sink.messages(), vec!["half hour: Submit report".to_string()]);

        cancel_reminders(&scheduler, &g).await;
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        assert_eq!(sink.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_scheduler_cancels_pending() {
        let (sink, _clock, scheduler) = setup(true);
        scheduler
            .schedule(&goal("g"), start() + Duration::minutes(1), "x")
            .await
            .unwrap();
        drop(scheduler);
        tokio::time::sleep(std::time::Duration::from_secs(120)).await;
        assert!(sink.messages().is_empty());
    }
}
