use chrono::{DateTime, Local};

use super::{render_message, Notification, NotificationSink};
use crate::goal::Goal;
use crate::repository::GoalRepository;

/// Send one "deadline passed" notice per expired goal, across restarts.
///
/// Goals already in the repository's notified set are skipped; the rest are
/// delivered and recorded. Returns the ids that were notified on this call.
pub async fn notify_expired(
    repo: &GoalRepository,
    sink: &dyn NotificationSink,
    goals: &[Goal],
    template: &str,
    now: DateTime<Local>,
) -> Vec<String> {
    let already = repo.notified_ids().await;
    let mut notified = Vec::new();

    for goal in goals.iter().filter(|g| g.is_expired(now)) {
        if already.contains(&goal.id) || notified.contains(&goal.id) {
            continue;
        }
        sink.deliver(&Notification {
            handle_id: None,
            goal_id: goal.id.clone(),
            title: goal.title.clone(),
            message: render_message(template, goal),
        });
        if !repo.mark_notified(&goal.id).await {
            tracing::warn!(goal_id = %goal.id, "late notice sent but not recorded");
        }
        notified.push(goal.id.clone());
    }
    notified
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::notify::testing::RecordingSink;
    use crate::storage::MemoryStore;

    fn goal(id: &str, date: &str) -> Goal {
        Goal {
            id: id.to_string(),
            title: format!("Goal {id}"),
            description: None,
            deadline_date: date.to_string(),
            deadline_time: "12:00".to_string(),
            created_at: "2020-01-01T00:00:00.000Z".to_string(),
            notification_ids: vec![],
        }
    }

    #[tokio::test]
    async fn notifies_each_expired_goal_once() {
        let repo = GoalRepository::new(Arc::new(MemoryStore::new()));
        let sink = RecordingSink::default();
        let now = Local.with_ymd_and_hms(2030, 6, 15, 12, 0, 0).unwrap();
        let goals = vec![
            goal("past", "2030-06-01"),
            goal("future", "2030-07-01"),
            goal("edge", "2030-06-15"),
        ];

        let first = notify_expired(&repo, &sink, &goals, "{title} is overdue", now).await;
        assert_eq!(first, vec!["past".to_string(), "edge".to_string()]);
        assert_eq!(
            sink.messages(),
            vec!["Goal past is overdue".to_string(), "Goal edge is overdue".to_string()]
        );

        // A second pass (e.g. after a restart) stays quiet.
        let second = notify_expired(&repo, &sink, &goals, "{title} is overdue", now).await;
        assert!(second.is_empty());
        assert_eq!(sink.messages().len(), 2);

        // Moving a deadline and clearing the flag re-arms it.
        repo.clear_notified("past").await;
        let third = notify_expired(&repo, &sink, &goals, "{title} is overdue", now).await;
        assert_eq!(third, vec!["past".to_string()]);
    }
}
