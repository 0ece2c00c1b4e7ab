//! Integration tests for the goal lifecycle: validate, store, list, count down.

use std::sync::Arc;

use chrono::{Duration, Local, TimeZone};
use goaltick_core::goal::{validate_new, validate_patch};
use goaltick_core::list::{arrange, filter};
use goaltick_core::{
    CountdownEngine, CountdownState, Event, FilterMode, Goal, GoalPatch, GoalRepository,
    NewGoal, SortKey, SqliteStore, ValidationLimits,
};

fn input(title: &str, date: &str, time: &str) -> NewGoal {
    NewGoal {
        title: title.to_string(),
        description: Some("written in a test".to_string()),
        deadline_date: date.to_string(),
        deadline_time: time.to_string(),
    }
}

#[tokio::test]
async fn test_create_update_delete_round_trip_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open_at(&dir.path().join("goaltick.db")).unwrap());
    let repo = GoalRepository::new(store);
    let now = Local.with_ymd_and_hms(2030, 6, 15, 9, 0, 0).unwrap();

    let new_goal = input("Write the report", "2030-06-20", "17:00");
    validate_new(&new_goal, &ValidationLimits::default(), now).unwrap();
    let goal = Goal::from_input(new_goal, GoalRepository::generate_id(), now);
    assert!(repo.create(goal.clone()).await);

    // Create, then read back deep-equal.
    let all = repo.get_all().await;
    assert_eq!(all, vec![goal.clone()]);

    // Title-only update leaves everything else alone.
    let patch = GoalPatch::default().with_title("X");
    assert!(repo.update(&goal.id, patch).await);
    let updated = repo.get(&goal.id).await.unwrap();
    assert_eq!(updated.title, "X");
    assert_eq!(
        Goal {
            title: goal.title.clone(),
            ..updated.clone()
        },
        goal
    );

    // Delete removes it.
    assert!(repo.delete(&goal.id).await);
    assert!(repo.get_all().await.iter().all(|g| g.id != goal.id));
}

#[tokio::test]
async fn test_collection_written_by_mobile_app_loads() {
    let store = Arc::new(goaltick_core::MemoryStore::new());
    let payload = r#"[
        {"id":"1718000000000k3j9x0a1b","title":"Marathon","description":"Sub 4h",
         "deadlineDate":"2099-10-12","deadlineTime":"08:30",
         "createdAt":"2024-06-10T06:13:20.000Z","notificationIds":["abc"]},
        {"id":"1718000000001zzzzzzzzz","title":"Taxes",
         "deadlineDate":"2020-04-15","deadlineTime":"23:59",
         "createdAt":"2020-01-01T00:00:00.000Z"}
    ]"#;
    goaltick_core::KeyValueStore::set(store.as_ref(), "@goals", payload)
        .await
        .unwrap();
    let repo = GoalRepository::new(store);

    let goals = repo.get_all().await;
    assert_eq!(goals.len(), 2);
    assert_eq!(goals[0].notification_ids, vec!["abc".to_string()]);

    let now = Local.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let active = filter(&goals, FilterMode::Active, now);
    let expired = filter(&goals, FilterMode::Expired, now);
    assert_eq!(active[0].title, "Marathon");
    assert_eq!(expired[0].title, "Taxes");

    // Expired goals go last even when they would sort first.
    let shown = arrange(&goals, FilterMode::All, SortKey::Deadline, now);
    assert_eq!(shown[0].title, "Marathon");
    assert_eq!(shown[1].title, "Taxes");
}

#[test]
fn test_editing_deadline_resets_countdown() {
    let now = Local.with_ymd_and_hms(2030, 6, 15, 11, 59, 0).unwrap();
    let mut goal = Goal::from_input(
        input("Lunch order", "2030-06-15", "12:00"),
        "g".to_string(),
        now - Duration::hours(1),
    );
    let mut engine = CountdownEngine::new(&goal, now);
    let fired = engine.tick(now + Duration::minutes(1));
    assert!(matches!(fired, Some(Event::GoalExpired { .. })));
    assert_eq!(engine.state(), CountdownState::Expired);

    let patch = GoalPatch::default().with_deadline("2030-06-15", "13:00");
    let later = now + Duration::minutes(2);
    validate_patch(&goal, &patch, &ValidationLimits::default(), later).unwrap();
    goal.apply(patch);
    assert!(!engine.tracks(&goal));

    let mut fresh = CountdownEngine::new(&goal, later);
    assert_eq!(fresh.state(), CountdownState::Running);
    assert!(fresh.tick(later + Duration::minutes(30)).is_none());
    assert!(fresh.progress_pct() < 100.0);
}
