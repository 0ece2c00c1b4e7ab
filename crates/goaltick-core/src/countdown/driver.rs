//! Runs countdown engines on tokio timers.
//!
//! Each engine gets exactly one task, owned by a [`CountdownHandle`]. Dropping
//! or cancelling the handle aborts the task, so no callback can outlive the
//! view that subscribed to it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::engine::{same_countdown, Cadence, CountdownEngine};
use crate::events::Event;
use crate::goal::Goal;
use crate::time::Clock;

/// Receives countdown updates. Called from the timer task.
pub trait CountdownObserver: Send + Sync {
    /// A [`Event::CountdownTick`] snapshot after every tick, plus one on start.
    fn on_tick(&self, snapshot: &Event);

    /// The countdown reached zero. Called at most once per engine.
    fn on_expired(&self, goal_id: &str);
}

/// Owns one running countdown task.
#[derive(Debug)]
pub struct CountdownHandle {
    goal_id: String,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub fn goal_id(&self) -> &str {
        &self.goal_id
    }

    /// True once the countdown expired (or was cancelled).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct CountdownTimer;

impl CountdownTimer {
    /// Start ticking `engine`. Must be called inside a tokio runtime.
    pub fn spawn(
        mut engine: CountdownEngine,
        clock: Arc<dyn Clock>,
        cadence: Cadence,
        observer: Arc<dyn CountdownObserver>,
    ) -> CountdownHandle {
        let goal_id = engine.goal_id().to_string();
        let task_goal_id = goal_id.clone();

        let task = tokio::spawn(async move {
            observer.on_tick(&engine.snapshot(clock.now()));

            // Each pass arms one interval; a cadence change drops it and
            // arms the next.
            while let Some(period) = engine.cadence(&cadence) {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    let now = clock.now();
                    let expired = engine.tick(now);
                    observer.on_tick(&engine.snapshot(now));
                    if expired.is_some() {
                        tracing::debug!(goal_id = %task_goal_id, "countdown expired");
                        observer.on_expired(&task_goal_id);
                    }
                    if engine.cadence(&cadence) != Some(period) {
                        break;
                    }
                }
            }
        });

        tracing::debug!(goal_id = %goal_id, "countdown started");
        CountdownHandle { goal_id, task }
    }
}

struct Tracked {
    goal: Goal,
    handle: CountdownHandle,
}

/// One countdown per displayed goal.
///
/// [`sync`](Self::sync) reconciles the running timers with the goals on
/// screen. Timers for goals that disappeared or whose deadline changed are
/// cancelled before any replacement starts.
pub struct CountdownBoard {
    clock: Arc<dyn Clock>,
    cadence: Cadence,
    observer: Arc<dyn CountdownObserver>,
    tracked: HashMap<String, Tracked>,
}

impl CountdownBoard {
    pub fn new(
        clock: Arc<dyn Clock>,
        cadence: Cadence,
        observer: Arc<dyn CountdownObserver>,
    ) -> Self {
        Self {
            clock,
            cadence,
            observer,
            tracked: HashMap::new(),
        }
    }

    pub fn sync(&mut self, goals: &[Goal]) {
        self.tracked.retain(|id, tracked| {
            let keep = goals
                .iter()
                .any(|g| &g.id == id && same_countdown(g, &tracked.goal));
            if !keep {
                tracing::debug!(goal_id = %id, "countdown cancelled");
            }
            keep
        });

        let now = self.clock.now();
        for goal in goals {
            if self.tracked.contains_key(&goal.id) {
                continue;
            }
            let engine = CountdownEngine::new(goal, now);
            let handle = CountdownTimer::spawn(
                engine,
                Arc::clone(&self.clock),
                self.cadence,
                Arc::clone(&self.observer),
            );
            self.tracked.insert(
                goal.id.clone(),
                Tracked {
                    goal: goal.clone(),
                    handle,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    pub fn is_tracking(&self, goal_id: &str) -> bool {
        self.tracked.contains_key(goal_id)
    }

    /// Cancel every timer.
    pub fn shutdown(&mut self) {
        self.tracked.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{DateTime, Local, TimeZone};

    use super::*;
    use crate::countdown::CountdownState;

    /// Local time that follows tokio's (pausable) clock.
    struct TokioClock {
        origin: DateTime<Local>,
        started: Instant,
    }

    impl TokioClock {
        fn at(origin: DateTime<Local>) -> Arc<Self> {
            Arc::new(Self {
                origin,
                started: Instant::now(),
            })
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Local> {
            let elapsed = chrono::Duration::from_std(self.started.elapsed()).unwrap();
            self.origin + elapsed
        }
    }

    #[derive(Default)]
    struct Recorder {
        ticks: Mutex<Vec<Event>>,
        expired: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn tick_count(&self, goal_id: &str) -> usize {
            self.ticks
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.goal_id() == goal_id)
                .count()
        }

        fn last_state(&self, goal_id: &str) -> Option<CountdownState> {
            self.ticks
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|e| e.goal_id() == goal_id)
                .and_then(|e| match e {
                    Event::CountdownTick { state, .. } => Some(*state),
                    _ => None,
                })
        }
    }

    impl CountdownObserver for Recorder {
        fn on_tick(&self, snapshot: &Event) {
            self.ticks.lock().unwrap().push(snapshot.clone());
        }

        fn on_expired(&self, goal_id: &str) {
            self.expired.lock().unwrap().push(goal_id.to_string());
        }
    }

    fn goal(id: &str, time: &str) -> Goal {
        Goal {
            id: id.to_string(),
            title: format!("Goal {id}"),
            description: None,
            deadline_date: "2030-06-15".to_string(),
            deadline_time: time.to_string(),
            created_at: "2030-06-01T00:00:00.000Z".to_string(),
            notification_ids: vec![],
        }
    }

    fn origin() -> DateTime<Local> {
        Local.with_ymd_and_hms(2030, 6, 15, 11, 59, 57).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn timer_reports_expiry_once_and_stops() {
        let clock = TokioClock::at(origin());
        let recorder = Arc::new(Recorder::default());
        let engine = CountdownEngine::new(&goal("g", "12:00"), clock.now());
        let handle = CountdownTimer::spawn(engine, clock, Cadence::default(), recorder.clone());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*recorder.expired.lock().unwrap(), vec!["g".to_string()]);
        assert_eq!(recorder.last_state("g"), Some(CountdownState::Expired));
        assert!(handle.is_finished());

        let ticks = recorder.tick_count("g");
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(recorder.tick_count("g"), ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_goal_gets_one_snapshot_and_no_ticks() {
        let clock = TokioClock::at(origin());
        let recorder = Arc::new(Recorder::default());
        let engine = CountdownEngine::new(&goal("old", "09:00"), clock.now());
        let _handle = CountdownTimer::spawn(engine, clock, Cadence::default(), recorder.clone());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(recorder.tick_count("old"), 1);
        assert!(recorder.expired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_ticks() {
        let clock = TokioClock::at(origin());
        let recorder = Arc::new(Recorder::default());
        let engine = CountdownEngine::new(&goal("g", "18:00"), clock.now());
        let handle = CountdownTimer::spawn(engine, clock, Cadence::default(), recorder.clone());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        let before = recorder.tick_count("g");
        assert_eq!(before, 4);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(recorder.tick_count("g"), before);
    }

    #[tokio::test(start_paused = true)]
    async fn board_restarts_changed_goals_and_drops_removed_ones() {
        let clock = TokioClock::at(origin());
        let recorder = Arc::new(Recorder::default());
        let mut board = CountdownBoard::new(clock, Cadence::default(), recorder.clone());

        let a = goal("a", "18:00");
        let b = goal("b", "19:00");
        board.sync(&[a.clone(), b.clone()]);
        assert_eq!(board.len(), 2);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(recorder.tick_count("b"), 2);

        // Retitling keeps the timer; moving the deadline replaces it.
        let mut retitled = a.clone();
        retitled.title = "Renamed".to_string();
        board.sync(&[retitled.clone(), b.clone()]);
        let a_ticks = recorder.tick_count("a");
        assert_eq!(a_ticks, 2);

        let mut moved = retitled.clone();
        moved.deadline_time = "20:00".to_string();
        board.sync(&[moved]);
        assert_eq!(board.len(), 1);
        assert!(board.is_tracking("a"));
        assert!(!board.is_tracking("b"));
        // The replacement announces itself immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(recorder.tick_count("a"), a_ticks + 1);

        let b_ticks = recorder.tick_count("b");
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(recorder.tick_count("b"), b_ticks);

        board.shutdown();
        assert!(board.is_empty());
        let a_ticks = recorder.tick_count("a");
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(recorder.tick_count("a"), a_ticks);
    }
}
