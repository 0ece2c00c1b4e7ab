//! Per-goal countdown state machine.
//!
//! Like the rest of the core it owns no thread: something else (see
//! [`super::CountdownTimer`]) calls `tick(now)` at the cadence the engine asks
//! for.
//!
//! ## State Transitions
//!
//! ```text
//! Running -> Expired
//! ```
//!
//! There is no way back. Editing a goal's deadline means building a new
//! engine, which also resets the expiry flag and the progress baseline.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::goal::Goal;
use crate::time::TimeRemaining;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownState {
    Running,
    Expired,
}

/// Tick periods. `fast_ms` applies once `fast_threshold_ms` or less remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub normal_ms: u64,
    pub fast_ms: u64,
    pub fast_threshold_ms: u64,
    pub fast_path: bool,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            normal_ms: 1_000,
            fast_ms: 100,
            fast_threshold_ms: 60_000,
            fast_path: true,
        }
    }
}

impl Cadence {
    pub fn period_for(&self, remaining: &TimeRemaining) -> Duration {
        if self.fast_path && remaining.total_ms <= self.fast_threshold_ms {
            Duration::from_millis(self.fast_ms)
        } else {
            Duration::from_millis(self.normal_ms)
        }
    }
}

/// True when `a` and `b` would drive the same countdown: same goal, same
/// deadline, same creation baseline.
pub fn same_countdown(a: &Goal, b: &Goal) -> bool {
    a.id == b.id
        && a.deadline_date == b.deadline_date
        && a.deadline_time == b.deadline_time
        && a.created_at == b.created_at
}

#[derive(Debug, Clone)]
pub struct CountdownEngine {
    /// The goal as it was when this engine was built.
    goal: Goal,
    /// `deadline - created_at` in ms; `None` when either is unreadable.
    baseline_ms: Option<i64>,
    state: CountdownState,
    remaining: TimeRemaining,
    /// Guards the expiry event against firing twice.
    notified: bool,
}

impl CountdownEngine {
    /// Starts `Expired` (without firing) if the deadline has already passed.
    pub fn new(goal: &Goal, now: DateTime<Local>) -> Self {
        let remaining = goal.remaining(now);
        let expired = goal.is_expired(now);
        let baseline_ms = match (goal.deadline(), goal.created()) {
            (Some(deadline), Some(created)) => {
                Some(deadline.timestamp_millis() - created.timestamp_millis())
            }
            _ => None,
        };
        Self {
            goal: goal.clone(),
            baseline_ms,
            state: if expired {
                CountdownState::Expired
            } else {
                CountdownState::Running
            },
            remaining,
            notified: expired,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn goal_id(&self) -> &str {
        &self.goal.id
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn remaining(&self) -> TimeRemaining {
        self.remaining
    }

    /// Whether this engine is still valid for `goal`.
    pub fn tracks(&self, goal: &Goal) -> bool {
        same_countdown(&self.goal, goal)
    }

    /// 0.0 ..= 100.0 of the way from creation to deadline, as of the last
    /// tick. A non-positive or unreadable baseline reads as 100.
    pub fn progress_pct(&self) -> f64 {
        let Some(total) = self.baseline_ms.filter(|t| *t > 0) else {
            return 100.0;
        };
        let total = total as f64;
        let elapsed = total - self.remaining.total_ms as f64;
        (elapsed / total).clamp(0.0, 1.0) * 100.0
    }

    /// How long to wait before the next tick. `None` once expired.
    pub fn cadence(&self, cadence: &Cadence) -> Option<Duration> {
        match self.state {
            CountdownState::Running => Some(cadence.period_for(&self.remaining)),
            CountdownState::Expired => None,
        }
    }

    pub fn snapshot(&self, now: DateTime<Local>) -> Event {
        Event::CountdownTick {
            goal_id: self.goal.id.clone(),
            state: self.state,
            remaining: self.remaining,
            progress_pct: self.progress_pct(),
            at: now.with_timezone(&Utc),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Recompute the remaining time. Returns `Some(Event::GoalExpired)` on the
    /// tick that reaches zero, and never again.
    pub fn tick(&mut self, now: DateTime<Local>) -> Option<Event> {
        match self.state {
            CountdownState::Expired => None,
            CountdownState::Running => {
                self.remaining = self.goal.remaining(now);
                if !self.remaining.is_zero() {
                    return None;
                }
                self.state = CountdownState::Expired;
                if self.notified {
                    return None;
                }
                self.notified = true;
                Some(Event::GoalExpired {
                    goal_id: self.goal.id.clone(),
                    at: now.with_timezone(&Utc),
                })
            }
        }
    }
}
