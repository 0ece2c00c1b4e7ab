pub mod config;
pub mod goal;
mod watch;

use std::sync::Arc;

use chrono::{DateTime, Local};
use goaltick_core::{Config, Goal, GoalRepository, SqliteStore};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// What every goal command needs: the repository and the user's config.
pub struct Context {
    pub repo: GoalRepository,
    pub config: Config,
}

impl Context {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let store = SqliteStore::open()?;
        Ok(Self {
            repo: GoalRepository::new(Arc::new(store)),
            config: Config::load_or_default(),
        })
    }
}

/// One line per goal: status, id, title, deadline, time left.
pub fn goal_line(goal: &Goal, now: DateTime<Local>) -> String {
    let status = if goal.is_expired(now) { "expired" } else { "active " };
    let left = if goal.is_expired(now) {
        "-".to_string()
    } else {
        goal.remaining(now).format_compact()
    };
    format!(
        "{status}  {}  {}  ({})  {left}",
        goal.id,
        goal.title,
        goal.formatted_deadline()
    )
}

/// Surface a fail-soft storage result as a retryable error.
pub fn ensure_saved(ok: bool, what: &str) -> CmdResult {
    if ok {
        Ok(())
    } else {
        Err(format!("could not {what}; storage is unavailable, please try again").into())
    }
}
