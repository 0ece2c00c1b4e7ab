//! Input policy for creating and editing goals.
//!
//! Problems are collected, not short-circuited, so the user sees every
//! message at once before anything is written.

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Goal, GoalPatch, NewGoal};
use crate::time;

/// Rejected input, one human-readable line per problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .messages.join("; "))]
pub struct ValidationReport {
    pub messages: Vec<String>,
}

/// Length limits, configurable under `[validation]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLimits {
    #[serde(default = "default_title_min")]
    pub title_min: usize,
    #[serde(default = "default_title_max")]
    pub title_max: usize,
    #[serde(default = "default_description_max")]
    pub description_max: usize,
}

fn default_title_min() -> usize {
    3
}
fn default_title_max() -> usize {
    100
}
fn default_description_max() -> usize {
    500
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            title_min: default_title_min(),
            title_max: default_title_max(),
            description_max: default_description_max(),
        }
    }
}

/// Check a new goal against the limits and against `now`.
pub fn validate_new(
    input: &NewGoal,
    limits: &ValidationLimits,
    now: DateTime<Local>,
) -> Result<(), ValidationReport> {
    let mut messages = Vec::new();
    check_title(&input.title, limits, &mut messages);
    if let Some(description) = &input.description {
        check_description(description, limits, &mut messages);
    }
    check_deadline(&input.deadline_date, &input.deadline_time, now, &mut messages);
    finish(messages)
}

/// Check only the fields a patch touches. The deadline is checked as the
/// merged date/time pair, so changing just the time on a future date works.
pub fn validate_patch(
    base: &Goal,
    patch: &GoalPatch,
    limits: &ValidationLimits,
    now: DateTime<Local>,
) -> Result<(), ValidationReport> {
    let mut messages = Vec::new();
    if let Some(title) = &patch.title {
        check_title(title, limits, &mut messages);
    }
    if let Some(Some(description)) = &patch.description {
        check_description(description, limits, &mut messages);
    }
    if patch.touches_deadline() {
        let date = patch.deadline_date.as_deref().unwrap_or(&base.deadline_date);
        let time = patch.deadline_time.as_deref().unwrap_or(&base.deadline_time);
        check_deadline(date, time, now, &mut messages);
    }
    finish(messages)
}

fn finish(messages: Vec<String>) -> Result<(), ValidationReport> {
    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport { messages })
    }
}

fn check_title(title: &str, limits: &ValidationLimits, messages: &mut Vec<String>) {
    let len = title.trim().chars().count();
    if len == 0 {
        messages.push("Title is required".to_string());
    } else if len < limits.title_min {
        messages.push(format!(
            "Title must be at least {} characters",
            limits.title_min
        ));
    } else if len > limits.title_max {
        messages.push(format!(
            "Title must be at most {} characters",
            limits.title_max
        ));
    }
}

fn check_description(description: &str, limits: &ValidationLimits, messages: &mut Vec<String>) {
    if description.trim().chars().count() > limits.description_max {
        messages.push(format!(
            "Description must be at most {} characters",
            limits.description_max
        ));
    }
}

fn check_deadline(date: &str, time_of_day: &str, now: DateTime<Local>, messages: &mut Vec<String>) {
    let parsed_date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok();
    let parsed_time = NaiveTime::parse_from_str(time_of_day.trim(), "%H:%M").ok();

    match parsed_date {
        None => messages.push("Deadline date must be in YYYY-MM-DD format".to_string()),
        Some(day) if day < now.date_naive() => {
            messages.push("Deadline date cannot be in the past".to_string())
        }
        _ => {}
    }
    if parsed_time.is_none() {
        messages.push("Deadline time must be in HH:MM format".to_string());
    }

    // Same-day deadlines need the full date-time comparison.
    if let (Some(day), Some(_)) = (parsed_date, parsed_time) {
        if day == now.date_naive() && time::is_expired(date, time_of_day, now) {
            messages.push("Deadline time must be later than the current time".to_string());
        }
    }
}
