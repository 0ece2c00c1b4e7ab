//! Goal records and their edits.
//!
//! Field names serialize in camelCase so a collection written by the mobile
//! app loads unchanged.

mod validation;

pub use validation::{validate_new, validate_patch, ValidationLimits, ValidationReport};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::time::{self, TimeRemaining};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// A goal with a local deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `YYYY-MM-DD`
    pub deadline_date: String,
    /// `HH:MM`, 24-hour
    pub deadline_time: String,
    /// ISO-8601, set once at creation.
    pub created_at: String,
    /// Handles returned by the notification scheduler.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notification_ids: Vec<String>,
}

/// What the user types in when creating a goal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub deadline_date: String,
    pub deadline_time: String,
}

/// Field-by-field edit of a [`Goal`]. `None` keeps the stored value.
///
/// `description` is doubly optional: `Some(None)` clears it.
/// `id` and `created_at` are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub deadline_date: Option<String>,
    pub deadline_time: Option<String>,
    pub notification_ids: Option<Vec<String>>,
}

impl Goal {
    /// Build a record from user input. Title and description are trimmed; an
    /// empty description is dropped. The deadline is stored zero-padded.
    pub fn from_input(input: NewGoal, id: String, now: DateTime<Local>) -> Self {
        Self {
            id,
            title: input.title.trim().to_string(),
            description: normalize_description(input.description),
            deadline_date: time::canonical_date(&input.deadline_date),
            deadline_time: time::canonical_time(&input.deadline_time),
            created_at: iso_timestamp(now),
            notification_ids: Vec::new(),
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Local>> {
        time::deadline_instant(&self.deadline_date, &self.deadline_time)
    }

    pub fn created(&self) -> Option<DateTime<Local>> {
        time::parse_created_at(&self.created_at)
    }

    pub fn is_expired(&self, now: DateTime<Local>) -> bool {
        time::is_expired(&self.deadline_date, &self.deadline_time, now)
    }

    pub fn remaining(&self, now: DateTime<Local>) -> TimeRemaining {
        time::compute_remaining(&self.deadline_date, &self.deadline_time, now)
    }

    pub fn formatted_deadline(&self) -> String {
        time::format_deadline(&self.deadline_date, &self.deadline_time)
    }

    /// Merge a patch over this record. Patch values win.
    pub fn apply(&mut self, patch: GoalPatch) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = normalize_description(description);
        }
        if let Some(date) = patch.deadline_date {
            self.deadline_date = time::canonical_date(&date);
        }
        if let Some(time_of_day) = patch.deadline_time {
            self.deadline_time = time::canonical_time(&time_of_day);
        }
        if let Some(ids) = patch.notification_ids {
            self.notification_ids = ids;
        }
    }
}

impl GoalPatch {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_deadline(mut self, date: impl Into<String>, time: impl Into<String>) -> Self {
        self.deadline_date = Some(date.into());
        self.deadline_time = Some(time.into());
        self
    }

    pub fn with_notification_ids(mut self, ids: Vec<String>) -> Self {
        self.notification_ids = Some(ids);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &GoalPatch::default()
    }

    /// True when applying this patch may move the deadline. Countdowns and
    /// notified flags for the goal must then be reset.
    pub fn touches_deadline(&self) -> bool {
        self.deadline_date.is_some() || self.deadline_time.is_some()
    }
}

/// `<epoch millis><9 base-36 chars>`.
///
/// Unique enough for a single-device, single-writer store; collisions are
/// unlikely, not impossible.
pub fn generate_id() -> String {
    generate_id_with(Utc::now().timestamp_millis(), &mut rand::thread_rng())
}

pub fn generate_id_with<R: Rng + ?Sized>(epoch_ms: i64, rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{epoch_ms}{suffix}")
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn iso_timestamp(now: DateTime<Local>) -> String {
    now.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
