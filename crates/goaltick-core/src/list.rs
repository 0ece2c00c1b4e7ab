//! Filtering and ordering of the goal collection for display.
//!
//! Expiry is evaluated against the `now` passed in, never cached. All sorts
//! are stable.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::goal::Goal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Soonest deadline first.
    #[default]
    Deadline,
    /// Oldest goal first.
    Created,
    Title,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown filter '{other}' (expected all, active, expired)")),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deadline" => Ok(Self::Deadline),
            "created" => Ok(Self::Created),
            "title" => Ok(Self::Title),
            other => Err(format!("unknown sort key '{other}' (expected deadline, created, title)")),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Expired => "expired",
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deadline => "deadline",
            Self::Created => "created",
            Self::Title => "title",
        })
    }
}

/// Keep goals matching `mode`. `Active` and `Expired` partition the input.
pub fn filter(goals: &[Goal], mode: FilterMode, now: DateTime<Local>) -> Vec<Goal> {
    goals
        .iter()
        .filter(|g| match mode {
            FilterMode::All => true,
            FilterMode::Active => !g.is_expired(now),
            FilterMode::Expired => g.is_expired(now),
        })
        .cloned()
        .collect()
}

/// Stable sort by `key`, ascending.
pub fn sort(goals: &mut [Goal], key: SortKey) {
    goals.sort_by(|a, b| compare(a, b, key));
}

/// Filter, then sort. Under [`FilterMode::All`] expired goals always follow
/// active ones; the sort key applies within each group.
pub fn arrange(
    goals: &[Goal],
    mode: FilterMode,
    key: SortKey,
    now: DateTime<Local>,
) -> Vec<Goal> {
    let mut shown = filter(goals, mode, now);
    if mode == FilterMode::All {
        let mut keyed: Vec<(bool, Goal)> = shown
            .into_iter()
            .map(|g| (g.is_expired(now), g))
            .collect();
        keyed.sort_by(|(a_expired, a), (b_expired, b)| {
            a_expired
                .cmp(b_expired)
                .then_with(|| compare(a, b, key))
        });
        shown = keyed.into_iter().map(|(_, g)| g).collect();
    } else {
        sort(&mut shown, key);
    }
    shown
}

fn compare(a: &Goal, b: &Goal, key: SortKey) -> Ordering {
    match key {
        SortKey::Deadline => cmp_missing_last(a.deadline(), b.deadline()),
        SortKey::Created => cmp_missing_last(a.created(), b.created()),
        SortKey::Title => compare_titles(&a.title, &b.title),
    }
}

/// Unparseable instants sort after every valid one.
fn cmp_missing_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Dictionary order: case folded first, then lowercase before uppercase so
/// "apple" < "Apple" < "banana".
///
/// Not locale-aware: folded titles compare by code point, so accented
/// initials land after plain ASCII ("zebra" < "Éclair").
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}
