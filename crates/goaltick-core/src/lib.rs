//! # Goaltick Core Library
//!
//! Business logic for Goaltick, a deadline tracker: goals carry a local
//! deadline, show a live countdown, and can trigger reminders before or after
//! that deadline. The `goaltick` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Time**: pure deadline arithmetic over `"YYYY-MM-DD"` / `"HH:MM"` pairs
//! - **Countdown**: a per-goal state machine plus a tokio driver that ticks it
//! - **Repository**: goal CRUD over an opaque key-value store, fail-soft
//! - **List**: filter and ordering rules for display
//! - **Notify**: reminder scheduling behind a trait
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: Countdown state machine
//! - [`GoalRepository`]: Goal persistence
//! - [`Config`]: Application configuration management
//! - [`NotificationScheduler`]: Trait for reminder delivery

pub mod countdown;
pub mod error;
pub mod events;
pub mod goal;
pub mod list;
pub mod notify;
pub mod repository;
pub mod storage;
pub mod time;

pub use countdown::{
    Cadence, CountdownBoard, CountdownEngine, CountdownHandle, CountdownObserver, CountdownState,
    CountdownTimer,
};
pub use error::{ConfigError, CoreError, StorageError};
pub use events::Event;
pub use goal::{Goal, GoalPatch, NewGoal, ValidationLimits, ValidationReport};
pub use list::{FilterMode, SortKey};
pub use notify::{
    Notification, NotificationScheduler, NotificationSink, ReminderBook, ReminderOffset,
    ReminderPolicy, TokioScheduler,
};
pub use repository::GoalRepository;
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
pub use time::{Clock, ManualClock, SystemClock, TimeRemaining};
