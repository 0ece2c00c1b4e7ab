//! `goal watch`: a live countdown board.
//!
//! Countdown tasks write their latest snapshot into a shared table; this loop
//! redraws it once a second, reloads goals from storage so edits made from
//! another shell show up, and tears everything down on Ctrl-C.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use goaltick_core::list::arrange;
use goaltick_core::notify::notify_expired;
use goaltick_core::{
    Clock, CountdownBoard, CountdownObserver, CountdownState, Event, FilterMode, Goal,
    Notification, NotificationSink, ReminderBook, SortKey, SystemClock, TimeRemaining,
    TokioScheduler,
};
use tokio::sync::mpsc;

use super::{CmdResult, Context};

const REDRAW_EVERY: Duration = Duration::from_secs(1);
const RELOAD_EVERY: Duration = Duration::from_secs(5);

/// Prints due reminders inline.
struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn deliver(&self, notification: &Notification) {
        println!("\x07[reminder] {}", notification.message);
    }
}

#[derive(Clone, Copy)]
struct Row {
    state: CountdownState,
    remaining: TimeRemaining,
    progress_pct: f64,
}

/// Latest snapshot per goal, plus a channel for expiries.
struct Screen {
    rows: Mutex<HashMap<String, Row>>,
    expired_tx: mpsc::UnboundedSender<String>,
}

impl CountdownObserver for Screen {
    fn on_tick(&self, snapshot: &Event) {
        if let Event::CountdownTick {
            goal_id,
            state,
            remaining,
            progress_pct,
            ..
        } = snapshot
        {
            self.rows.lock().unwrap_or_else(|e| e.into_inner()).insert(
                goal_id.clone(),
                Row {
                    state: *state,
                    remaining: *remaining,
                    progress_pct: *progress_pct,
                },
            );
        }
    }

    fn on_expired(&self, goal_id: &str) {
        // Receiver gone means we are shutting down.
        let _ = self.expired_tx.send(goal_id.to_string());
    }
}

pub async fn run(ctx: Context, filter: FilterMode, sort: SortKey) -> CmdResult {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sink: Arc<dyn NotificationSink> = Arc::new(TerminalSink);
    let late_message = ctx.config.notifications.late_message.clone();

    let (expired_tx, mut expired_rx) = mpsc::unbounded_channel();
    let screen = Arc::new(Screen {
        rows: Mutex::new(HashMap::new()),
        expired_tx,
    });
    let mut board = CountdownBoard::new(
        Arc::clone(&clock),
        ctx.config.countdown.cadence(),
        screen.clone(),
    );
    let scheduler = Arc::new(TokioScheduler::new(
        Arc::clone(&sink),
        Arc::clone(&clock),
        ctx.config.notifications.enabled,
    ));
    let mut reminders = ReminderBook::new(scheduler.clone(), ctx.config.notifications.policy());

    let mut goals = load(&ctx, filter, sort).await;
    notify_expired(&ctx.repo, sink.as_ref(), &goals, &late_message, clock.now()).await;
    log_scheduled(reminders.reconcile(&ctx.repo, &goals, clock.now()).await);
    board.sync(&goals);
    tracing::info!(goals = goals.len(), "watching");

    let mut redraw = tokio::time::interval(REDRAW_EVERY);
    let mut reload = tokio::time::interval(RELOAD_EVERY);
    reload.reset();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(goal_id) = expired_rx.recv() => {
                // Seen live; no late notice needed later.
                ctx.repo.mark_notified(&goal_id).await;
            }
            _ = redraw.tick() => draw(&goals, &screen),
            _ = reload.tick() => {
                goals = load(&ctx, filter, sort).await;
                screen
                    .rows
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .retain(|id, _| goals.iter().any(|g| &g.id == id));
                log_scheduled(reminders.reconcile(&ctx.repo, &goals, clock.now()).await);
                board.sync(&goals);
            }
        }
    }

    board.shutdown();
    reminders.release(&ctx.repo).await;
    scheduler.cancel_all();
    println!();
    Ok(())
}

fn log_scheduled(events: Vec<Event>) {
    for event in events {
        tracing::info!(?event, "reminders scheduled");
    }
}

async fn load(ctx: &Context, filter: FilterMode, sort: SortKey) -> Vec<Goal> {
    arrange(&ctx.repo.get_all().await, filter, sort, Local::now())
}

fn draw(goals: &[Goal], screen: &Screen) {
    let rows = screen.rows.lock().unwrap_or_else(|e| e.into_inner());
    print!("\x1b[2J\x1b[H");
    println!("{:<24} {:<16} {:>7}  DEADLINE", "GOAL", "LEFT", "DONE");
    for goal in goals {
        let Some(row) = rows.get(&goal.id) else {
            continue;
        };
        let left = match row.state {
            CountdownState::Running => row.remaining.format_compact(),
            CountdownState::Expired => "expired".to_string(),
        };
        println!(
            "{:<24} {:<16} {:>6.1}%  {}",
            truncate(&goal.title, 24),
            left,
            row.progress_pct,
            goal.formatted_deadline()
        );
    }
    if goals.is_empty() {
        println!("No goals.");
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width - 1).collect();
        out.push('~');
        out
    }
}
