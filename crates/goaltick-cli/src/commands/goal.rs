use chrono::{Local, Utc};
use clap::Subcommand;
use goaltick_core::goal::{validate_new, validate_patch};
use goaltick_core::list::arrange;
use goaltick_core::{Event, FilterMode, Goal, GoalPatch, GoalRepository, NewGoal, SortKey};

use super::{ensure_saved, goal_line, watch, CmdResult, Context};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a goal
    Add {
        /// Goal title
        title: String,
        /// Deadline date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Deadline time (HH:MM, 24-hour)
        #[arg(long)]
        time: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
    /// List goals
    List {
        /// all, active or expired
        #[arg(long)]
        filter: Option<FilterMode>,
        /// deadline, created or title
        #[arg(long)]
        sort: Option<SortKey>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one goal and its countdown
    Show {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a goal
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
        /// New deadline date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// New deadline time (HH:MM)
        #[arg(long)]
        time: Option<String>,
    },
    /// Delete a goal
    Delete { id: String },
    /// Delete every goal
    Clear,
    /// Live countdown board with reminders (Ctrl-C to quit)
    Watch {
        #[arg(long)]
        filter: Option<FilterMode>,
        #[arg(long)]
        sort: Option<SortKey>,
    },
}

pub async fn run(action: GoalAction) -> CmdResult {
    let ctx = Context::open()?;

    match action {
        GoalAction::Add {
            title,
            date,
            time,
            description,
        } => {
            let now = Local::now();
            let input = NewGoal {
                title,
                description,
                deadline_date: date,
                deadline_time: time,
            };
            validate_new(&input, &ctx.config.validation, now)?;
            let goal = Goal::from_input(input, GoalRepository::generate_id(), now);
            ensure_saved(ctx.repo.create(goal.clone()).await, "save the goal")?;
            eprintln!("Goal created: {}", goal.id);
            print_event(&Event::GoalCreated {
                goal_id: goal.id,
                at: Utc::now(),
            })?;
        }
        GoalAction::List { filter, sort, json } => {
            let now = Local::now();
            let filter = filter.unwrap_or(ctx.config.display.default_filter);
            let sort = sort.unwrap_or(ctx.config.display.default_sort);
            let goals = arrange(&ctx.repo.get_all().await, filter, sort, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&goals)?);
            } else if goals.is_empty() {
                println!("No goals.");
            } else {
                for goal in &goals {
                    println!("{}", goal_line(goal, now));
                }
            }
        }
        GoalAction::Show { id, json } => {
            let goal = find(&ctx, &id).await?;
            let now = Local::now();
            if json {
                let view = serde_json::json!({
                    "goal": goal,
                    "expired": goal.is_expired(now),
                    "remaining": goal.remaining(now),
                    "deadline": goal.formatted_deadline(),
                });
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}", goal.title);
                if let Some(description) = &goal.description {
                    println!("  {description}");
                }
                println!("  Deadline: {}", goal.formatted_deadline());
                if goal.is_expired(now) {
                    println!("  Expired");
                } else {
                    println!("  Remaining: {}", goal.remaining(now).format_compact());
                }
            }
        }
        GoalAction::Edit {
            id,
            title,
            description,
            clear_description,
            date,
            time,
        } => {
            let goal = find(&ctx, &id).await?;
            let patch = GoalPatch {
                title,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
                deadline_date: date,
                deadline_time: time,
                notification_ids: None,
            };
            if patch.is_empty() {
                return Err("nothing to change".into());
            }
            validate_patch(&goal, &patch, &ctx.config.validation, Local::now())?;

            let deadline_changed = patch.touches_deadline();
            ensure_saved(ctx.repo.update(&id, patch).await, "update the goal")?;
            if deadline_changed {
                // A moved deadline earns a fresh late notice.
                ctx.repo.clear_notified(&id).await;
            }
            print_event(&Event::GoalUpdated {
                goal_id: id,
                deadline_changed,
                at: Utc::now(),
            })?;
        }
        GoalAction::Delete { id } => {
            ensure_saved(ctx.repo.delete(&id).await, "delete the goal")?;
            ctx.repo.clear_notified(&id).await;
            print_event(&Event::GoalDeleted {
                goal_id: id,
                at: Utc::now(),
            })?;
        }
        GoalAction::Clear => {
            ensure_saved(ctx.repo.clear_all().await, "clear goals")?;
            println!("all goals removed");
        }
        GoalAction::Watch { filter, sort } => {
            let filter = filter.unwrap_or(ctx.config.display.default_filter);
            let sort = sort.unwrap_or(ctx.config.display.default_sort);
            watch::run(ctx, filter, sort).await?;
        }
    }
    Ok(())
}

async fn find(ctx: &Context, id: &str) -> Result<Goal, Box<dyn std::error::Error>> {
    ctx.repo
        .get(id)
        .await
        .ok_or_else(|| format!("goal not found: {id}").into())
}

fn print_event(event: &Event) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}
