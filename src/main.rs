mod app;
mod domain;
mod input;
mod logging;
mod notifications;
mod persistence;
mod repository;
mod session;
mod ticker;

use anyhow::{bail, Context, Result};
use app::{App, TaskEdit};
use clap::{Parser, Subcommand};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::Print,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use domain::views::{render_task, short_id, task_line};
use domain::{find_path, Priority, SubtaskPath, TimeBlock, DEFAULT_SUBTASK_MINUTES};
use persistence::{ensure_data_dir, init_local_dir};
use session::{FocusState, SessionHandle, SessionOptions};
use std::io::{self, Write};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "focusline")]
#[command(about = "A local-first task tracker with nested subtasks and a focus timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .focusline directory in the current directory
    Init,
    /// Add a task
    Add {
        title: String,
        /// morning, evening or night
        #[arg(short, long, value_parser = parse_block)]
        block: Option<TimeBlock>,
        /// IAP, IBNU, NIBU or NINU
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long)]
        hours: Option<i32>,
        #[arg(long)]
        minutes: Option<i32>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Edit a task in place
    Edit {
        /// Task id or id prefix
        task: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long, value_parser = parse_block)]
        block: Option<TimeBlock>,
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long)]
        hours: Option<i32>,
        #[arg(long)]
        minutes: Option<i32>,
        /// New notes; an empty string clears them
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Delete a task (completed tasks are kept in the history)
    Delete { task: String },
    /// List tasks, grouped by time block
    List {
        #[arg(short, long, value_parser = parse_block)]
        block: Option<TimeBlock>,
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<Priority>,
    },
    /// Show a task with its subtask tree
    Show { task: String },
    /// Add or remove subtasks
    Subtask {
        #[command(subcommand)]
        action: SubtaskCommand,
    },
    /// Toggle a subtask, addressed by path like 0-1-2 or by subtask id
    Toggle { task: String, target: String },
    /// Toggle a whole task complete or open
    Complete { task: String },
    /// Run a focus session over the task's subtasks
    Focus {
        task: String,
        /// Break length for this session
        #[arg(long)]
        break_minutes: Option<i64>,
    },
    /// Completed tasks that were deleted
    History,
    /// Show or change settings
    Config {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        break_minutes: Option<i64>,
        #[arg(long)]
        notifications: Option<bool>,
    },
}

#[derive(Subcommand)]
enum SubtaskCommand {
    /// Add a subtask, at the top level or under --parent
    Add {
        task: String,
        title: String,
        #[arg(long)]
        parent: Option<SubtaskPath>,
        #[arg(short, long, default_value_t = DEFAULT_SUBTASK_MINUTES)]
        minutes: i32,
    },
    /// Remove the subtask at a path and everything below it
    Remove { task: String, path: SubtaskPath },
}

fn parse_block(value: &str) -> Result<TimeBlock, String> {
    TimeBlock::from_tag(value).ok_or_else(|| format!("unknown time block '{}'", value))
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::from_tag(value).ok_or_else(|| format!("unknown priority '{}'", value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Init) = cli.command {
        let data_dir = init_local_dir()?;
        println!("Initialized focusline directory: {}", data_dir.display());
        println!();
        println!("focusline will now use this local directory for task storage.");
        return Ok(());
    }

    let data_dir = ensure_data_dir()?;
    if let Err(err) = logging::init_logging(&data_dir) {
        eprintln!("Warning: logging disabled: {:#}", err);
    }
    let mut app = App::open(&data_dir)?;

    match cli.command.unwrap_or(Commands::List {
        block: None,
        priority: None,
    }) {
        Commands::Init => Ok(()),
        Commands::Add {
            title,
            block,
            priority,
            hours,
            minutes,
            notes,
        } => {
            let edit = TaskEdit {
                title: None,
                block,
                priority,
                hours,
                minutes,
                notes,
            };
            let task = app.add_task(&title, &edit)?;
            println!("Added {} {}", short_id(&task.id), task.title);
            Ok(())
        }
        Commands::Edit {
            task,
            title,
            block,
            priority,
            hours,
            minutes,
            notes,
        } => {
            let edit = TaskEdit {
                title,
                block,
                priority,
                hours,
                minutes,
                notes,
            };
            let task = app.update_task(&task, &edit)?;
            print!("{}", render_task(&task));
            Ok(())
        }
        Commands::Delete { task } => {
            let task = app.delete_task(&task)?;
            println!("Deleted {} {}", short_id(&task.id), task.title);
            Ok(())
        }
        Commands::List { block, priority } => {
            list_tasks(&app, block, priority);
            Ok(())
        }
        Commands::Show { task } => {
            print!("{}", render_task(&app.find_task(&task)?));
            Ok(())
        }
        Commands::Subtask { action } => {
            let task = match action {
                SubtaskCommand::Add {
                    task,
                    title,
                    parent,
                    minutes,
                } => app.add_subtask(&task, parent.as_ref(), &title, minutes)?,
                SubtaskCommand::Remove { task, path } => app.remove_subtask(&task, &path)?,
            };
            print!("{}", render_task(&task));
            Ok(())
        }
        Commands::Toggle { task, target } => {
            let task = app.find_task(&task)?;
            let path = match target.parse::<SubtaskPath>() {
                Ok(path) => path,
                Err(_) => find_path(&task.subtasks, &target)
                    .with_context(|| format!("No subtask '{}' in task {}", target, task.id))?,
            };
            let task = app
                .toggle_subtask(&task.id, &path)
                .with_context(|| format!("Task {} disappeared", task.id))?;
            print!("{}", render_task(&task));
            Ok(())
        }
        Commands::Complete { task } => {
            let task = app.toggle_task_complete(&task)?;
            println!("{}", task_line(&task));
            Ok(())
        }
        Commands::Focus {
            task,
            break_minutes,
        } => run_focus(&app, &task, break_minutes),
        Commands::History => {
            let history = app.history()?;
            if history.is_empty() {
                println!("No completed tasks in history");
            }
            for record in history {
                println!(
                    "{}  {} [{}|{}]",
                    record.date_key,
                    record.title,
                    record.priority.to_tag(),
                    record.block.to_tag()
                );
            }
            Ok(())
        }
        Commands::Config {
            user,
            break_minutes,
            notifications,
        } => {
            let mut config = app.config().clone();
            let changed = user.is_some() || break_minutes.is_some() || notifications.is_some();
            if let Some(user) = user {
                config.user_id = user;
            }
            if let Some(minutes) = break_minutes {
                if minutes < 1 {
                    bail!("Break length must be at least one minute");
                }
                config.break_minutes = minutes;
            }
            if let Some(enabled) = notifications {
                config.notifications = enabled;
            }
            if changed {
                app.update_config(config)?;
            }
            println!("{}", serde_json::to_string_pretty(app.config())?);
            Ok(())
        }
    }
}

fn list_tasks(app: &App, block: Option<TimeBlock>, priority: Option<Priority>) {
    let tasks = app.filter_tasks(block, priority);
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }

    for block in TimeBlock::all() {
        let in_block: Vec<_> = tasks.iter().filter(|task| task.block == *block).collect();
        if in_block.is_empty() {
            continue;
        }
        println!("{}", block.to_tag());
        for task in in_block {
            println!("  {}", task_line(task));
        }
    }
}

fn run_focus(app: &App, task: &str, break_minutes: Option<i64>) -> Result<()> {
    let task = app.find_task(task)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .build()
        .context("Failed to start timer runtime")?;

    let mut options = SessionOptions::from_config(app.config());
    if let Some(minutes) = break_minutes {
        options.break_minutes = minutes;
    }
    let session = SessionHandle::new(app.repository(), runtime.handle().clone(), options);
    if !session.open(&task.id) {
        bail!("Task {} not found", task.id);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = focus_loop(&mut stdout, &session);
    session.close();

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout, Show, LeaveAlternateScreen)?;
    runtime.shutdown_timeout(Duration::from_millis(200));

    result?;
    let task = app.find_task(&task.id)?;
    println!("{}", task_line(&task));
    Ok(())
}

fn focus_loop(out: &mut impl Write, session: &SessionHandle) -> Result<()> {
    let tick_rate = ticker::tick_duration();

    loop {
        draw_focus(out, &session.state())?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                // Only process key press events (ignore key release)
                if key.kind == KeyEventKind::Press && input::handle_key(session, key) {
                    return Ok(());
                }
            }
        }
    }
}

fn draw_focus(out: &mut impl Write, state: &FocusState) -> Result<()> {
    queue!(out, Clear(ClearType::All))?;
    let mut row = 0;
    for line in state.status_lines() {
        queue!(out, MoveTo(0, row), Print(line))?;
        row += 1;
    }
    queue!(
        out,
        MoveTo(0, row + 1),
        Print("space start/pause  r reset  b break  +/- break length  \u{2190}/\u{2192} subtask  q quit")
    )?;
    out.flush()?;
    Ok(())
}
