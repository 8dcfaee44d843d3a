//! # todocal
//!
//! A terminal to-do list with categories, priorities, repeating tasks and a
//! month calendar. Run without arguments for the interactive UI, or use the
//! subcommands for scripting.
//!
//! ## Usage
//!
//! ```bash
//! # One-off task
//! todocal add "Write report" --category work --priority high --due 2024-03-01 --time 9:30am
//!
//! # Five weekday occurrences starting on the anchor date
//! todocal add "gym" --due 2024-03-01 --repeat weekdays
//!
//! # This week's work tasks
//! todocal list --category work --view weekly
//!
//! # Month view with priority markers
//! todocal calendar --month 2024-03
//! ```
//!
//! ## Data Storage
//!
//! Tasks live in `<data dir>/todocal/<owner>/tasks.json` by default. Set
//! `TODOCAL_DB` to use another directory, or point `storage.backend` at a
//! hosted task service in `config.toml`.

use std::io;
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use todocal::clock::SystemClock;
use todocal::commands::*;
use todocal::config::{Backend, Config};
use todocal::error::{Error, Result};
use todocal::models::{Category, TaskId};
use todocal::ordering::{DateView, TaskFilter};
use todocal::storage::JsonFileStore;
use todocal::tui::run_tui;

#[derive(Parser)]
#[command(name = "todocal")]
#[command(about = "Terminal to-do list with repeating tasks and a calendar", long_about = None)]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct FieldArgs {
    /// Category: work, personal, exercise, rest (or all for none)
    #[arg(short, long)]
    category: Option<String>,
    /// Priority: high, medium, low, none
    #[arg(short, long)]
    priority: Option<String>,
    /// Display emoji
    #[arg(short, long)]
    emoji: Option<String>,
    /// Due date in YYYY-MM-DD
    #[arg(short, long)]
    due: Option<String>,
    /// Due time as H:MM, optionally with am/pm (e.g. 9:30pm)
    #[arg(short, long)]
    time: Option<String>,
    /// am or pm, when --time has no suffix
    #[arg(long)]
    ampm: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task text (quoted if it has spaces)
        text: String,
        #[command(flatten)]
        fields: FieldArgs,
        /// Repeat: none, daily, weekly, monthly, weekdays
        #[arg(short, long)]
        repeat: Option<String>,
        /// Print the occurrence dates without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// List tasks in display order
    List {
        /// Only this category (uncategorized tasks always show)
        #[arg(short, long, default_value = "all")]
        category: String,
        /// Date view: all, daily, weekly, monthly
        #[arg(short, long, default_value = "all")]
        view: String,
        /// Case-insensitive text search
        #[arg(short, long)]
        search: Option<String>,
        /// Hide completed tasks
        #[arg(long)]
        pending: bool,
    },
    /// Mark a task as complete
    Complete {
        id: TaskId,
        /// Mark as pending again
        #[arg(long)]
        undo: bool,
    },
    /// Edit a task (pass an empty string to clear due date, time or emoji)
    Edit {
        id: TaskId,
        /// New task text
        #[arg(short = 'x', long)]
        text: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
        /// New repeat tag (existing occurrences are not regenerated)
        #[arg(short, long)]
        repeat: Option<String>,
    },
    /// Remove a task
    Remove { id: TaskId },
    /// Show a month with priority markers per day
    Calendar {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
    },
    /// List the tasks due on one date
    Day {
        /// Date in YYYY-MM-DD (defaults to today)
        date: Option<String>,
    },
    /// Delete all local tasks for the configured owner
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

impl FieldArgs {
    fn into_input(self, text: Option<String>, repeat: Option<String>) -> TaskInput {
        TaskInput {
            text,
            category: self.category,
            priority: self.priority,
            repetition: repeat,
            emoji: self.emoji,
            due: self.due,
            time: self.time,
            meridiem: self.ampm,
        }
    }
}

fn main() {
    todocal::logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        if err.is_validation() {
            tracing::warn!(error = %err, "rejected input");
        } else {
            tracing::error!(error = %err, "command failed");
        }
        eprintln!("Error: {err}");
        if let Error::PartialCreation { .. } = err {
            eprintln!("Run `todocal list` to see which occurrences were saved.");
        }
        std::process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(Commands::Completions { shell }) = &cli.command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => return Err(Error::InvalidArgument(format!("unsupported shell: {shell}"))),
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "todocal", &mut io::stdout());
        return Ok(());
    }

    let config = Config::discover(cli.config.as_deref())?;
    let clock = SystemClock;
    let occurrences = config.recurrence.occurrences;

    match cli.command {
        Some(Commands::Add { text, fields, repeat, dry_run }) => {
            let mut store = config.open_store()?;
            cmd_add(store.as_mut(), &fields.into_input(Some(text), repeat), occurrences, dry_run)
        }
        Some(Commands::List { category, view, search, pending }) => {
            let filter = TaskFilter {
                category: category.parse::<Category>()?,
                query: search.unwrap_or_default(),
                date_view: view.parse::<DateView>()?,
                show_completed: !pending,
            };
            let store = config.open_store()?;
            cmd_list(store.as_ref(), &clock, &filter)
        }
        Some(Commands::Complete { id, undo }) => {
            let mut store = config.open_store()?;
            cmd_complete(store.as_mut(), id, undo)
        }
        Some(Commands::Edit { id, text, fields, repeat }) => {
            let mut store = config.open_store()?;
            cmd_edit(store.as_mut(), id, &fields.into_input(text, repeat))
        }
        Some(Commands::Remove { id }) => {
            let mut store = config.open_store()?;
            cmd_remove(store.as_mut(), id)
        }
        Some(Commands::Calendar { month }) => {
            let store = config.open_store()?;
            cmd_calendar(store.as_ref(), &clock, month.as_deref())
        }
        Some(Commands::Day { date }) => {
            let store = config.open_store()?;
            cmd_day(store.as_ref(), &clock, date.as_deref())
        }
        Some(Commands::Reset { force }) => {
            if config.storage.backend == Backend::Remote {
                return Err(Error::InvalidArgument(
                    "reset only applies to the local backend".into(),
                ));
            }
            let store = JsonFileStore::new(config.data_dir(), config.owner()?);
            cmd_reset(&store, force)
        }
        Some(Commands::Completions { .. }) => Ok(()),
        Some(Commands::Ui) | None => {
            let store = config.open_store()?;
            let prefs_path = config.data_dir().join(config.owner()?.as_str()).join("view.json");
            run_tui(store, Box::new(clock), occurrences, prefs_path)
        }
    }
}
