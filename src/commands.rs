use std::io::{self, Write};

use chrono::NaiveDate;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::calendar::{build_index, indicators, tasks_on_date, MonthGrid};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{
    normalize_time, parse_date, Category, Meridiem, Priority, Repetition, TaskDraft, TaskId,
    TaskPatch, TaskRecord,
};
use crate::ordering::{visible, TaskFilter};
use crate::recurrence::{expand, occurrence_dates};
use crate::storage::{JsonFileStore, TaskStore};

/// Raw field values as typed by the user, before validation.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub text: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub repetition: Option<String>,
    pub emoji: Option<String>,
    pub due: Option<String>,
    /// 12-hour `H:MM`, optionally followed by `am`/`pm`.
    pub time: Option<String>,
    /// Used when `time` carries no am/pm suffix. Defaults to am.
    pub meridiem: Option<String>,
}

/// Splits `"9:30pm"` / `"9:30 PM"` into the clock part and its meridiem.
fn split_meridiem(input: &str) -> (&str, Option<&str>) {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.ends_with("am") || lower.ends_with("pm") {
        let (clock, suffix) = trimmed.split_at(trimmed.len() - 2);
        (clock.trim_end(), Some(suffix))
    } else {
        (trimmed, None)
    }
}

fn parse_time_input(time: &str, meridiem: Option<&str>) -> Result<chrono::NaiveTime> {
    let (clock, suffix) = split_meridiem(time);
    let meridiem = match suffix.or(meridiem) {
        Some(m) => m.parse::<Meridiem>()?,
        None => Meridiem::Am,
    };
    normalize_time(clock, meridiem)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validates raw input into a draft. Nothing is persisted here.
pub fn build_draft(input: &TaskInput) -> Result<TaskDraft> {
    let text = non_blank(input.text.as_deref()).ok_or(Error::EmptyText)?;
    let mut draft = TaskDraft::new(text);
    if let Some(category) = &input.category {
        draft.category = category.parse::<Category>()?;
    }
    if let Some(priority) = non_blank(input.priority.as_deref()) {
        draft.priority = priority.parse::<Priority>()?;
    }
    if let Some(repetition) = non_blank(input.repetition.as_deref()) {
        draft.repetition = repetition.parse::<Repetition>()?;
    }
    draft.emoji = non_blank(input.emoji.as_deref()).map(str::to_string);
    draft.due_date = non_blank(input.due.as_deref()).map(parse_date).transpose()?;
    draft.due_time = non_blank(input.time.as_deref())
        .map(|t| parse_time_input(t, input.meridiem.as_deref()))
        .transpose()?;
    draft.validate()?;
    Ok(draft)
}

/// Turns edit input into a patch. Empty strings for due date, time and
/// emoji clear the field; empty priority or repetition resets it to none.
pub fn build_patch(input: &TaskInput, completed: Option<bool>) -> Result<TaskPatch> {
    let mut patch = TaskPatch {
        completed,
        ..TaskPatch::default()
    };
    if let Some(text) = &input.text {
        patch.text = Some(text.trim().to_string());
    }
    if let Some(category) = &input.category {
        patch.category = Some(category.parse()?);
    }
    if let Some(priority) = input.priority.as_deref() {
        patch.priority = Some(match non_blank(Some(priority)) {
            Some(p) => p.parse()?,
            None => Priority::None,
        });
    }
    if let Some(repetition) = input.repetition.as_deref() {
        patch.repetition = Some(match non_blank(Some(repetition)) {
            Some(r) => r.parse()?,
            None => Repetition::None,
        });
    }
    if let Some(emoji) = input.emoji.as_deref() {
        patch.emoji = Some(non_blank(Some(emoji)).map(str::to_string));
    }
    if let Some(due) = input.due.as_deref() {
        patch.due_date = Some(non_blank(Some(due)).map(parse_date).transpose()?);
    }
    if let Some(time) = input.time.as_deref() {
        patch.due_time = Some(
            non_blank(Some(time))
                .map(|t| parse_time_input(t, input.meridiem.as_deref()))
                .transpose()?,
        );
    }
    patch.validate()?;
    Ok(patch)
}

/// Expands a draft and persists every occurrence.
///
/// Validation happens before the first store call; a failing store call
/// part way leaves the earlier occurrences in place.
pub fn add_task(store: &mut dyn TaskStore, draft: &TaskDraft, occurrences: usize) -> Result<Vec<TaskRecord>> {
    draft.validate()?;
    let planned = expand(draft, occurrences)?;
    let created = store.create_batch(&planned)?;
    tracing::info!(count = created.len(), repetition = %draft.repetition, "added task");
    Ok(created)
}

pub fn edit_task(store: &mut dyn TaskStore, id: TaskId, patch: &TaskPatch) -> Result<TaskRecord> {
    if patch.is_empty() {
        return Err(Error::InvalidArgument("nothing to change".into()));
    }
    patch.validate()?;
    let record = store.update(id, patch)?;
    tracing::info!(id, "updated task");
    Ok(record)
}

pub fn set_completed(store: &mut dyn TaskStore, id: TaskId, completed: bool) -> Result<TaskRecord> {
    let record = store.update(id, &TaskPatch::completion(completed))?;
    tracing::info!(id, completed, "changed completion");
    Ok(record)
}

pub fn remove_task(store: &mut dyn TaskStore, id: TaskId) -> Result<()> {
    store.delete(id)?;
    tracing::info!(id, "removed task");
    Ok(())
}

/// Adds a task, printing the created occurrences.
///
/// With `dry_run` the occurrence dates are printed and nothing is stored.
pub fn cmd_add(store: &mut dyn TaskStore, input: &TaskInput, occurrences: usize, dry_run: bool) -> Result<()> {
    let draft = build_draft(input)?;
    if dry_run {
        match draft.due_date {
            Some(anchor) => {
                for date in occurrence_dates(anchor, draft.repetition, occurrences) {
                    println!("{}", date.format("%Y-%m-%d (%a)"));
                }
            }
            None => println!("(no due date)"),
        }
        return Ok(());
    }

    let created = add_task(store, &draft, occurrences)?;
    match created.as_slice() {
        [single] => println!("Task added (id = {})", single.id),
        many => {
            let ids: Vec<String> = many.iter().map(|t| t.id.to_string()).collect();
            println!("{} occurrences added (ids = {})", many.len(), ids.join(", "));
        }
    }
    Ok(())
}

/// Marks a task as complete, or pending again with `undo`.
pub fn cmd_complete(store: &mut dyn TaskStore, id: TaskId, undo: bool) -> Result<()> {
    set_completed(store, id, !undo)?;
    if undo {
        println!("Task {} marked as pending.", id);
    } else {
        println!("Task {} marked as complete.", id);
    }
    Ok(())
}

/// Edits an existing task's details.
pub fn cmd_edit(store: &mut dyn TaskStore, id: TaskId, input: &TaskInput) -> Result<()> {
    let patch = build_patch(input, None)?;
    edit_task(store, id, &patch)?;
    println!("Task {} updated.", id);
    Ok(())
}

/// Removes a task by ID.
pub fn cmd_remove(store: &mut dyn TaskStore, id: TaskId) -> Result<()> {
    remove_task(store, id)?;
    println!("Task {} removed.", id);
    Ok(())
}

/// Lists tasks in display order, narrowed by `filter`.
pub fn cmd_list(store: &dyn TaskStore, clock: &dyn Clock, filter: &TaskFilter) -> Result<()> {
    let tasks = store.list()?;
    let shown = visible(&tasks, filter, clock.today());
    if shown.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    println!("{}", task_table(&shown));
    Ok(())
}

/// Lists the tasks due on one date.
pub fn cmd_day(store: &dyn TaskStore, clock: &dyn Clock, date: Option<&str>) -> Result<()> {
    let date = match date {
        Some(d) => parse_date(d)?,
        None => clock.today(),
    };
    let tasks = store.list()?;
    let due = tasks_on_date(&tasks, date);
    println!("{}", date.format("%A, %B %-d %Y"));
    if due.is_empty() {
        println!("No tasks scheduled for this date.");
        return Ok(());
    }
    println!("{}", task_table(&due));
    Ok(())
}

/// Prints a month grid with priority markers per day.
pub fn cmd_calendar(store: &dyn TaskStore, clock: &dyn Clock, month: Option<&str>) -> Result<()> {
    let today = clock.today();
    let grid = match month {
        Some(m) => MonthGrid::parse(m)?,
        None => MonthGrid::containing(today),
    };
    let tasks = store.list()?;
    let index = build_index(&tasks);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
                .iter()
                .map(|d| Cell::new(d).add_attribute(Attribute::Bold).set_alignment(CellAlignment::Center)),
        );

    for week in grid.weeks() {
        table.add_row(week.into_iter().map(|cell| match cell {
            Some(date) => day_cell(date, &indicators(&index, date), date == today),
            None => Cell::new(""),
        }));
    }

    println!("{}", grid.title());
    println!("{table}");
    println!("Markers: H = high, M = medium, L = low");
    Ok(())
}

/// Deletes all local tasks for the configured owner.
pub fn cmd_reset(store: &JsonFileStore, force: bool) -> Result<()> {
    if !force {
        print!(
            "Are you sure you want to delete all tasks for '{}'? This cannot be undone. [y/N] ",
            store.owner()
        );
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    store.reset()?;
    println!("Tasks reset successfully.");
    Ok(())
}

fn day_cell(date: NaiveDate, levels: &[Priority], is_today: bool) -> Cell {
    let markers: Vec<&str> = levels
        .iter()
        .map(|p| match p {
            Priority::High => "H",
            Priority::Medium => "M",
            Priority::Low => "L",
            Priority::None => "",
        })
        .collect();
    let text = if markers.is_empty() {
        date.format("%-d").to_string()
    } else {
        format!("{}\n{}", date.format("%-d"), markers.join(" "))
    };
    let mut cell = Cell::new(text).set_alignment(CellAlignment::Center);
    if let Some(top) = levels.first() {
        cell = cell.fg(priority_color(*top));
    }
    if is_today {
        cell = cell.add_attribute(Attribute::Bold).add_attribute(Attribute::Underlined);
    }
    cell
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
        Priority::None => Color::Reset,
    }
}

fn task_table(tasks: &[TaskRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Task").add_attribute(Attribute::Bold),
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("Repeat").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    for t in tasks {
        let text = match &t.emoji {
            Some(emoji) => format!("{} {}", emoji, t.text),
            None => t.text.clone(),
        };
        let mut text_cell = Cell::new(text);
        if t.completed {
            text_cell = text_cell.add_attribute(Attribute::CrossedOut).fg(Color::Grey);
        }
        let repeat = if t.repetition.is_none() { String::new() } else { t.repetition.to_string() };
        let status = if t.completed { "Done" } else { "Pending" };
        let status_color = if t.completed { Color::Green } else { Color::Yellow };

        table.add_row(vec![
            Cell::new(t.id),
            text_cell,
            Cell::new(t.category.label()),
            Cell::new(t.priority.label()).fg(priority_color(t.priority)),
            Cell::new(t.due_label()),
            Cell::new(repeat),
            Cell::new(status).fg(status_color),
        ]);
    }
    table
}
