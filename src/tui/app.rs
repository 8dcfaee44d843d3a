use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use ratatui::widgets::TableState;

use crate::calendar::{build_index, tasks_on_date, MonthGrid, PriorityIndex};
use crate::clock::Clock;
use crate::commands::{add_task, build_draft, build_patch, edit_task, remove_task, set_completed, TaskInput};
use crate::error::Result;
use crate::models::{default_time_input, to_twelve_hour, Category, TaskId, TaskRecord};
use crate::ordering::{visible, TaskFilter};
use crate::storage::TaskStore;

use super::prefs::ViewPrefs;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
    Searching,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewMode {
    Tasks,
    Calendar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputField {
    None,
    Text,
    Due,
    Time,
    Category,
    Priority,
    Emoji,
}

/// Steps of the "Add Task" wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AddStep {
    Text,
    Due,
    Time,
    Category,
    Priority,
    Repeat,
    Emoji,
}

impl AddStep {
    fn next(&self) -> Option<AddStep> {
        match self {
            AddStep::Text => Some(AddStep::Due),
            AddStep::Due => Some(AddStep::Time),
            AddStep::Time => Some(AddStep::Category),
            AddStep::Category => Some(AddStep::Priority),
            AddStep::Priority => Some(AddStep::Repeat),
            AddStep::Repeat => Some(AddStep::Emoji),
            AddStep::Emoji => None,
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            AddStep::Text => "Add Task: Enter Text",
            AddStep::Due => "Add Task: Enter Due Date (YYYY-MM-DD, optional)",
            AddStep::Time => "Add Task: Enter Time (H:MM am/pm, optional)",
            AddStep::Category => "Add Task: Category (work/personal/exercise/rest, optional)",
            AddStep::Priority => "Add Task: Priority (high/medium/low, optional)",
            AddStep::Repeat => "Add Task: Repeat (daily/weekly/monthly/weekdays, optional)",
            AddStep::Emoji => "Add Task: Emoji (optional)",
        }
    }
}

/// State for the multi-step "Add Task" wizard.
#[derive(Debug, Clone)]
pub struct AddState {
    pub input: TaskInput,
    pub step: AddStep,
}

impl Default for AddState {
    fn default() -> Self {
        Self {
            input: TaskInput::default(),
            step: AddStep::Text,
        }
    }
}

pub struct App {
    store: Box<dyn TaskStore>,
    clock: Box<dyn Clock>,
    occurrences: usize,
    /// Last list fetched from the store. Never edited locally.
    pub tasks: Vec<TaskRecord>,
    /// `tasks` after sorting and filtering.
    pub shown: Vec<TaskRecord>,
    pub index: PriorityIndex,
    pub filter: TaskFilter,
    pub state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<TaskId>,
    pub add_state: AddState,
    pub month: MonthGrid,
    pub selected_date: NaiveDate,
    /// Tasks due on `selected_date`.
    pub day_tasks: Vec<TaskRecord>,
    /// Last error or confirmation shown to the user.
    pub status: Option<String>,
    /// Where the category filter and date view are remembered.
    prefs_path: Option<PathBuf>,
}

impl App {
    /// Creates a new App instance and loads initial data.
    pub fn new(store: Box<dyn TaskStore>, clock: Box<dyn Clock>, occurrences: usize) -> App {
        let today = clock.today();
        let mut app = App {
            store,
            clock,
            occurrences,
            tasks: Vec::new(),
            shown: Vec::new(),
            index: PriorityIndex::new(),
            filter: TaskFilter::default(),
            state: TableState::default(),
            view_mode: ViewMode::Tasks,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            month: MonthGrid::containing(today),
            selected_date: today,
            day_tasks: Vec::new(),
            status: None,
            prefs_path: None,
        };
        app.reload();
        app
    }

    /// Restores the last category filter and date view from `path`, and
    /// saves them there whenever they change.
    pub fn remember_filters(mut self, path: PathBuf) -> App {
        let prefs = ViewPrefs::load(&path);
        self.filter.category = prefs.category;
        self.filter.date_view = prefs.date_view;
        self.prefs_path = Some(path);
        self.refresh_views();
        self
    }

    fn save_filters(&self) {
        if let Some(path) = &self.prefs_path {
            let prefs = ViewPrefs {
                category: self.filter.category,
                date_view: self.filter.date_view,
            };
            if let Err(err) = prefs.save(path) {
                tracing::warn!(error = %err, path = %path.display(), "could not save view preferences");
            }
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Fetches the authoritative list and recomputes every derived view.
    pub fn reload(&mut self) {
        match self.store.list() {
            Ok(tasks) => self.tasks = tasks,
            Err(err) => {
                tracing::error!(error = %err, "could not load tasks");
                self.status = Some(format!("Error: {err}"));
            }
        }
        self.refresh_views();
    }

    /// Re-applies filter, calendar index and day list to the current snapshot.
    fn refresh_views(&mut self) {
        self.shown = visible(&self.tasks, &self.filter, self.clock.today());
        self.index = build_index(&self.tasks);
        self.day_tasks = tasks_on_date(&self.tasks, self.selected_date);

        let len = self.rows().len();
        if len == 0 {
            self.state.select(None);
        } else if let Some(i) = self.state.selected() {
            if i >= len {
                self.state.select(Some(len - 1));
            }
        } else {
            self.state.select(Some(0));
        }
    }

    /// Shows the outcome of a mutation, then re-fetches from the store.
    fn report<T>(&mut self, result: Result<T>, success: impl FnOnce(&T) -> String) {
        match &result {
            Ok(value) => self.status = Some(success(value)),
            Err(err) if err.is_validation() => {
                tracing::warn!(error = %err, "rejected input");
                self.status = Some(format!("Error: {err}"));
            }
            Err(err) => {
                tracing::error!(error = %err, "task operation failed");
                self.status = Some(format!("Error: {err}"));
            }
        }
        self.reload();
    }

    fn rows(&self) -> &[TaskRecord] {
        match self.view_mode {
            ViewMode::Tasks => &self.shown,
            ViewMode::Calendar => &self.day_tasks,
        }
    }

    pub fn selected_task(&self) -> Option<&TaskRecord> {
        self.state.selected().and_then(|i| self.rows().get(i))
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Flips the completed flag of the selected task.
    pub fn toggle_selected(&mut self) {
        if let Some((id, completed)) = self.selected_task().map(|t| (t.id, t.completed)) {
            let result = set_completed(self.store.as_mut(), id, !completed);
            self.report(result, |t| {
                if t.completed {
                    format!("Task {} done", t.id)
                } else {
                    format!("Task {} pending", t.id)
                }
            });
        }
    }

    /// Deletes the currently selected task.
    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_task().map(|t| t.id) {
            let result = remove_task(self.store.as_mut(), id);
            self.report(result, |_| format!("Task {id} removed"));
        }
    }

    /// Toggles between the task list and the calendar.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tasks => ViewMode::Calendar,
            ViewMode::Calendar => ViewMode::Tasks,
        };
        self.state.select(if self.rows().is_empty() { None } else { Some(0) });
    }

    /// Cycles the category filter through every category.
    pub fn cycle_category(&mut self) {
        let variants = Category::variants();
        let pos = variants.iter().position(|c| *c == self.filter.category).unwrap_or(0);
        self.filter.category = variants[(pos + 1) % variants.len()];
        self.save_filters();
        self.refresh_views();
    }

    pub fn cycle_date_view(&mut self) {
        self.filter.date_view = self.filter.date_view.next();
        self.save_filters();
        self.refresh_views();
    }

    pub fn toggle_completed_visibility(&mut self) {
        self.filter.show_completed = !self.filter.show_completed;
        self.refresh_views();
    }

    pub fn start_search(&mut self) {
        self.input_mode = InputMode::Searching;
        self.input_buffer = self.filter.query.clone();
    }

    /// Live search: the filter follows the buffer as it is typed.
    pub fn update_search(&mut self) {
        self.filter.query = self.input_buffer.clone();
        self.refresh_views();
    }

    /// Moves the calendar selection by `days`, following into other months.
    pub fn move_day(&mut self, days: i64) {
        if let Some(date) = self.selected_date.checked_add_signed(Duration::days(days)) {
            self.select_date(date);
        }
    }

    pub fn shift_month(&mut self, delta: i32) {
        self.month = self.month.shift(delta);
        let first = self.month.first_day();
        self.select_date(first);
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.month = MonthGrid::containing(date);
        self.refresh_views();
        if self.view_mode == ViewMode::Calendar {
            self.state.select(if self.day_tasks.is_empty() { None } else { Some(0) });
        }
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Initiates editing of a specific field for the selected task.
    pub fn start_edit(&mut self, field: InputField) {
        let Some(t) = self.selected_task().cloned() else { return };
        self.target_id = Some(t.id);
        self.input_mode = InputMode::Editing;
        self.input_field = field;

        // Pre-fill buffer for editing
        self.input_buffer = match field {
            InputField::Text => t.text.clone(),
            InputField::Due => t.due_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            InputField::Time => t
                .due_time
                .map(|time| {
                    let (clock, meridiem) = to_twelve_hour(time);
                    format!("{clock} {meridiem}")
                })
                .unwrap_or_default(),
            InputField::Category => t.category.to_string(),
            InputField::Priority => t.priority.to_string(),
            InputField::Emoji => t.emoji.clone().unwrap_or_default(),
            InputField::None => String::new(),
        };
    }

    pub fn cancel_input(&mut self) {
        if self.input_mode == InputMode::Searching {
            self.input_buffer.clear();
            self.update_search();
        }
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    /// Handles text input based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Searching => {
                self.update_search();
                self.input_mode = InputMode::Normal;
            }
            InputMode::Normal => {}
        }
    }

    /// Handles input for the "Add Task" wizard.
    fn handle_adding_input(&mut self) {
        let value = std::mem::take(&mut self.input_buffer);
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        let input = &mut self.add_state.input;
        match self.add_state.step {
            AddStep::Text => {
                if value.is_none() {
                    return;
                }
                input.text = value;
            }
            AddStep::Due => input.due = value,
            AddStep::Time => input.time = value,
            AddStep::Category => input.category = value,
            AddStep::Priority => input.priority = value,
            AddStep::Repeat => input.repetition = value,
            AddStep::Emoji => input.emoji = value,
        }

        match self.add_state.step.next() {
            Some(step) => {
                self.add_state.step = step;
                self.input_buffer = self.prefill(step);
            }
            None => self.finish_add(),
        }
    }

    /// Suggested value for a wizard step.
    fn prefill(&self, step: AddStep) -> String {
        match step {
            AddStep::Due if self.view_mode == ViewMode::Calendar => {
                self.selected_date.format("%Y-%m-%d").to_string()
            }
            AddStep::Time => {
                let (clock, meridiem) = default_time_input(self.clock.as_ref());
                format!("{clock} {meridiem}")
            }
            _ => String::new(),
        }
    }

    fn finish_add(&mut self) {
        self.input_mode = InputMode::Normal;
        let draft = build_draft(&self.add_state.input);
        let result = draft.and_then(|draft| add_task(self.store.as_mut(), &draft, self.occurrences));
        self.report(result, |created| match created.len() {
            1 => "Task added".to_string(),
            n => format!("{n} occurrences added"),
        });
    }

    /// Handles input for the "Edit Task" mode.
    fn handle_editing_input(&mut self) {
        let Some(id) = self.target_id else { return };
        let value = Some(std::mem::take(&mut self.input_buffer));
        let mut input = TaskInput::default();
        match self.input_field {
            InputField::Text => input.text = value,
            InputField::Due => input.due = value,
            InputField::Time => input.time = value,
            InputField::Category => input.category = value,
            InputField::Priority => input.priority = value,
            InputField::Emoji => input.emoji = value,
            InputField::None => {}
        }
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;

        let result = build_patch(&input, None).and_then(|patch| edit_task(self.store.as_mut(), id, &patch));
        self.report(result, |t| format!("Task {} updated", t.id));
    }
}
