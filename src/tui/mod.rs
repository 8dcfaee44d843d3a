pub mod app;
pub mod prefs;
pub mod ui;

use std::io;
use std::path::PathBuf;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::TaskStore;
use app::{App, InputField, InputMode, ViewMode};
use ui::ui;

pub fn run_tui(
    store: Box<dyn TaskStore>,
    clock: Box<dyn Clock>,
    occurrences: usize,
    prefs_path: PathBuf,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store, clock, occurrences).remember_filters(prefs_path);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match app.input_mode {
                InputMode::Normal => {
                    if !handle_normal_key(app, key) {
                        return Ok(());
                    }
                }
                InputMode::Searching => match key.code {
                    KeyCode::Enter => app.handle_input(),
                    KeyCode::Esc => app.cancel_input(),
                    KeyCode::Char(c) => {
                        app.input_buffer.push(c);
                        app.update_search();
                    }
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                        app.update_search();
                    }
                    _ => {}
                },
                InputMode::Editing | InputMode::Adding => match key.code {
                    KeyCode::Enter => app.handle_input(),
                    KeyCode::Esc => app.cancel_input(),
                    KeyCode::Char(c) => {
                        app.input_buffer.push(c);
                    }
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                    }
                    _ => {}
                },
            }
        }
    }
}

/// Returns `false` when the user asked to quit.
fn handle_normal_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return false,
        KeyCode::Char('j') => app.next(),
        KeyCode::Char('k') => app.previous(),
        KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
        KeyCode::Char('a') => app.start_add(),
        KeyCode::Char('e') => app.start_edit(InputField::Text),
        KeyCode::Char('t') => app.start_edit(InputField::Due),
        KeyCode::Char('m') => app.start_edit(InputField::Time),
        KeyCode::Char('c') => app.start_edit(InputField::Category),
        KeyCode::Char('p') => app.start_edit(InputField::Priority),
        KeyCode::Char('i') => app.start_edit(InputField::Emoji),
        KeyCode::Char('f') => app.cycle_category(),
        KeyCode::Char('w') => app.cycle_date_view(),
        KeyCode::Char('x') => app.toggle_completed_visibility(),
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('r') => app.reload(),
        KeyCode::Char('v') => app.toggle_view(),
        KeyCode::Char('[') => app.shift_month(-1),
        KeyCode::Char(']') => app.shift_month(1),
        code => match app.view_mode {
            ViewMode::Tasks => match code {
                KeyCode::Down => app.next(),
                KeyCode::Up => app.previous(),
                _ => {}
            },
            ViewMode::Calendar => match code {
                KeyCode::Left | KeyCode::Char('h') => app.move_day(-1),
                KeyCode::Right | KeyCode::Char('l') => app.move_day(1),
                KeyCode::Up => app.move_day(-7),
                KeyCode::Down => app.move_day(7),
                KeyCode::Char('g') => {
                    let today = app.today();
                    app.select_date(today);
                }
                _ => {}
            },
        },
    }
    true
}
