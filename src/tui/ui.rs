use chrono::NaiveDate;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, InputField, InputMode, ViewMode};
use crate::calendar::indicators;
use crate::models::{Priority, TaskRecord};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Body
            Constraint::Length(1), // Status
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    match app.view_mode {
        ViewMode::Tasks => {
            let title = format!(
                "todocal - Tasks [category: {} | view: {} | search: {}{}]",
                app.filter.category,
                app.filter.date_view.as_str(),
                if app.filter.query.is_empty() { "-" } else { app.filter.query.as_str() },
                if app.filter.show_completed { "" } else { " | pending only" },
            );
            let table = task_table(&app.shown, title);
            f.render_stateful_widget(table, chunks[0], &mut app.state);
        }
        ViewMode::Calendar => {
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(44), Constraint::Min(0)])
                .split(chunks[0]);

            render_month(f, app, body[0]);

            let title = app.selected_date.format("%A, %B %-d %Y").to_string();
            let table = task_table(&app.day_tasks, title);
            f.render_stateful_widget(table, body[1], &mut app.state);
        }
    }

    let status = Paragraph::new(app.status.clone().unwrap_or_default()).style(
        match app.status.as_deref() {
            Some(s) if s.starts_with("Error") => Style::default().fg(Color::Red),
            _ => Style::default().fg(Color::Green),
        },
    );
    f.render_widget(status, chunks[1]);

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tasks => "q: Quit | a: Add | e: Text | t: Due | m: Time | c: Cat | p: Prio | i: Emoji | Space: Done | d: Del | f: Filter | w: Range | /: Search | x: Hide Done | v: Calendar",
            ViewMode::Calendar => "q: Quit | ←/→: Day | ↑/↓: Week | [/]: Month | g: Today | j/k: Select | a: Add | Space: Done | d: Del | v: Tasks",
        },
        InputMode::Editing => "Enter: Save (empty clears) | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
        InputMode::Searching => "Type to search | Enter: Keep | Esc: Clear",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    if app.input_mode != InputMode::Normal {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title = match app.input_mode {
            InputMode::Adding => app.add_state.step.prompt(),
            InputMode::Searching => "Search",
            _ => match app.input_field {
                InputField::Text => "Edit Text",
                InputField::Due => "Edit Due Date (YYYY-MM-DD)",
                InputField::Time => "Edit Time (H:MM am/pm)",
                InputField::Category => "Edit Category",
                InputField::Priority => "Edit Priority",
                InputField::Emoji => "Edit Emoji",
                InputField::None => "Edit",
            },
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn task_table<'a>(tasks: &'a [TaskRecord], title: String) -> Table<'a> {
    let rows: Vec<Row> = tasks
        .iter()
        .map(|t| {
            let text = match &t.emoji {
                Some(emoji) => format!("{} {}", emoji, t.text),
                None => t.text.clone(),
            };
            let mut style = Style::default().fg(priority_color(t.priority));
            if t.completed {
                style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
            }

            Row::new(vec![
                Cell::from(t.id.to_string()),
                Cell::from(text),
                Cell::from(t.category.label()),
                Cell::from(t.priority.label()),
                Cell::from(t.due_label()),
                Cell::from(if t.repetition.is_none() { String::new() } else { t.repetition.to_string() }),
                Cell::from(if t.completed { "Done" } else { "Pending" }),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(5),
        Constraint::Min(20),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(17),
        Constraint::Length(9),
        Constraint::Length(8),
    ];

    Table::new(rows, widths)
        .header(
            Row::new(vec!["ID", "Task", "Category", "Priority", "Due", "Repeat", "Status"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ")
}

fn render_month(f: &mut Frame, app: &App, area: Rect) {
    let today = app.today();
    let rows: Vec<Row> = app
        .month
        .weeks()
        .into_iter()
        .map(|week| {
            Row::new(week.into_iter().map(|cell| match cell {
                Some(date) => day_cell(app, date, today),
                None => Cell::from(""),
            }))
            .height(2)
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(5); 7])
        .header(
            Row::new(vec!["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(app.month.title()));

    f.render_widget(table, area);
}

fn day_cell(app: &App, date: NaiveDate, today: NaiveDate) -> Cell<'static> {
    let mut day_style = Style::default();
    if date == today {
        day_style = day_style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    }
    if date == app.selected_date {
        day_style = day_style.add_modifier(Modifier::REVERSED);
    }

    let markers: Vec<Span> = indicators(&app.index, date)
        .into_iter()
        .map(|p| Span::styled("•", Style::default().fg(priority_color(p))))
        .collect();

    Cell::from(Text::from(vec![
        Line::from(Span::styled(date.format("%-d").to_string(), day_style)),
        Line::from(markers),
    ]))
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
        Priority::None => Color::Reset,
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(r.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Length(r.height.saturating_sub(height) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
