use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};
use chrono::Utc;

use crate::models::TaskId;
use crate::stats::{format_duration, total_tracked, weekly_totals};
use super::app::{App, InputMode, ViewMode};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Running-now header
            Constraint::Min(0),    // Task table
            Constraint::Length(2), // Help / status
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_table(f, app, chunks[1]);
    render_help(f, app, chunks[2]);

    match app.input_mode {
        InputMode::Adding => render_add_modal(f, app),
        InputMode::ConfirmStart => render_confirm_start(f, app),
        InputMode::ConfirmDelete => render_confirm_delete(f, app),
        InputMode::Stats => render_stats_modal(f, app),
        InputMode::Normal => {}
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let state = app.tracker.state();
    let running: Vec<String> = state
        .active
        .iter()
        .filter(|id| app.tracker.is_running(**id))
        .filter_map(|id| {
            let t = app.tracker.template(*id)?;
            Some(format!(
                "{}: {} today",
                t.name,
                format_duration(app.tracker.live_total(*id))
            ))
        })
        .collect();

    let line = if running.is_empty() {
        Line::from("No running timers")
    } else {
        Line::from(running.join("  |  ")).style(Style::default().fg(Color::Yellow))
    };

    let header = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).title("timetrack - Running now"));
    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, app: &mut App, area: Rect) {
    let state = app.tracker.state();
    let (ids, title): (Vec<TaskId>, &str) = match app.view_mode {
        ViewMode::Active => (state.active.clone(), "Active tasks"),
        ViewMode::Inactive => (state.inactive.clone(), "Inactive tasks"),
    };

    let rows: Vec<Row> = ids
        .iter()
        .map(|id| {
            let name = app
                .tracker
                .template(*id)
                .map(|t| t.name.clone())
                .unwrap_or_default();
            let group = app
                .tracker
                .template(*id)
                .and_then(|t| t.incompatible_group.clone())
                .unwrap_or_default();
            let running = app.tracker.is_running(*id);
            let total = app
                .tracker
                .stat(*id)
                .map(total_tracked)
                .unwrap_or(0);

            let style = if running {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };

            Row::new(vec![
                Cell::from(name),
                Cell::from(group),
                Cell::from(if running { "Running" } else { "Stopped" }),
                Cell::from(format_duration(app.tracker.live_total(*id))),
                Cell::from(format_duration(total)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Name", "Group", "Timer", "Today", "Total"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    let table_state = match app.view_mode {
        ViewMode::Active => &mut app.active_state,
        ViewMode::Inactive => &mut app.inactive_state,
    };
    f.render_stateful_widget(table, area, table_state);
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let help = match app.input_mode {
        InputMode::Normal => {
            "q: Quit | j/k: Move | Tab: Active/Inactive | s: Start/Stop | Enter: (De)activate | a: Add | d: Delete | g: Stats | e: Export"
        }
        InputMode::Adding => "Enter: Next | Esc: Cancel",
        InputMode::ConfirmStart | InputMode::ConfirmDelete => "y: Confirm | n/Esc: Cancel",
        InputMode::Stats => "Esc: Close",
    };
    let text = match &app.status_message {
        Some(msg) => format!("{}\n{}", msg, help),
        None => help.to_string(),
    };
    f.render_widget(Paragraph::new(text), area);
}

fn render_add_modal(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 20, f.area());
    let prompt = match app.add_state.step {
        0 => format!("Name: {}", app.input_buffer),
        _ => format!("Group (optional): {}", app.input_buffer),
    };
    let popup = Paragraph::new(prompt)
        .block(Block::default().borders(Borders::ALL).title("New task"));
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn render_confirm_start(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 25, f.area());
    let text = match &app.pending_start {
        Some((id, conflicting)) => {
            let name = app
                .tracker
                .template(*id)
                .map(|t| t.name.clone())
                .unwrap_or_default();
            let others: Vec<String> = conflicting
                .iter()
                .filter_map(|c| app.tracker.template(*c))
                .map(|t| t.name.clone())
                .collect();
            format!(
                "'{}' is incompatible with {} running task(s):\n{}\n\nStop them and start '{}'?",
                name,
                conflicting.len(),
                others.join(", "),
                name
            )
        }
        None => String::new(),
    };
    let popup = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Incompatible tasks"));
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn render_confirm_delete(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 20, f.area());
    let name = app
        .pending_delete
        .and_then(|id| app.tracker.template(id))
        .map(|t| t.name.clone())
        .unwrap_or_default();
    let popup = Paragraph::new(format!(
        "Delete '{}'? This cannot be undone.",
        name
    ))
    .block(Block::default().borders(Borders::ALL).title("Delete task"));
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn render_stats_modal(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 60, f.area());
    let mut lines: Vec<Line> = Vec::new();

    if let Some(id) = app.stats_task {
        let name = app
            .tracker
            .template(id)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        lines.push(Line::from(name).style(Style::default().add_modifier(Modifier::BOLD)));

        if let Some(stat) = app.tracker.stat(id) {
            lines.push(Line::from(format!(
                "Total (retained window): {}",
                format_duration(total_tracked(stat))
            )));
            if stat.is_running() {
                lines.push(Line::from(format!(
                    "Now: {} today",
                    format_duration(crate::stats::live_total(stat, Utc::now()))
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("By day:"));
            for (day, ms) in stat.daily.iter().rev().take(10) {
                lines.push(Line::from(format!("  {}  {}", day, format_duration(*ms))));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("By week:"));
            for (week, ms) in weekly_totals(stat).iter().rev().take(5) {
                lines.push(Line::from(format!("  Week of {}  {}", week, format_duration(*ms))));
            }
        } else {
            lines.push(Line::from("No time tracked yet."));
        }
    }

    let popup = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Statistics"));
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

/// Centered popup rect taking the given percentage of the frame.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
