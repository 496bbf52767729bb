use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Utc;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::engine::{StartOutcome, Tracker};
use crate::export::{export_document, export_filename};
use crate::models::TaskId;
use crate::stats::{format_duration, total_tracked, weekly_totals};
use crate::storage::JsonFileGateway;

/// Yes/no question put to the user before a destructive or conflicting
/// action. The engine never blocks on this itself; callers resolve the
/// pending phase and hand the decision back.
pub trait ConfirmPrompt {
    fn ask(&self, message: &str) -> bool;
}

/// Interactive prompt reading `y`/`N` from stdin.
pub struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn ask(&self, message: &str) -> bool {
        print!("{} [y/N] ", message);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return false;
        }
        input.trim().eq_ignore_ascii_case("y")
    }
}

/// Opens the tracker at the standard data location and seeds the default
/// templates on first run.
pub fn open_tracker() -> Tracker {
    let mut tracker = Tracker::open(Box::new(JsonFileGateway::default_location()));
    tracker.ensure_defaults();
    tracker
}

/// Resolves a task reference: exact name match first, then a unique id
/// prefix. Returns `None` when nothing (or more than one id) matches.
pub fn resolve_task(tracker: &Tracker, query: &str) -> Option<TaskId> {
    let templates = &tracker.state().templates;
    if let Some(t) = templates.iter().find(|t| t.name == query) {
        return Some(t.id);
    }
    let prefix = query.to_lowercase();
    let matches: Vec<TaskId> = templates
        .iter()
        .filter(|t| t.id.to_string().starts_with(&prefix))
        .map(|t| t.id)
        .collect();
    match matches.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// Adds a new task template (inactive until activated).
pub fn cmd_add(tracker: &mut Tracker, name: String, group: Option<String>, silent: bool) {
    match tracker.create_template(&name, group.as_deref()) {
        Ok(t) => {
            if !silent {
                println!("Task '{}' added (id = {})", t.name, t.id);
            }
        }
        Err(e) => {
            if !silent {
                eprintln!("{}", e);
            }
        }
    }
}

/// Lists tasks in a formatted table.
///
/// By default only the working list is shown; `all` adds the archive.
pub fn cmd_list(tracker: &Tracker, all: bool) {
    let state = tracker.state();
    let mut ids: Vec<(TaskId, bool)> = state.active.iter().map(|id| (*id, true)).collect();
    if all {
        ids.extend(state.inactive.iter().map(|id| (*id, false)));
    }
    if ids.is_empty() {
        println!("No tasks found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Group").add_attribute(Attribute::Bold),
            Cell::new("State").add_attribute(Attribute::Bold),
            Cell::new("Timer").add_attribute(Attribute::Bold),
            Cell::new("Today").add_attribute(Attribute::Bold),
        ]);

    for (id, active) in ids {
        let Some(template) = tracker.template(id) else { continue };
        let running = tracker.is_running(id);
        let short_id: String = id.to_string().chars().take(8).collect();

        let state_cell = if active {
            Cell::new("Active").fg(Color::Green)
        } else {
            Cell::new("Inactive").fg(Color::Grey)
        };
        let timer_cell = if running {
            Cell::new("Running").fg(Color::Yellow)
        } else {
            Cell::new("Stopped")
        };

        table.add_row(vec![
            Cell::new(short_id),
            Cell::new(&template.name),
            Cell::new(template.incompatible_group.clone().unwrap_or_default()),
            state_cell,
            timer_cell,
            Cell::new(format_duration(tracker.live_total(id))),
        ]);
    }

    println!("{table}");
}

/// Moves a task into the working list.
pub fn cmd_activate(tracker: &mut Tracker, query: &str, silent: bool) {
    let Some(id) = resolve_task(tracker, query) else {
        if !silent {
            eprintln!("Task '{}' not found.", query);
        }
        return;
    };
    tracker.activate(id);
    if !silent {
        println!("Task '{}' activated.", query);
    }
}

/// Moves a task into the archive, stopping its timer if needed.
pub fn cmd_deactivate(tracker: &mut Tracker, query: &str, silent: bool) {
    let Some(id) = resolve_task(tracker, query) else {
        if !silent {
            eprintln!("Task '{}' not found.", query);
        }
        return;
    };
    tracker.deactivate(id);
    if !silent {
        println!("Task '{}' deactivated.", query);
    }
}

/// Starts a task's timer.
///
/// When the task collides with running members of its incompatible group,
/// the pending start is put to the prompt; confirming stops the others
/// first, declining leaves everything unchanged.
pub fn cmd_start(tracker: &mut Tracker, query: &str, prompt: &dyn ConfirmPrompt, silent: bool) {
    let Some(id) = resolve_task(tracker, query) else {
        if !silent {
            eprintln!("Task '{}' not found.", query);
        }
        return;
    };
    match tracker.request_start(id) {
        StartOutcome::Started => {
            if !silent {
                println!("Started '{}'.", query);
            }
        }
        StartOutcome::UnknownTask => {
            if !silent {
                eprintln!("Task '{}' not found.", query);
            }
        }
        StartOutcome::PendingConfirmation { conflicting } => {
            let names: Vec<String> = conflicting
                .iter()
                .filter_map(|c| tracker.template(*c))
                .map(|t| t.name.clone())
                .collect();
            let message = format!(
                "'{}' is incompatible with {} running task(s) ({}). Stop them?",
                query,
                conflicting.len(),
                names.join(", ")
            );
            if prompt.ask(&message) {
                tracker.confirm_start(id, &conflicting);
                if !silent {
                    println!("Stopped {} and started '{}'.", names.join(", "), query);
                }
            } else {
                tracker.cancel_start();
                if !silent {
                    println!("Left unchanged.");
                }
            }
        }
    }
}

/// Stops a task's timer. Stopping an already-stopped task is a no-op.
pub fn cmd_stop(tracker: &mut Tracker, query: &str, silent: bool) {
    let Some(id) = resolve_task(tracker, query) else {
        if !silent {
            eprintln!("Task '{}' not found.", query);
        }
        return;
    };
    tracker.stop(id);
    if !silent {
        println!(
            "Stopped '{}' ({} today).",
            query,
            format_duration(tracker.today_total(id))
        );
    }
}

/// Deletes a task template after confirmation. Only inactive tasks can go.
pub fn cmd_delete(
    tracker: &mut Tracker,
    query: &str,
    force: bool,
    prompt: &dyn ConfirmPrompt,
    silent: bool,
) {
    let Some(id) = resolve_task(tracker, query) else {
        if !silent {
            eprintln!("Task '{}' not found.", query);
        }
        return;
    };
    let name = tracker.template(id).map(|t| t.name.clone()).unwrap_or_default();
    if !force {
        let message = format!("Delete task '{}'? This cannot be undone.", name);
        if !prompt.ask(&message) {
            if !silent {
                println!("Aborted.");
            }
            return;
        }
    }
    match tracker.delete_template(id) {
        Ok(()) => {
            if !silent {
                println!("Task '{}' deleted.", name);
            }
        }
        Err(e) => {
            if !silent {
                eprintln!("{}", e);
            }
        }
    }
}

/// Shows a task's daily and weekly totals.
pub fn cmd_stats(tracker: &Tracker, query: &str) {
    let Some(id) = resolve_task(tracker, query) else {
        eprintln!("Task '{}' not found.", query);
        return;
    };
    let Some(template) = tracker.template(id) else { return };
    let Some(stat) = tracker.stat(id) else {
        println!("No time tracked for '{}' yet.", template.name);
        return;
    };

    println!(
        "{}: total {} over the retained window",
        template.name,
        format_duration(total_tracked(stat))
    );

    let mut daily = Table::new();
    daily
        .load_preset(UTF8_FULL)
        .set_header(vec!["Date", "Time"]);
    for (day, ms) in stat.daily.iter().rev() {
        daily.add_row(vec![day.clone(), format_duration(*ms)]);
    }
    println!("{daily}");

    let weeks = weekly_totals(stat);
    if !weeks.is_empty() {
        let mut weekly = Table::new();
        weekly
            .load_preset(UTF8_FULL)
            .set_header(vec!["Week of", "Time"]);
        for (week, ms) in weeks.iter().rev() {
            weekly.add_row(vec![week.clone(), format_duration(*ms)]);
        }
        println!("{weekly}");
    }
}

/// Writes the export document to `output`, defaulting to a dated filename
/// in the current directory.
pub fn cmd_export(tracker: &Tracker, output: Option<PathBuf>, silent: bool) {
    let now = Utc::now();
    let state = tracker.state();
    let doc = export_document(&state.templates, &state.statistics, now);
    let path = output.unwrap_or_else(|| PathBuf::from(export_filename(now)));
    let payload = match serde_json::to_string_pretty(&doc) {
        Ok(p) => p,
        Err(e) => {
            if !silent {
                eprintln!("Failed to serialize export: {}", e);
            }
            return;
        }
    };
    match fs::write(&path, payload) {
        Ok(()) => {
            if !silent {
                println!("Exported to {}", path.display());
            }
        }
        Err(e) => {
            if !silent {
                eprintln!("Failed to write {}: {}", path.display(), e);
            }
        }
    }
}
