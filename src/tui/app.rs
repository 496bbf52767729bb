use std::fs;
use std::time::{Duration, Instant};

use chrono::Utc;
use ratatui::widgets::TableState;

use crate::engine::{StartOutcome, Tracker};
use crate::export::{export_document, export_filename};
use crate::models::TaskId;

pub enum ViewMode {
    Active,
    Inactive,
}

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Adding,
    /// A start request hit an incompatible-group conflict and waits for a
    /// yes/no decision; nothing is mutated until one arrives.
    ConfirmStart,
    ConfirmDelete,
    Stats,
}

/// State for the two-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub name: String,
    pub step: usize, // 0: Name, 1: Group
}

pub struct App {
    pub tracker: Tracker,
    pub view_mode: ViewMode,
    pub active_state: TableState,
    pub inactive_state: TableState,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub add_state: AddState,
    pub pending_start: Option<(TaskId, Vec<TaskId>)>,
    pub pending_delete: Option<TaskId>,
    pub stats_task: Option<TaskId>,
    pub status_message: Option<String>,
    pub poll_interval: Duration,
    last_poll: Instant,
}

impl App {
    pub fn new(tracker: Tracker) -> App {
        let mut active_state = TableState::default();
        if !tracker.state().active.is_empty() {
            active_state.select(Some(0));
        }
        let mut inactive_state = TableState::default();
        if !tracker.state().inactive.is_empty() {
            inactive_state.select(Some(0));
        }
        App {
            tracker,
            view_mode: ViewMode::Active,
            active_state,
            inactive_state,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            add_state: AddState::default(),
            pending_start: None,
            pending_delete: None,
            stats_task: None,
            status_message: None,
            poll_interval: Duration::from_secs(1),
            last_poll: Instant::now(),
        }
    }

    fn current_ids(&self) -> &[TaskId] {
        match self.view_mode {
            ViewMode::Active => &self.tracker.state().active,
            ViewMode::Inactive => &self.tracker.state().inactive,
        }
    }

    fn current_selection(&self) -> Option<usize> {
        match self.view_mode {
            ViewMode::Active => self.active_state.selected(),
            ViewMode::Inactive => self.inactive_state.selected(),
        }
    }

    fn select(&mut self, index: Option<usize>) {
        match self.view_mode {
            ViewMode::Active => self.active_state.select(index),
            ViewMode::Inactive => self.inactive_state.select(index),
        }
    }

    /// The task under the cursor in the current view.
    pub fn selected_id(&self) -> Option<TaskId> {
        let i = self.current_selection()?;
        self.current_ids().get(i).copied()
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let len = self.current_ids().len();
        if len == 0 {
            return;
        }
        let i = match self.current_selection() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let len = self.current_ids().len();
        if len == 0 {
            return;
        }
        let i = match self.current_selection() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.select(Some(i));
    }

    /// Keeps both cursors inside their lists after a mutation or reload.
    pub fn clamp_selection(&mut self) {
        let active_len = self.tracker.state().active.len();
        let inactive_len = self.tracker.state().inactive.len();
        clamp(&mut self.active_state, active_len);
        clamp(&mut self.inactive_state, inactive_len);
    }

    /// Toggles between the working list and the archive.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Active => ViewMode::Inactive,
            ViewMode::Inactive => ViewMode::Active,
        };
        if self.current_selection().is_none() && !self.current_ids().is_empty() {
            self.select(Some(0));
        }
    }

    /// Periodic tick: re-poll the persistence gateway so edits from
    /// another process show up eventually.
    pub fn on_tick(&mut self) {
        if self.last_poll.elapsed() >= self.poll_interval {
            self.tracker.reload();
            self.last_poll = Instant::now();
            self.clamp_selection();
        }
    }

    /// Starts or stops the selected task's timer.
    ///
    /// An incompatible-group conflict switches into the confirmation
    /// modal instead of starting.
    pub fn toggle_timer(&mut self) {
        let Some(id) = self.selected_id() else { return };
        if let ViewMode::Inactive = self.view_mode {
            self.status_message = Some("Activate the task before starting its timer.".into());
            return;
        }
        if self.tracker.is_running(id) {
            self.tracker.stop(id);
            return;
        }
        match self.tracker.request_start(id) {
            StartOutcome::Started | StartOutcome::UnknownTask => {}
            StartOutcome::PendingConfirmation { conflicting } => {
                self.pending_start = Some((id, conflicting));
                self.input_mode = InputMode::ConfirmStart;
            }
        }
    }

    /// Resolves the pending two-phase start.
    pub fn confirm_pending_start(&mut self, accepted: bool) {
        if let Some((id, conflicting)) = self.pending_start.take() {
            if accepted {
                self.tracker.confirm_start(id, &conflicting);
            } else {
                self.tracker.cancel_start();
            }
        }
        self.input_mode = InputMode::Normal;
    }

    /// Activates or deactivates the selected task depending on the view.
    pub fn toggle_activation(&mut self) {
        let Some(id) = self.selected_id() else { return };
        match self.view_mode {
            ViewMode::Active => self.tracker.deactivate(id),
            ViewMode::Inactive => self.tracker.activate(id),
        }
        self.clamp_selection();
    }

    /// Asks before deleting the selected task.
    pub fn request_delete(&mut self) {
        if let Some(id) = self.selected_id() {
            self.pending_delete = Some(id);
            self.input_mode = InputMode::ConfirmDelete;
        }
    }

    pub fn confirm_pending_delete(&mut self, accepted: bool) {
        if let Some(id) = self.pending_delete.take() {
            if accepted {
                if let Err(e) = self.tracker.delete_template(id) {
                    self.status_message = Some(e.to_string());
                }
                self.clamp_selection();
            }
        }
        self.input_mode = InputMode::Normal;
    }

    /// Opens the statistics modal for the selected task.
    pub fn open_stats(&mut self) {
        if let Some(id) = self.selected_id() {
            self.stats_task = Some(id);
            self.input_mode = InputMode::Stats;
        }
    }

    pub fn close_modal(&mut self) {
        self.stats_task = None;
        self.input_mode = InputMode::Normal;
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Advances the add wizard: name first, then an optional group.
    pub fn handle_add_input(&mut self) {
        match self.add_state.step {
            0 => {
                if self.input_buffer.is_empty() {
                    return;
                }
                self.add_state.name = self.input_buffer.clone();
                self.add_state.step = 1;
                self.input_buffer.clear();
            }
            1 => {
                let group = if self.input_buffer.is_empty() {
                    None
                } else {
                    Some(self.input_buffer.clone())
                };
                if let Err(e) = self
                    .tracker
                    .create_template(&self.add_state.name, group.as_deref())
                {
                    self.status_message = Some(e.to_string());
                }
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                self.clamp_selection();
            }
            _ => {}
        }
    }

    /// Writes the JSON export next to the working directory.
    pub fn export(&mut self) {
        let now = Utc::now();
        let state = self.tracker.state();
        let doc = export_document(&state.templates, &state.statistics, now);
        let path = export_filename(now);
        let result = serde_json::to_string_pretty(&doc)
            .map_err(|e| e.to_string())
            .and_then(|payload| fs::write(&path, payload).map_err(|e| e.to_string()));
        self.status_message = Some(match result {
            Ok(()) => format!("Exported to {}", path),
            Err(e) => format!("Export failed: {}", e),
        });
    }
}

fn clamp(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}
