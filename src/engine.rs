//! Task registry, activation sets, and the timer/conflict state machine.
//!
//! All mutations go through [`Tracker`], which owns the state exclusively
//! and runs each operation to completion before the next one observes it.
//! Every mutating operation ends with a fire-and-forget save: a failed
//! save is logged and the in-memory change stands.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::models::{TaskId, TaskTemplate, TimerStat, TrackerState};
use crate::stats::{self, RETENTION_DAYS};
use crate::storage::StorageGateway;

/// Outcome of a start request.
///
/// Starting is two-phase: a request that collides with running tasks from
/// the same incompatible group mutates nothing and hands the conflicting
/// ids back, so the caller can ask the user and either complete it with
/// [`Tracker::confirm_start`] or drop it ([`Tracker::cancel_start`]).
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started,
    PendingConfirmation { conflicting: Vec<TaskId> },
    UnknownTask,
}

/// Owner of the tracker state and the only place it is mutated.
pub struct Tracker {
    state: TrackerState,
    store: Box<dyn StorageGateway>,
    revision: u64,
}

impl Tracker {
    /// Loads persisted state through the gateway and repairs it.
    ///
    /// A missing or unreadable blob falls back to the default empty state;
    /// a corrupt blob is logged, not propagated.
    pub fn open(store: Box<dyn StorageGateway>) -> Self {
        let state = match store.load() {
            Ok(Some(state)) => state,
            Ok(None) => TrackerState::default(),
            Err(e) => {
                warn!("failed to load tracker state, starting fresh: {e}");
                TrackerState::default()
            }
        };
        let mut tracker = Tracker { state, store, revision: 0 };
        tracker.state.reconcile();
        tracker
    }

    /// Seeds the four default templates when the registry is empty.
    ///
    /// Two share the `movement` incompatible group, two are groupless;
    /// all start inactive.
    pub fn ensure_defaults(&mut self) {
        if !self.state.templates.is_empty() {
            return;
        }
        for (name, group) in [
            ("Walk", Some("movement")),
            ("Run", Some("movement")),
            ("Think", None),
            ("Listen to podcast", None),
        ] {
            let template = TaskTemplate {
                id: Uuid::new_v4(),
                name: name.to_string(),
                incompatible_group: group.map(str::to_string),
                created_at: Utc::now(),
            };
            self.state.inactive.push(template.id);
            self.state.templates.push(template);
        }
        self.persist();
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Monotonic change counter; consumers redraw when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Re-reads the persisted blob and replaces local state wholesale.
    ///
    /// Best-effort eventual consistency: this is the periodic poll, not a
    /// transactional merge, and it would overwrite an unsaved local change.
    pub fn reload(&mut self) {
        match self.store.load() {
            Ok(Some(mut state)) => {
                state.reconcile();
                if state != self.state {
                    self.state = state;
                    self.revision += 1;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("reload failed, keeping local state: {e}"),
        }
    }

    fn persist(&mut self) {
        self.state.last_sync = Some(Utc::now());
        if let Err(e) = self.store.save(&self.state) {
            warn!("failed to save tracker state: {e}");
        }
        self.revision += 1;
    }

    // --- task registry ---

    /// Creates a task template and files it as inactive.
    ///
    /// Blank names are rejected with a validation error before any state
    /// is touched.
    pub fn create_template(
        &mut self,
        name: &str,
        incompatible_group: Option<&str>,
    ) -> Result<TaskTemplate> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::Validation("task name must not be empty".into()));
        }
        let template = TaskTemplate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            incompatible_group: incompatible_group
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
            created_at: Utc::now(),
        };
        self.state.templates.push(template.clone());
        self.state.inactive.push(template.id);
        self.persist();
        Ok(template)
    }

    /// Looks up a template by id.
    pub fn template(&self, id: TaskId) -> Option<&TaskTemplate> {
        self.state.template(id)
    }

    /// Deletes a template and its statistics. Irreversible.
    ///
    /// Only inactive tasks may be deleted; attempting to delete an active
    /// one fails without mutating anything.
    pub fn delete_template(&mut self, id: TaskId) -> Result<()> {
        if self.state.template(id).is_none() {
            return Err(TrackerError::NotFound(id));
        }
        if self.state.active.contains(&id) {
            return Err(TrackerError::InvalidState(
                "cannot delete a task that is still active".into(),
            ));
        }
        self.state.inactive.retain(|t| *t != id);
        self.state.templates.retain(|t| t.id != id);
        self.state.statistics.remove(&id);
        self.persist();
        Ok(())
    }

    // --- activation sets ---

    /// Moves a task from the archive into the working list.
    ///
    /// No-op when the id is unknown or already active. Does not start a
    /// timer.
    pub fn activate(&mut self, id: TaskId) {
        let Some(pos) = self.state.inactive.iter().position(|t| *t == id) else {
            return;
        };
        self.state.inactive.remove(pos);
        if !self.state.active.contains(&id) {
            self.state.active.push(id);
        }
        self.persist();
    }

    /// Moves a task from the working list into the archive.
    ///
    /// A running timer is stopped first so the archive never holds a live
    /// session. No-op when already inactive.
    pub fn deactivate(&mut self, id: TaskId) {
        self.deactivate_at(id, Utc::now());
    }

    pub fn deactivate_at(&mut self, id: TaskId, now: DateTime<Utc>) {
        if !self.state.active.contains(&id) {
            return;
        }
        if self.state.is_running(id) {
            self.stop_at(id, now);
        }
        if let Some(pos) = self.state.active.iter().position(|t| *t == id) {
            self.state.active.remove(pos);
            self.state.inactive.push(id);
            self.persist();
        }
    }

    // --- timer & conflict engine ---

    /// Phase one of starting a timer.
    ///
    /// Unknown ids are a silent no-op. When other tasks of the same
    /// incompatible group are running, nothing changes and the conflicting
    /// ids come back for the caller to confirm or drop.
    pub fn request_start(&mut self, id: TaskId) -> StartOutcome {
        self.request_start_at(id, Utc::now())
    }

    pub fn request_start_at(&mut self, id: TaskId, now: DateTime<Utc>) -> StartOutcome {
        let Some(template) = self.state.template(id) else {
            return StartOutcome::UnknownTask;
        };
        if template.incompatible_group.is_some() {
            let conflicting = self.conflicting_running(id);
            if !conflicting.is_empty() {
                return StartOutcome::PendingConfirmation { conflicting };
            }
        }
        self.start_unchecked(id, now);
        StartOutcome::Started
    }

    /// Phase two, affirmative: stops every conflicting task (banking their
    /// elapsed time into today's buckets), then starts this one.
    pub fn confirm_start(&mut self, id: TaskId, conflicting: &[TaskId]) {
        self.confirm_start_at(id, conflicting, Utc::now());
    }

    pub fn confirm_start_at(&mut self, id: TaskId, conflicting: &[TaskId], now: DateTime<Utc>) {
        for other in conflicting {
            self.stop_at(*other, now);
        }
        if self.state.template(id).is_none() {
            return;
        }
        self.start_unchecked(id, now);
    }

    /// Phase two, negative. No state was reserved by the request, so a
    /// pending start can be dropped at any time with nothing to undo.
    pub fn cancel_start(&self) {}

    /// Other active tasks of `id`'s incompatible group whose timers are
    /// running. Active-but-stopped tasks never conflict, nor do tasks
    /// without a group.
    pub fn conflicting_running(&self, id: TaskId) -> Vec<TaskId> {
        let Some(group) = self
            .state
            .template(id)
            .and_then(|t| t.incompatible_group.as_deref())
        else {
            return Vec::new();
        };
        self.state
            .active
            .iter()
            .copied()
            .filter(|other| *other != id)
            .filter(|other| {
                self.state
                    .template(*other)
                    .and_then(|t| t.incompatible_group.as_deref())
                    == Some(group)
            })
            .filter(|other| self.state.is_running(*other))
            .collect()
    }

    fn start_unchecked(&mut self, id: TaskId, now: DateTime<Utc>) {
        let stat = self.state.statistics.entry(id).or_default();
        stat.current_start = Some(now);
        // should already be active; repair membership rather than trust it
        if !self.state.active.contains(&id) {
            self.state.inactive.retain(|t| *t != id);
            self.state.active.push(id);
        }
        self.persist();
    }

    /// Stops a running timer, banking the elapsed time into today's bucket
    /// and pruning this task's retention window.
    ///
    /// Stopping a task with no stat record or no running timer is always a
    /// safe no-op.
    pub fn stop(&mut self, id: TaskId) {
        self.stop_at(id, Utc::now());
    }

    pub fn stop_at(&mut self, id: TaskId, now: DateTime<Utc>) {
        let Some(stat) = self.state.statistics.get_mut(&id) else {
            return;
        };
        let Some(started) = stat.current_start.take() else {
            return;
        };
        let duration = (now - started).num_milliseconds().max(0);
        *stat.daily.entry(stats::date_key(now)).or_insert(0) += duration;
        stats::prune_older_than(stat, RETENTION_DAYS, now);
        self.persist();
    }

    // --- statistics reads ---

    /// The task's stat record, if any time has ever been tracked.
    pub fn stat(&self, id: TaskId) -> Option<&TimerStat> {
        self.state.statistics.get(&id)
    }

    /// Whether the task's timer is currently running.
    pub fn is_running(&self, id: TaskId) -> bool {
        self.state.is_running(id)
    }

    /// Time tracked today, in milliseconds.
    pub fn today_total(&self, id: TaskId) -> i64 {
        self.stat(id)
            .map(|s| stats::today_total(s, Utc::now()))
            .unwrap_or(0)
    }

    /// Today's total plus the running session's elapsed time, for display.
    pub fn live_total(&self, id: TaskId) -> i64 {
        self.stat(id)
            .map(|s| stats::live_total(s, Utc::now()))
            .unwrap_or(0)
    }
}
