use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique task identifier.
pub type TaskId = Uuid;

/// A user-defined activity that time can be tracked against.
///
/// Templates are immutable after creation; the only lifecycle event is
/// deletion, which is permitted while the task is inactive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskTemplate {
    /// Unique identifier for the task.
    pub id: TaskId,
    /// The name of the activity.
    pub name: String,
    /// Tasks sharing the same group must not run at the same time.
    #[serde(default)]
    pub incompatible_group: Option<String>,
    /// Timestamp when the task was created.
    pub created_at: DateTime<Utc>,
}

/// Accumulated time for one task.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TimerStat {
    /// Start of the running session, if one is in progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_start: Option<DateTime<Utc>>,
    /// Milliseconds tracked per UTC calendar day, keyed `YYYY-MM-DD`.
    #[serde(default)]
    pub daily: BTreeMap<String, i64>,
}

impl TimerStat {
    /// Whether the task's timer is currently accumulating time.
    pub fn is_running(&self) -> bool {
        self.current_start.is_some()
    }
}

/// The entire tracker state, persisted as a single blob.
///
/// Every template id appears in exactly one of `active`/`inactive`; the
/// sets are kept as vectors so the user-visible ordering survives a
/// round-trip. All fields default individually so a blob written by an
/// older build loads field-by-field instead of being rejected wholesale.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    #[serde(default)]
    pub templates: Vec<TaskTemplate>,
    /// Tasks in the working list.
    #[serde(default)]
    pub active: Vec<TaskId>,
    /// Tasks in the archive.
    #[serde(default)]
    pub inactive: Vec<TaskId>,
    #[serde(default)]
    pub statistics: HashMap<TaskId, TimerStat>,
    /// When the state was last handed to the persistence gateway.
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl TrackerState {
    /// Looks up a template by id.
    pub fn template(&self, id: TaskId) -> Option<&TaskTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Whether the task's timer is currently running.
    pub fn is_running(&self, id: TaskId) -> bool {
        self.statistics.get(&id).map(TimerStat::is_running).unwrap_or(false)
    }

    /// Repairs a freshly deserialized blob so the invariants hold.
    ///
    /// - activation entries with no backing template are dropped;
    /// - duplicates are removed, and an id listed in both sets stays active;
    /// - template ids missing from both sets are filed under `inactive`;
    /// - statistics for unknown ids are dropped;
    /// - a running timer on a task outside the active set is cleared.
    pub fn reconcile(&mut self) {
        let known: HashSet<TaskId> = self.templates.iter().map(|t| t.id).collect();
        self.active.retain(|id| known.contains(id));
        self.inactive.retain(|id| known.contains(id));

        let mut seen = HashSet::new();
        self.active.retain(|id| seen.insert(*id));
        self.inactive.retain(|id| seen.insert(*id));

        for t in &self.templates {
            if seen.insert(t.id) {
                self.inactive.push(t.id);
            }
        }

        self.statistics.retain(|id, _| known.contains(id));
        for (id, stat) in self.statistics.iter_mut() {
            if stat.is_running() && !self.active.contains(id) {
                stat.current_start = None;
            }
        }
    }
}
