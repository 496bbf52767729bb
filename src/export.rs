//! Read-only JSON export of templates and daily statistics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::models::{TaskId, TaskTemplate, TimerStat};

/// Builds the export document:
/// `{ tasks, statistics: { <id>: { daily } }, exportedAt }`.
///
/// Only the daily maps are exported; a running `current_start` is a live
/// session, not history. Pure and read-only.
pub fn export_document(
    templates: &[TaskTemplate],
    statistics: &HashMap<TaskId, TimerStat>,
    now: DateTime<Utc>,
) -> Value {
    let mut stats = Map::new();
    for (id, stat) in statistics {
        stats.insert(id.to_string(), json!({ "daily": stat.daily }));
    }
    json!({
        "tasks": templates,
        "statistics": Value::Object(stats),
        "exportedAt": now.to_rfc3339(),
    })
}

/// Default export filename, dated by the UTC day of the export.
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("time-tracker-export-{}.json", now.date_naive().format("%Y-%m-%d"))
}
