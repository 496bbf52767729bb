//! Persistence gateway: the whole tracker state travels as one JSON blob.

use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::models::TrackerState;

/// Abstract load/save of the serialized tracker state.
///
/// The engine persists fire-and-forget: it neither knows nor cares where
/// the blob lives, and a failed save never rolls back an in-memory change.
pub trait StorageGateway {
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<TrackerState>>;
    fn save(&self, state: &TrackerState) -> Result<()>;
}

/// Returns the path to the tracker state file (`tracker.json`).
///
/// The path is determined in the following order:
/// 1. `TIMETRACK_DB` environment variable.
/// 2. `~/.local/share/timetrack/tracker.json` (on Linux).
/// 3. `./tracker.json` (fallback).
fn default_db_path() -> PathBuf {
    std::env::var("TIMETRACK_DB").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("timetrack");
        if !p.exists() {
            let _ = fs::create_dir_all(&p);
        }
        p.push("tracker.json");
        p
    })
}

/// File-backed gateway storing pretty-printed JSON at a fixed path.
pub struct JsonFileGateway {
    path: PathBuf,
}

impl JsonFileGateway {
    pub fn new(path: PathBuf) -> Self {
        JsonFileGateway { path }
    }

    /// Gateway at the standard data-directory location (see [`default_db_path`]).
    pub fn default_location() -> Self {
        Self::new(default_db_path())
    }
}

impl StorageGateway for JsonFileGateway {
    fn load(&self) -> Result<Option<TrackerState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut f = OpenOptions::new().read(true).open(&self.path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let state = serde_json::from_str(&s)?;
        Ok(Some(state))
    }

    fn save(&self, state: &TrackerState) -> Result<()> {
        let s = serde_json::to_string_pretty(state)?;
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }
}

/// In-memory gateway; clones share the same slot.
///
/// The blob is held serialized so consumers exercise the same
/// serialize/deserialize path as the file gateway. Used by tests and by
/// embedders that bring their own persistence.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    slot: Arc<Mutex<Option<String>>>,
}

impl StorageGateway for MemoryGateway {
    fn load(&self) -> Result<Option<TrackerState>> {
        let slot = self.slot.lock().expect("gateway mutex poisoned");
        match slot.as_deref() {
            Some(s) => Ok(Some(serde_json::from_str(s)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &TrackerState) -> Result<()> {
        let s = serde_json::to_string(state)?;
        *self.slot.lock().expect("gateway mutex poisoned") = Some(s);
        Ok(())
    }
}
