//! Durable key-value storage for the cycle state

use std::{fs, path::PathBuf};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{error::StoreError, state::CycleState};

/// Durable home of the cycle state.
///
/// `load` returns `Ok(None)` when nothing was ever saved; callers treat
/// errors the same way and fall back to defaults.
pub trait StateStore: Send {
    fn load(&self, default_duration: u64) -> Result<Option<CycleState>, StoreError>;
    fn save(&mut self, state: &CycleState) -> Result<(), StoreError>;
}

/// Store backed by a single JSON object on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, default_duration: u64) -> Result<Option<CycleState>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(pairs) => Ok(Some(CycleState::from_pairs(&pairs, default_duration))),
            _ => Err(StoreError::NotAnObject),
        }
    }

    fn save(&mut self, state: &CycleState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        // Write beside the target and rename so a crash never leaves half a file
        let staging = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&Value::Object(state.to_pairs()))?;
        fs::write(&staging, body).map_err(|e| self.io_error(e))?;
        fs::rename(&staging, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

/// Store that lives only as long as the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pairs: Option<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, default_duration: u64) -> Result<Option<CycleState>, StoreError> {
        Ok(self
            .pairs
            .as_ref()
            .map(|pairs| CycleState::from_pairs(pairs, default_duration)))
    }

    fn save(&mut self, state: &CycleState) -> Result<(), StoreError> {
        self.pairs = Some(state.to_pairs());
        Ok(())
    }
}

/// Default location of the state file: `$HOME/.local/state/focus-bell/state.json`
pub fn default_state_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("focus-bell")
            .join("state.json"),
        None => PathBuf::from("focus-bell-state.json"),
    }
}
