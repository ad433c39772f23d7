use super::{Preferences, SectionUiState};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage port for UI state. The store calls it; core logic never does.
pub trait StatePersistence: Send + Sync {
    fn load_preferences(&self) -> Result<Option<Preferences>>;
    fn save_preferences(&mut self, preferences: &Preferences) -> Result<()>;
    fn load_sections(&self, session_id: &str) -> Result<Option<SectionUiState>>;
    fn save_sections(&mut self, session_id: &str, state: &SectionUiState) -> Result<()>;
}

/// JSON files under a state directory:
/// `preferences.json` and `sessions/<session_id>.json`
pub struct FileStatePersistence {
    root_dir: PathBuf,
}

impl FileStatePersistence {
    pub fn new(root_dir: PathBuf) -> Self {
        Self { root_dir }
    }

    fn preferences_path(&self) -> PathBuf {
        self.root_dir.join(PREFERENCES_FILE)
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        // Session ids are generated locally, but the file name must not escape the directory
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            anyhow::bail!("Invalid session id: {:?}", session_id);
        }
        Ok(self
            .root_dir
            .join(SESSIONS_DIR)
            .join(format!("{}.json", session_id)))
    }
}

const PREFERENCES_FILE: &str = "preferences.json";
const SESSIONS_DIR: &str = "sessions";

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    debug!("Loading state from {}", path.display());
    let json = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&json)?))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    debug!("Saving state to {}", path.display());
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

impl StatePersistence for FileStatePersistence {
    fn load_preferences(&self) -> Result<Option<Preferences>> {
        read_json(&self.preferences_path())
    }

    fn save_preferences(&mut self, preferences: &Preferences) -> Result<()> {
        write_json(&self.preferences_path(), preferences)
    }

    fn load_sections(&self, session_id: &str) -> Result<Option<SectionUiState>> {
        read_json(&self.session_path(session_id)?)
    }

    fn save_sections(&mut self, session_id: &str, state: &SectionUiState) -> Result<()> {
        write_json(&self.session_path(session_id)?, state)
    }
}

/// In-memory persistence; clones share the same storage so tests can inspect it
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockStatePersistence {
    inner: std::sync::Arc<std::sync::Mutex<MockState>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    preferences: Option<Preferences>,
    sections: std::collections::HashMap<String, SectionUiState>,
    saves: usize,
}

#[cfg(test)]
impl MockStatePersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_sections(&self, session_id: &str) -> Option<SectionUiState> {
        self.inner.lock().unwrap().sections.get(session_id).cloned()
    }

    pub fn saved_preferences(&self) -> Option<Preferences> {
        self.inner.lock().unwrap().preferences.clone()
    }

    pub fn save_count(&self) -> usize {
        self.inner.lock().unwrap().saves
    }
}

#[cfg(test)]
impl StatePersistence for MockStatePersistence {
    fn load_preferences(&self) -> Result<Option<Preferences>> {
        Ok(self.inner.lock().unwrap().preferences.clone())
    }

    fn save_preferences(&mut self, preferences: &Preferences) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.preferences = Some(preferences.clone());
        inner.saves += 1;
        Ok(())
    }

    fn load_sections(&self, session_id: &str) -> Result<Option<SectionUiState>> {
        Ok(self.inner.lock().unwrap().sections.get(session_id).cloned())
    }

    fn save_sections(&mut self, session_id: &str, state: &SectionUiState) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sections.insert(session_id.to_string(), state.clone());
        inner.saves += 1;
        Ok(())
    }
}
