//! Per-session UI state with an injected persistence port.
//!
//! The store loads once when constructed and saves after every change. Core
//! functions in [`crate::collapse`] only see plain values handed to them here.

mod persistence;

pub use persistence::{FileStatePersistence, StatePersistence};

#[cfg(test)]
pub use persistence::MockStatePersistence;

use crate::collapse::{self, CollapseState, ManualLocks};
use crate::keys::SectionKey;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Settings that outlive a single session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub session_id: Option<String>,
    pub theme: Theme,
    pub auto_collapse: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            session_id: None,
            theme: Theme::Light,
            auto_collapse: true,
        }
    }
}

/// Collapse flags and manual locks of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionUiState {
    pub collapsed: CollapseState,
    pub manual_locks: ManualLocks,
}

/// `session_<unix-millis>_<9 base36 chars>`
pub fn generate_session_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!(
        "session_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

pub struct SessionStore {
    persistence: Box<dyn StatePersistence>,
    preferences: Preferences,
    session_id: String,
    sections: SectionUiState,
}

impl SessionStore {
    /// Load preferences and the current session's section state.
    /// Unreadable state is replaced by defaults.
    pub fn load(persistence: Box<dyn StatePersistence>) -> Self {
        let mut preferences = persistence.load_preferences().unwrap_or_else(|e| {
            warn!("Failed to load preferences, using defaults: {}", e);
            None
        });
        let created = preferences.is_none();
        let mut preferences = preferences.take().unwrap_or_default();

        let (session_id, new_session) = match preferences.session_id.clone() {
            Some(id) if !id.is_empty() => (id, false),
            _ => (generate_session_id(), true),
        };
        preferences.session_id = Some(session_id.clone());

        let sections = persistence
            .load_sections(&session_id)
            .unwrap_or_else(|e| {
                warn!("Failed to load section state for {}: {}", session_id, e);
                None
            })
            .unwrap_or_default();

        let mut store = Self {
            persistence,
            preferences,
            session_id,
            sections,
        };
        if created || new_session {
            debug!("Starting session {}", store.session_id);
            store.save_preferences();
        }
        store
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn theme(&self) -> Theme {
        self.preferences.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.preferences.theme != theme {
            self.preferences.theme = theme;
            self.save_preferences();
        }
    }

    pub fn auto_collapse(&self) -> bool {
        self.preferences.auto_collapse
    }

    /// Turning automation off also forgets all collapse flags and locks
    pub fn set_auto_collapse(&mut self, enabled: bool) {
        self.preferences.auto_collapse = enabled;
        self.save_preferences();
        if !enabled {
            self.sections = SectionUiState::default();
            self.save_sections();
        }
    }

    pub fn collapse_state(&self) -> &CollapseState {
        &self.sections.collapsed
    }

    pub fn manual_locks(&self) -> &ManualLocks {
        &self.sections.manual_locks
    }

    pub fn is_collapsed(&self, key: &SectionKey) -> bool {
        self.sections.collapsed.is_set(key)
    }

    /// Apply the automatic policy to one message's keys (document order)
    pub fn apply_auto_collapse(&mut self, keys: &[SectionKey]) {
        if keys.is_empty() {
            return;
        }
        let next = collapse::reconcile(
            &self.sections.collapsed,
            keys,
            &self.sections.manual_locks,
            self.preferences.auto_collapse,
        );
        if next != self.sections.collapsed {
            self.sections.collapsed = next;
            self.save_sections();
        }
    }

    /// User toggle; returns the new collapsed value
    pub fn toggle(&mut self, key: &SectionKey) -> bool {
        let collapsed = collapse::toggle(
            &mut self.sections.collapsed,
            &mut self.sections.manual_locks,
            key,
        );
        self.save_sections();
        collapsed
    }

    pub fn expand(&mut self, key: &SectionKey) {
        collapse::expand(
            &mut self.sections.collapsed,
            &mut self.sections.manual_locks,
            key,
        );
        self.save_sections();
    }

    fn save_preferences(&mut self) {
        if let Err(e) = self.persistence.save_preferences(&self.preferences) {
            warn!("Failed to save preferences: {}", e);
        }
    }

    fn save_sections(&mut self) {
        if let Err(e) = self
            .persistence
            .save_sections(&self.session_id, &self.sections)
        {
            warn!("Failed to save section state for {}: {}", self.session_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{assign_key, keys_for};
    use crate::sections::{extract_sections, SectionKind};

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_new_store_creates_and_saves_session() {
        let persistence = MockStatePersistence::new();
        let store = SessionStore::load(Box::new(persistence.clone()));

        assert!(store.session_id().starts_with("session_"));
        assert!(store.auto_collapse());
        let saved = persistence.saved_preferences().unwrap();
        assert_eq!(saved.session_id.as_deref(), Some(store.session_id()));
    }

    #[test]
    fn test_state_survives_reload() {
        let persistence = MockStatePersistence::new();
        let keys = keys_for(
            Some(1),
            &extract_sections("<Analyze>a</Analyze><Code>b</Code>"),
        );

        let session_id = {
            let mut store = SessionStore::load(Box::new(persistence.clone()));
            store.apply_auto_collapse(&keys);
            store.toggle(&keys[1]);
            store.set_theme(Theme::Dark);
            store.session_id().to_string()
        };

        let store = SessionStore::load(Box::new(persistence.clone()));
        assert_eq!(store.session_id(), session_id);
        assert_eq!(store.theme(), Theme::Dark);
        assert!(store.is_collapsed(&keys[0]));
        assert!(store.is_collapsed(&keys[1]));
        assert!(store.manual_locks().is_set(&keys[1]));
    }

    #[test]
    fn test_disabling_auto_collapse_clears_state() {
        let persistence = MockStatePersistence::new();
        let mut store = SessionStore::load(Box::new(persistence.clone()));
        let keys = keys_for(Some(0), &extract_sections("<Code>a</Code><Code>b</Code>"));

        store.apply_auto_collapse(&keys);
        store.toggle(&keys[1]);
        assert!(!store.collapse_state().is_empty());

        store.set_auto_collapse(false);
        assert!(store.collapse_state().is_empty());
        assert!(store.manual_locks().is_empty());

        // Policy is inert while disabled
        store.apply_auto_collapse(&keys);
        assert!(store.collapse_state().is_empty());
        assert_eq!(
            persistence.saved_sections(store.session_id()),
            Some(SectionUiState::default())
        );
    }

    #[test]
    fn test_unchanged_policy_does_not_save() {
        let persistence = MockStatePersistence::new();
        let mut store = SessionStore::load(Box::new(persistence.clone()));
        let keys = vec![assign_key(Some(0), SectionKind::Answer, 0)];

        store.apply_auto_collapse(&keys);
        let saves = persistence.save_count();
        store.apply_auto_collapse(&keys);
        assert_eq!(persistence.save_count(), saves);
    }

    #[test]
    fn test_file_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let keys = keys_for(Some(0), &extract_sections("<Analyze>a</Analyze><Answer>b</Answer>"));

        let session_id = {
            let mut store =
                SessionStore::load(Box::new(FileStatePersistence::new(dir.path().to_path_buf())));
            store.apply_auto_collapse(&keys);
            store.session_id().to_string()
        };

        assert!(dir.path().join("preferences.json").exists());
        assert!(dir
            .path()
            .join("sessions")
            .join(format!("{session_id}.json"))
            .exists());

        let store =
            SessionStore::load(Box::new(FileStatePersistence::new(dir.path().to_path_buf())));
        assert_eq!(store.session_id(), session_id);
        assert!(store.is_collapsed(&keys[0]));
        assert!(!store.is_collapsed(&keys[1]));
    }

    #[test]
    fn test_corrupt_state_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("preferences.json"), "{not json").unwrap();

        let store =
            SessionStore::load(Box::new(FileStatePersistence::new(dir.path().to_path_buf())));
        assert!(store.auto_collapse());
        assert!(store.collapse_state().is_empty());
    }

    #[test]
    fn test_session_id_cannot_escape_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut persistence = FileStatePersistence::new(dir.path().to_path_buf());
        assert!(persistence
            .save_sections("../escape", &SectionUiState::default())
            .is_err());
    }
}
