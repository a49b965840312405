//! Trading-notes persistence: one key, one string value. Read once at
//! startup, written back whenever the text changes.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotesStore {
    pub notes: String,
}

impl NotesStore {
    /// Missing or unreadable stores start empty rather than failing the
    /// app.
    pub fn load(path: &str) -> Self {
        if Path::new(path).exists() {
            if let Ok(s) = fs::read_to_string(path) {
                if let Ok(store) = serde_json::from_str::<Self>(&s) {
                    return store;
                }
            }
        }
        Self::default()
    }

    pub fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Write-on-change: persists only when the text actually differs.
    /// Returns whether a write happened.
    pub fn update(&mut self, text: &str, path: &str) -> Result<bool> {
        if self.notes == text {
            return Ok(false);
        }
        self.notes = text.to_string();
        self.save(path)?;
        Ok(true)
    }
}

pub fn default_notes_path() -> Option<String> {
    ProjectDirs::from("", "", "options-ledger-analyzer")
        .map(|dirs| dirs.data_dir().join("notes.json").to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("options-ledger-analyzer-test-{name}"))
            .join("notes.json")
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn missing_store_loads_empty() {
        let store = NotesStore::load(&temp_path("missing"));
        assert_eq!(store, NotesStore::default());
    }

    #[test]
    fn update_round_trips_and_skips_no_ops() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_file(&path);

        let mut store = NotesStore::load(&path);
        assert!(store.update("watch IV into earnings", &path).unwrap());
        assert!(!store.update("watch IV into earnings", &path).unwrap());

        let reloaded = NotesStore::load(&path);
        assert_eq!(reloaded.notes, "watch IV into earnings");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn corrupt_store_loads_empty() {
        let path = temp_path("corrupt");
        if let Some(parent) = Path::new(&path).parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "not json at all").unwrap();
        assert_eq!(NotesStore::load(&path), NotesStore::default());
        let _ = fs::remove_file(&path);
    }
}
