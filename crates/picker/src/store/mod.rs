/// Selection store: the single source of truth for what the user picked
mod kv;
mod library;

pub use kv::{KeyValueStore, MemoryStore, SqliteStore};
pub use library::{merge_subjects, MergeReport};

use crate::error::StoreResult;
use crate::schedule::{RawScheduleSource, SessionKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Persisted keys.
pub const SELECTED_ENTRIES_KEY: &str = "selectedEntries";
pub const SELECTED_SUBJECTS_KEY: &str = "selectedSubjects";
pub const SHOW_UNUSED_KEY: &str = "showUnusedClasses";
pub const IMPORTED_SUBJECTS_KEY: &str = "importedSubjects";

/// Holds the selected sessions, the subject filter, the "show unused" flag
/// and the imported subjects, persisting every change to `S`.
///
/// All mutation goes through the methods below. In-memory state is updated
/// even when persisting fails; the returned error is only a notice.
pub struct SelectionStore<S: KeyValueStore> {
    kv: S,
    selected_sessions: BTreeSet<SessionKey>,
    selected_subjects: BTreeSet<String>,
    show_unused: bool,
    imported: Vec<RawScheduleSource>,
}

impl<S: KeyValueStore> SelectionStore<S> {
    /// Loads state from `kv`. Missing or unreadable values fall back to
    /// empty defaults.
    pub fn load(kv: S) -> Self {
        let selected_sessions: Vec<SessionKey> = read_json(&kv, SELECTED_ENTRIES_KEY);
        let selected_subjects: Vec<String> = read_json(&kv, SELECTED_SUBJECTS_KEY);
        let imported: Vec<RawScheduleSource> = read_json(&kv, IMPORTED_SUBJECTS_KEY);
        let show_unused = read_raw(&kv, SHOW_UNUSED_KEY).as_deref() == Some("true");

        info!(
            sessions = selected_sessions.len(),
            subjects = selected_subjects.len(),
            imported = imported.len(),
            show_unused,
            "Loaded selection state"
        );

        Self {
            kv,
            selected_sessions: selected_sessions.into_iter().collect(),
            selected_subjects: selected_subjects.into_iter().collect(),
            show_unused,
            imported,
        }
    }

    pub fn selected_sessions(&self) -> &BTreeSet<SessionKey> {
        &self.selected_sessions
    }

    pub fn selected_subjects(&self) -> &BTreeSet<String> {
        &self.selected_subjects
    }

    pub fn show_unused(&self) -> bool {
        self.show_unused
    }

    pub fn imported_subjects(&self) -> &[RawScheduleSource] {
        &self.imported
    }

    /// Flips membership of `key` in the selection. No conflict validation
    /// happens here. Returns whether the key is now selected.
    pub fn toggle_session(&mut self, key: &SessionKey) -> StoreResult<bool> {
        let selected = if self.selected_sessions.remove(key) {
            false
        } else {
            self.selected_sessions.insert(key.clone());
            true
        };
        self.persist_sessions()?;
        Ok(selected)
    }

    /// Flips `abbreviation` in the subject filter. Never touches the session
    /// selection. Returns whether the subject is now filtered on.
    pub fn toggle_subject_filter(&mut self, abbreviation: &str) -> StoreResult<bool> {
        let active = if self.selected_subjects.remove(abbreviation) {
            false
        } else {
            self.selected_subjects.insert(abbreviation.to_string());
            true
        };
        self.persist_subjects()?;
        Ok(active)
    }

    /// Flips the "show unused classes" override.
    pub fn toggle_show_unused(&mut self) -> StoreResult<bool> {
        self.show_unused = !self.show_unused;
        self.kv
            .set(SHOW_UNUSED_KEY, if self.show_unused { "true" } else { "false" })
            .inspect_err(|e| warn!(error = %e, "Failed to persist show-unused flag"))?;
        Ok(self.show_unused)
    }

    /// Merges imported subjects by title and clears both selections, since
    /// stored keys may no longer resolve.
    pub fn import_subjects(&mut self, subjects: Vec<RawScheduleSource>) -> StoreResult<MergeReport> {
        let report = merge_subjects(&mut self.imported, subjects);
        info!(
            replaced = report.replaced.len(),
            added = report.added.len(),
            "Imported subjects"
        );
        self.clear_selection_and_persist()?;
        Ok(report)
    }

    /// Removes one imported subject. Returns false if no subject had that
    /// title.
    pub fn remove_subject(&mut self, title: &str) -> StoreResult<bool> {
        let before = self.imported.len();
        self.imported.retain(|s| s.title != title);
        if self.imported.len() == before {
            return Ok(false);
        }
        self.clear_selection_and_persist()?;
        Ok(true)
    }

    /// Drops every imported subject.
    pub fn clear_subjects(&mut self) -> StoreResult<()> {
        self.imported.clear();
        self.clear_selection_and_persist()
    }

    fn clear_selection_and_persist(&mut self) -> StoreResult<()> {
        self.selected_sessions.clear();
        self.selected_subjects.clear();

        // Attempt every write; report the first failure
        let results = [
            write_json(&self.kv, IMPORTED_SUBJECTS_KEY, &self.imported),
            self.persist_sessions(),
            self.persist_subjects(),
        ];
        results.into_iter().collect()
    }

    fn persist_sessions(&self) -> StoreResult<()> {
        write_json(&self.kv, SELECTED_ENTRIES_KEY, &self.selected_sessions)
    }

    fn persist_subjects(&self) -> StoreResult<()> {
        write_json(&self.kv, SELECTED_SUBJECTS_KEY, &self.selected_subjects)
    }
}

fn read_raw<S: KeyValueStore>(kv: &S, key: &str) -> Option<String> {
    kv.get(key)
        .inspect_err(|e| warn!(key, error = %e, "Failed to read persisted value"))
        .ok()
        .flatten()
}

fn read_json<T: DeserializeOwned + Default, S: KeyValueStore>(kv: &S, key: &str) -> T {
    let Some(raw) = read_raw(kv, key) else {
        return T::default();
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(key, error = %e, "Ignoring malformed persisted value");
        T::default()
    })
}

fn write_json<T: Serialize + ?Sized, S: KeyValueStore>(
    kv: &S,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let encoded = serde_json::to_string(value)?;
    kv.set(key, &encoded)
        .inspect_err(|e| warn!(key, error = %e, "Failed to persist value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::schedule::fixtures::{session, source};
    use crate::schedule::Weekday;

    /// Store whose writes always fail.
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.0.get(key)
        }
        fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::Poisoned)
        }
        fn remove(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Poisoned)
        }
    }

    fn key(day: Weekday, start: &str, abbrev: &str) -> SessionKey {
        SessionKey::compute(&session(day, start, abbrev, true))
    }

    #[test]
    fn test_load_defaults_when_empty() {
        let store = SelectionStore::load(MemoryStore::new());
        assert!(store.selected_sessions().is_empty());
        assert!(store.selected_subjects().is_empty());
        assert!(!store.show_unused());
        assert!(store.imported_subjects().is_empty());
    }

    #[test]
    fn test_load_tolerates_malformed_values() {
        let kv = MemoryStore::new();
        kv.set(SELECTED_ENTRIES_KEY, "{not json").unwrap();
        kv.set(SELECTED_SUBJECTS_KEY, "42").unwrap();
        kv.set(SHOW_UNUSED_KEY, "yes").unwrap();
        kv.set(IMPORTED_SUBJECTS_KEY, "[{\"title\": 1}]").unwrap();

        let store = SelectionStore::load(kv);
        assert!(store.selected_sessions().is_empty());
        assert!(store.selected_subjects().is_empty());
        assert!(!store.show_unused());
        assert!(store.imported_subjects().is_empty());
    }

    #[test]
    fn test_toggle_session_is_idempotent_pair() {
        let mut store = SelectionStore::load(MemoryStore::new());
        let k = key(Weekday::Monday, "09:00:00", "MAT");
        let before = store.selected_sessions().clone();

        assert!(store.toggle_session(&k).unwrap());
        assert!(store.selected_sessions().contains(&k));
        assert!(!store.toggle_session(&k).unwrap());
        assert_eq!(store.selected_sessions(), &before);
    }

    #[test]
    fn test_toggles_persist_and_reload() {
        let mut store = SelectionStore::load(MemoryStore::new());
        let k = key(Weekday::Friday, "07:15:00", "FYZ");
        store.toggle_session(&k).unwrap();
        store.toggle_subject_filter("FYZ").unwrap();
        store.toggle_show_unused().unwrap();

        let reloaded = SelectionStore::load(store.kv);
        assert!(reloaded.selected_sessions().contains(&k));
        assert!(reloaded.selected_subjects().contains("FYZ"));
        assert!(reloaded.show_unused());
    }

    #[test]
    fn test_subject_filter_never_touches_sessions() {
        let mut store = SelectionStore::load(MemoryStore::new());
        let k = key(Weekday::Monday, "09:00:00", "MAT");
        store.toggle_session(&k).unwrap();

        store.toggle_subject_filter("MAT").unwrap();
        store.toggle_subject_filter("MAT").unwrap();
        assert!(store.selected_sessions().contains(&k));
        assert!(store.selected_subjects().is_empty());
    }

    #[test]
    fn test_reimport_replaces_subject_and_clears_selection() {
        let mut store = SelectionStore::load(MemoryStore::new());
        store
            .import_subjects(vec![source("MAT", &[("Pondělí", "09:00:00", true)])])
            .unwrap();
        store
            .toggle_session(&key(Weekday::Monday, "09:00:00", "MAT"))
            .unwrap();
        store.toggle_subject_filter("MAT").unwrap();

        let second = source("MAT", &[("Úterý", "10:45:00", false)]);
        let report = store.import_subjects(vec![second.clone()]).unwrap();

        assert_eq!(report.replaced, vec!["MAT"]);
        assert_eq!(store.imported_subjects(), &[second]);
        assert!(store.selected_sessions().is_empty());
        assert!(store.selected_subjects().is_empty());

        let reloaded = SelectionStore::load(store.kv);
        assert_eq!(reloaded.imported_subjects().len(), 1);
        assert!(reloaded.selected_sessions().is_empty());
    }

    #[test]
    fn test_remove_and_clear_subjects() {
        let mut store = SelectionStore::load(MemoryStore::new());
        store
            .import_subjects(vec![
                source("MAT", &[("Pondělí", "09:00:00", true)]),
                source("FYZ", &[("Úterý", "10:45:00", true)]),
            ])
            .unwrap();

        assert!(!store.remove_subject("ALG").unwrap());
        assert!(store.remove_subject("MAT").unwrap());
        assert_eq!(store.imported_subjects().len(), 1);

        store.clear_subjects().unwrap();
        assert!(store.imported_subjects().is_empty());
    }

    #[test]
    fn test_write_failure_keeps_in_memory_state() {
        let mut store = SelectionStore::load(ReadOnlyStore(MemoryStore::new()));
        let k = key(Weekday::Monday, "09:00:00", "MAT");

        assert!(store.toggle_session(&k).is_err());
        assert!(store.selected_sessions().contains(&k));
    }
}
