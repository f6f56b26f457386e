//! The weekly timetable: sessions from the active sources projected through
//! the current selection onto the slot grid.

use crate::conflict::find_conflict;
use crate::error::SelectionError;
use crate::filter::{render_day, SessionView};
use crate::grid::{placement, Placement, TIME_SLOTS};
use crate::schedule::{
    assign_colors, build_subject_catalog, flatten_all, group_by_day, RawScheduleSource, Session,
    SessionKey, SubjectCatalog, Weekday,
};
use crate::store::{KeyValueStore, SelectionStore};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Write};
use tracing::debug;

/// Where the sessions on screen came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Imported,
    Bundled,
}

/// Flattened session pool for the active data source.
#[derive(Debug, Clone)]
pub struct Timetable {
    sessions: Vec<Session>,
    source: DataSource,
}

impl Timetable {
    /// Uses the imported subjects when there are any, else the bundled ones.
    pub fn build(imported: &[RawScheduleSource], bundled: &[RawScheduleSource]) -> Self {
        let (sources, source) = if imported.is_empty() {
            (bundled, DataSource::Bundled)
        } else {
            (imported, DataSource::Imported)
        };

        let sessions = flatten_all(sources);
        debug!(sessions = sessions.len(), ?source, "Built timetable");
        Self { sessions, source }
    }

    pub fn from_store<S: KeyValueStore>(
        store: &SelectionStore<S>,
        bundled: &[RawScheduleSource],
    ) -> Self {
        Self::build(store.imported_subjects(), bundled)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    /// Projects the pool through the store's current selection.
    pub fn view<S: KeyValueStore>(
        &self,
        store: &SelectionStore<S>,
        palette: &[String],
    ) -> WeekView<'_> {
        self.view_with(
            store.selected_subjects(),
            store.selected_sessions(),
            store.show_unused(),
            palette,
        )
    }

    pub fn view_with(
        &self,
        selected_subjects: &BTreeSet<String>,
        selected_sessions: &BTreeSet<SessionKey>,
        show_all: bool,
        palette: &[String],
    ) -> WeekView<'_> {
        let grouped = group_by_day(&self.sessions);
        let colors = assign_colors(&self.sessions, palette);

        let days = Weekday::ALL
            .iter()
            .map(|&day| {
                let mut row = DayView {
                    day,
                    cells: Vec::new(),
                    unplaced: Vec::new(),
                };

                for view in render_day(
                    day,
                    &grouped,
                    selected_subjects,
                    selected_sessions,
                    &self.sessions,
                    show_all,
                ) {
                    match placement(view.session) {
                        Ok(placement) => {
                            let color = colors.get(&view.session.abbreviation).cloned();
                            row.cells.push(GridCell {
                                view,
                                placement,
                                color,
                            });
                        }
                        Err(_) => row.unplaced.push(view),
                    }
                }
                row
            })
            .collect();

        let catalog = build_subject_catalog(&self.sessions);
        let catalog = catalog
            .entries
            .iter()
            .map(|entry| CatalogLine {
                abbreviation: entry.abbreviation.clone(),
                filtered: selected_subjects.contains(&entry.abbreviation),
                types: entry
                    .types
                    .iter()
                    .map(|&t| (t.badge(), entry.has_selection(t, selected_sessions)))
                    .collect(),
            })
            .collect();

        WeekView {
            days,
            catalog,
            colors,
        }
    }

    /// Checks that toggling `key` is allowed. Deselecting is always allowed;
    /// selecting needs a session in the pool that `selected` does not block.
    pub fn check_toggle(
        &self,
        key: &SessionKey,
        selected: &BTreeSet<SessionKey>,
    ) -> Result<(), SelectionError> {
        if selected.contains(key) {
            return Ok(());
        }

        let session = self
            .sessions
            .iter()
            .find(|s| SessionKey::compute(s) == *key)
            .ok_or_else(|| SelectionError::UnknownSession {
                key: key.to_string(),
            })?;

        match find_conflict(session, selected, &self.sessions) {
            Some(conflict) => Err(SelectionError::Blocked {
                key: key.to_string(),
                with: conflict.with().to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn catalog(&self) -> SubjectCatalog {
        build_subject_catalog(&self.sessions)
    }
}

/// A placed session with its colour.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell<'a> {
    pub view: SessionView<'a>,
    pub placement: Placement,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayView<'a> {
    pub day: Weekday,
    pub cells: Vec<GridCell<'a>>,
    /// Visible sessions whose start time is off the slot grid
    pub unplaced: Vec<SessionView<'a>>,
}

/// One subject row of the catalog: type badges with a selection indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLine {
    pub abbreviation: String,
    pub filtered: bool,
    pub types: Vec<(&'static str, bool)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekView<'a> {
    pub days: Vec<DayView<'a>>,
    pub catalog: Vec<CatalogLine>,
    pub colors: HashMap<String, String>,
}

impl WeekView<'_> {
    pub fn day(&self, day: Weekday) -> Option<&DayView<'_>> {
        self.days.iter().find(|d| d.day == day)
    }

    /// Plain-text rendition for terminals.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WeekView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = String::new();
        for entry in &self.catalog {
            line.clear();
            write!(line, "{}{}", if entry.filtered { "*" } else { " " }, entry.abbreviation)?;
            for (badge, selected) in &entry.types {
                write!(line, " [{}{}]", badge, if *selected { "✓" } else { "" })?;
            }
            writeln!(f, "{}", line)?;
        }

        let first = TIME_SLOTS[0].label();
        let last = TIME_SLOTS[TIME_SLOTS.len() - 1].label();
        writeln!(f, "\nSlots {} .. {}", first, last)?;

        for day in &self.days {
            writeln!(f, "{}", day.day.title())?;
            for cell in &day.cells {
                let session = cell.view.session;
                let state = if cell.view.selected {
                    "selected"
                } else if cell.view.is_disabled() {
                    "blocked"
                } else {
                    ""
                };
                writeln!(
                    f,
                    "  {:>5} {:<8} {} {:<12} cols {:>2}-{:<2} {:<8} {}",
                    session.start_time.get(..5).unwrap_or(&session.start_time),
                    session.abbreviation,
                    session.session_type().badge(),
                    session.teacher,
                    cell.placement.column_start,
                    cell.placement.column_end,
                    state,
                    cell.view.key,
                )?;
            }
            for view in &day.unplaced {
                writeln!(
                    f,
                    "  {:>5} {:<8} {} (off grid)",
                    view.session.start_time,
                    view.session.abbreviation,
                    view.session.session_type().badge(),
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::fixtures::source;
    use crate::store::MemoryStore;

    fn palette() -> Vec<String> {
        vec!["red".to_string(), "blue".to_string()]
    }

    fn key_of(timetable: &Timetable, abbrev: &str, day: Weekday) -> SessionKey {
        let session = timetable
            .sessions()
            .iter()
            .find(|s| s.abbreviation == abbrev && s.day == day)
            .unwrap();
        SessionKey::compute(session)
    }

    fn shown(view: &WeekView<'_>, day: Weekday) -> Vec<(String, bool)> {
        view.day(day)
            .unwrap()
            .cells
            .iter()
            .map(|c| (c.view.session.abbreviation.clone(), c.view.is_disabled()))
            .collect()
    }

    #[test]
    fn test_same_timeslot_hides_other_subject() {
        let mut store = SelectionStore::load(MemoryStore::new());
        store
            .import_subjects(vec![
                source("MAT", &[("Pondělí", "09:00:00", true)]),
                source("FYZ", &[("Pondělí", "09:00:00", false)]),
            ])
            .unwrap();
        let timetable = Timetable::from_store(&store, &[]);
        assert_eq!(timetable.source(), DataSource::Imported);

        let mat = key_of(&timetable, "MAT", Weekday::Monday);
        store.toggle_session(&mat).unwrap();

        let view = timetable.view(&store, &palette());
        assert_eq!(shown(&view, Weekday::Monday), vec![("MAT".to_string(), false)]);

        store.toggle_show_unused().unwrap();
        let view = timetable.view(&store, &palette());
        assert_eq!(
            shown(&view, Weekday::Monday),
            vec![("MAT".to_string(), false), ("FYZ".to_string(), true)]
        );
    }

    #[test]
    fn test_same_subject_type_blocked_across_days() {
        let mut store = SelectionStore::load(MemoryStore::new());
        store
            .import_subjects(vec![source(
                "MAT",
                &[("Pondělí", "09:00:00", true), ("Středa", "12:30:00", true)],
            )])
            .unwrap();
        let timetable = Timetable::from_store(&store, &[]);
        store
            .toggle_session(&key_of(&timetable, "MAT", Weekday::Monday))
            .unwrap();

        let view = timetable.view(&store, &palette());
        assert_eq!(shown(&view, Weekday::Monday).len(), 1);
        assert!(shown(&view, Weekday::Wednesday).is_empty());

        let line = &view.catalog[0];
        assert_eq!(line.types, vec![("P", true)]);
    }

    #[test]
    fn test_reimport_clears_selection_and_shows_everything() {
        let mut store = SelectionStore::load(MemoryStore::new());
        store
            .import_subjects(vec![
                source("MAT", &[("Pondělí", "09:00:00", true)]),
                source("FYZ", &[("Pondělí", "09:00:00", false)]),
            ])
            .unwrap();
        let timetable = Timetable::from_store(&store, &[]);
        store
            .toggle_session(&key_of(&timetable, "MAT", Weekday::Monday))
            .unwrap();

        store
            .import_subjects(vec![source("MAT", &[("Pondělí", "09:00:00", true)])])
            .unwrap();
        let timetable = Timetable::from_store(&store, &[]);
        let view = timetable.view(&store, &palette());
        assert_eq!(shown(&view, Weekday::Monday).len(), 2);
    }

    #[test]
    fn test_check_toggle_refuses_blocked_and_unknown_keys() {
        let mut store = SelectionStore::load(MemoryStore::new());
        store
            .import_subjects(vec![
                source("MAT", &[("Pondělí", "09:00:00", true)]),
                source("FYZ", &[("Pondělí", "09:00:00", false)]),
            ])
            .unwrap();
        let timetable = Timetable::from_store(&store, &[]);
        let mat = key_of(&timetable, "MAT", Weekday::Monday);
        let fyz = key_of(&timetable, "FYZ", Weekday::Monday);

        assert_eq!(timetable.check_toggle(&mat, store.selected_sessions()), Ok(()));
        store.toggle_session(&mat).unwrap();

        assert_eq!(
            timetable.check_toggle(&fyz, store.selected_sessions()),
            Err(SelectionError::Blocked {
                key: fyz.to_string(),
                with: mat.to_string(),
            })
        );

        let unknown = SessionKey::from_raw("Pátek//07:15:00//ALG//true//X//");
        assert!(matches!(
            timetable.check_toggle(&unknown, store.selected_sessions()),
            Err(SelectionError::UnknownSession { .. })
        ));

        // Deselecting is allowed even for keys that no longer resolve
        store.toggle_session(&unknown).unwrap();
        assert_eq!(timetable.check_toggle(&unknown, store.selected_sessions()), Ok(()));
        assert_eq!(timetable.check_toggle(&mat, store.selected_sessions()), Ok(()));
    }

    #[test]
    fn test_bundled_used_only_without_imports() {
        let bundled = vec![source("UPR", &[("Čtvrtek", "14:15:00", false)])];
        let store = SelectionStore::load(MemoryStore::new());
        let timetable = Timetable::from_store(&store, &bundled);
        assert_eq!(timetable.source(), DataSource::Bundled);
        assert_eq!(timetable.sessions().len(), 1);

        let view = timetable.view(&store, &palette());
        let cell = &view.day(Weekday::Thursday).unwrap().cells[0];
        assert_eq!(cell.color.as_deref(), Some("red"));
        assert!(view.to_text().contains("UPR"));
    }

    #[test]
    fn test_unaligned_start_is_listed_off_grid() {
        let store = SelectionStore::load(MemoryStore::new());
        let bundled = vec![source("ALG", &[("Úterý", "09:10:00", true)])];
        let timetable = Timetable::from_store(&store, &bundled);

        let view = timetable.view(&store, &palette());
        let tuesday = view.day(Weekday::Tuesday).unwrap();
        assert!(tuesday.cells.is_empty());
        assert_eq!(tuesday.unplaced.len(), 1);
        assert!(view.to_text().contains("off grid"));
    }
}
