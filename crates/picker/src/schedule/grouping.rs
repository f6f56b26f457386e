//! Grouping sessions per day and deriving the subject catalog.
//!
//! Everything here is recomputed from scratch on every pass; the pools are
//! tens of sessions.

use super::key::SessionKey;
use super::types::{Session, SessionType, Weekday};
use std::collections::{BTreeMap, HashMap};

/// Sessions per weekday, each list sorted by start time.
pub type DayGroups<'a> = BTreeMap<Weekday, Vec<&'a Session>>;

/// Groups sessions by day. All five weekdays are present, possibly empty.
///
/// Within a day sessions are ordered by `start_time` string comparison. The
/// sort is stable, so simultaneous sessions keep their input order.
pub fn group_by_day(sessions: &[Session]) -> DayGroups<'_> {
    let mut grouped: DayGroups<'_> = Weekday::ALL.iter().map(|d| (*d, Vec::new())).collect();

    for session in sessions {
        grouped.entry(session.day).or_default().push(session);
    }

    for day_sessions in grouped.values_mut() {
        day_sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    }

    grouped
}

/// A subject and the session types it offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub abbreviation: String,
    pub types: Vec<SessionType>,
}

impl CatalogEntry {
    /// Returns true if any selected key belongs to this subject and type.
    ///
    /// Works off the decoded key, so it holds for keys that no longer resolve.
    pub fn has_selection<'k>(
        &self,
        session_type: SessionType,
        selected: impl IntoIterator<Item = &'k SessionKey>,
    ) -> bool {
        selected
            .into_iter()
            .any(|key| key.matches_subject_type(&self.abbreviation, session_type))
    }
}

/// Subjects in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectCatalog {
    pub entries: Vec<CatalogEntry>,
}

impl SubjectCatalog {
    pub fn get(&self, abbreviation: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.abbreviation == abbreviation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the catalog of unique subject/type combinations.
pub fn build_subject_catalog(sessions: &[Session]) -> SubjectCatalog {
    let mut catalog = SubjectCatalog::default();

    for session in sessions {
        let session_type = session.session_type();
        match catalog
            .entries
            .iter_mut()
            .find(|e| e.abbreviation == session.abbreviation)
        {
            Some(entry) => {
                if !entry.types.contains(&session_type) {
                    entry.types.push(session_type);
                }
            }
            None => catalog.entries.push(CatalogEntry {
                abbreviation: session.abbreviation.clone(),
                types: vec![session_type],
            }),
        }
    }

    catalog
}

/// Assigns each subject a palette colour in first-seen order, cycling when
/// the palette runs out.
pub fn assign_colors(sessions: &[Session], palette: &[String]) -> HashMap<String, String> {
    let mut colors = HashMap::new();
    if palette.is_empty() {
        return colors;
    }

    for session in sessions {
        if !colors.contains_key(&session.abbreviation) {
            let color = palette[colors.len() % palette.len()].clone();
            colors.insert(session.abbreviation.clone(), color);
        }
    }

    colors
}
