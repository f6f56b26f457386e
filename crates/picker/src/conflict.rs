//! Conflict detection between a candidate session and the current selection.
//!
//! A candidate is blocked by a selected session when both belong to the same
//! subject and type, or when both start at the same time on the same day.
//! Selected keys that no longer resolve to a session are skipped.

use crate::schedule::{Session, SessionKey};
use tracing::trace;

/// Why a candidate session is blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Another session of the same subject and type is selected
    SameSubjectType { with: SessionKey },
    /// A different session already occupies this day and start time
    SameTimeslot { with: SessionKey },
}

impl Conflict {
    /// Key of the selected session the candidate collides with.
    pub fn with(&self) -> &SessionKey {
        match self {
            Conflict::SameSubjectType { with } | Conflict::SameTimeslot { with } => with,
        }
    }
}

/// Resolves selected keys to sessions by linear lookup (first match).
///
/// Stale keys are dropped silently.
pub fn resolve_selected<'a, 'k>(
    selected: impl IntoIterator<Item = &'k SessionKey>,
    all_sessions: &'a [Session],
) -> Vec<(&'k SessionKey, &'a Session)> {
    selected
        .into_iter()
        .filter_map(|key| {
            let found = all_sessions
                .iter()
                .find(|s| SessionKey::compute(s) == *key);
            if found.is_none() {
                trace!(key = %key, "Selected key does not resolve to any session");
            }
            found.map(|s| (key, s))
        })
        .collect()
}

/// Returns the first conflict between `candidate` and the selection, if any.
pub fn find_conflict<'k>(
    candidate: &Session,
    selected: impl IntoIterator<Item = &'k SessionKey>,
    all_sessions: &[Session],
) -> Option<Conflict> {
    let candidate_key = SessionKey::compute(candidate);

    for (key, chosen) in resolve_selected(selected, all_sessions) {
        // A session never conflicts with itself
        if *key == candidate_key {
            continue;
        }

        if candidate.abbreviation == chosen.abbreviation
            && candidate.is_lecture == chosen.is_lecture
        {
            return Some(Conflict::SameSubjectType { with: key.clone() });
        }

        if candidate.day == chosen.day && candidate.start_time == chosen.start_time {
            return Some(Conflict::SameTimeslot { with: key.clone() });
        }
    }

    None
}

/// Returns true if `candidate` collides with any selected session.
pub fn is_blocked<'k>(
    candidate: &Session,
    selected: impl IntoIterator<Item = &'k SessionKey>,
    all_sessions: &[Session],
) -> bool {
    find_conflict(candidate, selected, all_sessions).is_some()
}
