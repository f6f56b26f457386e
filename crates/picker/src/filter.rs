//! Visibility and interaction state of sessions on the grid.

use crate::conflict::{find_conflict, Conflict};
use crate::schedule::{DayGroups, Session, SessionKey, Weekday};
use std::collections::BTreeSet;

/// Computes the sessions shown on `day`.
///
/// A selected session is always shown. Any other session must pass the
/// subject filter (an empty filter passes everything) and must not be blocked
/// by the selection, unless `show_all` suppresses conflict hiding.
pub fn visible_sessions<'a>(
    day: Weekday,
    grouped: &DayGroups<'a>,
    selected_subjects: &BTreeSet<String>,
    selected_sessions: &BTreeSet<SessionKey>,
    all_sessions: &[Session],
    show_all: bool,
) -> Vec<&'a Session> {
    render_day(
        day,
        grouped,
        selected_subjects,
        selected_sessions,
        all_sessions,
        show_all,
    )
    .into_iter()
    .map(|view| view.session)
    .collect()
}

/// A visible session with its interaction state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView<'a> {
    pub session: &'a Session,
    pub key: SessionKey,
    pub selected: bool,
    /// Set when the selection blocks this session
    pub conflict: Option<Conflict>,
    /// The session's subject is in the active subject filter
    pub highlighted: bool,
}

impl SessionView<'_> {
    /// Blocked sessions shown through the "show all" override can be viewed
    /// but not toggled. Selected sessions stay togglable.
    pub fn is_disabled(&self) -> bool {
        self.conflict.is_some() && !self.selected
    }

    /// Rendered with reduced emphasis.
    pub fn is_dimmed(&self) -> bool {
        self.is_disabled()
    }
}

/// Computes the visible sessions of `day` along with their state, in the
/// day's start-time order.
pub fn render_day<'a>(
    day: Weekday,
    grouped: &DayGroups<'a>,
    selected_subjects: &BTreeSet<String>,
    selected_sessions: &BTreeSet<SessionKey>,
    all_sessions: &[Session],
    show_all: bool,
) -> Vec<SessionView<'a>> {
    let Some(day_sessions) = grouped.get(&day) else {
        return Vec::new();
    };

    day_sessions
        .iter()
        .copied()
        .filter_map(|session| {
            let key = SessionKey::compute(session);
            let selected = selected_sessions.contains(&key);
            let passes_subject = selected_subjects.is_empty()
                || selected_subjects.contains(&session.abbreviation);
            let conflict = find_conflict(session, selected_sessions, all_sessions);

            let visible = selected || (passes_subject && (show_all || conflict.is_none()));
            visible.then(|| SessionView {
                session,
                key,
                selected,
                conflict,
                highlighted: selected_subjects.contains(&session.abbreviation),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::fixtures::session;
    use crate::schedule::group_by_day;

    fn subjects(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn abbrevs(sessions: &[&Session]) -> Vec<String> {
        sessions.iter().map(|s| s.abbreviation.clone()).collect()
    }

    #[test]
    fn test_blocked_session_hidden_unless_show_all() {
        let a = session(Weekday::Monday, "09:00", "MAT", true);
        let b = session(Weekday::Monday, "09:00", "FYZ", true);
        let all = vec![a.clone(), b.clone()];
        let grouped = group_by_day(&all);
        let selected: BTreeSet<_> = [SessionKey::compute(&a)].into();

        let hidden = visible_sessions(
            Weekday::Monday,
            &grouped,
            &BTreeSet::new(),
            &selected,
            &all,
            false,
        );
        assert_eq!(abbrevs(&hidden), vec!["MAT"]);

        let shown = visible_sessions(
            Weekday::Monday,
            &grouped,
            &BTreeSet::new(),
            &selected,
            &all,
            true,
        );
        assert_eq!(abbrevs(&shown), vec!["MAT", "FYZ"]);
    }

    #[test]
    fn test_subject_filter_narrows_unselected_sessions() {
        let all = vec![
            session(Weekday::Tuesday, "09:00", "MAT", true),
            session(Weekday::Tuesday, "10:45", "FYZ", true),
        ];
        let grouped = group_by_day(&all);

        let visible = visible_sessions(
            Weekday::Tuesday,
            &grouped,
            &subjects(&["FYZ"]),
            &BTreeSet::new(),
            &all,
            false,
        );
        assert_eq!(abbrevs(&visible), vec!["FYZ"]);
    }

    #[test]
    fn test_selected_always_visible() {
        let a = session(Weekday::Tuesday, "10:00", "MAT", true);
        let c = session(Weekday::Wednesday, "14:00", "MAT", true);
        let all = vec![a.clone(), c.clone()];
        let grouped = group_by_day(&all);
        // Both selected, both blocking each other, and filtered out by subject
        let selected: BTreeSet<_> = [SessionKey::compute(&a), SessionKey::compute(&c)].into();
        let filter = subjects(&["FYZ"]);

        for day in [Weekday::Tuesday, Weekday::Wednesday] {
            let views = render_day(day, &grouped, &filter, &selected, &all, false);
            assert_eq!(views.len(), 1);
            assert!(views[0].selected);
            assert!(views[0].conflict.is_some());
            assert!(!views[0].is_disabled());
        }
    }

    #[test]
    fn test_show_all_marks_blocked_sessions_disabled() {
        let a = session(Weekday::Tuesday, "10:00", "MAT", true);
        let c = session(Weekday::Wednesday, "14:00", "MAT", true);
        let all = vec![a.clone(), c.clone()];
        let grouped = group_by_day(&all);
        let selected: BTreeSet<_> = [SessionKey::compute(&a)].into();

        let views = render_day(
            Weekday::Wednesday,
            &grouped,
            &BTreeSet::new(),
            &selected,
            &all,
            true,
        );
        assert_eq!(views.len(), 1);
        assert!(views[0].is_disabled());
        assert!(views[0].is_dimmed());
        assert_eq!(
            views[0].conflict.as_ref().map(Conflict::with),
            Some(&SessionKey::compute(&a))
        );
    }

    #[test]
    fn test_highlighted_follows_subject_filter() {
        let all = vec![
            session(Weekday::Friday, "07:15", "MAT", false),
            session(Weekday::Friday, "09:00", "FYZ", false),
        ];
        let grouped = group_by_day(&all);
        let views = render_day(
            Weekday::Friday,
            &grouped,
            &subjects(&["MAT"]),
            &BTreeSet::new(),
            &all,
            false,
        );
        assert_eq!(views.len(), 1);
        assert!(views[0].highlighted);
    }
}
