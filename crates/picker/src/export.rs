//! Activity ids of the picked sessions, for the registration pick script.

use crate::conflict::resolve_selected;
use crate::schedule::{Session, SessionKey};
use serde::Serialize;
use tracing::warn;

/// What the pick script receives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickExport {
    pub activity_ids: Vec<String>,
    /// Selected sessions that resolve but carry no activity id
    pub missing_ids: Vec<SessionKey>,
    /// Selected keys with no matching session
    pub stale: usize,
}

/// Collects activity ids of the selected sessions that still resolve, in key
/// order.
pub fn selected_activity_ids<'k>(
    selected: impl IntoIterator<Item = &'k SessionKey>,
    all_sessions: &[Session],
) -> Vec<String> {
    build_export(selected, all_sessions).activity_ids
}

pub fn build_export<'k>(
    selected: impl IntoIterator<Item = &'k SessionKey>,
    all_sessions: &[Session],
) -> PickExport {
    let selected: Vec<&SessionKey> = selected.into_iter().collect();
    let resolved = resolve_selected(selected.iter().copied(), all_sessions);

    let mut export = PickExport {
        stale: selected.len() - resolved.len(),
        ..PickExport::default()
    };

    for (key, session) in resolved {
        match &session.activity_id {
            Some(id) => export.activity_ids.push(id.clone()),
            None => {
                warn!(key = %key, "Selected session has no activity id");
                export.missing_ids.push(key.clone());
            }
        }
    }

    export
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::fixtures::session;
    use crate::schedule::Weekday;
    use std::collections::BTreeSet;

    #[test]
    fn test_export_skips_stale_and_missing_ids() {
        let mut mat = session(Weekday::Monday, "09:00:00", "MAT", true);
        mat.activity_id = Some("1001".to_string());
        let mut fyz = session(Weekday::Tuesday, "10:45:00", "FYZ", false);
        fyz.activity_id = Some("2002".to_string());
        let alg = session(Weekday::Friday, "07:15:00", "ALG", true);
        let all = vec![mat.clone(), fyz.clone(), alg.clone()];

        let selected: BTreeSet<SessionKey> = [
            SessionKey::compute(&mat),
            SessionKey::compute(&fyz),
            SessionKey::compute(&alg),
            SessionKey::from_raw("Pondělí//07:15:00//OLD//true//X//"),
        ]
        .into_iter()
        .collect();

        let export = build_export(&selected, &all);
        let mut ids = export.activity_ids.clone();
        ids.sort();
        assert_eq!(ids, vec!["1001", "2002"]);
        assert_eq!(export.missing_ids, vec![SessionKey::compute(&alg)]);
        assert_eq!(export.stale, 1);

        assert_eq!(selected_activity_ids(&selected, &all).len(), 2);
    }

    #[test]
    fn test_export_serializes_camel_case() {
        let json = serde_json::to_value(PickExport::default()).unwrap();
        assert!(json.get("activityIds").is_some());
        assert!(json.get("missingIds").is_some());
    }
}
