/// Session model: flattening raw portal schedules into sessions
mod grouping;
mod key;
mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use grouping::{
    assign_colors, build_subject_catalog, group_by_day, CatalogEntry, DayGroups, SubjectCatalog,
};
pub use key::{KeyParts, SessionKey};
pub use types::*;

use serde_json::Value;
use tracing::warn;

/// Default number of slots a session occupies when the item has no duration.
pub const DEFAULT_DURATION: u32 = 2;

/// Flattens one subject dataset into sessions.
///
/// Walks days, queues and items in source order and emits a session for every
/// item that is `used` and carries a detail record. Items on a day whose title
/// is not one of the five weekdays are dropped with a warning.
pub fn flatten(source: &RawScheduleSource) -> Vec<Session> {
    let mut sessions = Vec::new();

    for raw_day in &source.data.schedule_table.days {
        let Some(day) = Weekday::from_title(&raw_day.title) else {
            if raw_day.queues.iter().any(|q| q.items.iter().any(|i| i.used)) {
                warn!(
                    subject = %source.title,
                    day = %raw_day.title,
                    "Skipping sessions on unknown day"
                );
            }
            continue;
        };

        for queue in &raw_day.queues {
            for item in &queue.items {
                let Some(dto) = item.dto.as_ref().filter(|_| item.used) else {
                    continue;
                };
                if dto.begin_time.is_empty() || dto.subject_abbrev.is_empty() {
                    warn!(
                        subject = %source.title,
                        day = %raw_day.title,
                        "Skipping used item without start time or abbreviation"
                    );
                    continue;
                }

                sessions.push(Session {
                    day,
                    start_time: dto.begin_time.clone(),
                    end_time: dto.end_time.clone(),
                    teacher: dto.teachers.clone(),
                    abbreviation: dto.subject_abbrev.clone(),
                    is_lecture: dto.lecture,
                    duration: item.duration.unwrap_or(DEFAULT_DURATION),
                    activity_id: dto.activity_id.as_ref().and_then(activity_id_string),
                    room: dto.room.clone().filter(|r| !r.trim().is_empty()),
                    week_parity: WeekParity::normalize(dto.week_parity.as_deref()),
                    title: dto
                        .subject_title
                        .clone()
                        .or_else(|| source.data.subject_title.clone()),
                });
            }
        }
    }

    sessions
}

/// Flattens every source and concatenates the results in source order.
pub fn flatten_all(sources: &[RawScheduleSource]) -> Vec<Session> {
    sources.iter().flat_map(flatten).collect()
}

fn activity_id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
