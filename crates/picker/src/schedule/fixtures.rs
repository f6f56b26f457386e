//! Test builders for sessions and raw sources.

use super::types::*;

pub(crate) fn session(day: Weekday, start: &str, abbrev: &str, is_lecture: bool) -> Session {
    Session {
        day,
        start_time: start.to_string(),
        end_time: String::new(),
        teacher: "Novák".to_string(),
        abbreviation: abbrev.to_string(),
        is_lecture,
        duration: 2,
        activity_id: None,
        room: None,
        week_parity: None,
        title: None,
    }
}

/// Builds a source with one used item per `(day title, start, lecture)` tuple.
pub(crate) fn source(title: &str, items: &[(&str, &str, bool)]) -> RawScheduleSource {
    let days = items
        .iter()
        .map(|(day, start, lecture)| RawDay {
            title: day.to_string(),
            queues: vec![RawQueue {
                items: vec![RawItem {
                    used: true,
                    duration: None,
                    dto: Some(ItemDetail {
                        begin_time: start.to_string(),
                        end_time: String::new(),
                        teachers: "Novák".to_string(),
                        subject_abbrev: title.to_string(),
                        lecture: *lecture,
                        activity_id: None,
                        room: None,
                        week_parity: None,
                        subject_title: None,
                    }),
                }],
            }],
        })
        .collect();

    RawScheduleSource {
        title: title.to_string(),
        data: ScheduleData {
            schedule_table: ScheduleTable { days },
            subject_title: None,
        },
    }
}
