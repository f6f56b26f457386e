/// Types for raw schedule data and the flattened sessions derived from it
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One imported or bundled subject dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScheduleSource {
    pub title: String,
    pub data: ScheduleData,
}

/// The portal's per-subject schedule payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleData {
    #[serde(rename = "subjectScheduleTable")]
    pub schedule_table: ScheduleTable,

    #[serde(
        rename = "subjectTitle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subject_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTable {
    pub days: Vec<RawDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDay {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queues: Vec<RawQueue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQueue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dto: Option<ItemDetail>,
}

/// Treats an explicit `null` like a missing field. Portal exports fill unused
/// items with nulls.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Detail record attached to a used item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    #[serde(
        rename = "scheduleWindowBeginTime",
        default,
        deserialize_with = "null_as_default"
    )]
    pub begin_time: String,
    #[serde(
        rename = "scheduleWindowEndTime",
        default,
        deserialize_with = "null_as_default"
    )]
    pub end_time: String,
    #[serde(
        rename = "teacherShortNamesString",
        default,
        deserialize_with = "null_as_default"
    )]
    pub teachers: String,
    #[serde(rename = "subjectAbbrev", default, deserialize_with = "null_as_default")]
    pub subject_abbrev: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lecture: bool,
    /// Opaque id, numeric or textual depending on the portal version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<Value>,
    #[serde(
        rename = "roomAbbrev",
        alias = "room",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_parity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_title: Option<String>,
}

/// The five teaching days, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    /// Maps a day title from the source data. The portal uses Czech titles;
    /// English names and two-letter abbreviations are accepted as well.
    pub fn from_title(title: &str) -> Option<Self> {
        match title.trim().to_lowercase().as_str() {
            "pondělí" | "pondeli" | "po" | "monday" | "mon" => Some(Weekday::Monday),
            "úterý" | "utery" | "út" | "ut" | "tuesday" | "tue" => Some(Weekday::Tuesday),
            "středa" | "streda" | "st" | "wednesday" | "wed" => Some(Weekday::Wednesday),
            "čtvrtek" | "ctvrtek" | "čt" | "ct" | "thursday" | "thu" => Some(Weekday::Thursday),
            "pátek" | "patek" | "pá" | "pa" | "friday" | "fri" => Some(Weekday::Friday),
            _ => None,
        }
    }

    /// Canonical title, as the portal spells it.
    pub fn title(self) -> &'static str {
        match self {
            Weekday::Monday => "Pondělí",
            Weekday::Tuesday => "Úterý",
            Weekday::Wednesday => "Středa",
            Weekday::Thursday => "Čtvrtek",
            Weekday::Friday => "Pátek",
        }
    }

    /// Two-letter label used in the grid's day column.
    pub fn short(self) -> &'static str {
        match self {
            Weekday::Monday => "Po",
            Weekday::Tuesday => "Út",
            Weekday::Wednesday => "St",
            Weekday::Thursday => "Čt",
            Weekday::Friday => "Pá",
        }
    }

    /// Position of the day in the week, Monday = 0.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts a calendar weekday; weekends have no grid row.
    pub fn from_chrono(day: chrono::Weekday) -> Option<Self> {
        match day {
            chrono::Weekday::Mon => Some(Weekday::Monday),
            chrono::Weekday::Tue => Some(Weekday::Tuesday),
            chrono::Weekday::Wed => Some(Weekday::Wednesday),
            chrono::Weekday::Thu => Some(Weekday::Thursday),
            chrono::Weekday::Fri => Some(Weekday::Friday),
            chrono::Weekday::Sat | chrono::Weekday::Sun => None,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Alternating-week recurrence tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeekParity {
    Odd,
    Even,
}

impl WeekParity {
    /// Normalizes a raw parity tag. Anything unrecognised, including the
    /// empty string, means "every week".
    pub fn normalize(raw: Option<&str>) -> Option<Self> {
        match raw?.trim().to_lowercase().as_str() {
            "odd" | "lichý" | "lichy" => Some(WeekParity::Odd),
            "even" | "sudý" | "sudy" => Some(WeekParity::Even),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeekParity::Odd => "odd",
            WeekParity::Even => "even",
        }
    }
}

/// Whether a session is a lecture or a seminar/lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SessionType {
    Lecture,
    Seminar,
}

impl SessionType {
    pub fn from_lecture(is_lecture: bool) -> Self {
        if is_lecture {
            SessionType::Lecture
        } else {
            SessionType::Seminar
        }
    }

    pub fn is_lecture(self) -> bool {
        matches!(self, SessionType::Lecture)
    }

    /// One-letter badge ("P" for přednáška, "C" for cvičení).
    pub fn badge(self) -> &'static str {
        match self {
            SessionType::Lecture => "P",
            SessionType::Seminar => "C",
        }
    }
}

/// One concrete weekly occurrence of a subject's lecture or seminar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub teacher: String,
    pub abbreviation: String,
    pub is_lecture: bool,
    /// Number of grid slots the session spans
    pub duration: u32,
    pub activity_id: Option<String>,
    pub room: Option<String>,
    pub week_parity: Option<WeekParity>,
    pub title: Option<String>,
}

impl Session {
    pub fn session_type(&self) -> SessionType {
        SessionType::from_lecture(self.is_lecture)
    }
}
