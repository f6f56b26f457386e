//! Composite identity keys for sessions.

use super::types::{Session, SessionType, Weekday};
use serde::{Deserialize, Serialize};

/// Field separator. Field values are escaped so it never occurs inside one.
const SEPARATOR: &str = "//";

/// Number of fields joined into a key.
const FIELD_COUNT: usize = 6;

/// Identity of a selectable session.
///
/// Built from day, start time, abbreviation, type, teacher and week parity.
/// Two sessions are the same selectable unit iff their keys are equal.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Computes the key of a session.
    pub fn compute(session: &Session) -> Self {
        let parity = session.week_parity.map(|p| p.as_str()).unwrap_or("");
        let lecture = if session.is_lecture { "true" } else { "false" };

        let fields = [
            escape(session.day.title()),
            escape(&session.start_time),
            escape(&session.abbreviation),
            lecture.to_string(),
            escape(&session.teacher),
            parity.to_string(),
        ];
        Self(fields.join(SEPARATOR))
    }

    /// Wraps a key read back from storage. No validation: a malformed or
    /// outdated key simply never resolves.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the key back into its fields, if it has the expected shape.
    pub fn parts(&self) -> Option<KeyParts> {
        let fields: Vec<&str> = self.0.split(SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return None;
        }

        let session_type = match fields[3] {
            "true" => SessionType::Lecture,
            "false" => SessionType::Seminar,
            _ => return None,
        };

        Some(KeyParts {
            day: Weekday::from_title(&unescape(fields[0])),
            start_time: unescape(fields[1]),
            abbreviation: unescape(fields[2]),
            session_type,
            teacher: unescape(fields[4]),
            week_parity: fields[5].to_string(),
        })
    }

    /// Returns true if the key names the given subject and session type.
    pub fn matches_subject_type(&self, abbreviation: &str, session_type: SessionType) -> bool {
        self.parts()
            .is_some_and(|p| p.abbreviation == abbreviation && p.session_type == session_type)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded fields of a [`SessionKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParts {
    pub day: Option<Weekday>,
    pub start_time: String,
    pub abbreviation: String,
    pub session_type: SessionType,
    pub teacher: String,
    pub week_parity: String,
}

fn escape(field: &str) -> String {
    field.replace('%', "%25").replace('/', "%2F")
}

fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut rest = field;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("%25") {
            out.push('%');
            rest = &tail[3..];
        } else if tail.starts_with("%2F") {
            out.push('/');
            rest = &tail[3..];
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
