//! Parsing and validating imported schedule payloads.
//!
//! A payload is either a single portal schedule object or an array of
//! `{title, data}` pairs as produced by the portal scraper. Array entries are
//! validated one by one: the valid subset is imported and each rejected entry
//! is reported.

pub mod handshake;

use crate::error::ImportError;
use crate::schedule::{RawScheduleSource, ScheduleData};
use futures::future::join_all;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, warn};

static JSON_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.json$").expect("static regex"));

/// Title used for single-object payloads with no abbreviation and no name.
pub const CLIPBOARD_SOURCE: &str = "clipboard";

/// Subjects accepted from one or more payloads, plus what was rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBatch {
    pub subjects: Vec<RawScheduleSource>,
    pub errors: Vec<ImportError>,
}

impl ImportBatch {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    fn extend(&mut self, other: ImportBatch) {
        self.subjects.extend(other.subjects);
        self.errors.extend(other.errors);
    }
}

/// Returns true if `data` has a traversable `subjectScheduleTable.days` list.
pub fn has_schedule_days(data: &Value) -> bool {
    data.get("subjectScheduleTable")
        .and_then(|t| t.get("days"))
        .is_some_and(Value::is_array)
}

/// Finds the first subject abbreviation in traversal order.
pub fn extract_abbrev(data: &Value) -> Option<String> {
    let days = data.get("subjectScheduleTable")?.get("days")?.as_array()?;

    days.iter()
        .filter_map(|day| day.get("queues")?.as_array())
        .flatten()
        .filter_map(|queue| queue.get("items")?.as_array())
        .flatten()
        .find_map(|item| {
            item.get("dto")?
                .get("subjectAbbrev")?
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
}

/// Strips a trailing `.json` (any case) from a file name.
pub fn title_from_file_name(name: &str) -> String {
    JSON_SUFFIX_REGEX.replace(name, "").into_owned()
}

/// Parses a payload from a file, the clipboard or a cross-window message.
///
/// `source_name` labels errors and titles a single-object payload when it
/// carries no abbreviation.
pub fn parse_payload(text: &str, source_name: &str) -> ImportBatch {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => parse_value(value, source_name),
        Err(e) => ImportBatch {
            subjects: Vec::new(),
            errors: vec![ImportError::InvalidJson {
                source_name: source_name.to_string(),
                message: e.to_string(),
            }],
        },
    }
}

/// Like [`parse_payload`], for an already-decoded value.
pub fn parse_value(value: Value, source_name: &str) -> ImportBatch {
    let mut batch = ImportBatch::default();

    match value {
        Value::Array(entries) if entries.is_empty() => batch.errors.push(ImportError::Empty {
            source_name: source_name.to_string(),
        }),
        Value::Array(entries) => {
            for (index, entry) in entries.into_iter().enumerate() {
                match parse_entry(entry) {
                    Ok(subject) => batch.subjects.push(subject),
                    Err(message) => batch.errors.push(ImportError::InvalidEntry {
                        source_name: source_name.to_string(),
                        index,
                        message,
                    }),
                }
            }
        }
        data if has_schedule_days(&data) => {
            let title =
                extract_abbrev(&data).unwrap_or_else(|| title_from_file_name(source_name));
            match serde_json::from_value::<ScheduleData>(data) {
                Ok(data) => batch.subjects.push(RawScheduleSource { title, data }),
                Err(e) => batch.errors.push(ImportError::InvalidEntry {
                    source_name: source_name.to_string(),
                    index: 0,
                    message: e.to_string(),
                }),
            }
        }
        _ => batch.errors.push(ImportError::MissingDays {
            source_name: source_name.to_string(),
        }),
    }

    for error in &batch.errors {
        warn!(error = %error, "Rejected import entry");
    }
    batch
}

fn parse_entry(entry: Value) -> Result<RawScheduleSource, String> {
    let title = entry
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or("missing title")?
        .to_string();

    let data = entry.get("data").ok_or("missing data")?;
    if !has_schedule_days(data) {
        return Err("missing subjectScheduleTable.days".to_string());
    }

    let data: ScheduleData = serde_json::from_value(data.clone()).map_err(|e| e.to_string())?;
    Ok(RawScheduleSource { title, data })
}

fn is_json_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| JSON_SUFFIX_REGEX.is_match(n))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_one(path: &Path) -> ImportBatch {
    let name = display_name(path);
    match tokio::fs::read_to_string(path).await {
        Ok(text) => parse_payload(&text, &name),
        Err(e) => ImportBatch {
            subjects: Vec::new(),
            errors: vec![ImportError::Io {
                source_name: name,
                message: e.to_string(),
            }],
        },
    }
}

/// Reads and parses several payload files concurrently. Non-JSON files are
/// skipped. Results keep the order of `paths`.
pub async fn read_files(paths: &[PathBuf]) -> ImportBatch {
    let reads = paths
        .iter()
        .filter(|p| is_json_file(p))
        .map(|path| read_one(path));

    let mut batch = ImportBatch::default();
    for result in join_all(reads).await {
        batch.extend(result);
    }

    info!(
        subjects = batch.subjects.len(),
        rejected = batch.errors.len(),
        "Read import files"
    );
    batch
}

/// Loads bundled demo data: every `*.json` in `dir`, each a single schedule
/// object titled by its file stem.
pub async fn load_bundled(dir: &Path) -> Result<ImportBatch, ImportError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| ImportError::Io {
        source_name: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut paths = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if is_json_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let reads = paths.iter().map(|path| async move {
        let mut batch = read_one(path).await;
        // Bundled files are named after the subject
        let title = title_from_file_name(&display_name(path));
        for subject in &mut batch.subjects {
            subject.title = title.clone();
        }
        batch
    });

    let mut batch = ImportBatch::default();
    for result in join_all(reads).await {
        batch.extend(result);
    }

    info!(
        dir = %dir.display(),
        subjects = batch.subjects.len(),
        "Loaded bundled schedules"
    );
    Ok(batch)
}
