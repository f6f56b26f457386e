//! Grid placement: mapping sessions onto the fixed slot columns and tracking
//! the live current-time marker.

use crate::error::PlacementError;
use crate::schedule::{Session, Weekday};
use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A half-open teaching slot `[start, end)`, in minutes of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: u32,
    pub end: u32,
}

const fn slot(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeSlot {
    TimeSlot {
        start: start_h * 60 + start_m,
        end: end_h * 60 + end_m,
    }
}

/// The fourteen fixed slots, 07:15 to 19:15. Breaks sit between some of them.
pub const TIME_SLOTS: [TimeSlot; 14] = [
    slot(7, 15, 8, 0),
    slot(8, 0, 8, 45),
    slot(9, 0, 9, 45),
    slot(9, 45, 10, 30),
    slot(10, 45, 11, 30),
    slot(11, 30, 12, 15),
    slot(12, 30, 13, 15),
    slot(13, 15, 14, 0),
    slot(14, 15, 15, 0),
    slot(15, 0, 15, 45),
    slot(16, 0, 16, 45),
    slot(16, 45, 17, 30),
    slot(17, 45, 18, 30),
    slot(18, 30, 19, 15),
];

/// Grid columns taken by the day label before the first slot.
pub const LABEL_COLUMNS: usize = 1;

/// Pixel width of one grid column (label and slots alike).
pub const COLUMN_WIDTH_PX: f32 = 64.0;

/// How often the current-time marker is recomputed.
pub const MARKER_TICK: Duration = Duration::from_secs(60);

impl TimeSlot {
    /// Formats the slot as `HH:MM-HH:MM`.
    pub fn label(&self) -> String {
        format!(
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }

    fn start_label(&self) -> String {
        format!("{:02}:{:02}", self.start / 60, self.start % 60)
    }

    fn contains(&self, minute: u32) -> bool {
        self.start <= minute && minute < self.end
    }
}

/// Returns the 1-based position of the slot starting at `start_time`'s
/// `HH:MM` prefix.
pub fn slot_index(start_time: &str) -> Result<usize, PlacementError> {
    let prefix = start_time.get(..5).unwrap_or(start_time);

    TIME_SLOTS
        .iter()
        .position(|s| s.start_label() == prefix)
        .map(|i| i + 1)
        .ok_or_else(|| PlacementError::UnalignedStart {
            start_time: start_time.to_string(),
        })
}

/// Grid columns a session spans, as `[column_start, column_end)` grid lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub column_start: usize,
    pub column_end: usize,
}

impl Placement {
    pub fn span(&self) -> usize {
        self.column_end - self.column_start
    }
}

/// Places a session on the grid. The span is clamped to the last slot.
///
/// Sessions whose start does not sit on a slot boundary are not placed.
pub fn placement(session: &Session) -> Result<Placement, PlacementError> {
    let index = slot_index(&session.start_time).inspect_err(|_| {
        warn!(
            subject = %session.abbreviation,
            day = %session.day,
            start = %session.start_time,
            "Session start does not align with any slot, not placing it"
        );
    })?;

    let column_start = index + LABEL_COLUMNS;
    let last_line = TIME_SLOTS.len() + LABEL_COLUMNS + 1;
    let column_end = (column_start + session.duration.max(1) as usize).min(last_line);

    Ok(Placement {
        column_start,
        column_end,
    })
}

/// Horizontal pixel offset of the current-time line, if `now` falls inside a
/// slot. Before the first slot, after the last, and during breaks there is
/// no line.
pub fn current_time_offset(now: NaiveTime) -> Option<f32> {
    let minute = now.hour() * 60 + now.minute();

    TIME_SLOTS
        .iter()
        .enumerate()
        .find(|(_, s)| s.contains(minute))
        .map(|(i, s)| {
            let column_left = (i + LABEL_COLUMNS) as f32 * COLUMN_WIDTH_PX;
            let fraction = (minute - s.start) as f32 / (s.end - s.start) as f32;
            column_left + fraction * COLUMN_WIDTH_PX
        })
}

/// Where to draw the current-time line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPosition {
    pub day: Weekday,
    pub offset_px: f32,
}

/// Marker position at `now`; none on weekends or outside teaching slots.
pub fn marker_at(now: NaiveDateTime) -> Option<MarkerPosition> {
    let day = Weekday::from_chrono(now.weekday())?;
    let offset_px = current_time_offset(now.time())?;
    Some(MarkerPosition { day, offset_px })
}

/// Spawns a task that recomputes the marker every `tick` using the local
/// clock and publishes it on a watch channel.
pub fn spawn_time_marker(
    tick: Duration,
) -> (watch::Receiver<Option<MarkerPosition>>, JoinHandle<()>) {
    spawn_time_marker_with(tick, || chrono::Local::now().naive_local())
}

/// Like [`spawn_time_marker`], reading time from `clock`.
///
/// The task ends once every receiver has been dropped.
pub fn spawn_time_marker_with<F>(
    tick: Duration,
    clock: F,
) -> (watch::Receiver<Option<MarkerPosition>>, JoinHandle<()>)
where
    F: Fn() -> NaiveDateTime + Send + 'static,
{
    let (tx, rx) = watch::channel(marker_at(clock()));

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let position = marker_at(clock());
            debug!(?position, "Time marker tick");
            if tx.send(position).is_err() {
                break;
            }
        }
    });

    (rx, handle)
}
