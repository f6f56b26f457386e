pub mod config;
pub mod conflict;
pub mod error;
pub mod export;
pub mod filter;
pub mod grid;
pub mod import;
pub mod rooms;
pub mod schedule;
pub mod store;
pub mod timetable;
