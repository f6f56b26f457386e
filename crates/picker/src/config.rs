/// Picker configuration, loaded from a JSON file
use crate::error::ConfigError;
use crate::import::handshake::HandshakeConfig;
use crate::rooms::{
    RoomMapperConfig, DEFAULT_AUTOCOMPLETE_URL, DEFAULT_FALLBACK_URL, DEFAULT_MAP_URL,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Colours handed out to subjects in first-seen order
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#4f81bd", "#c0504d", "#9bbb59", "#8064a2", "#4bacc6", "#f79646", "#2c4d75", "#772c2a",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// SQLite file holding the persisted selection
    pub db_path: PathBuf,
    /// Directory of bundled schedule files, used while nothing is imported
    pub bundled_dir: PathBuf,
    pub rooms: RoomsConfig,
    pub handshake: HandshakeSettings,
    pub marker_tick_secs: u64,
    pub palette: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub autocomplete_url: String,
    pub map_url: String,
    pub fallback_url: String,
    pub language: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeSettings {
    pub retry_interval_ms: u64,
    pub max_attempts: u32,
    pub wait_timeout_secs: u64,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/picker.db"),
            bundled_dir: PathBuf::from("demos"),
            rooms: RoomsConfig::default(),
            handshake: HandshakeSettings::default(),
            marker_tick_secs: 60,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            autocomplete_url: DEFAULT_AUTOCOMPLETE_URL.to_string(),
            map_url: DEFAULT_MAP_URL.to_string(),
            fallback_url: DEFAULT_FALLBACK_URL.to_string(),
            language: "cs".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        let defaults = HandshakeConfig::default();
        Self {
            retry_interval_ms: defaults.retry_interval.as_millis() as u64,
            max_attempts: defaults.max_attempts,
            wait_timeout_secs: defaults.consumer_timeout.as_secs(),
        }
    }
}

impl PickerConfig {
    /// Loads the config at `path`. A missing file yields the defaults;
    /// fields absent from the file keep their default values.
    ///
    /// # Returns
    /// * `Ok(PickerConfig)` - Loaded or default configuration
    /// * `Err(ConfigError)` - If the file exists but can't be read or parsed
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn handshake(&self) -> HandshakeConfig {
        HandshakeConfig {
            retry_interval: Duration::from_millis(self.handshake.retry_interval_ms.max(1)),
            max_attempts: self.handshake.max_attempts,
            consumer_timeout: Duration::from_secs(self.handshake.wait_timeout_secs),
        }
    }

    pub fn room_mapper(&self) -> RoomMapperConfig {
        RoomMapperConfig {
            autocomplete_url: self.rooms.autocomplete_url.clone(),
            map_url: self.rooms.map_url.clone(),
            fallback_url: self.rooms.fallback_url.clone(),
            language: self.rooms.language.clone(),
            timeout: Duration::from_secs(self.rooms.timeout_secs),
        }
    }

    pub fn marker_tick(&self) -> Duration {
        Duration::from_secs(self.marker_tick_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = PickerConfig::load_from_path(Path::new("/nonexistent/picker.json")).unwrap();
        assert_eq!(config, PickerConfig::default());
        assert_eq!(config.handshake().retry_interval, Duration::from_millis(500));
        assert_eq!(config.handshake().max_attempts, 30);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("picker-config-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{ "db_path": "/tmp/x.db", "handshake": { "max_attempts": 5 } }"#,
        )
        .unwrap();

        let config = PickerConfig::load_from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.handshake.max_attempts, 5);
        assert_eq!(config.handshake.retry_interval_ms, 500);
        assert_eq!(config.palette.len(), DEFAULT_PALETTE.len());
        assert_eq!(config.room_mapper().map_url, DEFAULT_MAP_URL);
    }

    #[test]
    fn test_zero_retry_interval_is_clamped() {
        let mut config = PickerConfig::default();
        config.handshake.retry_interval_ms = 0;
        assert_eq!(config.handshake().retry_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("picker-bad-{}.json", std::process::id()));
        fs::write(&path, "{ nope").unwrap();

        let result = PickerConfig::load_from_path(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
