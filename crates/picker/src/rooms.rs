//! Resolving room codes to campus map links.
//!
//! The map service has no stable search-by-code URL, so a room code is first
//! sent to the autocomplete endpoint and the id of the first hit is turned
//! into a viewer link. Resolved ids are cached for the life of the process;
//! failures are not cached so a later call retries.

use crate::error::RoomLookupError;
use dashmap::DashMap;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_AUTOCOMPLETE_URL: &str = "https://mapy.vsb.cz/maps/api/v0/rooms/autocomplete";
pub const DEFAULT_MAP_URL: &str = "https://mapy.vsb.cz/maps/";
pub const DEFAULT_FALLBACK_URL: &str = "https://mapy.vsb.cz/maps/";

/// Endpoints used by [`RoomMapper`].
#[derive(Debug, Clone)]
pub struct RoomMapperConfig {
    pub autocomplete_url: String,
    pub map_url: String,
    pub fallback_url: String,
    pub language: String,
    pub timeout: Duration,
}

impl Default for RoomMapperConfig {
    fn default() -> Self {
        Self {
            autocomplete_url: DEFAULT_AUTOCOMPLETE_URL.to_string(),
            map_url: DEFAULT_MAP_URL.to_string(),
            fallback_url: DEFAULT_FALLBACK_URL.to_string(),
            language: "cs".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct RoomMapper {
    client: Client,
    config: RoomMapperConfig,
    /// Room code -> map id
    ids: DashMap<String, String>,
}

impl RoomMapper {
    pub fn new() -> Result<Self, RoomLookupError> {
        Self::with_config(RoomMapperConfig::default())
    }

    pub fn with_config(config: RoomMapperConfig) -> Result<Self, RoomLookupError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| RoomLookupError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            ids: DashMap::new(),
        })
    }

    /// Returns the map link for `room`, or the generic map page when the
    /// lookup fails. An empty code yields `None` and makes no request.
    pub async fn resolve(&self, room: &str) -> Option<String> {
        let room = room.trim();
        if room.is_empty() {
            return None;
        }

        match self.lookup(room).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(room, error = %e, retryable = e.is_retryable(), "Room lookup failed");
                Some(self.config.fallback_url.clone())
            }
        }
    }

    /// Resolves `room` to a viewer link, consulting the cache first.
    pub async fn lookup(&self, room: &str) -> Result<String, RoomLookupError> {
        if let Some(id) = self.ids.get(room) {
            debug!(room, id = %id.as_str(), "Room id cache hit");
            return self.map_url_for_id(&id);
        }

        let start = Instant::now();
        let id = self.fetch_id(room).await?;
        info!(
            room,
            id = %id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Resolved room id"
        );

        let url = self.map_url_for_id(&id)?;
        self.ids.insert(room.to_string(), id);
        Ok(url)
    }

    /// Builds the viewer link for a known map id.
    pub fn map_url_for_id(&self, id: &str) -> Result<String, RoomLookupError> {
        let url = Url::parse_with_params(
            &self.config.map_url,
            &[
                ("id", id),
                ("type", "rooms"),
                ("lang", self.config.language.as_str()),
            ],
        )?;
        Ok(url.into())
    }

    pub fn autocomplete_url(&self, room: &str) -> Result<Url, RoomLookupError> {
        Ok(Url::parse_with_params(
            &self.config.autocomplete_url,
            &[("query", room), ("language", self.config.language.as_str())],
        )?)
    }

    pub fn cached_rooms(&self) -> usize {
        self.ids.len()
    }

    async fn fetch_id(&self, room: &str) -> Result<String, RoomLookupError> {
        let url = self.autocomplete_url(room)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoomLookupError::UnexpectedResponse {
                message: format!("HTTP {}", status),
            });
        }

        let body: Value = response.json().await?;
        first_result_id(&body).ok_or_else(|| RoomLookupError::NotFound {
            room: room.to_string(),
        })
    }
}

/// Extracts the `id` of the first autocomplete hit. Ids may be numbers or
/// strings.
fn first_result_id(body: &Value) -> Option<String> {
    match body.as_array()?.first()?.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline_mapper() -> RoomMapper {
        RoomMapper::with_config(RoomMapperConfig {
            // Nothing listens on the discard port
            autocomplete_url: "http://127.0.0.1:9/rooms/autocomplete".to_string(),
            timeout: Duration::from_secs(2),
            ..RoomMapperConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_first_result_id() {
        assert_eq!(
            first_result_id(&json!([{ "id": 1234 }, { "id": 5 }])).as_deref(),
            Some("1234")
        );
        assert_eq!(
            first_result_id(&json!([{ "id": "EA-112" }])).as_deref(),
            Some("EA-112")
        );
        assert_eq!(first_result_id(&json!([])), None);
        assert_eq!(first_result_id(&json!([{ "name": "EA112" }])), None);
        assert_eq!(first_result_id(&json!({ "id": 1 })), None);
    }

    #[test]
    fn test_url_building() {
        let mapper = RoomMapper::new().unwrap();
        assert_eq!(
            mapper.map_url_for_id("4521").unwrap(),
            "https://mapy.vsb.cz/maps/?id=4521&type=rooms&lang=cs"
        );
        assert_eq!(
            mapper.autocomplete_url("EA 112").unwrap().as_str(),
            "https://mapy.vsb.cz/maps/api/v0/rooms/autocomplete?query=EA+112&language=cs"
        );
    }

    #[tokio::test]
    async fn test_empty_room_makes_no_lookup() {
        let mapper = offline_mapper();
        assert_eq!(mapper.resolve("").await, None);
        assert_eq!(mapper.resolve("   ").await, None);
    }

    #[tokio::test]
    async fn test_failure_falls_back_and_is_not_cached() {
        let mapper = offline_mapper();
        assert_eq!(
            mapper.resolve("EA112").await.as_deref(),
            Some(DEFAULT_FALLBACK_URL)
        );
        assert_eq!(mapper.cached_rooms(), 0);
    }

    #[tokio::test]
    async fn test_successful_lookup_is_cached() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            let body = r#"[{"id":4521}]"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let mapper = RoomMapper::with_config(RoomMapperConfig {
            autocomplete_url: format!("http://{}/rooms/autocomplete", addr),
            timeout: Duration::from_secs(2),
            ..RoomMapperConfig::default()
        })
        .unwrap();

        let expected = "https://mapy.vsb.cz/maps/?id=4521&type=rooms&lang=cs";
        assert_eq!(mapper.resolve("EA112").await.as_deref(), Some(expected));
        assert_eq!(mapper.cached_rooms(), 1);

        // The listener is gone once the server task ends
        server.await.unwrap();
        assert_eq!(mapper.resolve("EA112").await.as_deref(), Some(expected));
        assert_eq!(mapper.cached_rooms(), 1);
    }

    #[tokio::test]
    async fn test_cached_id_skips_network() {
        let mapper = offline_mapper();
        mapper.ids.insert("EA112".to_string(), "4521".to_string());
        assert_eq!(
            mapper.resolve("EA112").await.as_deref(),
            Some("https://mapy.vsb.cz/maps/?id=4521&type=rooms&lang=cs")
        );
    }
}
