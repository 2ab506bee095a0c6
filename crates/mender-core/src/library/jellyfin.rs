//! Jellyfin HTTP client.
//!
//! Authenticates with the `api_key` query parameter. Item listing goes through
//! the user-scoped endpoint so the user's permissions apply; writes go to the
//! global item endpoint, which expects the complete DTO.

use super::{without_tracks, Library};
use crate::config::{resolve_env_var, Config};
use crate::error::{ConfigError, LibraryError};
use crate::types::Item;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Extra fields requested on the bulk listing; everything prompts need.
pub const EXTRA_FIELDS: &str = "Overview,Artists,Album,Genres,ParentId,OriginalTitle,\
ProductionYear,SortName,PremiereDate";

/// Jellyfin (and Emby-compatible) media server client.
pub struct JellyfinClient {
    base_url: String,
    api_key: String,
    user_id: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<Item>,
}

impl JellyfinClient {
    pub fn new(base_url: &str, api_key: &str, user_id: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout ({e}), using defaults");
                reqwest::Client::new()
            });
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            user_id: user_id.to_string(),
            client,
        }
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let api_key = resolve_env_var(&config.library.jellyfin_api_key).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "jellyfin_api_key {} does not resolve to a value",
                config.library.jellyfin_api_key
            ))
        })?;
        Ok(Self::new(
            config.base_url(),
            &api_key,
            &config.library.user_id,
            Duration::from_secs(config.library.request_timeout_secs),
        ))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn items_path(&self) -> String {
        format!("/Users/{}/Items", self.user_id)
    }

    fn item_path(&self, item_id: &str) -> String {
        format!("/Users/{}/Items/{}", self.user_id, item_id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LibraryError> {
        tracing::debug!("GET {path}");
        let resp = self
            .client
            .get(self.url(path))
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| LibraryError::Transport {
                method: "GET",
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let resp = check_status("GET", path, resp).await?;
        resp.json().await.map_err(|e| LibraryError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

/// Turn a non-success response into a `LibraryError::Status`.
async fn check_status(
    method: &'static str,
    path: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, LibraryError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("no reason").to_string()
    } else {
        body
    };
    Err(LibraryError::Status {
        method,
        path: path.to_string(),
        status: status.as_u16(),
        message,
    })
}

/// Query parameters for the bulk listing.
pub(crate) fn list_query(item_types: &[String], scope_id: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("IncludeItemTypes", item_types.join(",")),
        ("Recursive", "true".to_string()),
        ("Fields", EXTRA_FIELDS.to_string()),
    ];
    if let Some(scope) = scope_id.filter(|s| !s.is_empty()) {
        query.push(("ParentId", scope.to_string()));
    }
    query
}

#[async_trait]
impl Library for JellyfinClient {
    async fn list_items(
        &self,
        item_types: &[String],
        scope_id: Option<&str>,
    ) -> Result<Vec<Item>, LibraryError> {
        let query = list_query(item_types, scope_id);
        let resp: ItemsResponse = self.get_json(&self.items_path(), &query).await?;
        let total = resp.items.len();
        let items = without_tracks(resp.items);
        tracing::debug!(
            "Listed {total} item(s), {} after dropping tracks",
            items.len()
        );
        Ok(items)
    }

    async fn fetch_full(&self, item_id: &str) -> Result<Value, LibraryError> {
        self.get_json(&self.item_path(item_id), &[]).await
    }

    async fn write_full(&self, item_id: &str, record: &Value) -> Result<(), LibraryError> {
        let path = format!("/Items/{item_id}");
        tracing::debug!("POST {path}");
        let resp = self
            .client
            .post(self.url(&path))
            .query(&[("api_key", self.api_key.as_str())])
            .json(record)
            .send()
            .await
            .map_err(|e| LibraryError::Transport {
                method: "POST",
                path: path.clone(),
                message: e.to_string(),
            })?;
        check_status("POST", &path, resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::UpdateOutcome;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    fn client() -> JellyfinClient {
        JellyfinClient::new("http://media.local:8096/", "k", "user-1", Duration::from_secs(30))
    }

    /// Answer exactly one HTTP request with `status_line` and `body`.
    ///
    /// Returns the server base URL and a handle yielding the request line.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            request_line
        });
        (base_url, handle)
    }

    fn local_client(base_url: &str) -> JellyfinClient {
        JellyfinClient::new(base_url, "k", "user-1", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_recoverable_status() {
        let (base_url, server) = serve_once("404 Not Found", "");
        let err = local_client(&base_url).fetch_full("gone").await.unwrap_err();

        assert!(matches!(err, LibraryError::Status { status: 404, .. }));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("Not Found"));
        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET /Users/user-1/Items/gone?api_key=k"));
    }

    #[tokio::test]
    async fn test_update_overview_skips_vanished_item() {
        let (base_url, server) = serve_once("410 Gone", "");
        let outcome = local_client(&base_url)
            .update_overview("old", "New text.")
            .await
            .unwrap();

        assert!(matches!(outcome, UpdateOutcome::Skipped { .. }));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_server_error_is_fatal_with_body() {
        let (base_url, server) = serve_once("500 Internal Server Error", "database is locked");
        let err = local_client(&base_url).fetch_full("x").await.unwrap_err();

        assert!(!err.is_recoverable());
        match err {
            LibraryError::Status { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "database is locked");
            }
            other => panic!("unexpected error: {other}"),
        }
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_list_items_over_http_drops_tracks() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"Items": [
                {"Id": "1", "Type": "MusicAlbum", "Name": "A"},
                {"Id": "2", "Type": "Audio", "Name": "T"}
            ], "TotalRecordCount": 2}"#,
        );
        let types = vec!["MusicAlbum".to_string(), "Audio".to_string()];
        let items = local_client(&base_url).list_items(&types, None).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "1");
        let request_line = server.join().unwrap();
        assert!(request_line.contains("Recursive=true"));
        assert!(request_line.contains("IncludeItemTypes=MusicAlbum%2CAudio"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().url("/Items/x"), "http://media.local:8096/Items/x");
    }

    #[test]
    fn test_user_scoped_paths() {
        let c = client();
        assert_eq!(c.items_path(), "/Users/user-1/Items");
        assert_eq!(c.item_path("abc"), "/Users/user-1/Items/abc");
    }

    #[test]
    fn test_list_query_without_scope() {
        let types = vec!["MusicAlbum".to_string(), "MusicArtist".to_string()];
        let query = list_query(&types, None);
        assert!(query.contains(&("IncludeItemTypes", "MusicAlbum,MusicArtist".to_string())));
        assert!(query.contains(&("Recursive", "true".to_string())));
        assert!(query.contains(&("Fields", EXTRA_FIELDS.to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "ParentId"));
    }

    #[test]
    fn test_list_query_with_scope() {
        let types = vec!["MusicAlbum".to_string()];
        let query = list_query(&types, Some("lib-42"));
        assert!(query.contains(&("ParentId", "lib-42".to_string())));
    }

    #[test]
    fn test_extra_fields_cover_prompt_inputs() {
        for field in ["Overview", "Artists", "Genres", "OriginalTitle", "ProductionYear"] {
            assert!(EXTRA_FIELDS.contains(field), "missing {field}");
        }
    }

    #[test]
    fn test_items_response_parsing() {
        let json = r#"{
            "Items": [
                {"Id": "1", "Type": "MusicAlbum", "Name": "A"},
                {"Id": "2", "Type": "Audio", "Name": "T"}
            ],
            "TotalRecordCount": 2
        }"#;
        let resp: ItemsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items.len(), 2);
        assert_eq!(without_tracks(resp.items).len(), 1);
    }

    #[test]
    fn test_from_config_resolves_plain_key() {
        let config = Config::from_json_str(
            r#"{"jellyfin_url": "http://x/", "jellyfin_api_key": "abc", "user_id": "u"}"#,
        )
        .unwrap();
        let c = JellyfinClient::from_config(&config).unwrap();
        assert_eq!(c.api_key, "abc");
        assert_eq!(c.base_url, "http://x");
    }

    #[test]
    fn test_from_config_unset_env_key_is_error() {
        let config = Config::from_json_str(
            r#"{"jellyfin_url": "http://x", "jellyfin_api_key": "${MENDER_TEST_UNSET_KEY_987}", "user_id": "u"}"#,
        )
        .unwrap();
        assert!(JellyfinClient::from_config(&config).is_err());
    }
}
