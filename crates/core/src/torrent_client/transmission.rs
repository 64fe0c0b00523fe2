//! Transmission RPC client implementation.
//!
//! Speaks the Transmission JSON-RPC protocol: a single POST endpoint, a
//! CSRF session id handed back via a 409 response that must be echoed on
//! every subsequent request.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::TransmissionConfig;

use super::{SeedingSnapshot, TorrentClient, TorrentClientError, TorrentStatus, TorrentSummary};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Transmission RPC client.
pub struct TransmissionClient {
    client: Client,
    config: TransmissionConfig,
    /// CSRF session id (refreshed on 409).
    session: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct TorrentGetArgs {
    #[serde(default)]
    torrents: Vec<RawTorrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTorrent {
    id: i64,
    name: String,
    download_dir: String,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    percent_done: Option<f64>,
    #[serde(default)]
    files: Option<Vec<RawFile>>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    name: String,
}

impl TransmissionClient {
    /// Create a client without probing the connection.
    pub fn new(config: TransmissionConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TorrentClientError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session: RwLock::new(None),
        })
    }

    /// Create a client and verify the connection, retrying a fixed number
    /// of times with a fixed delay between attempts.
    ///
    /// Exhausting the attempts is fatal to the run; no filesystem work may
    /// happen before this succeeds.
    pub async fn connect(config: TransmissionConfig) -> Result<Self, TorrentClientError> {
        let attempts = config.connect_attempts.max(1);
        let delay = Duration::from_secs(config.connect_delay_secs);
        let client = Self::new(config)?;

        let mut last_error = None;
        for attempt in 1..=attempts {
            match client.rpc("session-get", json!({})).await {
                Ok(_) => {
                    debug!("Connected to transmission at {}", client.endpoint());
                    return Ok(client);
                }
                Err(e) => {
                    warn!(
                        "Failed to connect to transmission (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| TorrentClientError::ConnectionFailed("no attempts made".into())))
    }

    fn endpoint(&self) -> String {
        format!(
            "http://{}:{}/transmission/rpc",
            self.config.host, self.config.port
        )
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, TorrentClientError> {
        let mut request = self.client.post(self.endpoint()).json(body);

        if let Some(user) = &self.config.user {
            request = request.basic_auth(user, self.config.password.as_deref());
        }
        if let Some(session) = self.session.read().await.as_deref() {
            request = request.header(SESSION_HEADER, session);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                TorrentClientError::Timeout
            } else if e.is_connect() {
                TorrentClientError::ConnectionFailed(e.to_string())
            } else {
                TorrentClientError::ApiError(e.to_string())
            }
        })
    }

    /// Issue one RPC call, handling the 409 session-id handshake.
    async fn rpc(&self, method: &str, arguments: Value) -> Result<Value, TorrentClientError> {
        let body = json!({ "method": method, "arguments": arguments });

        let mut response = self.send(&body).await?;

        if response.status() == StatusCode::CONFLICT {
            // Transmission hands out the CSRF token via 409; echo it back.
            let session_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    TorrentClientError::ApiError("409 without session id header".to_string())
                })?;
            debug!("Transmission issued new session id");
            *self.session.write().await = Some(session_id);
            response = self.send(&body).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(TorrentClientError::AuthenticationFailed(
                "invalid credentials".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

        if parsed.result != "success" {
            return Err(TorrentClientError::ApiError(parsed.result));
        }

        Ok(parsed.arguments)
    }

    async fn torrent_get(&self, fields: &[&str]) -> Result<Vec<RawTorrent>, TorrentClientError> {
        let arguments = self
            .rpc("torrent-get", json!({ "fields": fields }))
            .await?;
        let args: TorrentGetArgs = serde_json::from_value(arguments)
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;
        Ok(args.torrents)
    }
}

fn status_from_code(code: Option<i64>) -> TorrentStatus {
    match code {
        Some(0) => TorrentStatus::Stopped,
        Some(1) | Some(2) => TorrentStatus::Checking,
        Some(3) | Some(4) => TorrentStatus::Downloading,
        Some(5) | Some(6) => TorrentStatus::Seeding,
        _ => TorrentStatus::Unknown,
    }
}

fn summary_from_raw(raw: &RawTorrent) -> TorrentSummary {
    TorrentSummary {
        id: raw.id,
        name: raw.name.clone(),
        download_dir: PathBuf::from(&raw.download_dir),
        status: status_from_code(raw.status),
        progress: raw.percent_done.unwrap_or(0.0),
    }
}

fn snapshot_from_raw(torrents: &[RawTorrent]) -> SeedingSnapshot {
    let mut files = HashSet::new();
    let mut dirs = HashSet::new();

    for torrent in torrents {
        let base = PathBuf::from(&torrent.download_dir);
        dirs.insert(base.join(&torrent.name));
        for file in torrent.files.iter().flatten() {
            files.insert(base.join(&file.name));
        }
    }

    SeedingSnapshot::new(files, dirs)
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn list_managed_files(&self) -> Result<SeedingSnapshot, TorrentClientError> {
        let torrents = self
            .torrent_get(&["id", "name", "downloadDir", "files"])
            .await?;
        Ok(snapshot_from_raw(&torrents))
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentSummary>, TorrentClientError> {
        let torrents = self
            .torrent_get(&["id", "name", "downloadDir", "status", "percentDone"])
            .await?;
        Ok(torrents.iter().map(summary_from_raw).collect())
    }

    async fn remove_torrent(
        &self,
        id: i64,
        delete_data: bool,
    ) -> Result<(), TorrentClientError> {
        self.rpc(
            "torrent-remove",
            json!({ "ids": [id], "delete-local-data": delete_data }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn raw(json_str: &str) -> Vec<RawTorrent> {
        let args: TorrentGetArgs = serde_json::from_str(json_str).unwrap();
        args.torrents
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_from_code(Some(0)), TorrentStatus::Stopped);
        assert_eq!(status_from_code(Some(2)), TorrentStatus::Checking);
        assert_eq!(status_from_code(Some(4)), TorrentStatus::Downloading);
        assert_eq!(status_from_code(Some(6)), TorrentStatus::Seeding);
        assert_eq!(status_from_code(Some(42)), TorrentStatus::Unknown);
        assert_eq!(status_from_code(None), TorrentStatus::Unknown);
    }

    #[test]
    fn test_summaries_from_torrent_get() {
        let torrents = raw(
            r#"{"torrents": [
                {"id": 7, "name": "Show.S01E01.720p", "downloadDir": "/srv/seeding",
                 "status": 0, "percentDone": 1.0}
            ]}"#,
        );
        let summary = summary_from_raw(&torrents[0]);
        assert_eq!(summary.id, 7);
        assert_eq!(summary.status, TorrentStatus::Stopped);
        assert!(summary.is_complete_and_stopped());
        assert_eq!(
            summary.content_path(),
            PathBuf::from("/srv/seeding/Show.S01E01.720p")
        );
    }

    #[test]
    fn test_snapshot_from_torrent_get() {
        let torrents = raw(
            r#"{"torrents": [
                {"id": 1, "name": "Show.S01E01", "downloadDir": "/srv/seeding",
                 "files": [{"name": "Show.S01E01/ep.mkv"}, {"name": "Show.S01E01/ep.nfo"}]},
                {"id": 2, "name": "single.mkv", "downloadDir": "/srv/seeding",
                 "files": [{"name": "single.mkv"}]}
            ]}"#,
        );
        let snapshot = snapshot_from_raw(&torrents);

        assert_eq!(snapshot.file_count(), 3);
        assert_eq!(snapshot.dir_count(), 2);
        assert!(snapshot.is_seeding(Path::new("/srv/seeding/Show.S01E01/ep.mkv")));
        assert!(snapshot.is_seeding(Path::new("/srv/seeding/single.mkv")));
        assert!(snapshot.is_seeding_dir(Path::new("/srv/seeding/Show.S01E01")));
        assert!(!snapshot.is_seeding_dir(Path::new("/srv/seeding/other")));
    }

    #[test]
    fn test_rpc_response_failure_result() {
        let parsed: RpcResponse =
            serde_json::from_str(r#"{"result": "no such method", "arguments": {}}"#).unwrap();
        assert_ne!(parsed.result, "success");
    }
}
