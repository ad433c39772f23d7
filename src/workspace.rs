//! HTTP client for the session workspace listing.

use crate::config::{Config, WORKSPACE_FILES, WORKSPACE_TREE};
use crate::refresh::WorkspaceRefresher;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A file in the session workspace, as sent along with chat requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub download_url: String,
}

#[derive(Debug, Deserialize)]
struct FilesResponse {
    #[serde(default)]
    files: Vec<WorkspaceFile>,
}

/// Point a backend-provided download link at the file server.
///
/// Relative links are joined onto `file_server`. Absolute links that name a
/// loopback host or the file server's default port are re-homed onto it, as
/// the backend reports its own local address. Other absolute links are kept.
pub fn resolve_download_url(file_server: &str, raw: &str) -> String {
    let base = file_server.trim_end_matches('/');
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return base.to_string();
    }

    if let Ok(parsed) = url::Url::parse(trimmed) {
        if matches!(parsed.scheme(), "http" | "https") {
            let local = match parsed.host_str() {
                Some(host) => host == "localhost" || host.starts_with("127."),
                None => false,
            };
            if !local && parsed.port() != Some(DEFAULT_FILE_SERVER_PORT) {
                return trimmed.to_string();
            }
            let mut rehomed = format!("{}{}", base, parsed.path());
            if let Some(query) = parsed.query() {
                rehomed.push('?');
                rehomed.push_str(query);
            }
            if let Some(fragment) = parsed.fragment() {
                rehomed.push('#');
                rehomed.push_str(fragment);
            }
            return rehomed;
        }
    }

    if trimmed.starts_with("//") {
        return format!("http:{}", trimmed);
    }

    let relative = trimmed.trim_start_matches("./").trim_start_matches('/');
    format!("{}/{}", base, relative)
}

const DEFAULT_FILE_SERVER_PORT: u16 = 8100;

#[derive(Debug, Default)]
struct Snapshot {
    files: Vec<WorkspaceFile>,
    tree: Option<serde_json::Value>,
}

/// Fetches the file list and tree and keeps the latest of each
#[derive(Clone)]
pub struct WorkspaceClient {
    client: Client,
    files_url: String,
    tree_url: String,
    file_server_url: String,
    snapshot: Arc<Mutex<Snapshot>>,
}

impl WorkspaceClient {
    pub fn new(config: &Config) -> Self {
        Self::new_with_base_url(&config.backend_url).with_file_server(&config.file_server_url)
    }

    /// Download links resolve against `base_url` until a file server is set
    pub fn new_with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            files_url: format!("{}{}", base_url, WORKSPACE_FILES),
            tree_url: format!("{}{}", base_url, WORKSPACE_TREE),
            file_server_url: base_url.to_string(),
            snapshot: Arc::new(Mutex::new(Snapshot::default())),
        }
    }

    pub fn with_file_server(mut self, file_server_url: &str) -> Self {
        self.file_server_url = file_server_url.to_string();
        self
    }

    /// Latest file list, with download links pointing at the file server
    pub fn files(&self) -> Vec<WorkspaceFile> {
        self.snapshot
            .lock()
            .map(|snapshot| snapshot.files.clone())
            .unwrap_or_default()
    }

    /// Raw tree as returned by the backend; rendering is up to the caller
    pub fn tree(&self) -> Option<serde_json::Value> {
        self.snapshot
            .lock()
            .ok()
            .and_then(|snapshot| snapshot.tree.clone())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, session_id: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(&[("session_id", session_id)])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Network error: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Workspace request failed: Status {}", status));
        }

        Ok(response.json().await?)
    }

    fn update(&self, apply: impl FnOnce(&mut Snapshot)) {
        if let Ok(mut snapshot) = self.snapshot.lock() {
            apply(&mut snapshot);
        }
    }
}

#[async_trait]
impl WorkspaceRefresher for WorkspaceClient {
    async fn refresh_file_tree(&self, session_id: &str) -> Result<()> {
        let tree: serde_json::Value = self.get_json(&self.tree_url, session_id).await?;
        debug!("Workspace tree refreshed for {}", session_id);
        self.update(|snapshot| snapshot.tree = Some(tree));
        Ok(())
    }

    async fn refresh_file_list(&self, session_id: &str) -> Result<()> {
        let mut response: FilesResponse = self.get_json(&self.files_url, session_id).await?;
        for file in &mut response.files {
            file.download_url = resolve_download_url(&self.file_server_url, &file.download_url);
        }
        debug!(
            "Workspace has {} file(s) for {}",
            response.files.len(),
            session_id
        );
        self.update(|snapshot| snapshot.files = response.files);
        Ok(())
    }
}
