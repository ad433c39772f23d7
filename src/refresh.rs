//! Debounced refresh of the workspace file views.
//!
//! Several `File` sections can close within a few hundred milliseconds. Each
//! closure re-arms a single timer, and only when the window passes quietly
//! are the file tree and file list refreshed.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// External collaborator that reloads the workspace views for a session
#[async_trait]
pub trait WorkspaceRefresher: Send + Sync {
    async fn refresh_file_tree(&self, session_id: &str) -> Result<()>;
    async fn refresh_file_list(&self, session_id: &str) -> Result<()>;
}

async fn refresh_all(refresher: &dyn WorkspaceRefresher, session_id: &str) {
    if let Err(e) = refresher.refresh_file_tree(session_id).await {
        warn!("Failed to refresh workspace tree: {}", e);
    }
    if let Err(e) = refresher.refresh_file_list(session_id).await {
        warn!("Failed to refresh workspace files: {}", e);
    }
}

pub struct RefreshDebouncer {
    refresher: Arc<dyn WorkspaceRefresher>,
    session_id: String,
    window: Duration,
    pending: Option<CancellationToken>,
}

impl RefreshDebouncer {
    pub fn new(refresher: Arc<dyn WorkspaceRefresher>, session_id: String, window: Duration) -> Self {
        Self {
            refresher,
            session_id,
            window,
            pending: None,
        }
    }

    /// (Re)start the debounce window. Must be called within a tokio runtime.
    pub fn schedule(&mut self) {
        self.cancel();

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let refresher = self.refresher.clone();
        let session_id = self.session_id.clone();
        let window = self.window;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => return,
                _ = tokio::time::sleep(window) => {}
            }
            debug!("Refreshing workspace for {}", session_id);
            refresh_all(refresher.as_ref(), &session_id).await;
        });

        self.pending = Some(token);
    }

    /// Drop a pending refresh. One whose window already elapsed runs to completion.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Refresh right away, replacing any pending refresh
    pub async fn refresh_now(&mut self) {
        self.cancel();
        refresh_all(self.refresher.as_ref(), &self.session_id).await;
    }
}

impl Drop for RefreshDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
