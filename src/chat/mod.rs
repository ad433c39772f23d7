//! Chat requests and the streaming read loop.
//!
//! A send appends the user message, posts the conversation and then either
//! consumes a JSON body in one piece or streams deltas into an assistant
//! placeholder. Every update re-applies the collapse policy and, when a
//! `File` section closed, re-arms the debounced workspace refresh.

mod client;
mod types;


pub use client::{ChatClient, ChatResponse};
pub use types::{
    ChatMessage, ChatRequest, ChatRole, Notification, NotificationLevel, Notifier, StreamOutcome,
};

use crate::conversation::{Conversation, Message, Sender};
use crate::error::{ChatError, Result};
use crate::refresh::{RefreshDebouncer, WorkspaceRefresher};
use crate::sections::has_file_section;
use crate::session::SessionStore;
use crate::streaming::{parse_complete_response, StreamAccumulator, StreamUpdate};
use crate::workspace::{WorkspaceClient, WorkspaceFile};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const SYSTEM_PROMPT: &str = include_str!("../../resources/system_prompt.md");

const FAILURE_MESSAGE: &str = "Request failed, please try again later";

type UpdateCallback = Box<dyn FnMut(&StreamUpdate) + Send>;

/// Sends the stop request for a session. Cheap to clone into a signal handler.
#[derive(Clone)]
pub struct StopHandle {
    client: ChatClient,
    session_id: String,
    notifier: Arc<dyn Notifier>,
}

impl StopHandle {
    pub async fn stop(&self) {
        match self.client.stop(&self.session_id).await {
            Ok(()) => self.notifier.notify(Notification::info("Stop signal sent")),
            Err(e) => {
                error!("Failed to send stop signal: {}", e);
                self.notifier
                    .notify(Notification::error("Failed to send stop signal"));
            }
        }
    }
}

pub struct ChatSession {
    client: ChatClient,
    conversation: Conversation,
    store: SessionStore,
    refresh: RefreshDebouncer,
    notifier: Arc<dyn Notifier>,
    workspace: Option<WorkspaceClient>,
    system_prompt: String,
    on_update: Option<UpdateCallback>,
}

impl ChatSession {
    pub fn new(
        client: ChatClient,
        store: SessionStore,
        refresher: Arc<dyn WorkspaceRefresher>,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
    ) -> Self {
        let refresh = RefreshDebouncer::new(refresher, store.session_id().to_string(), debounce);
        Self {
            client,
            conversation: Conversation::new(),
            store,
            refresh,
            notifier,
            workspace: None,
            system_prompt: SYSTEM_PROMPT.to_string(),
            on_update: None,
        }
    }

    /// Source of the file list sent along with each request
    pub fn with_workspace(mut self, workspace: WorkspaceClient) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Called after every change to the assistant message being received
    pub fn on_update(&mut self, callback: impl FnMut(&StreamUpdate) + Send + 'static) {
        self.on_update = Some(Box::new(callback));
    }

    pub fn session_id(&self) -> &str {
        self.store.session_id()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            client: self.client.clone(),
            session_id: self.store.session_id().to_string(),
            notifier: self.notifier.clone(),
        }
    }

    /// Send `input` and consume the reply until it ends, fails or `cancel`
    /// fires. Only failures reach the notifier. Whatever content arrived
    /// before an abort stays in the conversation.
    pub async fn send_message(&mut self, input: &str, cancel: &CancellationToken) -> StreamOutcome {
        let request = self.build_request(input);
        self.conversation.push(Message::new(Sender::User, input));

        match self.run(&request, cancel).await {
            Ok(()) => StreamOutcome::Completed,
            Err(e) if e.is_cancellation() => {
                info!("Request cancelled by user");
                self.refresh.cancel();
                StreamOutcome::Cancelled
            }
            Err(e) => {
                error!("Chat request failed: {}", e);
                self.refresh.cancel();
                self.notifier.notify(Notification::error(FAILURE_MESSAGE));
                StreamOutcome::Failed
            }
        }
    }

    fn build_request(&self, input: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.conversation.messages().len() + 2);
        messages.push(ChatMessage {
            role: ChatRole::System,
            content: self.system_prompt.clone(),
        });
        messages.extend(self.conversation.history().map(ChatMessage::from));
        messages.push(ChatMessage {
            role: ChatRole::User,
            content: input.to_string(),
        });

        ChatRequest {
            model: self.client.model().to_string(),
            messages,
            stream: true,
            workspace: self.workspace_files(),
            session_id: self.store.session_id().to_string(),
        }
    }

    fn workspace_files(&self) -> Vec<WorkspaceFile> {
        self.workspace
            .as_ref()
            .map(|workspace| workspace.files())
            .unwrap_or_default()
    }

    async fn run(&mut self, request: &ChatRequest, cancel: &CancellationToken) -> Result<()> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            response = self.client.start(request) => response?,
        };

        match response {
            ChatResponse::Complete(response) => self.consume_complete(response, cancel).await,
            ChatResponse::Stream(response) => self.consume_stream(response, cancel).await,
        }
    }

    async fn consume_complete(
        &mut self,
        response: reqwest::Response,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            body = response.text() => body?,
        };
        let content = parse_complete_response(&body)?;
        debug!("Received complete response ({} bytes)", content.len());

        let message = Message::new(Sender::Assistant, "");
        let id = message.id.clone();
        let index = self.conversation.push(message);

        let mut accumulator = StreamAccumulator::new(index);
        let update = accumulator.push_delta(&content);
        self.apply_update(&id, &accumulator, &update);

        if has_file_section(&content) {
            self.refresh.refresh_now().await;
        }
        Ok(())
    }

    async fn consume_stream(
        &mut self,
        mut response: reqwest::Response,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let placeholder = Message::new(Sender::Assistant, "");
        let id = placeholder.id.clone();
        let index = self.conversation.push(placeholder);
        let mut accumulator = StreamAccumulator::new(index);

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                chunk = response.chunk() => chunk?,
            };
            let Some(chunk) = chunk else {
                break;
            };

            if let Some(update) = accumulator.on_chunk(&chunk) {
                self.apply_update(&id, &accumulator, &update);
            }
            if accumulator.is_finished() {
                break;
            }
        }

        if let Some(update) = accumulator.finish() {
            self.apply_update(&id, &accumulator, &update);
        }
        debug!(
            "Stream complete: {} section(s), {} bytes",
            accumulator.sections().len(),
            accumulator.current_text().len()
        );

        self.refresh.refresh_now().await;
        Ok(())
    }

    fn apply_update(&mut self, id: &str, accumulator: &StreamAccumulator, update: &StreamUpdate) {
        self.conversation.set_content(id, accumulator.current_text());

        if update.newly_completed > 0 {
            self.store.apply_auto_collapse(&accumulator.keys());
        }
        if update.file_closed {
            self.refresh.schedule();
        }
        if let Some(callback) = self.on_update.as_mut() {
            callback(update);
        }
    }
}
