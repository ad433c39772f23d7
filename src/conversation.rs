use crate::keys::{keys_for, SectionKey};
use crate::sections::{extract_sections, Section};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Shown in the transcript but never sent back to the backend
    #[serde(default)]
    pub local_only: bool,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: generate_message_id(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
            local_only: false,
        }
    }

    pub fn sections(&self) -> Vec<Section> {
        extract_sections(&self.content)
    }
}

fn generate_message_id() -> String {
    format!(
        "{}-{:08x}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

/// Append-only chat log. Only the content of a streaming assistant message
/// is ever rewritten, addressed by id.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its index
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|message| message.id == id)
    }

    /// Replace the content of message `id`; returns whether it exists
    pub fn set_content(&mut self, id: &str, content: &str) -> bool {
        match self.messages.iter_mut().find(|message| message.id == id) {
            Some(message) => {
                message.content.clear();
                message.content.push_str(content);
                true
            }
            None => false,
        }
    }

    /// Messages that are sent back to the backend as history
    pub fn history(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|message| !message.local_only)
    }

    /// Sections of message `index` with their scoped keys
    pub fn sections_with_keys(&self, index: usize) -> Vec<(SectionKey, Section)> {
        let Some(message) = self.messages.get(index) else {
            return Vec::new();
        };
        let sections = message.sections();
        keys_for(Some(index), &sections)
            .into_iter()
            .zip(sections)
            .collect()
    }
}
