//! Client core for a conversational data-analysis workspace.
//!
//! Assistant replies stream in as text with embedded step tags
//! (`<Analyze>`, `<Code>`, `<Execute>`, `<File>`, `<Answer>`, `<Understand>`).
//! This crate rebuilds those replies from arbitrary chunks, splits them into
//! typed sections, keeps per-section collapse state, and schedules workspace
//! refreshes when files are produced.

pub mod chat;
pub mod cli;
pub mod collapse;
pub mod config;
pub mod conversation;
pub mod error;
pub mod keys;
pub mod logging;
pub mod navigator;
pub mod refresh;
pub mod sections;
pub mod session;
pub mod streaming;
pub mod workspace;

pub use chat::{ChatClient, ChatSession, StreamOutcome};
pub use error::ChatError;
pub use keys::SectionKey;
pub use sections::{extract_sections, Section, SectionKind};
pub use session::SessionStore;
