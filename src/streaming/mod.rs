//! Incremental consumption of the chat completion stream.
//!
//! Bytes arrive at arbitrary boundaries. They are decoded resumably, split
//! into line records, and each record's delta is appended to the message text,
//! after which sections are re-extracted from the whole text.

mod accumulator;
mod records;


pub use accumulator::{StreamAccumulator, StreamUpdate};
pub use records::{parse_complete_response, parse_record, Record};

/// Collects decoded text and hands out complete lines
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text, calling `line_handler` for each complete line
    pub fn push<F>(&mut self, text: &str, mut line_handler: F)
    where
        F: FnMut(&str),
    {
        for c in text.chars() {
            if c == '\n' {
                if !self.buffer.is_empty() {
                    line_handler(&self.buffer);
                    self.buffer.clear();
                }
            } else {
                self.buffer.push(c);
            }
        }
    }

    /// Take whatever is left without a terminating newline
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}
