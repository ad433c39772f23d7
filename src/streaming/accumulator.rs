use super::records::{parse_record, Record};
use super::LineBuffer;
use crate::keys::{keys_for, SectionKey};
use crate::sections::{extract_sections, trailing_text, Section, SectionKind};
use encoding_rs::{CoderResult, Decoder, UTF_8};
use tracing::{debug, trace, warn};

/// Result of feeding the accumulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamUpdate {
    /// All complete sections so far, in document order
    pub sections: Vec<Section>,
    /// How many of `sections` completed with this update
    pub newly_completed: usize,
    /// The sections that completed with this update, in document order
    pub new_sections: Vec<Section>,
    /// Free text after the last complete section
    pub tail: String,
    /// A `File` section closed with this update
    pub file_closed: bool,
    /// The end-of-stream sentinel was seen
    pub finished: bool,
}

impl StreamUpdate {
    /// Sections that completed with this update. An outer tag closing around
    /// an already complete section is reported here even though it sorts
    /// before it.
    pub fn completed(&self) -> &[Section] {
        &self.new_sections
    }
}

/// Rebuilds one assistant message from the stream.
///
/// Bound to a single message: ordinals are counted over this message's text
/// only, and keys carry its index.
pub struct StreamAccumulator {
    message_index: usize,
    decoder: Decoder,
    lines: LineBuffer,
    text: String,
    sections: Vec<Section>,
    finished: bool,
    decoder_flushed: bool,
}

impl StreamAccumulator {
    pub fn new(message_index: usize) -> Self {
        Self {
            message_index,
            decoder: UTF_8.new_decoder(),
            lines: LineBuffer::new(),
            text: String::new(),
            sections: Vec::new(),
            finished: false,
            decoder_flushed: false,
        }
    }

    pub fn message_index(&self) -> usize {
        self.message_index
    }

    pub fn current_text(&self) -> &str {
        &self.text
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn keys(&self) -> Vec<SectionKey> {
        keys_for(Some(self.message_index), &self.sections)
    }

    /// Whether the `[DONE]` sentinel has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed raw bytes from the transport. Returns an update when the
    /// message text grew or the stream signalled its end.
    pub fn on_chunk(&mut self, chunk: &[u8]) -> Option<StreamUpdate> {
        if self.decoder_flushed {
            warn!("Ignoring {} bytes received after end of stream", chunk.len());
            return None;
        }
        let decoded = self.decode(chunk, false);
        self.consume_decoded(&decoded)
    }

    /// Append a text delta directly, bypassing record framing
    pub fn push_delta(&mut self, delta: &str) -> StreamUpdate {
        self.text.push_str(delta);
        self.refresh_sections()
    }

    /// Flush the decoder and try the unterminated last record once more.
    /// An invalid remainder is dropped without complaint.
    pub fn finish(&mut self) -> Option<StreamUpdate> {
        if self.decoder_flushed {
            return None;
        }
        let decoded = self.decode(&[], true);
        self.decoder_flushed = true;

        let mut update = self.consume_decoded(&decoded);

        if let Some(rest) = self.lines.take_remainder() {
            match parse_record(&rest) {
                Ok(Record::Delta(delta)) if !self.finished => {
                    self.text.push_str(&delta);
                    update = Some(self.refresh_sections());
                }
                Ok(Record::Done) => {
                    self.finished = true;
                    update = Some(self.refresh_sections());
                }
                Ok(_) => {}
                Err(e) => debug!("Discarding trailing partial record: {}", e),
            }
        }

        update
    }

    fn consume_decoded(&mut self, decoded: &str) -> Option<StreamUpdate> {
        let mut deltas = Vec::new();
        let mut saw_done = false;
        let already_finished = self.finished;

        self.lines.push(decoded, |line| {
            if already_finished || saw_done {
                trace!("Ignoring record after end of stream");
                return;
            }
            match parse_record(line) {
                Ok(Record::Delta(delta)) => deltas.push(delta),
                Ok(Record::Done) => saw_done = true,
                Ok(Record::Empty) => {}
                Err(e) => warn!("Skipping malformed stream record {:?}: {}", line, e),
            }
        });

        if saw_done {
            debug!("Stream end sentinel received");
            self.finished = true;
        }
        if deltas.is_empty() && !saw_done {
            return None;
        }

        for delta in &deltas {
            self.text.push_str(delta);
        }
        Some(self.refresh_sections())
    }

    fn refresh_sections(&mut self) -> StreamUpdate {
        let sections = extract_sections(&self.text);
        // Complete sections never move, so (kind, start) identifies them across updates
        let new_sections: Vec<Section> = sections
            .iter()
            .filter(|section| {
                !self.sections.iter().any(|seen| {
                    seen.kind == section.kind && seen.start_offset == section.start_offset
                })
            })
            .cloned()
            .collect();
        let newly_completed = new_sections.len();

        let file_count =
            |list: &[Section]| list.iter().filter(|s| s.kind == SectionKind::File).count();
        let file_closed = file_count(&sections) > file_count(&self.sections);

        if newly_completed > 0 {
            debug!(
                "Message {}: {} section(s) complete, {} new",
                self.message_index,
                sections.len(),
                newly_completed
            );
        }

        let tail = trailing_text(&self.text, &sections).to_string();
        self.sections = sections;

        StreamUpdate {
            sections: self.sections.clone(),
            newly_completed,
            new_sections,
            tail,
            file_closed,
            finished: self.finished,
        }
    }

    fn decode(&mut self, bytes: &[u8], last: bool) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 16);
        let mut output = String::with_capacity(capacity);
        let mut input = bytes;

        loop {
            let (result, read, had_errors) = self.decoder.decode_to_string(input, &mut output, last);
            if had_errors {
                warn!("Invalid UTF-8 in stream, replaced with U+FFFD");
            }
            input = &input[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => output.reserve(input.len() * 3 + 16),
            }
        }

        output
    }
}
