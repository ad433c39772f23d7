//! Tag grammar and section extraction for structured assistant output.
//!
//! The upstream generator wraps each step of an analysis in one of six
//! case-sensitive tags (`<Analyze>`, `<Understand>`, `<Code>`, `<Execute>`,
//! `<File>`, `<Answer>`). Extraction is a pure function over the text seen so
//! far: only complete open/close pairs become sections, so a tag that is
//! still streaming stays ordinary text until its close tag arrives.

pub mod display;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of structured section kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionKind {
    Analyze,
    Understand,
    Code,
    Execute,
    File,
    Answer,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::Analyze,
        SectionKind::Understand,
        SectionKind::Code,
        SectionKind::Execute,
        SectionKind::File,
        SectionKind::Answer,
    ];

    /// Tag name as it appears on the wire
    pub fn tag_name(self) -> &'static str {
        match self {
            SectionKind::Analyze => "Analyze",
            SectionKind::Understand => "Understand",
            SectionKind::Code => "Code",
            SectionKind::Execute => "Execute",
            SectionKind::File => "File",
            SectionKind::Answer => "Answer",
        }
    }

    pub fn open_tag(self) -> &'static str {
        match self {
            SectionKind::Analyze => "<Analyze>",
            SectionKind::Understand => "<Understand>",
            SectionKind::Code => "<Code>",
            SectionKind::Execute => "<Execute>",
            SectionKind::File => "<File>",
            SectionKind::Answer => "<Answer>",
        }
    }

    pub fn close_tag(self) -> &'static str {
        match self {
            SectionKind::Analyze => "</Analyze>",
            SectionKind::Understand => "</Understand>",
            SectionKind::Code => "</Code>",
            SectionKind::Execute => "</Execute>",
            SectionKind::File => "</File>",
            SectionKind::Answer => "</Answer>",
        }
    }

    pub fn from_tag_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag_name() == name)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

impl FromStr for SectionKind {
    type Err = UnknownSectionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag_name(s).ok_or_else(|| UnknownSectionKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown section kind: {0}")]
pub struct UnknownSectionKind(pub String);

/// One complete `<Kind>...</Kind>` block found in a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    /// Text between the tags, trimmed
    pub body: String,
    /// Byte offset of the opening tag
    pub start_offset: usize,
    /// Byte offset just past the closing tag
    pub end_offset: usize,
    /// Zero-based index among sections of the same kind, in document order
    pub ordinal: usize,
}

/// Find all complete sections in `text`, in document order.
///
/// For every kind the first close tag after an open tag ends that section
/// (lazy match, no same-kind nesting). Matches of different kinds are merged
/// by start offset and numbered per kind afterwards. Never fails: unmatched or
/// out-of-order tags are simply left as literal text.
pub fn extract_sections(text: &str) -> Vec<Section> {
    let mut matches: Vec<(SectionKind, usize, usize, &str)> = Vec::new();

    for kind in SectionKind::ALL {
        let open = kind.open_tag();
        let close = kind.close_tag();
        let mut pos = 0;

        while let Some(rel_start) = text[pos..].find(open) {
            let start = pos + rel_start;
            let body_start = start + open.len();
            let Some(rel_close) = text[body_start..].find(close) else {
                // Any later open tag would need this same missing close tag
                break;
            };
            let body_end = body_start + rel_close;
            let end = body_end + close.len();
            matches.push((kind, start, end, &text[body_start..body_end]));
            pos = end;
        }
    }

    // Two matches can never share a start offset: each begins with its own open tag
    matches.sort_by_key(|&(_, start, _, _)| start);

    let mut counters = [0usize; SectionKind::ALL.len()];
    matches
        .into_iter()
        .map(|(kind, start_offset, end_offset, body)| {
            let counter = &mut counters[kind as usize];
            let ordinal = *counter;
            *counter += 1;
            Section {
                kind,
                body: body.trim().to_string(),
                start_offset,
                end_offset,
                ordinal,
            }
        })
        .collect()
}

/// A piece of message text, either free markdown or a structured section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Section(&'a Section),
}

/// Split `text` into free text and the given sections, in document order.
///
/// Whitespace-only gaps are dropped. Sections nested inside an earlier
/// section of another kind are still yielded, but no text is duplicated for
/// them. Any trailing text after the last section (including a section that
/// is still open) comes out as a final `Text` segment.
pub fn segments<'a>(text: &'a str, sections: &'a [Section]) -> Vec<Segment<'a>> {
    let mut parts = Vec::new();
    let mut last = 0;

    for section in sections {
        if section.start_offset > last {
            let before = &text[last..section.start_offset];
            if !before.trim().is_empty() {
                parts.push(Segment::Text(before));
            }
        }
        parts.push(Segment::Section(section));
        last = last.max(section.end_offset);
    }

    let rest = trailing_text(text, sections);
    if !rest.trim().is_empty() {
        parts.push(Segment::Text(rest));
    }

    parts
}

/// Text after the last complete section; the whole text if there is none
pub fn trailing_text<'a>(text: &'a str, sections: &[Section]) -> &'a str {
    let boundary = sections
        .iter()
        .map(|section| section.end_offset)
        .max()
        .unwrap_or(0);
    &text[boundary.min(text.len())..]
}

/// Whether a complete `File` section is present in `text`
pub fn has_file_section(text: &str) -> bool {
    extract_sections(text)
        .iter()
        .any(|section| section.kind == SectionKind::File)
}
