//! Stable identifiers for per-section UI state.
//!
//! A key is a small record `(message, kind, ordinal)`. Its string form is only
//! used where state maps are stored: `msg{message}-{Kind}-{ordinal}` when the
//! owning message is known, `{Kind}-{ordinal}` (the base key) otherwise.

use crate::sections::{Section, SectionKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionKey {
    pub message: Option<usize>,
    pub kind: SectionKind,
    pub ordinal: usize,
}

pub fn assign_key(message: Option<usize>, kind: SectionKind, ordinal: usize) -> SectionKey {
    SectionKey {
        message,
        kind,
        ordinal,
    }
}

impl SectionKey {
    pub fn for_section(message: Option<usize>, section: &Section) -> Self {
        assign_key(message, section.kind, section.ordinal)
    }

    /// The same key without its message scope
    pub fn base(&self) -> SectionKey {
        SectionKey {
            message: None,
            ..*self
        }
    }

    pub fn is_scoped(&self) -> bool {
        self.message.is_some()
    }
}

/// Keys for a message's sections, in the sections' order
pub fn keys_for(message: Option<usize>, sections: &[Section]) -> Vec<SectionKey> {
    sections
        .iter()
        .map(|section| SectionKey::for_section(message, section))
        .collect()
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = self.message {
            write!(f, "msg{}-", message)?;
        }
        write!(f, "{}-{}", self.kind, self.ordinal)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid section key: {0}")]
pub struct KeyParseError(pub String);

impl FromStr for SectionKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyParseError(s.to_string());

        let (message, rest) = match s.strip_prefix("msg") {
            Some(scoped) => {
                let (index, rest) = scoped.split_once('-').ok_or_else(invalid)?;
                (Some(index.parse::<usize>().map_err(|_| invalid())?), rest)
            }
            None => (None, s),
        };

        let (kind, ordinal) = rest.split_once('-').ok_or_else(invalid)?;
        let kind = kind.parse::<SectionKind>().map_err(|_| invalid())?;
        let ordinal = ordinal.parse::<usize>().map_err(|_| invalid())?;

        Ok(assign_key(message, kind, ordinal))
    }
}

impl TryFrom<String> for SectionKey {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SectionKey> for String {
    fn from(key: SectionKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let a = assign_key(Some(3), SectionKind::Code, 2);
        let b = assign_key(Some(3), SectionKind::Code, 2);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), "msg3-Code-2");
    }

    #[test]
    fn test_base_key_matches_unscoped_key() {
        let scoped = assign_key(Some(7), SectionKind::Code, 2);
        let unscoped = assign_key(None, SectionKind::Code, 2);
        assert_eq!(scoped.base(), unscoped);
        assert_eq!(scoped.base().to_string(), "Code-2");
        assert!(scoped.is_scoped());
        assert!(!unscoped.is_scoped());
    }

    #[test]
    fn test_string_form_parses_back() {
        for text in ["msg0-Analyze-0", "Answer-12", "msg41-File-3"] {
            let key: SectionKey = text.parse().unwrap();
            assert_eq!(key.to_string(), text);
        }
    }

    #[test]
    fn test_invalid_strings_are_rejected() {
        for text in ["", "Code", "Code-", "Code-x", "msg-Code-1", "msgX-Code-1", "Plan-1", "msg1-Code"] {
            assert!(text.parse::<SectionKey>().is_err(), "{text}");
        }
    }

    #[test]
    fn test_serializes_as_string() {
        let key = assign_key(Some(1), SectionKind::Execute, 0);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"msg1-Execute-0\"");
        let back: SectionKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_keys_follow_section_order() {
        let sections = crate::sections::extract_sections("<Code>a</Code><Execute>b</Execute><Code>c</Code>");
        let keys: Vec<String> = keys_for(Some(2), &sections)
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["msg2-Code-0", "msg2-Execute-0", "msg2-Code-1"]);
    }
}
