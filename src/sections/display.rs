use super::SectionKind;

/// Presentation details for a section kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionStyle {
    pub label: &'static str,
    pub icon: &'static str,
    /// Accent colour as a hex string
    pub color: &'static str,
    /// ANSI colour code for terminal output
    pub ansi: &'static str,
}

pub fn metadata(kind: SectionKind) -> SectionStyle {
    match kind {
        SectionKind::Analyze => SectionStyle {
            label: "Analyze",
            icon: "🔍",
            color: "#3b82f6",
            ansi: "\x1b[34m",
        },
        SectionKind::Understand => SectionStyle {
            label: "Understand",
            icon: "🧠",
            color: "#06b6d4",
            ansi: "\x1b[36m",
        },
        SectionKind::Code => SectionStyle {
            label: "Code",
            icon: "💻",
            color: "#6b7280",
            ansi: "\x1b[90m",
        },
        SectionKind::Execute => SectionStyle {
            label: "Execute",
            icon: "⚡",
            color: "#f97316",
            ansi: "\x1b[33m",
        },
        SectionKind::File => SectionStyle {
            label: "File",
            icon: "📎",
            color: "#a855f7",
            ansi: "\x1b[35m",
        },
        SectionKind::Answer => SectionStyle {
            label: "Answer",
            icon: "✅",
            color: "#22c55e",
            ansi: "\x1b[32m",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_distinct_style() {
        let styles: Vec<SectionStyle> = SectionKind::ALL.into_iter().map(metadata).collect();
        for (i, a) in styles.iter().enumerate() {
            assert_eq!(a.label, SectionKind::ALL[i].tag_name());
            for b in &styles[i + 1..] {
                assert_ne!(a.icon, b.icon);
                assert_ne!(a.color, b.color);
            }
        }
    }
}
