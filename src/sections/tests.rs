use super::*;

fn summary(sections: &[Section]) -> Vec<(SectionKind, usize, &str)> {
    sections
        .iter()
        .map(|s| (s.kind, s.ordinal, s.body.as_str()))
        .collect()
}

// Every char-boundary prefix of the input, shortest first
fn prefixes(s: &str) -> Vec<&str> {
    let mut result: Vec<&str> = s.char_indices().map(|(i, _)| &s[..i]).collect();
    result.push(s);
    result
}

#[test]
fn test_unclosed_tag_yields_nothing() {
    assert!(extract_sections("<Code>print(1)").is_empty());

    let sections = extract_sections("<Code>print(1)</Code>");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].kind, SectionKind::Code);
    assert_eq!(sections[0].body, "print(1)");
    assert_eq!(sections[0].ordinal, 0);
    assert_eq!(sections[0].start_offset, 0);
    assert_eq!(sections[0].end_offset, "<Code>print(1)</Code>".len());
}

#[test]
fn test_ordinals_are_per_kind_in_document_order() {
    let sections = extract_sections("<Analyze>a</Analyze><Code>b</Code><Analyze>c</Analyze>");
    assert_eq!(
        summary(&sections),
        vec![
            (SectionKind::Analyze, 0, "a"),
            (SectionKind::Code, 0, "b"),
            (SectionKind::Analyze, 1, "c"),
        ]
    );
}

#[test]
fn test_body_is_trimmed_and_may_span_lines() {
    let text = "intro\n<Code>\n```python\nimport pandas as pd\n```\n</Code>\noutro";
    let sections = extract_sections(text);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].body, "```python\nimport pandas as pd\n```");
    assert_eq!(&text[sections[0].start_offset..][..6], "<Code>");
}

#[test]
fn test_lazy_match_does_not_nest_same_kind() {
    let sections = extract_sections("<Code>a<Code>b</Code>c</Code>");
    assert_eq!(summary(&sections), vec![(SectionKind::Code, 0, "a<Code>b")]);
}

#[test]
fn test_stray_close_tag_is_literal() {
    let text = "</Answer> then <Answer>done</Answer>";
    let sections = extract_sections(text);
    assert_eq!(summary(&sections), vec![(SectionKind::Answer, 0, "done")]);
    assert_eq!(sections[0].start_offset, text.find("<Answer>").unwrap());
}

#[test]
fn test_tags_are_case_sensitive_and_closed_set() {
    assert!(extract_sections("<code>x</code><Plan>y</Plan><Code>z</code>").is_empty());
}

#[test]
fn test_all_six_kinds() {
    let text = "<Analyze>1</Analyze><Understand>2</Understand><Code>3</Code>\
                <Execute>4</Execute><File>5</File><Answer>6</Answer>";
    let kinds: Vec<SectionKind> = extract_sections(text).iter().map(|s| s.kind).collect();
    assert_eq!(kinds, SectionKind::ALL.to_vec());
}

#[test]
fn test_sections_only_grow_as_text_arrives() {
    let full = "Let me look.\n<Analyze>Load the data 📊</Analyze>\n<Code>df = pd.read_csv('a.csv')</Code>\n\
                <Execute>ok</Execute><Analyze>Plot it</Analyze><File>- [plot.png](/files/plot.png)</File>\
                <Answer>Done ✅</Answer>";

    let mut previous: Vec<Section> = Vec::new();
    for prefix in prefixes(full) {
        let current = extract_sections(prefix);
        assert!(current.len() >= previous.len(), "sections shrank at {prefix:?}");
        assert_eq!(
            &current[..previous.len()],
            &previous[..],
            "earlier sections changed at {prefix:?}"
        );
        previous = current;
    }
    assert_eq!(previous.len(), 6);
}

#[test]
fn test_partial_close_tag_is_not_a_section() {
    for partial in ["<Answer>42</", "<Answer>42</Ans", "<Answer>42</Answer"] {
        assert!(extract_sections(partial).is_empty(), "{partial}");
    }
}

#[test]
fn test_segments_interleave_text_and_sections() {
    let text = "Hello\n<Analyze>a</Analyze>\n\nmiddle <Code>b</Code>  \n<Answer>still typ";
    let sections = extract_sections(text);
    let parts = segments(text, &sections);

    assert_eq!(parts.len(), 5);
    assert_eq!(parts[0], Segment::Text("Hello\n"));
    assert!(matches!(parts[1], Segment::Section(s) if s.kind == SectionKind::Analyze));
    assert_eq!(parts[2], Segment::Text("\n\nmiddle "));
    assert!(matches!(parts[3], Segment::Section(s) if s.kind == SectionKind::Code));
    assert_eq!(parts[4], Segment::Text("  \n<Answer>still typ"));
}

#[test]
fn test_segments_without_sections_is_plain_text() {
    let text = "just markdown";
    assert_eq!(segments(text, &[]), vec![Segment::Text("just markdown")]);
    assert!(segments("   \n", &[]).is_empty());
}

#[test]
fn test_trailing_text_after_last_section() {
    let text = "<Code>x</Code> tail <Execute>run";
    let sections = extract_sections(text);
    assert_eq!(trailing_text(text, &sections), " tail <Execute>run");
    assert_eq!(trailing_text("no tags", &[]), "no tags");
}

#[test]
fn test_nested_sections_of_other_kinds() {
    let text = "<Analyze>plan <Code>x</Code></Analyze> after";
    let sections = extract_sections(text);
    assert_eq!(
        summary(&sections),
        vec![
            (SectionKind::Analyze, 0, "plan <Code>x</Code>"),
            (SectionKind::Code, 0, "x"),
        ]
    );
    let parts = segments(text, &sections);
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[2], Segment::Text(" after"));
}

#[test]
fn test_has_file_section() {
    assert!(!has_file_section("<File>- [a.csv](/a.csv)"));
    assert!(has_file_section("<File>- [a.csv](/a.csv)</File>"));
}

#[test]
fn test_kind_round_trips_through_tag_name() {
    for kind in SectionKind::ALL {
        assert_eq!(kind.tag_name().parse::<SectionKind>(), Ok(kind));
        assert_eq!(kind.open_tag(), format!("<{kind}>"));
        assert_eq!(kind.close_tag(), format!("</{kind}>"));
    }
    assert!("answer".parse::<SectionKind>().is_err());
}
