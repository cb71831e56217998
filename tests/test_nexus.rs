use phylostream::events::{
    ContentType, Event, LiteralContentEvent, LiteralMetadataEvent, ObjectValue, SoleEvent,
    StartEvent, TokenSetType,
};
use phylostream::nexus::{
    BlockScope, CommandReader, NexusContext, NexusEventReader, NexusReaderBuilder, StepResult,
};
use phylostream::parser::{ByteSource, ParsingError, ParsingErrorType};
use phylostream::reader::EventReader;
use phylostream::{ReadWriteParameters, read_nexus_file, read_nexus_str};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashMap;
use std::path::Path;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new("tests").join("fixtures").join(name)
}

fn read_events(reader: &mut impl EventReader) -> Vec<Event> {
    let result: Result<Vec<Event>, ParsingError> = reader.events().collect();
    if let Err(e) = &result {
        eprintln!("Error reading events: {}", e);
    }
    result.unwrap()
}

/// Events between the start event at `index` and its matching end, including that end.
fn content_of(events: &[Event], index: usize) -> Vec<Event> {
    let mut depth = 0usize;
    let mut content = Vec::new();
    for event in &events[index + 1..] {
        content.push(event.clone());
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Sole(_) => {}
        }
    }
    content
}

fn position_of_labeled(events: &[Event], content_type: ContentType, label: &str) -> usize {
    events
        .iter()
        .position(|e| match e {
            Event::Start(start) => start.content_type() == content_type && start.label() == Some(label),
            _ => false,
        })
        .unwrap()
}

// --- TESTS READING WHOLE FILES ---

#[test]
fn test_primates_file() {
    let result = read_nexus_file(fixture("primates.nex"));
    if let Err(e) = &result {
        eprintln!("Error reading primates: {}", e);
    }
    let store = result.unwrap();
    assert_eq!(store.metadata, vec![Event::comment("Five hominoids, mitochondrial fragment")]);

    let otus = &store.otu_lists[0];
    assert_eq!(otus.start.label.as_deref(), Some("hominoids"));
    assert_eq!(otus.otus.len(), 5);
    assert_eq!(otus.otu_sets.len(), 2);

    let matrix = &store.matrices[0];
    assert_eq!(matrix.start.label.as_deref(), Some("mtDNA"));
    assert_eq!(matrix.start.linked_id.as_deref(), Some(otus.start.id.as_str()));
    assert_eq!(matrix.sequences.len(), 5);
    let rows: Vec<(Option<&str>, String)> = matrix
        .sequences
        .iter()
        .map(|s| (s.start.label.as_deref(), s.tokens.concat()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (Some("Homo"), "AAGCTTCACCAT".to_string()),
            (Some("Pan"), "AAGCTTCACCAT".to_string()),
            (Some("Gorilla"), "AAGCTTCACC?T".to_string()),
            (Some("Pongo"), "AAGCTTCTCCAG".to_string()),
            (Some("Hylobates"), "AAGCT-CACCAT".to_string()),
        ]
    );
    for sequence in &matrix.sequences {
        assert!(sequence.start.linked_id.is_some());
    }
    assert_eq!(matrix.character_sets.len(), 2);

    let group = &store.tree_groups[0];
    assert_eq!(group.start.label.as_deref(), Some("hominoid_trees"));
    assert_eq!(group.trees.len(), 2);
    assert_eq!(group.trees[0].nodes.len(), 9);
    assert_eq!(group.trees[1].nodes.len(), 8);
    assert_eq!(group.tree_sets.len(), 1);

    let commands: Vec<&str> = store.unknown_commands.iter().map(|c| c.command_name.as_str()).collect();
    assert_eq!(commands, vec!["set", "hsearch"]);
}

#[test]
fn test_buffered_and_in_memory_reading_agree() {
    let mut buffered = NexusReaderBuilder::for_file(fixture("primates.nex"))
        .with_buffered_source()
        .build()
        .unwrap();
    let mut in_memory = NexusReaderBuilder::for_file(fixture("primates.nex"))
        .with_in_memory_source()
        .build()
        .unwrap();
    assert_eq!(read_events(&mut buffered), read_events(&mut in_memory));
}

#[test]
fn test_unknown_commands_can_be_skipped() {
    let parameters = ReadWriteParameters::default().with_unknown_command_events(false);
    let mut reader = NexusReaderBuilder::for_file(fixture("primates.nex"))
        .with_parameters(parameters)
        .build()
        .unwrap();
    let events = read_events(&mut reader);
    assert!(!events.iter().any(|e| e.content_type() == ContentType::UnknownCommand));
}

// --- TESTS SETS AND FORMAT ---

#[test]
fn test_character_set_standard_format() {
    let events = read_events(&mut NexusReaderBuilder::for_file(fixture("mixed.nex")).build().unwrap());
    let start = position_of_labeled(&events, ContentType::CharacterSet, "A");
    assert_eq!(
        content_of(&events, start),
        vec![Event::interval(0, 3), Event::interval(4, 5), Event::end(ContentType::CharacterSet)]
    );
}

#[test]
fn test_character_set_vector_format() {
    let events = read_events(&mut NexusReaderBuilder::for_file(fixture("mixed.nex")).build().unwrap());
    let start = position_of_labeled(&events, ContentType::CharacterSet, "vector");
    assert_eq!(
        content_of(&events, start),
        vec![Event::interval(0, 3), Event::interval(5, 6), Event::end(ContentType::CharacterSet)]
    );
}

#[test]
fn test_mixed_data_type() {
    let events = read_events(&mut NexusReaderBuilder::for_file(fixture("mixed.nex")).build().unwrap());

    let dna = position_of_labeled(&events, ContentType::CharacterSet, "DNA");
    let protein = position_of_labeled(&events, ContentType::CharacterSet, "Protein");
    assert_eq!(content_of(&events, dna), vec![Event::interval(0, 3), Event::end(ContentType::CharacterSet)]);
    assert_eq!(
        content_of(&events, protein),
        vec![Event::interval(3, 10), Event::end(ContentType::CharacterSet)]
    );

    let token_sets: Vec<(TokenSetType, Option<String>)> = events
        .iter()
        .filter_map(|e| match e {
            Event::Start(StartEvent::TokenSetDefinition(t)) => Some((t.set_type, t.character_set_id.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        token_sets,
        vec![
            (TokenSetType::Dna, events[dna].id().map(String::from)),
            (TokenSetType::AminoAcid, events[protein].id().map(String::from)),
        ]
    );
    assert_ne!(events[dna].id(), events[protein].id());

    let store = read_nexus_file(fixture("mixed.nex")).unwrap();
    assert_eq!(store.matrices[0].sequences[1].tokens.concat(), "ACTMKVLSTW");
}

const TWO_ALIGNMENTS: &str = "#NEXUS
BEGIN TAXA;
    DIMENSIONS NTAX=2;
    TAXLABELS Kea Kaka;
END;
BEGIN CHARACTERS;
    TITLE X;
    DIMENSIONS NCHAR=3;
    FORMAT DATATYPE=DNA;
    CHARLABELS first second third;
    MATRIX
        Kea  ACG
        Kaka ACT
    ;
END;
BEGIN CHARACTERS;
    TITLE Y;
    DIMENSIONS NCHAR=4;
    FORMAT DATATYPE=DNA;
    CHARSTATELABELS 2 second / A C G T, 4 fourth;
    MATRIX
        Kea  ACGT
        Kaka ACTT
    ;
END;
BEGIN SETS;
    CHARSET a (CHARACTERS=X) = 1 third;
    CHARSET b = fourth second;
END;
";

/// ID of the linked alignment and content of character set `label`.
fn character_set(events: &[Event], label: &str) -> (Option<String>, Vec<Event>) {
    let start = position_of_labeled(events, ContentType::CharacterSet, label);
    let linked = match &events[start] {
        Event::Start(StartEvent::CharacterSet(set)) => set.linked_id.clone(),
        _ => None,
    };
    (linked, content_of(events, start))
}

#[test]
fn test_set_link_applies_to_its_own_set() {
    let events = read_events(&mut NexusEventReader::for_str(TWO_ALIGNMENTS));
    let x = position_of_labeled(&events, ContentType::Alignment, "X");
    let y = position_of_labeled(&events, ContentType::Alignment, "Y");
    assert_eq!(
        character_set(&events, "a"),
        (
            events[x].id().map(String::from),
            vec![Event::interval(0, 1), Event::interval(2, 3), Event::end(ContentType::CharacterSet)]
        )
    );
    assert_eq!(
        character_set(&events, "b"),
        (
            events[y].id().map(String::from),
            vec![Event::interval(3, 4), Event::interval(1, 2), Event::end(ContentType::CharacterSet)]
        )
    );
}

#[test]
fn test_character_names_are_per_alignment() {
    let store = read_nexus_str(TWO_ALIGNMENTS).unwrap();
    let names = |m: usize| -> Vec<Option<String>> {
        store.matrices[m]
            .character_definitions
            .elements()
            .iter()
            .map(|element| element.start.label().map(String::from))
            .collect()
    };
    assert_eq!(names(0), vec![Some("first".to_string()), Some("second".to_string()), Some("third".to_string())]);
    assert_eq!(names(1), vec![Some("second".to_string()), Some("fourth".to_string())]);
    assert_eq!(store.matrices[1].character_sets.len(), 1);

    // "first" is only a name of X
    let input = TWO_ALIGNMENTS.replace("fourth second;", "first;");
    let err = NexusEventReader::for_str(&input).events().find_map(Result::err).unwrap();
    assert!(matches!(err.kind(), ParsingErrorType::UnresolvedLabel(_)));
}

#[test]
fn test_character_sets_beyond_nchar_are_rejected() {
    for set in ["a = 2-5;", "a (VECTOR) = 00001;", "a (CHARACTERS=X) = 4;"] {
        let input = TWO_ALIGNMENTS.replace("a (CHARACTERS=X) = 1 third;", set);
        let err = NexusEventReader::for_str(&input).events().find_map(Result::err).unwrap();
        assert!(err.kind().is_syntax_error(), "{set}: {err}");
    }
}

// --- TESTS MATRIX PROPERTIES ---

fn interleaved_nexus(rows: &[String], width: usize) -> String {
    let columns = rows[0].len();
    let mut nexus = format!(
        "#NEXUS\nBEGIN DATA;\n\tDIMENSIONS NTAX={} NCHAR={columns};\n\tFORMAT DATATYPE=DNA GAP=- INTERLEAVE;\n\tMATRIX\n",
        rows.len()
    );
    let mut start = 0;
    while start < columns {
        let end = (start + width).min(columns);
        for (i, row) in rows.iter().enumerate() {
            nexus.push_str(&format!("\t\ts{i} {}\n", &row[start..end]));
        }
        nexus.push('\n');
        start = end;
    }
    nexus.push_str("\t;\nEND;\n");
    nexus
}

proptest! {
    #[test]
    fn test_interleaved_segments_concatenate_per_sequence(
        rows in (1usize..40).prop_flat_map(|columns| {
            prop::collection::vec(prop::collection::vec(prop::sample::select(vec!['A', 'C', 'G', 'T', '-']), columns), 1..6)
        }),
        width in 1usize..12,
        max_tokens in 1usize..6,
    ) {
        let rows: Vec<String> = rows.into_iter().map(|r| r.into_iter().collect()).collect();
        let nexus = interleaved_nexus(&rows, width);
        let parameters = ReadWriteParameters::default().with_max_tokens_to_read(max_tokens);
        let mut reader = NexusReaderBuilder::for_str(&nexus).with_parameters(parameters).build().unwrap();

        let mut labels: HashMap<String, String> = HashMap::new();
        let mut tokens: HashMap<String, String> = HashMap::new();
        let mut current = None;
        while let Some(event) = reader.next_event().unwrap() {
            match event {
                Event::Start(StartEvent::Sequence(sequence)) => {
                    let label = sequence.label.clone().unwrap_or_default();
                    // a resumed sequence keeps its ID
                    prop_assert_eq!(labels.entry(sequence.id.clone()).or_insert(label.clone()), &label);
                    current = Some(sequence.id);
                }
                Event::Sole(SoleEvent::SequenceTokens(t)) => {
                    prop_assert!(t.len() <= max_tokens);
                    tokens.entry(current.clone().unwrap()).or_default().push_str(&t.concat());
                }
                _ => {}
            }
        }

        prop_assert_eq!(tokens.len(), rows.len());
        for (id, label) in &labels {
            let index: usize = label[1..].parse().unwrap();
            prop_assert_eq!(&tokens[id], &rows[index]);
        }
    }

    #[test]
    fn test_comment_between_tokens_is_a_separate_event(
        row in "[ACGT]{2,30}",
        split in any::<prop::sample::Index>(),
    ) {
        let at = 1 + split.index(row.len() - 1);
        let nexus = format!(
            "#NEXUS\nBEGIN DATA;\n\tDIMENSIONS NTAX=1 NCHAR={};\n\tMATRIX\n\t\tkiwi {}[gap here]{}\n\t;\nEND;\n",
            row.len(),
            &row[..at],
            &row[at..]
        );
        let events = read_events(&mut NexusEventReader::for_str(&nexus));
        let start = events
            .iter()
            .position(|e| e.content_type() == ContentType::Sequence)
            .unwrap();

        let chars = |s: &str| s.chars().map(String::from).collect::<Vec<_>>();
        prop_assert_eq!(
            content_of(&events, start),
            vec![
                Event::tokens(chars(&row[..at])),
                Event::comment("gap here"),
                Event::tokens(chars(&row[at..])),
                Event::end(ContentType::Sequence),
            ]
        );
    }
}

// --- TESTS CUSTOM COMMAND READERS ---

/// Reads MrBayes `LSET key=value ...;` into literal metadata.
#[derive(Default)]
struct LsetReader;

impl<S: ByteSource> CommandReader<S> for LsetReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        while let Some(key) = ctx.read_word()? {
            ctx.expect_byte(b'=', "after LSET option")?;
            let value = ctx.read_value()?.unwrap_or_default();
            let id = ctx.new_id("meta");
            let predicate = format!("mrbayes:lset.{}", key.to_ascii_lowercase());
            ctx.push(StartEvent::LiteralMetadata(LiteralMetadataEvent::new(id, predicate)));
            ctx.push(Event::literal_content(LiteralContentEvent::simple(ObjectValue::parse_typed(&value))));
            ctx.push(Event::end(ContentType::LiteralMetadata));
        }
        ctx.expect_command_end("LSET")?;
        Ok(StepResult::Done)
    }
}

const MRBAYES: &str = "#NEXUS
BEGIN MRBAYES;
    LSET nst=6 rates=invgamma;
    MCMC ngen=10000;
END;
";

#[test]
fn test_custom_command_reader() {
    let mut reader = NexusReaderBuilder::for_str(MRBAYES)
        .with_command_reader::<LsetReader>("lset", BlockScope::Only(&["MRBAYES"]))
        .unwrap()
        .build()
        .unwrap();
    let events = read_events(&mut reader);

    let values: Vec<(String, Option<ObjectValue>)> = events
        .windows(2)
        .filter_map(|pair| match pair {
            [
                Event::Start(StartEvent::LiteralMetadata(literal)),
                Event::Sole(SoleEvent::LiteralMetadataContent(content)),
            ] => Some((literal.predicate.clone(), content.object_value.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        vec![
            ("mrbayes:lset.nst".to_string(), Some(ObjectValue::Integer(6))),
            ("mrbayes:lset.rates".to_string(), Some(ObjectValue::Text("invgamma".to_string()))),
        ]
    );

    // MCMC is still unknown
    let unknown: Vec<&Event> = events
        .iter()
        .filter(|e| e.content_type() == ContentType::UnknownCommand)
        .collect();
    assert_eq!(unknown.len(), 1);
}

#[test]
fn test_custom_command_reader_may_not_replace_builtin() {
    let result = NexusReaderBuilder::for_str(MRBAYES).with_command_reader::<LsetReader>("MATRIX", BlockScope::Only(&["DATA"]));
    assert!(result.is_err());
}

// --- TESTS DEALING WITH CORRUPT FILES ---

#[test]
fn test_missing_header() {
    let err = read_nexus_str("BEGIN TAXA; END;").unwrap_err();
    assert!(err.to_string().contains("#NEXUS"));
}

#[test]
fn test_errors_carry_format_and_kind() {
    let mut reader = NexusEventReader::for_str("#NEXUS\nBEGIN TAXA;\n\tDIMENSIONS NTAX=2;\n\tTAXLABELS A B\n");
    let err = reader.events().find_map(Result::err).unwrap();
    assert!(matches!(err.kind(), ParsingErrorType::UnexpectedEof(_)));
    assert_eq!(err.format(), Some("Nexus"));
    assert!(err.kind().is_syntax_error());

    // the reader stays failed
    assert!(reader.next_event().is_err());
}

#[test]
fn test_unsupported_tree_set_count_is_not_a_syntax_error() {
    let nexus = "#NEXUS
BEGIN TREES; TREE t = (A,B); END;
BEGIN SETS; TREESET late = 1-.; END;";
    let mut reader = NexusEventReader::for_str(nexus);
    let err = reader.events().find_map(Result::err).unwrap();
    assert!(matches!(err.kind(), ParsingErrorType::UnsupportedFeature(_)));
    assert!(!err.kind().is_syntax_error());
}
