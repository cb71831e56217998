use phylostream::events::{ContentType, Event, GrammarChecker, StartEvent};
use phylostream::newick::NewickEventReader;
use phylostream::nexus::{NexusEventReader, NexusReaderBuilder};
use phylostream::reader::EventReader;
use phylostream::receiver::{EventReceiver, ReceiverHandler, ValidatingReceiver};
use phylostream::writer::WriteError;
use phylostream::ReadWriteParameters;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new("tests").join("fixtures").join(name)
}

/// Reads all events of `reader`, checking each against the grammar.
fn check_grammar(reader: &mut impl EventReader) -> Vec<Event> {
    let mut checker = GrammarChecker::new();
    let mut events = Vec::new();
    while let Some(event) = reader.next_event().unwrap() {
        if let Err(e) = checker.check(&event) {
            panic!("{e} at event {} ({event:?})", events.len());
        }
        events.push(event);
    }
    checker.finish().unwrap();
    events
}

/// Checks that no two elements share an ID. Interleaved sequence segments
/// are the same element and may repeat the start event.
fn assert_unique_ids(events: &[Event]) {
    let mut seen: HashMap<&str, &StartEvent> = HashMap::new();
    for event in events {
        let Event::Start(start) = event else {
            continue;
        };
        if let Some(previous) = seen.insert(start.id(), start) {
            assert_eq!(previous.content_type(), ContentType::Sequence, "duplicate ID {}", start.id());
            assert_eq!(previous, start, "duplicate ID {}", start.id());
        }
    }
}

// --- TESTS GRAMMAR OF ALL FIXTURES ---

#[test]
fn test_nexus_fixtures_follow_grammar() {
    for name in ["primates.nex", "mixed.nex"] {
        for buffered in [false, true] {
            let builder = NexusReaderBuilder::for_file(fixture(name));
            let builder = if buffered {
                builder.with_buffered_source()
            } else {
                builder.with_in_memory_source()
            };
            let events = check_grammar(&mut builder.build().unwrap());
            assert_eq!(events.first().map(Event::content_type), Some(ContentType::Document));
            assert_eq!(events.last(), Some(&Event::end(ContentType::Document)));
            assert_unique_ids(&events);
        }
    }
}

#[test]
fn test_newick_fixture_follows_grammar() {
    let mut reader = NewickEventReader::from_file_in_memory(fixture("rails.nwk"), ReadWriteParameters::default()).unwrap();
    let events = check_grammar(&mut reader);
    assert_unique_ids(&events);
    let trees = events
        .iter()
        .filter(|e| matches!(e, Event::Start(StartEvent::Tree(_))))
        .count();
    assert_eq!(trees, 3);
}

#[test]
fn test_small_token_and_comment_limits_follow_grammar() {
    let parameters = ReadWriteParameters::default()
        .with_max_tokens_to_read(1)
        .with_max_comment_length(3);
    let mut reader = NexusReaderBuilder::for_file(fixture("primates.nex"))
        .with_parameters(parameters)
        .build()
        .unwrap();
    let events = check_grammar(&mut reader);
    let continued = events
        .iter()
        .filter(|e| matches!(e, Event::Sole(phylostream::events::SoleEvent::Comment(c)) if c.continued_in_next_event))
        .count();
    assert!(continued > 0);
}

// --- TESTS READER CONTRACT ---

#[test]
fn test_peek_is_idempotent() {
    let mut reader = NexusReaderBuilder::for_file(fixture("primates.nex")).build().unwrap();
    let mut count = 0;
    loop {
        let peeked = reader.peek().unwrap().cloned();
        assert_eq!(reader.peek().unwrap().cloned(), peeked);
        assert_eq!(reader.has_next_event().unwrap(), peeked.is_some());
        assert_eq!(reader.peek().unwrap().cloned(), peeked);

        let next = reader.next_event().unwrap();
        assert_eq!(next, peeked);
        if next.is_none() {
            break;
        }
        count += 1;
    }
    assert!(count > 100);
}

#[test]
fn test_closed_reader_fails() {
    let mut reader = NexusEventReader::for_str("#NEXUS\nBEGIN TAXA; TAXLABELS A; END;");
    assert!(reader.next_event().unwrap().is_some());
    reader.close();
    assert!(reader.next_event().is_err());
}

fn newick_vertex() -> impl Strategy<Value = String> {
    "[a-z]{1,5}".prop_recursive(4, 40, 4, |inner| {
        prop::collection::vec(inner, 1..5).prop_map(|children| format!("({})", children.join(",")))
    })
}

proptest! {
    #[test]
    fn test_ids_are_unique_per_document(trees in prop::collection::vec(newick_vertex(), 1..5)) {
        let newick: String = trees.iter().map(|t| format!("({t},root_sibling);\n")).collect();
        let mut reader = NewickEventReader::for_str(&newick, ReadWriteParameters::default());
        let events = check_grammar(&mut reader);

        let mut ids = HashMap::new();
        for event in &events {
            if let Some(id) = event.id() {
                prop_assert!(ids.insert(id.to_string(), event.content_type()).is_none(), "duplicate ID {}", id);
            }
        }
        let tree_count = events
            .iter()
            .filter(|e| matches!(e, Event::Start(StartEvent::Tree(_))))
            .count();
        prop_assert_eq!(tree_count, trees.len());
    }
}

// --- TESTS READER TO RECEIVER ---

/// Accepts everything, collecting the content types of the elements started.
#[derive(Default)]
struct StartedTypes(Vec<ContentType>);

impl ReceiverHandler for StartedTypes {
    fn handle_other(&mut self, event: Event, _parent: Option<&Event>) -> Result<bool, WriteError> {
        if let Event::Start(start) = &event {
            self.0.push(start.content_type());
        }
        Ok(true)
    }
}

#[test]
fn test_read_events_pass_validating_receiver() {
    let mut reader = NexusReaderBuilder::for_file(fixture("primates.nex")).build().unwrap();
    let mut receiver = ValidatingReceiver::new(StartedTypes::default());
    let mut comments = 0;
    while let Some(event) = reader.next_event().unwrap() {
        if event.content_type() == ContentType::Comment {
            comments += 1;
        }
        assert!(receiver.add(event).unwrap());
    }
    receiver.finish().unwrap();

    assert_eq!(receiver.ignored_comments(), comments);
    assert_eq!(receiver.ignored_literal_metadata(), 1);
    let started = receiver.into_handler().0;
    assert_eq!(started.iter().filter(|&&t| t == ContentType::OtuList).count(), 1);
    assert_eq!(started.iter().filter(|&&t| t == ContentType::Tree).count(), 2);
}

#[test]
fn test_receiver_rejects_misplaced_event() {
    let mut reader = NexusEventReader::for_str("#NEXUS\nBEGIN TAXA; TAXLABELS A B; END;");
    let mut receiver = ValidatingReceiver::new(StartedTypes::default());
    // the document start is withheld, then the list is closed twice
    let events: Vec<Event> = reader.events().skip(1).collect::<Result<_, _>>().unwrap();
    let list_end = events
        .iter()
        .position(|e| *e == Event::end(ContentType::OtuList))
        .unwrap();
    for event in &events[..=list_end] {
        receiver.add(event.clone()).unwrap();
    }
    match receiver.add(Event::end(ContentType::OtuList)) {
        Err(WriteError::IllegalEvent { event, parent }) => {
            assert_eq!(event, Event::end(ContentType::OtuList));
            assert_eq!(parent, None);
        }
        other => panic!("unexpected result {other:?}"),
    }
}
