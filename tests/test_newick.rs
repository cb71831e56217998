use phylostream::adapters::TreeNetworkAdapter;
use phylostream::events::{Event, ObjectValue, SoleEvent, StartEvent};
use phylostream::model::{DocumentStore, StoredTree};
use phylostream::newick::{NewickEventReader, NewickWriter};
use phylostream::nexus::NexusWriter;
use phylostream::parser::ParsingErrorType;
use phylostream::reader::EventReader;
use phylostream::writer::DocumentWriter;
use phylostream::{
    MetadataTreatment, ReadWriteParameters, read_newick_file, read_newick_str, read_nexus_str,
    write_newick_file,
};
use pretty_assertions::assert_eq;
use std::path::Path;

fn node_labels(tree: &StoredTree) -> Vec<Option<String>> {
    tree.nodes
        .elements()
        .iter()
        .map(|node| node.start.label().map(String::from))
        .collect()
}

fn write_newick(store: &DocumentStore, parameters: &ReadWriteParameters) -> String {
    let mut writer = NewickWriter::new(Vec::new());
    writer.write_document(store, parameters).unwrap();
    String::from_utf8(writer.into_inner().unwrap()).unwrap()
}

// --- TESTS NEWICK STRING READING ---

#[test]
fn test_basic_tree() {
    let store = read_newick_str("((A:0.1,B:0.2):0.3,C:0.4);").unwrap();
    assert_eq!(store.otu_lists.len(), 0);
    assert_eq!(store.tree_groups.len(), 1);

    let tree = &store.tree_groups[0].trees[0];
    assert!(tree.is_tree);
    assert_eq!(
        node_labels(tree),
        vec![None, None, Some("A".to_string()), Some("B".to_string()), Some("C".to_string())]
    );

    let lengths: Vec<Option<f64>> = tree
        .edges
        .elements()
        .iter()
        .map(|edge| match &edge.start {
            StartEvent::Edge(edge) => edge.length,
            _ => None,
        })
        .collect();
    assert!(lengths.contains(&Some(0.3)));
    assert!(lengths.contains(&Some(0.4)));
}

#[test]
fn test_quoted_labels_and_scientific_notation() {
    let mut reader = NewickEventReader::for_str("('Kea (alpine)':1e-3,Kaka_North:2.5E2);", ReadWriteParameters::default());
    let mut labels = Vec::new();
    let mut lengths = Vec::new();
    while let Some(event) = reader.next_event().unwrap() {
        match event {
            Event::Start(StartEvent::Node(node)) => labels.extend(node.label),
            Event::Start(StartEvent::Edge(edge)) => lengths.extend(edge.length),
            _ => {}
        }
    }
    assert_eq!(labels, vec!["Kea (alpine)", "Kaka North"]);
    assert_eq!(lengths, vec![0.001, 250.0]);
}

#[test]
fn test_annotations_become_node_metadata() {
    let store = read_newick_str("((A[&rate=0.5,clade=\"crown group\"],B)[&posterior=1]:0.1,C);").unwrap();
    let tree = &store.tree_groups[0].trees[0];

    let mut values = Vec::new();
    for id in tree.node_ids() {
        let mut events = Vec::new();
        tree.write_node_content(&mut events, &id).unwrap();
        for event in events {
            match event {
                Event::Start(StartEvent::LiteralMetadata(literal)) => values.push((literal.predicate, None)),
                Event::Sole(SoleEvent::LiteralMetadataContent(content)) => {
                    if let Some(last) = values.last_mut() {
                        last.1 = content.object_value;
                    }
                }
                _ => {}
            }
        }
    }
    assert_eq!(
        values,
        vec![
            ("posterior".to_string(), Some(ObjectValue::Integer(1))),
            ("rate".to_string(), Some(ObjectValue::Float(0.5))),
            ("clade".to_string(), Some(ObjectValue::Text("crown group".to_string()))),
        ]
    );
}

// --- TESTS DEALING WITH CORRUPT NEWICK STRINGS ---

#[test]
fn test_missing_semicolon() {
    let result = read_newick_str("((A,B),C)");
    assert!(result.is_err());
}

#[test]
fn test_unmatched_parentheses() {
    let mut reader = NewickEventReader::for_str("((A,B),C;", ReadWriteParameters::default());
    let err = reader.events().find_map(Result::err).unwrap();
    assert!(err.kind().is_syntax_error());
    assert_eq!(err.format(), Some("Newick"));
}

#[test]
fn test_invalid_branch_length() {
    let mut reader = NewickEventReader::for_str("(A:1.0.0,B);", ReadWriteParameters::default());
    let err = reader.events().find_map(Result::err).unwrap();
    assert!(matches!(err.kind(), ParsingErrorType::InvalidNewickString(_)));
}

// --- TESTS WHOLE FILES ---

#[test]
fn test_reading_newick_file() {
    let path = Path::new("tests").join("fixtures").join("rails.nwk");
    let store = read_newick_file(path).unwrap();
    assert_eq!(store.metadata, vec![Event::comment("Rallidae, a few genera")]);

    let trees = &store.tree_groups[0].trees;
    assert_eq!(trees.len(), 3);
    assert_eq!(trees[0].nodes.len(), 7);
    assert_eq!(node_labels(&trees[0])[0].as_deref(), Some("Rallidae"));
    assert!(node_labels(&trees[0]).contains(&Some("Porphyrio hochstetteri".to_string())));
    assert_eq!(trees[1].nodes.len(), 6);
    assert_eq!(trees[2].nodes.len(), 4);
}

#[test]
fn test_writing_newick_file() {
    let source = Path::new("tests").join("fixtures").join("rails.nwk");
    let store = read_newick_file(source).unwrap();
    let parameters = ReadWriteParameters::default().with_metadata_treatment(MetadataTreatment::HotComments);

    let target = std::env::temp_dir().join(format!("phylostream_rails_{}.nwk", std::process::id()));
    let report = write_newick_file(&target, &store, &parameters).unwrap();
    let written = std::fs::read_to_string(&target).unwrap();
    std::fs::remove_file(&target).unwrap();

    assert!(report.is_lossless());
    assert_eq!(
        written,
        "[&R] ((Gallirallus_australis:1.2,Porphyrio_hochstetteri:1.5)[&support=87]:0.3,(Fulica:0.9,Porzana:1.1):0.4)Rallidae;
[&U] (Gallirallus_australis,Fulica,(Porzana,Porphyrio_hochstetteri));
[&R] (Gallirallus_australis[&rate=0.01,color=\"dark green\"]:0.2,Fulica:0.5,Porzana:0.7);
"
    );
}

#[test]
fn test_written_trees_read_back_the_same() {
    let input = "((Kea:1,Kaka:1)'Nestor spp.':0.5,(Kakapo,[deep split]Kiwi)):0.1;";
    let store = read_newick_str(input).unwrap();
    let parameters = ReadWriteParameters::default();
    let first = write_newick(&store, &parameters);
    let second = write_newick(&read_newick_str(&first).unwrap(), &parameters);
    assert_eq!(second, first);
    assert_eq!(
        node_labels(&read_newick_str(&first).unwrap().tree_groups[0].trees[0]),
        node_labels(&store.tree_groups[0].trees[0])
    );
}

// --- TESTS CONVERSION ---

#[test]
fn test_newick_trees_to_nexus() {
    let store = read_newick_str("((Kea,Kaka),Kakapo);\n[&U] (Kea,Kaka,Kakapo);").unwrap();
    let mut writer = NexusWriter::new(Vec::new());
    writer.write_document(&store, &ReadWriteParameters::default()).unwrap();
    let nexus = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    assert!(nexus.starts_with("#NEXUS\n"));

    let back = read_nexus_str(&nexus).unwrap();
    let trees = &back.tree_groups[0].trees;
    assert_eq!(trees.len(), 2);
    for (read, original) in trees.iter().zip(&store.tree_groups[0].trees) {
        assert_eq!(node_labels(read), node_labels(original));
        assert_eq!(
            read.edges.len(),
            original.edges.len(),
            "rooting of tree {:?}",
            original.start.label
        );
    }
    assert_eq!(back.tree_groups[0].start.linked_id, None);
}
