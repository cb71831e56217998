//! In-memory document model implementing all [adapter](crate::adapters)
//! contracts.
//!
//! A [DocumentStore] can be filled from any [EventReader] and handed to any
//! writer, which makes it the simplest way to convert between formats.
//! Elements without a dedicated model type (OTUs, sets, token sets, nodes,
//! edges) are kept as their start event plus the events of their content.

use crate::adapters::{
    DocumentAdapter, MatrixAdapter, ObjectListAdapter, OtuListAdapter, TreeNetworkAdapter,
    TreeNetworkGroupAdapter,
};
use crate::events::{
    ContentType, EdgeEvent, Event, GrammarChecker, GrammarError, LabeledId, LinkedLabeledId,
    SoleEvent, StartEvent, TopologyType, UnknownCommandEvent,
};
use crate::parser::ParsingError;
use crate::reader::EventReader;
use crate::receiver::EventReceiver;
use crate::writer::WriteError;
use thiserror::Error;

/// Errors while filling a [DocumentStore] from a reader.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),
    #[error("invalid event sequence")]
    Grammar(#[from] GrammarError),
    #[error("{found} event is not expected inside {}", describe(.parent))]
    UnexpectedEvent {
        found: ContentType,
        parent: Option<ContentType>,
    },
    #[error("the event stream contains no document")]
    NoDocument,
}

fn describe(parent: &Option<ContentType>) -> String {
    match parent {
        Some(content_type) => content_type.to_string(),
        None => "top level".to_string(),
    }
}

/// Sends `events` to `receiver` until it asks to stop.
fn send(receiver: &mut dyn EventReceiver, events: &[Event]) -> Result<(), WriteError> {
    for event in events {
        if !receiver.add(event.clone())? {
            break;
        }
    }
    Ok(())
}

// =#========================================================================#=
// STORED ELEMENTS
// =#========================================================================€=
/// Element kept as its start event and the events between start and end.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredElement {
    pub start: StartEvent,
    pub content: Vec<Event>,
}

/// List of [StoredElement]s of one content type.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredElementList {
    content_type: ContentType,
    elements: Vec<StoredElement>,
}

impl StoredElementList {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            elements: Vec::new(),
        }
    }

    /// Appends an element, whose start event should be of the content type of this list.
    pub fn push(&mut self, start: StartEvent, content: Vec<Event>) {
        debug_assert_eq!(start.content_type(), self.content_type);
        self.elements.push(StoredElement { start, content });
    }

    pub fn elements(&self) -> &[StoredElement] {
        &self.elements
    }

    pub fn get(&self, id: &str) -> Option<&StoredElement> {
        self.elements.iter().find(|e| e.start.id() == id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn find(&self, id: &str) -> Result<&StoredElement, WriteError> {
        self.get(id).ok_or_else(|| WriteError::unknown_id(self.content_type, id))
    }
}

impl ObjectListAdapter for StoredElementList {
    fn ids(&self) -> Vec<String> {
        self.elements.iter().map(|e| e.start.id().to_string()).collect()
    }

    fn object_start_event(&self, id: &str) -> Result<StartEvent, WriteError> {
        Ok(self.find(id)?.start.clone())
    }

    fn write_content_data(&self, receiver: &mut dyn EventReceiver, id: &str) -> Result<(), WriteError> {
        send(receiver, &self.find(id)?.content)
    }

    fn count(&self) -> usize {
        self.elements.len()
    }
}

// =#========================================================================#=
// OTU LIST
// =#========================================================================€=
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOtuList {
    pub start: LabeledId,
    /// Metadata subtrees and comments attached to the list
    pub metadata: Vec<Event>,
    pub otus: StoredElementList,
    pub otu_sets: StoredElementList,
}

impl StoredOtuList {
    pub fn new(start: LabeledId) -> Self {
        Self {
            start,
            metadata: Vec::new(),
            otus: StoredElementList::new(ContentType::Otu),
            otu_sets: StoredElementList::new(ContentType::OtuSet),
        }
    }

    /// Appends an OTU without metadata.
    pub fn add_otu(&mut self, id: impl Into<String>, label: Option<String>) {
        self.otus.push(StartEvent::Otu(LabeledId::new(id, label)), Vec::new());
    }
}

impl OtuListAdapter for StoredOtuList {
    fn start_event(&self) -> LabeledId {
        self.start.clone()
    }

    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        send(receiver, &self.metadata)
    }

    fn otus(&self) -> &dyn ObjectListAdapter {
        &self.otus
    }

    fn otu_sets(&self) -> &dyn ObjectListAdapter {
        &self.otu_sets
    }
}

// =#========================================================================#=
// MATRIX
// =#========================================================================€=
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSequence {
    pub start: LinkedLabeledId,
    pub tokens: Vec<String>,
    pub metadata: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMatrix {
    pub start: LinkedLabeledId,
    pub metadata: Vec<Event>,
    pub sequences: Vec<StoredSequence>,
    pub token_sets: StoredElementList,
    pub character_sets: StoredElementList,
    pub character_definitions: StoredElementList,
}

impl StoredMatrix {
    pub fn new(start: LinkedLabeledId) -> Self {
        Self {
            start,
            metadata: Vec::new(),
            sequences: Vec::new(),
            token_sets: StoredElementList::new(ContentType::TokenSetDefinition),
            character_sets: StoredElementList::new(ContentType::CharacterSet),
            character_definitions: StoredElementList::new(ContentType::CharacterDefinition),
        }
    }

    /// Appends a sequence without metadata.
    pub fn add_sequence(&mut self, start: LinkedLabeledId, tokens: Vec<String>) {
        self.sequences.push(StoredSequence {
            start,
            tokens,
            metadata: Vec::new(),
        });
    }

    pub fn sequence(&self, id: &str) -> Option<&StoredSequence> {
        self.sequences.iter().find(|s| s.start.id == id)
    }

    fn find(&self, id: &str) -> Result<&StoredSequence, WriteError> {
        self.sequence(id)
            .ok_or_else(|| WriteError::unknown_id(ContentType::Sequence, id))
    }
}

impl MatrixAdapter for StoredMatrix {
    fn start_event(&self) -> LinkedLabeledId {
        self.start.clone()
    }

    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        send(receiver, &self.metadata)
    }

    fn column_count(&self) -> Option<u64> {
        let mut lengths = self.sequences.iter().map(|s| s.tokens.len() as u64);
        let first = lengths.next().unwrap_or(0);
        lengths.all(|len| len == first).then_some(first)
    }

    fn contains_long_tokens(&self) -> bool {
        self.sequences
            .iter()
            .flat_map(|s| s.tokens.iter())
            .any(|t| t.chars().count() > 1)
    }

    fn token_sets(&self) -> &dyn ObjectListAdapter {
        &self.token_sets
    }

    fn character_sets(&self) -> &dyn ObjectListAdapter {
        &self.character_sets
    }

    fn character_definitions(&self) -> &dyn ObjectListAdapter {
        &self.character_definitions
    }

    fn sequence_ids(&self) -> Vec<String> {
        self.sequences.iter().map(|s| s.start.id.clone()).collect()
    }

    fn sequence_start_event(&self, id: &str) -> Result<LinkedLabeledId, WriteError> {
        Ok(self.find(id)?.start.clone())
    }

    fn sequence_length(&self, id: &str) -> Result<u64, WriteError> {
        Ok(self.find(id)?.tokens.len() as u64)
    }

    fn write_sequence_part(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
        start: u64,
        end: u64,
    ) -> Result<(), WriteError> {
        let tokens = &self.find(id)?.tokens;
        let end = (end as usize).min(tokens.len());
        let start = (start as usize).min(end);
        if start < end {
            receiver.add(Event::tokens(tokens[start..end].to_vec()))?;
        }
        Ok(())
    }

    fn write_sequence_metadata(&self, receiver: &mut dyn EventReceiver, id: &str) -> Result<(), WriteError> {
        send(receiver, &self.find(id)?.metadata)
    }
}

// =#========================================================================#=
// TREES AND NETWORKS
// =#========================================================================€=
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTree {
    pub is_tree: bool,
    pub start: LabeledId,
    pub metadata: Vec<Event>,
    pub nodes: StoredElementList,
    pub edges: StoredElementList,
}

impl StoredTree {
    /// Creates an empty tree (`is_tree`) or network.
    pub fn new(is_tree: bool, start: LabeledId) -> Self {
        Self {
            is_tree,
            start,
            metadata: Vec::new(),
            nodes: StoredElementList::new(ContentType::Node),
            edges: StoredElementList::new(ContentType::Edge),
        }
    }
}

impl TreeNetworkAdapter for StoredTree {
    fn is_tree(&self) -> bool {
        self.is_tree
    }

    fn start_event(&self) -> LabeledId {
        self.start.clone()
    }

    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        send(receiver, &self.metadata)
    }

    fn node_ids(&self) -> Vec<String> {
        self.nodes.ids()
    }

    fn node_start_event(&self, id: &str) -> Result<LinkedLabeledId, WriteError> {
        match &self.nodes.find(id)?.start {
            StartEvent::Node(node) => Ok(node.clone()),
            _ => Err(WriteError::unknown_id(ContentType::Node, id)),
        }
    }

    fn write_node_content(&self, receiver: &mut dyn EventReceiver, id: &str) -> Result<(), WriteError> {
        self.nodes.write_content_data(receiver, id)
    }

    fn edge_ids(&self) -> Vec<String> {
        self.edges.ids()
    }

    fn edge_start_event(&self, id: &str) -> Result<EdgeEvent, WriteError> {
        match &self.edges.find(id)?.start {
            StartEvent::Edge(edge) => Ok(edge.clone()),
            _ => Err(WriteError::unknown_id(ContentType::Edge, id)),
        }
    }

    fn write_edge_content(&self, receiver: &mut dyn EventReceiver, id: &str) -> Result<(), WriteError> {
        self.edges.write_content_data(receiver, id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredTreeGroup {
    pub start: LinkedLabeledId,
    pub metadata: Vec<Event>,
    pub trees: Vec<StoredTree>,
    pub tree_sets: StoredElementList,
}

impl StoredTreeGroup {
    pub fn new(start: LinkedLabeledId) -> Self {
        Self {
            start,
            metadata: Vec::new(),
            trees: Vec::new(),
            tree_sets: StoredElementList::new(ContentType::TreeNetworkSet),
        }
    }
}

impl TreeNetworkGroupAdapter for StoredTreeGroup {
    fn start_event(&self) -> LinkedLabeledId {
        self.start.clone()
    }

    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        send(receiver, &self.metadata)
    }

    fn trees_and_networks(&self) -> Vec<&dyn TreeNetworkAdapter> {
        self.trees.iter().map(|t| t as &dyn TreeNetworkAdapter).collect()
    }

    fn tree_network_sets(&self) -> &dyn ObjectListAdapter {
        &self.tree_sets
    }
}

// =#========================================================================#=
// DOCUMENT STORE
// =#========================================================================$=
/// Complete document held in memory.
///
/// # Example
/// ```
/// use phylostream::model::DocumentStore;
/// use phylostream::nexus::NexusEventReader;
///
/// let mut reader = NexusEventReader::for_str(
///     "#NEXUS\nBEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS Kea Kaka; END;",
/// );
/// let store = DocumentStore::read_from(&mut reader).unwrap();
///
/// assert_eq!(store.otu_lists.len(), 1);
/// assert_eq!(store.otu_lists[0].otus.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStore {
    pub start: LabeledId,
    pub metadata: Vec<Event>,
    pub otu_lists: Vec<StoredOtuList>,
    pub matrices: Vec<StoredMatrix>,
    pub tree_groups: Vec<StoredTreeGroup>,
    /// Commands the reader did not recognize; writers do not repeat them
    pub unknown_commands: Vec<UnknownCommandEvent>,
}

impl DocumentStore {
    pub fn new(start: LabeledId) -> Self {
        Self {
            start,
            metadata: Vec::new(),
            otu_lists: Vec::new(),
            matrices: Vec::new(),
            tree_groups: Vec::new(),
            unknown_commands: Vec::new(),
        }
    }

    /// Reads all remaining events of `reader` into a new store.
    ///
    /// Sets defined outside of their target element (e.g. in a Nexus `SETS`
    /// block) are attached to the element they link to.
    ///
    /// # Errors
    /// Errors of the reader, violations of the event grammar and events at
    /// positions the store has no place for.
    pub fn read_from<R: EventReader + ?Sized>(reader: &mut R) -> Result<Self, StoreError> {
        let mut checker = GrammarChecker::new();
        let mut builder = StoreBuilder::default();
        while let Some(event) = reader.next_event()? {
            checker.check(&event)?;
            builder.add(event)?;
        }
        checker.finish()?;
        builder.store.ok_or(StoreError::NoDocument)
    }

    /// The OTU list with ID `id`.
    pub fn otu_list(&self, id: &str) -> Option<&StoredOtuList> {
        self.otu_lists.iter().find(|l| l.start.id == id)
    }
}

impl DocumentAdapter for DocumentStore {
    fn start_event(&self) -> LabeledId {
        self.start.clone()
    }

    fn write_metadata(&self, receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        send(receiver, &self.metadata)
    }

    fn otu_lists(&self) -> Vec<&dyn OtuListAdapter> {
        self.otu_lists.iter().map(|l| l as &dyn OtuListAdapter).collect()
    }

    fn matrices(&self) -> Vec<&dyn MatrixAdapter> {
        self.matrices.iter().map(|m| m as &dyn MatrixAdapter).collect()
    }

    fn tree_network_groups(&self) -> Vec<&dyn TreeNetworkGroupAdapter> {
        self.tree_groups.iter().map(|g| g as &dyn TreeNetworkGroupAdapter).collect()
    }
}

// =#========================================================================#=
// STORE BUILDER
// =#========================================================================€=
/// Open container element receiving metadata and children.
#[derive(Debug, Clone, Copy)]
enum Owner {
    Document,
    OtuList(usize),
    Matrix(usize),
    Sequence(usize, usize),
    Group(usize),
    Tree(usize, usize),
}

impl Owner {
    fn content_type(self) -> ContentType {
        match self {
            Owner::Document => ContentType::Document,
            Owner::OtuList(_) => ContentType::OtuList,
            Owner::Matrix(_) => ContentType::Alignment,
            Owner::Sequence(..) => ContentType::Sequence,
            Owner::Group(_) => ContentType::TreeNetworkGroup,
            Owner::Tree(..) => ContentType::Tree,
        }
    }
}

/// Where the events of a captured subtree go.
#[derive(Debug, Clone, Copy)]
enum Target {
    Metadata(Owner),
    Otus(usize),
    OtuSets(usize),
    TokenSets(usize),
    CharacterSets(usize),
    CharacterDefinitions(usize),
    TreeSets(usize),
    Nodes(usize, usize),
    Edges(usize, usize),
    Discard,
}

/// Subtree collected until its start is matched.
struct Capture {
    target: Target,
    events: Vec<Event>,
    depth: usize,
}

#[derive(Default)]
struct StoreBuilder {
    store: Option<DocumentStore>,
    owners: Vec<Owner>,
    capture: Option<Capture>,
}

impl StoreBuilder {
    fn add(&mut self, event: Event) -> Result<(), StoreError> {
        if let Some(capture) = self.capture.as_mut() {
            match event.topology() {
                TopologyType::Start => capture.depth += 1,
                TopologyType::End => capture.depth -= 1,
                TopologyType::Sole => {}
            }
            capture.events.push(event);
            if capture.depth == 0
                && let Some(capture) = self.capture.take()
            {
                self.finish_capture(capture);
            }
            return Ok(());
        }

        let owner = self.owners.last().copied();
        match event {
            Event::Start(start) => self.start(start, owner),
            Event::End(_) => {
                self.owners.pop();
                Ok(())
            }
            Event::Sole(sole) => self.sole(sole, owner),
        }
    }

    fn start(&mut self, start: StartEvent, owner: Option<Owner>) -> Result<(), StoreError> {
        let unexpected = StoreError::UnexpectedEvent {
            found: start.content_type(),
            parent: owner.map(Owner::content_type),
        };
        if let StartEvent::Document(id) = start {
            if owner.is_some() {
                return Err(unexpected);
            }
            self.store = Some(DocumentStore::new(id));
            self.owners.push(Owner::Document);
            return Ok(());
        }
        let (Some(owner), Some(store)) = (owner, self.store.as_mut()) else {
            return Err(unexpected);
        };

        let target = match (&start, owner) {
            (StartEvent::OtuList(id), Owner::Document) => {
                store.otu_lists.push(StoredOtuList::new(id.clone()));
                self.owners.push(Owner::OtuList(store.otu_lists.len() - 1));
                return Ok(());
            }
            (StartEvent::Alignment(id), Owner::Document) => {
                store.matrices.push(StoredMatrix::new(id.clone()));
                self.owners.push(Owner::Matrix(store.matrices.len() - 1));
                return Ok(());
            }
            (StartEvent::Sequence(id), Owner::Matrix(m)) => {
                // segments of interleaved matrices repeat the sequence ID
                let matrix = &mut store.matrices[m];
                let s = match matrix.sequences.iter().position(|s| s.start.id == id.id) {
                    Some(s) => s,
                    None => {
                        matrix.add_sequence(id.clone(), Vec::new());
                        matrix.sequences.len() - 1
                    }
                };
                self.owners.push(Owner::Sequence(m, s));
                return Ok(());
            }
            (StartEvent::TreeNetworkGroup(id), Owner::Document) => {
                store.tree_groups.push(StoredTreeGroup::new(id.clone()));
                self.owners.push(Owner::Group(store.tree_groups.len() - 1));
                return Ok(());
            }
            (StartEvent::Tree(id) | StartEvent::Network(id), Owner::Group(g)) => {
                let is_tree = matches!(start, StartEvent::Tree(_));
                let trees = &mut store.tree_groups[g].trees;
                trees.push(StoredTree::new(is_tree, id.clone()));
                self.owners.push(Owner::Tree(g, trees.len() - 1));
                return Ok(());
            }
            (StartEvent::LiteralMetadata(_) | StartEvent::ResourceMetadata(_), owner) => Target::Metadata(owner),
            (StartEvent::Otu(_), Owner::OtuList(l)) => Target::Otus(l),
            (StartEvent::OtuSet(_), Owner::OtuList(l)) => Target::OtuSets(l),
            (StartEvent::OtuSet(set), Owner::Document) => {
                let ids = store.otu_lists.iter().map(|l| l.start.id.as_str());
                resolve(set.linked_id.as_deref(), ids).map_or(Target::Discard, Target::OtuSets)
            }
            (StartEvent::TokenSetDefinition(_), Owner::Matrix(m)) => Target::TokenSets(m),
            (StartEvent::CharacterSet(_), Owner::Matrix(m)) => Target::CharacterSets(m),
            (StartEvent::CharacterDefinition(_), Owner::Matrix(m)) => Target::CharacterDefinitions(m),
            (StartEvent::CharacterSet(set), Owner::Document) => {
                let ids = store.matrices.iter().map(|m| m.start.id.as_str());
                resolve(set.linked_id.as_deref(), ids).map_or(Target::Discard, Target::CharacterSets)
            }
            (StartEvent::TreeNetworkSet(_), Owner::Group(g)) => Target::TreeSets(g),
            (StartEvent::TreeNetworkSet(set), Owner::Document) => {
                let ids = store.tree_groups.iter().map(|g| g.start.id.as_str());
                resolve(set.linked_id.as_deref(), ids).map_or(Target::Discard, Target::TreeSets)
            }
            (StartEvent::Node(_), Owner::Tree(g, t)) => Target::Nodes(g, t),
            (StartEvent::Edge(_), Owner::Tree(g, t)) => Target::Edges(g, t),
            _ => return Err(unexpected),
        };

        if matches!(target, Target::Discard) {
            log::debug!("No element for {} '{}', dropping it", start.content_type(), start.id());
        }
        self.capture = Some(Capture {
            target,
            events: vec![Event::Start(start)],
            depth: 1,
        });
        Ok(())
    }

    fn sole(&mut self, sole: SoleEvent, owner: Option<Owner>) -> Result<(), StoreError> {
        let unexpected = StoreError::UnexpectedEvent {
            found: sole.content_type(),
            parent: owner.map(Owner::content_type),
        };
        let (Some(owner), Some(store)) = (owner, self.store.as_mut()) else {
            return Err(unexpected);
        };
        match (sole, owner) {
            (SoleEvent::SequenceTokens(tokens), Owner::Sequence(m, s)) => {
                store.matrices[m].sequences[s].tokens.extend(tokens);
            }
            (SoleEvent::SingleSequenceToken(token), Owner::Sequence(m, s)) => {
                store.matrices[m].sequences[s].tokens.push(token);
            }
            (SoleEvent::UnknownCommand(command), _) => store.unknown_commands.push(command),
            (comment @ SoleEvent::Comment(_), owner) => metadata_of(store, owner).push(comment.into()),
            _ => return Err(unexpected),
        }
        Ok(())
    }

    fn finish_capture(&mut self, capture: Capture) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let mut events = capture.events.into_iter();
        let list = match capture.target {
            Target::Discard => return,
            Target::Metadata(owner) => {
                metadata_of(store, owner).extend(events);
                return;
            }
            Target::Otus(l) => &mut store.otu_lists[l].otus,
            Target::OtuSets(l) => &mut store.otu_lists[l].otu_sets,
            Target::TokenSets(m) => &mut store.matrices[m].token_sets,
            Target::CharacterSets(m) => &mut store.matrices[m].character_sets,
            Target::CharacterDefinitions(m) => &mut store.matrices[m].character_definitions,
            Target::TreeSets(g) => &mut store.tree_groups[g].tree_sets,
            Target::Nodes(g, t) => &mut store.tree_groups[g].trees[t].nodes,
            Target::Edges(g, t) => &mut store.tree_groups[g].trees[t].edges,
        };
        if let Some(Event::Start(start)) = events.next() {
            let mut content: Vec<Event> = events.collect();
            content.pop(); // end event
            list.push(start, content);
        }
    }
}

/// Index of the element with ID `linked`, or the last element if there is no link.
fn resolve<'a>(linked: Option<&str>, mut ids: impl ExactSizeIterator<Item = &'a str>) -> Option<usize> {
    match linked {
        Some(linked) => ids.position(|id| id == linked),
        None => ids.len().checked_sub(1),
    }
}

fn metadata_of(store: &mut DocumentStore, owner: Owner) -> &mut Vec<Event> {
    match owner {
        Owner::Document => &mut store.metadata,
        Owner::OtuList(l) => &mut store.otu_lists[l].metadata,
        Owner::Matrix(m) => &mut store.matrices[m].metadata,
        Owner::Sequence(m, s) => &mut store.matrices[m].sequences[s].metadata,
        Owner::Group(g) => &mut store.tree_groups[g].metadata,
        Owner::Tree(g, t) => &mut store.tree_groups[g].trees[t].metadata,
    }
}

// =#========================================================================#=
// TESTS - DOCUMENT STORE
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CharacterSetInterval;
    use crate::nexus::NexusEventReader;
    use pretty_assertions::assert_eq;

    const DOCUMENT: &str = "#NEXUS
[written by hand]
BEGIN TAXA;
    DIMENSIONS NTAX=3;
    TAXLABELS Kea Kaka Kakapo;
END;
BEGIN CHARACTERS;
    DIMENSIONS NCHAR=6;
    FORMAT DATATYPE=DNA GAP=-;
    CHARSTATELABELS 1 site_one, 6 last_site;
    MATRIX
        Kea    ACGT-A
        Kaka   ACGTTA
        Kakapo AC[uncertain]GCTA
    ;
END;
BEGIN SETS;
    CHARSET first = 1-3;
    CHARSET ends = site_one last_site;
    TAXSET parrots = Kea Kaka;
END;
BEGIN TREES;
    TREE nestor = ((Kea:1,Kaka:1)[&support=0.9]:1,Kakapo:2);
END;
BEGIN PAUP;
    hsearch;
END;
";

    fn store() -> DocumentStore {
        DocumentStore::read_from(&mut NexusEventReader::for_str(DOCUMENT)).unwrap()
    }

    #[test]
    fn test_elements_are_sorted_into_their_containers() {
        let store = store();
        assert_eq!(store.metadata, vec![Event::comment("written by hand")]);

        let otus = &store.otu_lists[0];
        assert_eq!(otus.otus.len(), 3);
        assert_eq!(otus.otu_sets.len(), 1);

        let matrix = &store.matrices[0];
        assert_eq!(matrix.start.linked_id.as_deref(), Some(otus.start.id.as_str()));
        assert_eq!(matrix.column_count(), Some(6));
        assert_eq!(matrix.sequences[2].tokens.concat(), "ACGCTA");
        assert_eq!(matrix.sequences[2].metadata, vec![Event::comment("uncertain")]);
        assert_eq!(matrix.token_sets.len(), 1);
        assert_eq!(
            matrix.character_sets.elements()[0].content,
            vec![Event::Sole(SoleEvent::CharacterSetInterval(CharacterSetInterval::new(0, 3)))]
        );
        assert_eq!(
            matrix.character_sets.elements()[1].content,
            vec![
                Event::Sole(SoleEvent::CharacterSetInterval(CharacterSetInterval::new(0, 1))),
                Event::Sole(SoleEvent::CharacterSetInterval(CharacterSetInterval::new(5, 6))),
            ]
        );
        let columns: Vec<(Option<&str>, u64)> = matrix
            .character_definitions
            .elements()
            .iter()
            .filter_map(|element| match &element.start {
                StartEvent::CharacterDefinition(d) => Some((d.label.as_deref(), d.column)),
                _ => None,
            })
            .collect();
        assert_eq!(columns, vec![(Some("site one"), 0), (Some("last site"), 5)]);

        let tree = &store.tree_groups[0].trees[0];
        assert_eq!(tree.start.label.as_deref(), Some("nestor"));
        assert_eq!(tree.node_ids().len(), 5);
        assert_eq!(tree.root_edge_ids().unwrap().len(), 1);

        assert_eq!(store.unknown_commands.len(), 1);
        assert_eq!(store.unknown_commands[0].command_name, "hsearch");
    }

    #[test]
    fn test_sequence_windows() {
        let store = store();
        let matrix = &store.matrices[0];
        let id = matrix.sequence_ids()[0].clone();
        let mut events = Vec::new();
        matrix.write_sequence_part(&mut events, &id, 4, 10).unwrap();
        matrix.write_sequence_part(&mut events, &id, 0, 2).unwrap();
        matrix.write_sequence_part(&mut events, &id, 7, 9).unwrap();
        assert_eq!(
            events,
            vec![
                Event::tokens(vec!["-".to_string(), "A".to_string()]),
                Event::tokens(vec!["A".to_string(), "C".to_string()]),
            ]
        );
        assert!(matches!(
            matrix.write_sequence_part(&mut events, "seq99", 0, 1),
            Err(WriteError::UnknownId { content_type: ContentType::Sequence, .. })
        ));
    }

    #[test]
    fn test_node_metadata_is_kept_with_node() {
        let store = store();
        let tree = &store.tree_groups[0].trees[0];
        let with_metadata: Vec<Vec<Event>> = tree
            .node_ids()
            .iter()
            .map(|id| {
                let mut events = Vec::new();
                tree.write_node_content(&mut events, id).unwrap();
                events
            })
            .filter(|events| !events.is_empty())
            .collect();
        assert_eq!(with_metadata.len(), 1);
        assert_eq!(with_metadata[0].len(), 3);
    }

    #[test]
    fn test_stream_without_document_fails() {
        struct VecReader(Vec<Event>);
        impl EventReader for VecReader {
            fn has_next_event(&mut self) -> Result<bool, ParsingError> {
                Ok(!self.0.is_empty())
            }
            fn peek(&mut self) -> Result<Option<&Event>, ParsingError> {
                Ok(self.0.first())
            }
            fn next_event(&mut self) -> Result<Option<Event>, ParsingError> {
                Ok((!self.0.is_empty()).then(|| self.0.remove(0)))
            }
            fn close(&mut self) {
                self.0.clear();
            }
        }
        let result = DocumentStore::read_from(&mut VecReader(vec![Event::comment("lonely")]));
        assert_eq!(
            result,
            Err(StoreError::UnexpectedEvent {
                found: ContentType::Comment,
                parent: None
            })
        );
    }
}
