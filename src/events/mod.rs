//! The event model shared by all readers and writers.
//!
//! A document is represented as an ordered sequence of [Event]s. Each event
//! has a [ContentType] and a [TopologyType]: `Start` events open a region
//! that is closed by exactly one `End` event of the same content type,
//! strictly nested, and `Sole` events stand alone. Payloads are enforced by
//! the [StartEvent] and [SoleEvent] variants, so there is no runtime
//! downcasting.
//!
//! IDs are unique within one document. Relationships between elements (a
//! sequence belonging to an OTU, an edge connecting two nodes, an alignment
//! referring to its OTU list) are expressed by linked IDs.

mod content_type;
pub mod grammar;
pub mod meta;
mod token_set;

pub use content_type::{ContentType, TopologyType};
pub use grammar::{GrammarChecker, GrammarError};
pub use meta::{
    LiteralContentEvent, LiteralMetadataEvent, LiteralSequenceType, ObjectValue,
    ResourceMetadataEvent, skip_metadata_subtree,
};
pub use token_set::{CharacterSymbolMeaning, TokenSetType};

// =#========================================================================#=
// PAYLOADS
// =#========================================================================€=
/// ID with an optional label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledId {
    pub id: String,
    pub label: Option<String>,
}

impl LabeledId {
    pub fn new(id: impl Into<String>, label: Option<String>) -> Self {
        Self {
            id: id.into(),
            label,
        }
    }
}

/// ID with an optional label and an optional reference to another element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedLabeledId {
    pub id: String,
    pub label: Option<String>,
    /// ID of the linked element, e.g. the OTU of a sequence or node
    pub linked_id: Option<String>,
}

impl LinkedLabeledId {
    pub fn new(id: impl Into<String>, label: Option<String>, linked_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            label,
            linked_id,
        }
    }
}

/// Edge between two nodes of a tree or network.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEvent {
    pub id: String,
    pub label: Option<String>,
    /// Source node, `None` for a root edge
    pub source_id: Option<String>,
    pub target_id: String,
    pub length: Option<f64>,
}

/// Start of a token set definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSetDefinitionEvent {
    pub id: String,
    pub label: Option<String>,
    pub set_type: TokenSetType,
    /// Character set (columns) this token set applies to, `None` for all columns
    pub character_set_id: Option<String>,
}

/// Start of a single token (symbol) definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleTokenDefinitionEvent {
    pub id: String,
    pub label: Option<String>,
    pub token_name: String,
    pub meaning: CharacterSymbolMeaning,
}

/// Half-open, 0-based column interval `[start, end)` of a character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterSetInterval {
    pub start: u64,
    pub end: u64,
}

impl CharacterSetInterval {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of columns in this interval.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Name of one column of an alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterDefinitionEvent {
    pub id: String,
    pub label: Option<String>,
    /// 0-based column index
    pub column: u64,
}

/// Reference from an OTU or tree/network set to one of its elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetElementEvent {
    pub linked_id: String,
    pub linked_type: ContentType,
}

/// Comment, possibly split over several events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEvent {
    pub content: String,
    pub continued_in_next_event: bool,
}

/// Command a reader did not recognize, preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommandEvent {
    pub command_name: String,
    pub content: String,
}

// =#========================================================================#=
// EVENT
// =#========================================================================$=
/// Payload of a [TopologyType::Start] event.
#[derive(Debug, Clone, PartialEq)]
pub enum StartEvent {
    Document(LabeledId),
    OtuList(LabeledId),
    Otu(LabeledId),
    Alignment(LinkedLabeledId),
    Sequence(LinkedLabeledId),
    CharacterSet(LinkedLabeledId),
    CharacterDefinition(CharacterDefinitionEvent),
    TokenSetDefinition(TokenSetDefinitionEvent),
    SingleTokenDefinition(SingleTokenDefinitionEvent),
    TreeNetworkGroup(LinkedLabeledId),
    Tree(LabeledId),
    Network(LabeledId),
    Node(LinkedLabeledId),
    Edge(EdgeEvent),
    OtuSet(LinkedLabeledId),
    TreeNetworkSet(LinkedLabeledId),
    LiteralMetadata(LiteralMetadataEvent),
    ResourceMetadata(ResourceMetadataEvent),
}

impl StartEvent {
    pub fn content_type(&self) -> ContentType {
        match self {
            StartEvent::Document(_) => ContentType::Document,
            StartEvent::OtuList(_) => ContentType::OtuList,
            StartEvent::Otu(_) => ContentType::Otu,
            StartEvent::Alignment(_) => ContentType::Alignment,
            StartEvent::Sequence(_) => ContentType::Sequence,
            StartEvent::CharacterSet(_) => ContentType::CharacterSet,
            StartEvent::CharacterDefinition(_) => ContentType::CharacterDefinition,
            StartEvent::TokenSetDefinition(_) => ContentType::TokenSetDefinition,
            StartEvent::SingleTokenDefinition(_) => ContentType::SingleTokenDefinition,
            StartEvent::TreeNetworkGroup(_) => ContentType::TreeNetworkGroup,
            StartEvent::Tree(_) => ContentType::Tree,
            StartEvent::Network(_) => ContentType::Network,
            StartEvent::Node(_) => ContentType::Node,
            StartEvent::Edge(_) => ContentType::Edge,
            StartEvent::OtuSet(_) => ContentType::OtuSet,
            StartEvent::TreeNetworkSet(_) => ContentType::TreeNetworkSet,
            StartEvent::LiteralMetadata(_) => ContentType::LiteralMetadata,
            StartEvent::ResourceMetadata(_) => ContentType::ResourceMetadata,
        }
    }

    /// ID of the started element.
    pub fn id(&self) -> &str {
        match self {
            StartEvent::Document(e) | StartEvent::OtuList(e) | StartEvent::Otu(e) => &e.id,
            StartEvent::Tree(e) | StartEvent::Network(e) => &e.id,
            StartEvent::Alignment(e)
            | StartEvent::Sequence(e)
            | StartEvent::CharacterSet(e)
            | StartEvent::TreeNetworkGroup(e)
            | StartEvent::Node(e)
            | StartEvent::OtuSet(e)
            | StartEvent::TreeNetworkSet(e) => &e.id,
            StartEvent::CharacterDefinition(e) => &e.id,
            StartEvent::TokenSetDefinition(e) => &e.id,
            StartEvent::SingleTokenDefinition(e) => &e.id,
            StartEvent::Edge(e) => &e.id,
            StartEvent::LiteralMetadata(e) => &e.id,
            StartEvent::ResourceMetadata(e) => &e.id,
        }
    }

    /// Label of the started element, if any.
    pub fn label(&self) -> Option<&str> {
        let label = match self {
            StartEvent::Document(e) | StartEvent::OtuList(e) | StartEvent::Otu(e) => &e.label,
            StartEvent::Tree(e) | StartEvent::Network(e) => &e.label,
            StartEvent::Alignment(e)
            | StartEvent::Sequence(e)
            | StartEvent::CharacterSet(e)
            | StartEvent::TreeNetworkGroup(e)
            | StartEvent::Node(e)
            | StartEvent::OtuSet(e)
            | StartEvent::TreeNetworkSet(e) => &e.label,
            StartEvent::CharacterDefinition(e) => &e.label,
            StartEvent::TokenSetDefinition(e) => &e.label,
            StartEvent::SingleTokenDefinition(e) => &e.label,
            StartEvent::Edge(e) => &e.label,
            StartEvent::LiteralMetadata(e) => &e.label,
            StartEvent::ResourceMetadata(e) => &e.label,
        };
        label.as_deref()
    }
}

/// Payload of a [TopologyType::Sole] event.
#[derive(Debug, Clone, PartialEq)]
pub enum SoleEvent {
    SequenceTokens(Vec<String>),
    SingleSequenceToken(String),
    CharacterSetInterval(CharacterSetInterval),
    SetElement(SetElementEvent),
    Comment(CommentEvent),
    LiteralMetadataContent(LiteralContentEvent),
    UnknownCommand(UnknownCommandEvent),
}

impl SoleEvent {
    pub fn content_type(&self) -> ContentType {
        match self {
            SoleEvent::SequenceTokens(_) => ContentType::SequenceTokens,
            SoleEvent::SingleSequenceToken(_) => ContentType::SingleSequenceToken,
            SoleEvent::CharacterSetInterval(_) => ContentType::CharacterSetInterval,
            SoleEvent::SetElement(_) => ContentType::SetElement,
            SoleEvent::Comment(_) => ContentType::Comment,
            SoleEvent::LiteralMetadataContent(_) => ContentType::LiteralMetadataContent,
            SoleEvent::UnknownCommand(_) => ContentType::UnknownCommand,
        }
    }
}

/// One immutable point in the logical grammar of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start(StartEvent),
    End(ContentType),
    Sole(SoleEvent),
}

impl Event {
    pub fn content_type(&self) -> ContentType {
        match self {
            Event::Start(start) => start.content_type(),
            Event::End(content_type) => *content_type,
            Event::Sole(sole) => sole.content_type(),
        }
    }

    pub fn topology(&self) -> TopologyType {
        match self {
            Event::Start(_) => TopologyType::Start,
            Event::End(_) => TopologyType::End,
            Event::Sole(_) => TopologyType::Sole,
        }
    }

    /// ID carried by this event (only start events carry IDs).
    pub fn id(&self) -> Option<&str> {
        match self {
            Event::Start(start) => Some(start.id()),
            _ => None,
        }
    }

    // ============================================================================
    // Convenience constructors
    // ============================================================================
    pub fn end(content_type: ContentType) -> Self {
        Event::End(content_type)
    }

    /// A complete (not continued) comment.
    pub fn comment(content: impl Into<String>) -> Self {
        Event::Sole(SoleEvent::Comment(CommentEvent {
            content: content.into(),
            continued_in_next_event: false,
        }))
    }

    pub fn tokens(tokens: Vec<String>) -> Self {
        Event::Sole(SoleEvent::SequenceTokens(tokens))
    }

    pub fn interval(start: u64, end: u64) -> Self {
        Event::Sole(SoleEvent::CharacterSetInterval(CharacterSetInterval::new(start, end)))
    }

    pub fn set_element(linked_id: impl Into<String>, linked_type: ContentType) -> Self {
        Event::Sole(SoleEvent::SetElement(SetElementEvent {
            linked_id: linked_id.into(),
            linked_type,
        }))
    }

    pub fn literal_content(content: LiteralContentEvent) -> Self {
        Event::Sole(SoleEvent::LiteralMetadataContent(content))
    }
}

/// Splits a comment into events of at most `max_length` characters each,
/// all but the last marked as continued.
pub(crate) fn comment_events(content: String, max_length: usize) -> Vec<Event> {
    let max_length = max_length.max(1);
    let mut parts = Vec::new();
    if content.chars().count() <= max_length {
        parts.push(content);
    } else {
        let chars: Vec<char> = content.chars().collect();
        for chunk in chars.chunks(max_length) {
            parts.push(chunk.iter().collect::<String>());
        }
    }

    let last = parts.len() - 1;
    parts
        .into_iter()
        .enumerate()
        .map(|(i, content)| {
            Event::Sole(SoleEvent::Comment(CommentEvent {
                content,
                continued_in_next_event: i < last,
            }))
        })
        .collect()
}

impl From<StartEvent> for Event {
    fn from(start: StartEvent) -> Self {
        Event::Start(start)
    }
}

impl From<SoleEvent> for Event {
    fn from(sole: SoleEvent) -> Self {
        Event::Sole(sole)
    }
}
