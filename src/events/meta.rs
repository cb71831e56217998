//! Metadata events: literal values and resource links that nest under any
//! element, modelling RDF-like triples inside formats that are not RDF.

use crate::events::{Event, StartEvent, TopologyType};
use crate::parser::{ParsingError, ParsingErrorType};
use crate::reader::EventReader;
use std::fmt;

// =#========================================================================#=
// LITERAL METADATA
// =#========================================================================€=
/// How the content events of a literal metadata element are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiteralSequenceType {
    /// Exactly one (possibly continued) value
    #[default]
    Simple,
    /// Each content event is one element of an array
    SimpleArray,
    /// Content events carry a fragment of embedded XML
    Xml,
}

/// Start of a literal metadata element.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralMetadataEvent {
    pub id: String,
    pub label: Option<String>,
    /// Predicate identifying the meaning of the value
    pub predicate: String,
    pub sequence_type: LiteralSequenceType,
    /// Hint on the data type the value originally had, used by writers to
    /// choose a faithful serialization
    pub original_type: Option<String>,
}

impl LiteralMetadataEvent {
    /// Creates a simple literal for `predicate` without label or type hint.
    pub fn new(id: String, predicate: impl Into<String>) -> Self {
        Self {
            id,
            label: None,
            predicate: predicate.into(),
            sequence_type: LiteralSequenceType::Simple,
            original_type: None,
        }
    }

    /// Sets the original type hint.
    pub fn with_original_type(mut self, original_type: impl Into<String>) -> Self {
        self.original_type = Some(original_type.into());
        self
    }
}

/// Typed value of a literal content event.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl ObjectValue {
    /// Parses a value the way annotation values are typed: integer first,
    /// then floating point, otherwise text.
    ///
    /// # Example
    /// ```
    /// use phylostream::events::ObjectValue;
    ///
    /// assert_eq!(ObjectValue::parse_typed("42"), ObjectValue::Integer(42));
    /// assert_eq!(ObjectValue::parse_typed("0.5"), ObjectValue::Float(0.5));
    /// assert_eq!(ObjectValue::parse_typed("kiwi"), ObjectValue::Text("kiwi".to_string()));
    /// ```
    pub fn parse_typed(value: &str) -> Self {
        if let Ok(v) = value.parse::<i64>() {
            ObjectValue::Integer(v)
        } else if let Ok(v) = value.parse::<f64>() {
            ObjectValue::Float(v)
        } else {
            ObjectValue::Text(value.to_string())
        }
    }
}

impl fmt::Display for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectValue::Integer(v) => write!(f, "{v}"),
            ObjectValue::Float(v) => write!(f, "{v}"),
            ObjectValue::Boolean(v) => write!(f, "{v}"),
            ObjectValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Content of a literal metadata element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiteralContentEvent {
    pub string_value: Option<String>,
    pub object_value: Option<ObjectValue>,
    pub alternative_string_value: Option<String>,
    /// Raw fragment of embedded XML
    pub xml_fragment: Option<String>,
    /// The logical value continues in the next content event
    pub continued_in_next_event: bool,
}

impl LiteralContentEvent {
    /// Creates a complete content event holding `value` in both its typed and
    /// string form.
    pub fn simple(value: ObjectValue) -> Self {
        Self {
            string_value: Some(value.to_string()),
            object_value: Some(value),
            ..Self::default()
        }
    }

    /// Creates a string-only fragment, possibly continued in the next event.
    pub fn fragment(value: impl Into<String>, continued: bool) -> Self {
        Self {
            string_value: Some(value.into()),
            continued_in_next_event: continued,
            ..Self::default()
        }
    }

    /// Reassembles the string value of one logical literal from its
    /// consecutive content events.
    ///
    /// # Returns
    /// `None` if no part has a string value
    pub fn join(parts: &[LiteralContentEvent]) -> Option<String> {
        let mut joined: Option<String> = None;
        for part in parts {
            if let Some(value) = &part.string_value {
                joined.get_or_insert_with(String::new).push_str(value);
            }
        }
        joined
    }
}

// =#========================================================================#=
// RESOURCE METADATA
// =#========================================================================€=
/// Start of a resource metadata element, whose children are further
/// metadata elements describing the linked resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMetadataEvent {
    pub id: String,
    pub label: Option<String>,
    /// Relation predicate
    pub rel: String,
    /// Target reference (e.g. the ID of another element or a URI)
    pub href: Option<String>,
    /// Literal subject string
    pub about: Option<String>,
}

// =#========================================================================#=
// SKIPPING
// =#========================================================================€=
/// Consumes and discards a complete metadata subtree.
///
/// The next event of `reader` must be a literal or resource metadata start.
/// All events up to and including its matching end are consumed, so reading
/// can resume with the following sibling. Used to skip predicates a consumer
/// does not recognize.
///
/// # Returns
/// The number of discarded events, or 0 if the next event is not a metadata start
///
/// # Errors
/// Propagates reader errors and reports a premature end of input.
pub fn skip_metadata_subtree<R: EventReader + ?Sized>(reader: &mut R) -> Result<usize, ParsingError> {
    match reader.peek()? {
        Some(Event::Start(StartEvent::LiteralMetadata(_) | StartEvent::ResourceMetadata(_))) => {}
        _ => return Ok(0),
    }

    let mut depth = 0usize;
    let mut skipped = 0usize;
    while let Some(event) = reader.next_event()? {
        skipped += 1;
        match event.topology() {
            TopologyType::Start => depth += 1,
            TopologyType::End => depth -= 1,
            TopologyType::Sole => {}
        }
        if depth == 0 {
            return Ok(skipped);
        }
    }

    Err(ParsingError::without_context(ParsingErrorType::UnexpectedEof(
        "inside metadata subtree".to_string(),
    )))
}
