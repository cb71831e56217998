//! Checking event sequences against the nesting grammar.
//!
//! Every `Start` of content type T must be closed by exactly one `End` of T,
//! with strict nesting, and `Sole` events are only valid for childless
//! content types. Metadata adds placement rules: literal content only
//! directly inside a literal, literals never inside literals.

use crate::events::{ContentType, Event, TopologyType};
use thiserror::Error;

/// Violation of the event grammar.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
    #[error("{found} end event does not match the open element ({})", describe_open(.open))]
    UnmatchedEnd {
        found: ContentType,
        open: Option<ContentType>,
    },
    #[error("{content_type} events may not have topology {topology}")]
    InvalidTopology {
        content_type: ContentType,
        topology: TopologyType,
    },
    #[error("{content_type} event is not allowed inside {}", describe_open(.parent))]
    IllegalNesting {
        content_type: ContentType,
        parent: Option<ContentType>,
    },
    #[error("{0} event after the end of the document")]
    AfterDocumentEnd(ContentType),
    #[error("elements left open: {0:?}")]
    Unclosed(Vec<ContentType>),
}

fn describe_open(open: &Option<ContentType>) -> String {
    match open {
        Some(content_type) => content_type.to_string(),
        None => "top level".to_string(),
    }
}

// =#========================================================================#=
// GRAMMAR CHECKER
// =#========================================================================$=
/// Tracks open elements of an event sequence and validates each new event.
///
/// Used by the [ValidatingReceiver](crate::receiver::ValidatingReceiver) on
/// the write path and by test harnesses wrapping readers.
///
/// # Example
/// ```
/// use phylostream::events::{ContentType, Event, GrammarChecker, LabeledId, StartEvent};
///
/// let mut checker = GrammarChecker::new();
/// checker.check(&Event::Start(StartEvent::Tree(LabeledId::new("tree1", None)))).unwrap();
/// assert!(checker.check(&Event::end(ContentType::Node)).is_err());
/// checker.check(&Event::end(ContentType::Tree)).unwrap();
/// checker.finish().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct GrammarChecker {
    open: Vec<Event>,
    document_ended: bool,
}

impl GrammarChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The innermost open start event, if any.
    pub fn parent(&self) -> Option<&Event> {
        self.open.last()
    }

    /// Start events of all open elements, outermost first.
    pub fn open_elements(&self) -> &[Event] {
        &self.open
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Validates `event` against the current state and updates it.
    ///
    /// # Errors
    /// Returns a [GrammarError] describing the violation, leaving the state unchanged.
    pub fn check(&mut self, event: &Event) -> Result<(), GrammarError> {
        let content_type = event.content_type();
        let topology = event.topology();

        if self.document_ended {
            return Err(GrammarError::AfterDocumentEnd(content_type));
        }
        if !content_type.allows(topology) {
            return Err(GrammarError::InvalidTopology {
                content_type,
                topology,
            });
        }

        let parent_type = self.parent().map(Event::content_type);
        match topology {
            TopologyType::End => {
                if parent_type != Some(content_type) {
                    return Err(GrammarError::UnmatchedEnd {
                        found: content_type,
                        open: parent_type,
                    });
                }
                self.open.pop();
                if content_type == ContentType::Document {
                    self.document_ended = true;
                }
            }
            TopologyType::Start | TopologyType::Sole => {
                if !Self::may_nest(content_type, parent_type) {
                    return Err(GrammarError::IllegalNesting {
                        content_type,
                        parent: parent_type,
                    });
                }
                if topology == TopologyType::Start {
                    self.open.push(event.clone());
                }
            }
        }

        Ok(())
    }

    /// Checks that no element is left open.
    ///
    /// # Errors
    /// [GrammarError::Unclosed] listing the open content types, outermost first.
    pub fn finish(&self) -> Result<(), GrammarError> {
        if self.open.is_empty() {
            Ok(())
        } else {
            Err(GrammarError::Unclosed(
                self.open.iter().map(Event::content_type).collect(),
            ))
        }
    }

    /// Metadata placement rules.
    fn may_nest(child: ContentType, parent: Option<ContentType>) -> bool {
        match (child, parent) {
            (ContentType::LiteralMetadataContent, Some(ContentType::LiteralMetadata)) => true,
            (ContentType::LiteralMetadataContent, _) => false,
            (ContentType::Comment, _) => true,
            (_, Some(ContentType::LiteralMetadata)) => false,
            _ => true,
        }
    }
}
