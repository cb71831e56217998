//! Push-side consumers of events on the write path.
//!
//! Adapters send the events of their elements to an [EventReceiver]. Writers
//! use a [ValidatingReceiver], which checks the event grammar, sorts out
//! comments and metadata generically and hands everything else to a
//! format-specific [ReceiverHandler].

use crate::events::{
    CommentEvent, ContentType, Event, GrammarChecker, GrammarError, SoleEvent, StartEvent, TopologyType,
};
use crate::writer::{WriteError, WriteReport};

// =#========================================================================#=
// EVENT RECEIVER (Trait)
// =#========================================================================T=
/// Consumer of events pushed by adapters.
pub trait EventReceiver {
    /// Processes the next event.
    ///
    /// # Returns
    /// Whether the adapter should continue sending events
    ///
    /// # Errors
    /// [WriteError::IllegalEvent] if the event may not occur at its position,
    /// or any error of the consumer
    fn add(&mut self, event: Event) -> Result<bool, WriteError>;
}

/// Collects all events, e.g. for tests or buffering.
impl EventReceiver for Vec<Event> {
    fn add(&mut self, event: Event) -> Result<bool, WriteError> {
        self.push(event);
        Ok(true)
    }
}

// =#========================================================================#=
// RECEIVER HANDLER (Trait)
// =#========================================================================T=
/// Format-specific part of a [ValidatingReceiver].
///
/// `parent` is always the start event of the element enclosing the event,
/// `None` at top level. Comment and metadata hooks return whether they used
/// the event; unused ones are counted as ignored. The default hooks ignore
/// everything except [handle_other](Self::handle_other), which rejects.
pub trait ReceiverHandler {
    fn handle_comment(&mut self, _comment: &CommentEvent, _parent: Option<&Event>) -> Result<bool, WriteError> {
        Ok(false)
    }

    /// Called with the start of a literal metadata element, and if that was
    /// used, with its content events and its end.
    fn handle_literal_metadata(&mut self, _event: &Event, _parent: Option<&Event>) -> Result<bool, WriteError> {
        Ok(false)
    }

    /// Called with the start and end of a resource metadata element whose
    /// start was used. Nested metadata goes to the respective hooks.
    fn handle_resource_metadata(&mut self, _event: &Event, _parent: Option<&Event>) -> Result<bool, WriteError> {
        Ok(false)
    }

    /// Called for all other events.
    ///
    /// # Returns
    /// Whether the adapter should continue sending events
    fn handle_other(&mut self, event: Event, parent: Option<&Event>) -> Result<bool, WriteError> {
        Err(WriteError::IllegalEvent {
            event,
            parent: parent.cloned(),
        })
    }
}

// =#========================================================================#=
// VALIDATING RECEIVER
// =#========================================================================$=
/// [EventReceiver] checking the event grammar before delegating to a
/// [ReceiverHandler].
///
/// # Example
/// ```
/// use phylostream::events::{ContentType, Event, LabeledId, StartEvent};
/// use phylostream::receiver::{EventReceiver, ReceiverHandler, ValidatingReceiver};
/// use phylostream::writer::WriteError;
///
/// struct TreeNames(Vec<String>);
///
/// impl ReceiverHandler for TreeNames {
///     fn handle_other(&mut self, event: Event, _parent: Option<&Event>) -> Result<bool, WriteError> {
///         if let Event::Start(StartEvent::Tree(tree)) = event {
///             self.0.extend(tree.label);
///         }
///         Ok(true)
///     }
/// }
///
/// let mut receiver = ValidatingReceiver::new(TreeNames(Vec::new()));
/// receiver.add(StartEvent::Tree(LabeledId::new("tree1", Some("t1".to_string()))).into())?;
/// receiver.add(Event::comment("not used"))?;
/// assert!(receiver.add(Event::end(ContentType::Node)).is_err());
/// receiver.add(Event::end(ContentType::Tree))?;
///
/// assert_eq!(receiver.ignored_comments(), 1);
/// assert_eq!(receiver.into_handler().0, vec!["t1"]);
/// # Ok::<(), WriteError>(())
/// ```
#[derive(Debug)]
pub struct ValidatingReceiver<H: ReceiverHandler> {
    handler: H,
    checker: GrammarChecker,
    /// Depth of the start of a metadata subtree whose events are dropped
    ignored_subtree: Option<usize>,
    ignored_comments: usize,
    ignored_literal_metadata: usize,
    ignored_resource_metadata: usize,
}

impl<H: ReceiverHandler> ValidatingReceiver<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            checker: GrammarChecker::new(),
            ignored_subtree: None,
            ignored_comments: 0,
            ignored_literal_metadata: 0,
            ignored_resource_metadata: 0,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Number of comments not used by the handler. A comment split over
    /// several events counts once.
    pub fn ignored_comments(&self) -> usize {
        self.ignored_comments
    }

    /// Number of literal metadata elements not used by the handler.
    pub fn ignored_literal_metadata(&self) -> usize {
        self.ignored_literal_metadata
    }

    /// Number of resource metadata elements (with their children) not used by the handler.
    pub fn ignored_resource_metadata(&self) -> usize {
        self.ignored_resource_metadata
    }

    /// Counters as [WriteReport].
    pub fn report(&self) -> WriteReport {
        WriteReport {
            ignored_comments: self.ignored_comments,
            ignored_literal_metadata: self.ignored_literal_metadata,
            ignored_resource_metadata: self.ignored_resource_metadata,
            skipped: Vec::new(),
        }
    }

    /// Checks that all started elements were ended.
    ///
    /// # Errors
    /// [WriteError::Grammar] listing the open elements
    pub fn finish(&self) -> Result<(), WriteError> {
        Ok(self.checker.finish()?)
    }
}

impl<H: ReceiverHandler> EventReceiver for ValidatingReceiver<H> {
    fn add(&mut self, event: Event) -> Result<bool, WriteError> {
        if let Err(e) = self.checker.check(&event) {
            let parent = self.checker.parent().cloned();
            return Err(match e {
                GrammarError::UnmatchedEnd { .. } | GrammarError::IllegalNesting { .. } => {
                    WriteError::IllegalEvent { event, parent }
                }
                e => WriteError::Grammar(e),
            });
        }

        let topology = event.topology();
        if let Some(depth) = self.ignored_subtree {
            if topology == TopologyType::End && self.checker.depth() < depth {
                self.ignored_subtree = None;
            }
            return Ok(true);
        }

        let open = self.checker.open_elements();
        let parent = match topology {
            TopologyType::Start => open.len().checked_sub(2).map(|i| &open[i]),
            TopologyType::End | TopologyType::Sole => open.last(),
        };

        match (event.content_type(), topology) {
            (ContentType::Comment, _) => {
                if let Event::Sole(SoleEvent::Comment(comment)) = &event
                    && !self.handler.handle_comment(comment, parent)?
                    && !comment.continued_in_next_event
                {
                    self.ignored_comments += 1;
                }
                Ok(true)
            }
            (ContentType::LiteralMetadata, TopologyType::Start) => {
                if !self.handler.handle_literal_metadata(&event, parent)? {
                    self.ignored_literal_metadata += 1;
                    self.ignored_subtree = Some(self.checker.depth());
                }
                Ok(true)
            }
            (ContentType::ResourceMetadata, TopologyType::Start) => {
                if !self.handler.handle_resource_metadata(&event, parent)? {
                    self.ignored_resource_metadata += 1;
                    self.ignored_subtree = Some(self.checker.depth());
                }
                Ok(true)
            }
            (ContentType::LiteralMetadata | ContentType::LiteralMetadataContent, _) => {
                self.handler.handle_literal_metadata(&event, parent)?;
                Ok(true)
            }
            (ContentType::ResourceMetadata, _) => {
                self.handler.handle_resource_metadata(&event, parent)?;
                Ok(true)
            }
            _ => self.handler.handle_other(event, parent),
        }
    }
}

/// Sends `start`, the events written by `content` and the matching end
/// through a [ValidatingReceiver] around `handler`.
///
/// Writers use this to look at one element of an adapter at a time, e.g. a
/// node or a character set. The handler sees `start` and its end with
/// parent `None`.
///
/// # Returns
/// The handler and the counts of what it ignored
///
/// # Errors
/// Errors of `content` or the handler, and grammar violations
pub fn receive_element<H, F>(handler: H, start: StartEvent, content: F) -> Result<(H, WriteReport), WriteError>
where
    H: ReceiverHandler,
    F: FnOnce(&mut dyn EventReceiver) -> Result<(), WriteError>,
{
    let content_type = start.content_type();
    let mut receiver = ValidatingReceiver::new(handler);
    receiver.add(start.into())?;
    content(&mut receiver)?;
    receiver.add(Event::end(content_type))?;
    receiver.finish()?;
    let report = receiver.report();
    Ok((receiver.into_handler(), report))
}

// =#========================================================================#=
// TESTS - VALIDATING RECEIVER
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        LabeledId, LinkedLabeledId, LiteralContentEvent, LiteralMetadataEvent, ObjectValue,
        ResourceMetadataEvent, StartEvent,
    };
    use pretty_assertions::assert_eq;

    /// Accepts nodes and records what it was given.
    #[derive(Default)]
    struct Recording {
        other: Vec<(ContentType, Option<String>)>,
        literals: Vec<Event>,
        accept_literals: bool,
    }

    impl ReceiverHandler for Recording {
        fn handle_literal_metadata(&mut self, event: &Event, _parent: Option<&Event>) -> Result<bool, WriteError> {
            if self.accept_literals {
                self.literals.push(event.clone());
            }
            Ok(self.accept_literals)
        }

        fn handle_other(&mut self, event: Event, parent: Option<&Event>) -> Result<bool, WriteError> {
            match event.content_type() {
                ContentType::Node => {
                    self.other
                        .push((event.content_type(), parent.and_then(Event::id).map(str::to_string)));
                    Ok(true)
                }
                _ => Err(WriteError::IllegalEvent {
                    event,
                    parent: parent.cloned(),
                }),
            }
        }
    }

    fn node(id: &str) -> Event {
        StartEvent::Node(LinkedLabeledId::new(id, None, None)).into()
    }

    fn literal(id: &str) -> Event {
        StartEvent::LiteralMetadata(LiteralMetadataEvent::new(id.to_string(), "rate")).into()
    }

    fn resource(id: &str) -> Event {
        StartEvent::ResourceMetadata(ResourceMetadataEvent {
            id: id.to_string(),
            label: None,
            rel: "dc:source".to_string(),
            href: None,
            about: None,
        })
        .into()
    }

    fn value() -> Event {
        Event::literal_content(LiteralContentEvent::simple(ObjectValue::Float(0.5)))
    }

    #[test]
    fn test_parent_of_start_and_end() {
        let mut receiver = ValidatingReceiver::new(Recording::default());
        receiver.add(node("n1")).unwrap();
        receiver.add(Event::end(ContentType::Node)).unwrap();
        receiver.finish().unwrap();
        assert_eq!(
            receiver.handler().other,
            vec![(ContentType::Node, None), (ContentType::Node, None)]
        );
    }

    #[test]
    fn test_unmatched_end_is_illegal_event() {
        let mut receiver = ValidatingReceiver::new(Recording::default());
        receiver.add(node("n1")).unwrap();
        match receiver.add(Event::end(ContentType::Edge)) {
            Err(WriteError::IllegalEvent { event, parent }) => {
                assert_eq!(event, Event::end(ContentType::Edge));
                assert_eq!(parent, Some(node("n1")));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_literal_placement_is_checked() {
        let mut receiver = ValidatingReceiver::new(Recording::default());
        assert!(matches!(
            receiver.add(value()),
            Err(WriteError::IllegalEvent { parent: None, .. })
        ));

        receiver.add(literal("meta1")).unwrap();
        assert!(matches!(
            receiver.add(literal("meta2")),
            Err(WriteError::IllegalEvent { parent: Some(_), .. })
        ));
    }

    #[test]
    fn test_ignored_metadata_is_counted_once_per_subtree() {
        let mut receiver = ValidatingReceiver::new(Recording::default());
        receiver.add(node("n1")).unwrap();
        receiver.add(literal("meta1")).unwrap();
        receiver.add(value()).unwrap();
        receiver.add(Event::end(ContentType::LiteralMetadata)).unwrap();
        receiver.add(resource("meta2")).unwrap();
        receiver.add(literal("meta3")).unwrap();
        receiver.add(value()).unwrap();
        receiver.add(Event::end(ContentType::LiteralMetadata)).unwrap();
        receiver.add(Event::end(ContentType::ResourceMetadata)).unwrap();
        receiver.add(Event::comment("first ")).unwrap();
        receiver
            .add(Event::Sole(SoleEvent::Comment(CommentEvent {
                content: "split".to_string(),
                continued_in_next_event: true,
            })))
            .unwrap();
        receiver.add(Event::comment(" comment")).unwrap();
        receiver.add(Event::end(ContentType::Node)).unwrap();
        receiver.finish().unwrap();

        assert_eq!(receiver.ignored_literal_metadata(), 1);
        assert_eq!(receiver.ignored_resource_metadata(), 1);
        assert_eq!(receiver.ignored_comments(), 2);
        assert_eq!(receiver.handler().other.len(), 2);
        assert!(!receiver.report().is_lossless());
    }

    #[test]
    fn test_used_literal_receives_content_and_end() {
        let mut receiver = ValidatingReceiver::new(Recording {
            accept_literals: true,
            ..Recording::default()
        });
        receiver.add(node("n1")).unwrap();
        receiver.add(literal("meta1")).unwrap();
        receiver.add(value()).unwrap();
        receiver.add(Event::end(ContentType::LiteralMetadata)).unwrap();
        receiver.add(Event::end(ContentType::Node)).unwrap();

        assert_eq!(
            receiver.handler().literals,
            vec![literal("meta1"), value(), Event::end(ContentType::LiteralMetadata)]
        );
        assert_eq!(receiver.ignored_literal_metadata(), 0);
    }

    #[test]
    fn test_default_handler_rejects_other_events() {
        struct Nothing;
        impl ReceiverHandler for Nothing {}

        let mut receiver = ValidatingReceiver::new(Nothing);
        receiver.add(Event::comment("fine")).unwrap();
        let tree: Event = StartEvent::Tree(LabeledId::new("tree1", None)).into();
        assert!(matches!(
            receiver.add(tree),
            Err(WriteError::IllegalEvent { parent: None, .. })
        ));
    }

    #[test]
    fn test_unclosed_elements_fail_on_finish() {
        let mut receiver = ValidatingReceiver::new(Recording::default());
        receiver.add(node("n1")).unwrap();
        assert!(matches!(receiver.finish(), Err(WriteError::Grammar(GrammarError::Unclosed(_)))));
    }

    #[test]
    fn test_receive_element_wraps_content() {
        let (handler, report) = receive_element(
            Recording::default(),
            StartEvent::Node(LinkedLabeledId::new("n1", None, None)),
            |receiver| {
                receiver.add(Event::comment("dropped"))?;
                receiver.add(node("n2"))?;
                receiver.add(Event::end(ContentType::Node))?;
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(
            handler.other,
            vec![
                (ContentType::Node, None),
                (ContentType::Node, Some("n1".to_string())),
                (ContentType::Node, Some("n1".to_string())),
                (ContentType::Node, None),
            ]
        );
        assert_eq!(report.ignored_comments, 1);
    }
}
