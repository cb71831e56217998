//! The pull-based streaming reader contract shared by all format readers.
//!
//! A format reader is a [StreamingReader] around a format-specific
//! [EventProducer]. The producer turns the next syntactic unit of the input
//! into any number of events, which are buffered in a FIFO queue and handed
//! out one at a time. The producer is only invoked again when the queue is
//! empty.

use crate::events::Event;
use crate::parser::{ParsingError, ParsingErrorType};
use std::collections::VecDeque;

// =#========================================================================#=
// EVENT READER (Trait)
// =#========================================================================T=
/// Pull interface of every reader.
///
/// Each call of [next_event](Self::next_event) advances by exactly one event,
/// [peek](Self::peek) never advances.
pub trait EventReader {
    /// Whether another event is available.
    ///
    /// # Errors
    /// Returns the error that made the reader fail, if producing the next
    /// event failed
    fn has_next_event(&mut self) -> Result<bool, ParsingError>;

    /// Returns the next event without consuming it.
    ///
    /// # Returns
    /// `None` if the end of the document was reached
    fn peek(&mut self) -> Result<Option<&Event>, ParsingError>;

    /// Returns and consumes the next event.
    ///
    /// # Returns
    /// `None` if the end of the document was reached
    fn next_event(&mut self) -> Result<Option<Event>, ParsingError>;

    /// Releases the underlying input. Later calls report
    /// [ParsingErrorType::ReaderClosed].
    fn close(&mut self);

    /// Iterator over the remaining events, ending after the first error.
    fn events(&mut self) -> Events<'_, Self>
    where
        Self: Sized,
    {
        Events {
            reader: self,
            failed: false,
        }
    }
}

/// Iterator returned by [EventReader::events].
pub struct Events<'a, R: EventReader> {
    reader: &'a mut R,
    failed: bool,
}

impl<R: EventReader> Iterator for Events<'_, R> {
    type Item = Result<Event, ParsingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_event() {
            Ok(event) => event.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

// =#========================================================================#=
// EVENT PRODUCER (Trait)
// =#========================================================================T=
/// Format-specific production step of a [StreamingReader].
pub trait EventProducer {
    /// Name of the format, attached to errors.
    const FORMAT: &'static str;

    /// Reads the next syntactic unit and appends the resulting events to `queue`.
    ///
    /// A step may append no events (e.g. when skipping input) as long as it
    /// makes progress.
    ///
    /// # Returns
    /// `false` if the input is exhausted and no events were appended
    fn produce(&mut self, queue: &mut VecDeque<Event>) -> Result<bool, ParsingError>;
}

// =#========================================================================#=
// STREAMING READER
// =#========================================================================$=
/// State of a [StreamingReader].
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderState {
    BeforeFirstEvent,
    Streaming,
    Exhausted,
    /// Producing events failed, the reader only reports this error from now on
    Failed(ParsingError),
    Closed,
}

/// Reader implementing [EventReader] on top of an [EventProducer] and an
/// internal event queue.
///
/// The producer (and with it the underlying input) is dropped as soon as the
/// input is exhausted, producing fails, or the reader is closed.
pub struct StreamingReader<P: EventProducer> {
    producer: Option<P>,
    queue: VecDeque<Event>,
    state: ReaderState,
}

impl<P: EventProducer> StreamingReader<P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer: Some(producer),
            queue: VecDeque::new(),
            state: ReaderState::BeforeFirstEvent,
        }
    }

    /// Current state of this reader.
    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    /// Access to the producer while input remains.
    pub fn producer(&self) -> Option<&P> {
        self.producer.as_ref()
    }

    /// Runs the producer until the queue holds an event or input is exhausted.
    ///
    /// # Returns
    /// Whether an event is queued
    fn fill(&mut self) -> Result<bool, ParsingError> {
        match &self.state {
            ReaderState::Failed(e) => return Err(e.clone()),
            ReaderState::Closed => {
                return Err(ParsingError::without_context(ParsingErrorType::ReaderClosed).in_format(P::FORMAT));
            }
            _ => {}
        }

        while self.queue.is_empty() {
            let Some(producer) = self.producer.as_mut() else {
                break;
            };
            match producer.produce(&mut self.queue) {
                Ok(true) => {}
                Ok(false) => {
                    self.producer = None;
                }
                Err(e) => {
                    let e = e.in_format(P::FORMAT);
                    log::debug!("{} reader failed: {e}", P::FORMAT);
                    self.producer = None;
                    self.queue.clear();
                    self.state = ReaderState::Failed(e.clone());
                    return Err(e);
                }
            }
        }

        Ok(!self.queue.is_empty())
    }
}

impl<P: EventProducer> EventReader for StreamingReader<P> {
    fn has_next_event(&mut self) -> Result<bool, ParsingError> {
        self.fill()
    }

    fn peek(&mut self) -> Result<Option<&Event>, ParsingError> {
        self.fill()?;
        Ok(self.queue.front())
    }

    fn next_event(&mut self) -> Result<Option<Event>, ParsingError> {
        self.fill()?;
        match self.queue.pop_front() {
            Some(event) => {
                self.state = ReaderState::Streaming;
                Ok(Some(event))
            }
            None => {
                self.state = ReaderState::Exhausted;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.producer = None;
        self.queue.clear();
        self.state = ReaderState::Closed;
    }
}

// =#========================================================================#=
// TESTS - STREAMING READER
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::parser::Position;

    /// Produces two comments per step for `steps` steps, then optionally fails.
    struct Counting {
        steps: usize,
        fail_at_end: bool,
    }

    impl EventProducer for Counting {
        const FORMAT: &'static str = "test";

        fn produce(&mut self, queue: &mut VecDeque<Event>) -> Result<bool, ParsingError> {
            if self.steps == 0 {
                if self.fail_at_end {
                    return Err(ParsingError::without_context(ParsingErrorType::UnexpectedEof(
                        "test".to_string(),
                    )));
                }
                return Ok(false);
            }
            self.steps -= 1;
            queue.push_back(Event::comment(format!("a{}", self.steps)));
            queue.push_back(Event::comment(format!("b{}", self.steps)));
            Ok(true)
        }
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut reader = StreamingReader::new(Counting { steps: 1, fail_at_end: false });
        assert_eq!(reader.state(), &ReaderState::BeforeFirstEvent);
        let first = reader.peek().unwrap().cloned();
        assert_eq!(reader.peek().unwrap().cloned(), first);
        assert_eq!(reader.next_event().unwrap(), first);
        assert_eq!(reader.state(), &ReaderState::Streaming);
        assert_eq!(reader.next_event().unwrap(), Some(Event::comment("b0")));
        assert_eq!(reader.next_event().unwrap(), None);
        assert_eq!(reader.state(), &ReaderState::Exhausted);
        assert!(!reader.has_next_event().unwrap());
    }

    #[test]
    fn test_failure_is_sticky() {
        let mut reader = StreamingReader::new(Counting { steps: 1, fail_at_end: true });
        let events: Vec<_> = reader.events().collect();
        assert_eq!(events.len(), 3);
        let err = events[2].clone().unwrap_err();
        assert_eq!(err.format(), Some("test"));
        assert_eq!(err.position(), Position::default());
        assert_eq!(reader.next_event().unwrap_err(), err);
    }

    #[test]
    fn test_close_releases_producer() {
        let mut reader = StreamingReader::new(Counting { steps: 3, fail_at_end: false });
        reader.next_event().unwrap();
        reader.close();
        assert!(reader.producer().is_none());
        assert_eq!(
            reader.next_event().unwrap_err().kind(),
            &ParsingErrorType::ReaderClosed
        );
    }
}
