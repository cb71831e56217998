//! The Newick event reader.

use crate::events::{ContentType, Event, LabeledId, LinkedLabeledId, StartEvent, comment_events};
use crate::model::IdManager;
use crate::model::id_manager::{DOCUMENT_ID_PREFIX, TREE_NETWORK_GROUP_ID_PREFIX};
use crate::newick::defs::ANNOTATION_START;
use crate::newick::parser::{NewickTreeParser, tree_start};
use crate::parameters::ReadWriteParameters;
use crate::parser::{BufferedByteSource, ByteParser, ByteSource, InMemoryByteSource, ParsingError};
use crate::reader::{EventProducer, StreamingReader};
use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Trees { group_started: bool },
    Done,
}

// =#========================================================================#=
// NEWICK PRODUCER
// =#========================================================================$=
/// [EventProducer] for files holding a `;`-separated list of Newick trees.
///
/// All trees are reported in one tree group. Each production step reads one
/// tree or one comment between trees. Node labels are not linked to OTUs.
pub struct NewickProducer<S: ByteSource> {
    parser: ByteParser<S>,
    parameters: ReadWriteParameters,
    ids: IdManager,
    tree_parser: NewickTreeParser,
    stage: Stage,
}

impl<S: ByteSource> NewickProducer<S> {
    pub fn new(parser: ByteParser<S>, parameters: ReadWriteParameters) -> Self {
        Self {
            parser,
            ids: IdManager::new(parameters.replace_used_ids),
            parameters,
            tree_parser: NewickTreeParser::new(),
            stage: Stage::Start,
        }
    }

    fn read_next(&mut self, queue: &mut VecDeque<Event>, group_started: bool) -> Result<(), ParsingError> {
        self.parser.skip_whitespace();
        match self.parser.peek() {
            None => {
                self.parser.check_io()?;
                if group_started {
                    queue.push_back(Event::end(ContentType::TreeNetworkGroup));
                }
                queue.push_back(Event::end(ContentType::Document));
                self.stage = Stage::Done;
            }
            Some(b'[') if !self.parser.peek_is_sequence(ANNOTATION_START) => {
                self.parser.next_byte();
                let comment = self.parser.read_comment_body(usize::MAX)?;
                queue.extend(comment_events(comment, self.parameters.max_comment_length));
            }
            Some(_) => {
                if !group_started {
                    let id = self.ids.create_new_id(TREE_NETWORK_GROUP_ID_PREFIX);
                    queue.push_back(StartEvent::TreeNetworkGroup(LinkedLabeledId::new(id, None, None)).into());
                    self.stage = Stage::Trees { group_started: true };
                }

                let mut tree = self.tree_parser.parse_tree(&mut self.parser)?;
                log::trace!("Read Newick tree with {} nodes", tree.nodes.len());
                queue.push_back(tree_start(&mut self.ids, None));
                for comment in std::mem::take(&mut tree.comments) {
                    queue.extend(comment_events(comment, self.parameters.max_comment_length));
                }
                let parameters = &self.parameters;
                tree.push_content_events(&mut self.ids, |label| (parameters.label(label), None), queue);
                queue.push_back(Event::end(ContentType::Tree));
            }
        }
        Ok(())
    }
}

impl<S: ByteSource> EventProducer for NewickProducer<S> {
    const FORMAT: &'static str = "Newick";

    fn produce(&mut self, queue: &mut VecDeque<Event>) -> Result<bool, ParsingError> {
        match self.stage {
            Stage::Start => {
                let id = self.ids.create_new_id(DOCUMENT_ID_PREFIX);
                queue.push_back(StartEvent::Document(LabeledId::new(id, None)).into());
                self.stage = Stage::Trees { group_started: false };
                Ok(true)
            }
            Stage::Trees { group_started } => {
                self.read_next(queue, group_started)?;
                Ok(true)
            }
            Stage::Done => Ok(false),
        }
    }
}

// =#========================================================================#=
// NEWICK EVENT READER
// =#========================================================================$=
/// Event reader for Newick files.
///
/// # Example
/// ```
/// use phylostream::events::{ContentType, Event, StartEvent};
/// use phylostream::newick::NewickEventReader;
/// use phylostream::reader::EventReader;
/// use phylostream::ReadWriteParameters;
///
/// let mut reader = NewickEventReader::for_str("(Kea,Kaka);", ReadWriteParameters::default());
/// let labels: Vec<String> = reader
///     .events()
///     .filter_map(|e| match e {
///         Ok(Event::Start(StartEvent::Node(node))) => node.label,
///         _ => None,
///     })
///     .collect();
/// assert_eq!(labels, vec!["Kea", "Kaka"]);
/// ```
pub type NewickEventReader<S> = StreamingReader<NewickProducer<S>>;

impl StreamingReader<NewickProducer<InMemoryByteSource>> {
    /// Creates a reader for a string holding Newick trees.
    pub fn for_str(input: &str, parameters: ReadWriteParameters) -> Self {
        StreamingReader::new(NewickProducer::new(ByteParser::for_str(input), parameters))
    }

    /// Creates a reader loading the whole file into memory.
    ///
    /// # Errors
    /// Returns a [ParsingError] wrapping the I/O error if the file cannot be read
    pub fn from_file_in_memory<P: AsRef<Path>>(path: P, parameters: ReadWriteParameters) -> Result<Self, ParsingError> {
        let parser = ByteParser::from_file_in_memory(path)?;
        Ok(StreamingReader::new(NewickProducer::new(parser, parameters)))
    }
}

impl<R: Read> StreamingReader<NewickProducer<BufferedByteSource<R>>> {
    /// Creates a reader streaming from `reader` through a buffer.
    pub fn from_reader(reader: R, parameters: ReadWriteParameters) -> Self {
        StreamingReader::new(NewickProducer::new(ByteParser::from_reader(reader), parameters))
    }
}
