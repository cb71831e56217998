//! The Nexus event reader: block loop, builder and source-specific variants.

use crate::events::{ContentType, Event, LabeledId, StartEvent};
use crate::model::id_manager::DOCUMENT_ID_PREFIX;
use crate::nexus::commands::{
    BlockScope, CommandDescriptor, CommandReader, CommandRegistry, RegistrationError, StepResult,
    UnknownCommandReader,
};
use crate::nexus::context::{NexusContext, container_prefix};
use crate::nexus::defs::*;
use crate::parameters::ReadWriteParameters;
use crate::parser::{
    BufferedByteSource, ByteParser, ByteSource, InMemoryByteSource, ParsingError, ParsingErrorType,
};
use crate::reader::{EventProducer, EventReader, ReaderState, StreamingReader};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

// =#========================================================================#=
// NEXUS PRODUCER
// =#========================================================================$=
/// Position of the block loop.
enum Phase<S: ByteSource> {
    Header,
    TopLevel,
    InBlock,
    Command(Box<dyn CommandReader<S>>),
    Done,
}

/// [EventProducer] for Nexus documents.
///
/// Each production step performs one unit of work: reading the header, a
/// top-level comment, a `BEGIN`/`END`, a command name, or one step of the
/// current command reader.
pub struct NexusProducer<S: ByteSource> {
    ctx: NexusContext<S>,
    registry: CommandRegistry<S>,
    phase: Phase<S>,
}

impl<S: ByteSource> NexusProducer<S> {
    pub fn new(parser: ByteParser<S>, parameters: ReadWriteParameters, registry: CommandRegistry<S>) -> Self {
        Self {
            ctx: NexusContext::new(parser, parameters),
            registry,
            phase: Phase::Header,
        }
    }

    /// Performs one unit of work.
    ///
    /// # Returns
    /// `false` once the document was read completely
    fn step(&mut self) -> Result<bool, ParsingError> {
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Header => {
                self.ctx.parser.skip_whitespace();
                if !self.ctx.parser.consume_if_sequence(NEXUS_HEADER) {
                    self.ctx.parser.check_io()?;
                    return Err(ParsingError::missing_nexus_header(&mut self.ctx.parser));
                }
                let id = self.ctx.new_id(DOCUMENT_ID_PREFIX);
                self.ctx.push(StartEvent::Document(LabeledId::new(id, None)));
                self.phase = Phase::TopLevel;
            }
            Phase::TopLevel => self.step_top_level()?,
            Phase::InBlock => self.step_in_block()?,
            Phase::Command(mut reader) => {
                if reader.step(&mut self.ctx)? == StepResult::Continue {
                    self.phase = Phase::Command(reader);
                } else {
                    self.phase = Phase::InBlock;
                }
            }
            Phase::Done => return Ok(false),
        }
        Ok(true)
    }

    fn step_top_level(&mut self) -> Result<(), ParsingError> {
        self.ctx.parser.skip_whitespace();
        match self.ctx.parser.peek() {
            None => {
                self.ctx.parser.check_io()?;
                self.ctx.push(Event::end(ContentType::Document));
                self.phase = Phase::Done;
            }
            Some(COMMENT_START) => {
                self.ctx.read_comment()?;
                self.phase = Phase::TopLevel;
            }
            Some(_) => {
                let word = self.ctx.read_word()?.unwrap_or_default();
                if !word.eq_ignore_ascii_case(BEGIN) {
                    return Err(ParsingError::invalid_block_structure(
                        &mut self.ctx.parser,
                        format!("expected BEGIN but found '{word}'"),
                    ));
                }
                let Some(name) = self.ctx.read_word()? else {
                    return Err(ParsingError::invalid_block_structure(
                        &mut self.ctx.parser,
                        "expected block name after BEGIN",
                    ));
                };
                self.ctx.expect_command_end(BEGIN)?;
                self.begin_block(&name);
                self.phase = Phase::InBlock;
            }
        }
        Ok(())
    }

    fn step_in_block(&mut self) -> Result<(), ParsingError> {
        self.ctx.skip_whitespace_and_comments()?;
        let Some(next) = self.ctx.parser.peek() else {
            let block = self.ctx.state.block.as_ref().map(NexusBlock::name).unwrap_or_default();
            return Err(self.ctx.unexpected_eof(format!("missing END of block {block}")));
        };
        self.phase = Phase::InBlock;
        if next == COMMAND_END {
            // empty command
            self.ctx.parser.next_byte();
            return Ok(());
        }

        let Some(command) = self.ctx.read_word()? else {
            return Err(self.ctx.error(ParsingErrorType::IllegalCharacter(format!(
                "expected command but found '{}'",
                next as char
            ))));
        };
        let upper = command.to_ascii_uppercase();
        if upper == END || upper == END_BLOCK {
            self.ctx.expect_command_end(&upper)?;
            self.end_block();
            self.phase = Phase::TopLevel;
            return Ok(());
        }

        if upper != TITLE && upper != LINK {
            self.ctx.ensure_block_started();
        }
        let block = self
            .ctx
            .state
            .block
            .clone()
            .unwrap_or_else(|| NexusBlock::UnknownBlock(String::new()));
        let reader = match self.registry.lookup(&block, &upper) {
            Some(factory) => {
                log::trace!("Reading command {upper} in block {block}");
                factory()
            }
            None => Box::new(UnknownCommandReader::new(command)),
        };
        self.phase = Phase::Command(reader);
        Ok(())
    }

    fn begin_block(&mut self, name: &str) {
        let block = NexusBlock::from_name(name);
        log::debug!("Begin of block {block}");
        let state = &mut self.ctx.state;
        state.reset_block();
        if let Some(container) = block.container() {
            let id = self.ctx.ids.create_new_id(container_prefix(container));
            state.block_element_id = Some(id);
        }
        state.block = Some(block);
    }

    fn end_block(&mut self) {
        if let Some(block) = &self.ctx.state.block {
            log::debug!("End of block {block}");
            if self.ctx.state.block_started
                && let Some(container) = block.container()
            {
                self.ctx.events.push_back(Event::end(container));
            }
        }
        self.ctx.state.reset_block();
    }
}

impl<S: ByteSource> EventProducer for NexusProducer<S> {
    const FORMAT: &'static str = "Nexus";

    fn produce(&mut self, queue: &mut VecDeque<Event>) -> Result<bool, ParsingError> {
        let more = self.step()?;
        let produced = !self.ctx.events.is_empty();
        queue.extend(self.ctx.events.drain(..));
        Ok(more || produced)
    }
}

// =#========================================================================#=
// READ STRATEGY
// =#========================================================================€=
/// Controls how a file is read.
///
/// By default, the [NexusReaderBuilder] uses [ReadStrategy::Automatic],
/// which picks a strategy based on file size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadStrategy {
    /// Read the file in chunks through a buffered I/O reader.
    Buffered,

    /// Load the entire file into a contiguous byte buffer before parsing.
    InMemory,

    /// Automatically choose between [ReadStrategy::Buffered] and
    /// [ReadStrategy::InMemory] based on file size.
    /// This is the default.
    Automatic,
}

// =#========================================================================#=
// NEXUS READER BUILDER
// =#========================================================================$=
/// Input of a [NexusReaderBuilder].
enum NexusInput {
    Path(PathBuf),
    Text(String),
}

/// Additional command reader, with factories for both byte sources.
struct CustomCommand {
    name: &'static str,
    scope: BlockScope,
    buffered: fn() -> Box<dyn CommandReader<BufferedByteSource>>,
    in_memory: fn() -> Box<dyn CommandReader<InMemoryByteSource>>,
}

fn create_reader<R, S>() -> Box<dyn CommandReader<S>>
where
    R: CommandReader<S> + Default + 'static,
    S: ByteSource,
{
    Box::new(R::default())
}

/// Builder for configuring and creating a [NexusEventReader].
///
/// # Configuration Options
/// * **Parameters**: [`with_parameters()`](Self::with_parameters)
/// * **Read strategy** (files only):
///   - [`with_buffered_source()`](Self::with_buffered_source)
///   - [`with_in_memory_source()`](Self::with_in_memory_source)
/// * **Commands**: [`with_command_reader()`](Self::with_command_reader)
///   registers readers for commands that are otherwise reported as unknown
///
/// # Example
/// ```no_run
/// use phylostream::nexus::NexusReaderBuilder;
/// use phylostream::reader::EventReader;
/// use phylostream::ReadWriteParameters;
///
/// let mut reader = NexusReaderBuilder::for_file("rallidae.nex")
///     .with_parameters(ReadWriteParameters::default().with_max_tokens_to_read(512))
///     .with_buffered_source()
///     .build()?;
///
/// while let Some(event) = reader.next_event()? {
///     println!("{:?}", event.content_type());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct NexusReaderBuilder {
    input: NexusInput,
    read_strategy: ReadStrategy,
    parameters: ReadWriteParameters,
    commands: Vec<CustomCommand>,
}

impl NexusReaderBuilder {
    /// Creates a builder reading from a file.
    ///
    /// # Arguments
    /// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
    pub fn for_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            input: NexusInput::Path(path.as_ref().to_path_buf()),
            read_strategy: ReadStrategy::Automatic,
            parameters: ReadWriteParameters::default(),
            commands: Vec::new(),
        }
    }

    /// Creates a builder reading from a string, always held in memory.
    pub fn for_str(input: &str) -> Self {
        Self {
            input: NexusInput::Text(input.to_string()),
            read_strategy: ReadStrategy::InMemory,
            parameters: ReadWriteParameters::default(),
            commands: Vec::new(),
        }
    }

    /// Sets the [ReadWriteParameters].
    pub fn with_parameters(mut self, parameters: ReadWriteParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Configure the reader to read the file using a **buffered reader**,
    /// keeping memory usage low regardless of file size.
    pub fn with_buffered_source(mut self) -> Self {
        self.read_strategy = ReadStrategy::Buffered;
        self
    }

    /// Configure the reader to read the **entire file into memory** upfront.
    pub fn with_in_memory_source(mut self) -> Self {
        self.read_strategy = ReadStrategy::InMemory;
        self
    }

    /// Registers the reader type `R` for command `name` in the blocks of `scope`.
    ///
    /// A new `R::default()` reads each occurrence of the command.
    ///
    /// # Errors
    /// A [RegistrationError] if the command is already handled in one of the
    /// blocks (including by a built-in reader) or the scope is empty.
    pub fn with_command_reader<R>(mut self, name: &'static str, scope: BlockScope) -> Result<Self, RegistrationError>
    where
        R: CommandReader<BufferedByteSource> + CommandReader<InMemoryByteSource> + Default + 'static,
    {
        self.commands.push(CustomCommand {
            name,
            scope,
            buffered: create_reader::<R, BufferedByteSource>,
            in_memory: create_reader::<R, InMemoryByteSource>,
        });
        // Validate now, so build() cannot fail on registration
        self.registry(|c| CommandDescriptor {
            name: c.name,
            scope: c.scope,
            factory: c.in_memory,
        })?;
        Ok(self)
    }

    fn registry<S: ByteSource>(
        &self,
        descriptor: impl Fn(&CustomCommand) -> CommandDescriptor<S>,
    ) -> Result<CommandRegistry<S>, RegistrationError> {
        let mut registry = CommandRegistry::with_defaults();
        for command in &self.commands {
            registry.register(descriptor(command))?;
        }
        Ok(registry)
    }

    /// Builds the [NexusEventReader]. Nothing is read before the first event
    /// is requested.
    ///
    /// # Errors
    /// Returns a [ParsingError] wrapping the I/O error if the file cannot be opened
    pub fn build(self) -> Result<NexusEventReader, ParsingError> {
        /// File size threshold (in bytes) for automatic read strategy.
        /// Files smaller than this are read into memory; larger files use buffered I/O.
        const AUTO_IN_MEMORY_THRESHOLD: u64 = 100 * 1024 * 1024; // 100 MB

        let registration_failed =
            |e: RegistrationError| ParsingError::without_context(ParsingErrorType::UnsupportedFeature(e.to_string()));

        let buffered_path = match &self.input {
            NexusInput::Text(_) => None,
            NexusInput::Path(path) => match self.read_strategy {
                ReadStrategy::Buffered => Some(path.clone()),
                ReadStrategy::InMemory => None,
                ReadStrategy::Automatic => {
                    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                    (file_size >= AUTO_IN_MEMORY_THRESHOLD).then(|| path.clone())
                }
            },
        };

        if let Some(path) = buffered_path {
            let registry = self
                .registry(|c| CommandDescriptor { name: c.name, scope: c.scope, factory: c.buffered })
                .map_err(registration_failed)?;
            let parser = ByteParser::from_file_buffered(path)?;
            Ok(NexusEventReader::Buffered(StreamingReader::new(NexusProducer::new(
                parser,
                self.parameters,
                registry,
            ))))
        } else {
            let registry = self
                .registry(|c| CommandDescriptor { name: c.name, scope: c.scope, factory: c.in_memory })
                .map_err(registration_failed)?;
            let parser = match &self.input {
                NexusInput::Path(path) => ByteParser::from_file_in_memory(path)?,
                NexusInput::Text(text) => ByteParser::for_str(text),
            };
            Ok(NexusEventReader::InMemory(StreamingReader::new(NexusProducer::new(
                parser,
                self.parameters,
                registry,
            ))))
        }
    }
}

// =#========================================================================#=
// NEXUS EVENT READER
// =#========================================================================$=
/// Event reader for Nexus documents.
///
/// Created via [NexusReaderBuilder] or [NexusEventReader::for_str].
pub enum NexusEventReader {
    /// Reader with buffered file read
    Buffered(StreamingReader<NexusProducer<BufferedByteSource>>),
    /// Reader with in-memory input
    InMemory(StreamingReader<NexusProducer<InMemoryByteSource>>),
}

/// Helper macro to delegate a method call to the inner reader variant.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            NexusEventReader::Buffered(inner) => inner.$method($($arg),*),
            NexusEventReader::InMemory(inner) => inner.$method($($arg),*),
        }
    };
}

impl NexusEventReader {
    /// Creates a reader with default parameters for a Nexus string.
    pub fn for_str(input: &str) -> Self {
        NexusEventReader::InMemory(StreamingReader::new(NexusProducer::new(
            ByteParser::for_str(input),
            ReadWriteParameters::default(),
            CommandRegistry::with_defaults(),
        )))
    }

    /// Current state of the reader.
    pub fn state(&self) -> &ReaderState {
        delegate!(self, state)
    }
}

impl EventReader for NexusEventReader {
    fn has_next_event(&mut self) -> Result<bool, ParsingError> {
        delegate!(self, has_next_event)
    }

    fn peek(&mut self) -> Result<Option<&Event>, ParsingError> {
        delegate!(self, peek)
    }

    fn next_event(&mut self) -> Result<Option<Event>, ParsingError> {
        delegate!(self, next_event)
    }

    fn close(&mut self) {
        delegate!(self, close)
    }
}
