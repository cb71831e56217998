//! Command readers of the Nexus reader and the registry selecting them.
//!
//! Each `;`-terminated command inside a block is processed by a
//! [CommandReader], a small state machine whose [step](CommandReader::step)
//! is called until it reports [StepResult::Done]. The reader for a command is
//! looked up in the [CommandRegistry] by block and command name. Commands
//! without a registered reader are handled by the [UnknownCommandReader].

mod characters;
mod dimensions;
mod format;
mod matrix;
mod sets;
mod taxa;
mod title_link;
mod trees;
mod unknown;

pub use characters::{CharLabelsReader, CharStateLabelsReader};
pub use dimensions::DimensionsReader;
pub use format::FormatReader;
pub use matrix::MatrixReader;
pub use sets::{SetKind, SetReader};
pub use taxa::TaxLabelsReader;
pub use title_link::{LinkReader, TitleReader};
pub use trees::{TranslateReader, TreeReader};
pub use unknown::UnknownCommandReader;

use crate::events::{
    ContentType, Event, LiteralContentEvent, LiteralMetadataEvent, ObjectValue, StartEvent,
};
use crate::model::id_manager::META_ID_PREFIX;
use crate::nexus::context::NexusContext;
use crate::nexus::defs::*;
use crate::parser::{ByteSource, ParsingError, ParsingErrorType};
use std::collections::HashMap;
use thiserror::Error;

// =#========================================================================#=
// COMMAND READER (Trait)
// =#========================================================================T=
/// Outcome of one [CommandReader::step].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// The command has more to read
    Continue,
    /// The command including its terminating `;` was read completely
    Done,
}

/// Reader of one Nexus command.
///
/// A new reader value is created for every occurrence of its command. When
/// `step` is first called, the command name was already consumed. Each step
/// may append any number of events to the context.
pub trait CommandReader<S: ByteSource> {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError>;
}

/// Creates a fresh reader for one command occurrence.
pub type CommandFactory<S> = fn() -> Box<dyn CommandReader<S>>;

// =#========================================================================#=
// COMMAND REGISTRY
// =#========================================================================$=
/// Blocks a command is valid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockScope {
    /// Valid in every block, including unknown ones
    All,
    /// Valid only in the blocks with these names
    Only(&'static [&'static str]),
}

/// Registration of a command reader.
pub struct CommandDescriptor<S: ByteSource> {
    pub name: &'static str,
    pub scope: BlockScope,
    pub factory: CommandFactory<S>,
}

/// Error registering a command reader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("a reader for command {command} is already registered for block {block}")]
    Duplicate { block: String, command: String },
    #[error("command {0} is not valid in any block")]
    NoBlocks(String),
    #[error("'{0}' is not a valid Nexus command or block name")]
    InvalidName(String),
}

/// Maps (block, command) to command readers.
///
/// Registrations are validated when they are made, so a command can never
/// end up registered ambiguously or for an empty set of blocks.
pub struct CommandRegistry<S: ByteSource> {
    scoped: HashMap<(String, String), CommandFactory<S>>,
    everywhere: HashMap<String, CommandFactory<S>>,
}

impl<S: ByteSource> CommandRegistry<S> {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            scoped: HashMap::new(),
            everywhere: HashMap::new(),
        }
    }

    /// Creates a registry with readers for all supported commands.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for descriptor in Self::default_descriptors() {
            let result = registry.register(descriptor);
            debug_assert!(result.is_ok(), "inconsistent built-in command: {result:?}");
        }
        registry
    }

    /// Descriptors of the readers of all supported commands.
    fn default_descriptors() -> Vec<CommandDescriptor<S>> {
        const CHARACTER_BLOCKS: &[&str] = &["CHARACTERS", "DATA", "UNALIGNED"];
        const SET_BLOCKS: &[&str] = &["SETS", "ASSUMPTIONS"];

        vec![
            CommandDescriptor { name: TITLE, scope: BlockScope::All, factory: || Box::new(TitleReader) },
            CommandDescriptor { name: LINK, scope: BlockScope::All, factory: || Box::new(LinkReader) },
            CommandDescriptor {
                name: DIMENSIONS,
                scope: BlockScope::Only(&["TAXA"]),
                factory: || Box::new(DimensionsReader::for_taxa()),
            },
            CommandDescriptor {
                name: TAXLABELS,
                scope: BlockScope::Only(&["TAXA"]),
                factory: || Box::new(TaxLabelsReader),
            },
            CommandDescriptor {
                name: DIMENSIONS,
                scope: BlockScope::Only(CHARACTER_BLOCKS),
                factory: || Box::new(DimensionsReader::for_characters()),
            },
            CommandDescriptor {
                name: FORMAT,
                scope: BlockScope::Only(CHARACTER_BLOCKS),
                factory: || Box::new(FormatReader::default()),
            },
            CommandDescriptor {
                name: CHARLABELS,
                scope: BlockScope::Only(CHARACTER_BLOCKS),
                factory: || Box::new(CharLabelsReader::default()),
            },
            CommandDescriptor {
                name: CHARSTATELABELS,
                scope: BlockScope::Only(CHARACTER_BLOCKS),
                factory: || Box::new(CharStateLabelsReader),
            },
            CommandDescriptor {
                name: MATRIX,
                scope: BlockScope::Only(CHARACTER_BLOCKS),
                factory: || Box::new(MatrixReader::default()),
            },
            CommandDescriptor {
                name: CHARSET,
                scope: BlockScope::Only(SET_BLOCKS),
                factory: || Box::new(SetReader::new(SetKind::Characters)),
            },
            CommandDescriptor {
                name: TAXSET,
                scope: BlockScope::Only(SET_BLOCKS),
                factory: || Box::new(SetReader::new(SetKind::Taxa)),
            },
            CommandDescriptor {
                name: TREESET,
                scope: BlockScope::Only(&["SETS"]),
                factory: || Box::new(SetReader::new(SetKind::Trees)),
            },
            CommandDescriptor {
                name: TRANSLATE,
                scope: BlockScope::Only(&["TREES"]),
                factory: || Box::new(TranslateReader),
            },
            CommandDescriptor {
                name: TREE,
                scope: BlockScope::Only(&["TREES"]),
                factory: || Box::new(TreeReader),
            },
        ]
    }

    /// Registers a command reader.
    ///
    /// # Errors
    /// A [RegistrationError] if a name is invalid, the scope is empty, or the
    /// command is already registered for one of the blocks. Nothing is
    /// registered in that case.
    pub fn register(&mut self, descriptor: CommandDescriptor<S>) -> Result<(), RegistrationError> {
        let command = validated_name(descriptor.name)?;
        match descriptor.scope {
            BlockScope::All => {
                if self.everywhere.contains_key(&command)
                    || self.scoped.keys().any(|(_, c)| *c == command)
                {
                    return Err(RegistrationError::Duplicate {
                        block: "*".to_string(),
                        command,
                    });
                }
                self.everywhere.insert(command, descriptor.factory);
            }
            BlockScope::Only(blocks) => {
                if blocks.is_empty() {
                    return Err(RegistrationError::NoBlocks(command));
                }
                let mut keys = Vec::with_capacity(blocks.len());
                for block in blocks {
                    let key = (validated_name(block)?, command.clone());
                    if self.scoped.contains_key(&key) || self.everywhere.contains_key(&command) {
                        return Err(RegistrationError::Duplicate {
                            block: key.0,
                            command,
                        });
                    }
                    keys.push(key);
                }
                for key in keys {
                    self.scoped.insert(key, descriptor.factory);
                }
            }
        }
        Ok(())
    }

    /// Looks up the reader factory for `command` in `block` (case-insensitive).
    pub fn lookup(&self, block: &NexusBlock, command: &str) -> Option<CommandFactory<S>> {
        let command = command.to_ascii_uppercase();
        self.everywhere
            .get(&command)
            .or_else(|| self.scoped.get(&(block.name(), command)))
            .copied()
    }
}

fn validated_name(name: &str) -> Result<String, RegistrationError> {
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(name.to_ascii_uppercase())
    } else {
        Err(RegistrationError::InvalidName(name.to_string()))
    }
}

// ============================================================================
// Helpers shared by command readers
// ============================================================================
/// Emits a subcommand the reader does not interpret as literal metadata with
/// predicate `nexus:<COMMAND>.<KEY>`.
pub(crate) fn emit_subcommand_metadata<S: ByteSource>(
    ctx: &mut NexusContext<S>,
    command: &str,
    key: &str,
    value: ObjectValue,
) {
    let id = ctx.new_id(META_ID_PREFIX);
    let predicate = format!(
        "{NEXUS_PREDICATE_PREFIX}{command}.{}",
        key.to_ascii_uppercase()
    );
    ctx.push(StartEvent::LiteralMetadata(LiteralMetadataEvent::new(id, predicate)));
    ctx.push(Event::literal_content(LiteralContentEvent::simple(value)));
    ctx.push(Event::end(ContentType::LiteralMetadata));
}

/// Reads the value of a `KEY[=value]` subcommand whose key was read already.
///
/// # Returns
/// `None` if no `=` follows the key
pub(crate) fn read_optional_value<S: ByteSource>(
    ctx: &mut NexusContext<S>,
    command: &str,
    key: &str,
) -> Result<Option<String>, ParsingError> {
    if !ctx.consume_if_byte(KEY_VALUE_SEPARATOR)? {
        return Ok(None);
    }
    match ctx.read_value()? {
        Some(value) => Ok(Some(value)),
        None => match ctx.parser.peek() {
            None => Err(ctx.unexpected_eof(format!("expected value of {key} in {command}"))),
            Some(b) => Err(ctx.error(ParsingErrorType::IllegalCharacter(format!(
                "expected value of {key} in {command} but found '{}'",
                b as char
            )))),
        },
    }
}

// =#========================================================================#=
// TESTS - COMMAND REGISTRY
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::InMemoryByteSource;

    #[test]
    fn test_defaults_resolve_per_block() {
        let registry = CommandRegistry::<InMemoryByteSource>::with_defaults();
        assert!(registry.lookup(&NexusBlock::Taxa, "taxlabels").is_some());
        assert!(registry.lookup(&NexusBlock::Trees, "TAXLABELS").is_none());
        assert!(registry.lookup(&NexusBlock::Data, "Matrix").is_some());
        assert!(registry.lookup(&NexusBlock::UnknownBlock("MRBAYES".into()), "title").is_some());
        assert!(registry.lookup(&NexusBlock::Assumptions, "TREESET").is_none());
    }

    #[test]
    fn test_every_default_command_registers() {
        let mut registry = CommandRegistry::<InMemoryByteSource>::empty();
        for descriptor in CommandRegistry::<InMemoryByteSource>::default_descriptors() {
            let name = descriptor.name;
            assert_eq!(registry.register(descriptor), Ok(()), "{name}");
        }
        for command in ["CHARLABELS", "CharStateLabels"] {
            assert!(registry.lookup(&NexusBlock::Characters, command).is_some());
            assert!(registry.lookup(&NexusBlock::Data, command).is_some());
            assert!(registry.lookup(&NexusBlock::Taxa, command).is_none());
        }
    }

    #[test]
    fn test_registration_errors() {
        let mut registry = CommandRegistry::<InMemoryByteSource>::with_defaults();
        let duplicate = registry.register(CommandDescriptor {
            name: "tree",
            scope: BlockScope::Only(&["TREES"]),
            factory: || Box::new(UnknownCommandReader::new("TREE".to_string())),
        });
        assert!(matches!(duplicate, Err(RegistrationError::Duplicate { .. })));

        let empty = registry.register(CommandDescriptor {
            name: "LSET",
            scope: BlockScope::Only(&[]),
            factory: || Box::new(UnknownCommandReader::new("LSET".to_string())),
        });
        assert_eq!(empty, Err(RegistrationError::NoBlocks("LSET".to_string())));

        let clash_with_all = registry.register(CommandDescriptor {
            name: "Title",
            scope: BlockScope::Only(&["MRBAYES"]),
            factory: || Box::new(TitleReader),
        });
        assert!(clash_with_all.is_err());

        registry
            .register(CommandDescriptor {
                name: "LSET",
                scope: BlockScope::Only(&["MRBAYES"]),
                factory: || Box::new(UnknownCommandReader::new("LSET".to_string())),
            })
            .unwrap();
        assert!(registry.lookup(&NexusBlock::from_name("mrbayes"), "lset").is_some());
    }
}
