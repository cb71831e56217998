//! Nexus event reader and writer.
//!
//! This module provides:
//! - [NexusReaderBuilder] / [NexusEventReader] for reading Nexus documents as
//!   a stream of [events](crate::events)
//! - [NexusWriter] for writing documents provided by [adapters](crate::adapters)
//!
//! # Quick API
//! * [read_str] - reads a Nexus string into a [DocumentStore]
//! * [read_file] - reads a Nexus file into a [DocumentStore]
//! * [write_file] - writes a document to a Nexus file
//!
//! # Format
//! A Nexus document starts with `#NEXUS`, followed by blocks
//! `BEGIN name; ... END;` and comments in square brackets. Each block
//! consists of `;`-terminated commands. Comments may appear anywhere between
//! tokens, also inside commands and sequences.
//!
//! ## Supported blocks and commands
//! * `TAXA`: `DIMENSIONS NTAX`, `TAXLABELS`
//! * `CHARACTERS`, `DATA`, `UNALIGNED`: `DIMENSIONS`, `FORMAT` (including
//!   `DATATYPE=MIXED(...)`), `MATRIX` (sequential or interleaved)
//! * `SETS`, `ASSUMPTIONS`: `CHARSET`, `TAXSET` (standard and vector
//!   format), `TREESET` in `SETS`
//! * `TREES`: `TRANSLATE`, `TREE`
//! * `TITLE` and `LINK` in every block
//!
//! Other commands are reported as
//! [UnknownCommand](crate::events::ContentType::UnknownCommand) events or
//! skipped. Readers for further commands can be registered with
//! [NexusReaderBuilder::with_command_reader].
//!
//! ## Not supported
//! * Transposed matrices and matrices without labels
//! * `REMAINING` and named characters in set definitions
//! * `.`, `ALL` and the vector format in `TREESET`

pub mod commands;
pub mod context;
mod defs;
mod reader;
mod writer;

pub use self::commands::{
    BlockScope, CommandDescriptor, CommandReader, CommandRegistry, RegistrationError, StepResult,
};
pub use self::context::{NexusContext, SharedParseState};
pub use self::defs::NexusBlock;
pub use self::reader::{NexusEventReader, NexusProducer, NexusReaderBuilder, ReadStrategy};
pub use self::writer::NexusWriter;

use crate::model::{DocumentStore, StoreError};
use crate::parameters::ReadWriteParameters;
use crate::writer::{DocumentWriter, WriteError, WriteReport};
use std::fs::File;
use std::path::Path;

// ============================================================================
// QUICK API (pub)
// ============================================================================
/// Reads a Nexus string into a [DocumentStore], using default parameters.
///
/// # Errors
/// [StoreError::Parsing] if the string is not valid Nexus
///
/// # Example
/// ```
/// use phylostream::nexus;
///
/// let store = nexus::read_str(
///     "#NEXUS\nBEGIN TAXA;\n DIMENSIONS NTAX=2;\n TAXLABELS Kea Kaka;\nEND;",
/// ).unwrap();
/// assert_eq!(store.otu_lists[0].otus.len(), 2);
/// ```
pub fn read_str(nexus: &str) -> Result<DocumentStore, StoreError> {
    let mut reader = NexusEventReader::for_str(nexus);
    DocumentStore::read_from(&mut reader)
}

/// Reads a Nexus file into a [DocumentStore], using default parameters.
///
/// Small files are loaded into memory, larger ones are read buffered
/// (see [ReadStrategy::Automatic]).
///
/// # Arguments
/// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
///
/// # Errors
/// [StoreError::Parsing] if the file cannot be read or is not valid Nexus
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<DocumentStore, StoreError> {
    let mut reader = NexusReaderBuilder::for_file(path).build()?;
    DocumentStore::read_from(&mut reader)
}

/// Writes `store` to a new Nexus file at `path`.
///
/// # Returns
/// The report listing what could not be written
///
/// # Errors
/// I/O errors, or [WriteError::UnknownId] for inconsistent stores
pub fn write_file<P: AsRef<Path>>(
    path: P,
    store: &DocumentStore,
    parameters: &ReadWriteParameters,
) -> Result<WriteReport, WriteError> {
    let mut writer = NexusWriter::new(File::create(path)?);
    let report = writer.write_document(store, parameters)?;
    writer.into_inner()?;
    Ok(report)
}
