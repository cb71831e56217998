//! Phylostream is a library to read and write phylogenetic data as a stream
//! of events, independent of the file format.
//!
//! Readers turn a document into a sequence of [events](crate::events):
//! start/end pairs for documents, OTU lists, matrices, tree groups, trees
//! and their parts, and sole events for tokens, set elements, comments and
//! metadata. Writers pull documents from [adapters](crate::adapters), which
//! deliver the content of each element as events to a receiver.
//! Core functionality provided:
//! - Event model: typed events, a [grammar](crate::events::grammar) checker
//!   for event sequences and per-document [ID management](crate::model::IdManager)
//! - Nexus: Streaming reader for `TAXA`, `CHARACTERS`/`DATA`/`UNALIGNED`,
//!   `TREES` and `SETS`/`ASSUMPTIONS` blocks, extensible with custom
//!   command readers, and a writer for the same blocks.
//!   See [crate::nexus].
//! - Newick: Reader for one or more trees with hot comment annotations,
//!   and a writer. See [crate::newick].
//! - Storage: [DocumentStore](crate::model::DocumentStore) collects a whole
//!   event stream in memory and offers it to writers again.
//! - Validation: [ValidatingReceiver](crate::receiver::ValidatingReceiver)
//!   checks every event adapters send to writers.
//! - Configurability: see [ReadWriteParameters]
//!   - Maximum number of tokens per event and characters per comment event
//!   - Replacing used IDs, treatment of blank labels and unknown commands
//!   - Metadata as hot comments, OTU label fallback, matrix line length
//!
//! # Usage patterns
//! Can read files in two main ways:
//! 1. Quick functions read a whole document into a
//!    [DocumentStore](crate::model::DocumentStore) with default settings.
//!    See below and the [crate::newick] and [crate::nexus] documentation.
//! 2. Configure a reader using
//!    [NexusReaderBuilder](crate::nexus::NexusReaderBuilder) or
//!    [NewickEventReader](crate::newick::NewickEventReader) and pull the
//!    events one at a time via [EventReader](crate::reader::EventReader).
//!
//! ## Example Default Configuration
//!
//! Read a Newick string:
//! ```
//! use phylostream::read_newick_str;
//!
//! let store = read_newick_str("((A:0.1,B:0.2):0.3,C:0.4);").unwrap();
//! assert_eq!(store.tree_groups[0].trees[0].nodes.len(), 5);
//! ```
//!
//! Read a Nexus file:
//! ```no_run
//! use phylostream::read_nexus_file;
//!
//! let store = read_nexus_file("primates.nex").unwrap();
//! println!("Loaded {} matrices", store.matrices.len());
//! ```
//!
//! ## Example Reader Configuration
//!
//! For more control, configure a reader yourself:
//! ```no_run
//! use phylostream::ReadWriteParameters;
//! use phylostream::events::{Event, SoleEvent};
//! use phylostream::nexus::NexusReaderBuilder;
//! use phylostream::reader::EventReader;
//!
//! let parameters = ReadWriteParameters::default().with_max_tokens_to_read(500);
//! let mut reader = NexusReaderBuilder::for_file("alignment.nex")
//!     .with_parameters(parameters)
//!     .with_buffered_source()
//!     .build()?;
//!
//! let mut tokens = 0;
//! while let Some(event) = reader.next_event()? {
//!     if let Event::Sole(SoleEvent::SequenceTokens(sequence_tokens)) = event {
//!         tokens += sequence_tokens.len();
//!     }
//! }
//! println!("Read {tokens} tokens");
//! # Ok::<(), phylostream::parser::ParsingError>(())
//! ```

pub mod adapters;
pub mod events;
pub mod model;
pub mod newick;
pub mod nexus;
pub mod parameters;
pub mod parser;
pub mod reader;
pub mod receiver;
pub mod writer;

pub use crate::parameters::{MetadataTreatment, ReadWriteParameters};

use crate::model::{DocumentStore, StoreError};
use crate::writer::{WriteError, WriteReport};
use std::path::Path;

// ============================================================================
// Quick Nexus API
// ============================================================================
/// Reads a Nexus string using default settings into a [DocumentStore].
///
/// See [`nexus::read_str`] for full documentation.
pub fn read_nexus_str(nexus: &str) -> Result<DocumentStore, StoreError> {
    nexus::read_str(nexus)
}

/// Reads a Nexus file using default settings into a [DocumentStore].
///
/// See [`nexus::read_file`] for full documentation.
pub fn read_nexus_file<P: AsRef<Path>>(path: P) -> Result<DocumentStore, StoreError> {
    nexus::read_file(path)
}

/// Writes a stored document to a Nexus file.
///
/// See [`nexus::write_file`] for full documentation.
pub fn write_nexus_file<P: AsRef<Path>>(
    path: P,
    store: &DocumentStore,
    parameters: &ReadWriteParameters,
) -> Result<WriteReport, WriteError> {
    nexus::write_file(path, store, parameters)
}

// ============================================================================
// Quick Newick API
// ============================================================================
/// Reads one or more Newick trees using default settings into a
/// [DocumentStore].
///
/// See [`newick::read_str`] for full documentation of this convenience function.
pub fn read_newick_str(newick: &str) -> Result<DocumentStore, StoreError> {
    newick::read_str(newick)
}

/// Reads a file containing Newick trees using default settings into a
/// [DocumentStore].
///
/// See [`newick::read_file`] for full documentation of this convenience function.
pub fn read_newick_file<P: AsRef<Path>>(path: P) -> Result<DocumentStore, StoreError> {
    newick::read_file(path)
}

/// Writes all trees of a stored document to a Newick file.
///
/// See [`newick::write_file`] for full documentation of this convenience function.
pub fn write_newick_file<P: AsRef<Path>>(
    path: P,
    store: &DocumentStore,
    parameters: &ReadWriteParameters,
) -> Result<WriteReport, WriteError> {
    newick::write_file(path, store, parameters)
}
