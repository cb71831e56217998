//! Newick reader and writer.
//!
//! A Newick file is a sequence of trees, each terminated by `;`. The
//! [NewickEventReader] reports them as one tree group of a document, the
//! [NewickWriter] writes all trees of a document, one per line.
//!
//! # Quick API
//! * [read_str] - reads a string with Newick trees into a [DocumentStore]
//! * [read_file] - reads a Newick file into a [DocumentStore]
//! * [write_file] - writes all trees of a document to a file
//!
//! # Format
//! * `tree ::= [markers] vertex ';'`
//! * `vertex ::= ['(' vertex {',' vertex} ')'] [label] [annotation] [':' length] [annotation]`
//! * `markers ::= '[&R]' | '[&U]' | annotation`
//! * `annotation ::= '[&' key ['=' value] {',' key ['=' value]} ']'`
//!
//! Furthermore:
//! * Vertices may have any number of children
//! * Whitespace can occur between elements, just not within an unquoted
//!   label or a branch length
//! * Labels in single quotes may contain any character, a doubled `''`
//!   stands for a quote; in unquoted labels `_` stands for a space
//! * Comments in square brackets can occur wherever whitespace is allowed
//! * Trees are rooted unless marked `[&U]`
//!
//! Annotations (hot comments) are reported as literal metadata of the node
//! (or tree) they follow, typed as integer, float or text. A key without
//! value is a flag with value `true`.

mod defs;
mod parser;
mod reader;
mod writer;

pub use self::parser::{ANNOTATION_ORIGINAL_TYPE, NewickTreeParser, NodeIndex, ParsedNode, ParsedTree};
pub use self::reader::{NewickEventReader, NewickProducer};
pub use self::writer::{NewickStringWriter, NewickWriter};

pub(crate) use self::writer::otu_labels;

use crate::model::{DocumentStore, StoreError};
use crate::parameters::ReadWriteParameters;
use crate::writer::{DocumentWriter, WriteError, WriteReport};
use std::fs::File;
use std::path::Path;

// ============================================================================
// QUICK API (pub)
// ============================================================================
/// Reads all trees of a string into a [DocumentStore], using default
/// parameters.
///
/// # Arguments
/// * `newick` - One or more Newick trees
///
/// # Errors
/// [StoreError::Parsing] if the string is not valid Newick
///
/// # Example
/// ```
/// use phylostream::newick;
///
/// let store = newick::read_str("((Kea,Kaka),Kakapo);\n(Kea,(Kaka,Kakapo));").unwrap();
/// assert_eq!(store.tree_groups[0].trees.len(), 2);
/// ```
pub fn read_str(newick: &str) -> Result<DocumentStore, StoreError> {
    let mut reader = NewickEventReader::for_str(newick, ReadWriteParameters::default());
    DocumentStore::read_from(&mut reader)
}

/// Reads all trees of a Newick file into a [DocumentStore], using default
/// parameters.
///
/// # Arguments
/// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
///
/// # Errors
/// [StoreError::Parsing] if the file cannot be read or is not valid Newick
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<DocumentStore, StoreError> {
    let mut reader = NewickEventReader::from_file_in_memory(path, ReadWriteParameters::default())?;
    DocumentStore::read_from(&mut reader)
}

/// Writes all trees of `store` to a new file at `path`, one per line.
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
    let mut writer = NewickWriter::new(File::create(path)?);
    let report = writer.write_document(store, parameters)?;
    writer.into_inner()?;
    Ok(report)
}
