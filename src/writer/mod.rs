//! Errors, reports and the common trait of document writers.
//!
//! Writers pull the data to write from [adapters](crate::adapters). Adapters
//! push events into [receivers](crate::receiver) provided by the writer,
//! which validate them and turn them into output. Data that cannot be
//! represented in the target format is not an error: it is dropped, counted
//! in the [WriteReport] and logged.

use crate::adapters::DocumentAdapter;
use crate::events::{ContentType, Event, GrammarError};
use crate::model::IdError;
use crate::parameters::ReadWriteParameters;
use std::io;
use thiserror::Error;

// =#========================================================================#=
// WRITE ERROR
// =#========================================================================€=
/// Errors of the write path.
#[derive(Error, Debug)]
pub enum WriteError {
    /// An adapter sent an event that may not occur at its position.
    #[error("{} event is not allowed inside {}", .event.content_type(), describe_parent(.parent))]
    IllegalEvent {
        event: Event,
        /// The innermost open start event
        parent: Option<Event>,
    },
    /// An adapter was asked for an element it does not know.
    #[error("no {content_type} with ID '{id}'")]
    UnknownId { content_type: ContentType, id: String },
    #[error("invalid event sequence")]
    Grammar(#[from] GrammarError),
    #[error("invalid ID")]
    Id(#[from] IdError),
    #[error("I/O error while writing")]
    Io(#[from] io::Error),
}

impl WriteError {
    /// Creates an [UnknownId](Self::UnknownId) error.
    pub fn unknown_id(content_type: ContentType, id: &str) -> Self {
        WriteError::UnknownId {
            content_type,
            id: id.to_string(),
        }
    }
}

fn describe_parent(parent: &Option<Event>) -> String {
    match parent {
        Some(event) => match event.id() {
            Some(id) => format!("{} '{id}'", event.content_type()),
            None => event.content_type().to_string(),
        },
        None => "top level".to_string(),
    }
}

// =#========================================================================#=
// WRITE REPORT
// =#========================================================================$=
/// Summary of data a writer could not represent in its format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub ignored_comments: usize,
    pub ignored_literal_metadata: usize,
    pub ignored_resource_metadata: usize,
    /// Descriptions of further elements that were not written
    pub skipped: Vec<String>,
}

impl WriteReport {
    /// Whether everything provided by the adapters was written.
    pub fn is_lossless(&self) -> bool {
        self.ignored_comments == 0
            && self.ignored_literal_metadata == 0
            && self.ignored_resource_metadata == 0
            && self.skipped.is_empty()
    }

    /// Adds the counts of `other` to this report.
    pub fn merge(&mut self, other: WriteReport) {
        self.ignored_comments += other.ignored_comments;
        self.ignored_literal_metadata += other.ignored_literal_metadata;
        self.ignored_resource_metadata += other.ignored_resource_metadata;
        self.skipped.extend(other.skipped);
    }

    pub(crate) fn skip(&mut self, description: String) {
        self.skipped.push(description);
    }

    /// Logs a warning for every kind of lost data.
    pub(crate) fn log(&self, format: &str) {
        if self.ignored_comments > 0 {
            log::warn!("{format} writer ignored {} comment(s)", self.ignored_comments);
        }
        if self.ignored_literal_metadata > 0 {
            log::warn!(
                "{format} writer ignored {} literal metadata element(s)",
                self.ignored_literal_metadata
            );
        }
        if self.ignored_resource_metadata > 0 {
            log::warn!(
                "{format} writer ignored {} resource metadata element(s)",
                self.ignored_resource_metadata
            );
        }
        for skipped in &self.skipped {
            log::warn!("{format} writer skipped {skipped}");
        }
    }
}

// =#========================================================================#=
// DOCUMENT WRITER (Trait)
// =#========================================================================T=
/// Writer of a complete document.
pub trait DocumentWriter {
    /// Writes the document provided by `document`.
    ///
    /// # Returns
    /// A [WriteReport] listing the data that could not be written
    ///
    /// # Errors
    /// I/O errors and contract violations of the adapters
    fn write_document(
        &mut self,
        document: &dyn DocumentAdapter,
        parameters: &ReadWriteParameters,
    ) -> Result<WriteReport, WriteError>;
}
