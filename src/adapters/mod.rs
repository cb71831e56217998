//! Contracts through which writers pull the data of a document.
//!
//! Writers do not depend on a data model. The application implements these
//! traits for its own model (or uses the [DocumentStore](crate::model::DocumentStore)),
//! and the writer asks each adapter for start events and lets it send the
//! content of its elements to an [EventReceiver].
//!
//! All ID lists must be deterministic: repeated calls return the same IDs in
//! the same order. Asking an adapter for an ID it did not list is a contract
//! violation reported as [WriteError::UnknownId].

use crate::events::{ContentType, EdgeEvent, LabeledId, LinkedLabeledId, StartEvent};
use crate::receiver::EventReceiver;
use crate::writer::WriteError;

// =#========================================================================#=
// OBJECT LIST ADAPTER (Trait)
// =#========================================================================T=
/// List of elements of one kind, e.g. the OTUs of an OTU list or the
/// character sets of a matrix.
pub trait ObjectListAdapter {
    /// IDs of all elements, possibly empty.
    fn ids(&self) -> Vec<String>;

    /// Start event of the element `id`.
    ///
    /// # Errors
    /// [WriteError::UnknownId] if `id` is not listed
    fn object_start_event(&self, id: &str) -> Result<StartEvent, WriteError>;

    /// Sends the events between start and end of the element `id`, e.g. its
    /// metadata, intervals or set elements.
    ///
    /// # Errors
    /// [WriteError::UnknownId] if `id` is not listed, and errors of `receiver`
    fn write_content_data(&self, receiver: &mut dyn EventReceiver, id: &str) -> Result<(), WriteError>;

    fn count(&self) -> usize {
        self.ids().len()
    }
}

/// [ObjectListAdapter] without elements of the given content type.
#[derive(Debug, Clone, Copy)]
pub struct EmptyObjectList(pub ContentType);

impl ObjectListAdapter for EmptyObjectList {
    fn ids(&self) -> Vec<String> {
        Vec::new()
    }

    fn object_start_event(&self, id: &str) -> Result<StartEvent, WriteError> {
        Err(WriteError::unknown_id(self.0, id))
    }

    fn write_content_data(&self, _receiver: &mut dyn EventReceiver, id: &str) -> Result<(), WriteError> {
        Err(WriteError::unknown_id(self.0, id))
    }
}

static NO_OTU_SETS: EmptyObjectList = EmptyObjectList(ContentType::OtuSet);
static NO_TOKEN_SETS: EmptyObjectList = EmptyObjectList(ContentType::TokenSetDefinition);
static NO_CHARACTER_SETS: EmptyObjectList = EmptyObjectList(ContentType::CharacterSet);
static NO_CHARACTER_DEFINITIONS: EmptyObjectList = EmptyObjectList(ContentType::CharacterDefinition);
static NO_TREE_NETWORK_SETS: EmptyObjectList = EmptyObjectList(ContentType::TreeNetworkSet);

// =#========================================================================#=
// DOCUMENT ADAPTER (Trait)
// =#========================================================================T=
/// Root adapter of a document.
pub trait DocumentAdapter {
    fn start_event(&self) -> LabeledId;

    /// Sends metadata and comments attached to the document.
    fn write_metadata(&self, _receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        Ok(())
    }

    fn otu_lists(&self) -> Vec<&dyn OtuListAdapter>;

    fn matrices(&self) -> Vec<&dyn MatrixAdapter>;

    fn tree_network_groups(&self) -> Vec<&dyn TreeNetworkGroupAdapter>;
}

// =#========================================================================#=
// OTU LIST ADAPTER (Trait)
// =#========================================================================T=
/// OTU list with its OTUs and OTU sets.
pub trait OtuListAdapter {
    fn start_event(&self) -> LabeledId;

    fn write_metadata(&self, _receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        Ok(())
    }

    /// The OTUs, with [StartEvent::Otu] start events.
    fn otus(&self) -> &dyn ObjectListAdapter;

    /// The OTU sets, with [StartEvent::OtuSet] start events and set elements
    /// as content.
    fn otu_sets(&self) -> &dyn ObjectListAdapter {
        &NO_OTU_SETS
    }
}

// =#========================================================================#=
// MATRIX ADAPTER (Trait)
// =#========================================================================T=
/// Character matrix (alignment).
pub trait MatrixAdapter {
    /// Start event, linked to the OTU list of the sequences.
    fn start_event(&self) -> LinkedLabeledId;

    fn write_metadata(&self, _receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        Ok(())
    }

    /// Number of columns, `None` if the sequences differ in length.
    fn column_count(&self) -> Option<u64>;

    /// Whether any token is longer than one character.
    fn contains_long_tokens(&self) -> bool;

    /// Token set definitions, with [StartEvent::TokenSetDefinition] start
    /// events and single token definitions as content.
    fn token_sets(&self) -> &dyn ObjectListAdapter {
        &NO_TOKEN_SETS
    }

    /// Character sets, with [StartEvent::CharacterSet] start events and
    /// intervals as content.
    fn character_sets(&self) -> &dyn ObjectListAdapter {
        &NO_CHARACTER_SETS
    }

    /// Names of columns, with [StartEvent::CharacterDefinition] start events.
    fn character_definitions(&self) -> &dyn ObjectListAdapter {
        &NO_CHARACTER_DEFINITIONS
    }

    fn sequence_ids(&self) -> Vec<String>;

    /// Start event of sequence `id`, linked to its OTU.
    ///
    /// # Errors
    /// [WriteError::UnknownId] if `id` is not listed
    fn sequence_start_event(&self, id: &str) -> Result<LinkedLabeledId, WriteError>;

    /// Number of tokens of sequence `id`.
    ///
    /// # Errors
    /// [WriteError::UnknownId] if `id` is not listed
    fn sequence_length(&self, id: &str) -> Result<u64, WriteError>;

    /// Sends the tokens of the columns `[start, end)` of sequence `id`.
    ///
    /// Writers may request windows of different sequences in any order, e.g.
    /// to write interleaved matrices. Columns beyond the end of the sequence
    /// are omitted.
    ///
    /// # Errors
    /// [WriteError::UnknownId] if `id` is not listed, and errors of `receiver`
    fn write_sequence_part(
        &self,
        receiver: &mut dyn EventReceiver,
        id: &str,
        start: u64,
        end: u64,
    ) -> Result<(), WriteError>;

    /// Sends metadata and comments attached to sequence `id`.
    fn write_sequence_metadata(&self, _receiver: &mut dyn EventReceiver, _id: &str) -> Result<(), WriteError> {
        Ok(())
    }
}

// =#========================================================================#=
// TREE NETWORK GROUP ADAPTER (Trait)
// =#========================================================================T=
/// Group of trees and networks sharing an OTU list.
pub trait TreeNetworkGroupAdapter {
    /// Start event, linked to the OTU list of the node OTUs.
    fn start_event(&self) -> LinkedLabeledId;

    fn write_metadata(&self, _receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        Ok(())
    }

    fn trees_and_networks(&self) -> Vec<&dyn TreeNetworkAdapter>;

    /// Tree/network sets, with [StartEvent::TreeNetworkSet] start events and
    /// set elements as content.
    fn tree_network_sets(&self) -> &dyn ObjectListAdapter {
        &NO_TREE_NETWORK_SETS
    }
}

// =#========================================================================#=
// TREE NETWORK ADAPTER (Trait)
// =#========================================================================T=
/// A single tree or network.
pub trait TreeNetworkAdapter {
    /// Whether this is a tree (as opposed to a network).
    fn is_tree(&self) -> bool;

    fn start_event(&self) -> LabeledId;

    fn write_metadata(&self, _receiver: &mut dyn EventReceiver) -> Result<(), WriteError> {
        Ok(())
    }

    fn node_ids(&self) -> Vec<String>;

    /// # Errors
    /// [WriteError::UnknownId] if `id` is not listed
    fn node_start_event(&self, id: &str) -> Result<LinkedLabeledId, WriteError>;

    /// Sends metadata and comments attached to node `id`.
    fn write_node_content(&self, receiver: &mut dyn EventReceiver, id: &str) -> Result<(), WriteError>;

    fn edge_ids(&self) -> Vec<String>;

    /// # Errors
    /// [WriteError::UnknownId] if `id` is not listed
    fn edge_start_event(&self, id: &str) -> Result<EdgeEvent, WriteError>;

    /// Sends metadata and comments attached to edge `id`.
    fn write_edge_content(&self, receiver: &mut dyn EventReceiver, id: &str) -> Result<(), WriteError>;

    /// IDs of the edges without source node, leading to a root.
    fn root_edge_ids(&self) -> Result<Vec<String>, WriteError> {
        let mut roots = Vec::new();
        for id in self.edge_ids() {
            if self.edge_start_event(&id)?.source_id.is_none() {
                roots.push(id);
            }
        }
        Ok(roots)
    }
}
