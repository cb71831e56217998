//! Data model helpers: per-document ID management and an in-memory document
//! store that implements all [adapter](crate::adapters) contracts.
pub mod id_manager;
pub mod store;

pub use id_manager::{IdError, IdManager};
pub use store::{
    DocumentStore, StoreError, StoredElement, StoredElementList, StoredMatrix, StoredOtuList,
    StoredSequence, StoredTree, StoredTreeGroup,
};
