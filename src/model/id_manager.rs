//! Per-document management of unique element IDs.

use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// Default ID prefixes
// ============================================================================
pub const DOCUMENT_ID_PREFIX: &str = "doc";
pub const OTU_LIST_ID_PREFIX: &str = "otus";
pub const OTU_ID_PREFIX: &str = "otu";
pub const MATRIX_ID_PREFIX: &str = "matrix";
pub const SEQUENCE_ID_PREFIX: &str = "seq";
pub const CHARACTER_SET_ID_PREFIX: &str = "charSet";
pub const CHARACTER_DEFINITION_ID_PREFIX: &str = "charDef";
pub const TOKEN_SET_ID_PREFIX: &str = "tokenSet";
pub const SINGLE_TOKEN_DEFINITION_ID_PREFIX: &str = "tokenDef";
pub const TREE_NETWORK_GROUP_ID_PREFIX: &str = "trees";
pub const TREE_ID_PREFIX: &str = "tree";
pub const NODE_ID_PREFIX: &str = "n";
pub const EDGE_ID_PREFIX: &str = "e";
pub const META_ID_PREFIX: &str = "meta";
pub const OTU_SET_ID_PREFIX: &str = "otuSet";
pub const TREE_SET_ID_PREFIX: &str = "treeSet";

/// Contract violation reported by the [IdManager].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("the ID '{0}' is already used in this document")]
    Duplicate(String),
}

// =#========================================================================#=
// ID MANAGER
// =#========================================================================$=
/// Issues IDs that are unique within one document session.
///
/// Generated IDs consist of a prefix and a counter shared by all prefixes, so
/// IDs of different content types never collide either.
///
/// # Example
/// ```
/// use phylostream::model::IdManager;
///
/// let mut ids = IdManager::new(false);
/// assert_eq!(ids.create_new_id("otu"), "otu1");
/// assert_eq!(ids.propose_id("kiwi").unwrap(), "kiwi");
/// assert!(ids.propose_id("otu1").is_err());
///
/// let mut replacing = IdManager::new(true);
/// replacing.propose_id("kiwi").unwrap();
/// assert_ne!(replacing.propose_id("kiwi").unwrap(), "kiwi");
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdManager {
    issued: HashSet<String>,
    counter: u64,
    replace_used_ids: bool,
}

impl IdManager {
    /// Creates a new manager.
    ///
    /// # Arguments
    /// * `replace_used_ids` - Whether [propose_id](Self::propose_id) substitutes a
    ///   generated ID for a used candidate instead of failing
    pub fn new(replace_used_ids: bool) -> Self {
        Self {
            issued: HashSet::new(),
            counter: 0,
            replace_used_ids,
        }
    }

    /// Returns a new ID `prefix` + number, unique in this document.
    ///
    /// The numeric suffix increases monotonically; numbers whose ID was
    /// already proposed explicitly are skipped.
    pub fn create_new_id(&mut self, prefix: &str) -> String {
        loop {
            self.counter += 1;
            let id = format!("{prefix}{}", self.counter);
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Registers `candidate` as an ID of this document.
    ///
    /// # Returns
    /// The candidate if it is unused, otherwise a generated replacement when
    /// replacing is enabled. The replacement uses the candidate's leading
    /// non-digit characters as prefix.
    ///
    /// # Errors
    /// [IdError::Duplicate] if the candidate is used and replacing is disabled.
    pub fn propose_id(&mut self, candidate: &str) -> Result<String, IdError> {
        if self.issued.insert(candidate.to_string()) {
            return Ok(candidate.to_string());
        }

        if self.replace_used_ids {
            let prefix = candidate.trim_end_matches(|c: char| c.is_ascii_digit());
            let prefix = if prefix.is_empty() { "id" } else { prefix };
            Ok(self.create_new_id(prefix))
        } else {
            Err(IdError::Duplicate(candidate.to_string()))
        }
    }

    /// Whether `id` was issued or proposed in this document.
    pub fn is_issued(&self, id: &str) -> bool {
        self.issued.contains(id)
    }

    /// Number of IDs issued so far.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Forgets all issued IDs, e.g. before the next document.
    pub fn reset(&mut self) {
        self.issued.clear();
        self.counter = 0;
    }
}
