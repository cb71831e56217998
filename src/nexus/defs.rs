//! Nexus format constants and definitions.
//!
//! This module contains byte string constants for reading and writing
//! Nexus files, as well as the enum of known Nexus blocks.

use crate::events::ContentType;
use std::fmt;

/// Nexus file header "#NEXUS"
pub(crate) const NEXUS_HEADER: &[u8] = b"#NEXUS";

/// Block begin keyword
pub(crate) const BEGIN: &str = "BEGIN";

/// Block end keyword
pub(crate) const END: &str = "END";

/// Alternative block end keyword
pub(crate) const END_BLOCK: &str = "ENDBLOCK";

/// Command terminator
pub(crate) const COMMAND_END: u8 = b';';

/// Comment delimiters
pub(crate) const COMMENT_START: u8 = b'[';

/// Key value separator in subcommands
pub(crate) const KEY_VALUE_SEPARATOR: u8 = b'=';

/// Quote character of words
pub(crate) const WORD_QUOTE: u8 = b'\'';

/// Delimiter of values containing whitespace (e.g. `SYMBOLS="A B C"`)
pub(crate) const VALUE_DELIMITER: u8 = b'"';

/// Range separator in set definitions
pub(crate) const SET_TO: u8 = b'-';

/// Stride separator in set definitions
pub(crate) const SET_STRIDE: u8 = b'\\';

/// Symbol for the last element in set definitions
pub(crate) const SET_LAST: u8 = b'.';

/// Delimited token containing alternative states present at once
pub(crate) const POLYMORPHIC_TOKEN_START: u8 = b'(';
pub(crate) const POLYMORPHIC_TOKEN_END: u8 = b')';

/// Delimited token containing alternative states of which one is present
pub(crate) const UNCERTAIN_TOKEN_START: u8 = b'{';
pub(crate) const UNCERTAIN_TOKEN_END: u8 = b'}';

/// Vector format flags
pub(crate) const SET_CONTAINED: u8 = b'1';
pub(crate) const SET_NOT_CONTAINED: u8 = b'0';

/// Separator of the entries of a CHARSTATELABELS command
pub(crate) const ELEMENT_SEPARATOR: u8 = b',';

/// Separator of a character name and its state names in CHARSTATELABELS
pub(crate) const CHARACTER_NAME_STATES_SEPARATOR: u8 = b'/';

/// Bytes ending an unquoted word
pub(crate) const WORD_DELIMITERS: &[u8] = b" \t\r\n;=,[]()\"'{}";

// Block names, as written
pub(crate) const TAXA: &str = "TAXA";
pub(crate) const CHARACTERS: &str = "CHARACTERS";
pub(crate) const UNALIGNED: &str = "UNALIGNED";
pub(crate) const TREES: &str = "TREES";
pub(crate) const SETS: &str = "SETS";

// Commands
pub(crate) const TITLE: &str = "TITLE";
pub(crate) const LINK: &str = "LINK";
pub(crate) const DIMENSIONS: &str = "DIMENSIONS";
pub(crate) const TAXLABELS: &str = "TAXLABELS";
pub(crate) const FORMAT: &str = "FORMAT";
pub(crate) const MATRIX: &str = "MATRIX";
pub(crate) const CHARLABELS: &str = "CHARLABELS";
pub(crate) const CHARSTATELABELS: &str = "CHARSTATELABELS";
pub(crate) const CHARSET: &str = "CHARSET";
pub(crate) const TAXSET: &str = "TAXSET";
pub(crate) const TREESET: &str = "TREESET";
pub(crate) const TRANSLATE: &str = "TRANSLATE";
pub(crate) const TREE: &str = "TREE";

// Subcommands and values
pub(crate) const NTAX: &str = "NTAX";
pub(crate) const NCHAR: &str = "NCHAR";
pub(crate) const NEWTAXA: &str = "NEWTAXA";
pub(crate) const DATATYPE: &str = "DATATYPE";
pub(crate) const MIXED: &str = "MIXED";
pub(crate) const GAP: &str = "GAP";
pub(crate) const MISSING: &str = "MISSING";
pub(crate) const MATCHCHAR: &str = "MATCHCHAR";
pub(crate) const SYMBOLS: &str = "SYMBOLS";
pub(crate) const TOKENS: &str = "TOKENS";
pub(crate) const NOTOKENS: &str = "NOTOKENS";
pub(crate) const INTERLEAVE: &str = "INTERLEAVE";
pub(crate) const LABELS: &str = "LABELS";
pub(crate) const NOLABELS: &str = "NOLABELS";
pub(crate) const TRANSPOSE: &str = "TRANSPOSE";
pub(crate) const STANDARD: &str = "STANDARD";
pub(crate) const VECTOR: &str = "VECTOR";
pub(crate) const ALL: &str = "ALL";
pub(crate) const REMAINING: &str = "REMAINING";
pub(crate) const NO: &str = "NO";

/// Predicate namespace of metadata created from unknown subcommands
pub(crate) const NEXUS_PREDICATE_PREFIX: &str = "nexus:";

// =#========================================================================#=
// NEXUS BLOCK
// =#========================================================================€=
/// Nexus block types
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum NexusBlock {
    Taxa,
    Characters,
    Data,
    Unaligned,
    Sets,
    Assumptions,
    Trees,
    UnknownBlock(String),
}

impl NexusBlock {
    /// Parse a block name (case-insensitive) into a NexusBlock variant
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "TAXA" => NexusBlock::Taxa,
            "CHARACTERS" => NexusBlock::Characters,
            "DATA" => NexusBlock::Data,
            "UNALIGNED" => NexusBlock::Unaligned,
            "SETS" => NexusBlock::Sets,
            "ASSUMPTIONS" => NexusBlock::Assumptions,
            "TREES" => NexusBlock::Trees,
            _ => NexusBlock::UnknownBlock(name.to_string()),
        }
    }

    /// Upper case name of this block, as used as registry key.
    pub fn name(&self) -> String {
        match self {
            NexusBlock::Taxa => "TAXA".to_string(),
            NexusBlock::Characters => "CHARACTERS".to_string(),
            NexusBlock::Data => "DATA".to_string(),
            NexusBlock::Unaligned => "UNALIGNED".to_string(),
            NexusBlock::Sets => "SETS".to_string(),
            NexusBlock::Assumptions => "ASSUMPTIONS".to_string(),
            NexusBlock::Trees => "TREES".to_string(),
            NexusBlock::UnknownBlock(name) => name.to_ascii_uppercase(),
        }
    }

    /// Content type of the container element this block represents, if any.
    pub fn container(&self) -> Option<ContentType> {
        match self {
            NexusBlock::Taxa => Some(ContentType::OtuList),
            NexusBlock::Characters | NexusBlock::Data | NexusBlock::Unaligned => {
                Some(ContentType::Alignment)
            }
            NexusBlock::Trees => Some(ContentType::TreeNetworkGroup),
            _ => None,
        }
    }

    /// Name under which other blocks refer to this one with `LINK`.
    ///
    /// DATA and UNALIGNED blocks are linked as CHARACTERS.
    pub fn link_name(&self) -> Option<&'static str> {
        match self {
            NexusBlock::Taxa => Some("TAXA"),
            NexusBlock::Characters | NexusBlock::Data | NexusBlock::Unaligned => Some("CHARACTERS"),
            NexusBlock::Trees => Some("TREES"),
            _ => None,
        }
    }

    /// Normalizes the block type named in a `LINK` command.
    pub(crate) fn normalize_link_name(name: &str) -> String {
        match NexusBlock::from_name(name).link_name() {
            Some(link_name) => link_name.to_string(),
            None => name.to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for NexusBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
