//! Content and topology tags of events.

use std::fmt;

// =#========================================================================#=
// CONTENT TYPE
// =#========================================================================€=
/// Tag distinguishing the kinds of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Document,
    OtuList,
    Otu,
    Alignment,
    Sequence,
    SequenceTokens,
    SingleSequenceToken,
    CharacterSet,
    CharacterSetInterval,
    CharacterDefinition,
    TokenSetDefinition,
    SingleTokenDefinition,
    TreeNetworkGroup,
    Tree,
    Network,
    Node,
    Edge,
    OtuSet,
    TreeNetworkSet,
    SetElement,
    Comment,
    LiteralMetadata,
    LiteralMetadataContent,
    ResourceMetadata,
    UnknownCommand,
}

impl ContentType {
    /// Whether events of this type never have children and therefore only
    /// occur with [TopologyType::Sole].
    pub fn is_sole(self) -> bool {
        matches!(
            self,
            ContentType::SequenceTokens
                | ContentType::SingleSequenceToken
                | ContentType::CharacterSetInterval
                | ContentType::SetElement
                | ContentType::Comment
                | ContentType::LiteralMetadataContent
                | ContentType::UnknownCommand
        )
    }

    /// Whether this is one of the metadata content types.
    pub fn is_metadata(self) -> bool {
        matches!(
            self,
            ContentType::LiteralMetadata
                | ContentType::LiteralMetadataContent
                | ContentType::ResourceMetadata
        )
    }

    /// Whether an event of this type may carry the given topology.
    pub fn allows(self, topology: TopologyType) -> bool {
        match topology {
            TopologyType::Sole => self.is_sole(),
            TopologyType::Start | TopologyType::End => !self.is_sole(),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =#========================================================================#=
// TOPOLOGY TYPE
// =#========================================================================€=
/// Whether an event opens a region, closes a region, or stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyType {
    Start,
    End,
    Sole,
}

impl fmt::Display for TopologyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
