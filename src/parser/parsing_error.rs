//! Error types for reading Nexus documents and Newick strings.
//!
//! This module provides [ParsingError] and [ParsingErrorType] for representing
//! and reporting errors that occur while reading phylogenetic documents.

use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Default length of context provided by error from parser
const DEFAULT_CONTEXT_LENGTH: usize = 50;

// =#========================================================================#=
// POSITION
// =#========================================================================€=
/// Position in a text input, with 1-based line and column numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the start of the input
    pub byte: usize,
    /// Line number, starting at 1
    pub line: usize,
    /// Column number (in bytes), starting at 1
    pub column: usize,
}

impl Position {
    /// Position of the first byte of an input.
    pub fn start() -> Self {
        Self {
            byte: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {} (byte {})", self.line, self.column, self.byte)
    }
}

// =#========================================================================#=
// PARSING ERROR TYPE
// =#========================================================================€=
/// Error types that can occur while reading Nexus and Newick input.
///
/// Syntax errors describe malformed input. [UnsupportedFeature](Self::UnsupportedFeature)
/// and [UndefinedElementCount](Self::UndefinedElementCount) describe valid
/// constructs that cannot be processed, [DuplicateId](Self::DuplicateId)
/// is a contract violation.
#[derive(Error, PartialEq, Debug, Clone)]
pub enum ParsingErrorType {
    #[error("IO error - {0}")]
    IoError(String),
    #[error("Unexpected end of file - {0}")]
    UnexpectedEof(String),
    #[error("File does not start with #NEXUS header")]
    MissingNexusHeader,
    #[error("Invalid block structure - {0}")]
    InvalidBlockStructure(String),
    #[error("Illegal character - {0}")]
    IllegalCharacter(String),
    #[error("Invalid integer - {0}")]
    InvalidInteger(String),
    #[error("Unclosed comment")]
    UnclosedComment,
    #[error("Invalid newick string: {0}")]
    InvalidNewickString(String),
    #[error("Could not resolve label - {0}")]
    UnresolvedLabel(String),
    #[error("Number of elements is currently undefined - {0}")]
    UndefinedElementCount(String),
    #[error("Unsupported feature - {0}")]
    UnsupportedFeature(String),
    #[error("Duplicate ID - {0}")]
    DuplicateId(String),
    #[error("Reader was closed")]
    ReaderClosed,
}

impl ParsingErrorType {
    /// Whether this error describes malformed input (as opposed to an
    /// unsupported construct, an I/O problem or a contract violation).
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            ParsingErrorType::UnexpectedEof(_)
                | ParsingErrorType::MissingNexusHeader
                | ParsingErrorType::InvalidBlockStructure(_)
                | ParsingErrorType::IllegalCharacter(_)
                | ParsingErrorType::InvalidInteger(_)
                | ParsingErrorType::UnclosedComment
                | ParsingErrorType::InvalidNewickString(_)
                | ParsingErrorType::UnresolvedLabel(_)
        )
    }
}

// =#========================================================================#=
// PARSING ERROR
// =#========================================================================$=
/// Parsing error with contextual information (format, position and
/// surrounding bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsingError {
    kind: ParsingErrorType,
    format: Option<&'static str>,
    position: Position,
    context: String,
}

impl ParsingError {
    /// Create a ParsingError from an error type and parser state
    pub fn from_parser<S: ByteSource>(kind: ParsingErrorType, parser: &mut ByteParser<S>) -> Self {
        Self {
            kind,
            format: None,
            position: parser.position(),
            context: parser.get_context_as_string(DEFAULT_CONTEXT_LENGTH),
        }
    }

    /// Convenience constructor for UnexpectedEof
    pub fn unexpected_eof<S: ByteSource>(parser: &mut ByteParser<S>, msg: impl Into<String>) -> Self {
        Self::from_parser(ParsingErrorType::UnexpectedEof(msg.into()), parser)
    }

    /// Convenience constructor for MissingNexusHeader
    pub fn missing_nexus_header<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::MissingNexusHeader, parser)
    }

    /// Convenience constructor for InvalidBlockStructure
    pub fn invalid_block_structure<S: ByteSource>(parser: &mut ByteParser<S>, msg: impl Into<String>) -> Self {
        Self::from_parser(ParsingErrorType::InvalidBlockStructure(msg.into()), parser)
    }

    /// Convenience constructor for IllegalCharacter
    pub fn illegal_character<S: ByteSource>(parser: &mut ByteParser<S>, msg: impl Into<String>) -> Self {
        Self::from_parser(ParsingErrorType::IllegalCharacter(msg.into()), parser)
    }

    /// Convenience constructor for InvalidInteger
    pub fn invalid_integer<S: ByteSource>(parser: &mut ByteParser<S>, msg: impl Into<String>) -> Self {
        Self::from_parser(ParsingErrorType::InvalidInteger(msg.into()), parser)
    }

    /// Convenience constructor for UnclosedComment
    pub fn unclosed_comment<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::UnclosedComment, parser)
    }

    /// Convenience constructor for InvalidNewickString
    pub fn invalid_newick_string<S: ByteSource>(parser: &mut ByteParser<S>, msg: impl Into<String>) -> Self {
        Self::from_parser(ParsingErrorType::InvalidNewickString(msg.into()), parser)
    }

    /// Convenience constructor for UnresolvedLabel
    pub fn unresolved_label<S: ByteSource>(parser: &mut ByteParser<S>, msg: impl Into<String>) -> Self {
        Self::from_parser(ParsingErrorType::UnresolvedLabel(msg.into()), parser)
    }

    /// Convenience constructor for UndefinedElementCount
    pub fn undefined_element_count<S: ByteSource>(parser: &mut ByteParser<S>, msg: impl Into<String>) -> Self {
        Self::from_parser(ParsingErrorType::UndefinedElementCount(msg.into()), parser)
    }

    /// Convenience constructor for UnsupportedFeature
    pub fn unsupported_feature<S: ByteSource>(parser: &mut ByteParser<S>, msg: impl Into<String>) -> Self {
        Self::from_parser(ParsingErrorType::UnsupportedFeature(msg.into()), parser)
    }

    /// Create a ParsingError without parser context (e.g. for builder or
    /// reader state errors)
    pub fn without_context(kind: ParsingErrorType) -> Self {
        Self {
            kind,
            format: None,
            position: Position::default(),
            context: String::new(),
        }
    }

    /// Sets the name of the format whose reader raised this error,
    /// keeping an already set name.
    pub fn in_format(mut self, format: &'static str) -> Self {
        self.format.get_or_insert(format);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> &ParsingErrorType {
        &self.kind
    }

    /// Get the name of the format being read, if known
    pub fn format(&self) -> Option<&'static str> {
        self.format
    }

    /// Get the position where the error occurred
    pub fn position(&self) -> Position {
        self.position
    }

    /// Get the input following the error position
    pub fn context(&self) -> &str {
        &self.context
    }
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(format) = self.format {
            write!(f, "[{format}] ")?;
        }

        // Main error message
        write!(f, "{}", self.kind)?;

        // Additional position information
        if self.position.line > 0 {
            write!(f, " at {}", self.position)?;
        }

        // Additional context if available
        if !self.context.is_empty() {
            write!(f, "\n  Context (next {} bytes): {}", self.context.len(), self.context)?;
        }

        Ok(())
    }
}

impl Error for ParsingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<std::io::Error> for ParsingError {
    fn from(err: std::io::Error) -> Self {
        ParsingError::without_context(ParsingErrorType::IoError(err.to_string()))
    }
}
