//! Low-level byte-by-byte parser for text formats.
//!
//! This module provides [ByteParser] for parsing text-based file formats with
//! support for peeking, consuming, pattern matching, nested comments and
//! quote-aware label parsing. It keeps track of line and column numbers for
//! error reporting and is the foundation for both the Nexus and the Newick
//! readers.

use crate::parser::buffered_byte_source::BufferedByteSource;
use crate::parser::byte_source::ByteSource;
use crate::parser::in_memory_byte_source::InMemoryByteSource;
use crate::parser::parsing_error::{ParsingError, ParsingErrorType, Position};
use std::fs::File;
use std::io::Read;
use std::path::Path;

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================#=
/// A byte-by-byte parser with support for peeking, consuming, and pattern matching.
///
/// [ByteParser] provides parsing operations for text-based formats, specifically
/// targeting Newick and Nexus. It operates on byte sources, offering peek,
/// consume, and skip operations with case-insensitive matching for ASCII.
/// Labels are decoded as UTF-8 (invalid sequences are replaced).
///
/// # Example
/// ```
/// use phylostream::parser::ByteParser;
///
/// let mut parser = ByteParser::for_str("BEGIN TREES;\n  TREE t1 = (A:1.0,B:1.0):0.0;");
///
/// assert!(parser.consume_if_sequence(b"begin"));
/// parser.skip_whitespace();
/// assert!(parser.peek_is_sequence(b"TREES"));
/// assert_eq!(parser.position().column, 7);
/// ```
pub struct ByteParser<S: ByteSource> {
    source: S,
    line: usize,
    column: usize,
}

impl ByteParser<InMemoryByteSource> {
    /// Creates a new `ByteParser` from a string slice by copying it into a Vec.
    pub fn for_str(input: &str) -> Self {
        Self::for_bytes(input.as_bytes())
    }

    /// Creates a new `ByteParser` from a byte slice by copying it into a Vec.
    pub fn for_bytes(input: &[u8]) -> Self {
        Self::new(InMemoryByteSource::from_vec(input.to_vec()))
    }

    /// Creates a new `ByteParser` reading the whole file into memory.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub fn from_file_in_memory<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::new(InMemoryByteSource::from_file(path)?))
    }
}

impl ByteParser<BufferedByteSource<File>> {
    /// Creates a new `ByteParser` streaming the file through a buffer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn from_file_buffered<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::new(BufferedByteSource::from_file(path)?))
    }
}

impl<R: Read> ByteParser<BufferedByteSource<R>> {
    /// Creates a new `ByteParser` streaming from any reader.
    pub fn from_reader(reader: R) -> Self {
        Self::new(BufferedByteSource::from_reader(reader))
    }
}

impl<S: ByteSource> ByteParser<S> {
    /// Creates a new `ByteParser` from a byte source.
    pub fn new(source: S) -> Self {
        Self {
            source,
            line: 1,
            column: 1,
        }
    }

    /// Peeks at the current byte without consuming it.
    ///
    /// # Returns
    /// * `Some(u8)` - The current byte if available
    /// * `None` - If at end of data (EOF)
    #[inline(always)]
    pub fn peek(&mut self) -> Option<u8> {
        self.source.peek()
    }

    /// Gets the current byte and advances the position (consumes it).
    ///
    /// # Returns
    /// * `Some(u8)` - The current byte if available
    /// * `None` - If at end of data (EOF)
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.source.next_byte()?;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    /// Whether `b` is whitespace: space, tab, newline or carriage return.
    #[inline(always)]
    pub fn is_whitespace(b: u8) -> bool {
        b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
    }

    /// Skips (consumes) all consecutive whitespace characters.
    ///
    /// Whitespace includes: space (' '), tab ('\t'), newline ('\n'), and carriage return ('\r').
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if Self::is_whitespace(b) {
                self.next_byte();
            } else {
                break;
            }
        }
    }

    /// Skips whitespace except line breaks.
    ///
    /// # Returns
    /// `true` if the parser now stands at a line break
    pub fn skip_whitespace_in_line(&mut self) -> bool {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' => {
                    self.next_byte();
                }
                b'\r' | b'\n' => return true,
                _ => return false,
            }
        }
        false
    }

    /// Skips (consumes) a Nexus-style comment if present.
    ///
    /// Comments are enclosed in square brackets `[...]` and may be nested.
    ///
    /// # Returns
    /// * `Ok(true)` - A comment was found and consumed
    /// * `Ok(false)` - No comment at current position
    ///
    /// # Errors
    /// Returns an error if a comment starts with `[` but doesn't have a closing `]`.
    pub fn skip_comment(&mut self) -> Result<bool, ParsingError> {
        if self.consume_if(b'[') {
            self.read_comment_body(usize::MAX)?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Skips (consumes) all consecutive whitespace and comments.
    ///
    /// # Errors
    /// Returns an error if an unclosed comment is encountered.
    pub fn skip_comment_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();

        while self.skip_comment()? {
            self.skip_whitespace();
        }

        Ok(())
    }

    /// Reads the content of a comment whose opening `[` was already consumed,
    /// up to and including the matching `]`.
    ///
    /// Nested comments are kept verbatim (including their brackets).
    /// Content beyond `max_length` bytes is consumed but not returned.
    ///
    /// # Errors
    /// Returns an error if the end of input is reached before the comment is closed.
    pub fn read_comment_body(&mut self, max_length: usize) -> Result<String, ParsingError> {
        let mut depth = 1usize;
        let mut content = Vec::new();
        loop {
            let Some(b) = self.next_byte() else {
                return Err(ParsingError::unclosed_comment(self));
            };
            match b {
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            if content.len() < max_length {
                content.push(b);
            }
        }
        Ok(String::from_utf8_lossy(&content).into_owned())
    }

    /// Checks if the current byte matches the target byte (case-insensitive for ASCII).
    pub fn peek_is(&mut self, ch: u8) -> bool {
        match self.peek() {
            Some(b) => b.eq_ignore_ascii_case(&ch),
            None => false,
        }
    }

    /// Checks if the following bytes match the given byte sequence (case-insensitive).
    ///
    /// This is a peek operation, the parser position is not changed.
    #[inline]
    pub fn peek_is_sequence(&mut self, sequence: &[u8]) -> bool {
        let context = self.source.peek_slice(sequence.len());
        context.len() == sequence.len() && context.eq_ignore_ascii_case(sequence)
    }

    /// Consumes the current byte if it matches the target byte (case-insensitive).
    ///
    /// # Returns
    /// `true` if the byte was matched and consumed, `false` otherwise
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek_is(ch) {
            self.next_byte();
            true
        } else {
            false
        }
    }

    /// Consumes the next bytes if they match the given byte sequence (case-insensitive).
    ///
    /// # Returns
    /// `true` if the sequence was matched and consumed, `false` otherwise
    pub fn consume_if_sequence(&mut self, sequence: &[u8]) -> bool {
        if !self.peek_is_sequence(sequence) {
            return false;
        }

        for _ in 0..sequence.len() {
            self.next_byte();
        }

        true
    }

    /// Consumes bytes until the target byte is found.
    ///
    /// # Arguments
    /// * `target` - The byte to search for
    /// * `mode` - Whether to consume the target byte (`Inclusive`) or stop before it (`Exclusive`)
    ///
    /// # Returns
    /// `true` if the target was found, `false` if EOF was reached first
    pub fn consume_until(&mut self, target: u8, mode: ConsumeMode) -> bool {
        while let Some(b) = self.peek() {
            if b == target {
                if mode == ConsumeMode::Inclusive {
                    self.next_byte();
                }
                return true;
            }
            self.next_byte();
        }
        false
    }

    /// Consumes bytes until any of the target bytes is found.
    ///
    /// # Returns
    /// `Some(u8)` with the found byte, or `None` if EOF was reached first
    pub fn consume_until_any(&mut self, targets: &[u8], mode: ConsumeMode) -> Option<u8> {
        while let Some(b) = self.peek() {
            if targets.contains(&b) {
                if mode == ConsumeMode::Inclusive {
                    self.next_byte();
                }
                return Some(b);
            }

            self.next_byte();
        }
        None
    }

    /// Returns whether the end of data (EOF) has been reached.
    pub fn is_eof(&mut self) -> bool {
        self.source.is_eof()
    }

    /// Returns the current parser position in the input.
    pub fn position(&self) -> Position {
        Position {
            byte: self.source.position(),
            line: self.line,
            column: self.column,
        }
    }

    /// Returns an error if the underlying source hit an I/O error.
    ///
    /// Sources report I/O failures as end of data, so callers reaching an
    /// unexpected end should check this first.
    pub fn check_io(&mut self) -> Result<(), ParsingError> {
        match self.source.take_io_error() {
            Some(e) => Err(ParsingError::from_parser(ParsingErrorType::IoError(e.to_string()), self)),
            None => Ok(()),
        }
    }

    /// Returns a string from up to `k` bytes from the current position for error context.
    ///
    /// Invalid UTF-8 sequences are replaced with the Unicode replacement character.
    pub fn get_context_as_string(&mut self, k: usize) -> String {
        let context_bytes = self.source.get_context(k);
        String::from_utf8_lossy(&context_bytes).into_owned()
    }

    /// Parses a label (quoted or unquoted) with the given delimiter set.
    ///
    /// This method automatically detects whether the label is quoted (single quotes)
    /// or unquoted and calls the appropriate parser method.
    ///
    /// # Arguments
    /// * `delimiters` - Byte array of characters that end an unquoted label
    ///
    /// # Errors
    /// Returns an error if a comment or the quoted label is not closed
    pub fn parse_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        self.skip_comment_and_whitespace()?;

        if self.peek() == Some(b'\'') {
            self.parse_quoted_label()
        } else {
            self.parse_unquoted_label(delimiters)
        }
    }

    /// Parses a quoted label enclosed in single quotes with escape support.
    ///
    /// Assumes the opening quote has not been consumed yet. Single quotes within
    /// the label are escaped by doubling them (e.g., `'Wilson''s'` becomes `Wilson's`).
    ///
    /// # Errors
    /// Returns an error if the quoted label is not closed before the end of input
    pub fn parse_quoted_label(&mut self) -> Result<String, ParsingError> {
        self.parse_delimited_label(b'\'')
    }

    /// Parses a label enclosed in `quote` characters, where a doubled quote
    /// stands for the quote character itself.
    pub(crate) fn parse_delimited_label(&mut self, quote: u8) -> Result<String, ParsingError> {
        self.next_byte(); // consume opening quote

        let mut label = Vec::new();
        loop {
            match self.next_byte() {
                Some(b) if b == quote => {
                    if self.peek() == Some(quote) {
                        label.push(quote);
                        self.next_byte();
                    } else {
                        break;
                    }
                }
                Some(b) => label.push(b),
                None => return Err(ParsingError::unexpected_eof(self, "unterminated quoted label")),
            }
        }

        Ok(String::from_utf8_lossy(&label).into_owned())
    }

    /// Parses an unquoted label until any of the given delimiters is encountered.
    ///
    /// # Errors
    /// Currently does not return errors, but returns `Result` for API consistency
    pub fn parse_unquoted_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        let mut label = Vec::new();

        while let Some(b) = self.peek() {
            if delimiters.contains(&b) {
                break;
            }
            label.push(b);
            self.next_byte();
        }

        Ok(String::from_utf8_lossy(&label).into_owned())
    }
}

/// Specifies whether to consume or leave the target when using `consume_until` methods.
///
/// # Examples
/// ```
/// use phylostream::parser::byte_parser::{ByteParser, ConsumeMode};
///
/// let mut parser = ByteParser::for_str("TREE t1=((A:0.5,B:0.5):0.3,C:0.8):0.0");
///
/// // Inclusive: consume up to and including '=', e.g. to start of Newick string
/// parser.consume_until(b'=', ConsumeMode::Inclusive);
/// assert_eq!(parser.peek(), Some(b'('));
///
/// let mut parser = ByteParser::for_str("('Wilson''s_Storm-petrel')");
///
/// // Exclusive: consume up to but not including "'"
/// parser.consume_until(b'\'', ConsumeMode::Exclusive);
/// assert_eq!(parser.peek(), Some(b'\''));
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConsumeMode {
    /// Consume the target byte along with everything before it.
    Inclusive,

    /// Stop before the target byte without consuming it.
    Exclusive,
}
