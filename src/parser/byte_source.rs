//! Byte source abstractions for parsing.
//!
//! This module provides the [ByteSource] trait, which hides whether the
//! bytes of a document live completely in memory or are streamed from a
//! reader. All access is forward-only.

// =#========================================================================#=
// BYTE SOURCE (Trait)
// =#========================================================================T=
/// Trait defining the interface for different byte sources used by
/// [ByteParser](crate::parser::ByteParser).
///
/// This trait abstracts over different ways of accessing byte data:
/// - In-memory byte vectors ([InMemoryByteSource](crate::parser::InMemoryByteSource))
/// - Buffered reading from any [Read](std::io::Read) implementation
///   ([BufferedByteSource](crate::parser::BufferedByteSource))
///
/// By using this trait, the same parser logic can work with both small files
/// loaded entirely into memory and large files streamed from disk.
pub trait ByteSource {
    /// Peek at the current byte without consuming it.
    ///
    /// # Returns
    /// * `Some(u8)` - The current byte if available
    /// * `None` - If at end of data (EOF)
    fn peek(&mut self) -> Option<u8>;

    /// Get the current byte and advance the position (consume it).
    ///
    /// # Returns
    /// * `Some(u8)` - The current byte if available
    /// * `None` - If at end of data (EOF)
    fn next_byte(&mut self) -> Option<u8>;

    /// Returns a slice of up to `k` bytes from the current position without
    /// consuming them.
    ///
    /// # Arguments
    /// * `k` - Maximum number of bytes to retrieve
    ///
    /// # Returns
    /// A byte slice containing up to `k` bytes (or fewer if EOF reached)
    fn peek_slice(&mut self, k: usize) -> &[u8];

    /// Returns up to `k` bytes from the current position for error context.
    fn get_context(&mut self, k: usize) -> Vec<u8> {
        self.peek_slice(k).to_vec()
    }

    /// Returns the current byte offset in the stream.
    fn position(&self) -> usize;

    /// Check if at end of data.
    ///
    /// # Returns
    /// `true` if at or beyond the end of data, `false` otherwise
    fn is_eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Returns the last I/O error encountered while filling internal buffers,
    /// if any. Sources that cannot fail return `None`.
    fn take_io_error(&mut self) -> Option<std::io::Error> {
        None
    }
}
