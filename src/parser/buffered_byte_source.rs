//! Buffered reader implementation of byte source for parsing.
//!
//! This module provides [BufferedByteSource], which pulls chunks from any
//! [Read] implementation (a [File] by default). Use this for large files where
//! loading everything into memory would be impractical, or for streams such as
//! standard input.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::parser::byte_source::ByteSource;

// =#========================================================================#=
// BUFFERED BYTE SOURCE
// =#========================================================================$=
/// A buffered byte source for streaming large inputs.
///
/// Keeps a window of not yet consumed bytes, which is refilled in chunks of
/// [CHUNK_SIZE](Self::CHUNK_SIZE) bytes. Peeking ahead never seeks, so any
/// forward-only reader can be used.
pub struct BufferedByteSource<R: Read = File> {
    /// Underlying reader
    reader: R,

    /// Bytes read from the reader, `buffer[start..]` is not consumed yet
    buffer: Vec<u8>,

    /// Index of the current byte in `buffer`
    start: usize,

    /// Current absolute position in the stream
    pos: usize,

    /// Whether the reader reported end of data
    exhausted: bool,

    /// First I/O error encountered, reported once through [ByteSource::take_io_error]
    io_error: Option<io::Error>,
}

impl BufferedByteSource<File> {
    /// Creates a new buffered byte source from a file path.
    ///
    /// # Arguments
    /// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<BufferedByteSource<File>> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> BufferedByteSource<R> {
    /// Number of bytes requested from the reader per refill.
    const CHUNK_SIZE: usize = 64 * 1024;

    /// Creates a new buffered byte source reading from `reader`.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(Self::CHUNK_SIZE),
            start: 0,
            pos: 0,
            exhausted: false,
            io_error: None,
        }
    }

    /// Number of buffered but unconsumed bytes.
    #[inline(always)]
    fn available(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Makes sure at least `k` bytes are buffered, unless the reader is exhausted.
    fn fill(&mut self, k: usize) {
        if self.available() >= k || self.exhausted {
            return;
        }

        // Drop consumed bytes before growing the buffer
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.start = 0;
        }

        let mut chunk = [0u8; 8 * 1024];
        while self.available() < k.max(1) {
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.io_error.get_or_insert(e);
                    self.exhausted = true;
                    break;
                }
            }
            if self.buffer.len() >= Self::CHUNK_SIZE {
                break;
            }
        }
    }
}

impl<R: Read> ByteSource for BufferedByteSource<R> {
    fn peek(&mut self) -> Option<u8> {
        self.fill(1);
        self.buffer.get(self.start).copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.start += 1;
        self.pos += 1;
        Some(byte)
    }

    fn peek_slice(&mut self, k: usize) -> &[u8] {
        self.fill(k);
        let end = (self.start + k).min(self.buffer.len());
        &self.buffer[self.start..end]
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn take_io_error(&mut self) -> Option<io::Error> {
        self.io_error.take()
    }
}
