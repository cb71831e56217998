//! MATRIX of character blocks in sequential and interleaved layout.

use super::{CommandReader, StepResult};
use crate::events::{ContentType, Event, LinkedLabeledId, StartEvent};
use crate::model::id_manager::SEQUENCE_ID_PREFIX;
use crate::nexus::context::NexusContext;
use crate::nexus::defs::*;
use crate::parser::{ByteSource, ParsingError, ParsingErrorType};
use std::collections::HashMap;

/// Bytes ending a long (multi-character) token.
const LONG_TOKEN_DELIMITERS: &[u8] = b" \t\r\n;[({";

/// Reads a MATRIX command row by row.
///
/// Each step either starts a sequence segment (reading its name) or reads
/// tokens of the open segment until the segment ends or
/// `max_tokens_to_read` tokens are pending. Which of both is decided by
/// whether a segment is open, so a segment can span several steps.
#[derive(Default)]
pub struct MatrixReader {
    checked_format: bool,
    /// Sequence ID per name, so interleaved segments resume their sequence
    ids: HashMap<String, String>,
    /// Tokens read so far per sequence ID
    token_counts: HashMap<String, u64>,
    /// ID of the sequence whose segment is open
    current: Option<String>,
    pending: Vec<String>,
}

impl<S: ByteSource> CommandReader<S> for MatrixReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        if !self.checked_format {
            self.checked_format = true;
            let format = ctx.state.format;
            if format.transpose {
                return Err(ctx.error(ParsingErrorType::UnsupportedFeature(
                    "transposed matrices".to_string(),
                )));
            }
            if !format.labels {
                return Err(ctx.error(ParsingErrorType::UnsupportedFeature(
                    "matrices without labels (NOLABELS)".to_string(),
                )));
            }
        }

        match self.current.clone() {
            None => self.start_segment(ctx),
            Some(id) => self.read_tokens(ctx, id),
        }
    }
}

impl MatrixReader {
    fn start_segment<S: ByteSource>(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        match ctx.peek_byte()? {
            None => return Err(ctx.unexpected_eof("inside MATRIX")),
            Some(COMMAND_END) => {
                ctx.parser.next_byte();
                return Ok(StepResult::Done);
            }
            Some(_) => {}
        }
        let Some(name) = ctx.read_label()? else {
            return Err(ctx.error(ParsingErrorType::IllegalCharacter(
                "expected sequence name in MATRIX".to_string(),
            )));
        };

        let id = match self.ids.get(&name) {
            Some(id) => id.clone(),
            None => {
                let id = ctx.new_id(SEQUENCE_ID_PREFIX);
                self.ids.insert(name.clone(), id.clone());
                id
            }
        };
        let linked = ctx.state.otu_id_for_label(&name);
        let label = ctx.parameters.label(name);
        ctx.push(StartEvent::Sequence(LinkedLabeledId::new(id.clone(), label, linked)));
        self.current = Some(id);
        Ok(StepResult::Continue)
    }

    fn read_tokens<S: ByteSource>(
        &mut self,
        ctx: &mut NexusContext<S>,
        id: String,
    ) -> Result<StepResult, ParsingError> {
        let nchar = ctx.state.dimensions.nchar;
        // Without a known length, or interleaved, a line break ends the segment
        let by_line = ctx.state.format.interleave || nchar.is_none();
        let long_tokens = ctx.state.format.long_tokens;
        let max_tokens = ctx.parameters.max_tokens_to_read.max(1);

        loop {
            let count = self.token_counts.get(&id).copied().unwrap_or(0);
            if !by_line && nchar.is_some_and(|n| count >= n) {
                return Ok(self.end_segment(ctx));
            }
            if by_line {
                if ctx.parser.skip_whitespace_in_line() {
                    return Ok(self.end_segment(ctx));
                }
            } else {
                ctx.parser.skip_whitespace();
            }

            let token = match ctx.parser.peek() {
                None => return Err(ctx.unexpected_eof("inside MATRIX")),
                Some(COMMAND_END) => return Ok(self.end_segment(ctx)),
                Some(COMMENT_START) => {
                    self.flush(ctx);
                    ctx.read_comment()?;
                    continue;
                }
                Some(open @ (POLYMORPHIC_TOKEN_START | UNCERTAIN_TOKEN_START)) => {
                    read_delimited_token(ctx, open)?
                }
                Some(_) if long_tokens => ctx.parser.parse_unquoted_label(LONG_TOKEN_DELIMITERS)?,
                Some(_) => read_character(ctx),
            };

            self.pending.push(token);
            *self.token_counts.entry(id.clone()).or_insert(0) += 1;
            if self.pending.len() >= max_tokens {
                self.flush(ctx);
                return Ok(StepResult::Continue);
            }
        }
    }

    fn flush<S: ByteSource>(&mut self, ctx: &mut NexusContext<S>) {
        if !self.pending.is_empty() {
            ctx.push(Event::tokens(std::mem::take(&mut self.pending)));
        }
    }

    fn end_segment<S: ByteSource>(&mut self, ctx: &mut NexusContext<S>) -> StepResult {
        self.flush(ctx);
        ctx.push(Event::end(ContentType::Sequence));
        self.current = None;
        StepResult::Continue
    }
}

/// Reads one (possibly multi-byte UTF-8) character as token.
fn read_character<S: ByteSource>(ctx: &mut NexusContext<S>) -> String {
    let mut bytes = Vec::with_capacity(4);
    if let Some(first) = ctx.parser.next_byte() {
        bytes.push(first);
        let width = match first {
            0xF0.. => 4,
            0xE0.. => 3,
            0xC0.. => 2,
            _ => 1,
        };
        for _ in 1..width {
            match ctx.parser.peek() {
                Some(b) if b & 0xC0 == 0x80 => {
                    bytes.push(b);
                    ctx.parser.next_byte();
                }
                _ => break,
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Reads a `(...)` or `{...}` token including its delimiters.
fn read_delimited_token<S: ByteSource>(ctx: &mut NexusContext<S>, open: u8) -> Result<String, ParsingError> {
    let close = if open == POLYMORPHIC_TOKEN_START {
        POLYMORPHIC_TOKEN_END
    } else {
        UNCERTAIN_TOKEN_END
    };
    let mut bytes = Vec::new();
    loop {
        match ctx.parser.next_byte() {
            None => {
                return Err(ctx.unexpected_eof(format!("expected '{}' closing token", close as char)));
            }
            Some(b) => {
                bytes.push(b);
                if b == close {
                    break;
                }
            }
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// =#========================================================================#=
// TESTS - MATRIX
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ReadWriteParameters;
    use crate::parser::{ByteParser, InMemoryByteSource};
    use pretty_assertions::assert_eq;

    fn read_matrix(
        input: &str,
        setup: impl FnOnce(&mut NexusContext<InMemoryByteSource>),
    ) -> Result<Vec<Event>, ParsingError> {
        let mut ctx = NexusContext::new(ByteParser::for_str(input), ReadWriteParameters::default());
        setup(&mut ctx);
        let mut reader = MatrixReader::default();
        while reader.step(&mut ctx)? == StepResult::Continue {}
        Ok(ctx.events.into_iter().collect())
    }

    fn start(id: &str, label: &str) -> Event {
        Event::Start(StartEvent::Sequence(LinkedLabeledId::new(id, Some(label.to_string()), None)))
    }

    fn tokens(s: &str) -> Event {
        Event::tokens(s.split(' ').map(String::from).collect())
    }

    #[test]
    fn test_sequential_with_known_length_spans_lines() {
        let events = read_matrix("\nA ACG\n  T\nB TTTT\n;", |ctx| {
            ctx.state.dimensions.nchar = Some(4)
        })
        .unwrap();
        assert_eq!(
            events,
            vec![
                start("seq1", "A"),
                tokens("A C G T"),
                Event::end(ContentType::Sequence),
                start("seq2", "B"),
                tokens("T T T T"),
                Event::end(ContentType::Sequence),
            ]
        );
    }

    #[test]
    fn test_interleaved_resumes_sequences() {
        let events = read_matrix("\nA AC\nB GG\n\nA GT\nB (AC){GT}\n;", |ctx| {
            ctx.state.dimensions.nchar = Some(4);
            ctx.state.format.interleave = true;
        })
        .unwrap();
        assert_eq!(
            events,
            vec![
                start("seq1", "A"),
                tokens("A C"),
                Event::end(ContentType::Sequence),
                start("seq2", "B"),
                tokens("G G"),
                Event::end(ContentType::Sequence),
                start("seq1", "A"),
                tokens("G T"),
                Event::end(ContentType::Sequence),
                start("seq2", "B"),
                tokens("(AC) {GT}"),
                Event::end(ContentType::Sequence),
            ]
        );
    }

    #[test]
    fn test_comment_flushes_tokens() {
        let events = read_matrix("A AC[note]GT;", |_| {}).unwrap();
        assert_eq!(
            events,
            vec![
                start("seq1", "A"),
                tokens("A C"),
                Event::comment("note"),
                tokens("G T"),
                Event::end(ContentType::Sequence),
            ]
        );
    }

    #[test]
    fn test_max_tokens_and_long_tokens() {
        let events = read_matrix("A 0.1 2.5 -3;", |ctx| {
            ctx.state.format.long_tokens = true;
            ctx.parameters.max_tokens_to_read = 2;
        })
        .unwrap();
        assert_eq!(
            events,
            vec![
                start("seq1", "A"),
                tokens("0.1 2.5"),
                tokens("-3"),
                Event::end(ContentType::Sequence),
            ]
        );
    }

    #[test]
    fn test_unsupported_layouts() {
        let err = read_matrix("ACGT;", |ctx| ctx.state.format.labels = false).unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::UnsupportedFeature(_)));
        let err = read_matrix("A ACGT;", |ctx| ctx.state.format.transpose = true).unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::UnsupportedFeature(_)));
    }

    #[test]
    fn test_unterminated_matrix() {
        let err = read_matrix("A ACGT\nB AC", |_| {}).unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::UnexpectedEof(_)));
    }
}
