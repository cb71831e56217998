//! CHARLABELS and CHARSTATELABELS of character blocks.
//!
//! Both commands name columns of the current alignment. The names are
//! emitted as character definitions and recorded, so that CHARSET commands
//! can refer to columns by name.

use super::{CommandReader, StepResult};
use crate::events::{CharacterDefinitionEvent, ContentType, Event, StartEvent};
use crate::model::id_manager::CHARACTER_DEFINITION_ID_PREFIX;
use crate::nexus::context::NexusContext;
use crate::nexus::defs::*;
use crate::parser::{ByteSource, ParsingError, ParsingErrorType};

/// Bytes ending an unquoted word inside CHARSTATELABELS.
const STATE_LABEL_DELIMITERS: &[u8] = b" \t\r\n;=,[]()\"'{}/";

/// Emits the definition of the 0-based `column` and records its name.
fn emit_character_definition<S: ByteSource>(
    ctx: &mut NexusContext<S>,
    name: String,
    column: u64,
    command: &str,
) -> Result<(), ParsingError> {
    if let Some(nchar) = ctx.state.dimensions.nchar
        && column >= nchar
    {
        return Err(ctx.error(ParsingErrorType::InvalidInteger(format!(
            "character {} in {command} exceeds NCHAR={nchar}",
            column + 1
        ))));
    }
    if let Some(alignment) = ctx.state.block_element_id.clone() {
        ctx.state
            .character_names
            .entry(alignment)
            .or_default()
            .insert(name.clone(), column);
    }
    let id = ctx.new_id(CHARACTER_DEFINITION_ID_PREFIX);
    let label = ctx.parameters.label(name);
    ctx.push(StartEvent::CharacterDefinition(CharacterDefinitionEvent { id, label, column }));
    ctx.push(Event::end(ContentType::CharacterDefinition));
    Ok(())
}

fn illegal_character<S: ByteSource>(ctx: &mut NexusContext<S>, found: u8, command: &str) -> ParsingError {
    ctx.error(ParsingErrorType::IllegalCharacter(format!(
        "'{}' is not allowed at this position in {command}",
        found as char
    )))
}

// =#========================================================================#=
// CHARLABELS
// =#========================================================================€=
/// Reads `CHARLABELS name1 name2 ...;`, naming consecutive columns, one per
/// step.
#[derive(Debug, Default)]
pub struct CharLabelsReader {
    column: u64,
}

impl<S: ByteSource> CommandReader<S> for CharLabelsReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        match ctx.peek_byte()? {
            None => return Err(ctx.unexpected_eof(format!("inside {CHARLABELS}"))),
            Some(COMMAND_END) => {
                ctx.parser.next_byte();
                return Ok(StepResult::Done);
            }
            Some(b @ (KEY_VALUE_SEPARATOR | ELEMENT_SEPARATOR)) => {
                return Err(illegal_character(ctx, b, CHARLABELS));
            }
            Some(_) => {}
        }
        let Some(name) = ctx.read_label()? else {
            let found = ctx.parser.peek().unwrap_or(b' ');
            return Err(illegal_character(ctx, found, CHARLABELS));
        };
        emit_character_definition(ctx, name, self.column, CHARLABELS)?;
        self.column += 1;
        Ok(StepResult::Continue)
    }
}

// =#========================================================================#=
// CHARSTATELABELS
// =#========================================================================€=
/// Reads `CHARSTATELABELS 1 name / state1 state2, 2 / state1, ...;`, one
/// entry per step.
///
/// State names are not represented by events and are skipped. Entries
/// without a character name (`3 / a b`) only list state names.
#[derive(Debug, Default)]
pub struct CharStateLabelsReader;

impl CharStateLabelsReader {
    /// Skips the state names following a `/`.
    ///
    /// # Returns
    /// `false` if no `/` follows
    fn skip_state_names<S: ByteSource>(ctx: &mut NexusContext<S>) -> Result<bool, ParsingError> {
        if !ctx.consume_if_byte(CHARACTER_NAME_STATES_SEPARATOR)? {
            return Ok(false);
        }
        let mut skipped = 0;
        loop {
            match ctx.peek_byte()? {
                None => return Err(ctx.unexpected_eof(format!("inside {CHARSTATELABELS}"))),
                Some(ELEMENT_SEPARATOR | COMMAND_END) => break,
                Some(_) => {}
            }
            if ctx.read_word_until(STATE_LABEL_DELIMITERS, true)?.is_none() {
                let found = ctx.parser.peek().unwrap_or(b' ');
                return Err(illegal_character(ctx, found, CHARSTATELABELS));
            }
            skipped += 1;
        }
        log::trace!("Skipped {skipped} state name(s) in {CHARSTATELABELS}");
        Ok(true)
    }
}

impl<S: ByteSource> CommandReader<S> for CharStateLabelsReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        match ctx.peek_byte()? {
            None => return Err(ctx.unexpected_eof(format!("inside {CHARSTATELABELS}"))),
            Some(COMMAND_END) => {
                ctx.parser.next_byte();
                return Ok(StepResult::Done);
            }
            Some(KEY_VALUE_SEPARATOR) => {
                return Err(illegal_character(ctx, KEY_VALUE_SEPARATOR, CHARSTATELABELS));
            }
            Some(_) => {}
        }

        let index = match ctx.read_word_until(STATE_LABEL_DELIMITERS, false)? {
            Some(word) => ctx.parse_positive_integer(&word, "character index")?,
            None => {
                let found = ctx.parser.peek().unwrap_or(b' ');
                return Err(ctx.error(ParsingErrorType::InvalidInteger(format!(
                    "expected character index in {CHARSTATELABELS} but found '{}'",
                    found as char
                ))));
            }
        };
        if !Self::skip_state_names(ctx)? {
            let Some(name) = ctx.read_word_until(STATE_LABEL_DELIMITERS, true)? else {
                let found = ctx.parser.peek().unwrap_or(b' ');
                return Err(illegal_character(ctx, found, CHARSTATELABELS));
            };
            emit_character_definition(ctx, name, index - 1, CHARSTATELABELS)?;
            Self::skip_state_names(ctx)?;
        }
        ctx.consume_if_byte(ELEMENT_SEPARATOR)?;
        Ok(StepResult::Continue)
    }
}
