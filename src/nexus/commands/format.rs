//! FORMAT of character blocks: data type, special symbols and matrix layout.

use super::{CommandReader, StepResult, emit_subcommand_metadata, read_optional_value};
use crate::events::{
    CharacterSetInterval, CharacterSymbolMeaning, ContentType, Event, LinkedLabeledId,
    ObjectValue, SingleTokenDefinitionEvent, StartEvent, TokenSetDefinitionEvent, TokenSetType,
};
use crate::model::id_manager::{
    CHARACTER_SET_ID_PREFIX, SINGLE_TOKEN_DEFINITION_ID_PREFIX, TOKEN_SET_ID_PREFIX,
};
use crate::nexus::context::NexusContext;
use crate::nexus::defs::*;
use crate::parser::{ByteSource, ParsingError, ParsingErrorType};

/// Word delimiters inside `MIXED(...)`, where `:` separates type and columns.
const MIXED_DELIMITERS: &[u8] = b" \t\r\n;=,[]()\"'{}:";

/// Reads a FORMAT command.
///
/// Layout options are stored in the shared state right away. Token set
/// definitions are emitted once the terminating `;` was read, since symbols
/// and the data type may be given in any order.
#[derive(Default)]
pub struct FormatReader {
    /// Declared type(s) with their columns; a single entry without columns
    /// for a non-mixed type
    types: Vec<(TokenSetType, Vec<CharacterSetInterval>)>,
    mixed: bool,
    gap: Option<String>,
    missing: Option<String>,
    match_char: Option<String>,
    symbols: Option<String>,
}

impl<S: ByteSource> CommandReader<S> for FormatReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        while let Some(key) = ctx.read_word()? {
            let upper = key.to_ascii_uppercase();
            match upper.as_str() {
                DATATYPE => self.read_data_type(ctx)?,
                GAP => self.gap = Some(required_value(ctx, GAP)?),
                MISSING => self.missing = Some(required_value(ctx, MISSING)?),
                MATCHCHAR => self.match_char = Some(required_value(ctx, MATCHCHAR)?),
                SYMBOLS => self.symbols = Some(required_value(ctx, SYMBOLS)?),
                TOKENS => ctx.state.format.long_tokens = true,
                NOTOKENS => ctx.state.format.long_tokens = false,
                INTERLEAVE => {
                    ctx.state.format.interleave = match read_optional_value(ctx, FORMAT, INTERLEAVE)? {
                        None => true,
                        Some(v) => !v.eq_ignore_ascii_case(NO),
                    }
                }
                LABELS => ctx.state.format.labels = true,
                NOLABELS => ctx.state.format.labels = false,
                TRANSPOSE => ctx.state.format.transpose = true,
                _ => {
                    let value = read_optional_value(ctx, FORMAT, &key)?
                        .map_or(ObjectValue::Boolean(true), |v| ObjectValue::parse_typed(&v));
                    emit_subcommand_metadata(ctx, FORMAT, &key, value);
                }
            }
        }
        ctx.expect_command_end(FORMAT)?;
        self.emit_token_sets(ctx);
        Ok(StepResult::Done)
    }
}

impl FormatReader {
    fn read_data_type<S: ByteSource>(&mut self, ctx: &mut NexusContext<S>) -> Result<(), ParsingError> {
        let name = required_value(ctx, DATATYPE)?;
        if !name.eq_ignore_ascii_case(MIXED) {
            let set_type = TokenSetType::from_nexus_name(&name).unwrap_or(TokenSetType::Unknown);
            if set_type == TokenSetType::Continuous {
                ctx.state.format.long_tokens = true;
            }
            self.types = vec![(set_type, Vec::new())];
            return Ok(());
        }

        self.mixed = true;
        self.types.clear();
        ctx.expect_byte(b'(', "after DATATYPE=MIXED")?;
        loop {
            let Some(type_name) = ctx.read_word_until(MIXED_DELIMITERS, false)? else {
                return Err(ctx.error(ParsingErrorType::IllegalCharacter(
                    "expected data type in MIXED".to_string(),
                )));
            };
            let set_type = TokenSetType::from_nexus_name(&type_name).unwrap_or(TokenSetType::Unknown);
            ctx.expect_byte(b':', &format!("after {type_name} in MIXED"))?;

            let mut words = Vec::new();
            while let Some(word) = ctx.read_word()? {
                words.push(word);
            }
            let intervals = parse_column_ranges(ctx, &words)?;
            self.types.push((set_type, intervals));

            if ctx.consume_if_byte(b',')? {
                continue;
            }
            ctx.expect_byte(b')', "at the end of MIXED")?;
            return Ok(());
        }
    }

    fn emit_token_sets<S: ByteSource>(&mut self, ctx: &mut NexusContext<S>) {
        let declares_symbols = self.gap.is_some()
            || self.missing.is_some()
            || self.match_char.is_some()
            || self.symbols.is_some();
        if self.types.is_empty() {
            if !declares_symbols {
                return;
            }
            self.types.push((TokenSetType::Discrete, Vec::new()));
        }

        let alignment = ctx.state.block_element_id.clone();
        let mut character_sets = Vec::with_capacity(self.types.len());
        for (set_type, intervals) in &self.types {
            if !self.mixed {
                character_sets.push(None);
                continue;
            }
            let id = ctx.new_id(CHARACTER_SET_ID_PREFIX);
            ctx.push(StartEvent::CharacterSet(LinkedLabeledId::new(
                id.clone(),
                Some(set_type.nexus_name().to_string()),
                alignment.clone(),
            )));
            for interval in intervals {
                ctx.push(Event::interval(interval.start, interval.end));
            }
            ctx.push(Event::end(ContentType::CharacterSet));
            character_sets.push(Some(id));
        }

        let with_symbols = self.types.len() == 1;
        let long_tokens = ctx.state.format.long_tokens;
        for ((set_type, _), character_set_id) in self.types.iter().zip(character_sets) {
            let id = ctx.new_id(TOKEN_SET_ID_PREFIX);
            ctx.push(StartEvent::TokenSetDefinition(TokenSetDefinitionEvent {
                id,
                label: None,
                set_type: *set_type,
                character_set_id,
            }));
            let specials = [
                (&self.gap, CharacterSymbolMeaning::Gap),
                (&self.missing, CharacterSymbolMeaning::Missing),
                (&self.match_char, CharacterSymbolMeaning::Match),
            ];
            for (symbol, meaning) in specials {
                if let Some(symbol) = symbol {
                    push_single_token(ctx, symbol.clone(), meaning);
                }
            }
            if with_symbols && let Some(symbols) = &self.symbols {
                for symbol in split_symbols(symbols, long_tokens) {
                    push_single_token(ctx, symbol, CharacterSymbolMeaning::Character);
                }
            }
            ctx.push(Event::end(ContentType::TokenSetDefinition));
        }
    }
}

fn push_single_token<S: ByteSource>(
    ctx: &mut NexusContext<S>,
    token_name: String,
    meaning: CharacterSymbolMeaning,
) {
    let id = ctx.new_id(SINGLE_TOKEN_DEFINITION_ID_PREFIX);
    ctx.push(StartEvent::SingleTokenDefinition(SingleTokenDefinitionEvent {
        id,
        label: None,
        token_name,
        meaning,
    }));
    ctx.push(Event::end(ContentType::SingleTokenDefinition));
}

fn required_value<S: ByteSource>(ctx: &mut NexusContext<S>, key: &str) -> Result<String, ParsingError> {
    match read_optional_value(ctx, FORMAT, key)? {
        Some(value) => Ok(value),
        None => Err(ctx.error(ParsingErrorType::IllegalCharacter(format!(
            "expected '=' after {key}"
        )))),
    }
}

/// Splits a SYMBOLS value: at whitespace, and unless tokens are long, into
/// single characters.
fn split_symbols(symbols: &str, long_tokens: bool) -> Vec<String> {
    symbols
        .split_whitespace()
        .flat_map(|part| {
            if long_tokens {
                vec![part.to_string()]
            } else {
                part.chars().map(String::from).collect()
            }
        })
        .collect()
}

/// Converts the column ranges of a MIXED entry (e.g. `1-30 41 50 - 55`,
/// 1-based inclusive) into half-open 0-based intervals.
fn parse_column_ranges<S: ByteSource>(
    ctx: &mut NexusContext<S>,
    words: &[String],
) -> Result<Vec<CharacterSetInterval>, ParsingError> {
    // Rejoin ranges whose '-' is separated by whitespace
    let mut ranges: Vec<String> = Vec::new();
    for word in words {
        match ranges.last_mut() {
            Some(last) if last.ends_with('-') || word.starts_with('-') => last.push_str(word),
            _ => ranges.push(word.clone()),
        }
    }

    let mut intervals = Vec::with_capacity(ranges.len());
    for range in ranges {
        let (start, end) = match range.split_once('-') {
            None => {
                let column = ctx.parse_positive_integer(&range, "column in MIXED")?;
                (column, column)
            }
            Some((start, ".")) => {
                let start = ctx.parse_positive_integer(start, "column in MIXED")?;
                match ctx.state.dimensions.nchar {
                    Some(nchar) => (start, nchar),
                    None => {
                        return Err(ctx.error(ParsingErrorType::UndefinedElementCount(
                            "NCHAR must be declared to use '.' in MIXED".to_string(),
                        )));
                    }
                }
            }
            Some((start, end)) => (
                ctx.parse_positive_integer(start, "column in MIXED")?,
                ctx.parse_positive_integer(end, "column in MIXED")?,
            ),
        };
        if end < start {
            return Err(ctx.error(ParsingErrorType::InvalidInteger(format!(
                "column range {start}-{end} in MIXED ends before it starts"
            ))));
        }
        intervals.push(CharacterSetInterval::new(start - 1, end));
    }
    Ok(intervals)
}
