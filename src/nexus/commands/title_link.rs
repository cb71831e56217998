//! TITLE and LINK, which name blocks and connect them to each other.

use super::{CommandReader, StepResult};
use crate::nexus::context::NexusContext;
use crate::nexus::defs::*;
use crate::parser::{ByteSource, ParsingError, ParsingErrorType};

/// Reads `TITLE name;` and registers the title of the current block.
pub struct TitleReader;

impl<S: ByteSource> CommandReader<S> for TitleReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        let Some(title) = ctx.read_label()? else {
            return Err(ctx.error(ParsingErrorType::IllegalCharacter(
                "expected title after TITLE".to_string(),
            )));
        };
        ctx.expect_command_end(TITLE)?;

        let link_name = ctx.state.block.as_ref().and_then(|b| b.link_name());
        if let (Some(link_name), Some(id)) = (link_name, ctx.state.block_element_id.clone()) {
            ctx.state.titles.insert((link_name.to_string(), title.clone()), id);
        }
        ctx.state.block_title = Some(title);
        Ok(StepResult::Done)
    }
}

/// Reads `LINK TAXA=title [CHARACTERS=title ...];` and links the current
/// block to earlier blocks by their titles.
pub struct LinkReader;

impl<S: ByteSource> CommandReader<S> for LinkReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        while let Some(block_type) = ctx.read_word()? {
            ctx.expect_byte(KEY_VALUE_SEPARATOR, &format!("after {block_type} in LINK"))?;
            let Some(title) = ctx.read_label()? else {
                return Err(ctx.error(ParsingErrorType::IllegalCharacter(format!(
                    "expected title of linked {block_type} block"
                ))));
            };
            let link_name = NexusBlock::normalize_link_name(&block_type);
            match ctx.state.titles.get(&(link_name.clone(), title.clone())).cloned() {
                Some(id) => {
                    ctx.state.block_links.insert(link_name, id);
                }
                None => {
                    return Err(ctx.error(ParsingErrorType::UnresolvedLabel(format!(
                        "no {link_name} block with title '{title}'"
                    ))));
                }
            }
            ctx.consume_if_byte(b',')?;
        }
        ctx.expect_command_end(LINK)?;
        Ok(StepResult::Done)
    }
}
