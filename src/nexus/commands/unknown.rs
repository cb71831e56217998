//! Fallback for commands without a registered reader.

use super::{CommandReader, StepResult};
use crate::events::{SoleEvent, UnknownCommandEvent};
use crate::nexus::context::NexusContext;
use crate::parser::{ByteSource, ParsingError};

/// Reads a command verbatim up to its `;` and, if enabled, emits it as
/// [UnknownCommandEvent]. Quoted words and comments stay part of the content.
pub struct UnknownCommandReader {
    name: String,
}

impl UnknownCommandReader {
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

impl<S: ByteSource> CommandReader<S> for UnknownCommandReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        let content = ctx.read_command_content(&self.name)?;
        match &ctx.state.block {
            Some(block) => log::debug!("Unknown command {} in block {block}", self.name),
            None => log::debug!("Unknown command {}", self.name),
        }
        if ctx.parameters.create_unknown_command_events {
            ctx.push(SoleEvent::UnknownCommand(UnknownCommandEvent {
                command_name: self.name.clone(),
                content,
            }));
        }
        Ok(StepResult::Done)
    }
}
