//! DIMENSIONS of TAXA and character blocks.

use super::{CommandReader, StepResult, emit_subcommand_metadata, read_optional_value};
use crate::events::ObjectValue;
use crate::nexus::context::NexusContext;
use crate::nexus::defs::*;
use crate::parser::{ByteSource, ParsingError};

/// Reads `DIMENSIONS [NEWTAXA] NTAX=n [NCHAR=m];`.
///
/// Subcommands the current block type does not interpret are emitted as
/// literal metadata.
pub struct DimensionsReader {
    characters: bool,
}

impl DimensionsReader {
    /// Reader for TAXA blocks, accepting `NTAX`.
    pub fn for_taxa() -> Self {
        Self { characters: false }
    }

    /// Reader for CHARACTERS, DATA and UNALIGNED blocks, additionally
    /// accepting `NEWTAXA` and `NCHAR`.
    pub fn for_characters() -> Self {
        Self { characters: true }
    }
}

impl<S: ByteSource> CommandReader<S> for DimensionsReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        while let Some(key) = ctx.read_word()? {
            let upper = key.to_ascii_uppercase();
            match upper.as_str() {
                NTAX => {
                    ctx.expect_byte(KEY_VALUE_SEPARATOR, "after NTAX")?;
                    ctx.state.dimensions.ntax = Some(ctx.read_positive_integer(NTAX)?);
                }
                NCHAR if self.characters => {
                    ctx.expect_byte(KEY_VALUE_SEPARATOR, "after NCHAR")?;
                    let nchar = ctx.read_positive_integer(NCHAR)?;
                    ctx.state.dimensions.nchar = Some(nchar);
                    if let Some(id) = ctx.state.block_element_id.clone() {
                        ctx.state.alignment_columns.insert(id, Some(nchar));
                    }
                }
                NEWTAXA if self.characters => ctx.state.dimensions.new_taxa = true,
                _ => {
                    let value = read_optional_value(ctx, DIMENSIONS, &key)?
                        .map_or(ObjectValue::Boolean(true), |v| ObjectValue::parse_typed(&v));
                    emit_subcommand_metadata(ctx, DIMENSIONS, &key, value);
                }
            }
        }
        ctx.expect_command_end(DIMENSIONS)?;
        Ok(StepResult::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, StartEvent};
    use crate::parameters::ReadWriteParameters;
    use crate::parser::{ByteParser, InMemoryByteSource};

    #[test]
    fn test_character_dimensions() {
        let mut ctx: NexusContext<InMemoryByteSource> = NexusContext::new(
            ByteParser::for_str(" NEWTAXA ntax=3 NChar=12 Foo=bar;"),
            ReadWriteParameters::default(),
        );
        ctx.state.block_element_id = Some("matrix0".to_string());
        let mut reader = DimensionsReader::for_characters();
        assert_eq!(reader.step(&mut ctx).unwrap(), StepResult::Done);

        let dims = ctx.state.dimensions;
        assert_eq!((dims.ntax, dims.nchar, dims.new_taxa), (Some(3), Some(12), true));
        assert_eq!(ctx.state.alignment_columns["matrix0"], Some(12));
        match &ctx.events[0] {
            Event::Start(StartEvent::LiteralMetadata(meta)) => {
                assert_eq!(meta.predicate, "nexus:DIMENSIONS.FOO")
            }
            other => panic!("expected metadata, got {other:?}"),
        }
        assert_eq!(ctx.events.len(), 3);
    }

    #[test]
    fn test_zero_ntax_is_rejected() {
        let mut ctx: NexusContext<InMemoryByteSource> = NexusContext::new(
            ByteParser::for_str(" NTAX=0;"),
            ReadWriteParameters::default(),
        );
        assert!(DimensionsReader::for_taxa().step(&mut ctx).is_err());
    }
}
