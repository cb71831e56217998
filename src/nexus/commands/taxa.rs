//! TAXLABELS of TAXA blocks.

use super::{CommandReader, StepResult};
use crate::events::{ContentType, Event, LabeledId, StartEvent};
use crate::model::id_manager::OTU_ID_PREFIX;
use crate::nexus::context::NexusContext;
use crate::nexus::defs::*;
use crate::parser::{ByteSource, ParsingError};

/// Reads `TAXLABELS label1 label2 ...;`, emitting one OTU per label and step.
pub struct TaxLabelsReader;

impl<S: ByteSource> CommandReader<S> for TaxLabelsReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        let Some(label) = ctx.read_label()? else {
            ctx.expect_command_end(TAXLABELS)?;
            return Ok(StepResult::Done);
        };

        let id = ctx.new_id(OTU_ID_PREFIX);
        if let Some(list_id) = ctx.state.block_element_id.clone() {
            let otus = ctx.state.otu_lists.entry(list_id).or_default();
            otus.labels.push(label.clone());
            otus.ids.push(id.clone());
            otus.by_label.insert(label.clone(), id.clone());
        }
        let label = ctx.parameters.label(label);
        ctx.push(StartEvent::Otu(LabeledId::new(id, label)));
        ctx.push(Event::end(ContentType::Otu));
        Ok(StepResult::Continue)
    }
}
