//! TRANSLATE and TREE of TREES blocks.

use super::{CommandReader, StepResult};
use crate::events::{ContentType, Event, LabeledId, StartEvent};
use crate::model::id_manager::TREE_ID_PREFIX;
use crate::newick::NewickTreeParser;
use crate::nexus::context::{NexusContext, SharedParseState, TreeRef};
use crate::nexus::defs::*;
use crate::parameters::ReadWriteParameters;
use crate::parser::{ByteSource, ParsingError, ParsingErrorType};

/// Reads `TRANSLATE key label, key label, ...;`, one entry per step.
pub struct TranslateReader;

impl<S: ByteSource> CommandReader<S> for TranslateReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        let Some(key) = ctx.read_word()? else {
            ctx.expect_command_end(TRANSLATE)?;
            return Ok(StepResult::Done);
        };
        let Some(label) = ctx.read_label()? else {
            return Err(ctx.error(ParsingErrorType::IllegalCharacter(format!(
                "expected label for '{key}' in TRANSLATE"
            ))));
        };
        ctx.state.translation.insert(key, label);
        ctx.consume_if_byte(b',')?;
        Ok(StepResult::Continue)
    }
}

/// Reads `TREE [*] name = [&R|&U] newick;`.
pub struct TreeReader;

impl<S: ByteSource> CommandReader<S> for TreeReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        // '*' marks the default tree
        ctx.consume_if_byte(b'*')?;
        let Some(name) = ctx.read_label()? else {
            return Err(ctx.error(ParsingErrorType::IllegalCharacter(
                "expected tree name after TREE".to_string(),
            )));
        };
        ctx.expect_byte(KEY_VALUE_SEPARATOR, &format!("after name of tree '{name}'"))?;

        let mut tree = NewickTreeParser::new().parse_tree(&mut ctx.parser)?;

        let tree_id = ctx.new_id(TREE_ID_PREFIX);
        ctx.push(StartEvent::Tree(LabeledId::new(tree_id.clone(), Some(name.clone()))));
        for comment in std::mem::take(&mut tree.comments) {
            ctx.emit_comment(comment);
        }
        tree.push_content_events(
            &mut ctx.ids,
            |label| resolve_node_label(&ctx.state, &ctx.parameters, label),
            &mut ctx.events,
        );
        ctx.push(Event::end(ContentType::Tree));

        if let Some(group) = ctx.state.block_element_id.clone() {
            ctx.state
                .tree_groups
                .entry(group)
                .or_default()
                .push(TreeRef { name, id: tree_id });
        }
        Ok(StepResult::Done)
    }
}

/// Translates a node label and looks up the OTU it refers to.
fn resolve_node_label(
    state: &SharedParseState,
    parameters: &ReadWriteParameters,
    label: String,
) -> (Option<String>, Option<String>) {
    let label = state.translation.get(&label).cloned().unwrap_or(label);
    let otu = state.otu_id_for_label(&label);
    (parameters.label(label), otu)
}

// =#========================================================================#=
// TESTS - TREES
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LinkedLabeledId;
    use crate::nexus::context::OtuListInfo;
    use crate::parser::{ByteParser, InMemoryByteSource};

    #[test]
    fn test_translated_tree() {
        let mut ctx: NexusContext<InMemoryByteSource> = NexusContext::new(
            ByteParser::for_str(" 1 Kea, 2 'Kaka' ; tree t1 = [&U] (1,2)[inner];"),
            ReadWriteParameters::default(),
        );
        let mut otus = OtuListInfo::default();
        otus.by_label.insert("Kea".to_string(), "otu9".to_string());
        ctx.state.otu_lists.insert("otus8".to_string(), otus);
        ctx.state.last_otu_list = Some("otus8".to_string());
        ctx.state.block_element_id = Some("trees7".to_string());

        while TranslateReader.step(&mut ctx).unwrap() == StepResult::Continue {}
        assert_eq!(ctx.state.translation.len(), 2);
        assert_eq!(ctx.read_word().unwrap().as_deref(), Some("tree"));
        assert_eq!(TreeReader.step(&mut ctx).unwrap(), StepResult::Done);

        let events: Vec<Event> = ctx.events.iter().cloned().collect();
        assert!(matches!(&events[0], Event::Start(StartEvent::Tree(t)) if t.label.as_deref() == Some("t1")));
        assert_eq!(events[1], Event::comment("inner"));
        assert!(events.contains(&Event::Start(StartEvent::Node(LinkedLabeledId::new(
            "n3",
            Some("Kea".to_string()),
            Some("otu9".to_string())
        )))));
        assert!(events.contains(&Event::Start(StartEvent::Node(LinkedLabeledId::new(
            "n4",
            Some("Kaka".to_string()),
            None
        )))));
        // Unrooted: two edges, no root edge
        let edges = events
            .iter()
            .filter(|e| matches!(e, Event::Start(StartEvent::Edge(_))))
            .count();
        assert_eq!(edges, 2);
        assert_eq!(events.last(), Some(&Event::end(ContentType::Tree)));
        assert_eq!(ctx.state.tree_groups["trees7"][0].name, "t1");
    }
}
