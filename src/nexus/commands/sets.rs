//! CHARSET, TAXSET and TREESET of SETS and ASSUMPTIONS blocks.
//!
//! Sets are given in standard format (`1-3 5 7-.\2 ALL`, 1-based and
//! inclusive) or vector format (`0110...`, one flag per element). Character
//! sets are emitted as 0-based half-open intervals, taxon and tree sets as
//! references to the IDs of their elements.

use super::{CommandReader, StepResult};
use crate::events::{ContentType, Event, LinkedLabeledId, StartEvent};
use crate::model::id_manager::{CHARACTER_SET_ID_PREFIX, OTU_SET_ID_PREFIX, TREE_SET_ID_PREFIX};
use crate::nexus::context::NexusContext;
use crate::nexus::defs::*;
use crate::parser::{ByteSource, ParsingError, ParsingErrorType};
use std::collections::HashMap;

/// Bytes ending an element of a standard format set.
const ELEMENT_DELIMITERS: &[u8] = b" \t\r\n;=,[]()\"'{}-\\";

/// Kind of elements a set refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Characters,
    Taxa,
    Trees,
}

impl SetKind {
    fn command(self) -> &'static str {
        match self {
            SetKind::Characters => CHARSET,
            SetKind::Taxa => TAXSET,
            SetKind::Trees => TREESET,
        }
    }

    fn link_name(self) -> &'static str {
        match self {
            SetKind::Characters => "CHARACTERS",
            SetKind::Taxa => "TAXA",
            SetKind::Trees => "TREES",
        }
    }

    fn content_type(self) -> ContentType {
        match self {
            SetKind::Characters => ContentType::CharacterSet,
            SetKind::Taxa => ContentType::OtuSet,
            SetKind::Trees => ContentType::TreeNetworkSet,
        }
    }
}

/// Elements a set is defined over.
enum Domain {
    /// Columns of an alignment
    Columns {
        /// Number of columns, if declared
        count: Option<u64>,
        /// 0-based column per character name
        names: HashMap<String, u64>,
    },
    /// IDs and names of the linked elements, in declaration order
    Elements {
        ids: Vec<String>,
        names: Vec<String>,
        linked_type: ContentType,
    },
}

/// Reads `CHARSET|TAXSET|TREESET name [(STANDARD|VECTOR)] = ...;`.
pub struct SetReader {
    kind: SetKind,
}

impl SetReader {
    pub fn new(kind: SetKind) -> Self {
        Self { kind }
    }
}

impl<S: ByteSource> CommandReader<S> for SetReader {
    fn step(&mut self, ctx: &mut NexusContext<S>) -> Result<StepResult, ParsingError> {
        let command = self.kind.command();
        let Some(name) = ctx.read_label()? else {
            return Err(ctx.error(ParsingErrorType::IllegalCharacter(format!(
                "expected set name after {command}"
            ))));
        };

        let mut vector = false;
        // Link of this set only, e.g. (CHARACTERS=title)
        let mut set_link: Option<String> = None;
        if ctx.consume_if_byte(b'(')? {
            while let Some(option) = ctx.read_word()? {
                if option.eq_ignore_ascii_case(VECTOR) {
                    vector = true;
                } else if option.eq_ignore_ascii_case(STANDARD) {
                    vector = false;
                } else if ctx.consume_if_byte(KEY_VALUE_SEPARATOR)? {
                    let title = ctx.read_label()?.unwrap_or_default();
                    let link_name = NexusBlock::normalize_link_name(&option);
                    let Some(id) = ctx.state.titles.get(&(link_name.clone(), title.clone())).cloned() else {
                        return Err(ctx.error(ParsingErrorType::UnresolvedLabel(format!(
                            "no {link_name} block with title '{title}'"
                        ))));
                    };
                    if link_name == self.kind.link_name() {
                        set_link = Some(id);
                    } else {
                        log::debug!("Ignoring link to {link_name} block '{title}' of {command} {name}");
                    }
                } else {
                    return Err(ctx.error(ParsingErrorType::UnsupportedFeature(format!(
                        "set format option {option}"
                    ))));
                }
                ctx.consume_if_byte(b',')?;
            }
            ctx.expect_byte(b')', &format!("after format of {command}"))?;
        }
        ctx.expect_byte(KEY_VALUE_SEPARATOR, &format!("after name of {command}"))?;

        let linked = set_link.or_else(|| ctx.state.linked(self.kind.link_name()).cloned());
        let domain = self.domain(ctx, linked.as_deref());
        let prefix = match self.kind {
            SetKind::Characters => CHARACTER_SET_ID_PREFIX,
            SetKind::Taxa => OTU_SET_ID_PREFIX,
            SetKind::Trees => TREE_SET_ID_PREFIX,
        };
        let start = LinkedLabeledId::new(ctx.new_id(prefix), Some(name), linked);
        ctx.push(match self.kind {
            SetKind::Characters => StartEvent::CharacterSet(start),
            SetKind::Taxa => StartEvent::OtuSet(start),
            SetKind::Trees => StartEvent::TreeNetworkSet(start),
        });

        let result = if vector {
            self.read_vector(ctx, &domain)
        } else {
            ctx.hold_comments();
            self.read_standard(ctx, &domain)
        };
        ctx.release_comments();
        result?;
        ctx.push(Event::end(self.kind.content_type()));
        Ok(StepResult::Done)
    }
}

impl SetReader {
    fn domain<S: ByteSource>(&self, ctx: &NexusContext<S>, linked: Option<&str>) -> Domain {
        match self.kind {
            SetKind::Characters => Domain::Columns {
                count: linked
                    .and_then(|id| ctx.state.alignment_columns.get(id).copied())
                    .flatten(),
                names: linked
                    .and_then(|id| ctx.state.character_names.get(id).cloned())
                    .unwrap_or_default(),
            },
            SetKind::Taxa => {
                let otus = linked.and_then(|id| ctx.state.otu_lists.get(id));
                Domain::Elements {
                    ids: otus.map(|o| o.ids.clone()).unwrap_or_default(),
                    names: otus.map(|o| o.labels.clone()).unwrap_or_default(),
                    linked_type: ContentType::Otu,
                }
            }
            SetKind::Trees => {
                let trees = linked.and_then(|id| ctx.state.tree_groups.get(id));
                Domain::Elements {
                    ids: trees.map(|t| t.iter().map(|r| r.id.clone()).collect()).unwrap_or_default(),
                    names: trees.map(|t| t.iter().map(|r| r.name.clone()).collect()).unwrap_or_default(),
                    linked_type: ContentType::Tree,
                }
            }
        }
    }

    /// Total number of elements, required by `.`, `ALL` and vector format.
    fn element_count<S: ByteSource>(&self, ctx: &mut NexusContext<S>, domain: &Domain) -> Result<u64, ParsingError> {
        if self.kind == SetKind::Trees {
            return Err(ctx.error(ParsingErrorType::UnsupportedFeature(
                "'.' and ALL in TREESET".to_string(),
            )));
        }
        let count = match domain {
            Domain::Columns { count, .. } => *count,
            Domain::Elements { ids, .. } if !ids.is_empty() => Some(ids.len() as u64),
            Domain::Elements { .. } => None,
        };
        count.ok_or_else(|| {
            ctx.error(ParsingErrorType::UndefinedElementCount(format!(
                "no linked {} block declares the number of elements",
                self.kind.link_name()
            )))
        })
    }

    fn read_standard<S: ByteSource>(&self, ctx: &mut NexusContext<S>, domain: &Domain) -> Result<(), ParsingError> {
        loop {
            match ctx.peek_byte()? {
                None => return Err(ctx.unexpected_eof(format!("inside {}", self.kind.command()))),
                Some(COMMAND_END) => {
                    ctx.parser.next_byte();
                    return Ok(());
                }
                Some(SET_LAST) => {
                    return Err(ctx.error(ParsingErrorType::IllegalCharacter(
                        "'.' may only end a range".to_string(),
                    )));
                }
                Some(_) => {}
            }
            let Some(word) = ctx.read_word_until(ELEMENT_DELIMITERS, true)? else {
                let found = ctx.parser.peek().map(|b| b as char).unwrap_or(' ');
                return Err(ctx.error(ParsingErrorType::IllegalCharacter(format!(
                    "unexpected '{found}' in {}",
                    self.kind.command()
                ))));
            };

            if word.eq_ignore_ascii_case(ALL) {
                let count = self.element_count(ctx, domain)?;
                self.emit_range(ctx, domain, 1, count, 1)?;
            } else if word.eq_ignore_ascii_case(REMAINING) {
                return Err(ctx.error(ParsingErrorType::UnsupportedFeature(
                    "REMAINING in set definitions".to_string(),
                )));
            } else if word.bytes().all(|b| b.is_ascii_digit()) {
                let start = ctx.parse_positive_integer(&word, "set element")?;
                let mut end = start;
                if ctx.consume_if_byte(SET_TO)? {
                    end = if ctx.consume_if_byte(SET_LAST)? {
                        self.element_count(ctx, domain)?
                    } else {
                        read_set_integer(ctx, "end of range")?
                    };
                }
                let mut stride = 1;
                if ctx.consume_if_byte(SET_STRIDE)? {
                    stride = read_set_integer(ctx, "stride")?;
                }
                self.emit_range(ctx, domain, start, end, stride)?;
            } else {
                self.emit_named(ctx, domain, &word)?;
            }

            // Comments read while looking ahead follow the element
            ctx.release_comments();
            ctx.hold_comments();
        }
    }

    /// Emits the 1-based inclusive range `start..=end` with `stride`.
    fn emit_range<S: ByteSource>(
        &self,
        ctx: &mut NexusContext<S>,
        domain: &Domain,
        start: u64,
        end: u64,
        stride: u64,
    ) -> Result<(), ParsingError> {
        if end < start {
            return Err(ctx.error(ParsingErrorType::InvalidInteger(format!(
                "range {start}-{end} ends before it starts"
            ))));
        }
        match domain {
            Domain::Columns { count: Some(count), .. } if end > *count => {
                return Err(ctx.error(ParsingErrorType::InvalidInteger(format!(
                    "character {end} of {} exceeds NCHAR={count}",
                    self.kind.command()
                ))));
            }
            Domain::Columns { .. } if stride == 1 => ctx.push(Event::interval(start - 1, end)),
            Domain::Columns { .. } => {
                for column in (start - 1..end).step_by(stride as usize) {
                    ctx.push(Event::interval(column, column + 1));
                }
            }
            Domain::Elements { ids, linked_type, .. } => {
                if end as usize > ids.len() {
                    return Err(ctx.error(ParsingErrorType::UnresolvedLabel(format!(
                        "element {end} of {} does not exist",
                        self.kind.command()
                    ))));
                }
                for index in (start - 1..end).step_by(stride as usize) {
                    ctx.push(Event::set_element(ids[index as usize].clone(), *linked_type));
                }
            }
        }
        Ok(())
    }

    fn emit_named<S: ByteSource>(&self, ctx: &mut NexusContext<S>, domain: &Domain, name: &str) -> Result<(), ParsingError> {
        match domain {
            Domain::Columns { names, .. } => match names.get(name) {
                Some(&column) => {
                    ctx.push(Event::interval(column, column + 1));
                    Ok(())
                }
                None => Err(ctx.error(ParsingErrorType::UnresolvedLabel(format!(
                    "unknown character '{name}' in {}",
                    self.kind.command()
                )))),
            },
            Domain::Elements { ids, names, linked_type } => {
                match names.iter().position(|n| n == name) {
                    Some(index) => {
                        ctx.push(Event::set_element(ids[index].clone(), *linked_type));
                        Ok(())
                    }
                    None => Err(ctx.error(ParsingErrorType::UnresolvedLabel(format!(
                        "unknown element '{name}' in {}",
                        self.kind.command()
                    )))),
                }
            }
        }
    }

    fn read_vector<S: ByteSource>(&self, ctx: &mut NexusContext<S>, domain: &Domain) -> Result<(), ParsingError> {
        if self.kind == SetKind::Trees {
            return Err(ctx.error(ParsingErrorType::UnsupportedFeature(
                "vector format in TREESET".to_string(),
            )));
        }
        // Flags beyond the declared columns are rejected
        let columns = match domain {
            Domain::Columns { .. } => Some(self.element_count(ctx, domain)?),
            Domain::Elements { ids, .. } => {
                if ids.is_empty() {
                    self.element_count(ctx, domain)?;
                }
                None
            }
        };

        let mut index = 0u64;
        let mut run_start: Option<u64> = None;
        loop {
            let flag = match ctx.peek_byte()? {
                None => return Err(ctx.unexpected_eof(format!("inside {}", self.kind.command()))),
                Some(COMMAND_END) => {
                    ctx.parser.next_byte();
                    break;
                }
                Some(b) => {
                    ctx.parser.next_byte();
                    b
                }
            };
            match flag {
                SET_CONTAINED | SET_NOT_CONTAINED if columns.is_some_and(|count| index >= count) => {
                    return Err(ctx.error(ParsingErrorType::InvalidInteger(format!(
                        "vector of {} has more than NCHAR={} flags",
                        self.kind.command(),
                        columns.unwrap_or_default()
                    ))));
                }
                SET_CONTAINED => {
                    match domain {
                        Domain::Columns { .. } => {
                            if run_start.is_none() {
                                // Comments inside a run follow its interval
                                ctx.hold_comments();
                                run_start = Some(index);
                            }
                        }
                        Domain::Elements { ids, linked_type, .. } => match ids.get(index as usize) {
                            Some(id) => ctx.push(Event::set_element(id.clone(), *linked_type)),
                            None => {
                                return Err(ctx.error(ParsingErrorType::UnresolvedLabel(format!(
                                    "element {} of {} does not exist",
                                    index + 1,
                                    self.kind.command()
                                ))));
                            }
                        },
                    }
                }
                SET_NOT_CONTAINED => {
                    if let Some(start) = run_start.take() {
                        ctx.push(Event::interval(start, index));
                        ctx.release_comments();
                    }
                }
                other => {
                    return Err(ctx.error(ParsingErrorType::IllegalCharacter(format!(
                        "expected '0' or '1' in vector format but found '{}'",
                        other as char
                    ))));
                }
            }
            index += 1;
        }
        if let Some(start) = run_start {
            ctx.push(Event::interval(start, index));
            ctx.release_comments();
        }
        Ok(())
    }
}

/// Reads a positive integer ending at any set punctuation.
fn read_set_integer<S: ByteSource>(ctx: &mut NexusContext<S>, what: &str) -> Result<u64, ParsingError> {
    match ctx.read_word_until(ELEMENT_DELIMITERS, false)? {
        Some(word) => ctx.parse_positive_integer(&word, what),
        None => match ctx.parser.peek() {
            None => Err(ctx.unexpected_eof(format!("expected {what}"))),
            Some(b) => Err(ctx.error(ParsingErrorType::InvalidInteger(format!(
                "expected {what} but found '{}'",
                b as char
            )))),
        },
    }
}

// =#========================================================================#=
// TESTS - SETS
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::nexus::context::{OtuListInfo, TreeRef};
    use crate::parameters::ReadWriteParameters;
    use crate::parser::{ByteParser, InMemoryByteSource};
    use pretty_assertions::assert_eq;

    fn context(input: &str) -> NexusContext<InMemoryByteSource> {
        let mut ctx = NexusContext::new(ByteParser::for_str(input), ReadWriteParameters::default());
        ctx.state.alignment_columns.insert("matrix1".to_string(), Some(10));
        ctx.state.last_alignment = Some("matrix1".to_string());
        let mut otus = OtuListInfo::default();
        for (label, id) in [("A", "otu2"), ("B", "otu3"), ("C", "otu4")] {
            otus.labels.push(label.to_string());
            otus.ids.push(id.to_string());
            otus.by_label.insert(label.to_string(), id.to_string());
        }
        ctx.state.otu_lists.insert("otus1".to_string(), otus);
        ctx.state.last_otu_list = Some("otus1".to_string());
        ctx
    }

    fn read(kind: SetKind, input: &str) -> Result<Vec<Event>, ParsingError> {
        let mut ctx = context(input);
        SetReader::new(kind).step(&mut ctx)?;
        Ok(ctx.events.into_iter().skip(1).collect())
    }

    #[test]
    fn test_standard_character_set() {
        let events = read(SetKind::Characters, " coding = 1-3 5 [x] 7-.\\2;").unwrap();
        assert_eq!(
            events,
            vec![
                Event::interval(0, 3),
                Event::interval(4, 5),
                Event::comment("x"),
                Event::interval(6, 7),
                Event::interval(8, 9),
                Event::end(ContentType::CharacterSet),
            ]
        );
    }

    #[test]
    fn test_vector_character_set() {
        let events = read(SetKind::Characters, " v (VECTOR) = 1110010000;").unwrap();
        assert_eq!(
            events,
            vec![
                Event::interval(0, 3),
                Event::interval(5, 6),
                Event::end(ContentType::CharacterSet),
            ]
        );
    }

    #[test]
    fn test_vector_comment_follows_run() {
        let events = read(SetKind::Characters, " v (VECTOR) = 11[c]1000 [d];").unwrap();
        assert_eq!(
            events,
            vec![
                Event::interval(0, 3),
                Event::comment("c"),
                Event::comment("d"),
                Event::end(ContentType::CharacterSet),
            ]
        );
    }

    #[test]
    fn test_named_characters() {
        let mut ctx = context(" genes = coxI 'cyt b' 9;");
        let names = HashMap::from([("coxI".to_string(), 0), ("cyt b".to_string(), 4)]);
        ctx.state.character_names.insert("matrix1".to_string(), names);
        SetReader::new(SetKind::Characters).step(&mut ctx).unwrap();
        let events: Vec<Event> = ctx.events.into_iter().skip(1).collect();
        assert_eq!(
            events,
            vec![
                Event::interval(0, 1),
                Event::interval(4, 5),
                Event::interval(8, 9),
                Event::end(ContentType::CharacterSet),
            ]
        );
    }

    #[test]
    fn test_columns_beyond_nchar() {
        let err = read(SetKind::Characters, " x = 2-11;").unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::InvalidInteger(_)));
        assert!(err.kind().is_syntax_error());
        let err = read(SetKind::Characters, " x = 11;").unwrap_err();
        assert!(err.kind().is_syntax_error());
        let err = read(SetKind::Characters, " v (VECTOR) = 11111111111;").unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::InvalidInteger(_)));
        // trailing zeros count as well
        let err = read(SetKind::Characters, " v (VECTOR) = 10000000000;").unwrap_err();
        assert!(err.kind().is_syntax_error());

        let mut ctx = context(" v (VECTOR) = 111;");
        ctx.state.alignment_columns.clear();
        ctx.state.last_alignment = None;
        let err = SetReader::new(SetKind::Characters).step(&mut ctx).unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::UndefinedElementCount(_)));
    }

    #[test]
    fn test_per_set_link_applies_to_one_set() {
        let mut ctx = context(" a (CHARACTERS=X) = 1; CHARSET b = 1;");
        ctx.state.alignment_columns.insert("matrix7".to_string(), Some(4));
        ctx.state
            .titles
            .insert(("CHARACTERS".to_string(), "X".to_string()), "matrix7".to_string());
        SetReader::new(SetKind::Characters).step(&mut ctx).unwrap();
        assert!(ctx.state.block_links.is_empty());
        assert_eq!(ctx.read_word().unwrap().as_deref(), Some("CHARSET"));
        SetReader::new(SetKind::Characters).step(&mut ctx).unwrap();
        let links: Vec<Option<String>> = ctx
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Start(StartEvent::CharacterSet(set)) => Some(set.linked_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(links, vec![Some("matrix7".to_string()), Some("matrix1".to_string())]);
    }

    #[test]
    fn test_taxon_set_by_index_and_name() {
        let events = read(SetKind::Taxa, " outgroup = 1 'C';").unwrap();
        assert_eq!(
            events,
            vec![
                Event::set_element("otu2", ContentType::Otu),
                Event::set_element("otu4", ContentType::Otu),
                Event::end(ContentType::OtuSet),
            ]
        );
    }

    #[test]
    fn test_tree_set() {
        let mut ctx = context(" best = 2 t1;");
        ctx.state.tree_groups.insert(
            "trees1".to_string(),
            vec![
                TreeRef { name: "t1".to_string(), id: "tree5".to_string() },
                TreeRef { name: "t2".to_string(), id: "tree6".to_string() },
            ],
        );
        ctx.state.last_tree_group = Some("trees1".to_string());
        SetReader::new(SetKind::Trees).step(&mut ctx).unwrap();
        let events: Vec<Event> = ctx.events.into_iter().skip(1).collect();
        assert_eq!(
            events,
            vec![
                Event::set_element("tree6", ContentType::Tree),
                Event::set_element("tree5", ContentType::Tree),
                Event::end(ContentType::TreeNetworkSet),
            ]
        );

        let err = read(SetKind::Trees, " all = ALL;").unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::UnsupportedFeature(_)));
    }

    #[test]
    fn test_errors() {
        let err = read(SetKind::Characters, " x = .-3;").unwrap_err();
        assert!(err.kind().is_syntax_error());
        let err = read(SetKind::Characters, " x = REMAINING;").unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::UnsupportedFeature(_)));
        let err = read(SetKind::Characters, " x = first;").unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::UnresolvedLabel(_)));

        let mut ctx = context(" x = 2-.;");
        ctx.state.alignment_columns.insert("matrix1".to_string(), None);
        let err = SetReader::new(SetKind::Characters).step(&mut ctx).unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::UndefinedElementCount(_)));
    }
}
