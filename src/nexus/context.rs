//! Per-document parse context shared by the outer block loop and all command
//! readers: input position, pending events, ID manager, options and the typed
//! cross-command state.

use crate::events::{ContentType, Event, LabeledId, LinkedLabeledId, StartEvent, comment_events};
use crate::model::IdManager;
use crate::nexus::defs::*;
use crate::parameters::ReadWriteParameters;
use crate::parser::utils::unescape_unquoted_label;
use crate::parser::{ByteParser, ByteSource, ParsingError, ParsingErrorType};
use std::collections::{HashMap, VecDeque};

// =#========================================================================#=
// SHARED PARSE STATE
// =#========================================================================€=
/// Declarations of a DIMENSIONS command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub ntax: Option<u64>,
    pub nchar: Option<u64>,
    pub new_taxa: bool,
}

/// Matrix layout declared by a FORMAT command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixFormat {
    /// Tokens are whitespace separated words instead of single characters
    pub long_tokens: bool,
    pub interleave: bool,
    /// Rows start with a sequence name
    pub labels: bool,
    pub transpose: bool,
}

impl Default for MatrixFormat {
    fn default() -> Self {
        Self {
            long_tokens: false,
            interleave: false,
            labels: true,
            transpose: false,
        }
    }
}

/// Taxa of one TAXA block.
#[derive(Debug, Clone, Default)]
pub struct OtuListInfo {
    /// Labels in declaration order
    pub labels: Vec<String>,
    /// OTU IDs in declaration order
    pub ids: Vec<String>,
    /// OTU ID per label
    pub by_label: HashMap<String, String>,
}

/// Tree of a TREES block, as referenced by TREESET commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRef {
    pub name: String,
    pub id: String,
}

/// Typed state written by one command and read by later ones.
///
/// Block scoped fields are reset at the end of each block, document scoped
/// fields live as long as the parse.
#[derive(Debug, Default)]
pub struct SharedParseState {
    // ---- block scope ----
    pub block: Option<NexusBlock>,
    pub block_title: Option<String>,
    /// Linked element ID per normalized block type name (e.g. "TAXA")
    pub block_links: HashMap<String, String>,
    /// ID of the container element the current block represents
    pub block_element_id: Option<String>,
    /// Whether the container start event of the current block was emitted
    pub block_started: bool,
    pub dimensions: Dimensions,
    pub format: MatrixFormat,

    // ---- document scope ----
    pub otu_lists: HashMap<String, OtuListInfo>,
    pub last_otu_list: Option<String>,
    /// Element ID per (normalized block type name, title)
    pub titles: HashMap<(String, String), String>,
    /// Declared column count per alignment ID
    pub alignment_columns: HashMap<String, Option<u64>>,
    /// 0-based column per character name, per alignment ID
    pub character_names: HashMap<String, HashMap<String, u64>>,
    pub last_alignment: Option<String>,
    pub tree_groups: HashMap<String, Vec<TreeRef>>,
    pub last_tree_group: Option<String>,
    /// TRANSLATE table of the current TREES block
    pub translation: HashMap<String, String>,
}

impl SharedParseState {
    /// Clears all block scoped fields.
    pub fn reset_block(&mut self) {
        self.block = None;
        self.block_title = None;
        self.block_links.clear();
        self.block_element_id = None;
        self.block_started = false;
        self.dimensions = Dimensions::default();
        self.format = MatrixFormat::default();
        self.translation.clear();
    }

    /// ID of the element of type `link_name` linked to the current block,
    /// falling back to the most recent one.
    pub fn linked(&self, link_name: &str) -> Option<&String> {
        self.block_links.get(link_name).or(match link_name {
            "TAXA" => self.last_otu_list.as_ref(),
            "CHARACTERS" => self.last_alignment.as_ref(),
            "TREES" => self.last_tree_group.as_ref(),
            _ => None,
        })
    }

    /// OTU list linked to the current block.
    pub fn linked_otu_list(&self) -> Option<&OtuListInfo> {
        self.linked("TAXA").and_then(|id| self.otu_lists.get(id))
    }

    /// OTU ID of the taxon with `label` in the linked OTU list.
    pub fn otu_id_for_label(&self, label: &str) -> Option<String> {
        self.linked_otu_list()
            .and_then(|otus| otus.by_label.get(label))
            .cloned()
    }
}

// =#========================================================================#=
// NEXUS CONTEXT
// =#========================================================================$=
/// Everything command readers work on.
pub struct NexusContext<S: ByteSource> {
    pub(crate) parser: ByteParser<S>,
    pub(crate) events: VecDeque<Event>,
    pub(crate) ids: IdManager,
    pub(crate) state: SharedParseState,
    pub(crate) parameters: ReadWriteParameters,
    /// Comments read while this is `Some` are held back instead of emitted
    held_comments: Option<Vec<Event>>,
}

impl<S: ByteSource> NexusContext<S> {
    pub fn new(parser: ByteParser<S>, parameters: ReadWriteParameters) -> Self {
        Self {
            parser,
            events: VecDeque::new(),
            ids: IdManager::new(parameters.replace_used_ids),
            state: SharedParseState::default(),
            parameters,
            held_comments: None,
        }
    }

    /// Appends an event to the pending events.
    pub fn push(&mut self, event: impl Into<Event>) {
        self.events.push_back(event.into());
    }

    /// State shared between the commands of the document.
    pub fn state(&self) -> &SharedParseState {
        &self.state
    }

    pub fn parameters(&self) -> &ReadWriteParameters {
        &self.parameters
    }

    /// Creates a new document-wide unique ID.
    pub fn new_id(&mut self, prefix: &str) -> String {
        self.ids.create_new_id(prefix)
    }

    /// Registers an ID taken from the document.
    ///
    /// # Errors
    /// [ParsingErrorType::DuplicateId] if it is used and replacing is disabled.
    pub fn propose_id(&mut self, candidate: &str) -> Result<String, ParsingError> {
        self.ids
            .propose_id(candidate)
            .map_err(|e| self.error(ParsingErrorType::DuplicateId(e.to_string())))
    }

    /// Creates an error of `kind` at the current position.
    pub fn error(&mut self, kind: ParsingErrorType) -> ParsingError {
        ParsingError::from_parser(kind, &mut self.parser)
    }

    /// Creates an error for a premature end of input, unless the end was
    /// caused by an I/O error, which is reported instead.
    pub fn unexpected_eof(&mut self, msg: impl Into<String>) -> ParsingError {
        match self.parser.check_io() {
            Err(e) => e,
            Ok(()) => ParsingError::unexpected_eof(&mut self.parser, msg),
        }
    }

    // ============================================================================
    // Comments
    // ============================================================================
    /// Emits a comment, split into continued events if it exceeds the maximum
    /// comment length.
    pub fn emit_comment(&mut self, content: String) {
        let events = comment_events(content, self.parameters.max_comment_length);
        match self.held_comments.as_mut() {
            Some(held) => held.extend(events),
            None => self.events.extend(events),
        }
    }

    /// Starts holding back comments until [release_comments](Self::release_comments).
    pub fn hold_comments(&mut self) {
        self.held_comments.get_or_insert_with(Vec::new);
    }

    /// Emits all held comments and stops holding.
    pub fn release_comments(&mut self) {
        if let Some(held) = self.held_comments.take() {
            self.events.extend(held);
        }
    }

    /// Reads the comment starting at the current `[` and emits it.
    pub fn read_comment(&mut self) -> Result<(), ParsingError> {
        self.parser.next_byte(); // consume '['
        let content = self.parser.read_comment_body(usize::MAX)?;
        self.emit_comment(content);
        Ok(())
    }

    /// Skips whitespace and emits all comments on the way.
    pub fn skip_whitespace_and_comments(&mut self) -> Result<(), ParsingError> {
        loop {
            self.parser.skip_whitespace();
            if self.parser.peek() == Some(COMMENT_START) {
                self.read_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    /// Skips whitespace and comments up to the next line break.
    ///
    /// # Returns
    /// `true` if the parser stands at a line break (not consumed)
    pub fn skip_whitespace_and_comments_in_line(&mut self) -> Result<bool, ParsingError> {
        loop {
            if self.parser.skip_whitespace_in_line() {
                return Ok(true);
            }
            if self.parser.peek() == Some(COMMENT_START) {
                self.read_comment()?;
            } else {
                return Ok(false);
            }
        }
    }

    // ============================================================================
    // Words and values
    // ============================================================================
    /// Next byte after whitespace and comments.
    pub fn peek_byte(&mut self) -> Result<Option<u8>, ParsingError> {
        self.skip_whitespace_and_comments()?;
        Ok(self.parser.peek())
    }

    /// Consumes `b` if it is the next byte after whitespace and comments.
    pub fn consume_if_byte(&mut self, b: u8) -> Result<bool, ParsingError> {
        self.skip_whitespace_and_comments()?;
        Ok(self.parser.consume_if(b))
    }

    /// Consumes `b`, which has to be the next byte after whitespace and comments.
    ///
    /// # Errors
    /// Illegal character or unexpected end of input otherwise.
    pub fn expect_byte(&mut self, b: u8, context: &str) -> Result<(), ParsingError> {
        match self.peek_byte()? {
            Some(found) if found == b => {
                self.parser.next_byte();
                Ok(())
            }
            Some(found) => Err(self.error(ParsingErrorType::IllegalCharacter(format!(
                "expected '{}' {context} but found '{}'",
                b as char, found as char
            )))),
            None => Err(self.unexpected_eof(format!("expected '{}' {context}", b as char))),
        }
    }

    /// Consumes the `;` terminating the current command.
    pub fn expect_command_end(&mut self, command: &str) -> Result<(), ParsingError> {
        self.expect_byte(COMMAND_END, &format!("at the end of {command}"))
    }

    /// Reads the next word without changing it.
    ///
    /// A word is either quoted (`'...'` with `''` escaping a quote) or runs
    /// until whitespace or punctuation.
    ///
    /// # Returns
    /// `None` if the next byte is punctuation or the input ended
    pub fn read_word(&mut self) -> Result<Option<String>, ParsingError> {
        self.read_word_until(WORD_DELIMITERS, false)
    }

    /// Reads the next word as label: like [read_word](Self::read_word), but
    /// underscores of unquoted words are replaced by spaces.
    pub fn read_label(&mut self) -> Result<Option<String>, ParsingError> {
        self.read_word_until(WORD_DELIMITERS, true)
    }

    /// Reads the next word, ending unquoted words at any of `delimiters`.
    pub fn read_word_until(&mut self, delimiters: &[u8], as_label: bool) -> Result<Option<String>, ParsingError> {
        match self.peek_byte()? {
            None => Ok(None),
            Some(WORD_QUOTE) => Ok(Some(self.parser.parse_quoted_label()?)),
            Some(b) if delimiters.contains(&b) => Ok(None),
            Some(_) => {
                let word = self.parser.parse_unquoted_label(delimiters)?;
                Ok(Some(if as_label { unescape_unquoted_label(&word) } else { word }))
            }
        }
    }

    /// Reads a subcommand value: a word, a quoted word or a `"..."` delimited value.
    pub fn read_value(&mut self) -> Result<Option<String>, ParsingError> {
        if self.peek_byte()? == Some(VALUE_DELIMITER) {
            return Ok(Some(self.parser.parse_delimited_label(VALUE_DELIMITER)?));
        }
        self.read_word()
    }

    /// Parses `word` as positive integer.
    ///
    /// # Errors
    /// [ParsingErrorType::InvalidInteger] if it is not a positive integer.
    pub fn parse_positive_integer(&mut self, word: &str, what: &str) -> Result<u64, ParsingError> {
        match word.parse::<u64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(self.error(ParsingErrorType::InvalidInteger(format!(
                "{what} must be a positive integer, found '{word}'"
            )))),
        }
    }

    /// Reads the next word as positive integer.
    pub fn read_positive_integer(&mut self, what: &str) -> Result<u64, ParsingError> {
        match self.read_word()? {
            Some(word) => self.parse_positive_integer(&word, what),
            None => match self.parser.peek() {
                None => Err(self.unexpected_eof(format!("expected {what}"))),
                Some(b) => Err(self.error(ParsingErrorType::InvalidInteger(format!(
                    "expected {what} but found '{}'",
                    b as char
                )))),
            },
        }
    }

    /// Reads the raw remainder of the current command and consumes its `;`.
    ///
    /// Quoted words and comments are kept verbatim.
    pub fn read_command_content(&mut self, command: &str) -> Result<String, ParsingError> {
        let mut content = Vec::new();
        loop {
            match self.parser.next_byte() {
                None => return Err(self.unexpected_eof(format!("inside {command} command"))),
                Some(COMMAND_END) => break,
                Some(quote @ (WORD_QUOTE | VALUE_DELIMITER)) => {
                    content.push(quote);
                    loop {
                        match self.parser.next_byte() {
                            None => return Err(self.unexpected_eof(format!("inside quoted word of {command}"))),
                            Some(b) => {
                                content.push(b);
                                if b == quote {
                                    break;
                                }
                            }
                        }
                    }
                }
                Some(COMMENT_START) => {
                    let comment = self.parser.read_comment_body(usize::MAX)?;
                    content.push(COMMENT_START);
                    content.extend_from_slice(comment.as_bytes());
                    content.push(b']');
                }
                Some(b) => content.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&content).trim().to_string())
    }

    // ============================================================================
    // Block containers
    // ============================================================================
    /// Emits the container start event of the current block, if the block has
    /// a container and it was not started yet.
    pub fn ensure_block_started(&mut self) {
        if self.state.block_started {
            return;
        }
        let Some(block) = self.state.block.clone() else {
            return;
        };
        let Some(container) = block.container() else {
            return;
        };
        let id = match self.state.block_element_id.clone() {
            Some(id) => id,
            None => {
                let id = self.new_id(container_prefix(container));
                self.state.block_element_id = Some(id.clone());
                id
            }
        };
        let label = self.state.block_title.clone();
        self.state.block_started = true;

        let start = match container {
            ContentType::OtuList => {
                self.state.otu_lists.entry(id.clone()).or_default();
                self.state.last_otu_list = Some(id.clone());
                StartEvent::OtuList(LabeledId::new(id, label))
            }
            ContentType::Alignment => {
                let linked = self.state.linked("TAXA").cloned();
                self.state
                    .alignment_columns
                    .insert(id.clone(), self.state.dimensions.nchar);
                self.state.last_alignment = Some(id.clone());
                StartEvent::Alignment(LinkedLabeledId::new(id, label, linked))
            }
            _ => {
                let linked = self.state.linked("TAXA").cloned();
                self.state.tree_groups.entry(id.clone()).or_default();
                self.state.last_tree_group = Some(id.clone());
                StartEvent::TreeNetworkGroup(LinkedLabeledId::new(id, label, linked))
            }
        };
        log::trace!("Start of {container} '{}'", start.id());
        self.push(start);
    }
}

/// ID prefix of block container elements.
pub(crate) fn container_prefix(container: ContentType) -> &'static str {
    use crate::model::id_manager::*;
    match container {
        ContentType::OtuList => OTU_LIST_ID_PREFIX,
        ContentType::Alignment => MATRIX_ID_PREFIX,
        _ => TREE_NETWORK_GROUP_ID_PREFIX,
    }
}

// =#========================================================================#=
// TESTS - NEXUS CONTEXT
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SoleEvent;
    use crate::parser::InMemoryByteSource;

    fn context(input: &str) -> NexusContext<InMemoryByteSource> {
        NexusContext::new(ByteParser::for_str(input), ReadWriteParameters::default())
    }

    #[test]
    fn test_words_and_labels() {
        let mut ctx = context("  Little_Spotted [kiwi] 'Great_Spotted' ;");
        assert_eq!(ctx.read_word().unwrap().as_deref(), Some("Little_Spotted"));
        assert_eq!(ctx.read_label().unwrap().as_deref(), Some("Great_Spotted"));
        assert_eq!(ctx.read_word().unwrap(), None);
        ctx.expect_command_end("TEST").unwrap();
        assert_eq!(ctx.events.pop_front(), Some(Event::comment("kiwi")));
    }

    #[test]
    fn test_long_comments_are_split() {
        let mut ctx = context("");
        ctx.parameters.max_comment_length = 3;
        ctx.emit_comment("abcdefg".to_string());
        let parts: Vec<_> = ctx
            .events
            .iter()
            .map(|e| match e {
                Event::Sole(SoleEvent::Comment(c)) => (c.content.as_str(), c.continued_in_next_event),
                _ => panic!("not a comment"),
            })
            .collect();
        assert_eq!(parts, vec![("abc", true), ("def", true), ("g", false)]);
    }

    #[test]
    fn test_positive_integers() {
        let mut ctx = context("12 0 x");
        assert_eq!(ctx.read_positive_integer("NTAX").unwrap(), 12);
        let err = ctx.read_positive_integer("NTAX").unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::InvalidInteger(_)));
        assert_eq!(err.position().column, 5);
    }

    #[test]
    fn test_raw_command_content() {
        let mut ctx = context(" Foo='a;b' [c;d] bar; next");
        assert_eq!(ctx.read_command_content("X").unwrap(), "Foo='a;b' [c;d] bar");
        assert_eq!(ctx.read_word().unwrap().as_deref(), Some("next"));
    }
}
