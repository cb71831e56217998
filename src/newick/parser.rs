//! Parsing of single Newick strings into a node arena and conversion of
//! parsed trees into events.
//!
//! Both the Newick reader and the Nexus `TREE` command use the
//! [NewickTreeParser]. Nodes may have any number of children. Plain
//! comments inside the tree are collected, hot comments `[&key=value,...]`
//! become annotations of the node they follow.

use crate::events::{
    ContentType, EdgeEvent, Event, LabeledId, LinkedLabeledId, LiteralContentEvent,
    LiteralMetadataEvent, ObjectValue, StartEvent,
};
use crate::model::IdManager;
use crate::model::id_manager::{EDGE_ID_PREFIX, META_ID_PREFIX, NODE_ID_PREFIX, TREE_ID_PREFIX};
use crate::newick::defs::*;
use crate::parser::utils::unescape_unquoted_label;
use crate::parser::{ByteParser, ByteSource, ParsingError};
use std::collections::VecDeque;

/// Index of a node in the arena of a [ParsedTree].
pub type NodeIndex = usize;

/// Original type hint of literal metadata read from hot comments.
pub const ANNOTATION_ORIGINAL_TYPE: &str = "nexus:annotation";

// =#========================================================================#=
// PARSED TREE
// =#========================================================================€=
/// Node of a [ParsedTree].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedNode {
    pub label: Option<String>,
    /// Length of the branch to the parent
    pub length: Option<f64>,
    pub annotations: Vec<(String, ObjectValue)>,
    pub children: Vec<NodeIndex>,
    pub parent: Option<NodeIndex>,
}

/// Tree read from one Newick string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTree {
    pub nodes: Vec<ParsedNode>,
    pub root: NodeIndex,
    /// `Some(true)` for `[&R]`, `Some(false)` for `[&U]`
    pub rooted: Option<bool>,
    /// Hot comments preceding the tree
    pub annotations: Vec<(String, ObjectValue)>,
    /// Plain comments inside the tree, in reading order
    pub comments: Vec<String>,
}

impl ParsedTree {
    /// Whether the tree is treated as rooted: unless marked `[&U]`.
    pub fn is_rooted(&self) -> bool {
        self.rooted != Some(false)
    }

    /// Node indices in pre-order.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.nodes[index].children.iter().rev());
        }
        order
    }

    /// Appends the events of all annotations, nodes and edges of this tree.
    ///
    /// The caller emits the tree start, comments and tree end around these.
    /// Nodes come first in pre-order, each with its annotations nested as
    /// literal metadata, followed by the edges: the root edge (if rooted) and
    /// one per parent-child link.
    ///
    /// # Arguments
    /// * `ids` - ID manager of the document
    /// * `resolve` - Maps a node label to the label to report and the ID of
    ///   the linked OTU
    /// * `out` - Event queue to append to
    pub(crate) fn push_content_events<F>(self, ids: &mut IdManager, resolve: F, out: &mut VecDeque<Event>)
    where
        F: Fn(String) -> (Option<String>, Option<String>),
    {
        push_annotations(self.annotations.iter(), ids, out);

        let order = self.preorder();
        let mut node_ids = vec![String::new(); self.nodes.len()];
        for &index in &order {
            let node = &self.nodes[index];
            let id = ids.create_new_id(NODE_ID_PREFIX);
            let (label, otu) = match node.label.clone() {
                Some(label) => resolve(label),
                None => (None, None),
            };
            out.push_back(StartEvent::Node(LinkedLabeledId::new(id.clone(), label, otu)).into());
            push_annotations(node.annotations.iter(), ids, out);
            out.push_back(Event::end(ContentType::Node));
            node_ids[index] = id;
        }

        for &index in &order {
            let node = &self.nodes[index];
            let source_id = match node.parent {
                Some(parent) => Some(node_ids[parent].clone()),
                None if self.is_rooted() => None,
                None => continue,
            };
            out.push_back(
                StartEvent::Edge(EdgeEvent {
                    id: ids.create_new_id(EDGE_ID_PREFIX),
                    label: None,
                    source_id,
                    target_id: node_ids[index].clone(),
                    length: node.length,
                })
                .into(),
            );
            out.push_back(Event::end(ContentType::Edge));
        }
    }
}

fn push_annotations<'a>(
    annotations: impl Iterator<Item = &'a (String, ObjectValue)>,
    ids: &mut IdManager,
    out: &mut VecDeque<Event>,
) {
    for (key, value) in annotations {
        let meta = LiteralMetadataEvent::new(ids.create_new_id(META_ID_PREFIX), key.clone())
            .with_original_type(ANNOTATION_ORIGINAL_TYPE);
        out.push_back(StartEvent::LiteralMetadata(meta).into());
        out.push_back(Event::literal_content(LiteralContentEvent::simple(value.clone())));
        out.push_back(Event::end(ContentType::LiteralMetadata));
    }
}

/// Tree start event with a fresh ID.
pub(crate) fn tree_start(ids: &mut IdManager, label: Option<String>) -> Event {
    StartEvent::Tree(LabeledId::new(ids.create_new_id(TREE_ID_PREFIX), label)).into()
}

// =#========================================================================#=
// NEWICK TREE PARSER
// =#========================================================================$=
/// Parser for single Newick trees.
///
/// # Example
/// ```
/// use phylostream::newick::NewickTreeParser;
/// use phylostream::parser::ByteParser;
///
/// let mut byte_parser = ByteParser::for_str("[&U] ((Kea:1.0,Kaka:1.0)[&support=0.9]:0.5,Kakapo:1.5);");
/// let tree = NewickTreeParser::new().parse_tree(&mut byte_parser).unwrap();
///
/// assert_eq!(tree.nodes.len(), 5);
/// assert!(!tree.is_rooted());
/// ```
#[derive(Debug, Default)]
pub struct NewickTreeParser {
    nodes: Vec<ParsedNode>,
    comments: Vec<String>,
}

impl NewickTreeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one tree including leading markers and its terminating `;`.
    ///
    /// # Arguments
    /// * `parser` - The byte parser positioned at the start of a Newick tree
    ///   string (leading whitespace and comments are allowed)
    ///
    /// # Errors
    /// [InvalidNewickString](crate::parser::ParsingErrorType::InvalidNewickString)
    /// if the string is malformed, or an error for a premature end of input.
    pub fn parse_tree<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<ParsedTree, ParsingError> {
        self.nodes.clear();
        self.comments.clear();

        let mut rooted = None;
        let mut annotations = Vec::new();
        loop {
            self.skip_whitespace_and_comments(parser)?;
            if parser.consume_if_sequence(ROOTED_MARKER) {
                rooted = Some(true);
            } else if parser.consume_if_sequence(UNROOTED_MARKER) {
                rooted = Some(false);
            } else if let Some(parsed) = self.parse_annotations(parser)? {
                annotations.extend(parsed);
            } else {
                break;
            }
        }

        if parser.is_eof() {
            return Err(eof(parser, "expected Newick tree"));
        }
        let root = self.parse_vertex(parser)?;

        self.skip_whitespace_and_comments(parser)?;
        if !parser.consume_if(TREE_END) {
            return match parser.peek() {
                None => Err(eof(parser, "expected ';' at end of tree")),
                Some(b) => Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Expected ';' at end of tree but found '{}'", b as char),
                )),
            };
        }

        Ok(ParsedTree {
            nodes: std::mem::take(&mut self.nodes),
            root,
            rooted,
            annotations,
            comments: std::mem::take(&mut self.comments),
        })
    }

    /// Skips whitespace and collects plain comments, stopping at hot comments.
    fn skip_whitespace_and_comments<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<(), ParsingError> {
        loop {
            parser.skip_whitespace();
            if parser.peek() == Some(b'[') && !parser.peek_is_sequence(ANNOTATION_START) {
                parser.next_byte();
                let comment = parser.read_comment_body(usize::MAX)?;
                self.comments.push(comment);
            } else {
                return Ok(());
            }
        }
    }

    /// Parses a vertex with its subtree, adds it to the arena and returns
    /// its index:
    /// - `(child, child, ...)[label][annotations][:branch_length][annotations]`
    /// - `label[annotations][:branch_length][annotations]`
    fn parse_vertex<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<NodeIndex, ParsingError> {
        self.skip_whitespace_and_comments(parser)?;
        let children = if parser.peek() == Some(b'(') {
            self.parse_children(parser)?
        } else {
            Vec::new()
        };

        self.skip_whitespace_and_comments(parser)?;
        let label = match parser.peek() {
            Some(b'\'') => Some(parser.parse_quoted_label()?),
            Some(b) if !NEWICK_LABEL_DELIMITERS.contains(&b) => {
                let raw = parser.parse_unquoted_label(NEWICK_LABEL_DELIMITERS)?;
                Some(unescape_unquoted_label(&raw))
            }
            _ => None,
        };

        self.skip_whitespace_and_comments(parser)?;
        let mut annotations = self.parse_annotations(parser)?.unwrap_or_default();
        let length = self.parse_branch_length(parser)?;
        self.skip_whitespace_and_comments(parser)?;
        if let Some(more) = self.parse_annotations(parser)? {
            annotations.extend(more);
        }

        let index = self.nodes.len();
        for &child in &children {
            self.nodes[child].parent = Some(index);
        }
        self.nodes.push(ParsedNode {
            label,
            length,
            annotations,
            children,
            parent: None,
        });
        Ok(index)
    }

    /// Parses the children list `(a, b, ...)` and returns their indices.
    /// Expects the parser at the opening `(`.
    fn parse_children<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<Vec<NodeIndex>, ParsingError> {
        parser.next_byte(); // consume '('
        let mut children = Vec::new();
        loop {
            children.push(self.parse_vertex(parser)?);
            self.skip_whitespace_and_comments(parser)?;
            match parser.next_byte() {
                Some(b',') => continue,
                Some(b')') => return Ok(children),
                Some(b) => {
                    return Err(ParsingError::invalid_newick_string(
                        parser,
                        format!("Expected ',' or ')' after child but found '{}'", b as char),
                    ));
                }
                None => return Err(eof(parser, "expected ')' closing children")),
            }
        }
    }

    /// Parses an optional branch length `:number`, supporting scientific
    /// notation (e.g. `1.5e-10`).
    fn parse_branch_length<B: ByteSource>(&mut self, parser: &mut ByteParser<B>) -> Result<Option<f64>, ParsingError> {
        self.skip_whitespace_and_comments(parser)?;
        if !parser.consume_if(b':') {
            return Ok(None);
        }
        self.skip_whitespace_and_comments(parser)?;

        let mut branch_length_str = String::new();
        while let Some(b) = parser.peek() {
            if b.is_ascii_digit() || b == b'.' || b == b'-' || b == b'+' || b == b'e' || b == b'E' {
                branch_length_str.push(b as char);
                parser.next_byte();
            } else {
                break;
            }
        }

        let value: f64 = branch_length_str.parse().map_err(|_| {
            ParsingError::invalid_newick_string(parser, format!("Invalid branch length: '{branch_length_str}'"))
        })?;
        Ok(Some(value))
    }

    /// Parses a hot comment `[&key=value,...]` if present.
    ///
    /// Values are typed as integer, float or text. Values in braces (e.g.
    /// `{0.1,0.3}`) or double quotes are kept as text; keys without value are
    /// flags with value `true`.
    ///
    /// # Returns
    /// `None` if the current position is not `[&`
    fn parse_annotations<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<Option<Vec<(String, ObjectValue)>>, ParsingError> {
        if !parser.consume_if_sequence(ANNOTATION_START) {
            return Ok(None);
        }

        let mut annotations = Vec::new();
        loop {
            parser.skip_whitespace();
            let key = parser.parse_unquoted_label(b"=,]")?.trim().to_string();
            if key.is_empty() {
                return Err(ParsingError::invalid_newick_string(parser, "Empty annotation key"));
            }

            let value = if parser.consume_if(b'=') {
                parser.skip_whitespace();
                match parser.peek() {
                    Some(b'{') => ObjectValue::Text(read_braced_value(parser)?),
                    Some(b'"') => ObjectValue::Text(parser.parse_delimited_label(b'"')?),
                    _ => {
                        let raw = parser.parse_unquoted_label(b",]")?;
                        let raw = raw.trim();
                        if raw.is_empty() {
                            return Err(ParsingError::invalid_newick_string(
                                parser,
                                format!("Empty annotation value for key '{key}'"),
                            ));
                        }
                        ObjectValue::parse_typed(raw)
                    }
                }
            } else {
                ObjectValue::Boolean(true)
            };
            annotations.push((key, value));

            parser.skip_whitespace();
            match parser.next_byte() {
                Some(b',') => continue,
                Some(b']') => return Ok(Some(annotations)),
                Some(b) => {
                    return Err(ParsingError::invalid_newick_string(
                        parser,
                        format!("Expected ',' or ']' in annotation but found '{}'", b as char),
                    ));
                }
                None => return Err(ParsingError::unclosed_comment(parser)),
            }
        }
    }
}

/// Reads a `{...}` value (possibly nested) including its braces.
fn read_braced_value<B: ByteSource>(parser: &mut ByteParser<B>) -> Result<String, ParsingError> {
    let mut depth = 0usize;
    let mut bytes = Vec::new();
    loop {
        let Some(b) = parser.next_byte() else {
            return Err(ParsingError::unclosed_comment(parser));
        };
        bytes.push(b);
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(String::from_utf8_lossy(&bytes).into_owned());
                }
            }
            _ => {}
        }
    }
}

fn eof<B: ByteSource>(parser: &mut ByteParser<B>, msg: &str) -> ParsingError {
    match parser.check_io() {
        Err(e) => e,
        Ok(()) => ParsingError::unexpected_eof(parser, msg),
    }
}
