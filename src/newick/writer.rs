//! Writing trees provided by [TreeNetworkAdapter]s as Newick strings.

use crate::adapters::{DocumentAdapter, TreeNetworkAdapter};
use crate::events::{
    CommentEvent, ContentType, Event, LinkedLabeledId, LiteralContentEvent, LiteralSequenceType,
    ObjectValue, SoleEvent, StartEvent, TopologyType,
};
use crate::parameters::{MetadataTreatment, ReadWriteParameters};
use crate::parser::utils::escape_label;
use crate::receiver::{EventReceiver, ReceiverHandler, receive_element};
use crate::writer::{DocumentWriter, WriteError, WriteReport};
use std::collections::{HashMap, HashSet};
use std::io::{BufWriter, Write};

/// Characters that force an annotation value into double quotes.
const ANNOTATION_SPECIAL_CHARACTERS: &[char] = &[',', ']', '[', '=', '"', ' ', '\t', '\n', '\r'];

// =#========================================================================#=
// ANNOTATION COLLECTOR
// =#========================================================================€=
/// Collects what can be written about one element: simple literal metadata
/// as annotations and plain comments.
#[derive(Debug, Default)]
struct AnnotationCollector {
    hot_comments: bool,
    annotations: Vec<(String, String)>,
    comments: Vec<String>,
    current_literal: Option<(String, Vec<LiteralContentEvent>)>,
    current_comment: String,
}

impl AnnotationCollector {
    fn new(hot_comments: bool) -> Self {
        Self {
            hot_comments,
            ..Self::default()
        }
    }
}

impl ReceiverHandler for AnnotationCollector {
    fn handle_comment(&mut self, comment: &CommentEvent, _parent: Option<&Event>) -> Result<bool, WriteError> {
        if comment.content.contains(['[', ']']) {
            self.current_comment.clear();
            return Ok(false);
        }
        self.current_comment.push_str(&comment.content);
        if !comment.continued_in_next_event {
            self.comments.push(std::mem::take(&mut self.current_comment));
        }
        Ok(true)
    }

    fn handle_literal_metadata(&mut self, event: &Event, _parent: Option<&Event>) -> Result<bool, WriteError> {
        match event {
            Event::Start(StartEvent::LiteralMetadata(literal)) => {
                if !self.hot_comments || literal.sequence_type != LiteralSequenceType::Simple {
                    return Ok(false);
                }
                self.current_literal = Some((literal.predicate.clone(), Vec::new()));
            }
            Event::Sole(SoleEvent::LiteralMetadataContent(content)) => {
                if let Some((_, parts)) = self.current_literal.as_mut() {
                    parts.push(content.clone());
                }
            }
            _ => {
                if let Some((key, parts)) = self.current_literal.take()
                    && let Some(value) = format_value(&parts)
                {
                    self.annotations.push((key, value));
                }
            }
        }
        Ok(true)
    }

    /// Accepts only the element being collected.
    fn handle_other(&mut self, event: Event, parent: Option<&Event>) -> Result<bool, WriteError> {
        if parent.is_none() && event.topology() != TopologyType::Sole {
            Ok(true)
        } else {
            Err(WriteError::IllegalEvent {
                event,
                parent: parent.cloned(),
            })
        }
    }
}

/// Formats the value of a literal for a hot comment.
///
/// # Returns
/// `None` for a literal without value, and `Some("")` for a flag
fn format_value(parts: &[LiteralContentEvent]) -> Option<String> {
    if let [part] = parts
        && let Some(value) = &part.object_value
    {
        return Some(match value {
            ObjectValue::Boolean(true) => String::new(),
            ObjectValue::Float(v) => format!("{v:?}"),
            ObjectValue::Text(text) => quote_annotation_text(text),
            other => other.to_string(),
        });
    }
    LiteralContentEvent::join(parts).map(|text| quote_annotation_text(&text))
}

fn quote_annotation_text(text: &str) -> String {
    if text.starts_with('{') && text.ends_with('}') {
        text.to_string()
    } else if text.is_empty() || text.contains(ANNOTATION_SPECIAL_CHARACTERS) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Appends a hot comment `[&key=value,...]`, nothing if `annotations` is empty.
fn push_annotations(newick: &mut String, annotations: &[(String, String)]) {
    if annotations.is_empty() {
        return;
    }
    newick.push_str("[&");
    for (i, (key, value)) in annotations.iter().enumerate() {
        if i > 0 {
            newick.push(',');
        }
        newick.push_str(key);
        if !value.is_empty() {
            newick.push('=');
            newick.push_str(value);
        }
    }
    newick.push(']');
}

// =#========================================================================#=
// NEWICK STRING WRITER
// =#========================================================================$=
/// Data of a node or edge collected from its adapter.
#[derive(Debug, Default)]
struct Collected {
    annotations: Vec<(String, String)>,
    comments: Vec<String>,
}

#[derive(Debug)]
struct NodeData {
    label: Option<String>,
    collected: Collected,
}

#[derive(Debug)]
struct EdgeData {
    target: usize,
    length: Option<f64>,
    collected: Collected,
}

/// Turns one tree into a Newick string, e.g. for a Newick file or a Nexus
/// `TREE` command.
///
/// Node labels are taken from the node start events, unless a label
/// function is set with [with_node_labels](Self::with_node_labels). Simple
/// literal metadata of the tree, its nodes and edges is written as hot
/// comments if the parameters ask for [MetadataTreatment::HotComments].
///
/// # Example
/// ```
/// use phylostream::model::StoredTree;
/// use phylostream::events::{EdgeEvent, LabeledId, LinkedLabeledId, StartEvent};
/// use phylostream::newick::NewickStringWriter;
/// use phylostream::ReadWriteParameters;
///
/// let mut tree = StoredTree::new(true, LabeledId::new("tree1", None));
/// for (id, label) in [("n1", None), ("n2", Some("Kea")), ("n3", Some("Kaka"))] {
///     let node = LinkedLabeledId::new(id, label.map(str::to_string), None);
///     tree.nodes.push(StartEvent::Node(node), Vec::new());
/// }
/// for (id, source, target) in [("e1", "n1", "n2"), ("e2", "n1", "n3")] {
///     let edge = EdgeEvent {
///         id: id.to_string(),
///         label: None,
///         source_id: Some(source.to_string()),
///         target_id: target.to_string(),
///         length: Some(1.5),
///     };
///     tree.edges.push(StartEvent::Edge(edge), Vec::new());
/// }
///
/// let parameters = ReadWriteParameters::default();
/// let (newick, report) = NewickStringWriter::new(&parameters).write_tree(&tree).unwrap();
/// assert_eq!(newick, "[&U] (Kea:1.5,Kaka:1.5);");
/// assert!(report.is_lossless());
/// ```
pub struct NewickStringWriter<'a> {
    hot_comments: bool,
    node_label: Box<dyn Fn(&LinkedLabeledId) -> Option<String> + 'a>,
}

impl<'a> NewickStringWriter<'a> {
    pub fn new(parameters: &ReadWriteParameters) -> Self {
        Self {
            hot_comments: parameters.metadata_treatment == MetadataTreatment::HotComments,
            node_label: Box::new(|node| node.label.clone()),
        }
    }

    /// Sets the function providing the (unescaped) label written for a node.
    pub fn with_node_labels(mut self, node_label: impl Fn(&LinkedLabeledId) -> Option<String> + 'a) -> Self {
        self.node_label = Box::new(node_label);
        self
    }

    /// Writes `tree` as Newick string, with a leading `[&R]` or `[&U]` and
    /// the terminating `;`.
    ///
    /// The tree is rooted if it has a root edge. Edges to nodes that already
    /// have a parent, further roots and nodes unreachable from the root are
    /// not written and listed in the report.
    ///
    /// # Errors
    /// Contract violations of the adapter, e.g. edges to unknown nodes
    pub fn write_tree(&self, tree: &dyn TreeNetworkAdapter) -> Result<(String, WriteReport), WriteError> {
        let mut report = WriteReport::default();
        let tree_start = if tree.is_tree() {
            StartEvent::Tree(tree.start_event())
        } else {
            StartEvent::Network(tree.start_event())
        };
        let tree_collected = self.collect(tree_start.clone(), &mut report, |r| tree.write_metadata(r))?;

        // nodes
        let mut nodes = Vec::new();
        let mut node_index = HashMap::new();
        for id in tree.node_ids() {
            let start = tree.node_start_event(&id)?;
            let label = (self.node_label)(&start);
            let collected = self.collect(StartEvent::Node(start), &mut report, |r| {
                tree.write_node_content(r, &id)
            })?;
            node_index.insert(id, nodes.len());
            nodes.push(NodeData { label, collected });
        }

        // edges
        let index_of = |id: &str| {
            node_index
                .get(id)
                .copied()
                .ok_or_else(|| WriteError::unknown_id(ContentType::Node, id))
        };
        let mut children: Vec<Vec<EdgeData>> = (0..nodes.len()).map(|_| Vec::new()).collect();
        let mut root_edges = Vec::new();
        let mut has_parent = vec![false; nodes.len()];
        for id in tree.edge_ids() {
            let edge = tree.edge_start_event(&id)?;
            let target = index_of(&edge.target_id)?;
            let source = edge.source_id.as_deref().map(index_of).transpose()?;
            let length = edge.length;
            let collected = self.collect(StartEvent::Edge(edge), &mut report, |r| {
                tree.write_edge_content(r, &id)
            })?;
            let data = EdgeData {
                target,
                length,
                collected,
            };
            match source {
                None => root_edges.push(data),
                Some(_) if has_parent[target] => report.skip(format!("edge '{id}' to a node with a parent")),
                Some(source) => {
                    has_parent[target] = true;
                    children[source].push(data);
                }
            }
        }

        let rooted = !root_edges.is_empty();
        let mut roots = root_edges.into_iter();
        let root = match roots.next() {
            Some(edge) => Some(edge),
            None => (0..nodes.len()).find(|&i| !has_parent[i]).map(|target| EdgeData {
                target,
                length: None,
                collected: Collected::default(),
            }),
        };
        for extra in roots {
            report.skip(format!("root edge to node {}", extra.target));
        }

        let mut newick = String::new();
        newick.push_str(if rooted { "[&R] " } else { "[&U] " });
        if !tree_collected.annotations.is_empty() {
            push_annotations(&mut newick, &tree_collected.annotations);
            newick.push(' ');
        }
        let mut written = HashSet::new();
        if let Some(root) = &root {
            write_subtree(&mut newick, root, &nodes, &children, &mut written);
        }
        newick.push(';');

        let unreachable = nodes.len() - written.len();
        if unreachable > 0 {
            report.skip(format!("{unreachable} node(s) not connected to the root"));
        }
        for comment in tree_collected.comments {
            report.skip(format!("tree comment '{comment}'"));
        }
        Ok((newick, report))
    }

    /// Collects annotations and comments of one element.
    fn collect<F>(&self, start: StartEvent, report: &mut WriteReport, content: F) -> Result<Collected, WriteError>
    where
        F: FnOnce(&mut dyn EventReceiver) -> Result<(), WriteError>,
    {
        let (collector, element_report) =
            receive_element(AnnotationCollector::new(self.hot_comments), start, content)?;
        report.merge(element_report);
        Ok(Collected {
            annotations: collector.annotations,
            comments: collector.comments,
        })
    }
}

/// Appends the subtree of the target of `edge`, including the edge itself.
fn write_subtree(
    newick: &mut String,
    edge: &EdgeData,
    nodes: &[NodeData],
    children: &[Vec<EdgeData>],
    written: &mut HashSet<usize>,
) {
    let index = edge.target;
    written.insert(index);
    let node = &nodes[index];

    let mut first = true;
    for child in &children[index] {
        if written.contains(&child.target) {
            continue;
        }
        newick.push(if first { '(' } else { ',' });
        first = false;
        write_subtree(newick, child, nodes, children, written);
    }
    if !first {
        newick.push(')');
    }

    if let Some(label) = &node.label {
        newick.push_str(&escape_label(label));
    }
    push_annotations(newick, &node.collected.annotations);
    for comment in &node.collected.comments {
        newick.push('[');
        newick.push_str(comment);
        newick.push(']');
    }
    if let Some(length) = edge.length {
        newick.push(':');
        newick.push_str(&length.to_string());
    }
    push_annotations(newick, &edge.collected.annotations);
}

// =#========================================================================#=
// NEWICK WRITER
// =#========================================================================$=
/// Writes all trees of a document to a Newick file, one tree per line.
///
/// Only trees can be written: networks and matrices are listed as skipped in
/// the [WriteReport]. Unlabeled nodes linked to an OTU get the
/// label of that OTU if [apply_otu_labels](ReadWriteParameters::apply_otu_labels)
/// is set.
pub struct NewickWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> NewickWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    /// Returns an I/O error if flushing fails
    pub fn into_inner(self) -> Result<W, WriteError> {
        self.writer.into_inner().map_err(|e| WriteError::Io(e.into_error()))
    }
}

impl<W: Write> DocumentWriter for NewickWriter<W> {
    fn write_document(
        &mut self,
        document: &dyn DocumentAdapter,
        parameters: &ReadWriteParameters,
    ) -> Result<WriteReport, WriteError> {
        let mut report = WriteReport::default();
        let otu_labels = otu_labels(document)?;
        for matrix in document.matrices() {
            report.skip(format!("alignment '{}'", matrix.start_event().id));
        }

        let string_writer = NewickStringWriter::new(parameters).with_node_labels(|node| {
            node.label.clone().or_else(|| {
                if parameters.apply_otu_labels {
                    node.linked_id.as_ref().and_then(|otu| otu_labels.get(otu).cloned())
                } else {
                    None
                }
            })
        });
        for group in document.tree_network_groups() {
            for tree in group.trees_and_networks() {
                if !tree.is_tree() {
                    report.skip(format!("network '{}'", tree.start_event().id));
                    continue;
                }
                let (newick, tree_report) = string_writer.write_tree(tree)?;
                report.merge(tree_report);
                self.writer.write_all(newick.as_bytes())?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.writer.flush()?;

        report.log("Newick");
        Ok(report)
    }
}

/// Labels of all OTUs of the document by OTU ID.
pub(crate) fn otu_labels(document: &dyn DocumentAdapter) -> Result<HashMap<String, String>, WriteError> {
    let mut labels = HashMap::new();
    for list in document.otu_lists() {
        let otus = list.otus();
        for id in otus.ids() {
            if let StartEvent::Otu(otu) = otus.object_start_event(&id)?
                && let Some(label) = otu.label
            {
                labels.insert(id, label);
            }
        }
    }
    Ok(labels)
}
