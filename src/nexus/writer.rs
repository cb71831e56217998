//! NEXUS writer pulling documents from [adapters](crate::adapters).

use crate::adapters::{DocumentAdapter, MatrixAdapter, OtuListAdapter, TreeNetworkGroupAdapter};
use crate::events::{
    CharacterSetInterval, CharacterSymbolMeaning, CommentEvent, Event, LinkedLabeledId, SoleEvent, StartEvent,
    TokenSetType,
};
use crate::newick::{NewickStringWriter, otu_labels};
use crate::nexus::defs::*;
use crate::parameters::ReadWriteParameters;
use crate::parser::utils::escape_label;
use crate::receiver::{EventReceiver, ReceiverHandler, receive_element};
use crate::writer::{DocumentWriter, WriteError, WriteReport};
use std::collections::{HashMap, HashSet};
use std::io::{self, BufWriter, Write};

// =#========================================================================#=
// ELEMENT CONTENT
// =#========================================================================€=
/// Handler keeping the content events of one element and, if asked to,
/// its comments.
#[derive(Debug, Default)]
struct ElementContent {
    keep_comments: bool,
    events: Vec<Event>,
    comments: Vec<String>,
    current_comment: String,
}

impl ElementContent {
    fn with_comments() -> Self {
        Self {
            keep_comments: true,
            ..Self::default()
        }
    }
}

impl ReceiverHandler for ElementContent {
    fn handle_comment(&mut self, comment: &CommentEvent, _parent: Option<&Event>) -> Result<bool, WriteError> {
        // Brackets would end the written comment early
        if !self.keep_comments || comment.content.contains(['[', ']']) {
            self.current_comment.clear();
            return Ok(false);
        }
        self.current_comment.push_str(&comment.content);
        if !comment.continued_in_next_event {
            self.comments.push(std::mem::take(&mut self.current_comment));
        }
        Ok(true)
    }

    fn handle_other(&mut self, event: Event, parent: Option<&Event>) -> Result<bool, WriteError> {
        if parent.is_some() {
            self.events.push(event);
        }
        Ok(true)
    }
}

/// Receives the content of one element.
fn content_of<F>(
    start: StartEvent,
    keep_comments: bool,
    report: &mut WriteReport,
    content: F,
) -> Result<ElementContent, WriteError>
where
    F: FnOnce(&mut dyn EventReceiver) -> Result<(), WriteError>,
{
    let handler = if keep_comments {
        ElementContent::with_comments()
    } else {
        ElementContent::default()
    };
    let (handler, element_report) = receive_element(handler, start, content)?;
    report.merge(element_report);
    Ok(handler)
}

/// Escaped names of the defined columns, ordered by column.
///
/// Definitions without a label, outside of the matrix or repeating a column
/// are reported as skipped.
fn character_names(
    matrix: &dyn MatrixAdapter,
    columns: Option<u64>,
    report: &mut WriteReport,
) -> Result<Vec<(u64, String)>, WriteError> {
    let definitions = matrix.character_definitions();
    let mut names: Vec<(u64, String)> = Vec::new();
    for id in definitions.ids() {
        let start = definitions.object_start_event(&id)?;
        content_of(start.clone(), false, report, |r| definitions.write_content_data(r, &id))?;
        let StartEvent::CharacterDefinition(definition) = start else {
            report.skip(format!("character definition '{id}' with a start event of another type"));
            continue;
        };
        let Some(label) = definition.label else {
            report.skip(format!("character definition '{id}' without label"));
            continue;
        };
        if columns.is_none_or(|columns| definition.column >= columns)
            || names.iter().any(|(column, _)| *column == definition.column)
        {
            report.skip(format!("character definition '{id}' of column {}", definition.column + 1));
            continue;
        }
        // '/' separates state names in CHARSTATELABELS
        let name = if label.contains(CHARACTER_NAME_STATES_SEPARATOR as char) {
            format!("'{}'", label.replace('\'', "''"))
        } else {
            escape_label(&label)
        };
        names.push((definition.column, name));
    }
    names.sort_by_key(|(column, _)| *column);
    Ok(names)
}

// =#========================================================================#=
// FORMAT OF A MATRIX
// =#========================================================================€=
/// Symbols of a token set definition.
#[derive(Debug, Default)]
struct TokenSymbols {
    gap: Option<String>,
    missing: Option<String>,
    match_char: Option<String>,
    symbols: Vec<String>,
}

impl TokenSymbols {
    fn add(&mut self, token_name: String, meaning: CharacterSymbolMeaning) {
        match meaning {
            CharacterSymbolMeaning::Gap => self.gap = Some(token_name),
            CharacterSymbolMeaning::Missing => self.missing = Some(token_name),
            CharacterSymbolMeaning::Match => self.match_char = Some(token_name),
            CharacterSymbolMeaning::Character | CharacterSymbolMeaning::Other => self.symbols.push(token_name),
        }
    }
}

/// Content of the FORMAT command of one matrix.
#[derive(Debug, Default)]
struct MatrixFormat {
    /// Data type per token set, with the columns it applies to if it is
    /// restricted to a character set
    types: Vec<(TokenSetType, Option<Vec<CharacterSetInterval>>)>,
    symbols: TokenSymbols,
    /// Character sets turned into parts of `DATATYPE=MIXED(...)`
    mixed_character_sets: HashSet<String>,
}

impl MatrixFormat {
    fn read(matrix: &dyn MatrixAdapter, report: &mut WriteReport) -> Result<Self, WriteError> {
        let mut format = MatrixFormat::default();
        let token_sets = matrix.token_sets();
        let character_sets = matrix.character_sets();

        let mut definitions = Vec::new();
        for id in token_sets.ids() {
            let StartEvent::TokenSetDefinition(definition) = token_sets.object_start_event(&id)? else {
                report.skip(format!("token set '{id}' with a start event of another type"));
                continue;
            };
            let content = content_of(StartEvent::TokenSetDefinition(definition.clone()), false, report, |r| {
                token_sets.write_content_data(r, &id)
            })?;
            definitions.push((definition, content.events));
        }

        let mixed = definitions.len() > 1;
        for (definition, events) in definitions {
            let mut columns = None;
            if mixed {
                match &definition.character_set_id {
                    Some(set_id) => {
                        let start = character_sets.object_start_event(set_id)?;
                        let content = content_of(start, false, report, |r| character_sets.write_content_data(r, set_id))?;
                        columns = Some(intervals(&content.events));
                        format.mixed_character_sets.insert(set_id.clone());
                    }
                    None => {
                        report.skip(format!("token set '{}' not restricted to a character set", definition.id));
                        continue;
                    }
                }
            }
            format.types.push((definition.set_type, columns));
            for event in events {
                if let Event::Start(StartEvent::SingleTokenDefinition(token)) = event {
                    format.symbols.add(token.token_name, token.meaning);
                }
            }
        }
        Ok(format)
    }
}

fn intervals(events: &[Event]) -> Vec<CharacterSetInterval> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Sole(SoleEvent::CharacterSetInterval(interval)) => Some(*interval),
            _ => None,
        })
        .collect()
}

/// Standard format of 0-based half-open intervals: 1-based and inclusive,
/// e.g. `1-3 5`.
fn column_ranges(intervals: &[CharacterSetInterval]) -> String {
    let mut ranges = Vec::with_capacity(intervals.len());
    for interval in intervals.iter().filter(|i| !i.is_empty()) {
        if interval.len() == 1 {
            ranges.push(interval.end.to_string());
        } else {
            ranges.push(format!("{}-{}", interval.start + 1, interval.end));
        }
    }
    ranges.join(" ")
}

/// Standard format of 1-based element numbers, joining consecutive ones
/// into ranges.
fn element_ranges(mut numbers: Vec<usize>) -> String {
    numbers.sort_unstable();
    numbers.dedup();
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < numbers.len() {
        let start = numbers[i];
        let mut end = start;
        while i + 1 < numbers.len() && numbers[i + 1] == end + 1 {
            i += 1;
            end += 1;
        }
        ranges.push(if start == end {
            start.to_string()
        } else {
            format!("{start}-{end}")
        });
        i += 1;
    }
    ranges.join(" ")
}

/// Assigns unique block titles.
#[derive(Debug, Default)]
struct Titles {
    used: HashSet<(&'static str, String)>,
    by_id: HashMap<String, String>,
}

impl Titles {
    /// Title of element `id` in blocks linked as `link_name`: its label if
    /// still available, otherwise its ID.
    fn assign(&mut self, link_name: &'static str, id: &str, label: Option<&str>) -> String {
        let title = match label {
            Some(label) if !self.used.contains(&(link_name, label.to_string())) => label.to_string(),
            _ => id.to_string(),
        };
        self.used.insert((link_name, title.clone()));
        self.by_id.insert(id.to_string(), title.clone());
        title
    }

    fn get(&self, id: &str) -> Option<&String> {
        self.by_id.get(id)
    }
}

// =#========================================================================#=
// NEXUS WRITER
// =#========================================================================$=
/// Writer for documents in NEXUS format.
///
/// # Format Structure
/// The writer produces a NEXUS file with the following structure:
/// - `#NEXUS` header, followed by comments of the document
/// - one `TAXA` block per OTU list, with title, dimensions and tax labels
/// - one `CHARACTERS` block per matrix (`UNALIGNED` if the sequences differ
///   in length) with title, link, dimensions, format and matrix
/// - one `TREES` block per tree group with title, link, `TRANSLATE` and
///   `TREE` commands
/// - a `SETS` block with all OTU, character and tree sets
///
/// Every block gets a `TITLE`, so that links and sets can refer to it.
/// Networks, metadata (except simple literals of trees, nodes and edges,
/// see [MetadataTreatment](crate::parameters::MetadataTreatment)) and
/// comments of elements other than the document and its blocks cannot be
/// written; they are listed in the returned [WriteReport] and logged.
///
/// # Example
/// ```
/// use phylostream::nexus::{NexusEventReader, NexusWriter};
/// use phylostream::model::DocumentStore;
/// use phylostream::writer::DocumentWriter;
/// use phylostream::ReadWriteParameters;
///
/// let input = "#NEXUS\nBEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS Kea Kaka; END;";
/// let store = DocumentStore::read_from(&mut NexusEventReader::for_str(input)).unwrap();
///
/// let mut writer = NexusWriter::new(Vec::new());
/// writer.write_document(&store, &ReadWriteParameters::default()).unwrap();
/// let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert!(output.contains("\tTAXLABELS Kea Kaka;\n"));
/// ```
pub struct NexusWriter<W: Write> {
    bw: BufWriter<W>,
}

// ============================================================================
// API (public)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Creates a new NEXUS writer.
    ///
    /// # Arguments
    /// * `writer` - The destination, e.g. a [File](std::fs::File)
    pub fn new(writer: W) -> Self {
        NexusWriter {
            bw: BufWriter::new(writer),
        }
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    /// Returns an I/O error if flushing fails
    pub fn into_inner(self) -> Result<W, WriteError> {
        self.bw.into_inner().map_err(|e| WriteError::Io(e.into_error()))
    }
}

impl<W: Write> DocumentWriter for NexusWriter<W> {
    fn write_document(
        &mut self,
        document: &dyn DocumentAdapter,
        parameters: &ReadWriteParameters,
    ) -> Result<WriteReport, WriteError> {
        let mut report = WriteReport::default();
        let mut titles = Titles::default();
        let mut sets = SetCommands::default();

        self.header()?;
        let start = document.start_event();
        let content = content_of(StartEvent::Document(start), true, &mut report, |r| document.write_metadata(r))?;
        self.comments(&content.comments)?;

        let otu_lists = document.otu_lists();
        for list in &otu_lists {
            self.taxa_block(*list, &mut titles, &mut sets, &mut report)?;
        }
        let otu_labels = otu_labels(document)?;
        for matrix in document.matrices() {
            self.characters_block(matrix, &otu_labels, parameters, &mut titles, &mut sets, &mut report)?;
        }
        for group in document.tree_network_groups() {
            self.trees_block(group, &otu_lists, &otu_labels, parameters, &mut titles, &mut sets, &mut report)?;
        }
        self.sets_block(&sets)?;
        self.bw.flush()?;

        report.log("Nexus");
        Ok(report)
    }
}

/// Set commands collected while writing the blocks they refer to.
#[derive(Debug, Default)]
struct SetCommands {
    /// (command, set name, link name, block title, elements)
    commands: Vec<(&'static str, String, &'static str, String, String)>,
}

// ============================================================================
// Nexus Block & Command Writing (private)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Writes the NEXUS file header ("#NEXUS"), returning itself for chaining.
    fn header(&mut self) -> io::Result<&mut Self> {
        self.write_all(NEXUS_HEADER)?.newline()?;
        Ok(self)
    }

    /// Writes "\n{BEGIN} name;\n".
    fn block_begin(&mut self, name: &str) -> io::Result<&mut Self> {
        self.newline()?
            .word(BEGIN)?
            .space()?
            .word(name)?
            .semicolon_ln()
    }

    fn block_end(&mut self) -> io::Result<&mut Self> {
        self.word(END)?.semicolon_ln()
    }

    /// Writes each comment in square brackets on its own line.
    fn comments(&mut self, comments: &[String]) -> io::Result<&mut Self> {
        for comment in comments {
            self.write_all(b"[")?.word(comment)?.write_all(b"]")?.newline()?;
        }
        Ok(self)
    }

    /// Writes "\tTITLE title;\n".
    fn title_cmd(&mut self, title: &str) -> io::Result<&mut Self> {
        self.tab()?
            .word(TITLE)?
            .space()?
            .word(&escape_label(title))?
            .semicolon_ln()
    }

    /// Writes "\tLINK TAXA = title;\n" if the linked OTU list has a title.
    fn link_taxa_cmd(&mut self, linked_id: Option<&str>, titles: &Titles) -> io::Result<&mut Self> {
        if let Some(title) = linked_id.and_then(|id| titles.get(id)) {
            self.tab()?
                .word(LINK)?
                .space()?
                .word(TAXA)?
                .write_all(b" = ")?
                .word(&escape_label(title))?
                .semicolon_ln()?;
        }
        Ok(self)
    }

    /// Writes the TAXA block of one OTU list, returning itself for chaining.
    fn taxa_block(
        &mut self,
        list: &dyn OtuListAdapter,
        titles: &mut Titles,
        sets: &mut SetCommands,
        report: &mut WriteReport,
    ) -> Result<&mut Self, WriteError> {
        let start = list.start_event();
        let content = content_of(StartEvent::OtuList(start.clone()), true, report, |r| list.write_metadata(r))?;
        let title = titles.assign(TAXA, &start.id, start.label.as_deref());

        let otus = list.otus();
        let mut labels = Vec::new();
        let mut numbers = HashMap::new();
        for id in otus.ids() {
            let otu = otus.object_start_event(&id)?;
            content_of(otu.clone(), false, report, |r| otus.write_content_data(r, &id))?;
            numbers.insert(id.clone(), labels.len() + 1);
            labels.push(otu.label().map_or(id, str::to_string));
        }

        // "BEGIN TAXA;"
        self.block_begin(TAXA)?.title_cmd(&title)?.comments(&content.comments)?;
        // "\tDIMENSIONS NTAX=n;"
        self.tab()?
            .word(DIMENSIONS)?
            .space()?
            .word(NTAX)?
            .equals()?
            .word(&labels.len().to_string())?
            .semicolon_ln()?;
        // "\tTAXLABELS [label ...];"
        self.tab()?.word(TAXLABELS)?;
        for label in &labels {
            self.space()?.word(&escape_label(label))?;
        }
        self.semicolon_ln()?;
        self.block_end()?;

        let otu_sets = list.otu_sets();
        for id in otu_sets.ids() {
            let set = otu_sets.object_start_event(&id)?;
            let name = set.label().map_or(id.clone(), str::to_string);
            let content = content_of(set, false, report, |r| otu_sets.write_content_data(r, &id))?;
            let elements = set_numbers(&content.events, &numbers, &name, report);
            sets.commands.push((TAXSET, name, TAXA, title.clone(), element_ranges(elements)));
        }
        Ok(self)
    }

    /// Writes the CHARACTERS (or UNALIGNED) block of one matrix, returning
    /// itself for chaining.
    ///
    /// Matrices with sequences of different lengths are written as
    /// UNALIGNED block, each sequence on one line.
    fn characters_block(
        &mut self,
        matrix: &dyn MatrixAdapter,
        otu_labels: &HashMap<String, String>,
        parameters: &ReadWriteParameters,
        titles: &mut Titles,
        sets: &mut SetCommands,
        report: &mut WriteReport,
    ) -> Result<&mut Self, WriteError> {
        let start = matrix.start_event();
        let content = content_of(StartEvent::Alignment(start.clone()), true, report, |r| matrix.write_metadata(r))?;
        let title = titles.assign(CHARACTERS, &start.id, start.label.as_deref());
        let format = MatrixFormat::read(matrix, report)?;
        let columns = matrix.column_count();
        let long_tokens = matrix.contains_long_tokens();

        let mut rows = Vec::new();
        for id in matrix.sequence_ids() {
            let sequence = matrix.sequence_start_event(&id)?;
            // Rows are matched to OTUs by label when read
            let name = sequence
                .linked_id
                .as_ref()
                .and_then(|otu| otu_labels.get(otu).cloned())
                .or(sequence.label.clone())
                .unwrap_or_else(|| id.clone());
            content_of(StartEvent::Sequence(sequence.clone()), false, report, |r| {
                matrix.write_sequence_metadata(r, &id)
            })?;
            let length = matrix.sequence_length(&id)?;
            rows.push(MatrixRow {
                name: escape_label(&name),
                start: sequence,
                length,
            });
        }
        let character_names = character_names(matrix, columns, report)?;
        let line_length = match (columns, parameters.line_length) {
            (Some(columns), Some(n)) if columns > n as u64 => Some(n as u64),
            _ => None,
        };

        // "BEGIN CHARACTERS;" or "BEGIN UNALIGNED;"
        let block = if columns.is_some() { CHARACTERS } else { UNALIGNED };
        self.block_begin(block)?.title_cmd(&title)?.comments(&content.comments)?;
        self.link_taxa_cmd(start.linked_id.as_deref(), titles)?;
        if let Some(columns) = columns {
            // "\tDIMENSIONS NCHAR=n;"
            self.tab()?
                .word(DIMENSIONS)?
                .space()?
                .word(NCHAR)?
                .equals()?
                .word(&columns.to_string())?
                .semicolon_ln()?;
        }
        self.format_cmd(&format, long_tokens, line_length.is_some())?;
        if !character_names.is_empty() {
            // "\tCHARSTATELABELS 1 name, 2 name;"
            self.tab()?.word(CHARSTATELABELS)?;
            for (i, (column, name)) in character_names.iter().enumerate() {
                if i > 0 {
                    self.comma()?;
                }
                self.space()?.word(&(column + 1).to_string())?.space()?.word(name)?;
            }
            self.semicolon_ln()?;
        }

        // "\tMATRIX\n\t\tname tokens\n...\t;\n"
        self.tab()?.word(MATRIX)?.newline()?;
        let width = rows.iter().map(|row| row.name.chars().count()).max().unwrap_or(0);
        let total = rows.iter().map(|row| row.length).max().unwrap_or(0);
        let step = line_length.unwrap_or(total).max(1);
        let mut part_start = 0;
        loop {
            if part_start > 0 {
                self.newline()?;
            }
            for row in &rows {
                let end = (part_start + step).min(row.length);
                let tokens = sequence_tokens(matrix, row, part_start, end, report)?;
                self.matrix_row(&row.name, width, &tokens, long_tokens)?;
            }
            part_start += step;
            if part_start >= total {
                break;
            }
        }
        self.tab()?.semicolon_ln()?;
        self.block_end()?;

        let character_sets = matrix.character_sets();
        for id in character_sets.ids() {
            if format.mixed_character_sets.contains(&id) {
                continue;
            }
            let set = character_sets.object_start_event(&id)?;
            let name = set.label().map_or(id.clone(), str::to_string);
            let content = content_of(set, false, report, |r| character_sets.write_content_data(r, &id))?;
            let ranges = column_ranges(&intervals(&content.events));
            sets.commands.push((CHARSET, name, CHARACTERS, title.clone(), ranges));
        }
        Ok(self)
    }

    /// Writes the FORMAT command, if there is anything to declare.
    fn format_cmd(&mut self, format: &MatrixFormat, long_tokens: bool, interleave: bool) -> io::Result<&mut Self> {
        let mut parts = Vec::new();
        match format.types.as_slice() {
            [] => {}
            [(set_type, None)] => parts.push(format!("{DATATYPE}={}", set_type.nexus_name())),
            types => {
                let mixed: Vec<String> = types
                    .iter()
                    .map(|(set_type, columns)| {
                        let ranges = columns.as_deref().map(column_ranges).unwrap_or_default();
                        format!("{}:{ranges}", set_type.nexus_name())
                    })
                    .collect();
                parts.push(format!("{DATATYPE}={MIXED}({})", mixed.join(", ")));
            }
        }
        let symbols = &format.symbols;
        for (key, symbol) in [(GAP, &symbols.gap), (MISSING, &symbols.missing), (MATCHCHAR, &symbols.match_char)] {
            if let Some(symbol) = symbol {
                parts.push(format!("{key}={symbol}"));
            }
        }
        let continuous = format.types.iter().any(|(t, _)| *t == TokenSetType::Continuous);
        if !symbols.symbols.is_empty() && format.types.len() <= 1 && !continuous {
            parts.push(format!("{SYMBOLS}=\"{}\"", symbols.symbols.join(" ")));
        }
        if long_tokens && !continuous {
            parts.push(TOKENS.to_string());
        }
        if interleave {
            parts.push(INTERLEAVE.to_string());
        }

        if !parts.is_empty() {
            self.tab()?.word(FORMAT)?;
            for part in &parts {
                self.space()?.word(part)?;
            }
            self.semicolon_ln()?;
        }
        Ok(self)
    }

    /// Writes "\t\tname tokens\n", padding names to `width`.
    fn matrix_row(&mut self, name: &str, width: usize, tokens: &[String], long_tokens: bool) -> io::Result<&mut Self> {
        self.tab()?.tab()?.word(name)?;
        for _ in name.chars().count()..width {
            self.space()?;
        }
        self.space()?;
        if long_tokens {
            self.word(&tokens.join(" "))?;
        } else {
            self.word(&tokens.concat())?;
        }
        self.newline()
    }

    /// Writes the TREES block of one tree group, returning itself for chaining.
    fn trees_block(
        &mut self,
        group: &dyn TreeNetworkGroupAdapter,
        otu_lists: &[&dyn OtuListAdapter],
        otu_labels: &HashMap<String, String>,
        parameters: &ReadWriteParameters,
        titles: &mut Titles,
        sets: &mut SetCommands,
        report: &mut WriteReport,
    ) -> Result<&mut Self, WriteError> {
        let start = group.start_event();
        let content = content_of(StartEvent::TreeNetworkGroup(start.clone()), true, report, |r| {
            group.write_metadata(r)
        })?;
        let title = titles.assign(TREES, &start.id, start.label.as_deref());

        // Translation keys of the OTUs of the linked list, 1-based
        let mut translation = Vec::new();
        let mut keys = HashMap::new();
        let linked_list = start
            .linked_id
            .as_deref()
            .and_then(|id| otu_lists.iter().find(|list| list.start_event().id == id));
        if let Some(list) = linked_list {
            let otus = list.otus();
            for id in otus.ids() {
                if let Some(label) = otus.object_start_event(&id)?.label() {
                    let key = (translation.len() + 1).to_string();
                    translation.push((key.clone(), label.to_string()));
                    keys.insert(id, key);
                }
            }
        }

        let newick_writer = NewickStringWriter::new(parameters).with_node_labels(|node| {
            if let Some(key) = node.linked_id.as_ref().and_then(|otu| keys.get(otu)) {
                return Some(key.clone());
            }
            node.label.clone().or_else(|| {
                if parameters.apply_otu_labels {
                    node.linked_id.as_ref().and_then(|otu| otu_labels.get(otu).cloned())
                } else {
                    None
                }
            })
        });

        let mut trees = Vec::new();
        let mut numbers = HashMap::new();
        for tree in group.trees_and_networks() {
            let tree_start = tree.start_event();
            if !tree.is_tree() {
                report.skip(format!("network '{}'", tree_start.id));
                continue;
            }
            let (newick, tree_report) = newick_writer.write_tree(tree)?;
            report.merge(tree_report);
            numbers.insert(tree_start.id.clone(), trees.len() + 1);
            let name = tree_start.label.unwrap_or(tree_start.id);
            trees.push((escape_label(&name), newick));
        }

        // "BEGIN TREES;"
        self.block_begin(TREES)?.title_cmd(&title)?.comments(&content.comments)?;
        self.link_taxa_cmd(linked_list.map(|list| list.start_event().id).as_deref(), titles)?;
        self.translate_cmd(&translation)?;
        // "\tTREE name = newick;"
        for (name, newick) in &trees {
            self.tab()?
                .word(TREE)?
                .space()?
                .word(name)?
                .write_all(b" = ")?
                .word(newick)?
                .newline()?;
        }
        self.block_end()?;

        let tree_sets = group.tree_network_sets();
        for id in tree_sets.ids() {
            let set = tree_sets.object_start_event(&id)?;
            let name = set.label().map_or(id.clone(), str::to_string);
            let content = content_of(set, false, report, |r| tree_sets.write_content_data(r, &id))?;
            let elements = set_numbers(&content.events, &numbers, &name, report);
            sets.commands.push((TREESET, name, TREES, title.clone(), element_ranges(elements)));
        }
        Ok(self)
    }

    /// Writes the TRANSLATE command mapping keys to labels, returning itself for chaining.
    fn translate_cmd(&mut self, translation: &[(String, String)]) -> io::Result<&mut Self> {
        if translation.is_empty() {
            return Ok(self);
        }
        // "\tTRANSLATE\n\t\t[key label,\n]...;"
        self.tab()?.word(TRANSLATE)?.newline()?;
        for (i, (key, label)) in translation.iter().enumerate() {
            self.tab()?.tab()?.word(key)?.space()?.word(&escape_label(label))?;
            // No comma after last pair
            if i + 1 < translation.len() {
                self.comma()?;
            }
            self.newline()?;
        }
        self.tab()?.semicolon_ln()
    }

    /// Writes the SETS block with all collected set commands.
    fn sets_block(&mut self, sets: &SetCommands) -> io::Result<&mut Self> {
        if sets.commands.is_empty() {
            return Ok(self);
        }
        self.block_begin(SETS)?;
        // "\tCHARSET name (CHARACTERS = title) = 1-3 5;"
        for (command, name, link_name, title, elements) in &sets.commands {
            self.tab()?
                .word(command)?
                .space()?
                .word(&escape_label(name))?
                .write_all(b" (")?
                .word(link_name)?
                .write_all(b" = ")?
                .word(&escape_label(title))?
                .write_all(b") =")?;
            if !elements.is_empty() {
                self.space()?.word(elements)?;
            }
            self.semicolon_ln()?;
        }
        self.block_end()
    }
}

/// Row of a matrix being written.
struct MatrixRow {
    /// Escaped row name
    name: String,
    start: LinkedLabeledId,
    length: u64,
}

/// Tokens of the columns `[start, end)` of a row.
fn sequence_tokens(
    matrix: &dyn MatrixAdapter,
    row: &MatrixRow,
    start: u64,
    end: u64,
    report: &mut WriteReport,
) -> Result<Vec<String>, WriteError> {
    if start >= end {
        return Ok(Vec::new());
    }
    let id = &row.start.id;
    let content = content_of(StartEvent::Sequence(row.start.clone()), false, report, |r| {
        matrix.write_sequence_part(r, id, start, end)
    })?;
    let mut tokens = Vec::new();
    for event in content.events {
        match event {
            Event::Sole(SoleEvent::SequenceTokens(part)) => tokens.extend(part),
            Event::Sole(SoleEvent::SingleSequenceToken(token)) => tokens.push(token),
            _ => {}
        }
    }
    Ok(tokens)
}

/// 1-based numbers of the set elements, reporting elements not in `numbers`.
fn set_numbers(events: &[Event], numbers: &HashMap<String, usize>, set_name: &str, report: &mut WriteReport) -> Vec<usize> {
    let mut elements = Vec::new();
    for event in events {
        if let Event::Sole(SoleEvent::SetElement(element)) = event {
            match numbers.get(&element.linked_id) {
                Some(&number) => elements.push(number),
                None => report.skip(format!("element '{}' of set '{set_name}'", element.linked_id)),
            }
        }
    }
    elements
}

// ============================================================================
// Little Helpers (private)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Appends a byte slice to the [BufWriter], returning itself for chaining.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<&mut Self> {
        self.bw.write_all(buf)?;
        Ok(self)
    }

    /// Appends a string to the [BufWriter], returning itself for chaining.
    fn word(&mut self, word: &str) -> io::Result<&mut Self> {
        self.write_all(word.as_bytes())
    }

    /// Appends a space character (' ') to the [BufWriter], returning itself for chaining.
    fn space(&mut self) -> io::Result<&mut Self> {
        self.bw.write_all(b" ")?;
        Ok(self)
    }

    /// Appends a tab character ('\t') to the [BufWriter], returning itself for chaining.
    fn tab(&mut self) -> io::Result<&mut Self> {
        self.bw.write_all(b"\t")?;
        Ok(self)
    }

    /// Appends a newline character ('\n') to the [BufWriter], returning itself for chaining.
    fn newline(&mut self) -> io::Result<&mut Self> {
        self.bw.write_all(b"\n")?;
        Ok(self)
    }

    /// Appends a semicolon (';') to the [BufWriter], returning itself for chaining.
    fn semicolon(&mut self) -> io::Result<&mut Self> {
        self.bw.write_all(b";")?;
        Ok(self)
    }

    /// Appends a semicolon followed by a newline (';\n') to the [BufWriter], returning itself for chaining.
    fn semicolon_ln(&mut self) -> io::Result<&mut Self> {
        self.semicolon()?.newline()?;
        Ok(self)
    }

    /// Appends a comma (',') to the [BufWriter], returning itself for chaining.
    fn comma(&mut self) -> io::Result<&mut Self> {
        self.bw.write_all(b",")?;
        Ok(self)
    }

    /// Appends an equals sign ('=') to the [BufWriter], returning itself for chaining.
    fn equals(&mut self) -> io::Result<&mut Self> {
        self.bw.write_all(b"=")?;
        Ok(self)
    }
}

// =#========================================================================#=
// TESTS - NEXUS WRITER
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LabeledId;
    use crate::model::{DocumentStore, StoredMatrix};
    use crate::nexus::NexusEventReader;
    use crate::parameters::MetadataTreatment;
    use pretty_assertions::assert_eq;

    const DOCUMENT: &str = "#NEXUS
[written by hand]
BEGIN TAXA;
    DIMENSIONS NTAX=3;
    TAXLABELS Kea Kaka Kakapo;
END;
BEGIN CHARACTERS;
    DIMENSIONS NCHAR=6;
    FORMAT DATATYPE=DNA GAP=-;
    MATRIX
        Kea    ACGT-A
        Kaka   ACGTTA
        Kakapo AC[uncertain]GCTA
    ;
END;
BEGIN SETS;
    CHARSET first = 1-3;
    TAXSET parrots = Kea Kaka;
END;
BEGIN TREES;
    TREE nestor = ((Kea:1,Kaka:1)[&support=0.9]:1,Kakapo:2);
END;
";

    fn read(input: &str) -> DocumentStore {
        DocumentStore::read_from(&mut NexusEventReader::for_str(input)).unwrap()
    }

    fn write(store: &DocumentStore, parameters: &ReadWriteParameters) -> (String, WriteReport) {
        let mut writer = NexusWriter::new(Vec::new());
        let report = writer.write_document(store, parameters).unwrap();
        (String::from_utf8(writer.into_inner().unwrap()).unwrap(), report)
    }

    #[test]
    fn test_blocks_of_document() {
        let (output, report) = write(&read(DOCUMENT), &ReadWriteParameters::default());

        assert!(output.starts_with("#NEXUS\n[written by hand]\n\nBEGIN TAXA;\n\tTITLE "));
        assert!(output.contains("\tDIMENSIONS NTAX=3;\n\tTAXLABELS Kea Kaka Kakapo;\nEND;\n"));
        assert!(output.contains(
            "\tDIMENSIONS NCHAR=6;
\tFORMAT DATATYPE=DNA GAP=-;
\tMATRIX
\t\tKea    ACGT-A
\t\tKaka   ACGTTA
\t\tKakapo ACGCTA
\t;
END;
"
        ));
        assert!(output.contains(
            "\tTRANSLATE
\t\t1 Kea,
\t\t2 Kaka,
\t\t3 Kakapo
\t;
\tTREE nestor = [&R] ((1:1,2:1):1,3:2);
END;
"
        ));
        assert!(output.contains("\tTAXSET parrots (TAXA = "));
        assert!(output.contains(") = 1-2;\n"));
        assert!(output.contains("\tCHARSET first (CHARACTERS = "));
        assert!(output.contains(") = 1-3;\nEND;\n"));

        // the comment inside the sequence and the node annotation
        assert_eq!(report.ignored_comments, 1);
        assert_eq!(report.ignored_literal_metadata, 1);
    }

    #[test]
    fn test_hot_comments_in_trees() {
        let parameters = ReadWriteParameters::default().with_metadata_treatment(MetadataTreatment::HotComments);
        let (output, report) = write(&read(DOCUMENT), &parameters);
        assert!(output.contains("\tTREE nestor = [&R] ((1:1,2:1)[&support=0.9]:1,3:2);\n"));
        assert_eq!(report.ignored_literal_metadata, 0);
    }

    #[test]
    fn test_written_document_reads_back_the_same() {
        let (first, _) = write(&read(DOCUMENT), &ReadWriteParameters::default());
        let (second, report) = write(&read(&first), &ReadWriteParameters::default());
        assert_eq!(second, first);
        assert!(report.is_lossless());
    }

    #[test]
    fn test_interleaved_matrix() {
        let parameters = ReadWriteParameters::default().with_line_length(Some(4));
        let (output, _) = write(&read(DOCUMENT), &parameters);
        assert!(output.contains(
            "\tFORMAT DATATYPE=DNA GAP=- INTERLEAVE;
\tMATRIX
\t\tKea    ACGT
\t\tKaka   ACGT
\t\tKakapo ACGC

\t\tKea    -A
\t\tKaka   TA
\t\tKakapo TA
\t;
"
        ));

        let store = read(&output);
        let tokens: Vec<String> = store.matrices[0].sequences.iter().map(|s| s.tokens.concat()).collect();
        assert_eq!(tokens, vec!["ACGT-A", "ACGTTA", "ACGCTA"]);
    }

    #[test]
    fn test_sequences_of_different_length_are_unaligned() {
        let mut store = DocumentStore::new(LabeledId::new("doc1", None));
        let mut matrix = StoredMatrix::new(LinkedLabeledId::new("matrix2", Some("reads".to_string()), None));
        let tokens = |s: &str| s.chars().map(String::from).collect::<Vec<_>>();
        matrix.add_sequence(LinkedLabeledId::new("seq3", Some("r1".to_string()), None), tokens("ACGTA"));
        matrix.add_sequence(LinkedLabeledId::new("seq4", Some("r2".to_string()), None), tokens("AC"));
        store.matrices.push(matrix);

        let (output, report) = write(&store, &ReadWriteParameters::default().with_line_length(Some(2)));
        assert_eq!(
            output,
            "#NEXUS

BEGIN UNALIGNED;
\tTITLE reads;
\tMATRIX
\t\tr1 ACGTA
\t\tr2 AC
\t;
END;
"
        );
        assert!(report.is_lossless());
    }

    #[test]
    fn test_character_names() {
        let input = DOCUMENT.replace(
            "    MATRIX\n",
            "    CHARLABELS coxI 'a/b' '' cyt_b;\n    MATRIX\n",
        );
        let store = read(&input);
        assert_eq!(store.matrices[0].character_definitions.len(), 4);

        let (output, report) = write(&store, &ReadWriteParameters::default());
        assert!(output.contains(
            "\tFORMAT DATATYPE=DNA GAP=-;
\tCHARSTATELABELS 1 coxI, 2 'a/b', 4 cyt_b;
\tMATRIX
"
        ));
        assert_eq!(report.skipped.len(), 1);

        let back = read(&output);
        let labels: Vec<Option<String>> = back.matrices[0]
            .character_definitions
            .elements()
            .iter()
            .map(|element| element.start.label().map(String::from))
            .collect();
        assert_eq!(
            labels,
            vec![Some("coxI".to_string()), Some("a/b".to_string()), Some("cyt b".to_string())]
        );
    }

    #[test]
    fn test_ranges() {
        assert_eq!(element_ranges(vec![5, 1, 2, 3, 7, 8]), "1-3 5 7-8");
        assert_eq!(
            column_ranges(&[CharacterSetInterval::new(0, 3), CharacterSetInterval::new(4, 5)]),
            "1-3 5"
        );
    }
}
