//! Options recognized by readers and writers.

/// Default number of tokens per sequence tokens event.
pub const DEFAULT_MAX_TOKENS_TO_READ: usize = 2048;

/// Default number of characters per comment event.
pub const DEFAULT_MAX_COMMENT_LENGTH: usize = 1024 * 1024;

/// How the Nexus writer treats metadata attached to nodes and edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataTreatment {
    /// Drop all metadata (counted as ignored in the write report)
    #[default]
    Ignore,
    /// Write simple literal metadata of nodes and edges as hot comments
    /// `[&key=value,...]`; other metadata is dropped
    HotComments,
}

// =#========================================================================#=
// READ WRITE PARAMETERS
// =#========================================================================$=
/// Options passed to every reader and writer.
///
/// Options that do not apply to a format are ignored by it.
///
/// # Example
/// ```
/// use phylostream::ReadWriteParameters;
///
/// let parameters = ReadWriteParameters::default()
///     .with_max_tokens_to_read(100)
///     .with_line_length(Some(60));
/// assert_eq!(parameters.max_tokens_to_read, 100);
/// assert!(parameters.create_unknown_command_events);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReadWriteParameters {
    /// Maximum number of tokens per sequence tokens event
    pub max_tokens_to_read: usize,
    /// Maximum number of characters per comment event; longer comments are
    /// split into events flagged as continued
    pub max_comment_length: usize,
    /// Whether a used ID found in a document is replaced instead of causing an error
    pub replace_used_ids: bool,
    /// Whether unknown commands produce events (otherwise they are skipped)
    pub create_unknown_command_events: bool,
    /// Whether empty labels are reported as missing
    pub treat_blank_as_missing_label: bool,
    /// Whether writers use the label of the linked OTU for unlabeled
    /// sequences and nodes
    pub apply_otu_labels: bool,
    /// Metadata treatment of the Nexus writer
    pub metadata_treatment: MetadataTreatment,
    /// Columns per line of written matrices; `None` writes each sequence on
    /// one line, otherwise the matrix is written interleaved
    pub line_length: Option<usize>,
}

impl Default for ReadWriteParameters {
    fn default() -> Self {
        Self {
            max_tokens_to_read: DEFAULT_MAX_TOKENS_TO_READ,
            max_comment_length: DEFAULT_MAX_COMMENT_LENGTH,
            replace_used_ids: false,
            create_unknown_command_events: true,
            treat_blank_as_missing_label: true,
            apply_otu_labels: true,
            metadata_treatment: MetadataTreatment::Ignore,
            line_length: None,
        }
    }
}

impl ReadWriteParameters {
    /// Sets the maximum number of tokens per event (at least 1).
    pub fn with_max_tokens_to_read(mut self, max_tokens_to_read: usize) -> Self {
        self.max_tokens_to_read = max_tokens_to_read.max(1);
        self
    }

    /// Sets the maximum number of characters per comment event (at least 1).
    pub fn with_max_comment_length(mut self, max_comment_length: usize) -> Self {
        self.max_comment_length = max_comment_length.max(1);
        self
    }

    pub fn with_replace_used_ids(mut self, replace_used_ids: bool) -> Self {
        self.replace_used_ids = replace_used_ids;
        self
    }

    pub fn with_unknown_command_events(mut self, create: bool) -> Self {
        self.create_unknown_command_events = create;
        self
    }

    pub fn with_blank_as_missing_label(mut self, treat_blank_as_missing: bool) -> Self {
        self.treat_blank_as_missing_label = treat_blank_as_missing;
        self
    }

    pub fn with_otu_labels(mut self, apply_otu_labels: bool) -> Self {
        self.apply_otu_labels = apply_otu_labels;
        self
    }

    pub fn with_metadata_treatment(mut self, treatment: MetadataTreatment) -> Self {
        self.metadata_treatment = treatment;
        self
    }

    /// Sets the line length of written matrices, `Some(0)` is treated as `None`.
    pub fn with_line_length(mut self, line_length: Option<usize>) -> Self {
        self.line_length = line_length.filter(|&n| n > 0);
        self
    }

    /// Applies the blank label policy to a label read from a document.
    pub(crate) fn label(&self, label: String) -> Option<String> {
        if label.is_empty() && self.treat_blank_as_missing_label {
            None
        } else {
            Some(label)
        }
    }
}
