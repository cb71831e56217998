//! Constants and definitions for the Newick reader and writer.

/// Newick label delimiters: parentheses, comma, colon, semicolon, whitespace
/// and comment brackets
pub(crate) const NEWICK_LABEL_DELIMITERS: &[u8] = b"([,:; \n\t\r)]";

/// Start of a hot comment (annotation) `[&key=value,...]`
pub(crate) const ANNOTATION_START: &[u8] = b"[&";

/// Hot comments marking a tree as rooted or unrooted
pub(crate) const ROOTED_MARKER: &[u8] = b"[&R]";
pub(crate) const UNROOTED_MARKER: &[u8] = b"[&U]";

/// Terminator of a tree
pub(crate) const TREE_END: u8 = b';';
