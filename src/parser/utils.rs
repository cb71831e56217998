//! Utility functions for label escaping and unescaping in Nexus and Newick.
//!
//! Labels containing special characters are written in single quotes, with
//! internal single quotes doubled. Unquoted labels use underscores in place of
//! spaces, which is why a label containing a literal underscore also has to be
//! quoted to survive a round trip.

/// Characters that force a label to be quoted.
const SPECIAL_CHARACTERS: &[char] = &[
    ',', ';', '\t', '\n', '\r', '(', ')', '{', '}', ':', '=', '[', ']', '\'', '"', '_', '&',
];

/// Escapes a label for safe use in Nexus and Newick formats.
///
/// # Arguments
/// * `label` - The label string to escape
///
/// # Returns
/// An escaped label string safe for use in Nexus and Newick files
///
/// # Examples
/// ```
/// # use phylostream::parser::utils::escape_label;
/// assert_eq!(escape_label("Pukeko"), "Pukeko");
/// assert_eq!(escape_label("Pu[ke]ko"), "'Pu[ke]ko'");
/// assert_eq!(escape_label("Australasian Swamphen"), "Australasian_Swamphen");
/// assert_eq!(escape_label("Australasian_Swamphen"), "'Australasian_Swamphen'");
/// assert_eq!(escape_label("Baillon's Crake"), "'Baillon''s Crake'");
/// assert_eq!(escape_label(""), "''");
/// ```
pub fn escape_label(label: &str) -> String {
    if label.is_empty() {
        return "''".to_string();
    }

    if label.contains(SPECIAL_CHARACTERS) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.replace(' ', "_")
    }
}

/// Unescapes an unquoted label read from Nexus or Newick, replacing
/// underscores with spaces.
///
/// Quoted labels are already unescaped while reading and must not be passed
/// here, since underscores inside quotes are literal.
///
/// # Examples
/// ```
/// # use phylostream::parser::utils::unescape_unquoted_label;
/// assert_eq!(unescape_unquoted_label("Pukeko"), "Pukeko");
/// assert_eq!(unescape_unquoted_label("Australasian_Swamphen"), "Australasian Swamphen");
/// ```
pub fn unescape_unquoted_label(label: &str) -> String {
    label.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_is_reversible_for_unquoted_output() {
        for label in ["Little Spotted Kiwi", "Kea", "Okarito Brown Kiwi"] {
            let escaped = escape_label(label);
            assert!(!escaped.starts_with('\''));
            assert_eq!(unescape_unquoted_label(&escaped), label);
        }
    }
}
