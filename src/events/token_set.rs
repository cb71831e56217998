//! Token set types and meanings of single token definitions.

/// Kind of characters a token set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSetType {
    /// DNA or RNA without further distinction
    Nucleotide,
    Dna,
    Rna,
    AminoAcid,
    /// Discrete (morphological) states, Nexus `STANDARD`
    Discrete,
    Continuous,
    Unknown,
}

impl TokenSetType {
    /// Maps a Nexus `DATATYPE` value (case-insensitive) to a token set type.
    ///
    /// # Returns
    /// `None` for names that do not denote a token set type (e.g. `mixed`)
    pub fn from_nexus_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Some(TokenSetType::Discrete),
            "dna" => Some(TokenSetType::Dna),
            "rna" => Some(TokenSetType::Rna),
            "nucleotide" => Some(TokenSetType::Nucleotide),
            "protein" => Some(TokenSetType::AminoAcid),
            "continuous" => Some(TokenSetType::Continuous),
            _ => None,
        }
    }

    /// The Nexus `DATATYPE` value of this type.
    pub fn nexus_name(self) -> &'static str {
        match self {
            TokenSetType::Nucleotide => "Nucleotide",
            TokenSetType::Dna => "DNA",
            TokenSetType::Rna => "RNA",
            TokenSetType::AminoAcid => "Protein",
            TokenSetType::Discrete | TokenSetType::Unknown => "Standard",
            TokenSetType::Continuous => "Continuous",
        }
    }
}

/// Meaning of a symbol declared by a single token definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterSymbolMeaning {
    /// A regular character state
    Character,
    Gap,
    Missing,
    /// Stands for the token of the first sequence in the same column
    Match,
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nexus_names() {
        assert_eq!(TokenSetType::from_nexus_name("DNA"), Some(TokenSetType::Dna));
        assert_eq!(TokenSetType::from_nexus_name("Protein"), Some(TokenSetType::AminoAcid));
        assert_eq!(TokenSetType::from_nexus_name("mixed"), None);
        assert_eq!(TokenSetType::Continuous.nexus_name(), "Continuous");
    }
}
