use super::residue::AminoAcid;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Raw input sequences keyed by single-character chain identifier (`'H'`, `'L'`).
pub type SequenceMap = BTreeMap<char, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainKind {
    Heavy,
    Light,
}

impl ChainKind {
    /// Heavy chain first; this order is used for concatenation and output.
    pub const ALL: [ChainKind; 2] = [ChainKind::Heavy, ChainKind::Light];

    pub fn id(self) -> char {
        match self {
            ChainKind::Heavy => 'H',
            ChainKind::Light => 'L',
        }
    }

    pub fn from_id(id: char) -> Option<Self> {
        match id.to_ascii_uppercase() {
            'H' => Some(ChainKind::Heavy),
            'L' => Some(ChainKind::Light),
            _ => None,
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKind::Heavy => write!(f, "heavy"),
            ChainKind::Light => write!(f, "light"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Missing required {chain} chain '{id}'", id = .chain.id())]
    MissingChain { chain: ChainKind },

    #[error("The {chain} chain sequence is empty")]
    EmptyChain { chain: ChainKind },

    #[error("Invalid residue '{residue}' at position {position} of the {chain} chain")]
    InvalidResidue {
        chain: ChainKind,
        position: usize,
        residue: char,
    },

    #[error("Numbering changed the residue count of the {chain} chain ({expected} -> {actual})")]
    NumberingMismatch {
        chain: ChainKind,
        expected: usize,
        actual: usize,
    },
}

/// The validated heavy/light pair handed to the numbering collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSequences {
    pub heavy: String,
    pub light: String,
}

impl ChainSequences {
    /// Picks the required chains out of `map`; other chains are ignored.
    pub fn from_map(map: &SequenceMap) -> Result<Self, InputError> {
        let take = |chain: ChainKind| -> Result<String, InputError> {
            let sequence = map
                .get(&chain.id())
                .ok_or(InputError::MissingChain { chain })?;
            let sequence: String = sequence.chars().filter(|c| !c.is_whitespace()).collect();
            if sequence.is_empty() {
                return Err(InputError::EmptyChain { chain });
            }
            Ok(sequence)
        };
        Ok(Self {
            heavy: take(ChainKind::Heavy)?,
            light: take(ChainKind::Light)?,
        })
    }

    pub fn get(&self, chain: ChainKind) -> &str {
        match chain {
            ChainKind::Heavy => &self.heavy,
            ChainKind::Light => &self.light,
        }
    }
}

/// A residue number plus optional insertion code, e.g. `111A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionLabel {
    pub number: i32,
    pub insertion: Option<char>,
}

impl PositionLabel {
    pub fn new(number: i32) -> Self {
        Self {
            number,
            insertion: None,
        }
    }

    pub fn with_insertion(number: i32, insertion: char) -> Self {
        Self {
            number,
            insertion: Some(insertion),
        }
    }
}

impl fmt::Display for PositionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.insertion {
            Some(code) => write!(f, "{}{}", self.number, code),
            None => write!(f, "{}", self.number),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberedResidue {
    pub label: PositionLabel,
    pub residue: AminoAcid,
}

/// One chain as produced by the numbering collaborator. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedSequence {
    chain: ChainKind,
    residues: Vec<NumberedResidue>,
}

impl NumberedSequence {
    pub fn new(chain: ChainKind, residues: Vec<NumberedResidue>) -> Self {
        Self { chain, residues }
    }

    pub fn chain(&self) -> ChainKind {
        self.chain
    }

    pub fn residues(&self) -> &[NumberedResidue] {
        &self.residues
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// The flat one-letter sequence reconstructed from the numbered form.
    pub fn sequence(&self) -> String {
        self.residues
            .iter()
            .map(|r| r.residue.to_one_letter())
            .collect()
    }
}

/// The numbered heavy and light chains of one antibody.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedChains {
    heavy: NumberedSequence,
    light: NumberedSequence,
}

impl NumberedChains {
    pub fn new(heavy: NumberedSequence, light: NumberedSequence) -> Self {
        Self { heavy, light }
    }

    pub fn get(&self, chain: ChainKind) -> &NumberedSequence {
        match chain {
            ChainKind::Heavy => &self.heavy,
            ChainKind::Light => &self.light,
        }
    }

    /// Chains in output order (heavy, then light).
    pub fn iter(&self) -> impl Iterator<Item = &NumberedSequence> {
        [&self.heavy, &self.light].into_iter()
    }

    /// Every residue in output order, tagged with its chain.
    pub fn residues(&self) -> impl Iterator<Item = (ChainKind, &NumberedResidue)> {
        self.iter()
            .flat_map(|seq| seq.residues().iter().map(move |r| (seq.chain(), r)))
    }

    pub fn total_residues(&self) -> usize {
        self.heavy.len() + self.light.len()
    }

    /// Flat sequences keyed by chain, as fed to the encoding collaborator.
    pub fn flat_sequences(&self) -> ChainSequences {
        ChainSequences {
            heavy: self.heavy.sequence(),
            light: self.light.sequence(),
        }
    }

    /// Heavy then light sequence, as fed to the model collaborator.
    pub fn concatenated_sequence(&self) -> String {
        let mut full = self.heavy.sequence();
        full.push_str(&self.light.sequence());
        full
    }
}
