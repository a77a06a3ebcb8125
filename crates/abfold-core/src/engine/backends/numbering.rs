use crate::core::models::residue::AminoAcid;
use crate::core::models::sequence::{
    ChainKind, ChainSequences, InputError, NumberedChains, NumberedResidue, NumberedSequence,
    PositionLabel,
};
use crate::engine::collaborators::Numbering;

/// Labels residues `1..=n` in sequence order, without insertion codes.
///
/// Only the twenty standard one-letter codes are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialNumbering;

impl SequentialNumbering {
    fn number_chain(chain: ChainKind, sequence: &str) -> Result<NumberedSequence, InputError> {
        let residues = sequence
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let residue = AminoAcid::from_one_letter(c).ok_or(InputError::InvalidResidue {
                    chain,
                    position: i + 1,
                    residue: c,
                })?;
                Ok(NumberedResidue {
                    label: PositionLabel::new(i as i32 + 1),
                    residue,
                })
            })
            .collect::<Result<Vec<_>, InputError>>()?;
        Ok(NumberedSequence::new(chain, residues))
    }
}

impl Numbering for SequentialNumbering {
    fn number(&self, sequences: &ChainSequences) -> Result<NumberedChains, InputError> {
        Ok(NumberedChains::new(
            Self::number_chain(ChainKind::Heavy, &sequences.heavy)?,
            Self::number_chain(ChainKind::Light, &sequences.light)?,
        ))
    }
}
