use crate::core::models::residue::AminoAcid;
use crate::core::models::sequence::{ChainKind, ChainSequences, InputError};
use crate::engine::collaborators::Encoder;
use nalgebra::DMatrix;

const AMINO_ACID_COLUMNS: usize = AminoAcid::ALL.len();
/// Twenty residue columns followed by one indicator column per chain.
pub const ENCODING_WIDTH: usize = AMINO_ACID_COLUMNS + ChainKind::ALL.len();

/// One row per residue, heavy chain first.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneHotEncoder;

impl Encoder for OneHotEncoder {
    fn encode(&self, sequences: &ChainSequences) -> Result<DMatrix<f64>, InputError> {
        let rows = sequences.heavy.chars().count() + sequences.light.chars().count();
        let mut encoding = DMatrix::zeros(rows, ENCODING_WIDTH);

        let mut row = 0;
        for (chain_column, chain) in ChainKind::ALL.into_iter().enumerate() {
            for (i, c) in sequences.get(chain).chars().enumerate() {
                let residue = AminoAcid::from_one_letter(c).ok_or(InputError::InvalidResidue {
                    chain,
                    position: i + 1,
                    residue: c,
                })?;
                encoding[(row, residue.index())] = 1.0;
                encoding[(row, AMINO_ACID_COLUMNS + chain_column)] = 1.0;
                row += 1;
            }
        }
        Ok(encoding)
    }
}
