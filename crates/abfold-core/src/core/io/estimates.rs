use crate::core::models::sequence::NumberedChains;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimateWriteError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{residues} residues but {values} error values")]
    LengthMismatch { residues: usize, values: usize },
}

#[derive(Debug, Serialize)]
struct EstimateRow {
    index: usize,
    chain: char,
    position: String,
    residue: &'static str,
    mean_squared_deviation: f64,
}

/// Writes one CSV row per residue with its mean squared deviation across the ensemble.
pub fn write_error_estimates(
    chains: &NumberedChains,
    mean_error: &[f64],
    writer: impl Write,
) -> Result<(), EstimateWriteError> {
    if chains.total_residues() != mean_error.len() {
        return Err(EstimateWriteError::LengthMismatch {
            residues: chains.total_residues(),
            values: mean_error.len(),
        });
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    for (index, ((chain, residue), value)) in chains.residues().zip(mean_error).enumerate() {
        csv_writer.serialize(EstimateRow {
            index,
            chain: chain.id(),
            position: residue.label.to_string(),
            residue: residue.residue.to_three_letter(),
            mean_squared_deviation: *value,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_error_estimates_to_path(
    chains: &NumberedChains,
    mean_error: &[f64],
    path: &Path,
) -> Result<(), EstimateWriteError> {
    let file = std::fs::File::create(path)?;
    write_error_estimates(chains, mean_error, std::io::BufWriter::new(file))
}
