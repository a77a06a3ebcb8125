use crate::core::io::traits::{ConfidenceAnnotator, StructureSerializer};
use crate::core::models::layout::{atom_names, element_symbol};
use crate::core::models::prediction::ResidueAtoms;
use crate::core::models::sequence::{NumberedChains, NumberedResidue};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Columns (0-based, exclusive end) of the temperature-factor field.
const B_FACTOR_COLUMNS: (usize, usize) = (60, 66);
/// Columns holding chain id, residue number and insertion code.
const RESIDUE_KEY_COLUMNS: (usize, usize) = (21, 27);
/// Range representable in the six-column `{:>6.2}` B-factor field.
const B_FACTOR_RANGE: (f64, f64) = (-99.99, 999.99);

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed record on line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("Structure has {residues} residues but {coordinates} coordinate sets were given")]
    ShapeMismatch { residues: usize, coordinates: usize },
    #[error("File holds more residues than the {values} confidence values supplied")]
    ConfidenceMismatch { values: usize },
}

fn is_atom_record(line: &str) -> bool {
    line.starts_with("ATOM") || line.starts_with("HETATM")
}

fn format_atom_name(name: &str) -> String {
    if name.len() < 4 {
        format!(" {:<3}", name)
    } else {
        name.to_string()
    }
}

fn insertion_code(residue: &NumberedResidue) -> char {
    residue.label.insertion.unwrap_or(' ')
}

/// Fixed-column PDB writer for numbered antibody chains.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdbWriter;

impl StructureSerializer for PdbWriter {
    type Error = PdbError;

    fn write_to(
        &self,
        chains: &NumberedChains,
        atoms: &[ResidueAtoms],
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        if chains.total_residues() != atoms.len() {
            return Err(PdbError::ShapeMismatch {
                residues: chains.total_residues(),
                coordinates: atoms.len(),
            });
        }

        let mut serial = 1usize;
        let mut coordinates = atoms.iter();

        for chain in chains.iter() {
            let chain_id = chain.chain().id();
            let mut last: Option<&NumberedResidue> = None;

            for residue in chain.residues() {
                let Some(slots) = coordinates.next() else {
                    break;
                };
                let res_name = residue.residue.to_three_letter();
                for (name, position) in atom_names(residue.residue).iter().zip(slots.iter()) {
                    writeln!(
                        writer,
                        "ATOM  {:>5} {:<4} {:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}  ",
                        serial,
                        format_atom_name(name),
                        res_name,
                        chain_id,
                        residue.label.number,
                        insertion_code(residue),
                        position.x,
                        position.y,
                        position.z,
                        1.0,
                        0.0,
                        element_symbol(name),
                    )?;
                    serial += 1;
                }
                last = Some(residue);
            }

            if let Some(residue) = last {
                writeln!(
                    writer,
                    "TER   {:>5}      {:>3} {}{:>4}{}",
                    serial,
                    residue.residue.to_three_letter(),
                    chain_id,
                    residue.label.number,
                    insertion_code(residue),
                )?;
                serial += 1;
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }
}

/// Stores per-residue confidence in the B-factor columns of a PDB file.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdbConfidenceAnnotator;

impl PdbConfidenceAnnotator {
    /// Annotates PDB text held in memory, returning the rewritten text.
    ///
    /// Residues are counted by changes of the chain/number/insertion columns, so
    /// atoms added by refinement (e.g. hydrogens) inherit their residue's value.
    /// Lines identical to a header line are dropped before the header is prepended,
    /// which keeps repeated annotation idempotent.
    pub fn annotate_text(
        text: &str,
        confidence: &[f64],
        header: &[&str],
    ) -> Result<String, PdbError> {
        let mut out = String::with_capacity(text.len() + 81 * header.len());
        for line in header {
            out.push_str(line.trim_end_matches('\n'));
            out.push('\n');
        }

        let mut residue_index: Option<usize> = None;
        let mut current_key: Option<&str> = None;

        for (line_num, line) in text.lines().enumerate() {
            if header.iter().any(|h| h.trim_end() == line.trim_end()) {
                continue;
            }
            if !is_atom_record(line) {
                out.push_str(line);
                out.push('\n');
                continue;
            }
            if !line.is_ascii() || line.len() < RESIDUE_KEY_COLUMNS.1 {
                return Err(PdbError::Malformed {
                    line: line_num + 1,
                    message: "atom record is truncated or not ASCII".to_string(),
                });
            }

            let key = &line[RESIDUE_KEY_COLUMNS.0..RESIDUE_KEY_COLUMNS.1];
            if current_key != Some(key) {
                current_key = Some(key);
                residue_index = Some(residue_index.map_or(0, |i| i + 1));
            }
            let index = residue_index.unwrap_or_default();
            let value = confidence.get(index).ok_or(PdbError::ConfidenceMismatch {
                values: confidence.len(),
            })?;

            let (start, end) = B_FACTOR_COLUMNS;
            let mut record = format!("{:<width$}", line, width = end);
            let value = value.clamp(B_FACTOR_RANGE.0, B_FACTOR_RANGE.1);
            record.replace_range(start..end, &format!("{:>6.2}", value));
            out.push_str(&record);
            out.push('\n');
        }

        let annotated = residue_index.map_or(0, |i| i + 1);
        if annotated < confidence.len() {
            warn!(
                residues = annotated,
                values = confidence.len(),
                "Structure has fewer residues than confidence values; trailing values were not used."
            );
        }
        Ok(out)
    }
}

impl ConfidenceAnnotator for PdbConfidenceAnnotator {
    type Error = PdbError;

    fn annotate(
        &self,
        path: &Path,
        confidence: &[f64],
        header: &[&str],
    ) -> Result<(), Self::Error> {
        let text = fs::read_to_string(path)?;
        let annotated = Self::annotate_text(&text, confidence, header)?;
        fs::write(path, annotated)?;
        Ok(())
    }
}

/// Reads back the B-factor of the first atom of every residue, in file order.
pub fn read_residue_b_factors(text: &str) -> Result<Vec<f64>, PdbError> {
    let mut values = Vec::new();
    let mut current_key: Option<&str> = None;
    for (line_num, line) in text.lines().enumerate() {
        if !is_atom_record(line) {
            continue;
        }
        let key = line.get(RESIDUE_KEY_COLUMNS.0..RESIDUE_KEY_COLUMNS.1);
        let field = line.get(B_FACTOR_COLUMNS.0..B_FACTOR_COLUMNS.1);
        let (Some(key), Some(field)) = (key, field) else {
            return Err(PdbError::Malformed {
                line: line_num + 1,
                message: "atom record is too short".to_string(),
            });
        };
        if current_key == Some(key) {
            continue;
        }
        current_key = Some(key);
        let value = field.trim().parse().map_err(|_| PdbError::Malformed {
            line: line_num + 1,
            message: format!("invalid B-factor '{}'", field.trim()),
        })?;
        values.push(value);
    }
    Ok(values)
}
