use crate::core::models::prediction::ResidueAtoms;
use crate::core::models::sequence::NumberedChains;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Turns numbered chains plus per-residue coordinates into a structure file.
///
/// Implementors must emit residues in the order of [`NumberedChains::residues`] so
/// that downstream consumers can address residues by their position in that order.
pub trait StructureSerializer {
    /// The error type for serialization.
    type Error: Error + Send + Sync + 'static + From<io::Error>;

    /// Writes one structure to `writer`.
    ///
    /// # Arguments
    ///
    /// * `chains` - The numbered chains defining residue identity and order.
    /// * `atoms` - One entry per residue, in the same order as `chains`.
    /// * `writer` - The writer to output to.
    ///
    /// # Errors
    ///
    /// Returns an error if the residue counts disagree or writing fails.
    fn write_to(
        &self,
        chains: &NumberedChains,
        atoms: &[ResidueAtoms],
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes one structure to a file, replacing any existing content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        &self,
        chains: &NumberedChains,
        atoms: &[ResidueAtoms],
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(chains, atoms, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Writes per-residue confidence values into an existing structure file in place.
pub trait ConfidenceAnnotator {
    /// The error type for annotation.
    type Error: Error + Send + Sync + 'static + From<io::Error>;

    /// Rewrites the file at `path`, prepending `header` and storing `confidence[i]` on
    /// every atom of the i-th residue.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, or holds more residues
    /// than there are confidence values.
    fn annotate(&self, path: &Path, confidence: &[f64], header: &[&str])
    -> Result<(), Self::Error>;
}
