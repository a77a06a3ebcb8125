use super::config::MemberSpec;
use super::error::EngineError;
use crate::core::models::prediction::RawPrediction;
use crate::core::models::sequence::{ChainSequences, InputError, NumberedChains};
use nalgebra::DMatrix;
use std::path::Path;

/// Assigns position labels to the residues of each chain.
pub trait Numbering: Send + Sync {
    /// Numbers both chains.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] if a chain cannot be numbered. Implementations must
    /// keep the residue count and identity of every chain.
    fn number(&self, sequences: &ChainSequences) -> Result<NumberedChains, InputError>;
}

/// Builds the numeric model input shared by every ensemble member.
pub trait Encoder: Send + Sync {
    fn encode(&self, sequences: &ChainSequences) -> Result<DMatrix<f64>, InputError>;
}

/// One loaded ensemble member.
///
/// Models are read-only once loaded and may be called from several threads.
pub trait StructureModel: Send + Sync {
    fn name(&self) -> &str;

    /// Predicts per-residue atom coordinates.
    ///
    /// # Arguments
    ///
    /// * `encoding` - The shared encoding from the [`Encoder`].
    /// * `sequence` - The heavy chain sequence followed by the light chain sequence.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Model`] naming this member if inference fails.
    fn predict(&self, encoding: &DMatrix<f64>, sequence: &str)
    -> Result<RawPrediction, EngineError>;
}

/// Turns a [`MemberSpec`] into a ready model.
pub trait ModelLoader {
    /// # Errors
    ///
    /// Returns [`EngineError::Resource`] naming the member if its weights are missing
    /// or unusable.
    fn load(&self, member: &MemberSpec) -> Result<Box<dyn StructureModel>, EngineError>;
}

/// Physics-based cleanup of a written structure.
///
/// Failure is an expected outcome and is reported as `false`, never as an error.
pub trait Refiner: Send + Sync {
    fn refine(&self, input: &Path, output: &Path) -> bool;
}
