use super::layout::{ATOMS_PER_RESIDUE, TRACE_ATOM_SLOT};
use nalgebra::{DMatrix, Point3};

/// Coordinates of one residue in the fixed slot layout.
pub type ResidueAtoms = [Point3<f64>; ATOMS_PER_RESIDUE];

/// The output of one ensemble member for one input.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    /// Per-residue atom coordinates, heavy chain residues first.
    pub atoms: Vec<ResidueAtoms>,
    /// Opaque per-residue encoding returned alongside the coordinates.
    pub embedding: DMatrix<f64>,
}

impl RawPrediction {
    pub fn new(atoms: Vec<ResidueAtoms>, embedding: DMatrix<f64>) -> Self {
        Self { atoms, embedding }
    }

    /// A prediction without an accompanying embedding.
    pub fn from_atoms(atoms: Vec<ResidueAtoms>) -> Self {
        let rows = atoms.len();
        Self {
            atoms,
            embedding: DMatrix::zeros(rows, 0),
        }
    }

    pub fn residue_count(&self) -> usize {
        self.atoms.len()
    }

    /// The backbone trace: one representative atom per residue.
    pub fn trace(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|res| res[TRACE_ATOM_SLOT]).collect()
    }

    pub fn is_finite(&self) -> bool {
        self.atoms
            .iter()
            .flatten()
            .all(|p| p.coords.iter().all(|c| c.is_finite()))
    }
}
