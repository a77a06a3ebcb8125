//! The fixed per-residue atom layout shared by the model collaborator, the
//! superposition engine and the PDB writer.
//!
//! Every residue owns [`ATOMS_PER_RESIDUE`] coordinate slots. The first four slots
//! are always the backbone atoms `N`, `CA`, `C`, `O`; the remaining slots hold the
//! heavy side-chain atoms of the residue type in topological order. Slots beyond a
//! residue's atom count carry no meaning and are never written to disk.

use super::residue::AminoAcid;
use phf::{Map, phf_map};

/// Coordinate slots per residue.
pub const ATOMS_PER_RESIDUE: usize = 14;

/// Slot of the backbone trace atom (`CA`) used for rigid alignment.
pub const TRACE_ATOM_SLOT: usize = 1;

const ALA: &[&str] = &["N", "CA", "C", "O", "CB"];
const ARG: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "CD", "NE", "CZ", "NH1", "NH2"];
const ASN: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "OD1", "ND2"];
const ASP: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "OD1", "OD2"];
const CYS: &[&str] = &["N", "CA", "C", "O", "CB", "SG"];
const GLN: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "CD", "OE1", "NE2"];
const GLU: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "CD", "OE1", "OE2"];
const GLY: &[&str] = &["N", "CA", "C", "O"];
const HIS: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "ND1", "CD2", "CE1", "NE2"];
const ILE: &[&str] = &["N", "CA", "C", "O", "CB", "CG1", "CG2", "CD1"];
const LEU: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2"];
const LYS: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "CD", "CE", "NZ"];
const MET: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "SD", "CE"];
const PHE: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "CE1", "CE2", "CZ"];
const PRO: &[&str] = &["N", "CA", "C", "O", "CB", "CG", "CD"];
const SER: &[&str] = &["N", "CA", "C", "O", "CB", "OG"];
const THR: &[&str] = &["N", "CA", "C", "O", "CB", "OG1", "CG2"];
const TRP: &[&str] = &[
    "N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "NE1", "CE2", "CE3", "CZ2", "CZ3", "CH2",
];
const TYR: &[&str] = &[
    "N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "CE1", "CE2", "CZ", "OH",
];
const VAL: &[&str] = &["N", "CA", "C", "O", "CB", "CG1", "CG2"];

static RESIDUE_ATOM_NAMES: Map<&'static str, &'static [&'static str]> = phf_map! {
    "ALA" => ALA, "ARG" => ARG, "ASN" => ASN, "ASP" => ASP, "CYS" => CYS,
    "GLN" => GLN, "GLU" => GLU, "GLY" => GLY, "HIS" => HIS, "ILE" => ILE,
    "LEU" => LEU, "LYS" => LYS, "MET" => MET, "PHE" => PHE, "PRO" => PRO,
    "SER" => SER, "THR" => THR, "TRP" => TRP, "TYR" => TYR, "VAL" => VAL,
};

/// Names of the atoms occupying the leading slots of a residue of type `residue`.
pub fn atom_names(residue: AminoAcid) -> &'static [&'static str] {
    RESIDUE_ATOM_NAMES
        .get(residue.to_three_letter())
        .copied()
        .unwrap_or(GLY)
}

/// Element symbol of a standard heavy atom, derived from the first letter of its name.
pub fn element_symbol(atom_name: &str) -> &'static str {
    match atom_name.trim().chars().next() {
        Some('N') => "N",
        Some('C') => "C",
        Some('O') => "O",
        Some('S') => "S",
        Some('H') => "H",
        _ => "X",
    }
}
