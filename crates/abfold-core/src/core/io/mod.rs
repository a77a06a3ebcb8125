//! Provides input/output functionality for the files the pipeline reads and writes.
//!
//! Structure output goes through the [`traits::StructureSerializer`] and
//! [`traits::ConfidenceAnnotator`] traits, with fixed-column PDB implementations in
//! [`pdb`]. Input sequences are read from FASTA in [`fasta`], and the per-residue
//! error array of a directory-mode run is written as CSV by [`estimates`].

pub mod estimates;
pub mod fasta;
pub mod pdb;
pub mod traits;
