//! # Core Module
//!
//! Stateless building blocks of the ensemble pipeline.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Amino acids, the per-residue atom layout, numbered
//!   chains and raw per-member predictions
//! - **File I/O** ([`io`]) - PDB writing and confidence annotation, FASTA reading and
//!   the error-estimate CSV
//! - **Geometry** ([`utils`]) - Centroids, RMSD and the Kabsch rotation fit
//!
//! Nothing in this module holds state between calls or talks to external programs;
//! that is the job of [`crate::engine`].

pub mod io;
pub mod models;
pub mod utils;
