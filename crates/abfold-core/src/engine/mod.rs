//! # Engine Module
//!
//! The reconciliation logic of the ensemble pipeline and the seams to its external
//! collaborators.
//!
//! ## Overview
//!
//! Every ensemble member predicts the same antibody independently. The engine brings
//! those predictions into one frame, measures how far each residue of each member sits
//! from the consensus, and orders the members by that spread. The result is the
//! immutable [`ensemble::EnsembleResult`] consumed by the workflows.
//!
//! ## Architecture
//!
//! - **Superposition** ([`superposition`]) - Generalized Procrustes alignment of the
//!   backbone traces with reflection-free Kabsch rotations
//! - **Confidence** ([`confidence`]) - The members x residues squared-deviation tensor
//!   and its per-residue and per-member reductions
//! - **Ranking** ([`ranking`]) - Stable, deterministic ordering of members with inverse
//!   lookups
//! - **Aggregate** ([`ensemble`]) - Validation and eager derivation of all of the above
//! - **Collaborators** ([`collaborators`], [`backends`]) - Traits for numbering,
//!   encoding, model inference and refinement, with default implementations
//! - **Configuration** ([`config`]) - Ensemble member specifications and the predictor
//!   configuration builder
//! - **Progress Monitoring** ([`progress`]) - Progress reporting for front ends
//! - **Error Handling** ([`error`]) - The engine error taxonomy
//!
//! ## Failure Model
//!
//! Input and resource problems are returned as [`error::EngineError`] before any
//! derived state exists. Refinement failures never become errors; see
//! [`crate::workflows::save`].

pub mod backends;
pub mod collaborators;
pub mod confidence;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod progress;
pub mod ranking;
pub mod superposition;
