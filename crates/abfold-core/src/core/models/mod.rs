//! # Core Models Module
//!
//! Plain data types shared by every layer of the pipeline.
//!
//! - [`residue`] - The twenty standard amino acids and their one/three-letter codes
//! - [`layout`] - The fixed per-residue atom slot layout and the backbone trace slot
//! - [`sequence`] - Chain identifiers, validated input sequences and numbered chains
//! - [`prediction`] - The raw per-member output of the model collaborator
//!
//! All types here are immutable values once constructed; derived quantities live in
//! [`crate::engine`].

pub mod layout;
pub mod prediction;
pub mod residue;
pub mod sequence;
