//! # Workflows Module
//!
//! The two entry points of the pipeline.
//!
//! ## Overview
//!
//! [`predict::Predictor`] loads the ensemble once and turns a heavy/light sequence pair
//! into an [`crate::engine::ensemble::EnsembleResult`]. [`save::OutputWriter`] turns
//! that result into files: either one refined structure (retrying refinement once on
//! failure) or a directory with every ranked member, the error estimates and a refined
//! final model.
//!
//! Both report progress through [`crate::engine::progress::ProgressReporter`] and log
//! through `tracing`.

pub mod predict;
pub mod save;
