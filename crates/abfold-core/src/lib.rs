//! # abfold Core Library
//!
//! Ensemble reconciliation for antibody Fv structure prediction: several independently
//! trained models predict the same heavy/light pair, and this library superposes their
//! outputs, derives a per-residue confidence from their spread, ranks the members and
//! drives an external refinement step to a final annotated structure.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`NumberedChains`,
//!   `RawPrediction`), geometry utilities and file I/O.
//!
//! - **[`engine`]: The Logic Core.** The superposition engine, the confidence estimator
//!   and ranker, the immutable `EnsembleResult` aggregate, the collaborator traits with
//!   their default process-backed backends, configuration and progress reporting.
//!
//! - **[`workflows`]: The Public API.** `Predictor` turns sequences into an
//!   `EnsembleResult`; `OutputWriter` turns that result into files on disk, refining
//!   the best candidate under a bounded-retry policy.

pub mod core;
pub mod engine;
pub mod workflows;
