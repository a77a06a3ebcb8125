use thiserror::Error;

use crate::core::models::sequence::InputError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("Failed to load resources for ensemble member '{member}': {message}")]
    Resource { member: String, message: String },

    #[error("Ensemble member '{member}' failed: {message}")]
    Model { member: String, message: String },

    #[error("Ensemble has no members")]
    EmptyEnsemble,

    #[error("Ensemble has {names} member names but {predictions} predictions")]
    MemberCount { names: usize, predictions: usize },

    #[error(
        "Prediction of ensemble member '{member}' has {actual} residues, expected {expected}"
    )]
    Shape {
        member: String,
        expected: usize,
        actual: usize,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to annotate {path} with confidence values: {source}")]
    Annotation {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn annotation(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Annotation {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn serialization(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
