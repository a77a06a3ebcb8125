use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Unknown ensemble member id: {0} (expected 1-4)")]
    UnknownMember(u8),
}

/// Identifiers of the standard ensemble members.
pub const STANDARD_MEMBER_IDS: [u8; 4] = [1, 2, 3, 4];

/// One ensemble member: a named set of model weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSpec {
    pub name: String,
    pub weights_path: PathBuf,
    pub embed_dim: usize,
}

impl MemberSpec {
    pub fn new(name: impl Into<String>, weights_path: impl Into<PathBuf>, embed_dim: usize) -> Self {
        Self {
            name: name.into(),
            weights_path: weights_path.into(),
            embed_dim,
        }
    }
}

fn standard_embed_dim(id: u8) -> Option<usize> {
    match id {
        1 => Some(128),
        2..=4 => Some(256),
        _ => None,
    }
}

/// The standard members `antibody_model_{id}` with weights under `weights_dir`.
pub fn default_members(weights_dir: &Path, ids: &[u8]) -> Result<Vec<MemberSpec>, ConfigError> {
    ids.iter()
        .map(|&id| {
            let embed_dim = standard_embed_dim(id).ok_or(ConfigError::UnknownMember(id))?;
            let name = format!("antibody_model_{}", id);
            Ok(MemberSpec::new(name.clone(), weights_dir.join(name), embed_dim))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    pub members: Vec<MemberSpec>,
    /// Run member inference on the rayon pool.
    pub parallel: bool,
}

#[derive(Default)]
pub struct PredictorConfigBuilder {
    members: Option<Vec<MemberSpec>>,
    parallel: Option<bool>,
}

impl PredictorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(mut self, members: Vec<MemberSpec>) -> Self {
        self.members = Some(members);
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    pub fn build(self) -> Result<PredictorConfig, ConfigError> {
        let members = self
            .members
            .filter(|m| !m.is_empty())
            .ok_or(ConfigError::MissingParameter("members"))?;
        Ok(PredictorConfig {
            members,
            parallel: self.parallel.unwrap_or(false),
        })
    }
}
