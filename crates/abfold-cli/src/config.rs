use crate::cli::PredictArgs;
use crate::data::DataManager;
use crate::error::{CliError, Result};
use abfold::engine::config::{
    PredictorConfig, PredictorConfigBuilder, STANDARD_MEMBER_IDS, default_members,
};
use abfold::workflows::save::DEFAULT_FINAL_NAME;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_MODEL_PROGRAM: &str = "abfold-infer";
pub const DEFAULT_MODEL_ARGS: [&str; 4] = ["--weights", "{weights}", "--embed-dim", "{embed_dim}"];
pub const DEFAULT_REFINE_PROGRAM: &str = "abfold-refine";
pub const DEFAULT_REFINE_ARGS: [&str; 2] = ["{input}", "{output}"];

fn to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialEnsembleConfig {
    models: Option<Vec<u8>>,
    parallel: Option<bool>,
    weights_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialModelConfig {
    program: Option<String>,
    args: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialRefinementConfig {
    enabled: Option<bool>,
    program: Option<String>,
    args: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialOutputConfig {
    directory_final_name: Option<String>,
}

/// The optional TOML configuration file, every field optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    ensemble: Option<PartialEnsembleConfig>,
    model: Option<PartialModelConfig>,
    refinement: Option<PartialRefinementConfig>,
    output: Option<PartialOutputConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandSettings {
    pub program: String,
    pub args: Vec<String>,
}

/// Fully resolved settings of one `predict` run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub predictor: PredictorConfig,
    pub model: CommandSettings,
    /// `None` when refinement is disabled.
    pub refinement: Option<CommandSettings>,
    pub final_name: String,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Resolves the final settings. Precedence: CLI flag, then `-S`, then the file,
    /// then the built-in default.
    pub fn merge_with_cli(
        mut self,
        args: &PredictArgs,
        data_manager: &DataManager,
    ) -> Result<RunConfig> {
        self.apply_set_values(&args.set_values)?;

        let ensemble = self.ensemble.take().unwrap_or_default();
        let model = self.model.take().unwrap_or_default();
        let refinement = self.refinement.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();

        let ids = args
            .models
            .clone()
            .or(ensemble.models)
            .unwrap_or_else(|| STANDARD_MEMBER_IDS.to_vec());
        let weights_dir = ensemble
            .weights_dir
            .unwrap_or_else(|| data_manager.weights_dir());
        let members =
            default_members(&weights_dir, &ids).map_err(|e| CliError::Config(e.to_string()))?;

        let predictor = PredictorConfigBuilder::new()
            .members(members)
            .parallel(ensemble.parallel.unwrap_or(false))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let model = CommandSettings {
            program: model
                .program
                .unwrap_or_else(|| DEFAULT_MODEL_PROGRAM.to_string()),
            args: model
                .args
                .unwrap_or_else(|| to_strings(&DEFAULT_MODEL_ARGS)),
        };

        let refinement_enabled = !args.no_refine && refinement.enabled.unwrap_or(true);
        let refinement = refinement_enabled.then(|| CommandSettings {
            program: refinement
                .program
                .unwrap_or_else(|| DEFAULT_REFINE_PROGRAM.to_string()),
            args: refinement
                .args
                .unwrap_or_else(|| to_strings(&DEFAULT_REFINE_ARGS)),
        });

        let final_name = output
            .directory_final_name
            .unwrap_or_else(|| DEFAULT_FINAL_NAME.to_string());
        if final_name.is_empty() || final_name.contains(['/', '\\']) {
            return Err(CliError::Config(format!(
                "`output.directory-final-name` must be a plain file name, got '{}'",
                final_name
            )));
        }

        Ok(RunConfig {
            predictor,
            model,
            refinement,
            final_name,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let invalid = |kind: &str| {
                CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
            };

            match key {
                "ensemble.models" => {
                    let ids = value_str
                        .split(',')
                        .map(|id| id.trim().parse::<u8>())
                        .collect::<std::result::Result<Vec<_>, _>>()
                        .map_err(|_| invalid("id list"))?;
                    self.ensemble.get_or_insert_with(Default::default).models = Some(ids);
                }
                "ensemble.parallel" => {
                    self.ensemble.get_or_insert_with(Default::default).parallel =
                        Some(value_str.parse().map_err(|_| invalid("boolean"))?);
                }
                "ensemble.weights-dir" => {
                    self.ensemble.get_or_insert_with(Default::default).weights_dir =
                        Some(PathBuf::from(value_str));
                }
                "model.program" => {
                    self.model.get_or_insert_with(Default::default).program =
                        Some(value_str.to_string());
                }
                "refinement.enabled" => {
                    self.refinement.get_or_insert_with(Default::default).enabled =
                        Some(value_str.parse().map_err(|_| invalid("boolean"))?);
                }
                "refinement.program" => {
                    self.refinement.get_or_insert_with(Default::default).program =
                        Some(value_str.to_string());
                }
                "output.directory-final-name" => {
                    self.output
                        .get_or_insert_with(Default::default)
                        .directory_final_name = Some(value_str.to_string());
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
