use super::expand_args;
use crate::core::models::layout::ATOMS_PER_RESIDUE;
use crate::core::models::prediction::{RawPrediction, ResidueAtoms};
use crate::engine::collaborators::{ModelLoader, StructureModel};
use crate::engine::config::MemberSpec;
use crate::engine::error::EngineError;
use nalgebra::{DMatrix, Point3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info};

#[derive(Serialize)]
struct ModelRequest<'a> {
    sequence: &'a str,
    encoding: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct ModelResponse {
    atoms: Vec<Vec<[f64; 3]>>,
    #[serde(default)]
    embedding: Option<Vec<Vec<f64>>>,
}

/// The failure of the stdin writer worth reporting, if any.
///
/// A program that exits without reading its input closes the pipe; its exit status is
/// the more useful diagnostic, so a broken pipe is not reported.
fn request_write_error(outcome: thread::Result<io::Result<()>>) -> Option<String> {
    match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some("request writer thread panicked".to_string()),
    }
}

/// An ensemble member served by an external inference program.
///
/// The program receives `{"sequence": ..., "encoding": [[...], ...]}` on stdin and
/// must print `{"atoms": [[[x, y, z]; 14], ...], "embedding": [[...], ...]}` on stdout,
/// with one `atoms` entry per residue. `embedding` may be omitted.
#[derive(Debug, Clone)]
pub struct CommandModel {
    member: MemberSpec,
    program: PathBuf,
    args: Vec<String>,
}

impl CommandModel {
    pub fn new(member: MemberSpec, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            member,
            program: program.into(),
            args,
        }
    }

    fn model_error(&self, message: impl Into<String>) -> EngineError {
        EngineError::Model {
            member: self.member.name.clone(),
            message: message.into(),
        }
    }

    fn command_args(&self) -> Vec<String> {
        let weights = self.member.weights_path.to_string_lossy();
        let embed_dim = self.member.embed_dim.to_string();
        expand_args(
            &self.args,
            &[
                ("weights", weights.as_ref()),
                ("embed_dim", embed_dim.as_str()),
                ("name", self.member.name.as_str()),
            ],
        )
    }

    fn parse_response(&self, stdout: &[u8], residues: usize) -> Result<RawPrediction, EngineError> {
        let response: ModelResponse = serde_json::from_slice(stdout)
            .map_err(|e| self.model_error(format!("invalid response: {}", e)))?;

        if response.atoms.len() != residues {
            return Err(self.model_error(format!(
                "returned {} residues for a {}-residue sequence",
                response.atoms.len(),
                residues
            )));
        }

        let atoms = response
            .atoms
            .iter()
            .enumerate()
            .map(|(i, slots)| {
                if slots.len() != ATOMS_PER_RESIDUE {
                    return Err(self.model_error(format!(
                        "residue {} has {} atom slots, expected {}",
                        i,
                        slots.len(),
                        ATOMS_PER_RESIDUE
                    )));
                }
                let mut residue: ResidueAtoms = [Point3::origin(); ATOMS_PER_RESIDUE];
                for (target, [x, y, z]) in residue.iter_mut().zip(slots) {
                    *target = Point3::new(*x, *y, *z);
                }
                Ok(residue)
            })
            .collect::<Result<Vec<_>, _>>()?;

        match response.embedding {
            Some(rows) if !rows.is_empty() => {
                let width = rows[0].len();
                if rows.len() != residues || rows.iter().any(|r| r.len() != width) {
                    return Err(self.model_error("embedding is not a residues x width matrix"));
                }
                let embedding =
                    DMatrix::from_row_iterator(residues, width, rows.into_iter().flatten());
                Ok(RawPrediction::new(atoms, embedding))
            }
            _ => Ok(RawPrediction::from_atoms(atoms)),
        }
    }
}

impl StructureModel for CommandModel {
    fn name(&self) -> &str {
        &self.member.name
    }

    fn predict(
        &self,
        encoding: &DMatrix<f64>,
        sequence: &str,
    ) -> Result<RawPrediction, EngineError> {
        let request = ModelRequest {
            sequence,
            encoding: encoding
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|e| self.model_error(format!("failed to encode request: {}", e)))?;

        debug!(member = %self.member.name, program = %self.program.display(), "Running model.");
        let mut child = Command::new(&self.program)
            .args(self.command_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.model_error(format!("failed to start {}: {}", self.program.display(), e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.model_error("stdin of the model process is unavailable"))?;
        let writer = thread::spawn(move || stdin.write_all(&payload));

        let output = child
            .wait_with_output()
            .map_err(|e| self.model_error(format!("failed to wait for the model: {}", e)))?;
        if let Some(error) = request_write_error(writer.join()) {
            debug!(member = %self.member.name, %error, "Writing the model request failed.");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.model_error(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        self.parse_response(&output.stdout, sequence.chars().count())
    }
}

/// Loads [`CommandModel`]s after checking that each member's weights are usable.
#[derive(Debug, Clone)]
pub struct CommandModelLoader {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandModelLoader {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl ModelLoader for CommandModelLoader {
    fn load(&self, member: &MemberSpec) -> Result<Box<dyn StructureModel>, EngineError> {
        let resource_error = |message: String| EngineError::Resource {
            member: member.name.clone(),
            message,
        };
        let path = &member.weights_path;
        let metadata = fs::metadata(path).map_err(|e| {
            resource_error(format!("weights not readable at {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(resource_error(format!(
                "weights path {} is not a file",
                path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(resource_error(format!(
                "weights file {} is empty",
                path.display()
            )));
        }

        info!(member = %member.name, weights = %path.display(), "Loaded ensemble member.");
        Ok(Box::new(CommandModel::new(
            member.clone(),
            self.program.clone(),
            self.args.clone(),
        )))
    }
}
