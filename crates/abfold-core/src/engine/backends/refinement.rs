use super::expand_args;
use crate::engine::collaborators::Refiner;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Refinement by an external program.
///
/// `{input}` and `{output}` in the argument template are replaced by the structure
/// paths. A run counts as successful when the program exits with status 0 and the
/// output file exists afterwards.
#[derive(Debug, Clone)]
pub struct CommandRefiner {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandRefiner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Refiner for CommandRefiner {
    fn refine(&self, input: &Path, output: &Path) -> bool {
        let input_arg = input.to_string_lossy();
        let output_arg = output.to_string_lossy();
        let args = expand_args(
            &self.args,
            &[("input", input_arg.as_ref()), ("output", output_arg.as_ref())],
        );

        debug!(program = %self.program.display(), ?args, "Running refinement.");
        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        match result {
            Ok(out) if out.status.success() => {
                if output.exists() {
                    true
                } else {
                    warn!(
                        output = %output.display(),
                        "Refinement reported success but produced no output file."
                    );
                    false
                }
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                warn!(
                    status = %out.status,
                    stderr = %stderr.trim(),
                    "Refinement program failed."
                );
                false
            }
            Err(e) => {
                warn!(program = %self.program.display(), error = %e, "Could not start refinement program.");
                false
            }
        }
    }
}

/// Used when refinement is switched off; every attempt reports failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRefiner;

impl Refiner for DisabledRefiner {
    fn refine(&self, input: &Path, _output: &Path) -> bool {
        debug!(input = %input.display(), "Refinement disabled; keeping unrefined structure.");
        false
    }
}
