//! Default implementations of the collaborator traits in
//! [`crate::engine::collaborators`].
//!
//! - [`numbering`] - Sequential position labels
//! - [`encoding`] - One-hot residue and chain encoding
//! - [`model`] - Ensemble members served by an external inference program
//! - [`refinement`] - Refinement by an external program, or none at all
//!
//! The process-backed backends take an argument template in which `{name}`-style
//! placeholders are substituted per call.

pub mod encoding;
pub mod model;
pub mod numbering;
pub mod refinement;

/// Replaces every `{key}` in `args` with its value.
pub(crate) fn expand_args(args: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{}}}", key), value)
            })
        })
        .collect()
}
